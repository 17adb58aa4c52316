use crate::deck::Deck;
use crate::input::Command;
use crate::renderer::{AnimationId, HostRequest, Renderer};
use crate::transition::{SlidePhase, SlideRuntime, TransitionSearchPath, TransitionStateMachine};

/// Index of the current slide. Moves one step at a time and never wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    index: usize,
}

impl Cursor {
    pub fn index(&self) -> usize {
        self.index
    }

    fn forward(&mut self, len: usize) -> bool {
        if self.index + 1 >= len {
            return false;
        }
        self.index += 1;
        true
    }

    fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    fn clamp(&mut self, len: usize) {
        self.index = self.index.min(len.saturating_sub(1));
    }
}

pub struct SlideNavigator {
    deck: Deck,
    runtimes: Vec<Option<SlideRuntime>>,
    cursor: Cursor,
    machine: TransitionStateMachine,
}

impl SlideNavigator {
    pub fn new(renderer: &mut dyn Renderer, deck: Deck, search: TransitionSearchPath) -> Self {
        let runtimes = (0..deck.len()).map(|_| None).collect();
        Self {
            deck,
            runtimes,
            cursor: Cursor::default(),
            machine: TransitionStateMachine::new(renderer, search),
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn cursor(&self) -> usize {
        self.cursor.index()
    }

    pub fn machine(&self) -> &TransitionStateMachine {
        &self.machine
    }

    pub fn runtime(&self, index: usize) -> Option<&SlideRuntime> {
        self.runtimes.get(index).and_then(Option::as_ref)
    }

    pub fn phase(&self, index: usize) -> Option<SlidePhase> {
        self.runtime(index).map(|rt| rt.phase)
    }

    /// First display, at `index` clamped to the deck.
    pub fn start(&mut self, renderer: &mut dyn Renderer, index: usize) {
        if self.deck.is_empty() {
            return;
        }
        self.cursor.index = index;
        self.cursor.clamp(self.deck.len());
        self.show_current(renderer);
    }

    pub fn advance(&mut self, renderer: &mut dyn Renderer) {
        if self.deck.is_empty() || self.cursor.index() + 1 >= self.deck.len() {
            return;
        }
        self.leave_current(renderer, false);
        self.cursor.forward(self.deck.len());
        tracing::debug!(slide = self.cursor.index(), "advance");
        self.show_current(renderer);
    }

    pub fn retreat(&mut self, renderer: &mut dyn Renderer) {
        if self.deck.is_empty() || self.cursor.index() == 0 {
            return;
        }
        self.leave_current(renderer, true);
        self.cursor.back();
        tracing::debug!(slide = self.cursor.index(), "retreat");
        self.show_current(renderer);
    }

    pub fn activate(&mut self, renderer: &mut dyn Renderer) {
        let index = self.cursor.index();
        if let Some(Some(rt)) = self.runtimes.get_mut(index) {
            self.machine.activate(renderer, rt);
        }
    }

    /// Lay the current slide out again for a new stage size.
    pub fn resize(&mut self, renderer: &mut dyn Renderer) {
        if self.deck.is_empty() {
            return;
        }
        let index = self.cursor.index();
        if let (Some(slide), Some(Some(rt))) = (self.deck.get(index), self.runtimes.get_mut(index)) {
            self.machine.relayout(renderer, slide, rt);
        }
    }

    /// Swap in a new deck, keeping the cursor where the new deck allows.
    pub fn reload(&mut self, renderer: &mut dyn Renderer, deck: Deck) {
        for rt in self.runtimes.drain(..).flatten() {
            self.machine.release(renderer, rt);
        }
        self.machine.reset_rest();
        tracing::info!(slides = deck.len(), "deck reloaded");

        self.runtimes = (0..deck.len()).map(|_| None).collect();
        self.deck = deck;
        if self.deck.is_empty() {
            self.cursor = Cursor::default();
            return;
        }
        self.cursor.clamp(self.deck.len());
        self.show_current(renderer);
    }

    /// Tear the stage down: every slide's nodes and the shared layers. The
    /// navigator is left with an empty deck.
    pub fn finalize(&mut self, renderer: &mut dyn Renderer) {
        for rt in self.runtimes.drain(..).flatten() {
            self.machine.release(renderer, rt);
        }
        self.deck = Deck::default();
        self.cursor = Cursor::default();
        self.machine.finalize(renderer);
    }

    pub fn handle(&mut self, renderer: &mut dyn Renderer, command: Command) {
        match command {
            Command::Advance => self.advance(renderer),
            Command::Retreat => self.retreat(renderer),
            Command::Activate => self.activate(renderer),
            Command::ToggleFullscreen => renderer.request(HostRequest::ToggleFullscreen),
            Command::Quit => renderer.request(HostRequest::Quit),
        }
    }

    /// Hand a finished animation to whichever slide is waiting on it.
    pub fn animation_finished(&mut self, renderer: &mut dyn Renderer, id: AnimationId) {
        for rt in self.runtimes.iter_mut().flatten() {
            if self.machine.animation_finished(renderer, rt, id) {
                break;
            }
        }
    }

    fn leave_current(&mut self, renderer: &mut dyn Renderer, backwards: bool) {
        let index = self.cursor.index();
        if let (Some(slide), Some(Some(rt))) = (self.deck.get(index), self.runtimes.get_mut(index)) {
            self.machine.leave(renderer, slide, rt, backwards);
        }
    }

    fn show_current(&mut self, renderer: &mut dyn Renderer) -> bool {
        let index = self.cursor.index();
        // Materialize in deck order so resting texts stack in order.
        for i in 0..=index.min(self.deck.len().saturating_sub(1)) {
            if self.runtimes[i].is_none() {
                let rt = self.machine.materialize(renderer, &self.deck.slides[i]);
                self.runtimes[i] = Some(rt);
            }
        }
        match (self.deck.get(index), self.runtimes.get_mut(index)) {
            (Some(slide), Some(Some(rt))) => self.machine.show(renderer, slide, rt),
            _ => false,
        }
    }
}
