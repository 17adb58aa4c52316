pub mod script;

use std::process::Command;

use crate::color::Color;
use crate::deck::Slide;
use crate::layout::{self, Size};
use crate::media::BackgroundMedia;
use crate::renderer::{Animation, AnimationId, Easing, NodeId, NodeProps, Renderer, TextSpec};

pub use script::{ScriptState, TransitionRuntime, TransitionScript, TransitionSearchPath};

pub const REST_DEPTH: f32 = -9000.0;
pub const REST_X: f32 = 4600.0;
/// Resting texts stack downwards from here.
pub const REST_Y_START: f32 = -3000.0;
/// Opacity of the shared shading rectangle before any slide is shown.
const INITIAL_SHADING_ALPHA: u8 = 0x77;

const BACKGROUND_FADE_MS: u32 = 1000;
const LAYER_FADE_MS: u32 = 500;
const TEXT_ENTER_MS: u32 = 1000;
const SHADING_MS: u32 = 500;
const TEXT_LEAVE_MS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlidePhase {
    #[default]
    Resting,
    Entering,
    Active,
    Exiting,
}

/// The shared stage layers every slide starts out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layers {
    pub background: NodeId,
    pub midground: NodeId,
    pub foreground: NodeId,
    pub shading: NodeId,
}

impl Layers {
    pub fn install(renderer: &mut dyn Renderer) -> Self {
        let root = renderer.root();
        let background = renderer.create_container(root);
        let midground = renderer.create_container(root);
        let foreground = renderer.create_container(root);
        for layer in [midground, foreground] {
            renderer.set_props(layer, &NodeProps::new().opacity(0.0));
        }

        let stage = renderer.stage_size();
        let shading = renderer.create_rectangle(midground, Color::BLACK);
        renderer.set_props(
            shading,
            &NodeProps::new()
                .size(stage)
                .opacity(INITIAL_SHADING_ALPHA as f32 / 255.0),
        );

        Self {
            background,
            midground,
            foreground,
            shading,
        }
    }

    pub fn destroy(self, renderer: &mut dyn Renderer) {
        for node in [self.background, self.midground, self.foreground] {
            renderer.destroy(node);
        }
    }
}

/// Renderer-side state of one slide, created when it first becomes current.
#[derive(Debug)]
pub struct SlideRuntime {
    pub text: NodeId,
    pub background: Option<BackgroundMedia>,
    /// Where the text sits while the slide is not shown.
    pub rest: NodeProps,
    pub transition: Option<TransitionRuntime>,
    pub phase: SlidePhase,
}

/// Moves slides on and off stage. A slide either uses the built-in
/// transition, fire-and-forget animations on the shared layers, or a
/// scripted one. A scripted slide borrows its text and background into the
/// script's containers while shown and hands them back when its `pre` or
/// `post` state completes.
pub struct TransitionStateMachine {
    layers: Layers,
    search: TransitionSearchPath,
    rest_y: f32,
    scripts_loaded: usize,
}

impl TransitionStateMachine {
    pub fn new(renderer: &mut dyn Renderer, search: TransitionSearchPath) -> Self {
        Self {
            layers: Layers::install(renderer),
            search,
            rest_y: REST_Y_START,
            scripts_loaded: 0,
        }
    }

    pub fn layers(&self) -> Layers {
        self.layers
    }

    /// Number of transition descriptions loaded so far.
    pub fn scripts_loaded(&self) -> usize {
        self.scripts_loaded
    }

    /// Restart the resting text stack from its origin.
    pub fn reset_rest(&mut self) {
        self.rest_y = REST_Y_START;
    }

    /// Create a slide's text and background, parked at rest.
    pub fn materialize(&mut self, renderer: &mut dyn Renderer, slide: &Slide) -> SlideRuntime {
        let spec = TextSpec {
            text: slide.text.clone(),
            font: slide.font.clone(),
            color: slide.text_color(),
            align: slide.text_align,
        };
        let text = renderer.create_text(self.layers.foreground, &spec);
        let rest = NodeProps::new()
            .depth(REST_DEPTH)
            .scale(1.0)
            .position(REST_X, self.rest_y);
        renderer.set_props(text, &rest);
        self.rest_y += renderer.node_size(text).height;

        let background =
            match BackgroundMedia::create(renderer, self.layers.background, &slide.background) {
                Ok(media) => {
                    renderer.set_props(media.node(), &NodeProps::new().opacity(0.0));
                    Some(media)
                }
                Err(e) => {
                    tracing::warn!("{e}");
                    None
                }
            };

        SlideRuntime {
            text,
            background,
            rest,
            transition: None,
            phase: SlidePhase::Resting,
        }
    }

    /// Bring a slide on stage and run its command. Returns `false` when its
    /// transition could not be loaded, in which case nothing on stage was
    /// touched and the command did not run.
    pub fn show(&mut self, renderer: &mut dyn Renderer, slide: &Slide, rt: &mut SlideRuntime) -> bool {
        if !self.present(renderer, slide, rt) {
            return false;
        }
        if let Some(command) = &slide.command {
            run_command(command);
        }
        true
    }

    /// Lay the shown slide out again for the current stage size. The slide
    /// command is not run again.
    pub fn relayout(&mut self, renderer: &mut dyn Renderer, slide: &Slide, rt: &mut SlideRuntime) -> bool {
        self.present(renderer, slide, rt)
    }

    fn present(&mut self, renderer: &mut dyn Renderer, slide: &Slide, rt: &mut SlideRuntime) -> bool {
        if let (Some(name), None) = (&slide.transition, &rt.transition) {
            match self.search.load(name) {
                Ok(script) => {
                    tracing::debug!(transition = %name, "loaded transition");
                    rt.transition = Some(TransitionRuntime::install(renderer, script));
                    self.scripts_loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(transition = %name, "failed to load transition: {e}");
                    return false;
                }
            }
        }

        if let Some(spec) = &slide.stage_color {
            match Color::parse(spec) {
                Ok(color) => renderer.set_stage_color(color),
                Err(e) => tracing::warn!("{e}"),
            }
        }

        let stage = renderer.stage_size();
        if let Some(media) = &rt.background {
            if media.is_flat() {
                renderer.set_props(media.node(), &NodeProps::new().size(stage));
            }
            let content = media.content_size(renderer);
            let p = layout::background_placement(stage, content, slide.background_scale);
            renderer.set_props(
                media.node(),
                &NodeProps::new()
                    .position(p.x, p.y)
                    .scale_xy(p.scale_x, p.scale_y),
            );
            if media.is_time_based() {
                media.reset_to_start(renderer);
                media.set_playing(renderer, true);
            }
        }

        let text_size = renderer.node_size(rt.text);
        let placement = layout::text_placement(stage, text_size, slide.position);
        let shading = layout::shading_bounds(stage, placement, text_size);
        let empty = layout::is_empty_text(text_size);
        let text_props = NodeProps::new()
            .depth(0.0)
            .scale(placement.scale)
            .position(placement.x, placement.y);
        let shading_props = NodeProps::new()
            .position(shading.x, shading.y)
            .size(Size::new(shading.width, shading.height))
            .color(slide.shading_color())
            .opacity(if empty { 0.0 } else { slide.shading_opacity });

        if rt.transition.is_some() {
            self.show_scripted(renderer, rt, stage, empty, &text_props, &shading_props);
        } else {
            self.show_builtin(renderer, rt, &text_props, &shading_props);
        }
        true
    }

    fn show_builtin(
        &self,
        renderer: &mut dyn Renderer,
        rt: &mut SlideRuntime,
        text_props: &NodeProps,
        shading_props: &NodeProps,
    ) {
        if let Some(media) = &rt.background {
            renderer.animate(
                media.node(),
                &Animation::linear(BACKGROUND_FADE_MS, NodeProps::new().opacity(1.0)),
            );
        }
        for layer in [self.layers.midground, self.layers.foreground] {
            renderer.animate(
                layer,
                &Animation::linear(LAYER_FADE_MS, NodeProps::new().opacity(1.0)),
            );
        }
        renderer.animate(
            rt.text,
            &Animation::new(TEXT_ENTER_MS, Easing::EaseOutQuint, *text_props),
        );
        renderer.animate(
            self.layers.shading,
            &Animation::linear(SHADING_MS, *shading_props),
        );
        rt.phase = SlidePhase::Active;
    }

    fn show_scripted(
        &self,
        renderer: &mut dyn Renderer,
        rt: &mut SlideRuntime,
        stage: Size,
        empty: bool,
        text_props: &NodeProps,
        shading_props: &NodeProps,
    ) {
        let Some(tr) = rt.transition.as_mut() else {
            return;
        };

        for layer in [self.layers.midground, self.layers.foreground] {
            renderer.animate(
                layer,
                &Animation::linear(LAYER_FADE_MS, NodeProps::new().opacity(0.0)),
            );
        }
        tr.resize(renderer, stage);

        if let Some(media) = &rt.background {
            match tr.background {
                Some(container) => {
                    if !tr.holds_background {
                        renderer.reparent(media.node(), self.layers.background, container);
                        tr.holds_background = true;
                    }
                    renderer.set_props(media.node(), &NodeProps::new().opacity(1.0));
                }
                // Without a container the background stays on the shared layer.
                None => {
                    renderer.animate(
                        media.node(),
                        &Animation::linear(BACKGROUND_FADE_MS, NodeProps::new().opacity(1.0)),
                    );
                }
            }
        }
        if !tr.holds_text {
            renderer.reparent(rt.text, self.layers.foreground, tr.foreground);
            tr.holds_text = true;
        }
        renderer.set_props(rt.text, text_props);

        if tr.shading.is_none() && !empty {
            tr.shading = Some(renderer.create_rectangle(tr.midground, Color::BLACK));
        }
        if let Some(shading) = tr.shading {
            renderer.set_props(shading, shading_props);
        }

        renderer.raise_top(tr.actor);
        renderer.set_visible(tr.actor, true);
        rt.phase = SlidePhase::Entering;
        if let Some(state) = tr.set_state(renderer, ScriptState::Show) {
            self.state_completed(renderer, rt, state);
        }
    }

    /// Take a slide off stage. A slide whose transition never loaded was
    /// never shown, so there is nothing to take off.
    pub fn leave(
        &self,
        renderer: &mut dyn Renderer,
        slide: &Slide,
        rt: &mut SlideRuntime,
        backwards: bool,
    ) {
        if slide.transition.is_some() && rt.transition.is_none() {
            return;
        }
        match rt.transition.as_mut() {
            Some(tr) => {
                let state = if backwards {
                    ScriptState::Pre
                } else {
                    ScriptState::Post
                };
                rt.phase = SlidePhase::Exiting;
                if let Some(state) = tr.set_state(renderer, state) {
                    self.state_completed(renderer, rt, state);
                }
            }
            None => {
                renderer.animate(rt.text, &Animation::linear(TEXT_LEAVE_MS, rt.rest));
                if let Some(media) = &rt.background {
                    renderer.animate(
                        media.node(),
                        &Animation::linear(BACKGROUND_FADE_MS, NodeProps::new().opacity(0.0)),
                    );
                    media.set_playing(renderer, false);
                }
                rt.phase = SlidePhase::Resting;
            }
        }
    }

    /// Drive a scripted slide to its `action` state. Built-in slides have
    /// no action.
    pub fn activate(&self, renderer: &mut dyn Renderer, rt: &mut SlideRuntime) {
        let Some(tr) = rt.transition.as_mut() else {
            return;
        };
        if let Some(state) = tr.set_state(renderer, ScriptState::Action) {
            self.state_completed(renderer, rt, state);
        }
    }

    /// Route a finished animation to the slide's script. Returns whether the
    /// slide's state completed.
    pub fn animation_finished(
        &self,
        renderer: &mut dyn Renderer,
        rt: &mut SlideRuntime,
        id: AnimationId,
    ) -> bool {
        let Some(state) = rt
            .transition
            .as_mut()
            .and_then(|tr| tr.animation_finished(id))
        else {
            return false;
        };
        self.state_completed(renderer, rt, state);
        true
    }

    fn state_completed(&self, renderer: &mut dyn Renderer, rt: &mut SlideRuntime, state: ScriptState) {
        tracing::debug!(state = state.name(), "transition state complete");
        rt.phase = state.on_complete();
        if rt.phase != SlidePhase::Resting {
            return;
        }
        let Some(tr) = rt.transition.as_mut() else {
            return;
        };

        renderer.set_visible(tr.actor, false);
        let Some(container) = tr.background else {
            if let Some(media) = &rt.background {
                renderer.animate(
                    media.node(),
                    &Animation::linear(BACKGROUND_FADE_MS, NodeProps::new().opacity(0.0)),
                );
                media.set_playing(renderer, false);
            }
            return;
        };
        if let Some(media) = &rt.background {
            if tr.holds_background {
                renderer.reparent(media.node(), container, self.layers.background);
                tr.holds_background = false;
            }
            renderer.set_props(media.node(), &NodeProps::new().opacity(0.0));
            media.set_playing(renderer, false);
        }
        if tr.holds_text {
            renderer.reparent(rt.text, tr.foreground, self.layers.foreground);
            tr.holds_text = false;
        }
        renderer.set_props(rt.text, &rt.rest);
    }

    /// Destroy every node the slide owns.
    pub fn release(&self, renderer: &mut dyn Renderer, rt: SlideRuntime) {
        renderer.destroy(rt.text);
        if let Some(media) = rt.background {
            media.destroy(renderer);
        }
        if let Some(tr) = rt.transition {
            tr.destroy(renderer);
        }
    }

    /// Remove the shared layers from the stage.
    pub fn finalize(&mut self, renderer: &mut dyn Renderer) {
        self.layers.destroy(renderer);
        self.reset_rest();
    }
}

/// Run a slide command through the platform shell, blocking until it exits.
fn run_command(command: &str) {
    tracing::info!("running: {command}");
    if let Err(e) = shell(command).status() {
        tracing::warn!("failed to run '{command}': {e}");
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::BackgroundSource;
    use crate::renderer::SceneGraph;
    use crate::test_support::{self, SLIDE_IN, STAGE};
    use std::time::Duration;

    fn machine(scene: &mut SceneGraph, dirs: Vec<std::path::PathBuf>) -> TransitionStateMachine {
        TransitionStateMachine::new(scene, TransitionSearchPath::with_dirs(dirs))
    }

    fn deliver(machine: &TransitionStateMachine, scene: &mut SceneGraph, rt: &mut SlideRuntime) {
        for id in scene.settle() {
            machine.animation_finished(scene, rt, id);
        }
    }

    #[test]
    fn test_layers_start_with_dim_shading() {
        let mut scene = test_support::scene();
        let layers = Layers::install(&mut scene);
        let shading = scene.props(layers.shading).unwrap();
        assert_eq!(scene.parent(layers.shading), Some(layers.midground));
        assert!((shading.opacity - 0x77 as f32 / 255.0).abs() < 1e-6);
        assert_eq!(shading.color, Color::BLACK);
        assert_eq!(scene.node_size(layers.shading), STAGE);
    }

    #[test]
    fn test_materialize_stacks_resting_texts() {
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let a = m.materialize(&mut scene, &test_support::color_slide("red", "one"));
        let b = m.materialize(&mut scene, &test_support::color_slide("red", "two\nlines"));

        let pa = scene.props(a.text).unwrap();
        let pb = scene.props(b.text).unwrap();
        assert_eq!((pa.x, pa.y, pa.depth), (REST_X, REST_Y_START, REST_DEPTH));
        assert_eq!(pb.y, REST_Y_START + scene.node_size(a.text).height);
        assert_eq!(scene.props(a.background.unwrap().node()).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_builtin_show_and_leave() {
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let slide = test_support::color_slide("#ff0000", "Hello");
        let mut rt = m.materialize(&mut scene, &slide);

        assert!(m.show(&mut scene, &slide, &mut rt));
        assert_eq!(rt.phase, SlidePhase::Active);
        scene.settle();

        let text = scene.props(rt.text).unwrap();
        assert_eq!(text.depth, 0.0);
        let size = scene.node_size(rt.text);
        let placement = layout::text_placement(STAGE, size, slide.position);
        assert_eq!((text.x, text.y), (placement.x, placement.y));

        let bg = rt.background.as_ref().unwrap().node();
        assert_eq!(scene.props(bg).unwrap().opacity, 1.0);
        let layers = m.layers();
        assert_eq!(scene.props(layers.foreground).unwrap().opacity, 1.0);
        let shading = scene.props(layers.shading).unwrap();
        assert!((shading.opacity - slide.shading_opacity).abs() < 1e-6);

        m.leave(&mut scene, &slide, &mut rt, false);
        assert_eq!(rt.phase, SlidePhase::Resting);
        scene.settle();
        let text = scene.props(rt.text).unwrap();
        assert_eq!((text.x, text.y, text.depth), (REST_X, REST_Y_START, REST_DEPTH));
        assert_eq!(scene.props(bg).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_empty_text_hides_shading() {
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let mut slide = test_support::color_slide("navy", "");
        slide.shading_opacity = 1.0;
        let mut rt = m.materialize(&mut scene, &slide);

        m.show(&mut scene, &slide, &mut rt);
        scene.settle();
        assert_eq!(scene.props(m.layers().shading).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_shading_contains_text_after_show() {
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let slide = test_support::color_slide("black", "A fairly long line of slide text");
        let mut rt = m.materialize(&mut scene, &slide);
        m.show(&mut scene, &slide, &mut rt);
        scene.settle();

        let t = scene.props(rt.text).unwrap();
        let s = scene.props(m.layers().shading).unwrap();
        let size = scene.node_size(rt.text);
        let pad = layout::shading_padding(STAGE);
        assert!(s.x <= t.x - pad + 1e-3);
        assert!(s.y <= t.y - pad + 1e-3);
        assert!(s.x + s.width >= t.x + size.width * t.scale_x + pad - 1e-3);
        assert!(s.y + s.height >= t.y + size.height * t.scale_y + pad - 1e-3);
    }

    #[test]
    fn test_stage_color_is_applied() {
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let mut slide = test_support::color_slide("black", "x");
        slide.stage_color = Some("#102030".to_string());
        let mut rt = m.materialize(&mut scene, &slide);
        m.show(&mut scene, &slide, &mut rt);
        assert_eq!(scene.stage_color(), Color::rgb(0x10, 0x20, 0x30));
    }

    #[test]
    fn test_missing_script_touches_nothing() {
        let dir = test_support::temp_dir("no-scripts");
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![dir.clone()]);
        let marker = dir.join("ran");
        let mut slide = test_support::color_slide("red", "C");
        slide.transition = Some("wipe".to_string());
        slide.command = Some(format!("touch '{}'", marker.display()));
        let mut rt = m.materialize(&mut scene, &slide);

        let before = scene.snapshot();
        assert!(!m.show(&mut scene, &slide, &mut rt));
        assert_eq!(scene.snapshot(), before);
        assert_eq!(scene.animations_started(), 0);
        assert!(rt.transition.is_none());
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_runs_after_successful_show() {
        let dir = test_support::temp_dir("command");
        let marker = dir.join("ran");
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let mut slide = test_support::color_slide("red", "cmd");
        slide.command = Some(format!("touch '{}'", marker.display()));
        let mut rt = m.materialize(&mut scene, &slide);

        assert!(m.show(&mut scene, &slide, &mut rt));
        assert!(marker.exists());
    }

    fn scripted(dir: &std::path::Path) -> (SceneGraph, TransitionStateMachine, Slide, SlideRuntime) {
        test_support::write(dir, "slide-in.json", SLIDE_IN);
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![dir.to_path_buf()]);
        let mut slide = test_support::color_slide("red", "Scripted");
        slide.transition = Some("slide-in".to_string());
        let rt = m.materialize(&mut scene, &slide);
        (scene, m, slide, rt)
    }

    #[test]
    fn test_scripted_show_borrows_nodes() {
        let dir = test_support::temp_dir("scripted-show");
        let (mut scene, mut m, slide, mut rt) = scripted(&dir);

        assert!(m.show(&mut scene, &slide, &mut rt));
        assert_eq!(rt.phase, SlidePhase::Entering);
        let tr = rt.transition.as_ref().unwrap();
        let bg = rt.background.as_ref().unwrap().node();
        assert_eq!(scene.parent(rt.text), Some(tr.foreground));
        assert_eq!(scene.parent(bg), tr.background);
        assert_eq!(scene.props(bg).unwrap().opacity, 1.0);
        assert_eq!(scene.props(rt.text).unwrap().depth, 0.0);
        assert!(scene.node(tr.actor).unwrap().visible);
        assert_eq!(scene.children(scene.root()).last(), Some(&tr.actor));
        assert_eq!(scene.node_size(tr.actor), STAGE);
        let shading = tr.shading.unwrap();
        assert_eq!(scene.parent(shading), Some(tr.midground));

        deliver(&m, &mut scene, &mut rt);
        assert_eq!(rt.phase, SlidePhase::Active);
        let layers = m.layers();
        assert_eq!(scene.props(layers.foreground).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_scripted_leave_hands_nodes_back() {
        let dir = test_support::temp_dir("scripted-leave");
        let (mut scene, mut m, slide, mut rt) = scripted(&dir);
        m.show(&mut scene, &slide, &mut rt);
        deliver(&m, &mut scene, &mut rt);

        m.leave(&mut scene, &slide, &mut rt, false);
        assert_eq!(rt.phase, SlidePhase::Exiting);
        deliver(&m, &mut scene, &mut rt);

        assert_eq!(rt.phase, SlidePhase::Resting);
        let layers = m.layers();
        let tr = rt.transition.as_ref().unwrap();
        let bg = rt.background.as_ref().unwrap().node();
        assert!(!scene.node(tr.actor).unwrap().visible);
        assert_eq!(scene.parent(rt.text), Some(layers.foreground));
        assert_eq!(scene.parent(bg), Some(layers.background));
        assert_eq!(scene.props(bg).unwrap().opacity, 0.0);
        assert_eq!(scene.props(rt.text).unwrap().depth, REST_DEPTH);
        assert_eq!(scene.props(tr.foreground).unwrap().x, -1600.0);
    }

    #[test]
    fn test_script_reused_across_visits() {
        let dir = test_support::temp_dir("scripted-reuse");
        let (mut scene, mut m, slide, mut rt) = scripted(&dir);

        m.show(&mut scene, &slide, &mut rt);
        let actor = rt.transition.as_ref().unwrap().actor;
        m.leave(&mut scene, &slide, &mut rt, true);
        deliver(&m, &mut scene, &mut rt);
        m.show(&mut scene, &slide, &mut rt);
        deliver(&m, &mut scene, &mut rt);

        assert_eq!(m.scripts_loaded(), 1);
        assert_eq!(rt.transition.as_ref().unwrap().actor, actor);
        assert_eq!(scene.parent(rt.text), Some(rt.transition.as_ref().unwrap().foreground));
    }

    #[test]
    fn test_activate_builtin_is_noop() {
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let slide = test_support::color_slide("red", "plain");
        let mut rt = m.materialize(&mut scene, &slide);
        m.show(&mut scene, &slide, &mut rt);
        scene.settle();

        let before = scene.snapshot();
        let started = scene.animations_started();
        m.activate(&mut scene, &mut rt);
        assert_eq!(scene.snapshot(), before);
        assert_eq!(scene.animations_started(), started);
        assert_eq!(rt.phase, SlidePhase::Active);
    }

    #[test]
    fn test_failed_background_still_shows() {
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let mut slide = test_support::color_slide("black", "text");
        slide.background = BackgroundSource::Image("/nonexistent/stagehand.png".into());
        let mut rt = m.materialize(&mut scene, &slide);
        assert!(rt.background.is_none());
        assert!(m.show(&mut scene, &slide, &mut rt));
    }

    #[test]
    fn test_release_destroys_nodes() {
        let dir = test_support::temp_dir("scripted-release");
        let (mut scene, mut m, slide, mut rt) = scripted(&dir);
        m.show(&mut scene, &slide, &mut rt);
        let text = rt.text;
        let actor = rt.transition.as_ref().unwrap().actor;
        let bg = rt.background.as_ref().unwrap().node();

        m.release(&mut scene, rt);
        assert!(!scene.contains(text));
        assert!(!scene.contains(actor));
        assert!(!scene.contains(bg));
    }

    const FADE_ONLY: &str = r#"{
        "midground": {},
        "foreground": {},
        "state": {
            "duration": 300,
            "states": {
                "pre":  { "foreground": { "opacity": 0.0 } },
                "show": { "foreground": { "opacity": 1.0 } },
                "post": { "foreground": { "opacity": 0.0 } }
            }
        }
    }"#;

    #[test]
    fn test_scripted_show_without_background_container() {
        let dir = test_support::temp_dir("scripted-no-bg");
        test_support::write(&dir, "fade.json", FADE_ONLY);
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![dir.clone()]);
        let mut slide = test_support::color_slide("teal", "Fade");
        slide.transition = Some("fade".to_string());
        let mut rt = m.materialize(&mut scene, &slide);

        assert!(m.show(&mut scene, &slide, &mut rt));
        deliver(&m, &mut scene, &mut rt);
        assert_eq!(rt.phase, SlidePhase::Active);
        let bg = rt.background.as_ref().unwrap().node();
        assert_eq!(scene.parent(bg), Some(m.layers().background));
        assert_eq!(scene.props(bg).unwrap().opacity, 1.0);

        m.leave(&mut scene, &slide, &mut rt, false);
        deliver(&m, &mut scene, &mut rt);
        assert_eq!(rt.phase, SlidePhase::Resting);
        // The fade-out starts when `post` completes.
        scene.settle();
        assert_eq!(scene.props(bg).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_scripted_empty_text_hides_shading() {
        let dir = test_support::temp_dir("scripted-empty");
        test_support::write(&dir, "slide-in.json", SLIDE_IN);
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![dir.clone()]);
        let mut slide = test_support::color_slide("red", "");
        slide.transition = Some("slide-in".to_string());
        slide.shading_opacity = 1.0;
        let mut rt = m.materialize(&mut scene, &slide);

        assert!(m.show(&mut scene, &slide, &mut rt));
        deliver(&m, &mut scene, &mut rt);
        let tr = rt.transition.as_ref().unwrap();
        assert!(tr.shading.is_none());
        assert!(scene.children(tr.midground).is_empty());
        assert_eq!(scene.props(m.layers().midground).unwrap().opacity, 0.0);
    }

    fn video_slide(dir: &std::path::Path) -> Slide {
        let clip = test_support::write(dir, "clip.ogv", "not really a video");
        Slide {
            background: BackgroundSource::Video(clip),
            text: "Rolling".to_string(),
            ..Slide::default()
        }
    }

    #[test]
    fn test_show_rewinds_and_plays_video() {
        let dir = test_support::temp_dir("video-show");
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let slide = video_slide(&dir);
        let mut rt = m.materialize(&mut scene, &slide);
        let video = rt.background.as_ref().unwrap().node();
        assert!(!scene.node(video).unwrap().playing);

        m.show(&mut scene, &slide, &mut rt);
        assert!(scene.node(video).unwrap().playing);
        scene.tick(Duration::from_millis(250));
        assert_eq!(scene.node(video).unwrap().position, Duration::from_millis(250));

        m.leave(&mut scene, &slide, &mut rt, false);
        m.show(&mut scene, &slide, &mut rt);
        let node = scene.node(video).unwrap();
        assert!(node.playing);
        assert_eq!(node.position, Duration::ZERO);
    }

    #[test]
    fn test_leave_stops_video() {
        let dir = test_support::temp_dir("video-leave");
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let slide = video_slide(&dir);
        let mut rt = m.materialize(&mut scene, &slide);
        let video = rt.background.as_ref().unwrap().node();
        m.show(&mut scene, &slide, &mut rt);
        scene.settle();

        m.leave(&mut scene, &slide, &mut rt, false);
        assert!(!scene.node(video).unwrap().playing);
        assert!(!scene.has_playing_media());
        let position = scene.node(video).unwrap().position;
        scene.settle();
        assert_eq!(scene.node(video).unwrap().position, position);
        assert_eq!(scene.props(video).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_leave_skips_slide_whose_script_failed() {
        let dir = test_support::temp_dir("leave-missing");
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![dir]);
        let mut slide = test_support::color_slide("red", "C");
        slide.transition = Some("wipe".to_string());
        let mut rt = m.materialize(&mut scene, &slide);
        assert!(!m.show(&mut scene, &slide, &mut rt));

        let before = scene.snapshot();
        m.leave(&mut scene, &slide, &mut rt, false);
        m.leave(&mut scene, &slide, &mut rt, true);
        assert_eq!(scene.snapshot(), before);
        assert_eq!(scene.animations_started(), 0);
        assert_eq!(rt.phase, SlidePhase::Resting);
    }

    #[cfg(unix)]
    #[test]
    fn test_relayout_does_not_rerun_command() {
        let dir = test_support::temp_dir("relayout");
        let log = dir.join("runs");
        let mut scene = test_support::scene();
        let mut m = machine(&mut scene, vec![]);
        let mut slide = test_support::color_slide("red", "cmd");
        slide.command = Some(format!("echo run >> '{}'", log.display()));
        let mut rt = m.materialize(&mut scene, &slide);

        assert!(m.show(&mut scene, &slide, &mut rt));
        assert!(m.relayout(&mut scene, &slide, &mut rt));
        assert_eq!(std::fs::read_to_string(&log).unwrap().lines().count(), 1);
    }
}
