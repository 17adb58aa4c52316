use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use anyhow::{Context, Result};
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};

use crate::deck::DeckParser;
use crate::navigator::SlideNavigator;
use crate::renderer::Renderer;

const DEBOUNCE: Duration = Duration::from_millis(250);

pub struct LiveReloadCoordinator {
    path: PathBuf,
    parser: Box<dyn DeckParser>,
    tx: Sender<()>,
    rx: Receiver<()>,
    watcher: Option<Debouncer<RecommendedWatcher>>,
}

impl LiveReloadCoordinator {
    pub fn new(path: impl Into<PathBuf>, parser: Box<dyn DeckParser>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            path: path.into(),
            parser,
            tx,
            rx,
            watcher: None,
        }
    }

    /// Start watching the source file. `wake` runs on the watcher thread
    /// after every change so the event loop can pick it up.
    pub fn watch(mut self, wake: impl Fn() + Send + 'static) -> Result<Self> {
        let tx = self.tx.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let ours = events
                        .iter()
                        .any(|e| e.path.file_name().map(|n| n.to_os_string()) == file_name);
                    if ours && tx.send(()).is_ok() {
                        wake();
                    }
                }
                Err(e) => tracing::warn!("file watch error: {e}"),
            }
        })
        .context("Failed to create file watcher")?;

        // Watch the directory: editors often replace the file on save.
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        tracing::debug!(path = %self.path.display(), "watching deck for changes");

        self.watcher = Some(debouncer);
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signal a change as if the watcher had seen one.
    pub fn notify(&self) {
        let _ = self.tx.send(());
    }

    /// Reload if a change was signalled since the last call. Returns whether
    /// a reload happened. An unreadable source is an error.
    pub fn poll(&self, renderer: &mut dyn Renderer, navigator: &mut SlideNavigator) -> Result<bool> {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        if changed {
            self.reload(renderer, navigator)?;
        }
        Ok(changed)
    }

    pub fn reload(&self, renderer: &mut dyn Renderer, navigator: &mut SlideNavigator) -> Result<()> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let deck = self.parser.parse(&content);
        tracing::info!(path = %self.path.display(), "reloading deck");
        navigator.reload(renderer, deck);
        Ok(())
    }
}
