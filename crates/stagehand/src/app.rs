use eframe::egui;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::config::Config;
use crate::deck::{DeckParser, MarkupParser};
use crate::input::{KeyEvent, keysym};
use crate::layout::Size;
use crate::navigator::SlideNavigator;
use crate::reload::LiveReloadCoordinator;
use crate::remote::RemoteControl;
use crate::remote::http::{self, HttpOptions};
use crate::renderer::paint::{self, EguiMeasure, TextureCache};
use crate::renderer::{HostRequest, SceneGraph};
use crate::transition::TransitionSearchPath;

/// Settings for one presentation run, after CLI flags are parsed.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub file: PathBuf,
    pub windowed: bool,
    /// 1-indexed.
    pub slide: Option<usize>,
    pub http_port: Option<u16>,
    pub password: Option<String>,
    pub transitions_dir: Option<PathBuf>,
}

impl RunOptions {
    /// Fill unset options from the config file. Flags win.
    pub fn merge(mut self, config: &Config) -> Self {
        self.windowed = self.windowed || config.windowed();
        if self.http_port.is_none() {
            self.http_port = config.http_port();
        }
        if self.password.is_none() {
            self.password = config.password().map(str::to_string);
        }
        if self.transitions_dir.is_none() {
            self.transitions_dir = config.transitions_dir().map(PathBuf::from);
        }
        self
    }

    fn start_index(&self) -> usize {
        self.slide.map_or(0, |s| s.saturating_sub(1))
    }
}

/// Map an egui key to the keysym the input table understands.
fn keysym_for(key: egui::Key) -> Option<u32> {
    use egui::Key;
    Some(match key {
        Key::ArrowLeft => keysym::LEFT,
        Key::ArrowUp => keysym::UP,
        Key::ArrowRight => keysym::RIGHT,
        Key::ArrowDown => keysym::DOWN,
        Key::Backspace => keysym::BACKSPACE,
        Key::PageUp => keysym::PAGE_UP,
        Key::PageDown => keysym::PAGE_DOWN,
        Key::Space => keysym::SPACE,
        Key::Enter => keysym::RETURN,
        Key::Escape => keysym::ESCAPE,
        Key::F11 => keysym::F11,
        _ => return None,
    })
}

struct StagehandApp {
    scene: SceneGraph,
    navigator: SlideNavigator,
    reload: Option<LiveReloadCoordinator>,
    remote: Receiver<KeyEvent>,
    textures: TextureCache,
    /// Slide to show once the first frame has sized the stage.
    pending_start: Option<usize>,
    last_frame: Instant,
}

impl StagehandApp {
    fn handle_key(&mut self, event: KeyEvent) {
        if let Some(command) = event.command() {
            self.navigator.handle(&mut self.scene, command);
        }
    }

    fn poll_reload(&mut self) {
        let Some(reload) = &self.reload else {
            return;
        };
        if let Err(e) = reload.poll(&mut self.scene, &mut self.navigator) {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    }

    fn advance_clock(&mut self) {
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;
        for id in self.scene.tick(dt) {
            self.navigator.animation_finished(&mut self.scene, id);
        }
    }
}

impl eframe::App for StagehandApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Collect key events first, handle them after the input closure
        // (navigation may lay out text, which reads the font atlas)
        let mut keys: Vec<KeyEvent> = Vec::new();
        let fullscreen = ctx.input(|i| {
            for event in &i.events {
                if let egui::Event::Key {
                    key,
                    pressed,
                    repeat: false,
                    ..
                } = event
                {
                    if let Some(code) = keysym_for(*key) {
                        keys.push(if *pressed {
                            KeyEvent::Press(code)
                        } else {
                            KeyEvent::Release(code)
                        });
                    }
                }
            }
            i.viewport().fullscreen.unwrap_or(false)
        });

        let stage_rect = ctx.available_rect();
        let resized = self.scene.set_stage_size(Size::new(
            stage_rect.width(),
            stage_rect.height(),
        ));
        if let Some(index) = self.pending_start.take() {
            self.navigator.start(&mut self.scene, index);
        } else if resized {
            self.navigator.resize(&mut self.scene);
        }

        for key in keys {
            self.handle_key(key);
        }
        while let Ok(key) = self.remote.try_recv() {
            self.handle_key(key);
        }
        self.poll_reload();
        self.advance_clock();

        // Send viewport commands outside the input closure
        for request in self.scene.take_requests() {
            let cmd = match request {
                HostRequest::Quit => {
                    self.navigator.finalize(&mut self.scene);
                    egui::ViewportCommand::Close
                }
                HostRequest::ToggleFullscreen => egui::ViewportCommand::Fullscreen(!fullscreen),
            };
            ctx.send_viewport_cmd(cmd);
        }

        let decoding = self.textures.sync(ctx, &self.scene);
        let stage_color = self.scene.stage_color();
        let bg = egui::Color32::from_rgba_unmultiplied(
            stage_color.r,
            stage_color.g,
            stage_color.b,
            stage_color.a,
        );
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(bg).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let painter = ui.painter_at(rect);
                paint::paint(ctx, &painter, rect.min, &self.scene, &mut self.textures);
            });

        if self.scene.is_animating() || self.scene.has_playing_media() || decoding {
            ctx.request_repaint();
        }
    }
}

/// Present `options.file` until the window closes.
pub fn run(options: RunOptions) -> anyhow::Result<()> {
    let options = options.merge(&Config::load_or_default());

    let content = std::fs::read_to_string(&options.file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", options.file.display()))?;
    let parser = MarkupParser::for_file(&options.file);
    let deck = parser.parse(&content);
    if deck.is_empty() {
        anyhow::bail!("No slides found in {}", options.file.display());
    }
    tracing::info!(slides = deck.len(), file = %options.file.display(), "loaded deck");

    let file_name = options
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "stagehand".to_string());
    let title = format!("stagehand: {file_name}");

    let viewport = if options.windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(&title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(&title)
    };
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    // Background threads wake the event loop through the context once it exists.
    let egui_ctx: Arc<OnceLock<egui::Context>> = Arc::new(OnceLock::new());
    let waker = {
        let egui_ctx = egui_ctx.clone();
        move || {
            if let Some(ctx) = egui_ctx.get() {
                ctx.request_repaint();
            }
        }
    };

    let (remote, remote_rx) = RemoteControl::channel();
    let remote = remote.with_waker(waker.clone());
    if let Some(port) = options.http_port {
        let http_options = HttpOptions {
            port,
            password: options.password.clone(),
        };
        // The server thread lives for the rest of the process.
        http::spawn(http_options, remote)?;
    }

    let reload = match LiveReloadCoordinator::new(&options.file, Box::new(parser)).watch(waker) {
        Ok(reload) => Some(reload),
        Err(e) => {
            tracing::warn!("live reload disabled: {e:#}");
            None
        }
    };

    let search = TransitionSearchPath::new(options.transitions_dir.clone());
    let start = options.start_index();

    eframe::run_native(
        &title,
        native_options,
        Box::new(move |cc| {
            let _ = egui_ctx.set(cc.egui_ctx.clone());
            let mut scene = SceneGraph::with_measure(
                Size::new(1280.0, 720.0),
                Box::new(EguiMeasure::new(cc.egui_ctx.clone())),
            );
            let navigator = SlideNavigator::new(&mut scene, deck, search);
            let app = StagehandApp {
                scene,
                navigator,
                reload,
                remote: remote_rx,
                textures: TextureCache::new(),
                pending_start: Some(start),
                last_frame: Instant::now(),
            };
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
