use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use eframe::egui::{self, Color32, FontFamily, FontId, Pos2, TextureHandle};

use super::{NodeId, TextSpec};
use super::scene::{DrawItem, NodeKind, SceneGraph, TextMeasure};
use crate::color::Color;
use crate::deck::{FontSpec, TextAlign};
use crate::layout::Size;
use crate::media;

const VIDEO_FILL: Color32 = Color32::from_rgb(0x20, 0x20, 0x20);
const VIDEO_LABEL: Color32 = Color32::from_rgb(0xcc, 0xcc, 0xcc);

/// Text metrics from egui's own font atlas, so measured and painted
/// sizes agree.
pub struct EguiMeasure {
    ctx: egui::Context,
}

impl EguiMeasure {
    pub fn new(ctx: egui::Context) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for EguiMeasure {
    fn measure(&self, text: &TextSpec) -> Size {
        let painter = egui::Painter::new(
            self.ctx.clone(),
            egui::LayerId::background(),
            egui::Rect::EVERYTHING,
        );
        let galley = painter.layout_no_wrap(
            text.text.clone(),
            font_id(&text.font, text.font.size_px),
            Color32::WHITE,
        );
        let size = galley.size();
        Size::new(size.x, size.y)
    }
}

fn font_id(font: &FontSpec, size: f32) -> FontId {
    let family = if font.is_monospace() {
        FontFamily::Monospace
    } else {
        FontFamily::Proportional
    };
    FontId::new(size.max(1.0), family)
}

fn color32(color: Color, opacity: f32) -> Color32 {
    let alpha = (color.a as f32 * opacity).round().clamp(0.0, 255.0) as u8;
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, alpha)
}

enum Slot {
    Pending,
    Ready(TextureHandle),
    Failed,
}

/// Textures for image and vector nodes. Images decode on worker threads and
/// show up on a later frame; vector scenes rasterize on first paint.
pub struct TextureCache {
    slots: HashMap<NodeId, Slot>,
    tx: Sender<(NodeId, PathBuf, Option<egui::ColorImage>)>,
    rx: Receiver<(NodeId, PathBuf, Option<egui::ColorImage>)>,
}

impl Default for TextureCache {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            slots: HashMap::new(),
            tx,
            rx,
        }
    }
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload finished decodes and forget nodes that left the scene.
    /// Returns whether decodes are still outstanding.
    pub fn sync(&mut self, ctx: &egui::Context, scene: &SceneGraph) -> bool {
        while let Ok((node, path, image)) = self.rx.try_recv() {
            if !scene.contains(node) {
                self.slots.remove(&node);
                continue;
            }
            let slot = match image {
                Some(image) => Slot::Ready(ctx.load_texture(
                    path.display().to_string(),
                    image,
                    egui::TextureOptions::LINEAR,
                )),
                None => Slot::Failed,
            };
            self.slots.insert(node, slot);
        }
        self.slots.retain(|node, _| scene.contains(*node));
        self.slots.values().any(|s| matches!(s, Slot::Pending))
    }

    fn get_or_load(&mut self, ctx: &egui::Context, item: &DrawItem<'_>) -> Option<&TextureHandle> {
        if !self.slots.contains_key(&item.node) {
            let slot = match item.kind {
                NodeKind::Image(path) => {
                    self.decode(ctx, item.node, path);
                    Slot::Pending
                }
                NodeKind::VectorScene(svg) => match media::rasterize_svg(svg) {
                    Some((width, height, rgba)) => {
                        let image = egui::ColorImage::from_rgba_premultiplied(
                            [width as usize, height as usize],
                            &rgba,
                        );
                        Slot::Ready(ctx.load_texture(
                            format!("svg-{}", item.node.0),
                            image,
                            egui::TextureOptions::LINEAR,
                        ))
                    }
                    None => {
                        tracing::warn!("could not rasterize vector background");
                        Slot::Failed
                    }
                },
                _ => return None,
            };
            self.slots.insert(item.node, slot);
        }
        match self.slots.get(&item.node) {
            Some(Slot::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    fn decode(&self, ctx: &egui::Context, node: NodeId, path: &Path) {
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        let path = path.to_path_buf();
        let spawned = std::thread::Builder::new()
            .name("image-decode".into())
            .spawn(move || {
                let image = match image::open(&path) {
                    Ok(img) => {
                        let rgba = img.to_rgba8();
                        let size = [rgba.width() as usize, rgba.height() as usize];
                        Some(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
                    }
                    Err(e) => {
                        tracing::warn!("failed to decode {}: {e}", path.display());
                        None
                    }
                };
                if tx.send((node, path, image)).is_ok() {
                    ctx.request_repaint();
                }
            });
        if let Err(e) = spawned {
            tracing::warn!("failed to spawn image decoder: {e}");
        }
    }
}

/// Paint the scene's draw list with the stage's top-left corner at `origin`.
pub fn paint(
    ctx: &egui::Context,
    painter: &egui::Painter,
    origin: Pos2,
    scene: &SceneGraph,
    textures: &mut TextureCache,
) {
    for item in scene.draw_list() {
        let rect = egui::Rect::from_min_size(
            origin + egui::vec2(item.rect.x, item.rect.y),
            egui::vec2(item.rect.width, item.rect.height),
        );
        match item.kind {
            NodeKind::Stage | NodeKind::Container => {}
            NodeKind::Rectangle => {
                painter.rect_filled(rect, 0.0, color32(item.color, item.opacity));
            }
            NodeKind::Text(spec) => paint_text(painter, rect, spec, &item),
            NodeKind::Image(_) | NodeKind::VectorScene(_) => {
                if let Some(texture) = textures.get_or_load(ctx, &item) {
                    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    painter.image(
                        texture.id(),
                        rect,
                        uv,
                        color32(Color::WHITE, item.opacity),
                    );
                }
            }
            NodeKind::Video(path) => paint_video(painter, rect, path, &item),
        }
    }
}

fn paint_text(painter: &egui::Painter, rect: egui::Rect, spec: &TextSpec, item: &DrawItem<'_>) {
    let font = font_id(&spec.font, spec.font.size_px * item.scale_y);
    let color = color32(item.color, item.opacity);
    let mut y = rect.top();
    for line in spec.text.split('\n') {
        let galley = painter.layout_no_wrap(line.to_string(), font.clone(), color);
        let width = galley.size().x;
        let x = match spec.align {
            TextAlign::Left => rect.left(),
            TextAlign::Center => rect.center().x - width / 2.0,
            TextAlign::Right => rect.right() - width,
        };
        let height = galley.size().y;
        painter.galley(egui::pos2(x, y), galley, color);
        y += height;
    }
}

fn paint_video(painter: &egui::Painter, rect: egui::Rect, path: &Path, item: &DrawItem<'_>) {
    painter.rect_filled(rect, 0.0, VIDEO_FILL.gamma_multiply(item.opacity));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let secs = item.position.as_secs();
    let label = format!("{name}  {}:{:02}", secs / 60, secs % 60);
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        label,
        FontId::proportional((20.0 * item.scale_y).max(1.0)),
        VIDEO_LABEL.gamma_multiply(item.opacity),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversion_applies_opacity() {
        let c = color32(Color::rgba(255, 0, 0, 255), 0.5);
        assert_eq!(c.a(), 128);
        assert_eq!(color32(Color::BLACK, 0.0).a(), 0);
    }

    #[test]
    fn test_monospace_font_family() {
        let mono = FontSpec::parse("Monospace 20px");
        assert_eq!(font_id(&mono, 20.0).family, FontFamily::Monospace);
        let sans = FontSpec::parse("Sans 20px");
        assert_eq!(font_id(&sans, 0.0).size, 1.0);
    }

    #[test]
    fn test_egui_measure_inside_a_pass() {
        let ctx = egui::Context::default();
        let mut sizes = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            let measure = EguiMeasure::new(ctx.clone());
            let spec = |text: &str| TextSpec {
                text: text.to_string(),
                font: FontSpec::parse("Sans 20px"),
                color: Color::WHITE,
                align: TextAlign::Left,
            };
            sizes.push(measure.measure(&spec("Hi")));
            sizes.push(measure.measure(&spec("Hi\nthere")));
        });
        assert!(sizes[0].width > 0.0);
        assert!(sizes[1].width > sizes[0].width);
        assert!(sizes[1].height > sizes[0].height);
    }
}
