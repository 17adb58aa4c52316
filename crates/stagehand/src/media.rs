use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use crate::color::Color;
use crate::deck::BackgroundSource;
use crate::error::MediaLoadError;
use crate::layout::Size;
use crate::renderer::{NodeId, NodeProps, PreparedSvg, Renderer};

/// Size given to videos until real dimensions are known.
pub const VIDEO_PLACEHOLDER: Size = Size::new(400.0, 300.0);
/// Vector scenes are rasterized at this multiple of their natural size.
pub const SVG_SUPERSAMPLE: u32 = 2;

const MAX_RASTER_DIM: u32 = 16_384;

static SYSTEM_FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundMedia {
    Color { node: NodeId, color: Color },
    Image { node: NodeId, path: PathBuf },
    Video { node: NodeId, path: PathBuf },
    VectorScene { node: NodeId, path: PathBuf },
}

impl BackgroundMedia {
    /// Create the background node for `source` under `parent`.
    pub fn create(
        renderer: &mut dyn Renderer,
        parent: NodeId,
        source: &BackgroundSource,
    ) -> Result<Self, MediaLoadError> {
        match source {
            BackgroundSource::Color(spec) => {
                let color = Color::parse(spec)?;
                let node = renderer.create_rectangle(parent, color);
                let stage = renderer.stage_size();
                renderer.set_props(node, &NodeProps::new().size(stage));
                Ok(Self::Color { node, color })
            }
            BackgroundSource::Image(path) => {
                let (w, h) = image::image_dimensions(path)
                    .map_err(|e| MediaLoadError::image(path, e))?;
                let node = renderer.create_image(parent, path, Size::new(w as f32, h as f32));
                Ok(Self::Image {
                    node,
                    path: path.clone(),
                })
            }
            BackgroundSource::Video(path) => {
                if !path.is_file() {
                    return Err(MediaLoadError::Video { path: path.clone() });
                }
                let node = renderer.create_video(parent, path, VIDEO_PLACEHOLDER);
                Ok(Self::Video {
                    node,
                    path: path.clone(),
                })
            }
            BackgroundSource::VectorScene(path) => {
                let svg = load_svg(path)?;
                let node = renderer.create_vector_scene(parent, svg);
                Ok(Self::VectorScene {
                    node,
                    path: path.clone(),
                })
            }
        }
    }

    pub fn node(&self) -> NodeId {
        match self {
            Self::Color { node, .. }
            | Self::Image { node, .. }
            | Self::Video { node, .. }
            | Self::VectorScene { node, .. } => *node,
        }
    }

    pub fn is_time_based(&self) -> bool {
        matches!(self, Self::Video { .. })
    }

    /// Flat backgrounds always cover the whole stage.
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Color { .. })
    }

    /// Size used for layout: the stage for flat colors, otherwise the
    /// media's natural size.
    pub fn content_size(&self, renderer: &dyn Renderer) -> Size {
        if self.is_flat() {
            renderer.stage_size()
        } else {
            renderer.node_size(self.node())
        }
    }

    pub fn set_playing(&self, renderer: &mut dyn Renderer, playing: bool) {
        if self.is_time_based() {
            renderer.set_playing(self.node(), playing);
        }
    }

    pub fn reset_to_start(&self, renderer: &mut dyn Renderer) {
        if self.is_time_based() {
            renderer.seek_to_start(self.node());
        }
    }

    pub fn destroy(self, renderer: &mut dyn Renderer) {
        if self.is_time_based() {
            renderer.set_playing(self.node(), false);
        }
        renderer.destroy(self.node());
    }
}

/// Parse an SVG file, resolving relative resources next to it.
pub fn load_svg(path: &Path) -> Result<PreparedSvg, MediaLoadError> {
    let bytes = std::fs::read(path).map_err(|e| MediaLoadError::vector_scene(path, e))?;
    let opts = usvg::Options {
        resources_dir: path.parent().map(Path::to_path_buf),
        fontdb: SYSTEM_FONTS.clone(),
        ..Default::default()
    };
    let tree =
        usvg::Tree::from_data(&bytes, &opts).map_err(|e| MediaLoadError::vector_scene(path, e))?;
    Ok(PreparedSvg {
        tree: Arc::new(tree),
        supersample: SVG_SUPERSAMPLE,
    })
}

/// Rasterize into premultiplied RGBA at the supersampled resolution.
/// Returns `(width, height, pixels)`.
pub fn rasterize_svg(svg: &PreparedSvg) -> Option<(u32, u32, Vec<u8>)> {
    let size = svg.tree.size();
    let factor = svg.supersample.max(1) as f32;
    let width = (size.width() * factor).ceil() as u32;
    let height = (size.height() * factor).ceil() as u32;
    if width == 0 || height == 0 || width > MAX_RASTER_DIM || height > MAX_RASTER_DIM {
        return None;
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)?;
    let transform = resvg::tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&svg.tree, transform, &mut pixmap.as_mut());
    Some((width, height, pixmap.data().to_vec()))
}
