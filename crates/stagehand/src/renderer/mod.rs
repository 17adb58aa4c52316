pub mod paint;
pub mod scene;

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::color::Color;
use crate::deck::{FontSpec, TextAlign};
use crate::layout::Size;

pub use scene::{EstimatedMeasure, NodeKind, SceneGraph, TextMeasure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(pub u64);

/// A partial set of node properties. Unset fields are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeProps {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub depth: Option<f32>,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    /// Fraction in `[0, 1]`.
    pub opacity: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub color: Option<Color>,
}

impl NodeProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, x: f32, y: f32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.scale_x = Some(scale);
        self.scale_y = Some(scale);
        self
    }

    pub fn scale_xy(mut self, scale_x: f32, scale_y: f32) -> Self {
        self.scale_x = Some(scale_x);
        self.scale_y = Some(scale_y);
        self
    }

    pub fn depth(mut self, depth: f32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.width = Some(size.width);
        self.height = Some(size.height);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseOutQuint,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseInQuad => t * t,
            Self::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::EaseInCubic => t * t * t,
            Self::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
        }
    }
}

/// A property animation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub props: NodeProps,
    pub duration_ms: u32,
    pub easing: Easing,
}

impl Animation {
    pub fn new(duration_ms: u32, easing: Easing, props: NodeProps) -> Self {
        Self {
            props,
            duration_ms,
            easing,
        }
    }

    pub fn linear(duration_ms: u32, props: NodeProps) -> Self {
        Self::new(duration_ms, Easing::Linear, props)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub text: String,
    pub font: FontSpec,
    pub color: Color,
    pub align: TextAlign,
}

/// A parsed SVG document ready to be drawn, rendered supersampled for
/// anti-aliasing.
#[derive(Clone)]
pub struct PreparedSvg {
    pub tree: Arc<usvg::Tree>,
    pub supersample: u32,
}

impl std::fmt::Debug for PreparedSvg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = self.tree.size();
        f.debug_struct("PreparedSvg")
            .field("width", &size.width())
            .field("height", &size.height())
            .field("supersample", &self.supersample)
            .finish()
    }
}

/// Window-level requests the core can make of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    ToggleFullscreen,
    Quit,
}

pub trait Renderer {
    /// The stage node every layer hangs off.
    fn root(&self) -> NodeId;
    fn stage_size(&self) -> Size;
    fn set_stage_color(&mut self, color: Color);

    fn create_container(&mut self, parent: NodeId) -> NodeId;
    fn create_rectangle(&mut self, parent: NodeId, color: Color) -> NodeId;
    fn create_text(&mut self, parent: NodeId, text: &TextSpec) -> NodeId;
    fn create_image(&mut self, parent: NodeId, path: &Path, natural: Size) -> NodeId;
    fn create_video(&mut self, parent: NodeId, path: &Path, placeholder: Size) -> NodeId;
    fn create_vector_scene(&mut self, parent: NodeId, svg: PreparedSvg) -> NodeId;

    /// Unscaled size of a node.
    fn node_size(&self, node: NodeId) -> Size;
    /// Assign properties immediately, superseding any animation of them.
    fn set_props(&mut self, node: NodeId, props: &NodeProps);
    /// Start animating towards `animation.props`. The returned id is reported
    /// back by the host when the animation finishes or is superseded.
    fn animate(&mut self, node: NodeId, animation: &Animation) -> AnimationId;

    /// Move `node` from the `from` container into `to`, keeping its
    /// properties.
    fn reparent(&mut self, node: NodeId, from: NodeId, to: NodeId);
    fn raise_top(&mut self, node: NodeId);
    fn set_visible(&mut self, node: NodeId, visible: bool);

    fn set_playing(&mut self, node: NodeId, playing: bool);
    fn seek_to_start(&mut self, node: NodeId);

    /// Destroy a node and everything below it.
    fn destroy(&mut self, node: NodeId);

    fn request(&mut self, request: HostRequest);
}
