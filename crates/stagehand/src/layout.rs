use crate::deck::{BackgroundScale, TextPosition};

/// Fraction of the stage the text block may occupy on either axis.
const TEXT_FILL: f32 = 0.8;
/// Margin between the stage edge and text anchored to that edge.
const EDGE_MARGIN: f32 = 0.05;
/// Shading padding as a fraction of the stage width.
const SHADING_PADDING: f32 = 0.01;
const MIN_SHADING_PADDING: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }
}

/// Where a background lands and how much it is scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundPlacement {
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Where a text block lands and its uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl TextPlacement {
    /// The on-stage box covered by text of the given natural size.
    pub fn bounds(&self, text: Size) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: text.width * self.scale,
            height: text.height * self.scale,
        }
    }
}

/// Text narrower than this is treated as empty.
pub fn is_empty_text(text: Size) -> bool {
    text.width <= 1.0
}

pub fn background_placement(
    stage: Size,
    content: Size,
    mode: BackgroundScale,
) -> BackgroundPlacement {
    if content.width <= 0.0 || content.height <= 0.0 {
        return BackgroundPlacement {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        };
    }

    let w_scale = stage.width / content.width;
    let h_scale = stage.height / content.height;

    let scale = match mode {
        BackgroundScale::Fill => w_scale.max(h_scale),
        BackgroundScale::Fit => w_scale.min(h_scale),
        BackgroundScale::Unscaled => w_scale.min(h_scale).min(1.0),
        BackgroundScale::Stretch => {
            return BackgroundPlacement {
                x: 0.0,
                y: 0.0,
                scale_x: w_scale,
                scale_y: h_scale,
            };
        }
    };

    BackgroundPlacement {
        x: (stage.width - content.width * scale) / 2.0,
        y: (stage.height - content.height * scale) / 2.0,
        scale_x: scale,
        scale_y: scale,
    }
}

pub fn text_placement(stage: Size, text: Size, position: TextPosition) -> TextPlacement {
    let scale = if is_empty_text(text) || text.height <= 0.0 {
        1.0
    } else {
        let sx = stage.width / text.width * TEXT_FILL;
        let sy = stage.height / text.height * TEXT_FILL;
        // Text is shrunk to fit but never enlarged.
        sx.min(sy).min(1.0)
    };

    let w = text.width * scale;
    let h = text.height * scale;

    let x = if position.is_east() {
        stage.width * (1.0 - EDGE_MARGIN) - w
    } else if position.is_west() {
        stage.width * EDGE_MARGIN
    } else {
        (stage.width - w) / 2.0
    };

    let y = if position.is_south() {
        stage.height * (1.0 - EDGE_MARGIN) - h
    } else if position.is_north() {
        stage.height * EDGE_MARGIN
    } else {
        (stage.height - h) / 2.0
    };

    TextPlacement { x, y, scale }
}

/// Padding added on every side of the text box by [`shading_bounds`].
pub fn shading_padding(stage: Size) -> f32 {
    (stage.width * SHADING_PADDING).max(MIN_SHADING_PADDING)
}

pub fn shading_bounds(stage: Size, placement: TextPlacement, text: Size) -> Rect {
    if is_empty_text(text) {
        return Rect {
            x: placement.x,
            y: placement.y,
            width: 0.0,
            height: 0.0,
        };
    }

    let pad = shading_padding(stage);
    let bounds = placement.bounds(text);
    Rect {
        x: bounds.x - pad,
        y: bounds.y - pad,
        width: bounds.width + pad * 2.0,
        height: bounds.height + pad * 2.0,
    }
}
