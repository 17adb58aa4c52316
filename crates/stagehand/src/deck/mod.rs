pub mod markup;

use std::path::PathBuf;

use crate::color::Color;

pub use markup::{DeckParser, MarkupParser};

/// An ordered set of slides, replaced wholesale on live reload.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn new(slides: Vec<Slide>) -> Self {
        Self { slides }
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub background: BackgroundSource,
    pub background_scale: BackgroundScale,
    pub text: String,
    pub font: FontSpec,
    pub text_color: String,
    pub text_align: TextAlign,
    pub position: TextPosition,
    pub shading_color: String,
    /// Fraction in `[0, 1]`.
    pub shading_opacity: f32,
    pub stage_color: Option<String>,
    pub command: Option<String>,
    /// Scripted transition name; `None` selects the built-in transition.
    pub transition: Option<String>,
}

impl Default for Slide {
    fn default() -> Self {
        Self {
            background: BackgroundSource::Color("black".to_string()),
            background_scale: BackgroundScale::Fit,
            text: String::new(),
            font: FontSpec::default(),
            text_color: "white".to_string(),
            text_align: TextAlign::Left,
            position: TextPosition::Center,
            shading_color: "black".to_string(),
            shading_opacity: 0.66,
            stage_color: None,
            command: None,
            transition: None,
        }
    }
}

impl Slide {
    /// Resolved text color; unparsable specs fall back to white.
    pub fn text_color(&self) -> Color {
        Color::parse(&self.text_color).unwrap_or(Color::WHITE)
    }

    /// Resolved shading color; unparsable specs fall back to black.
    pub fn shading_color(&self) -> Color {
        Color::parse(&self.shading_color).unwrap_or(Color::BLACK)
    }
}

/// Where a slide background comes from. A slide has exactly one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundSource {
    Color(String),
    Image(PathBuf),
    Video(PathBuf),
    VectorScene(PathBuf),
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "ogg", "ogv", "mp4", "mkv", "mov", "webm", "mpg", "mpeg",
];

impl BackgroundSource {
    /// Classify a background reference by file extension.
    pub fn classify(reference: &str, path: PathBuf) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image(path)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video(path)
        } else if ext == "svg" {
            Self::VectorScene(path)
        } else {
            Self::Color(reference.to_string())
        }
    }
}

/// How a background is fitted to the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundScale {
    /// Contain: the whole background is visible.
    #[default]
    Fit,
    /// Cover: the stage is completely covered.
    Fill,
    /// Contain, but never enlarge.
    Unscaled,
    /// Independent axis scaling to the stage size.
    Stretch,
}

impl BackgroundScale {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "fit" => Some(Self::Fit),
            "fill" => Some(Self::Fill),
            "unscaled" => Some(Self::Unscaled),
            "stretch" => Some(Self::Stretch),
            _ => None,
        }
    }
}

/// Line alignment inside a multi-line text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Gravity of the text block on the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPosition {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TextPosition {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "center" => Some(Self::Center),
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "top-left" => Some(Self::TopLeft),
            "top-right" => Some(Self::TopRight),
            "bottom-left" => Some(Self::BottomLeft),
            "bottom-right" => Some(Self::BottomRight),
            _ => None,
        }
    }

    pub fn is_east(self) -> bool {
        matches!(self, Self::Right | Self::TopRight | Self::BottomRight)
    }

    pub fn is_west(self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    pub fn is_north(self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }

    pub fn is_south(self) -> bool {
        matches!(self, Self::Bottom | Self::BottomLeft | Self::BottomRight)
    }
}

/// A font reference such as `"Sans 60px"` or `"Monospace Bold 32px"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size_px: f32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Sans".to_string(),
            size_px: 60.0,
        }
    }
}

impl FontSpec {
    /// Parse the trailing size token (`px`, `pt` or bare number). Anything
    /// before it is the family. A missing size keeps the default.
    pub fn parse(spec: &str) -> Self {
        let mut words: Vec<&str> = spec.split_whitespace().collect();
        let size = words.last().and_then(|last| {
            if let Some(px) = last.strip_suffix("px") {
                px.parse::<f32>().ok()
            } else if let Some(pt) = last.strip_suffix("pt") {
                pt.parse::<f32>().ok().map(|pt| pt * 96.0 / 72.0)
            } else {
                last.parse::<f32>().ok()
            }
        });
        let size_px = match size {
            Some(size) if size > 0.0 => {
                words.pop();
                size
            }
            _ => Self::default().size_px,
        };
        let family = if words.is_empty() {
            Self::default().family
        } else {
            words.join(" ")
        };
        Self { family, size_px }
    }

    pub fn is_monospace(&self) -> bool {
        let family = self.family.to_ascii_lowercase();
        family.contains("mono") || family.contains("courier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_parse() {
        let font = FontSpec::parse("Sans Bold 48px");
        assert_eq!(font.family, "Sans Bold");
        assert_eq!(font.size_px, 48.0);

        let font = FontSpec::parse("Serif 24pt");
        assert_eq!(font.size_px, 32.0);

        let font = FontSpec::parse("Monospace");
        assert_eq!(font.family, "Monospace");
        assert_eq!(font.size_px, 60.0);
        assert!(font.is_monospace());
    }

    #[test]
    fn test_background_classification() {
        let img = BackgroundSource::classify("logo.PNG", PathBuf::from("/d/logo.PNG"));
        assert!(matches!(img, BackgroundSource::Image(_)));
        let vid = BackgroundSource::classify("clip.ogv", PathBuf::from("/d/clip.ogv"));
        assert!(matches!(vid, BackgroundSource::Video(_)));
        let svg = BackgroundSource::classify("art.svg", PathBuf::from("/d/art.svg"));
        assert!(matches!(svg, BackgroundSource::VectorScene(_)));
        let color = BackgroundSource::classify("#ff0000", PathBuf::from("/d/#ff0000"));
        assert_eq!(color, BackgroundSource::Color("#ff0000".to_string()));
    }

    #[test]
    fn test_gravity_groups() {
        assert!(TextPosition::TopRight.is_east());
        assert!(TextPosition::TopRight.is_north());
        assert!(!TextPosition::Center.is_west());
        assert!(!TextPosition::Center.is_south());
    }
}
