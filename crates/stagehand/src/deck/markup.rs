//! Line-oriented deck markup.
//!
//! ```text
//! # comments start with a hash
//! [font=Sans 50px] [text-color=white]      deck-wide defaults
//!
//! -- [photo.jpg] [fill] [bottom]
//! Text of the first slide
//!
//! -- [#202040] [transition=sheet] [command="notify-send [done]"]
//! Second slide
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{BackgroundScale, BackgroundSource, Deck, FontSpec, Slide, TextAlign, TextPosition};

/// `[option]`. Double quotes protect a `]` inside, as in `[command="echo [x]"]`.
static OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[((?:[^\]"]|"[^"]*")*)\]"#).unwrap());

/// Turns deck source text into a [`Deck`]. Live reload goes through this seam.
pub trait DeckParser {
    fn parse(&self, content: &str) -> Deck;
}

impl<F> DeckParser for F
where
    F: Fn(&str) -> Deck,
{
    fn parse(&self, content: &str) -> Deck {
        self(content)
    }
}

/// The built-in markup, resolving media paths against a base directory.
#[derive(Debug, Clone)]
pub struct MarkupParser {
    base_path: PathBuf,
}

impl MarkupParser {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Parser for a deck file, resolving relative to the file's directory.
    pub fn for_file(file: &Path) -> Self {
        Self::new(file.parent().unwrap_or(Path::new(".")))
    }
}

impl DeckParser for MarkupParser {
    fn parse(&self, content: &str) -> Deck {
        parse(content, &self.base_path)
    }
}

pub fn parse(content: &str, base_path: &Path) -> Deck {
    let content = content.replace("\r\n", "\n");

    let mut defaults = Slide::default();
    let mut slides = Vec::new();
    let mut current: Option<(Slide, Vec<&str>)> = None;

    for line in content.split('\n') {
        if let Some(rest) = line.strip_prefix("--") {
            if let Some((slide, lines)) = current.take() {
                slides.push(finish(slide, &lines));
            }
            let mut slide = defaults.clone();
            apply_options(&mut slide, rest, base_path);
            current = Some((slide, Vec::new()));
            continue;
        }

        if line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix('\\').filter(|l| l.starts_with('#')).unwrap_or(line);

        match current.as_mut() {
            Some((_, lines)) => lines.push(line),
            None => {
                // Only bracketed lines mean something in the header.
                if line.trim_start().starts_with('[') {
                    apply_options(&mut defaults, line, base_path);
                }
            }
        }
    }

    if let Some((slide, lines)) = current.take() {
        slides.push(finish(slide, &lines));
    }

    Deck::new(slides)
}

fn finish(mut slide: Slide, lines: &[&str]) -> Slide {
    slide.text = lines
        .join("\n")
        .trim_matches('\n')
        .trim_end()
        .to_string();
    slide
}

fn apply_options(slide: &mut Slide, text: &str, base_path: &Path) {
    for cap in OPTION.captures_iter(text) {
        let option = cap[1].trim();
        if option.is_empty() {
            continue;
        }

        if let Some((key, value)) = option.split_once('=') {
            let value = unquote(value.trim());
            match key.trim() {
                "font" => slide.font = FontSpec::parse(value),
                "text-color" => slide.text_color = value.to_string(),
                "text-align" => match TextAlign::from_keyword(value) {
                    Some(align) => slide.text_align = align,
                    None => tracing::warn!("unknown text-align '{value}'"),
                },
                "shading-color" => slide.shading_color = value.to_string(),
                "shading-opacity" => match value.parse::<f32>() {
                    Ok(opacity) => slide.shading_opacity = opacity.clamp(0.0, 1.0),
                    Err(_) => tracing::warn!("invalid shading-opacity '{value}'"),
                },
                "stage-color" => slide.stage_color = Some(value.to_string()),
                "transition" => slide.transition = Some(value.to_string()),
                "command" => slide.command = Some(value.to_string()),
                other => tracing::warn!("unknown option '{other}'"),
            }
            continue;
        }

        let option = unquote(option);
        if let Some(position) = TextPosition::from_keyword(option) {
            slide.position = position;
        } else if let Some(scale) = BackgroundScale::from_keyword(option) {
            slide.background_scale = scale;
        } else {
            slide.background = BackgroundSource::classify(option, base_path.join(option));
        }
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
