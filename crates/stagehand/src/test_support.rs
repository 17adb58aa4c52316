use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::deck::{BackgroundSource, Deck, Slide};
use crate::layout::Size;
use crate::renderer::SceneGraph;

pub const STAGE: Size = Size::new(1600.0, 900.0);

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// A fresh, empty directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "stagehand-test-{}-{label}-{n}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::new(width, height).save(&path).unwrap();
    path
}

pub const SQUARE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20">
  <rect width="40" height="20" fill="red"/>
</svg>"#;

pub fn scene() -> SceneGraph {
    SceneGraph::new(STAGE)
}

pub fn color_slide(color: &str, text: &str) -> Slide {
    Slide {
        background: BackgroundSource::Color(color.to_string()),
        text: text.to_string(),
        ..Slide::default()
    }
}

pub fn text_deck(texts: &[&str]) -> Deck {
    Deck::new(texts.iter().map(|t| color_slide("black", t)).collect())
}

pub const SLIDE_IN: &str = r#"{
    "background": { "opacity": 1.0 },
    "midground": {},
    "foreground": { "x": 0.0 },
    "state": {
        "duration": 600,
        "easing": "ease-out-quint",
        "states": {
            "pre":  { "foreground": { "x": 1600.0, "opacity": 0.0 } },
            "show": { "foreground": { "x": 0.0, "opacity": 1.0 } },
            "post": { "foreground": { "x": -1600.0, "opacity": 0.0 } }
        }
    }
}"#;
