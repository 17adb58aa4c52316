use std::path::PathBuf;

/// A color specification that could not be understood.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("invalid color specification '{spec}'")]
pub struct ColorParseError {
    pub spec: String,
}

/// Failure to materialize a slide background.
#[derive(thiserror::Error, Debug)]
pub enum MediaLoadError {
    #[error("could not open image {path}: {message}")]
    Image { path: PathBuf, message: String },

    #[error("could not open SVG file {path}: {message}")]
    VectorScene { path: PathBuf, message: String },

    #[error("video file {path} does not exist")]
    Video { path: PathBuf },

    #[error(transparent)]
    Color(#[from] ColorParseError),
}

impl MediaLoadError {
    pub fn image(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Image {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn vector_scene(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::VectorScene {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Failure to locate or load a transition description.
#[derive(thiserror::Error, Debug)]
pub enum TransitionLoadError {
    #[error("no {name}.json found in any transition search directory")]
    NotFound { name: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
