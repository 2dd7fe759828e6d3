/// Error taxonomy for the text display.
/// None of these are fatal: config errors substitute defaults, font errors
/// fall back to the built-in font, render errors fall back to static drawing.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("No text specified")]
    MissingText,

    #[error("Invalid {field}: {reason}")]
    InvalidColor { field: &'static str, reason: String },

    #[error("Invalid {field}: {reason}")]
    InvalidNumber { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum FontLoadError {
    #[error("Font file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported font type: {0}")]
    UnsupportedExtension(String),

    #[error("Failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse font {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Nothing to render: text is empty")]
    EmptyText,

    #[error("Font produced no measurable glyphs for '{0}'")]
    Unmeasurable(String),

    #[error("Scene buffer of {width}x{height} exceeds the supported size")]
    BufferTooLarge { width: u64, height: u32 },
}
