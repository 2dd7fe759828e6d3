pub mod display;

use std::path::PathBuf;

pub use display::{DisplayConfig, RawDisplayConfig, Rgb, ScrollPolicy};

/// Host-side configuration for the frame pump binary
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub output_mode: OutputMode,
    pub output_path: PathBuf,
    /// Display config JSON, re-read on `:reload`
    pub config_path: Option<PathBuf>,
    /// Stop after this many frames
    pub frame_limit: Option<u64>,
    /// Stop once the controller's recommended display duration has elapsed
    pub cycle: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Save a frame as PNG every few seconds (for testing)
    #[default]
    Png,
    /// Output raw RGB pixels to stdout (for piping into a matrix driver)
    Raw,
    /// Render without output
    Discard,
}

impl std::str::FromStr for OutputMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(OutputMode::Png),
            "raw" | "stdout" => Ok(OutputMode::Raw),
            "none" | "null" | "discard" => Ok(OutputMode::Discard),
            _ => Err(format!("Unknown output mode: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parse() {
        assert_eq!("PNG".parse::<OutputMode>(), Ok(OutputMode::Png));
        assert_eq!("stdout".parse::<OutputMode>(), Ok(OutputMode::Raw));
        assert_eq!("none".parse::<OutputMode>(), Ok(OutputMode::Discard));
        assert!("framebuffer".parse::<OutputMode>().is_err());
    }
}
