//! Text display for LED matrices: static text when it fits, a pre-rendered
//! scrolling scene when it doesn't.
pub mod config;
pub mod core;
pub mod error;
pub mod render;

pub use render::plugins::{DisplayInfo, MatrixSize, RenderOutcome, TextDisplayController};
