pub mod text;

pub use text::{ConfigUpdate, DisplayInfo, MatrixSize, RenderOutcome, TextDisplayController};
