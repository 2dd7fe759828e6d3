pub mod font;
pub mod metrics;
pub mod plugins;
pub mod scene;
pub mod scroll;
pub mod sink;
