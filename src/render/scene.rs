/// Off-screen scene buffer: the text pre-rendered into an RGB strip with
/// padding and a gap, sampled frame by frame by the scroll engine.
use image::{Rgb as Pixel, RgbImage};
use tracing::info;

use crate::config::Rgb;
use crate::error::RenderError;
use crate::render::font::{Font, preview};
use crate::render::metrics::TextMetrics;

/// Widest strip we are willing to allocate
pub const MAX_SCENE_WIDTH: u64 = 1 << 16;

/// Horizontal layout of the strip: `lead_pad | text | trail_pad | gap`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneLayout {
    pub lead_pad: u32,
    pub trail_pad: u32,
    pub gap: u32,
}

impl SceneLayout {
    /// Text enters fully off-screen right and leaves fully off-screen left
    pub fn padded(matrix_width: u32, gap: u32) -> Self {
        Self {
            lead_pad: matrix_width,
            trail_pad: matrix_width,
            gap,
        }
    }

    /// Text followed directly by the gap
    pub fn tight(gap: u32) -> Self {
        Self {
            lead_pad: 0,
            trail_pad: 0,
            gap,
        }
    }

    pub fn width(&self, text_width: u32) -> u64 {
        self.lead_pad as u64 + text_width as u64 + self.trail_pad as u64 + self.gap as u64
    }
}

pub struct SceneBuffer {
    image: RgbImage,
    metrics: TextMetrics,
}

impl SceneBuffer {
    /// Render `text` into a fresh strip `matrix_height` tall, left-anchored
    /// after the lead pad and vertically centered.
    pub fn build(
        text: &str,
        font: &Font,
        text_color: Rgb,
        background: Rgb,
        matrix_height: u32,
        layout: SceneLayout,
    ) -> Result<Self, RenderError> {
        let metrics = font.measure(text)?;
        if metrics.width == 0 {
            return Err(RenderError::Unmeasurable(preview(text)));
        }

        let width = layout.width(metrics.width);
        if width > MAX_SCENE_WIDTH || matrix_height == 0 {
            return Err(RenderError::BufferTooLarge {
                width,
                height: matrix_height,
            });
        }

        let mut image = RgbImage::from_pixel(width as u32, matrix_height, Pixel(background));
        let x = layout.lead_pad as i32 - metrics.bearing_x;
        let y = metrics.centered_y(matrix_height);
        font.draw(&mut image, x, y, text, text_color);

        info!("Created text cache: {}x{}", width, matrix_height);
        Ok(Self { image, metrics })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }
}
