/// Text measurement for layout.
use serde::Serialize;
use tracing::debug;

use crate::render::font::{Font, preview};

/// Advance used to estimate width when a font cannot be measured
pub const FALLBACK_ADVANCE: u32 = 8;

/// Pixel-space box, max exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Ink box of a rendered glyph run, relative to the pen origin at the top
/// of the line. Drawing at (x - bearing_x, y - bearing_y) puts the ink's
/// top-left corner exactly at (x, y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    /// Heuristic size; the font could not measure this text
    pub estimated: bool,
}

impl TextMetrics {
    pub fn from_bounds(bounds: Bounds) -> Self {
        Self {
            width: (bounds.max_x - bounds.min_x).max(0) as u32,
            height: (bounds.max_y - bounds.min_y).max(0) as u32,
            bearing_x: bounds.min_x,
            bearing_y: bounds.min_y,
            estimated: false,
        }
    }

    /// Pen y that vertically centers the ink in a surface of `height`
    pub fn centered_y(&self, height: u32) -> i32 {
        (height as i32 - self.height as i32).div_euclid(2) - self.bearing_y
    }

    /// Pen origin that centers the ink in a `width` x `height` surface
    pub fn centered_origin(&self, width: u32, height: u32) -> (i32, i32) {
        let x = (width as i32 - self.width as i32).div_euclid(2) - self.bearing_x;
        (x, self.centered_y(height))
    }

    /// Fixed-advance guess used when real metrics are unavailable
    pub fn estimate(text: &str, font_size: u32) -> Self {
        Self {
            width: text.chars().count() as u32 * FALLBACK_ADVANCE,
            height: font_size,
            bearing_x: 0,
            bearing_y: 0,
            estimated: true,
        }
    }
}

/// Measure `text`, falling back to the fixed-advance estimate.
pub fn measure(text: &str, font: &Font) -> TextMetrics {
    match font.measure(text) {
        Ok(metrics) => metrics,
        Err(e) => {
            debug!("Estimating size of '{}': {}", preview(text), e);
            TextMetrics::estimate(text, font.size_px())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_measure() {
        let font = Font::builtin(8);
        // Two 5px glyphs on a 6px advance
        let metrics = measure("Hi", &font);
        assert_eq!(metrics.width, 11);
        assert_eq!(metrics.height, 7);
        assert_eq!(metrics.bearing_x, 0);
        assert!(!metrics.estimated);
    }

    #[test]
    fn test_builtin_scales_with_size() {
        let small = measure("Hi", &Font::builtin(8));
        let large = measure("Hi", &Font::builtin(16));
        assert_eq!(large.width, small.width * 2);
        assert_eq!(large.height, small.height * 2);
    }

    #[test]
    fn test_unmeasurable_text_is_estimated() {
        let font = Font::builtin(12);
        let metrics = measure("   ", &font);
        assert!(metrics.estimated);
        assert_eq!(metrics.width, 3 * FALLBACK_ADVANCE);
        assert_eq!(metrics.height, 12);
    }

    #[test]
    fn test_centered_origin() {
        let metrics = TextMetrics {
            width: 40,
            height: 7,
            ..TextMetrics::default()
        };
        assert_eq!(metrics.centered_origin(128, 32), (44, 12));

        // Ink that starts below the line top is pulled up by its bearing
        let offset = TextMetrics {
            bearing_x: 2,
            bearing_y: 3,
            ..metrics
        };
        assert_eq!(offset.centered_origin(128, 32), (42, 9));

        // Wider than the surface: floor division keeps the ink centered
        let wide = TextMetrics {
            width: 131,
            height: 7,
            ..TextMetrics::default()
        };
        assert_eq!(wide.centered_origin(128, 32).0, -2);
    }

    #[test]
    fn test_bounds_union() {
        let a = Bounds::new(0, 2, 5, 7);
        let b = Bounds::new(6, 0, 11, 9);
        assert_eq!(a.union(b), Bounds::new(0, 0, 11, 9));
        assert_eq!(TextMetrics::from_bounds(a.union(b)).width, 11);
    }
}
