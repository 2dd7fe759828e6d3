/// Minimal scroller: no padding, the text wraps straight into the gap and
/// back. Has no duration estimate.
use crate::config::ScrollPolicy;
use crate::render::scene::SceneLayout;

use super::{ScrollEngine, ScrollParams, ScrollState};

pub struct TightWrapScroller {
    state: ScrollState,
}

impl TightWrapScroller {
    pub fn new(params: ScrollParams) -> Self {
        Self {
            state: ScrollState::new(params),
        }
    }
}

impl ScrollEngine for TightWrapScroller {
    fn policy(&self) -> ScrollPolicy {
        ScrollPolicy::TightWrap
    }

    fn layout(&self, _matrix_width: u32, gap: u32) -> SceneLayout {
        SceneLayout::tight(gap)
    }

    fn state(&self) -> &ScrollState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ScrollState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::time::{Duration, Instant};

    #[test]
    fn test_tight_layout_has_no_padding() {
        let engine = TightWrapScroller::new(ScrollParams::default());
        let layout = engine.layout(128, 32);
        assert_eq!(layout.width(120), 152);
        assert_eq!(engine.dynamic_duration(), None);
    }

    #[test]
    fn test_text_visible_from_first_frame_and_wraps_into_gap() {
        // 12px of text then a 4px gap
        let scene = RgbImage::from_fn(16, 1, |x, _| {
            if x < 12 { Rgb([255, x as u8, 0]) } else { Rgb([0, 0, 0]) }
        });
        let mut engine = TightWrapScroller::new(ScrollParams {
            speed: 1.0,
            delay: Duration::from_millis(1),
            ..ScrollParams::default()
        });
        assert!(engine.start(16, 8));

        let mut out = RgbImage::new(8, 1);
        engine.sample(&scene, &mut out);
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0]);

        let mut now = Instant::now();
        for _ in 0..10 {
            engine.advance(now);
            now += Duration::from_millis(1);
        }
        engine.sample(&scene, &mut out);
        // Columns 10..16 then 0..2 of the strip
        assert_eq!(out.get_pixel(0, 0).0, [255, 10, 0]);
        assert_eq!(out.get_pixel(2, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(6, 0).0, [255, 0, 0]);
    }
}
