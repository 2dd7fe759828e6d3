/// Scroll engines: advance a position over a pre-rendered scene and sample
/// the matrix-wide window at that position.
pub mod padded;
pub mod state;
pub mod tight;

use image::RgbImage;
use std::time::Instant;

use crate::config::ScrollPolicy;
use crate::render::scene::SceneLayout;

pub use padded::PaddedLoopScroller;
pub use state::{Advance, ScrollParams, ScrollPhase, ScrollState};
pub use tight::TightWrapScroller;

/// Capability interface the controller drives. Implementations differ in
/// scene layout and in whether they can estimate a display duration.
pub trait ScrollEngine {
    fn policy(&self) -> ScrollPolicy;

    /// How the scene buffer should be laid out for this engine
    fn layout(&self, matrix_width: u32, gap: u32) -> SceneLayout;

    fn state(&self) -> &ScrollState;

    fn state_mut(&mut self) -> &mut ScrollState;

    /// Recommended on-screen seconds for one scroll cycle, if supported
    fn dynamic_duration(&self) -> Option<f32> {
        None
    }

    fn configure(&mut self, params: ScrollParams) {
        self.state_mut().configure(params);
    }

    fn start(&mut self, total_width: u32, matrix_width: u32) -> bool {
        self.state_mut().start(total_width, matrix_width)
    }

    fn advance(&mut self, now: Instant) -> Advance {
        self.state_mut().advance(now)
    }

    fn reset(&mut self) {
        self.state_mut().reset();
    }

    fn phase(&self) -> ScrollPhase {
        self.state().phase()
    }

    fn position(&self) -> f32 {
        self.state().position()
    }

    /// Copy the visible window at the current position into `out`.
    fn sample(&self, scene: &RgbImage, out: &mut RgbImage) {
        sample_into(scene, self.position(), out);
    }
}

pub fn create_engine(policy: ScrollPolicy, params: ScrollParams) -> Box<dyn ScrollEngine> {
    match policy {
        ScrollPolicy::PaddedLoop => Box::new(PaddedLoopScroller::new(params)),
        ScrollPolicy::TightWrap => Box::new(TightWrapScroller::new(params)),
    }
}

/// Copy an `out.width()` window of `scene` starting at `floor(position)`.
/// A window running past the right edge continues from column 0. A scene
/// narrower than `out` is centered and the remaining pixels are left as-is.
pub fn sample_into(scene: &RgbImage, position: f32, out: &mut RgbImage) {
    let scene_width = scene.width() as usize;
    let out_width = out.width() as usize;
    let rows = scene.height().min(out.height()) as usize;
    if scene_width == 0 || out_width == 0 {
        return;
    }

    let src: &[u8] = scene.as_raw();
    let src_stride = scene_width * 3;
    let dst_stride = out_width * 3;
    let dst: &mut [u8] = &mut **out;

    if scene_width < out_width {
        let x0 = (out_width - scene_width) / 2;
        for y in 0..rows {
            let src_row = &src[y * src_stride..(y + 1) * src_stride];
            let dst_row = &mut dst[y * dst_stride..(y + 1) * dst_stride];
            dst_row[x0 * 3..(x0 + scene_width) * 3].copy_from_slice(src_row);
        }
        return;
    }

    let start = position.max(0.0).floor() as usize % scene_width;
    let head = (scene_width - start).min(out_width);
    let tail = out_width - head;
    for y in 0..rows {
        let src_row = &src[y * src_stride..(y + 1) * src_stride];
        let dst_row = &mut dst[y * dst_stride..(y + 1) * dst_stride];
        dst_row[..head * 3].copy_from_slice(&src_row[start * 3..(start + head) * 3]);
        if tail > 0 {
            dst_row[head * 3..].copy_from_slice(&src_row[..tail * 3]);
        }
    }
}
