/// Full-featured scroller: matrix-width padding on both sides of the text
/// so it enters and leaves fully off-screen, plus display duration estimates.
use crate::config::ScrollPolicy;
use crate::render::scene::SceneLayout;

use super::{ScrollEngine, ScrollParams, ScrollPhase, ScrollState};

pub struct PaddedLoopScroller {
    state: ScrollState,
}

impl PaddedLoopScroller {
    pub fn new(params: ScrollParams) -> Self {
        Self {
            state: ScrollState::new(params),
        }
    }
}

impl ScrollEngine for PaddedLoopScroller {
    fn policy(&self) -> ScrollPolicy {
        ScrollPolicy::PaddedLoop
    }

    fn layout(&self, matrix_width: u32, gap: u32) -> SceneLayout {
        SceneLayout::padded(matrix_width, gap)
    }

    fn state(&self) -> &ScrollState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ScrollState {
        &mut self.state
    }

    fn dynamic_duration(&self) -> Option<f32> {
        let params = self.state.params();
        if !params.duration.enabled || self.state.phase() == ScrollPhase::Idle {
            return None;
        }
        Some(estimate_duration(self.state.total_width(), params))
    }
}

/// Seconds for one pass over `total_width`, padded by the safety buffer and
/// clamped into the configured range. A non-positive speed never finishes,
/// so it maps to the maximum.
pub fn estimate_duration(total_width: u32, params: &ScrollParams) -> f32 {
    let tuning = &params.duration;
    if params.speed <= 0.0 || !params.speed.is_finite() {
        return tuning.max_secs;
    }
    let steps = total_width as f32 / params.speed;
    let secs = steps * params.step_interval() * (1.0 + tuning.buffer);
    if !secs.is_finite() {
        return tuning.max_secs;
    }
    secs.max(tuning.min_secs).min(tuning.max_secs)
}
