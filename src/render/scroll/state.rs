/// Scroll position bookkeeping shared by every scroll policy.
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::display::{DisplayConfig, DurationTuning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollPhase {
    /// Not scrolling; position pinned at 0
    Idle,
    Scrolling,
    /// One-shot scroll reached end of travel; position is frozen
    Complete,
}

/// What a single `advance` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Idle or already complete
    Inactive,
    /// Too soon after the previous step
    Throttled,
    Stepped,
    /// Stepped and reached end of travel (one-shot, reported once)
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollParams {
    /// Pixels moved per step
    pub speed: f32,
    /// Minimum time between steps
    pub delay: Duration,
    pub target_fps: f32,
    pub looping: bool,
    pub duration: DurationTuning,
}

impl ScrollParams {
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            speed: config.scroll_speed,
            delay: delay_from_secs(config.scroll_delay),
            target_fps: config.target_fps,
            looping: config.scroll_loop,
            duration: config.duration,
        }
    }

    /// Seconds per effective step: frames can't come faster than the
    /// target rate, steps can't come faster than the delay.
    pub fn step_interval(&self) -> f32 {
        let frame = if self.target_fps > 0.0 {
            1.0 / self.target_fps
        } else {
            0.0
        };
        frame.max(self.delay.as_secs_f32())
    }
}

/// Negative or NaN delays mean "no delay"; an overflowing one saturates.
fn delay_from_secs(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs.max(0.0)).unwrap_or(Duration::MAX)
}

impl Default for ScrollParams {
    fn default() -> Self {
        Self::from_config(&DisplayConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct ScrollState {
    position: f32,
    total_width: u32,
    matrix_width: u32,
    phase: ScrollPhase,
    last_step: Option<Instant>,
    params: ScrollParams,
}

impl ScrollState {
    pub fn new(params: ScrollParams) -> Self {
        Self {
            position: 0.0,
            total_width: 0,
            matrix_width: 0,
            phase: ScrollPhase::Idle,
            last_step: None,
            params,
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn total_width(&self) -> u32 {
        self.total_width
    }

    pub fn params(&self) -> &ScrollParams {
        &self.params
    }

    /// Position at which a one-shot scroll stops
    pub fn end_of_travel(&self) -> f32 {
        self.total_width.saturating_sub(self.matrix_width) as f32
    }

    /// Swap speed/delay/loop settings without losing the current position.
    pub fn configure(&mut self, params: ScrollParams) {
        self.params = params;
        match self.phase {
            ScrollPhase::Complete if params.looping => {
                debug!("Loop enabled, resuming scroll at {:.1}", self.position);
                self.phase = ScrollPhase::Scrolling;
            }
            ScrollPhase::Scrolling => {
                self.apply_bounds();
            }
            _ => {}
        }
    }

    /// Enter scrolling over a strip of `total_width` on a `matrix_width` display.
    /// Returns false (and stays idle) when the strip is narrower than the matrix.
    /// An engine already scrolling keeps its position, re-bounded to the new width.
    pub fn start(&mut self, total_width: u32, matrix_width: u32) -> bool {
        if total_width == 0 || total_width < matrix_width {
            self.reset();
            return false;
        }

        self.total_width = total_width;
        self.matrix_width = matrix_width;
        match self.phase {
            ScrollPhase::Idle => {
                self.position = 0.0;
                self.last_step = None;
                self.phase = ScrollPhase::Scrolling;
                debug!("Scrolling over {}px strip", total_width);
            }
            ScrollPhase::Scrolling => {
                self.apply_bounds();
            }
            ScrollPhase::Complete => self.position = self.end_of_travel(),
        }
        true
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.total_width = 0;
        self.phase = ScrollPhase::Idle;
        self.last_step = None;
    }

    /// Move one step forward unless throttled by the scroll delay.
    pub fn advance(&mut self, now: Instant) -> Advance {
        if self.phase != ScrollPhase::Scrolling {
            return Advance::Inactive;
        }
        if let Some(last) = self.last_step {
            if now.saturating_duration_since(last) < self.params.delay {
                return Advance::Throttled;
            }
        }
        self.last_step = Some(now);
        self.position += self.params.speed.max(0.0);

        if self.apply_bounds() {
            Advance::Completed
        } else {
            Advance::Stepped
        }
    }

    /// Wrap (looping) or clamp (one-shot) the position. Returns true on the
    /// transition into `Complete`.
    fn apply_bounds(&mut self) -> bool {
        let total = self.total_width as f32;
        if self.params.looping {
            if self.position >= total {
                // Exact modulo keeps the sub-pixel remainder across the seam
                self.position %= total;
            }
            return false;
        }

        let end = self.end_of_travel();
        if self.position >= end {
            self.position = end;
            if self.phase != ScrollPhase::Complete {
                self.phase = ScrollPhase::Complete;
                info!("Scroll complete at {:.0}px", end);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(speed: f32, looping: bool) -> ScrollParams {
        ScrollParams {
            speed,
            delay: Duration::from_millis(10),
            target_fps: 100.0,
            looping,
            duration: DurationTuning::default(),
        }
    }

    /// Advance `steps` times, each 10ms apart
    fn run(state: &mut ScrollState, start: Instant, steps: u32) -> Instant {
        let mut now = start;
        for _ in 0..steps {
            state.advance(now);
            now += Duration::from_millis(10);
        }
        now
    }

    #[test]
    fn test_idle_until_started() {
        let mut state = ScrollState::new(params(1.0, true));
        assert_eq!(state.advance(Instant::now()), Advance::Inactive);
        assert_eq!(state.position(), 0.0);
        assert!(!state.start(100, 128));
        assert_eq!(state.phase(), ScrollPhase::Idle);
        assert!(state.start(408, 128));
        assert_eq!(state.phase(), ScrollPhase::Scrolling);
    }

    #[test]
    fn test_throttle() {
        let mut state = ScrollState::new(params(1.0, true));
        state.start(408, 128);
        let t0 = Instant::now();
        assert_eq!(state.advance(t0), Advance::Stepped);
        assert_eq!(state.advance(t0 + Duration::from_millis(5)), Advance::Throttled);
        assert_eq!(state.position(), 1.0);
        assert_eq!(state.advance(t0 + Duration::from_millis(10)), Advance::Stepped);
        assert_eq!(state.position(), 2.0);
    }

    #[test]
    fn test_loop_wraps_with_exact_modulo() {
        let mut state = ScrollState::new(params(2.5, true));
        state.start(10, 4);
        run(&mut state, Instant::now(), 5);
        // 10.0 wraps to 0.0, then one more step
        assert_eq!(state.position(), 2.5);
        assert_eq!(state.phase(), ScrollPhase::Scrolling);
    }

    #[test]
    fn test_full_cycle_returns_to_start() {
        let mut state = ScrollState::new(params(1.0, true));
        state.start(408, 128);
        run(&mut state, Instant::now(), 408);
        assert_eq!(state.position(), 0.0);
    }

    #[test]
    fn test_one_shot_completes_once() {
        let mut state = ScrollState::new(params(3.0, false));
        state.start(20, 8);
        let t0 = Instant::now();
        let mut completions = 0;
        for i in 0..10 {
            if state.advance(t0 + Duration::from_millis(10 * i)) == Advance::Completed {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(state.phase(), ScrollPhase::Complete);
        assert_eq!(state.position(), 12.0);
        assert_eq!(state.advance(t0 + Duration::from_secs(5)), Advance::Inactive);
        assert_eq!(state.position(), 12.0);
    }

    #[test]
    fn test_enabling_loop_resumes_completed_scroll() {
        let mut state = ScrollState::new(params(5.0, false));
        state.start(20, 8);
        run(&mut state, Instant::now(), 5);
        assert_eq!(state.phase(), ScrollPhase::Complete);

        state.configure(params(5.0, true));
        assert_eq!(state.phase(), ScrollPhase::Scrolling);
        state.advance(Instant::now() + Duration::from_secs(1));
        assert_eq!(state.position(), 17.0);
    }

    #[test]
    fn test_restart_keeps_position_within_new_width() {
        let mut state = ScrollState::new(params(1.0, true));
        state.start(408, 128);
        run(&mut state, Instant::now(), 300);
        assert!(state.start(200, 128));
        assert_eq!(state.position(), 100.0);
    }

    #[test]
    fn test_reset() {
        let mut state = ScrollState::new(params(1.0, true));
        state.start(408, 128);
        run(&mut state, Instant::now(), 10);
        state.reset();
        assert_eq!(state.position(), 0.0);
        assert_eq!(state.phase(), ScrollPhase::Idle);
    }

    #[test]
    fn test_unclamped_delay_does_not_panic() {
        let mut config = DisplayConfig::default();
        config.scroll_delay = -0.5;
        assert_eq!(ScrollParams::from_config(&config).delay, Duration::ZERO);
        config.scroll_delay = f32::NAN;
        assert_eq!(ScrollParams::from_config(&config).delay, Duration::ZERO);
        config.scroll_delay = f32::INFINITY;
        assert_eq!(ScrollParams::from_config(&config).delay, Duration::MAX);
    }

    #[test]
    fn test_step_interval() {
        let p = params(1.0, true);
        assert!((p.step_interval() - 0.01).abs() < 1e-6);
        let slow = ScrollParams {
            target_fps: 30.0,
            ..p
        };
        assert!((slow.step_interval() - 1.0 / 30.0).abs() < 1e-6);
    }
}
