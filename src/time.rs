//! Frame timing for the scene loop.
//!
//! [`Time`] measures the variable frame delta that the controllers and the
//! colour animators consume. [`FixedStep`] turns that variable delta into a
//! whole number of fixed physics sub-steps, carrying the remainder over to
//! the next frame.
//!
//! # Example
//!
//! ```ignore
//! use connectors::time::{FixedStep, Time};
//!
//! let mut time = Time::new();
//! let mut stepper = FixedStep::new(1.0 / 60.0, 4);
//!
//! // In your frame loop:
//! let dt = time.update();
//! for _ in 0..stepper.advance(dt) {
//!     world.step(stepper.step());
//! }
//! ```

use std::time::{Duration, Instant};

/// Longest frame delta handed to the scene, in seconds.
///
/// A window drag or a breakpoint can stall the loop for seconds; feeding
/// that straight into the colour damping and the fixed-step accumulator
/// would make the whole scene jump.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Frame clock for the render loop.
#[derive(Debug)]
pub struct Time {
    start: Instant,
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    unscaled_delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    time_scale: f32,
}

impl Time {
    /// Create a new clock starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            unscaled_delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            time_scale: 1.0,
        }
    }

    /// Advance the clock. Call once per frame.
    ///
    /// Returns the scaled, clamped delta for this frame (0 while paused).
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.unscaled_delta_secs = raw_delta.min(MAX_FRAME_DELTA);
        self.delta_secs = if self.paused {
            0.0
        } else {
            raw_delta.min(MAX_FRAME_DELTA) * self.time_scale
        };
        self.elapsed_secs += self.delta_secs;
        self.delta_secs
    }

    /// Scene time in seconds, excluding paused spans.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Delta of the last [`update`](Self::update).
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Clamped wall-clock delta of the last update, ignoring pause and
    /// time scale. Camera easing runs on this.
    #[inline]
    pub fn unscaled_delta(&self) -> f32 {
        self.unscaled_delta_secs
    }

    /// Frames since start, paused frames included.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Set time scale multiplier. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Wall-clock time since the clock was created.
    #[inline]
    pub fn wall_time(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-timestep accumulator for the physics world.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f32,
    max_steps: u32,
    accumulator: f32,
}

impl FixedStep {
    /// `step` is the sub-step length in seconds, `max_steps` caps how many
    /// sub-steps a single frame may run.
    pub fn new(step: f32, max_steps: u32) -> Self {
        Self {
            step,
            max_steps: max_steps.max(1),
            accumulator: 0.0,
        }
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    #[inline]
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Unconsumed time, always in `[0, step)` after [`advance`](Self::advance).
    #[inline]
    pub fn remainder(&self) -> f32 {
        self.accumulator
    }

    /// Add a frame delta and return how many sub-steps to run now.
    ///
    /// When the backlog exceeds `max_steps` the excess is dropped so a slow
    /// frame cannot snowball into ever longer physics work.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if dt > 0.0 {
            self.accumulator += dt;
        }
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.step {
            self.accumulator %= self.step;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert!(!time.is_paused());
        assert_eq!(time.time_scale(), 1.0);
    }

    #[test]
    fn test_time_update_clamps_long_frames() {
        let mut time = Time::new();
        thread::sleep(Duration::from_millis(150));
        let delta = time.update();

        assert!(delta > 0.0);
        assert!(delta <= MAX_FRAME_DELTA);
        assert_eq!(time.frame(), 1);
    }

    #[test]
    fn test_paused_time_yields_zero_delta() {
        let mut time = Time::new();
        time.update();
        time.set_paused(true);

        let elapsed_before = time.elapsed();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(time.update(), 0.0);
        assert_eq!(time.elapsed(), elapsed_before);
    }

    #[test]
    fn test_time_scale_clamps_negative() {
        let mut time = Time::new();
        time.set_time_scale(2.0);
        assert_eq!(time.time_scale(), 2.0);
        time.set_time_scale(-1.0);
        assert_eq!(time.time_scale(), 0.0);
    }

    #[test]
    fn test_fixed_step_carries_remainder() {
        let mut stepper = FixedStep::new(0.25, 8);
        assert_eq!(stepper.advance(0.625), 2);
        assert_eq!(stepper.remainder(), 0.125);
        assert_eq!(stepper.advance(0.125), 1);
        assert_eq!(stepper.remainder(), 0.0);
    }

    #[test]
    fn test_fixed_step_drops_backlog_beyond_max() {
        let mut stepper = FixedStep::new(0.1, 3);
        assert_eq!(stepper.advance(1.05), 3);
        assert!(stepper.remainder() < stepper.step());
    }

    #[test]
    fn test_fixed_step_ignores_non_positive_delta() {
        let mut stepper = FixedStep::new(0.1, 3);
        assert_eq!(stepper.advance(0.0), 0);
        assert_eq!(stepper.advance(-1.0), 0);
        assert_eq!(stepper.remainder(), 0.0);
    }
}
