//! Fixed-timestep driver for the map ("Fix Your Timestep").
//!
//! The map is advanced in fixed steps taken from an accumulator so that
//! animations progress identically whatever the frame rate. Frame time comes
//! either from the wall clock or, for headless runs, from a simulated clock.

use std::time::Instant;

use tracing::warn;

/// Fixed simulation timestep: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Longer frames are clamped to this, accepting slowdown over a burst of
/// catch-up steps.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Accumulator state of the fixed-timestep loop.
#[derive(Debug)]
pub struct GameLoop {
    previous_time: Instant,
    accumulator: f64,
    total_sim_time: f64,
    frame_count: u64,
    update_count: u64,
}

impl GameLoop {
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            accumulator: 0.0,
            total_sim_time: 0.0,
            frame_count: 0,
            update_count: 0,
        }
    }

    /// Run one frame using the wall-clock time since the previous call.
    pub fn tick<E>(
        &mut self,
        update_fn: impl FnMut(f64, f64) -> Result<(), E>,
        render_fn: impl FnMut(f64),
    ) -> Result<(), E> {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time, update_fn, render_fn)
    }

    /// Run one frame of `frame_time` seconds.
    ///
    /// `update_fn(fixed_dt, total_sim_time)` runs zero or more times at the
    /// fixed rate and stops the frame on the first error. `render_fn(alpha)`
    /// runs once with the interpolation alpha in `[0, 1)`.
    pub fn advance<E>(
        &mut self,
        frame_time: f64,
        mut update_fn: impl FnMut(f64, f64) -> Result<(), E>,
        mut render_fn: impl FnMut(f64),
    ) -> Result<(), E> {
        let mut frame_time = frame_time.max(0.0);
        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
        }

        self.accumulator += frame_time;
        while self.accumulator >= FIXED_DT {
            update_fn(FIXED_DT, self.total_sim_time)?;
            self.total_sim_time += FIXED_DT;
            self.accumulator -= FIXED_DT;
            self.update_count += 1;
        }

        render_fn(self.alpha());
        self.frame_count += 1;
        Ok(())
    }

    pub fn alpha(&self) -> f64 {
        if self.accumulator > 0.0 {
            self.accumulator / FIXED_DT
        } else {
            0.0
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Simulated seconds so far.
    pub fn total_sim_time(&self) -> f64 {
        self.total_sim_time
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}
