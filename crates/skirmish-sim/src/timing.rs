//! Simulation step timing.
//!
//! The battle always advances in fixed steps. In real-time mode the loop
//! measures wall-clock time, accumulates it, and runs as many fixed steps
//! as have elapsed; otherwise it simply runs steps back to back.

use std::time::{Duration, Instant};

/// Fixed-timestep accumulator.
#[derive(Debug)]
pub struct FixedTimestep {
    /// Duration of one simulation step (seconds)
    fixed_dt: f32,
    /// Wall-clock time not yet consumed by steps
    accumulator: f32,
    /// Maximum real delta accepted per frame
    max_dt: f32,
    /// Time of last frame start
    last_frame: Instant,
}

impl FixedTimestep {
    /// Create a timestep running `tick_rate` steps per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate.max(1) as f32,
            accumulator: 0.0,
            max_dt: 0.25, // Drop time after a long stall instead of catching up
            last_frame: Instant::now(),
        }
    }

    /// Duration of one step.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Measure the wall-clock time since the previous call.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt.min(self.max_dt)
    }

    /// Accumulate time and return how many fixed steps are due.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt;
        let mut count = 0;

        let max_updates = 10;
        while self.accumulator >= self.fixed_dt && count < max_updates {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind after the cap: give up on the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Sleep until roughly one step's worth of wall-clock time has passed.
    pub fn sleep_remainder(&self) {
        let budget = Duration::from_secs_f32(self.fixed_dt);
        let elapsed = self.last_frame.elapsed();
        if elapsed < budget {
            std::thread::sleep(budget - elapsed);
        }
    }
}
