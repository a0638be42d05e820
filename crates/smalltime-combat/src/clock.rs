//! Fixed-step simulation clock.
//!
//! Turns variable frame deltas into a number of fixed steps plus one variable
//! step. The simulation runs the fixed steps first, then the variable one.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ClockConfig;

/// What one frame should run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FramePlan {
    /// Number of fixed steps to run
    pub fixed_steps: u32,
    /// Fixed step length
    pub fixed_dt: f32,
    /// Delta for the variable step (clamped frame delta)
    pub variable_dt: f32,
}

/// Accumulator-based fixed timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    /// Fixed timestep delta
    fixed_dt: f32,
    /// Fixed steps allowed per frame
    max_steps: u32,
    /// Maximum delta time to prevent spiral of death
    max_frame_dt: f32,
    /// Accumulator for fixed timestep
    accumulator: f32,
    /// Fixed steps run since creation
    fixed_steps: u64,
    /// Simulated seconds since creation
    elapsed: f64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(&ClockConfig::default())
    }
}

impl SimulationClock {
    /// Create a clock from config.
    #[must_use]
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            fixed_dt: config.fixed_dt.max(0.001),
            max_steps: config.max_steps_per_frame.max(1),
            max_frame_dt: config.max_frame_dt.max(config.fixed_dt),
            accumulator: 0.0,
            fixed_steps: 0,
            elapsed: 0.0,
        }
    }

    /// Fixed timestep value.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Fixed steps run since creation.
    #[must_use]
    pub fn fixed_steps(&self) -> u64 {
        self.fixed_steps
    }

    /// Simulated seconds since creation.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Fraction of a fixed step left in the accumulator, for render
    /// interpolation.
    #[must_use]
    pub fn interpolation_alpha(&self) -> f32 {
        (self.accumulator / self.fixed_dt).clamp(0.0, 1.0)
    }

    /// Accumulate a frame delta and plan the steps to run.
    pub fn accumulate(&mut self, frame_dt: f32) -> FramePlan {
        // Clamp to prevent spiral of death
        let dt = frame_dt.clamp(0.0, self.max_frame_dt);
        self.accumulator += dt;

        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < self.max_steps {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // If we're still behind, drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            warn!(
                backlog = self.accumulator,
                "simulation falling behind, dropping accumulated time"
            );
            self.accumulator = 0.0;
        }

        FramePlan {
            fixed_steps: count,
            fixed_dt: self.fixed_dt,
            variable_dt: dt,
        }
    }

    /// Record a fixed step that was run.
    pub fn record_fixed_step(&mut self, dt: f32) {
        self.fixed_steps += 1;
        self.elapsed += f64::from(dt);
    }

    /// Drop any accumulated time (after a pause or load).
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
