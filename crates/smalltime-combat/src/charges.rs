//! Bounded charge pools (jumps, dashes).

use serde::{Deserialize, Serialize};

/// Slack when comparing the countdown to zero, absorbing drift from summing
/// frame deltas.
const REGEN_EPSILON: f32 = 1e-4;

/// A bounded counter that depletes on use.
///
/// A pool built with [`ChargePool::regenerating`] gains one charge per
/// `period` while below max. The countdown keeps its phase across charges,
/// so advancing exactly one period restores exactly one charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargePool {
    max: u32,
    current: u32,
    period: Option<f32>,
    cooldown: f32,
}

impl ChargePool {
    /// Full pool without regeneration (refilled externally).
    #[must_use]
    pub fn new(max: u32) -> Self {
        Self {
            max,
            current: max,
            period: None,
            cooldown: 0.0,
        }
    }

    /// Full pool that regains one charge every `period` seconds.
    #[must_use]
    pub fn regenerating(max: u32, period: f32) -> Self {
        Self {
            period: Some(period.max(0.0)),
            ..Self::new(max)
        }
    }

    /// Charges available.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Pool size.
    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Whether no charge is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Whether the pool is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Seconds until the next regenerated charge.
    #[must_use]
    pub fn cooldown_left(&self) -> f32 {
        self.cooldown
    }

    /// Spend one charge. Returns `false` when empty.
    pub fn consume(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Fill the pool to max.
    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// Restart the regeneration countdown from a full period.
    pub fn restart_cooldown(&mut self) {
        if let Some(period) = self.period {
            self.cooldown = period;
        }
    }

    /// Advance regeneration. Returns the number of charges gained.
    pub fn tick(&mut self, dt: f32) -> u32 {
        let Some(period) = self.period else {
            return 0;
        };
        if self.is_full() {
            return 0;
        }

        self.cooldown -= dt;
        let mut gained = 0;
        while self.cooldown <= REGEN_EPSILON && !self.is_full() {
            self.current += 1;
            gained += 1;
            if period <= 0.0 {
                self.cooldown = 0.0;
                continue;
            }
            self.cooldown += period;
        }
        if self.is_full() {
            self.cooldown = self.cooldown.max(0.0);
        }
        gained
    }
}
