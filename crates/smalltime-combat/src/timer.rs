//! Cancellable countdown timers.
//!
//! A [`TimedTimer`] replaces the coroutine-style timed waits of a frame-driven
//! engine: the owner ticks it once per simulation step and applies the
//! completion effect itself when [`TimedTimer::tick`] reports completion.
//! Nothing here ever blocks or sleeps.

use serde::{Deserialize, Serialize};

/// Lifecycle of a [`TimedTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimerState {
    /// Never started
    #[default]
    Idle,
    /// Counting down
    Running,
    /// Reached zero; the completion was reported once
    Completed,
    /// Stopped before reaching zero; completion is never reported
    Cancelled,
}

/// A single-use countdown with normalized progress.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimedTimer {
    /// Seconds left before completion.
    remaining: f32,
    /// Duration the timer was armed with.
    total: f32,
    /// Current lifecycle state.
    state: TimerState,
}

impl TimedTimer {
    /// Creates an idle timer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            remaining: 0.0,
            total: 0.0,
            state: TimerState::Idle,
        }
    }

    /// Creates a timer that is already running.
    #[must_use]
    pub fn started(duration: f32) -> Self {
        let mut timer = Self::new();
        timer.start(duration);
        timer
    }

    /// Arms the timer, restarting it if it was already running.
    pub fn start(&mut self, duration: f32) {
        self.total = duration.max(0.0);
        self.remaining = self.total;
        self.state = TimerState::Running;
    }

    /// Arms the timer unless it is already running.
    ///
    /// Returns `false` (and leaves the running countdown untouched) when the
    /// timer was already running.
    pub fn start_debounced(&mut self, duration: f32) -> bool {
        if self.is_running() {
            return false;
        }
        self.start(duration);
        true
    }

    /// Re-arms the timer with its previous duration.
    pub fn reset(&mut self) {
        self.remaining = self.total;
        self.state = TimerState::Running;
    }

    /// Advances the countdown.
    ///
    /// Returns `true` exactly once: on the tick that brings `remaining` to
    /// zero or below. Ticking a timer that is not running does nothing.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.state != TimerState::Running {
            return false;
        }

        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.state = TimerState::Completed;
            return true;
        }
        false
    }

    /// Stops a running timer without completing it.
    ///
    /// Returns `true` if a running countdown was interrupted.
    pub fn cancel(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.state = TimerState::Cancelled;
        true
    }

    /// Normalized progress: 0.0 when armed, 1.0 when complete.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.total <= 0.0 {
            return if self.state == TimerState::Running { 0.0 } else { 1.0 };
        }
        (1.0 - self.remaining / self.total).clamp(0.0, 1.0)
    }

    /// Seconds left before completion.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Duration the timer was last armed with.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.total
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Whether the timer is counting down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Whether the timer ran to completion.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == TimerState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timer_is_idle() {
        let timer = TimedTimer::new();
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_completes_exactly_once() {
        let mut timer = TimedTimer::started(1.0);

        assert!(!timer.tick(0.5));
        assert!(timer.tick(0.5));
        assert_eq!(timer.state(), TimerState::Completed);
        assert!(!timer.tick(0.5));
        assert!(!timer.tick(0.5));
    }

    #[test]
    fn test_remaining_clamped_at_zero() {
        let mut timer = TimedTimer::started(0.25);
        assert!(timer.tick(1.0));
        assert_eq!(timer.remaining(), 0.0);
        assert_eq!(timer.progress(), 1.0);
    }

    #[test]
    fn test_cancel_never_completes() {
        let mut timer = TimedTimer::started(0.5);
        assert!(timer.cancel());
        assert_eq!(timer.state(), TimerState::Cancelled);
        assert!(!timer.tick(1.0));
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut timer = TimedTimer::new();
        assert!(!timer.cancel());
        assert_eq!(timer.state(), TimerState::Idle);

        timer.start(1.0);
        assert!(timer.cancel());
        assert!(!timer.cancel());
    }

    #[test]
    fn test_cancel_in_completing_tick_wins() {
        let mut timer = TimedTimer::started(0.5);
        timer.tick(0.25);
        timer.cancel();
        assert!(!timer.tick(0.25));
        assert!(!timer.is_completed());
    }

    #[test]
    fn test_progress() {
        let mut timer = TimedTimer::started(2.0);
        assert_eq!(timer.progress(), 0.0);
        timer.tick(0.5);
        assert!((timer.progress() - 0.25).abs() < 1e-6);
        timer.tick(1.5);
        assert_eq!(timer.progress(), 1.0);
    }

    #[test]
    fn test_debounced_start_keeps_remaining() {
        let mut timer = TimedTimer::new();
        assert!(timer.start_debounced(1.0));
        timer.tick(0.25);

        assert!(!timer.start_debounced(5.0));
        assert!((timer.remaining() - 0.75).abs() < 1e-6);
        assert_eq!(timer.total(), 1.0);
    }

    #[test]
    fn test_debounced_start_after_completion_rearms() {
        let mut timer = TimedTimer::started(0.1);
        timer.tick(0.1);
        assert!(timer.start_debounced(0.3));
        assert!(timer.is_running());
        assert_eq!(timer.remaining(), 0.3);
    }

    #[test]
    fn test_start_restarts_running_timer() {
        let mut timer = TimedTimer::started(1.0);
        timer.tick(0.75);
        timer.start(1.0);
        assert_eq!(timer.remaining(), 1.0);
    }

    #[test]
    fn test_reset_uses_previous_total() {
        let mut timer = TimedTimer::started(0.5);
        timer.tick(0.5);
        timer.reset();
        assert!(timer.is_running());
        assert_eq!(timer.remaining(), 0.5);
    }

    #[test]
    fn test_zero_duration_completes_on_first_tick() {
        let mut timer = TimedTimer::started(0.0);
        assert_eq!(timer.progress(), 0.0);
        assert!(timer.tick(0.0));
    }
}
