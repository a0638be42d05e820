//! Session context.
//!
//! Game state, game time and gold for the current run. Owned by the
//! simulation and handed to behaviors explicitly.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::{CombatEvent, EventBus};

// ============================================================================
// Game State
// ============================================================================

/// Coarse state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameState {
    /// Simulation frozen
    Paused,
    /// Playing
    #[default]
    Normal,
    /// Run is over
    GameOver,
}

impl GameState {
    /// Whether behaviors and game time advance.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

// ============================================================================
// Session
// ============================================================================

/// State of the current run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    state: GameState,
    game_time: f64,
    gold: u64,
}

impl Session {
    /// New session in [`GameState::Normal`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GameState {
        self.state
    }

    /// Seconds spent in [`GameState::Normal`].
    #[must_use]
    pub const fn game_time(&self) -> f64 {
        self.game_time
    }

    /// Gold balance.
    #[must_use]
    pub const fn gold(&self) -> u64 {
        self.gold
    }

    /// Change state. Publishes a notification when it actually changes.
    pub fn set_state(&mut self, state: GameState, events: &EventBus) {
        if self.state == state {
            return;
        }
        info!("Game state: {:?} -> {:?}", self.state, state);
        self.state = state;
        events.publish(CombatEvent::GameStateChanged { state });
    }

    /// Toggle between paused and normal. Game over is sticky.
    pub fn toggle_pause(&mut self, events: &EventBus) {
        match self.state {
            GameState::Normal => self.set_state(GameState::Paused, events),
            GameState::Paused => self.set_state(GameState::Normal, events),
            GameState::GameOver => {}
        }
    }

    /// Add collected coins to the balance.
    pub fn collect_coins(&mut self, amount: u64, events: &EventBus) {
        if amount == 0 {
            return;
        }
        self.gold = self.gold.saturating_add(amount);
        events.publish(CombatEvent::GoldChanged { gold: self.gold });
    }

    /// Advance game time.
    pub fn tick(&mut self, dt: f32) {
        if self.state.is_running() {
            self.game_time += f64::from(dt);
        }
    }
}
