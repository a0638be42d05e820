//! Actor behavior state machines.
//!
//! This module provides:
//! - `BehaviorContext`, the collaborators a behavior may touch during a step
//! - `BomberBehavior`, the fuse-carrying enemy
//! - `PlayerMotor`, the jump/dash player controller
//! - `Behavior`, the per-actor dispatch enum
//!
//! Behaviors never block: every timed action is a [`TimedTimer`] advanced by
//! the fixed step.
//!
//! [`TimedTimer`]: crate::timer::TimedTimer

pub mod bomber;
pub mod player;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smalltime_common::ActorId;

use crate::damage::DamageReport;
use crate::events::EventBus;
use crate::health::ActorHealthState;
use crate::physics::{GroundQuery, PhysicsBody, AABB};
use crate::rng::RandomSource;
use crate::spawn::Spawner;

pub use bomber::{BomberBehavior, BomberState};
pub use player::{PlayerMotor, PlayerState};

/// Everything a behavior may read or nudge during one step.
pub struct BehaviorContext<'a> {
    /// The actor's body
    pub body: &'a mut dyn PhysicsBody,
    /// The actor's health state
    pub health: &'a mut ActorHealthState,
    /// Ground layer query
    pub ground: &'a dyn GroundQuery,
    /// Spawner for payloads, coins and afterimages
    pub spawner: &'a mut dyn Spawner,
    /// Event queue
    pub events: &'a EventBus,
    /// Randomness for damage the behavior applies to itself
    pub rng: &'a mut dyn RandomSource,
    /// Position of the current target, if any
    pub target: Option<Vec2>,
}

impl BehaviorContext<'_> {
    /// The acting actor.
    #[must_use]
    pub fn actor(&self) -> ActorId {
        self.health.actor()
    }

    /// Distance from the body to the target.
    #[must_use]
    pub fn target_distance(&self) -> Option<f32> {
        self.target
            .map(|target| target.distance(self.body.position()))
    }
}

/// Box under the body's feet used for ground detection.
#[must_use]
pub fn feet_sensor(body: &dyn PhysicsBody, width_factor: f32, height: f32) -> AABB {
    let size = body.size();
    let feet = body.position() - Vec2::new(0.0, size.y * 0.5);
    AABB::from_center(feet, Vec2::new(size.x * width_factor, height))
}

// ============================================================================
// Behavior Dispatch
// ============================================================================

/// Behavior attached to an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    /// Fuse-carrying enemy
    Bomber(BomberBehavior),
    /// Player motor
    Player(PlayerMotor),
}

impl Behavior {
    /// Fixed step: timers tied to motion (fuse, dash, gravity affector).
    pub fn fixed_step(&mut self, ctx: &mut BehaviorContext<'_>, dt: f32) {
        match self {
            Self::Bomber(bomber) => bomber.fixed_step(ctx, dt),
            Self::Player(player) => player.fixed_step(ctx, dt),
        }
    }

    /// Variable step: polling (ground detection, input).
    ///
    /// Returns the report of any damage the behavior applied to itself.
    pub fn variable_step(&mut self, ctx: &mut BehaviorContext<'_>, dt: f32) -> Option<DamageReport> {
        match self {
            Self::Bomber(_) => None,
            Self::Player(player) => player.variable_step(ctx, dt),
        }
    }

    /// Death notification from the damage pipeline.
    pub fn on_death(&mut self, ctx: &mut BehaviorContext<'_>, report: &DamageReport) {
        match self {
            Self::Bomber(bomber) => bomber.on_death(ctx, report),
            Self::Player(player) => player.on_death(ctx, report),
        }
    }

    /// Whether the behavior reached its terminal state.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        match self {
            Self::Bomber(bomber) => bomber.state() == BomberState::Dead,
            Self::Player(player) => player.state() == PlayerState::Dead,
        }
    }

    /// Fuse carrier behavior, if this is one.
    #[must_use]
    pub fn as_bomber(&self) -> Option<&BomberBehavior> {
        match self {
            Self::Bomber(bomber) => Some(bomber),
            Self::Player(_) => None,
        }
    }

    /// Player motor, if this is one.
    #[must_use]
    pub fn as_player(&self) -> Option<&PlayerMotor> {
        match self {
            Self::Player(player) => Some(player),
            Self::Bomber(_) => None,
        }
    }

    /// Mutable player motor, if this is one.
    pub fn as_player_mut(&mut self) -> Option<&mut PlayerMotor> {
        match self {
            Self::Player(player) => Some(player),
            Self::Bomber(_) => None,
        }
    }
}
