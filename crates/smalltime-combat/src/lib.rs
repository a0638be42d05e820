//! # SmallTime Combat
//!
//! Actor combat and timed-state core for a 2D action game:
//! - `TimedTimer`, the one-shot countdown every timed action uses
//! - Damage pipeline (crits, armor, immunity windows) and actor health
//! - Behavior state machines: the fuse-carrying enemy and the player motor
//! - Fixed-step clock and the `Simulation` that drives all of it
//!
//! The host engine owns rendering and rigid-body solving. It plugs in through
//! the [`physics::PhysicsBody`], [`physics::GroundQuery`] and
//! [`spawn::Spawner`] traits and reads results back from the event queue.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod behavior;
pub mod charges;
pub mod clock;
pub mod config;
pub mod curve;
pub mod damage;
pub mod events;
pub mod health;
pub mod physics;
pub mod rng;
pub mod session;
pub mod simulation;
pub mod snapshot;
pub mod spawn;
pub mod stats;
pub mod timer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::behavior::{
        Behavior, BehaviorContext, BomberBehavior, BomberState, PlayerMotor, PlayerState,
    };
    pub use crate::charges::ChargePool;
    pub use crate::clock::{FramePlan, SimulationClock};
    pub use crate::config::{BomberConfig, ClockConfig, CombatConfig, HealthConfig, PlayerConfig};
    pub use crate::curve::DamageCurve;
    pub use crate::damage::{DamageInfo, DamageReport};
    pub use crate::events::{CombatEvent, EventBus};
    pub use crate::health::ActorHealthState;
    pub use crate::physics::{FlatGround, GroundQuery, KinematicBody, PhysicsBody, SurfaceKind, AABB};
    pub use crate::rng::{FixedRolls, RandomSource, SeededRng};
    pub use crate::session::{GameState, Session};
    pub use crate::simulation::{Actor, Simulation, SimulationError};
    pub use crate::snapshot::{HealthSnapshot, SnapshotError};
    pub use crate::spawn::{RecordingSpawner, SpawnError, SpawnRequest, Spawner};
    pub use crate::stats::{EntityStat, ModifierSource, StatModifier};
    pub use crate::timer::{TimedTimer, TimerState};
}

pub use prelude::*;
