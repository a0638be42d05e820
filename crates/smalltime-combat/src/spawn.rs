//! Spawner collaborator.
//!
//! Payloads, coins and dash afterimages are instantiated by the host engine.
//! Requests are fire-and-forget: a failed spawn is logged and the tick goes on.

use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smalltime_common::ActorId;
use thiserror::Error;
use tracing::warn;

use crate::damage::DamageInfo;

/// Errors a spawner may report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpawnError {
    /// No room to place the object
    #[error("no valid placement at ({x}, {y})")]
    NoPlacement {
        /// X position
        x: f32,
        /// Y position
        y: f32,
    },
    /// Object pool or budget exhausted
    #[error("spawn budget exhausted: {0}")]
    Exhausted(String),
}

/// Something the core wants placed in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpawnRequest {
    /// Live payload (bomb) with its own fuse
    Payload {
        /// Actor that dropped it
        source: ActorId,
        /// Drop position
        position: Vec2,
        /// Damage the payload deals on detonation
        damage: DamageInfo,
        /// Seconds until detonation (0 = immediate)
        fuse_time: f32,
        /// Impulse applied on drop
        impulse: Vec2,
    },
    /// Collectible coins
    Coins {
        /// Number of coins
        amount: u32,
        /// Drop position
        position: Vec2,
    },
    /// Fading dash afterimage
    Afterimage {
        /// Actor that dashed
        source: ActorId,
        /// Position of the afterimage
        position: Vec2,
        /// Lifetime in seconds
        lifetime: f32,
    },
}

/// Instantiates objects on behalf of the core.
pub trait Spawner {
    /// Place an object in the world.
    fn spawn(&mut self, request: SpawnRequest) -> Result<(), SpawnError>;
}

/// Submit a request, downgrading failure to a warning.
pub(crate) fn spawn_or_warn(spawner: &mut dyn Spawner, request: SpawnRequest) {
    if let Err(e) = spawner.spawn(request) {
        warn!("spawn request failed: {e}");
    }
}

/// Spawner that records every request.
///
/// Clones share the same log, so a test can keep a handle after moving the
/// spawner into a simulation.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpawner {
    requests: Arc<Mutex<Vec<SpawnRequest>>>,
    fail_all: bool,
}

impl RecordingSpawner {
    /// Spawner that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawner that rejects everything (requests are still recorded).
    #[must_use]
    pub fn failing() -> Self {
        Self {
            requests: Arc::default(),
            fail_all: true,
        }
    }

    /// Requests seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<SpawnRequest> {
        self.requests.lock().clone()
    }

    /// Take the recorded requests.
    pub fn take(&self) -> Vec<SpawnRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    /// Payload requests seen so far.
    #[must_use]
    pub fn payloads(&self) -> Vec<SpawnRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| matches!(r, SpawnRequest::Payload { .. }))
            .cloned()
            .collect()
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&mut self, request: SpawnRequest) -> Result<(), SpawnError> {
        let position = match &request {
            SpawnRequest::Payload { position, .. }
            | SpawnRequest::Coins { position, .. }
            | SpawnRequest::Afterimage { position, .. } => *position,
        };
        self.requests.lock().push(request);
        if self.fail_all {
            return Err(SpawnError::NoPlacement {
                x: position.x,
                y: position.y,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_spawner() {
        let mut spawner = RecordingSpawner::new();
        let handle = spawner.clone();
        spawn_or_warn(
            &mut spawner,
            SpawnRequest::Coins {
                amount: 3,
                position: Vec2::ZERO,
            },
        );
        assert_eq!(handle.requests().len(), 1);
        assert!(handle.payloads().is_empty());
        assert_eq!(handle.take().len(), 1);
        assert!(spawner.requests().is_empty());
    }

    #[test]
    fn test_failing_spawner_is_not_fatal() {
        let mut spawner = RecordingSpawner::failing();
        spawn_or_warn(
            &mut spawner,
            SpawnRequest::Coins {
                amount: 1,
                position: Vec2::new(2.0, 3.0),
            },
        );
        assert_eq!(spawner.requests().len(), 1);
        let err = spawner
            .spawn(SpawnRequest::Coins {
                amount: 1,
                position: Vec2::new(2.0, 3.0),
            })
            .expect_err("failing spawner");
        assert_eq!(err.to_string(), "no valid placement at (2, 3)");
    }
}
