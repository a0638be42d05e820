//! Health state snapshots.
//!
//! A snapshot is the whole [`ActorHealthState`] (health, immunity timers,
//! collision immunity, stat modifiers) tagged with a schema version. Restoring
//! it and continuing the simulation with the same inputs and RNG state gives
//! the same results as never having saved.

use serde::{Deserialize, Serialize};
use smalltime_common::{SchemaVersion, SmallTimeError};
use thiserror::Error;
use tracing::debug;

use crate::health::ActorHealthState;

/// Errors from snapshot encoding and decoding.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Binary encoding failed
    #[error("Binary snapshot error: {0}")]
    Binary(#[from] bincode::Error),

    /// JSON encoding failed
    #[error("JSON snapshot error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot written by an incompatible schema
    #[error("Incompatible snapshot version: expected {expected}, found {actual}")]
    VersionMismatch {
        /// Version this build reads
        expected: SchemaVersion,
        /// Version found in the snapshot
        actual: SchemaVersion,
    },
}

impl From<SnapshotError> for SmallTimeError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::VersionMismatch { expected, actual } => Self::VersionMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
            other => Self::Serialization(other.to_string()),
        }
    }
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Versioned copy of one actor's health state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Schema version the snapshot was written with
    pub version: SchemaVersion,
    /// Captured state
    pub state: ActorHealthState,
}

impl HealthSnapshot {
    /// Capture a health state.
    #[must_use]
    pub fn capture(state: &ActorHealthState) -> Self {
        Self {
            version: SchemaVersion::HEALTH_SNAPSHOT,
            state: state.clone(),
        }
    }

    /// Turn the snapshot back into a live state.
    pub fn restore(self) -> SnapshotResult<ActorHealthState> {
        let expected = SchemaVersion::HEALTH_SNAPSHOT;
        if !expected.can_restore(&self.version) {
            return Err(SnapshotError::VersionMismatch {
                expected,
                actual: self.version,
            });
        }
        debug!(actor = %self.state.actor(), version = %self.version, "restored health snapshot");
        Ok(self.state)
    }

    /// Compact binary encoding.
    pub fn to_bytes(&self) -> SnapshotResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a binary snapshot.
    pub fn from_bytes(bytes: &[u8]) -> SnapshotResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Human-readable encoding, for debugging and fixtures.
    pub fn to_json(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a JSON snapshot.
    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HealthConfig;
    use crate::damage::DamageInfo;
    use crate::events::EventBus;
    use crate::rng::SeededRng;
    use smalltime_common::ActorId;

    fn wounded() -> ActorHealthState {
        let config = HealthConfig {
            immunity_frame_length: 0.5,
            ..HealthConfig::default()
        };
        let mut state = ActorHealthState::new(ActorId::new(), &config);
        state.take_damage(&DamageInfo::new(20), &mut SeededRng::new(1), &EventBus::default());
        state.add_collision_immunity(0.3);
        state.tick(0.1);
        state
    }

    #[test]
    fn test_binary_restore() {
        let state = wounded();
        let bytes = HealthSnapshot::capture(&state).to_bytes().expect("encode");
        let restored = HealthSnapshot::from_bytes(&bytes)
            .and_then(HealthSnapshot::restore)
            .expect("decode");
        assert_eq!(restored, state);
        assert!(restored.is_damage_immune());
        assert_eq!(restored.health(), 80);
    }

    #[test]
    fn test_json_restore() {
        let state = wounded();
        let json = HealthSnapshot::capture(&state).to_json().expect("encode");
        assert!(json.contains("\"version\""));
        let restored = HealthSnapshot::from_json(&json)
            .and_then(HealthSnapshot::restore)
            .expect("decode");
        assert_eq!(restored, state);
    }

    #[test]
    fn test_restored_state_continues_identically() {
        let events = EventBus::default();
        let hit = DamageInfo::new(15).with_crit(50, 100);

        let mut live = wounded();
        let mut live_rng = SeededRng::new(42);
        let bytes = HealthSnapshot::capture(&live).to_bytes().expect("encode");
        let mut restored = HealthSnapshot::from_bytes(&bytes)
            .and_then(HealthSnapshot::restore)
            .expect("decode");
        let mut restored_rng = SeededRng::from(live_rng.state());

        for _ in 0..20 {
            live.tick(0.1);
            restored.tick(0.1);
            let a = live.take_damage(&hit, &mut live_rng, &events);
            let b = restored.take_damage(&hit, &mut restored_rng, &events);
            assert_eq!(a, b);
        }
        assert_eq!(live, restored);
    }

    #[test]
    fn test_newer_major_is_rejected() {
        let mut snapshot = HealthSnapshot::capture(&wounded());
        snapshot.version = SchemaVersion::new(SchemaVersion::HEALTH_SNAPSHOT.major + 1, 0, 0);
        let err = snapshot.restore().expect_err("should reject");
        assert!(matches!(err, SnapshotError::VersionMismatch { .. }));

        let err: SmallTimeError = err.into();
        assert!(matches!(err, SmallTimeError::VersionMismatch { .. }));
    }

    #[test]
    fn test_garbage_bytes() {
        assert!(HealthSnapshot::from_bytes(&[0xFF, 0x01]).is_err());
    }
}
