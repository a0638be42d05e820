//! Error types for the SmallTime combat core.

use thiserror::Error;

use crate::ids::ActorId;

/// Top-level error type for SmallTime operations.
///
/// Crate-local errors convert into this with `?` so binaries can work with a
/// single error type.
#[derive(Debug, Error)]
pub enum SmallTimeError {
    /// Referenced actor does not exist or was despawned
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Result type alias for SmallTime operations.
pub type SmallTimeResult<T> = Result<T, SmallTimeError>;
