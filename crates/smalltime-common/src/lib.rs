//! # SmallTime Common
//!
//! Shared types for the SmallTime combat core:
//! - Actor identifiers
//! - Top-level error type
//! - Schema versions for snapshots
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
