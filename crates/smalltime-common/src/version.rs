//! Snapshot schema versions.
//!
//! Every persisted snapshot carries the version it was written with. A build
//! restores snapshots from its own major version whose minor is not newer than
//! its own; patch never matters.

use serde::{Deserialize, Serialize};

/// Version tag stored in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when old snapshots can no longer be restored
    pub major: u16,
    /// Bumped when fields are added with defaults
    pub minor: u16,
    /// Bumped for fixes that leave the layout alone
    pub patch: u16,
}

impl SchemaVersion {
    /// Health snapshot layout written by this build.
    pub const HEALTH_SNAPSHOT: Self = Self::new(1, 0, 0);

    /// Creates a version tag.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether a snapshot tagged `written` can be restored by this version.
    #[must_use]
    pub const fn can_restore(&self, written: &Self) -> bool {
        self.major == written.major && self.minor >= written.minor
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
