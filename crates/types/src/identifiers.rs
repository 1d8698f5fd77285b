//! Identifier newtypes.

use std::fmt;

/// Commit slot identifier (monotonically increasing per batch).
///
/// Assigned by the execution layer when a transaction finishes speculative
/// execution; the controller maps it onto a window slot via
/// `commit_id mod window_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(pub u64);

impl CommitId {
    /// Get the raw value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// Get the next commit id.
    pub fn next(self) -> Self {
        CommitId(self.0 + 1)
    }
}

impl From<u64> for CommitId {
    fn from(value: u64) -> Self {
        CommitId(value)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-address version counter (monotonically increasing).
///
/// The store increments it on every successful STORE/REMOVE; a LOAD records
/// the counter value visible at read time so staleness can be detected at
/// commit validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version(pub u64);

impl Version {
    /// Version of an address that has never been written.
    pub const INITIAL: Self = Version(0);

    /// Get the raw value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// Get the version after one more write.
    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
