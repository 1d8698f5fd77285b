//! Controller statistics.

use crate::AbortReason;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of controller activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Change lists accepted by `push_commit` (including same-id re-pushes).
    pub pushes: u64,
    /// Pushes rejected with `DuplicateCommitSlot`.
    pub duplicate_pushes: u64,
    /// Commits that validated and applied.
    pub commits: u64,
    /// Aborts due to a stale read (version mismatch).
    pub version_conflicts: u64,
    /// Aborts because an earlier pending writer exists.
    pub ordering_violations: u64,
    /// Commit/check calls for a commit id with no pushed change list.
    pub missing_records: u64,
    /// Commit ids newly queued for redo.
    pub redo_scheduled: u64,
}

impl ControllerStats {
    /// Total aborted commits.
    pub fn aborts(&self) -> u64 {
        self.version_conflicts + self.ordering_violations + self.missing_records
    }
}

/// Live counters behind the snapshot.
///
/// Plain relaxed atomics: counters are monotonically increasing and only
/// read as a snapshot, never used for synchronization.
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    pushes: AtomicU64,
    duplicate_pushes: AtomicU64,
    commits: AtomicU64,
    version_conflicts: AtomicU64,
    ordering_violations: AtomicU64,
    missing_records: AtomicU64,
    redo_scheduled: AtomicU64,
}

impl StatCounters {
    pub(crate) fn record_push(&self) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate_push(&self) {
        self.duplicate_pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self, reason: &AbortReason) {
        let counter = match reason {
            AbortReason::MissingRecord { .. } => &self.missing_records,
            AbortReason::VersionConflict { .. } => &self.version_conflicts,
            AbortReason::OrderingViolation { .. } => &self.ordering_violations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_redo_scheduled(&self) {
        self.redo_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ControllerStats {
        ControllerStats {
            pushes: self.pushes.load(Ordering::Relaxed),
            duplicate_pushes: self.duplicate_pushes.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            version_conflicts: self.version_conflicts.load(Ordering::Relaxed),
            ordering_violations: self.ordering_violations.load(Ordering::Relaxed),
            missing_records: self.missing_records.load(Ordering::Relaxed),
            redo_scheduled: self.redo_scheduled.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnitude_types::test_utils::test_address;
    use magnitude_types::{CommitId, Version};

    #[test]
    fn test_snapshot_reflects_counters() {
        let counters = StatCounters::default();
        counters.record_push();
        counters.record_push();
        counters.record_commit();
        counters.record_abort(&AbortReason::VersionConflict {
            address: test_address(1),
            observed: Version(0),
            live: Version(1),
        });
        counters.record_abort(&AbortReason::MissingRecord {
            commit_id: CommitId(4),
        });
        counters.record_redo_scheduled();

        let stats = counters.snapshot();
        assert_eq!(stats.pushes, 2);
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.version_conflicts, 1);
        assert_eq!(stats.missing_records, 1);
        assert_eq!(stats.ordering_violations, 0);
        assert_eq!(stats.redo_scheduled, 1);
        assert_eq!(stats.aborts(), 2);
    }
}
