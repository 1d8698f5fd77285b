//! Redo scheduling.

use magnitude_types::CommitId;
use parking_lot::Mutex;

/// Accumulates commit ids whose transactions must be re-executed with
/// fresh reads.
///
/// The scheduler only holds the batch; deduplication lives in the commit
/// window's per-slot redo flag, which the controller consults before
/// calling [`note`](Self::note). The orchestrator drains the batch once
/// per round and is responsible for re-executing and re-pushing; nothing
/// here retries automatically.
#[derive(Debug, Default)]
pub(crate) struct RedoScheduler {
    pending: Mutex<Vec<CommitId>>,
}

impl RedoScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a commit id for redo. The caller has already checked the
    /// slot's redo flag, so duplicates do not reach this point.
    pub(crate) fn note(&self, commit_id: CommitId) {
        self.pending.lock().push(commit_id);
    }

    /// Take the current batch, leaving the scheduler empty.
    pub(crate) fn drain(&self) -> Vec<CommitId> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Drop a commit id from the batch (slot cancelled via `remove`).
    pub(crate) fn forget(&self, commit_id: CommitId) {
        self.pending.lock().retain(|id| *id != commit_id);
    }

    /// Drop the whole batch.
    pub(crate) fn clear(&self) {
        self.pending.lock().clear();
    }

    /// Number of queued commit ids.
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_and_drain() {
        let redo = RedoScheduler::new();
        redo.note(CommitId(3));
        redo.note(CommitId(7));

        assert_eq!(redo.pending_count(), 2);
        assert_eq!(redo.drain(), vec![CommitId(3), CommitId(7)]);
        assert_eq!(redo.pending_count(), 0);
        assert!(redo.drain().is_empty());
    }

    #[test]
    fn test_forget_removes_only_target() {
        let redo = RedoScheduler::new();
        redo.note(CommitId(1));
        redo.note(CommitId(2));
        redo.note(CommitId(3));

        redo.forget(CommitId(2));
        assert_eq!(redo.drain(), vec![CommitId(1), CommitId(3)]);
    }

    #[test]
    fn test_clear_empties_batch() {
        let redo = RedoScheduler::new();
        redo.note(CommitId(1));
        redo.clear();
        assert_eq!(redo.pending_count(), 0);
    }
}
