//! Optimistic concurrency-control variant.

use crate::stats::StatCounters;
use crate::validation::{apply_final_effects, check_observed_versions};
use crate::window::CommitWindow;
use crate::{
    AbortReason, CommitOutcome, ConfigError, ControllerConfig, ControllerStats, PushError,
    RedoScheduler,
};
use magnitude_store::VersionedStore;
use magnitude_types::{CommitId, ModifyMap};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Optimistic controller: transactions execute speculatively, and at
/// commit time every recorded LOAD version is re-checked against the live
/// store. A mismatch aborts the commit and queues it for redo with fresh
/// reads; blind writes always pass validation.
///
/// Per commit id the lifecycle is PUSHED, then VALIDATING, then either
/// COMMITTED or ABORTED-and-queued-for-redo.
///
/// `commit` serializes check+apply internally, so overlapping calls are
/// not a data race; for deterministic outcomes the orchestrator must still
/// invoke `commit` in increasing commit-id order for transactions touching
/// overlapping addresses.
pub struct OccController {
    window: CommitWindow,
    store: Arc<dyn VersionedStore>,
    redo: RedoScheduler,
    /// Serializes check+apply so version checks observe a consistent
    /// linear history.
    commit_guard: Mutex<()>,
    stats: StatCounters,
}

impl OccController {
    /// Create an OCC controller over `store`.
    pub fn new(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            window: CommitWindow::new(config.window_size),
            store,
            redo: RedoScheduler::new(),
            commit_guard: Mutex::new(()),
            stats: StatCounters::default(),
        })
    }

    /// Record a transaction's change list at its commit id.
    ///
    /// No validation happens at push time. Re-pushing the same commit id
    /// (redo re-submission) replaces the slot contents; pushing a
    /// different commit id onto an occupied slot is rejected.
    pub fn push_commit(&self, commit_id: CommitId, changes: ModifyMap) -> Result<(), PushError> {
        let addresses = changes.len();
        match self.window.push(commit_id, changes) {
            Ok(replaced) => {
                self.stats.record_push();
                debug!(
                    commit_id = %commit_id,
                    addresses,
                    replaced = replaced.is_some(),
                    "pushed change list"
                );
                Ok(())
            }
            Err(err) => {
                self.stats.record_duplicate_push();
                warn!(commit_id = %commit_id, %err, "rejected push");
                Err(err)
            }
        }
    }

    /// Validate without applying.
    pub fn check_commit(&self, commit_id: CommitId) -> Result<(), AbortReason> {
        let _guard = self.commit_guard.lock();
        self.window
            .with_changes(commit_id, |changes| {
                check_observed_versions(self.store.as_ref(), changes)
            })
            .unwrap_or_else(|| Err(AbortReason::MissingRecord { commit_id }))
    }

    /// Validate and apply the change list at `commit_id`.
    ///
    /// On success the final effect per address is written to the store; on
    /// failure the store is untouched and the commit id is queued for redo
    /// (except when no change list was pushed at all).
    pub fn commit(&self, commit_id: CommitId) -> CommitOutcome {
        let _guard = self.commit_guard.lock();
        let result = self.window.with_changes(commit_id, |changes| {
            check_observed_versions(self.store.as_ref(), changes)
                .map(|()| apply_final_effects(self.store.as_ref(), changes))
        });
        match result {
            Some(Ok(())) => {
                self.stats.record_commit();
                debug!(commit_id = %commit_id, "committed");
                CommitOutcome::Committed
            }
            Some(Err(reason)) => self.abort(commit_id, reason),
            None => self.abort(commit_id, AbortReason::MissingRecord { commit_id }),
        }
    }

    fn abort(&self, commit_id: CommitId, reason: AbortReason) -> CommitOutcome {
        self.stats.record_abort(&reason);
        if self.window.mark_redo(commit_id) {
            self.redo.note(commit_id);
            self.stats.record_redo_scheduled();
        }
        match &reason {
            AbortReason::MissingRecord { .. } => {
                warn!(commit_id = %commit_id, %reason, "commit failed")
            }
            _ => debug!(commit_id = %commit_id, %reason, "commit aborted"),
        }
        CommitOutcome::Aborted(reason)
    }

    /// Take the commit ids queued for re-execution.
    ///
    /// Drained slots have their redo flags reset so a transaction that
    /// fails again after re-execution can re-enter a later batch.
    pub fn get_redo(&self) -> Vec<CommitId> {
        let batch = self.redo.drain();
        for commit_id in &batch {
            self.window.reset_redo(*commit_id);
        }
        if !batch.is_empty() {
            debug!(count = batch.len(), "drained redo batch");
        }
        batch
    }

    /// Clone the change list pushed at `commit_id`, if any.
    pub fn change_list(&self, commit_id: CommitId) -> Option<ModifyMap> {
        self.window.change_list(commit_id)
    }

    /// Release one window slot, returning its change list.
    pub fn remove(&self, commit_id: CommitId) -> Option<ModifyMap> {
        let removed = self.window.remove(commit_id);
        if removed.is_some() {
            self.redo.forget(commit_id);
            debug!(commit_id = %commit_id, "removed change list");
        }
        removed
    }

    /// Reset all per-window state; idempotent. Must be called between
    /// execution rounds that reuse the same window slots.
    pub fn clear(&self) {
        self.window.clear();
        self.redo.clear();
        debug!("commit window cleared");
    }

    /// Read-only access to the underlying store.
    pub fn storage(&self) -> &dyn VersionedStore {
        self.store.as_ref()
    }

    /// Number of window slots.
    pub fn window_size(&self) -> usize {
        self.window.size()
    }

    /// Snapshot of activity counters.
    pub fn stats(&self) -> ControllerStats {
        self.stats.snapshot()
    }
}

impl fmt::Debug for OccController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OccController")
            .field("window_size", &self.window.size())
            .field("occupied", &self.window.occupied())
            .field("redo_pending", &self.redo.pending_count())
            .finish_non_exhaustive()
    }
}
