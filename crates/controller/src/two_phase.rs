//! Two-phase variants: pending writes are indexed at push time and the
//! earliest pending writer per address wins at commit time.

use crate::index::WriterIndex;
use crate::partition::{FoldPartitioner, Partitioner};
use crate::stats::StatCounters;
use crate::validation::{apply_final_effects, check_observed_versions};
use crate::window::CommitWindow;
use crate::{
    AbortReason, CommitOutcome, ConfigError, ControllerConfig, ControllerStats, PushError,
    RedoScheduler,
};
use magnitude_store::VersionedStore;
use magnitude_types::{Address, CommitId, ModifyMap};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// First-writer-wins controller.
///
/// Push is phase one: every address the change list writes is registered
/// in a pending-writer index. Commit is phase two: validation passes only
/// if the commit id is the earliest pending writer for every address it
/// writes, so a commit blocked by an earlier in-flight writer aborts and
/// retries once that writer commits or is removed. Address lists that
/// only contain LOADs never join the index and never block anyone.
///
/// Observed LOAD versions are not re-checked here; orderly commit-id
/// submission is what guarantees writes land in order. Use
/// [`TwoPhaseOooController`] when commits may be driven out of order.
pub struct TwoPhaseController {
    inner: WriterTrackedInner,
}

/// Out-of-order tolerant sibling of [`TwoPhaseController`].
///
/// Keeps the same pending-writer bookkeeping on push and release, but
/// validates commits against live store versions the way the optimistic
/// controller does. That makes commit order irrelevant for correctness:
/// a stale read aborts no matter which writer got in first.
pub struct TwoPhaseOooController {
    inner: WriterTrackedInner,
}

/// Shared state for both two-phase flavors: the commit window plus the
/// striped pending-writer index. Only the validation step differs.
struct WriterTrackedInner {
    window: CommitWindow,
    store: Arc<dyn VersionedStore>,
    index: WriterIndex,
    redo: RedoScheduler,
    commit_guard: Mutex<()>,
    stats: StatCounters,
}

impl WriterTrackedInner {
    fn new(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
        partitioner: Arc<dyn Partitioner>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            window: CommitWindow::new(config.window_size),
            store,
            index: WriterIndex::new(config.index_stripes, partitioner),
            redo: RedoScheduler::new(),
            commit_guard: Mutex::new(()),
            stats: StatCounters::default(),
        })
    }

    fn push_commit(&self, commit_id: CommitId, changes: ModifyMap) -> Result<(), PushError> {
        let writes: Vec<Address> = changes.write_addresses().copied().collect();
        let addresses = changes.len();
        match self.window.push(commit_id, changes) {
            Ok(replaced) => {
                // A same-id replacement must drop the registrations of
                // the map it displaced before the new ones go in.
                if let Some(previous) = &replaced {
                    for address in previous.write_addresses() {
                        self.index.release(address, commit_id);
                    }
                }
                for address in &writes {
                    self.index.register(address, commit_id);
                }
                self.stats.record_push();
                debug!(
                    commit_id = %commit_id,
                    addresses,
                    writes = writes.len(),
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

    /// Pass iff `commit_id` is the earliest pending writer on every
    /// address it writes.
    fn check_write_order(
        &self,
        commit_id: CommitId,
        changes: &ModifyMap,
    ) -> Result<(), AbortReason> {
        for &address in changes.write_addresses() {
            if let Some(earliest) = self.index.earliest(&address) {
                if earliest < commit_id {
                    return Err(AbortReason::OrderingViolation {
                        commit_id,
                        address,
                        earliest,
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate with `check`, apply on success, and release the commit's
    /// own index registrations so the next-earliest writer per address
    /// becomes eligible.
    fn commit_with<F>(&self, commit_id: CommitId, check: F) -> CommitOutcome
    where
        F: Fn(&ModifyMap) -> Result<(), AbortReason>,
    {
        let _guard = self.commit_guard.lock();
        let result = self.window.with_changes(commit_id, |changes| {
            check(changes).map(|()| {
                apply_final_effects(self.store.as_ref(), changes);
                changes.write_addresses().copied().collect::<Vec<_>>()
            })
        });
        match result {
            Some(Ok(writes)) => {
                for address in &writes {
                    self.index.release(address, commit_id);
                }
                self.stats.record_commit();
                debug!(commit_id = %commit_id, released = writes.len(), "committed");
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

    fn get_redo(&self) -> Vec<CommitId> {
        let batch = self.redo.drain();
        for commit_id in &batch {
            self.window.reset_redo(*commit_id);
        }
        if !batch.is_empty() {
            debug!(count = batch.len(), "drained redo batch");
        }
        batch
    }

    fn remove(&self, commit_id: CommitId) -> Option<ModifyMap> {
        let removed = self.window.remove(commit_id);
        if let Some(changes) = &removed {
            for address in changes.write_addresses() {
                self.index.release(address, commit_id);
            }
            self.redo.forget(commit_id);
            debug!(commit_id = %commit_id, "removed change list");
        }
        removed
    }

    fn clear(&self) {
        self.window.clear();
        self.index.clear();
        self.redo.clear();
        debug!("commit window cleared");
    }

    fn debug_fmt(&self, name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(name)
            .field("window_size", &self.window.size())
            .field("occupied", &self.window.occupied())
            .field("redo_pending", &self.redo.pending_count())
            .finish_non_exhaustive()
    }
}

impl TwoPhaseController {
    /// Create a first-writer-wins controller with the default address
    /// partitioner.
    pub fn new(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
    ) -> Result<Self, ConfigError> {
        Self::new_with_partitioner(config, store, Arc::new(FoldPartitioner))
    }

    /// Create a first-writer-wins controller with a caller-supplied
    /// partitioner for index striping.
    pub fn new_with_partitioner(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
        partitioner: Arc<dyn Partitioner>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: WriterTrackedInner::new(config, store, partitioner)?,
        })
    }

    /// Record a change list and register its write addresses as pending.
    pub fn push_commit(&self, commit_id: CommitId, changes: ModifyMap) -> Result<(), PushError> {
        self.inner.push_commit(commit_id, changes)
    }

    /// Validate without applying.
    pub fn check_commit(&self, commit_id: CommitId) -> Result<(), AbortReason> {
        let _guard = self.inner.commit_guard.lock();
        self.inner
            .window
            .with_changes(commit_id, |changes| {
                self.inner.check_write_order(commit_id, changes)
            })
            .unwrap_or_else(|| Err(AbortReason::MissingRecord { commit_id }))
    }

    /// Validate write ordering and apply the change list at `commit_id`.
    pub fn commit(&self, commit_id: CommitId) -> CommitOutcome {
        self.inner
            .commit_with(commit_id, |changes| self.inner.check_write_order(commit_id, changes))
    }

    /// Take the commit ids queued for re-execution.
    pub fn get_redo(&self) -> Vec<CommitId> {
        self.inner.get_redo()
    }

    /// Clone the change list pushed at `commit_id`, if any.
    pub fn change_list(&self, commit_id: CommitId) -> Option<ModifyMap> {
        self.inner.window.change_list(commit_id)
    }

    /// Release one window slot and its pending-writer registrations.
    pub fn remove(&self, commit_id: CommitId) -> Option<ModifyMap> {
        self.inner.remove(commit_id)
    }

    /// Reset window, index and redo queue; idempotent.
    pub fn clear(&self) {
        self.inner.clear()
    }

    /// Earliest pending writer registered for `address`, if any.
    pub fn earliest_writer(&self, address: &Address) -> Option<CommitId> {
        self.inner.index.earliest(address)
    }

    /// Read-only access to the underlying store.
    pub fn storage(&self) -> &dyn VersionedStore {
        self.inner.store.as_ref()
    }

    /// Number of window slots.
    pub fn window_size(&self) -> usize {
        self.inner.window.size()
    }

    /// Snapshot of activity counters.
    pub fn stats(&self) -> ControllerStats {
        self.inner.stats.snapshot()
    }
}

impl TwoPhaseOooController {
    /// Create an out-of-order tolerant controller with the default
    /// address partitioner.
    pub fn new(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
    ) -> Result<Self, ConfigError> {
        Self::new_with_partitioner(config, store, Arc::new(FoldPartitioner))
    }

    /// Create an out-of-order tolerant controller with a caller-supplied
    /// partitioner for index striping.
    pub fn new_with_partitioner(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
        partitioner: Arc<dyn Partitioner>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: WriterTrackedInner::new(config, store, partitioner)?,
        })
    }

    /// Record a change list and register its write addresses as pending.
    pub fn push_commit(&self, commit_id: CommitId, changes: ModifyMap) -> Result<(), PushError> {
        self.inner.push_commit(commit_id, changes)
    }

    /// Validate without applying.
    pub fn check_commit(&self, commit_id: CommitId) -> Result<(), AbortReason> {
        let _guard = self.inner.commit_guard.lock();
        self.inner
            .window
            .with_changes(commit_id, |changes| {
                check_observed_versions(self.inner.store.as_ref(), changes)
            })
            .unwrap_or_else(|| Err(AbortReason::MissingRecord { commit_id }))
    }

    /// Validate observed versions and apply the change list at
    /// `commit_id`. Commit order does not matter.
    pub fn commit(&self, commit_id: CommitId) -> CommitOutcome {
        self.inner.commit_with(commit_id, |changes| {
            check_observed_versions(self.inner.store.as_ref(), changes)
        })
    }

    /// Take the commit ids queued for re-execution.
    pub fn get_redo(&self) -> Vec<CommitId> {
        self.inner.get_redo()
    }

    /// Clone the change list pushed at `commit_id`, if any.
    pub fn change_list(&self, commit_id: CommitId) -> Option<ModifyMap> {
        self.inner.window.change_list(commit_id)
    }

    /// Release one window slot and its pending-writer registrations.
    pub fn remove(&self, commit_id: CommitId) -> Option<ModifyMap> {
        self.inner.remove(commit_id)
    }

    /// Reset window, index and redo queue; idempotent.
    pub fn clear(&self) {
        self.inner.clear()
    }

    /// Earliest pending writer registered for `address`, if any.
    pub fn earliest_writer(&self, address: &Address) -> Option<CommitId> {
        self.inner.index.earliest(address)
    }

    /// Read-only access to the underlying store.
    pub fn storage(&self) -> &dyn VersionedStore {
        self.inner.store.as_ref()
    }

    /// Number of window slots.
    pub fn window_size(&self) -> usize {
        self.inner.window.size()
    }

    /// Snapshot of activity counters.
    pub fn stats(&self) -> ControllerStats {
        self.inner.stats.snapshot()
    }
}

impl fmt::Debug for TwoPhaseController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.debug_fmt("TwoPhaseController", f)
    }
}

impl fmt::Debug for TwoPhaseOooController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.debug_fmt("TwoPhaseOooController", f)
    }
}
