//! Variant-dispatching facade over the three controller flavors.

use crate::partition::Partitioner;
use crate::{
    AbortReason, CommitOutcome, ConfigError, ControllerConfig, ControllerStats, OccController,
    PushError, TwoPhaseController, TwoPhaseOooController,
};
use magnitude_store::VersionedStore;
use magnitude_types::{CommitId, ModifyMap};
use std::fmt;
use std::sync::Arc;

/// Which validation strategy a [`ConcurrencyController`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    /// Version validation at commit time.
    Occ,
    /// First-writer-wins ordering, in-order commit submission.
    TwoPhase,
    /// First-writer-wins bookkeeping with version validation, commit
    /// order irrelevant.
    TwoPhaseOutOfOrder,
}

impl ControllerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Occ => "occ",
            Self::TwoPhase => "two-phase",
            Self::TwoPhaseOutOfOrder => "two-phase-ooo",
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concurrency controller over a versioned store.
///
/// All variants share the same surface: push a change list at a commit
/// id, commit it (validate, then apply final effects), collect commit
/// ids that need re-execution, and clear between rounds. They differ
/// only in what validation means; see the variant types for the exact
/// rules.
#[derive(Debug)]
pub enum ConcurrencyController {
    Occ(OccController),
    TwoPhase(TwoPhaseController),
    TwoPhaseOutOfOrder(TwoPhaseOooController),
}

impl ConcurrencyController {
    /// Optimistic validation against live store versions.
    pub fn occ(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::Occ(OccController::new(config, store)?))
    }

    /// First-writer-wins with in-order commit submission.
    pub fn two_phase(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::TwoPhase(TwoPhaseController::new(config, store)?))
    }

    /// First-writer-wins with a caller-supplied index partitioner.
    pub fn two_phase_with_partitioner(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
        partitioner: Arc<dyn Partitioner>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::TwoPhase(TwoPhaseController::new_with_partitioner(
            config,
            store,
            partitioner,
        )?))
    }

    /// Out-of-order tolerant first-writer-wins.
    pub fn two_phase_out_of_order(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::TwoPhaseOutOfOrder(TwoPhaseOooController::new(
            config, store,
        )?))
    }

    /// Out-of-order tolerant first-writer-wins with a caller-supplied
    /// index partitioner.
    pub fn two_phase_out_of_order_with_partitioner(
        config: &ControllerConfig,
        store: Arc<dyn VersionedStore>,
        partitioner: Arc<dyn Partitioner>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::TwoPhaseOutOfOrder(
            TwoPhaseOooController::new_with_partitioner(config, store, partitioner)?,
        ))
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            Self::Occ(_) => ControllerKind::Occ,
            Self::TwoPhase(_) => ControllerKind::TwoPhase,
            Self::TwoPhaseOutOfOrder(_) => ControllerKind::TwoPhaseOutOfOrder,
        }
    }

    /// Record a transaction's change list at its commit id.
    pub fn push_commit(&self, commit_id: CommitId, changes: ModifyMap) -> Result<(), PushError> {
        match self {
            Self::Occ(c) => c.push_commit(commit_id, changes),
            Self::TwoPhase(c) => c.push_commit(commit_id, changes),
            Self::TwoPhaseOutOfOrder(c) => c.push_commit(commit_id, changes),
        }
    }

    /// Validate the change list at `commit_id` without applying it.
    pub fn check_commit(&self, commit_id: CommitId) -> Result<(), AbortReason> {
        match self {
            Self::Occ(c) => c.check_commit(commit_id),
            Self::TwoPhase(c) => c.check_commit(commit_id),
            Self::TwoPhaseOutOfOrder(c) => c.check_commit(commit_id),
        }
    }

    /// Validate and apply the change list at `commit_id`.
    pub fn commit(&self, commit_id: CommitId) -> CommitOutcome {
        match self {
            Self::Occ(c) => c.commit(commit_id),
            Self::TwoPhase(c) => c.commit(commit_id),
            Self::TwoPhaseOutOfOrder(c) => c.commit(commit_id),
        }
    }

    /// Take the commit ids queued for re-execution.
    pub fn get_redo(&self) -> Vec<CommitId> {
        match self {
            Self::Occ(c) => c.get_redo(),
            Self::TwoPhase(c) => c.get_redo(),
            Self::TwoPhaseOutOfOrder(c) => c.get_redo(),
        }
    }

    /// Clone the change list pushed at `commit_id`, if any.
    pub fn change_list(&self, commit_id: CommitId) -> Option<ModifyMap> {
        match self {
            Self::Occ(c) => c.change_list(commit_id),
            Self::TwoPhase(c) => c.change_list(commit_id),
            Self::TwoPhaseOutOfOrder(c) => c.change_list(commit_id),
        }
    }

    /// Release one window slot, returning its change list.
    pub fn remove(&self, commit_id: CommitId) -> Option<ModifyMap> {
        match self {
            Self::Occ(c) => c.remove(commit_id),
            Self::TwoPhase(c) => c.remove(commit_id),
            Self::TwoPhaseOutOfOrder(c) => c.remove(commit_id),
        }
    }

    /// Reset all per-window state; idempotent.
    pub fn clear(&self) {
        match self {
            Self::Occ(c) => c.clear(),
            Self::TwoPhase(c) => c.clear(),
            Self::TwoPhaseOutOfOrder(c) => c.clear(),
        }
    }

    /// Read-only access to the underlying store.
    pub fn storage(&self) -> &dyn VersionedStore {
        match self {
            Self::Occ(c) => c.storage(),
            Self::TwoPhase(c) => c.storage(),
            Self::TwoPhaseOutOfOrder(c) => c.storage(),
        }
    }

    /// Number of window slots.
    pub fn window_size(&self) -> usize {
        match self {
            Self::Occ(c) => c.window_size(),
            Self::TwoPhase(c) => c.window_size(),
            Self::TwoPhaseOutOfOrder(c) => c.window_size(),
        }
    }

    /// Snapshot of activity counters.
    pub fn stats(&self) -> ControllerStats {
        match self {
            Self::Occ(c) => c.stats(),
            Self::TwoPhase(c) => c.stats(),
            Self::TwoPhaseOutOfOrder(c) => c.stats(),
        }
    }
}
