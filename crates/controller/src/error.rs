//! Error and outcome types for the commit protocol.

use magnitude_types::{Address, CommitId, Version};
use thiserror::Error;

/// Rejected `push_commit`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    /// The window slot is still held by a different commit id. The slot
    /// must be released (commit + remove, or clear) before it can be
    /// reused.
    #[error("window slot {slot} still holds commit {occupant}, rejected push of commit {pushed}")]
    DuplicateCommitSlot {
        /// Window slot index (`commit_id % window_size`).
        slot: usize,
        /// Commit id currently occupying the slot.
        occupant: CommitId,
        /// Commit id that was being pushed.
        pushed: CommitId,
    },
}

/// Why a commit did not apply.
///
/// None of these are fatal: a missing record reports "commit failed" to the
/// caller, and conflicts/ordering violations are the normal outcomes that
/// drive the redo path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortReason {
    /// No change list was pushed for this commit id (or its slot has
    /// already been released).
    #[error("no change list pushed for commit {commit_id}")]
    MissingRecord {
        /// Commit id the caller asked to validate.
        commit_id: CommitId,
    },

    /// A LOAD recorded one version but the store now holds another: a
    /// conflicting write landed between the read and this validation.
    #[error("stale read of {address}: observed version {observed}, live version {live}")]
    VersionConflict {
        /// Address whose read went stale.
        address: Address,
        /// Version the transaction observed at read time.
        observed: Version,
        /// Version the store holds at validation time.
        live: Version,
    },

    /// An earlier pending writer exists for one of this transaction's
    /// write dependencies (first-writer-wins window).
    #[error("commit {commit_id} is not the earliest pending writer of {address} (earliest is {earliest})")]
    OrderingViolation {
        /// Commit id that attempted to validate.
        commit_id: CommitId,
        /// Contended address.
        address: Address,
        /// Earliest pending writer registered for the address.
        earliest: CommitId,
    },
}

impl AbortReason {
    /// Short name for logging and stats.
    pub fn type_name(&self) -> &'static str {
        match self {
            AbortReason::MissingRecord { .. } => "missing_record",
            AbortReason::VersionConflict { .. } => "version_conflict",
            AbortReason::OrderingViolation { .. } => "ordering_violation",
        }
    }
}

/// Disposition of one `commit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Validation passed and the final effects were applied to the store.
    Committed,

    /// Validation failed; the store is untouched and (except for a missing
    /// record) the commit id has been queued for redo.
    Aborted(AbortReason),
}

impl CommitOutcome {
    /// Whether the changes were applied.
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed)
    }

    /// The abort reason, if any.
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            CommitOutcome::Committed => None,
            CommitOutcome::Aborted(reason) => Some(reason),
        }
    }
}
