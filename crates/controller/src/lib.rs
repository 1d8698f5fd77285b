//! Concurrency controllers for speculative commit over a versioned store.
//!
//! A controller tracks in-flight transactions inside a fixed-size commit
//! window. Transactions execute speculatively and push their recorded
//! reads and writes here as a [`ModifyMap`](magnitude_types::ModifyMap);
//! at commit time the controller validates the map and, on success,
//! applies the final effect per address to the store. Failed commits are
//! queued for redo so the orchestrator can re-execute them with fresh
//! reads.
//!
//! Three validation strategies are provided behind one facade:
//!
//! - [`OccController`]: optimistic, checks observed LOAD versions
//! - [`TwoPhaseController`]: first-writer-wins on a pending-writer index
//! - [`TwoPhaseOooController`]: first-writer-wins bookkeeping with
//!   version validation, tolerating out-of-order commit submission
//!
//! Construct via [`ConcurrencyController`] unless a concrete variant
//! type is needed.

mod config;
mod controller;
mod error;
mod index;
mod occ;
mod partition;
mod redo;
mod stats;
mod two_phase;
mod validation;
mod window;

pub use config::{ConfigError, ControllerConfig, DEFAULT_INDEX_STRIPES, DEFAULT_WINDOW_SIZE};
pub use controller::{ConcurrencyController, ControllerKind};
pub use error::{AbortReason, CommitOutcome, PushError};
pub use occ::OccController;
pub use partition::{FoldPartitioner, Partitioner};
pub use stats::ControllerStats;
pub use two_phase::{TwoPhaseController, TwoPhaseOooController};

pub(crate) use redo::RedoScheduler;
