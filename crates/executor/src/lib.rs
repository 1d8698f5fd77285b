//! Speculative batch execution over a concurrency controller.
//!
//! This crate turns the controller's push/commit/redo protocol into a
//! batch engine: transactions run in parallel against a read-your-writes
//! [`SpeculativeView`], their recorded change lists are pushed at
//! position-derived commit ids, and aborted commits are re-executed in
//! redo rounds until the batch settles or a round limit is hit.

mod batch;
mod config;
mod view;

pub use batch::{BatchExecutor, BatchReport, ExecutorError, RoundStats, Transaction};
pub use config::{ExecutorConfig, ExecutorConfigError, DEFAULT_MAX_REDO_ROUNDS};
pub use view::SpeculativeView;
