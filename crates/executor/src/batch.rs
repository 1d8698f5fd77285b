//! Batch execution engine.
//!
//! Drives a slice of transactions through speculative execution, commit
//! and redo against a [`ConcurrencyController`]. Each round:
//!
//! 1. Execute every pending transaction in parallel against a
//!    [`SpeculativeView`] (no store mutation, only recording)
//! 2. Push the recorded change lists into the commit window
//! 3. Commit in increasing commit-id order
//! 4. Drain the redo queue; its ids become the next round's pending set
//!
//! Execution and commit never overlap, so batch outcomes are a pure
//! function of the transactions and the starting store state, whatever
//! the worker count.

use crate::{ExecutorConfig, ExecutorConfigError, SpeculativeView};
use magnitude_controller::{ConcurrencyController, PushError};
use magnitude_types::{CommitId, ModifyMap};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors from batch execution.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid executor configuration: {0}")]
    Config(#[from] ExecutorConfigError),

    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),

    /// A batch larger than the commit window would make distinct commit
    /// ids collide on window slots.
    #[error("batch of {batch} transactions exceeds the {window}-slot commit window")]
    BatchExceedsWindow { batch: usize, window: usize },

    #[error(transparent)]
    Push(#[from] PushError),
}

/// A unit of speculative work.
///
/// `execute` reads and writes through the view; the executor records the
/// accesses and drives validation, commit and redo. Implementations must
/// be deterministic in what they read: a redo runs them again against
/// fresher state.
pub trait Transaction: Send + Sync {
    fn execute(&self, view: &mut SpeculativeView<'_>);
}

impl<F> Transaction for F
where
    F: Fn(&mut SpeculativeView<'_>) + Send + Sync,
{
    fn execute(&self, view: &mut SpeculativeView<'_>) {
        self(view)
    }
}

/// Accounting for one execution round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStats {
    /// Round number, starting at 1.
    pub round: usize,
    /// Transactions executed this round.
    pub executed: usize,
    /// Commits that validated and applied.
    pub committed: usize,
    /// Commits queued for the next round.
    pub requeued: usize,
}

/// Outcome of one batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Transactions committed across all rounds.
    pub committed: usize,
    /// Commit ids still unresolved when the round limit was reached.
    pub gave_up: Vec<CommitId>,
    /// One entry per execution round.
    pub rounds: Vec<RoundStats>,
}

impl BatchReport {
    pub fn all_committed(&self) -> bool {
        self.gave_up.is_empty()
    }

    pub fn rounds_used(&self) -> usize {
        self.rounds.len()
    }
}

/// Executes transaction batches on a dedicated worker pool.
#[derive(Debug)]
pub struct BatchExecutor {
    controller: Arc<ConcurrencyController>,
    pool: rayon::ThreadPool,
    config: ExecutorConfig,
}

impl BatchExecutor {
    pub fn new(
        config: ExecutorConfig,
        controller: Arc<ConcurrencyController>,
    ) -> Result<Self, ExecutorError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("magnitude-exec-{i}"))
            .build()
            .map_err(|e| ExecutorError::PoolBuild(e.to_string()))?;

        info!(
            workers = config.worker_threads,
            max_redo_rounds = config.max_redo_rounds,
            kind = %controller.kind(),
            "batch executor ready"
        );
        Ok(Self {
            controller,
            pool,
            config,
        })
    }

    /// The controller this executor commits through.
    pub fn controller(&self) -> &ConcurrencyController {
        &self.controller
    }

    /// Run a batch to completion or to the redo round limit.
    ///
    /// Commit ids are assigned by batch position. The commit window is
    /// cleared first, so one executor owns its controller's window.
    #[instrument(skip(self, transactions), fields(batch = transactions.len()))]
    pub fn execute_batch(
        &self,
        transactions: &[Box<dyn Transaction>],
    ) -> Result<BatchReport, ExecutorError> {
        if transactions.len() > self.controller.window_size() {
            return Err(ExecutorError::BatchExceedsWindow {
                batch: transactions.len(),
                window: self.controller.window_size(),
            });
        }
        self.controller.clear();

        let mut pending: Vec<CommitId> = (0..transactions.len() as u64).map(CommitId).collect();
        let mut committed_total = 0;
        let mut rounds = Vec::new();

        while !pending.is_empty() && rounds.len() < self.config.max_redo_rounds {
            // Execution phase: speculative and parallel, store untouched.
            let change_lists: Vec<(CommitId, ModifyMap)> = self.pool.install(|| {
                pending
                    .par_iter()
                    .map(|&commit_id| {
                        let mut view = SpeculativeView::new(self.controller.storage());
                        transactions[commit_id.value() as usize].execute(&mut view);
                        (commit_id, view.into_changes())
                    })
                    .collect()
            });

            for (commit_id, changes) in change_lists {
                self.controller.push_commit(commit_id, changes)?;
            }

            // Commit phase: increasing commit-id order.
            for &commit_id in &pending {
                self.controller.commit(commit_id);
            }

            let requeued = self.controller.get_redo();
            let stats = RoundStats {
                round: rounds.len() + 1,
                executed: pending.len(),
                committed: pending.len() - requeued.len(),
                requeued: requeued.len(),
            };
            committed_total += stats.committed;
            debug!(
                round = stats.round,
                executed = stats.executed,
                committed = stats.committed,
                requeued = stats.requeued,
                "round finished"
            );
            rounds.push(stats);

            pending = requeued;
            pending.sort_unstable();
        }

        if !pending.is_empty() {
            warn!(
                unresolved = pending.len(),
                rounds = rounds.len(),
                "redo round limit reached with commits unresolved"
            );
        }

        Ok(BatchReport {
            committed: committed_total,
            gave_up: pending,
            rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnitude_controller::ControllerConfig;
    use magnitude_store::InMemoryStore;
    use magnitude_types::test_utils::test_address;

    fn occ_executor(window_size: usize) -> BatchExecutor {
        let store = Arc::new(InMemoryStore::new());
        let controller = ConcurrencyController::occ(
            &ControllerConfig::new().with_window_size(window_size),
            store,
        )
        .expect("config should be valid");
        BatchExecutor::new(
            ExecutorConfig::auto().with_worker_threads(2),
            Arc::new(controller),
        )
        .expect("pool should build")
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let controller =
            ConcurrencyController::occ(&ControllerConfig::default(), store).unwrap();
        let err = BatchExecutor::new(
            ExecutorConfig::auto().with_worker_threads(0),
            Arc::new(controller),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::Config(ExecutorConfigError::WorkerThreadsZero)
        ));
    }

    #[test]
    fn test_empty_batch_reports_nothing() {
        let executor = occ_executor(8);
        let report = executor.execute_batch(&[]).unwrap();
        assert_eq!(report.committed, 0);
        assert!(report.all_committed());
        assert_eq!(report.rounds_used(), 0);
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let executor = occ_executor(2);
        let addr = test_address(1);
        let transactions: Vec<Box<dyn Transaction>> = (0..3)
            .map(|i: u8| {
                Box::new(move |view: &mut SpeculativeView<'_>| {
                    view.store(addr, vec![i]);
                }) as Box<dyn Transaction>
            })
            .collect();

        let err = executor.execute_batch(&transactions).unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::BatchExceedsWindow {
                batch: 3,
                window: 2
            }
        ));
    }

    #[test]
    fn test_disjoint_batch_commits_in_one_round() {
        let executor = occ_executor(8);
        let transactions: Vec<Box<dyn Transaction>> = (0..8u8)
            .map(|i| {
                Box::new(move |view: &mut SpeculativeView<'_>| {
                    view.store(test_address(i), vec![i]);
                }) as Box<dyn Transaction>
            })
            .collect();

        let report = executor.execute_batch(&transactions).unwrap();
        assert_eq!(report.committed, 8);
        assert_eq!(report.rounds_used(), 1);
        assert!(report.all_committed());

        let store = executor.controller().storage();
        for i in 0..8u8 {
            assert_eq!(store.get(&test_address(i)), Some(vec![i]));
        }
    }
}
