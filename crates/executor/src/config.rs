//! Executor configuration.

use std::num::NonZeroUsize;
use thiserror::Error;

/// Default cap on redo rounds before a batch gives up on its stragglers.
pub const DEFAULT_MAX_REDO_ROUNDS: usize = 8;

/// Errors from executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorConfigError {
    #[error("worker thread count must be non-zero")]
    WorkerThreadsZero,

    #[error("redo round limit must be non-zero")]
    MaxRedoRoundsZero,
}

/// Configuration for the batch executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Worker threads in the execution pool.
    pub worker_threads: usize,
    /// Execution rounds before remaining redo candidates are reported as
    /// given up. Round one is the initial execution.
    pub max_redo_rounds: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::auto()
    }
}

impl ExecutorConfig {
    /// Size the worker pool to the available CPU cores.
    pub fn auto() -> Self {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(4);
        Self {
            worker_threads: workers,
            max_redo_rounds: DEFAULT_MAX_REDO_ROUNDS,
        }
    }

    /// Set the worker thread count.
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers;
        self
    }

    /// Set the redo round limit.
    pub fn with_max_redo_rounds(mut self, rounds: usize) -> Self {
        self.max_redo_rounds = rounds;
        self
    }

    pub fn validate(&self) -> Result<(), ExecutorConfigError> {
        if self.worker_threads == 0 {
            return Err(ExecutorConfigError::WorkerThreadsZero);
        }
        if self.max_redo_rounds == 0 {
            return Err(ExecutorConfigError::MaxRedoRoundsZero);
        }
        Ok(())
    }
}
