//! Controller configuration.

use thiserror::Error;

/// Default number of commit window slots.
pub const DEFAULT_WINDOW_SIZE: usize = 1024;

/// Default number of lock stripes in the writer index.
pub const DEFAULT_INDEX_STRIPES: usize = 16;

/// Invalid controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("window_size must be at least 1")]
    WindowSizeZero,

    #[error("index_stripes must be at least 1")]
    IndexStripesZero,
}

/// Configuration shared by all controller variants.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Number of slots in the commit window. A batch of transactions must
    /// fit within one window; slot index is `commit_id % window_size`.
    pub window_size: usize,

    /// Number of lock stripes guarding the per-address writer index
    /// (two-phase variants only; the OCC variant keeps no index).
    pub index_stripes: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            index_stripes: DEFAULT_INDEX_STRIPES,
        }
    }
}

impl ControllerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the commit window size.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set the writer index stripe count.
    pub fn with_index_stripes(mut self, index_stripes: usize) -> Self {
        self.index_stripes = index_stripes;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::WindowSizeZero);
        }
        if self.index_stripes == 0 {
            return Err(ConfigError::IndexStripesZero);
        }
        Ok(())
    }
}
