//! Search configuration

use crate::error::{PretermError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the randomized hyperparameter search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of grid points to evaluate
    pub n_iter: usize,

    /// Stratified cross-validation folds
    pub cv_folds: usize,

    /// Shuffle rows within each class before dealing them into folds
    pub shuffle_folds: bool,

    /// Seed for candidate sampling (and fold shuffling, when enabled)
    pub random_state: u64,

    /// Worker threads; `None` uses the global rayon pool
    pub n_jobs: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iter: 10,
            cv_folds: 5,
            shuffle_folds: false,
            random_state: 42,
            n_jobs: None,
        }
    }
}

impl SearchConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the number of sampled configurations
    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    /// Builder method to set the fold count
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set the seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to bound parallelism
    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = Some(n);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_iter == 0 {
            return Err(PretermError::ConfigError("search.n_iter must be >= 1".to_string()));
        }
        if self.cv_folds < 2 {
            return Err(PretermError::ConfigError("search.cv_folds must be >= 2".to_string()));
        }
        if self.n_jobs == Some(0) {
            return Err(PretermError::ConfigError("search.n_jobs must be >= 1".to_string()));
        }
        Ok(())
    }
}
