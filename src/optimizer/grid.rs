//! Discrete hyperparameter grid for the random forest

use crate::config::ForestConfig;
use crate::error::{PretermError, Result};
use crate::training::RandomForest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One point of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl ForestParams {
    /// An unfitted forest with these hyperparameters and the shared forest settings
    pub fn build(&self, base: &ForestConfig) -> RandomForest {
        RandomForest::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(base.min_samples_leaf)
            .with_max_features(base.max_features)
            .with_criterion(base.criterion)
            .with_bootstrap(base.bootstrap)
            .with_random_state(base.random_state)
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self
            .max_depth
            .map_or_else(|| "None".to_string(), |d| d.to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_split={}",
            self.n_estimators, depth, self.min_samples_split
        )
    }
}

/// Candidate values per hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 200],
            max_depth: vec![Some(10), Some(20), None],
            min_samples_split: vec![2, 5, 10],
        }
    }
}

impl ParamGrid {
    /// Number of combinations
    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len() * self.min_samples_split.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combination at `index` in lexicographic order
    /// (n_estimators, then max_depth, then min_samples_split)
    pub fn get(&self, index: usize) -> Option<ForestParams> {
        if index >= self.len() {
            return None;
        }
        let n_split = self.min_samples_split.len();
        let n_depth = self.max_depth.len();

        Some(ForestParams {
            n_estimators: self.n_estimators[index / (n_depth * n_split)],
            max_depth: self.max_depth[(index / n_split) % n_depth],
            min_samples_split: self.min_samples_split[index % n_split],
        })
    }

    /// Every combination in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = ForestParams> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(PretermError::ConfigError(
                "hyperparameter grid has an empty axis".to_string(),
            ));
        }
        if self.n_estimators.contains(&0) {
            return Err(PretermError::ConfigError("n_estimators must be >= 1".to_string()));
        }
        if self.max_depth.contains(&Some(0)) {
            return Err(PretermError::ConfigError("max_depth must be >= 1".to_string()));
        }
        if self.min_samples_split.iter().any(|&m| m < 2) {
            return Err(PretermError::ConfigError("min_samples_split must be >= 2".to_string()));
        }
        Ok(())
    }
}
