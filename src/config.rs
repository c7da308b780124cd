//! Pipeline configuration
//!
//! Every default reproduces the reference training run: 20% held-out split with
//! seed 42, SMOTE with 5 neighbors, standard scaling, 10 sampled configurations
//! scored by 5-fold stratified CV, and forests seeded with 42.

use crate::data::TableSchema;
use crate::error::{PretermError, Result};
use crate::preprocessing::ZeroVariance;
use crate::training::{Criterion, MaxFeatures};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::optimizer::{ParamGrid, SearchConfig};

/// Held-out partition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out, in (0, 1)
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
        }
    }
}

/// Minority over-sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoteConfig {
    pub k_neighbors: usize,
    pub random_state: u64,
}

impl Default for SmoteConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    /// Handling of features with zero standard deviation
    pub zero_variance: ZeroVariance,
}

/// Forest settings shared by every candidate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub random_state: u64,
    pub criterion: Criterion,
    pub max_features: MaxFeatures,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            criterion: Criterion::Gini,
            max_features: MaxFeatures::Sqrt,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Reject 0/1-coded fields holding any other value
    pub strict_binary_fields: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            strict_binary_fields: true,
        }
    }
}

/// Complete training and inference configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub table: TableSchema,
    pub split: SplitConfig,
    pub smote: SmoteConfig,
    pub scaler: ScalerConfig,
    pub grid: ParamGrid,
    pub search: SearchConfig,
    pub forest: ForestConfig,
    pub inference: InferenceConfig,
}

impl PipelineConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.split.test_size = test_size;
        self
    }

    /// Set the SMOTE neighborhood size
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.smote.k_neighbors = k;
        self
    }

    /// Set the zero-variance policy
    pub fn with_zero_variance(mut self, policy: ZeroVariance) -> Self {
        self.scaler.zero_variance = policy;
        self
    }

    /// Replace the hyperparameter grid
    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Replace the search settings
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Toggle strict 0/1 checking of flag fields at inference
    pub fn with_strict_binary_fields(mut self, strict: bool) -> Self {
        self.inference.strict_binary_fields = strict;
        self
    }

    /// Use one seed for splitting, resampling, search and forests
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.split.random_state = seed;
        self.smote.random_state = seed;
        self.search.random_state = seed;
        self.forest.random_state = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(PretermError::ConfigError(format!(
                "split.test_size must be in (0, 1), got {}",
                self.split.test_size
            )));
        }
        if self.smote.k_neighbors == 0 {
            return Err(PretermError::ConfigError("smote.k_neighbors must be >= 1".to_string()));
        }
        if self.table.target_column.is_empty() {
            return Err(PretermError::ConfigError("table.target_column is empty".to_string()));
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(PretermError::ConfigError("forest.min_samples_leaf must be >= 1".to_string()));
        }
        if self.forest.max_features == MaxFeatures::Fixed(0) {
            return Err(PretermError::ConfigError("forest.max_features must be >= 1".to_string()));
        }
        self.grid.validate()?;
        self.search.validate()
    }

    /// Load and validate a configuration from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
