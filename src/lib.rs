//! preterm-classifier - term / preterm pregnancy outcome classification
//!
//! This crate trains a random-forest classifier on a tabular set of clinical
//! and uterine-signal features and serves single-record predictions:
//! - Feature table loading and deterministic train/test partitioning
//! - SMOTE over-sampling of the minority class
//! - Standard scaling learned once and reapplied at inference
//! - Randomized hyperparameter search with stratified cross-validation
//! - A [`Predictor`](inference::Predictor) owning the fitted scaler and model
//!
//! # Modules
//!
//! - [`data`] - Canonical feature layout, table loading, partitioning
//! - [`synthetic`] - Minority over-sampling (SMOTE)
//! - [`preprocessing`] - Standard scaling
//! - [`training`] - Decision trees, random forest, cross-validation
//! - [`optimizer`] - Randomized hyperparameter search
//! - [`inference`] - Single-record prediction
//! - [`pipeline`] - Staged training pipeline
//! - [`config`] - Pipeline configuration
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use preterm_classifier::prelude::*;
//!
//! # fn main() -> preterm_classifier::error::Result<()> {
//! let config = PipelineConfig::default();
//! let table = FeatureTable::from_csv("data.csv", &config.table)?;
//!
//! let mut pipeline = TrainingPipeline::new(config);
//! pipeline.fit(&table)?;
//! let predictor = pipeline.into_predictor()?;
//!
//! let record = FeatureVector::parse_csv_record("28,1,0,62.5,0,0,1,0,0,0,0,0.02,0.3,0.25,0.6")?;
//! println!("{}", predictor.predict_vector(&record)?);
//! # Ok(())
//! # }
//! ```

pub mod error;

pub mod config;
pub mod data;
pub mod inference;
pub mod optimizer;
pub mod pipeline;
pub mod preprocessing;
pub mod synthetic;
pub mod training;

pub mod cli;

pub use error::{PretermError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::data::{FeatureTable, FeatureVector, Outcome, TableSchema, FEATURE_NAMES};
    pub use crate::error::{PretermError, Result};
    pub use crate::inference::Predictor;
    pub use crate::optimizer::{ForestParams, ParamGrid, RandomizedSearch, SearchConfig};
    pub use crate::pipeline::{PipelineStage, TrainingPipeline, TrainingSummary};
    pub use crate::preprocessing::{Scaler, ZeroVariance};
    pub use crate::synthetic::{Sampler, SMOTE};
    pub use crate::training::RandomForest;
}
