//! Error types for the preterm classification pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PretermError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PretermError {
    #[error("Insufficient samples for resampling: {0}")]
    InsufficientSamples(String),

    #[error("Degenerate feature '{name}' (index {index}): zero variance")]
    DegenerateFeature { index: usize, name: String },

    #[error("Estimator not fitted")]
    NotFitted,

    #[error("Insufficient data for {folds}-fold cross-validation: class {class} has {count} rows")]
    InsufficientDataForCV {
        folds: usize,
        class: i64,
        count: usize,
    },

    #[error("Invalid feature vector: {0}")]
    InvalidFeatureVector(String),

    #[error("Pipeline not ready: current stage is {0}")]
    PipelineNotReady(String),

    #[error("Invalid pipeline transition: cannot {action} from stage {stage}")]
    InvalidTransition { action: String, stage: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for PretermError {
    fn from(err: polars::error::PolarsError) -> Self {
        PretermError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PretermError {
    fn from(err: serde_json::Error) -> Self {
        PretermError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PretermError {
    fn from(err: ndarray::ShapeError) -> Self {
        PretermError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
