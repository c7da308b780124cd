//! Inference
//!
//! Single-record classification with the scaler and forest produced by a
//! completed training run.

mod predictor;

pub use predictor::Predictor;
