//! Predictor applying the fitted scaler and forest to raw records

use crate::data::{is_binary_feature, FeatureVector, Outcome, FEATURE_NAMES, N_FEATURES};
use crate::error::{PretermError, Result};
use crate::preprocessing::Scaler;
use crate::training::RandomForest;
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Classifier for raw records in canonical feature order.
///
/// Holds the training-time scaler and forest behind `Arc`s; clones share them
/// and nothing can modify them after construction.
#[derive(Debug, Clone)]
pub struct Predictor {
    scaler: Arc<Scaler>,
    model: Arc<RandomForest>,
    strict_binary_fields: bool,
}

impl Predictor {
    /// Build from a fitted scaler and forest
    pub fn new(scaler: Scaler, model: RandomForest) -> Result<Self> {
        if !scaler.is_fitted() {
            return Err(PretermError::NotFitted);
        }
        if model.n_trees() == 0 {
            return Err(PretermError::NotFitted);
        }
        Ok(Self {
            scaler: Arc::new(scaler),
            model: Arc::new(model),
            strict_binary_fields: true,
        })
    }

    /// Enable or disable 0/1 checking of flag fields
    pub fn with_strict_binary_fields(mut self, strict: bool) -> Self {
        self.strict_binary_fields = strict;
        self
    }

    pub fn strict_binary_fields(&self) -> bool {
        self.strict_binary_fields
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn model(&self) -> &RandomForest {
        &self.model
    }

    fn validate(&self, values: &[f64]) -> Result<()> {
        if values.len() != N_FEATURES {
            return Err(PretermError::InvalidFeatureVector(format!(
                "expected {} values, got {}",
                N_FEATURES,
                values.len()
            )));
        }
        for (i, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(PretermError::InvalidFeatureVector(format!(
                    "{} is not finite: {}",
                    FEATURE_NAMES[i], v
                )));
            }
            if self.strict_binary_fields && is_binary_feature(i) && v != 0.0 && v != 1.0 {
                return Err(PretermError::InvalidFeatureVector(format!(
                    "{} must be 0 or 1, got {}",
                    FEATURE_NAMES[i], v
                )));
            }
        }
        Ok(())
    }

    fn proba(&self, row: ArrayView1<f64>) -> Result<f64> {
        let scaled = self.scaler.transform_row(row)?;
        self.model.predict_proba_row(scaled.view())
    }

    /// Probability that the record reaches term
    pub fn predict_proba(&self, values: &[f64]) -> Result<f64> {
        self.validate(values)?;
        self.proba(ArrayView1::from(values))
    }

    /// Classify a raw record
    pub fn predict(&self, values: &[f64]) -> Result<Outcome> {
        let p = self.predict_proba(values)?;
        let outcome = if p > 0.5 { Outcome::Term } else { Outcome::Preterm };
        debug!(p_term = p, outcome = %outcome, "Classified record");
        Ok(outcome)
    }

    /// Classify an already arity-checked record
    pub fn predict_vector(&self, record: &FeatureVector) -> Result<Outcome> {
        self.predict(record.as_slice())
    }

    /// Labels for every raw row of `x`, in row order
    pub fn predict_batch(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let labels = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let values = row.to_vec();
                self.validate(&values)?;
                Ok((self.proba(row)? > 0.5) as i64)
            })
            .collect::<Result<Vec<i64>>>()?;
        Ok(Array1::from_vec(labels))
    }
}
