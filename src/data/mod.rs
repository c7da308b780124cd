//! Tabular data handling
//!
//! - Canonical feature layout and outcomes
//! - Feature table loading from CSV / polars DataFrames
//! - Deterministic train/test partitioning

mod features;
mod loader;
mod split;

pub use features::{
    feature_index, feature_prompt, is_binary_feature, FeatureVector, Outcome, BINARY_FEATURES,
    FEATURE_NAMES, INTEGER_FEATURES, N_FEATURES,
};
pub use loader::TableSchema;
pub use split::train_test_split;

use crate::error::{PretermError, Result};
use ndarray::{Array1, Array2, Axis};
use std::collections::BTreeMap;

/// A feature matrix paired with its label vector
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f64>,
    y: Array1<i64>,
}

impl Dataset {
    /// Create a dataset, checking that rows and labels line up
    pub fn new(x: Array2<f64>, y: Array1<i64>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(PretermError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        Ok(Self { x, y })
    }

    /// Feature matrix
    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    /// Labels
    pub fn y(&self) -> &Array1<i64> {
        &self.y
    }

    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    /// Row count per class, ordered by label
    pub fn class_counts(&self) -> BTreeMap<i64, usize> {
        class_counts(&self.y)
    }

    /// Rows taken at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }

    /// Labels as f64, for scoring
    pub fn y_f64(&self) -> Array1<f64> {
        self.y.mapv(|v| v as f64)
    }

    /// Split into matrix and labels
    pub fn into_parts(self) -> (Array2<f64>, Array1<i64>) {
        (self.x, self.y)
    }
}

/// Get class distribution, ordered by label
pub fn class_counts(y: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Get row indices for each class, ordered by label
pub fn class_indices(y: &Array1<i64>) -> BTreeMap<i64, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}

/// The full labelled table in canonical feature order, administrative columns removed
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    data: Dataset,
}

impl FeatureTable {
    /// Build a table from a canonical-order matrix and binary labels
    pub fn from_arrays(x: Array2<f64>, y: Array1<i64>) -> Result<Self> {
        if x.ncols() != N_FEATURES {
            return Err(PretermError::ShapeError {
                expected: format!("{} feature columns", N_FEATURES),
                actual: format!("{} columns", x.ncols()),
            });
        }
        if let Some(bad) = y.iter().find(|&&label| label != 0 && label != 1) {
            return Err(PretermError::DataError(format!(
                "label column must be 0/1, found {}",
                bad
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PretermError::DataError(
                "feature table contains missing or non-finite values".to_string(),
            ));
        }
        Ok(Self {
            data: Dataset::new(x, y)?,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.data.n_rows()
    }

    /// Underlying matrix and labels
    pub fn dataset(&self) -> &Dataset {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dataset_shape_mismatch() {
        let x = Array2::<f64>::zeros((3, 2));
        let y = array![0, 1];
        assert!(matches!(Dataset::new(x, y), Err(PretermError::ShapeError { .. })));
    }

    #[test]
    fn test_select_and_counts() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0, 1, 1, 1];
        let ds = Dataset::new(x, y).unwrap();

        let counts = ds.class_counts();
        assert_eq!(counts[&0], 1);
        assert_eq!(counts[&1], 3);

        let sub = ds.select(&[3, 0]);
        assert_eq!(sub.x()[[0, 0]], 4.0);
        assert_eq!(sub.y().to_vec(), vec![1, 0]);

        let idx = class_indices(ds.y());
        assert_eq!(idx[&1], vec![1, 2, 3]);
    }

    #[test]
    fn test_table_rejects_bad_labels_and_shape() {
        let x = Array2::<f64>::zeros((2, N_FEATURES));
        assert!(FeatureTable::from_arrays(x.clone(), array![0, 2]).is_err());
        assert!(FeatureTable::from_arrays(Array2::zeros((2, 3)), array![0, 1]).is_err());
        assert!(FeatureTable::from_arrays(x, array![0, 1]).is_ok());
    }

    #[test]
    fn test_table_rejects_nan() {
        let mut x = Array2::<f64>::zeros((2, N_FEATURES));
        x[[1, 3]] = f64::NAN;
        assert!(matches!(
            FeatureTable::from_arrays(x, array![0, 1]),
            Err(PretermError::DataError(_))
        ));
    }
}
