//! Random Forest classifier

use super::decision_tree::{Criterion, DecisionTree};
use crate::error::{PretermError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum features per split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: Option<u64>,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set maximum depth (`None` grows until leaves are pure)
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PretermError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PretermError::ValidationError(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }

        self.n_features = n_features;
        let max_features = self.compute_max_features(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        // Trees are independent; collect keeps them in index order
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<i64> = sample_indices.iter().map(|&i| y[i]).collect();

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_criterion(self.criterion)
                    .with_random_state(rng.gen());
                tree.max_depth = self.max_depth;

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        let n_trees = trees.len() as f64;
        debug!(
            trees = trees.len(),
            mean_depth = trees.iter().map(DecisionTree::get_depth).sum::<usize>() as f64 / n_trees,
            mean_leaves = trees.iter().map(DecisionTree::get_n_leaves).sum::<usize>() as f64 / n_trees,
            "Forest grown"
        );

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = Array1::<f64>::zeros(self.n_features);
        for imp in self.trees.iter().filter_map(|t| t.feature_importances()) {
            total += imp;
        }

        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        self.feature_importances = Some(total);
    }

    /// Mean class-1 probability across trees for one row
    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(PretermError::NotFitted);
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict_proba_row(row)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Mean class-1 probability across trees for every row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PretermError::NotFitted);
        }

        let per_row: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.predict_proba_row(x.row(i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Array1::from_vec(per_row))
    }

    /// Predict 0/1 labels; class 1 only when its mean probability exceeds 0.5
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(self.predict_proba(x)?.mapv(|p| (p > 0.5) as i64))
    }

    /// Predict the label of a single row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<i64> {
        Ok((self.predict_proba_row(row)? > 0.5) as i64)
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Fraction of predictions equal to the true labels
pub fn accuracy(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(a, b)| a == b).count();
    correct as f64 / y_true.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0, 0, 0, 1, 1, 1];

        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let acc = accuracy(&y, &predictions);
        assert!(acc >= 0.8, "Accuracy too low: {}", acc);
        assert_eq!(rf.n_trees(), 10);
    }

    #[test]
    fn test_predict_proba_range() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [0.2, 0.1], [0.9, 1.1]];
        let y = array![0, 1, 0, 1];

        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), 4);
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let x = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = Array1::from_shape_fn(40, |i| ((i * 7) % 11 > 5) as i64);

        let mut a = RandomForest::new(15).with_random_state(42);
        let mut b = RandomForest::new(15).with_random_state(42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0], [5.0, 0.0], [6.0, 0.0]];
        let y = array![0, 0, 0, 1, 1, 1];

        let mut rf = RandomForest::new(10)
            .with_max_features(MaxFeatures::All)
            .with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!(importances[0] >= importances[1]);
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = RandomForest::new(5);
        assert!(matches!(rf.predict(&array![[1.0]]), Err(PretermError::NotFitted)));
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&array![0, 1, 1, 0], &array![0, 1, 0, 0]), 0.75);
    }
}
