//! Stratified k-fold cross-validation

use crate::data::class_indices;
use crate::error::{PretermError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold splitter (maintains class distribution)
#[derive(Debug, Clone)]
pub struct CrossValidator {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl CrossValidator {
    /// Create a new cross-validator with `n_splits` folds
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Shuffle rows within each class before dealing them into folds
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Generate train/test splits over the rows labelled by `y`.
    ///
    /// Rows of each class are dealt round-robin into folds, classes in label
    /// order. Fails with `InsufficientDataForCV` when fewer than two folds are
    /// requested or any class has fewer rows than folds; a fold count below
    /// two reports the smallest class.
    pub fn split(&self, y: &Array1<i64>) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits;
        let mut by_class = class_indices(y);

        if n_splits < 2 {
            let (class, count) = by_class
                .iter()
                .map(|(&class, indices)| (class, indices.len()))
                .min_by_key(|&(_, count)| count)
                .unwrap_or((0, 0));
            return Err(PretermError::InsufficientDataForCV {
                folds: n_splits,
                class,
                count,
            });
        }

        for (&class, indices) in &by_class {
            if indices.len() < n_splits {
                return Err(PretermError::InsufficientDataForCV {
                    folds: n_splits,
                    class,
                    count: indices.len(),
                });
            }
        }

        if self.shuffle {
            let mut rng = self.rng();
            for indices in by_class.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        for indices in by_class.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[i % n_splits].push(idx);
            }
        }

        let splits = (0..n_splits)
            .map(|fold_idx| CVSplit {
                test_indices: folds[fold_idx].clone(),
                train_indices: folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect(),
                fold_idx,
            })
            .collect();

        Ok(splits)
    }
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: 0.0,
                std_score: 0.0,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
