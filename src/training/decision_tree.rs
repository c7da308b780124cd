//! Binary CART classification tree

use crate::error::{PretermError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the fraction of class-1 rows that reached it
    Leaf {
        proba: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    /// Impurity of a node with `pos` class-1 rows out of `n`
    fn impurity(self, pos: usize, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let p1 = pos as f64 / n as f64;
        let p0 = 1.0 - p1;
        match self {
            Criterion::Gini => 1.0 - p0 * p0 - p1 * p1,
            Criterion::Entropy => [p0, p1]
                .iter()
                .filter(|&&p| p > 0.0)
                .map(|&p| -p * p.ln())
                .sum(),
        }
    }
}

/// Decision tree classifier for 0/1 labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for per-split feature sampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
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

    /// Set number of features tried per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
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
                "cannot fit a tree on zero rows".to_string(),
            ));
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0 && v != 1) {
            return Err(PretermError::ValidationError(format!(
                "labels must be 0/1, found {}",
                bad
            )));
        }

        self.n_features = n_features;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let pos = indices.iter().filter(|&&i| y[i] == 1).count();
        let leaf = TreeNode::Leaf {
            proba: pos as f64 / n_samples.max(1) as f64,
            n_samples,
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || pos == 0
            || pos == n_samples;

        if should_stop {
            return leaf;
        }

        let Some((feature_idx, threshold, gain)) = self.find_best_split(x, y, indices, pos, rng) else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain.max(0.0);

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity: self.criterion.impurity(pos, n_samples),
        }
    }

    /// Best (feature, threshold, gain) for an impure node.
    ///
    /// Features are visited in a seeded random order. The first `max_features`
    /// are searched together; if none of them can split the node (every value
    /// equal, or `min_samples_leaf` violated), the remaining features are tried
    /// one at a time until one can. Zero-gain splits are accepted.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        indices: &[usize],
        pos: usize,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, f64)> {
        let n_features = x.ncols();
        let n_try = self.max_features.unwrap_or(n_features).min(n_features);
        let mut order: Vec<usize> = (0..n_features).collect();
        if n_try < n_features {
            order.shuffle(rng);
        }

        let (head, rest) = order.split_at(n_try);
        self.best_among(head, x, y, indices, pos).or_else(|| {
            rest.iter()
                .find_map(|&f| self.best_among(&[f], x, y, indices, pos))
        })
    }

    /// Best split over `features`; `None` when no feature has a valid threshold
    fn best_among(
        &self,
        features: &[usize],
        x: &Array2<f64>,
        y: &Array1<i64>,
        indices: &[usize],
        pos: usize,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let parent_impurity = self.criterion.impurity(pos, n);

        // Each candidate feature independently sweeps its sorted values
        let feature_results: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut sorted: Vec<(f64, i64)> = indices
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], y[i]))
                    .collect();
                sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

                let mut best: Option<(f64, f64)> = None;
                let mut left_pos = 0usize;

                for split in 1..n {
                    left_pos += (sorted[split - 1].1 == 1) as usize;
                    let (lo, hi) = (sorted[split - 1].0, sorted[split].0);
                    if lo == hi {
                        continue;
                    }

                    let left_count = split;
                    let right_count = n - split;
                    if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left_count as f64 * self.criterion.impurity(left_pos, left_count)
                        + right_count as f64 * self.criterion.impurity(pos - left_pos, right_count))
                        / n as f64;
                    let gain = parent_impurity - weighted;

                    if gain > best.map_or(f64::NEG_INFINITY, |b| b.1) {
                        best = Some(((lo + hi) / 2.0, gain));
                    }
                }

                best.map(|(threshold, gain)| (feature_idx, threshold, gain))
            })
            .collect();

        // First feature in visiting order wins ties
        feature_results.into_iter().flatten().fold(None, |acc, cand| match acc {
            Some((_, _, g)) if cand.2 <= g => acc,
            _ => Some(cand),
        })
    }

    /// Probability of class 1 for a single row
    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or(PretermError::NotFitted)?;
        if row.len() != self.n_features {
            return Err(PretermError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", row.len()),
            });
        }
        loop {
            match node {
                TreeNode::Leaf { proba, .. } => return Ok(*proba),
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Probability of class 1 for every row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        x.rows()
            .into_iter()
            .map(|row| self.predict_proba_row(row))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from_vec)
    }

    /// Predicted 0/1 labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(self.predict_proba(x)?.mapv(|p| (p > 0.5) as i64))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}
