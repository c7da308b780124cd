//! SMOTE (Synthetic Minority Over-sampling Technique)

use crate::data::{class_counts, class_indices, Dataset};
use crate::error::{PretermError, Result};
use crate::synthetic::{ResampleResult, Sampler};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::debug;

/// Distance/index pair; equal distances order by index so neighbor sets are stable
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// SMOTE over-sampler balancing every class up to the majority count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: Option<u64>,
    /// Target samples per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    /// Create new SMOTE sampler
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: None,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Euclidean distance
    fn distance(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// k nearest neighbors of `data[point]`, nearest first, excluding the point itself
    fn find_neighbors(point: usize, data: &[Vec<f64>], k: usize) -> Vec<usize> {
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, d) in data.iter().enumerate() {
            if i == point {
                continue;
            }
            let candidate = DistIdx(Self::distance(&data[point], d), i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(&worst) = heap.peek() {
                if candidate < worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec().into_iter().map(|DistIdx(_, i)| i).collect()
    }

    /// Generate synthetic sample between two points
    fn generate_sample(point: &[f64], neighbor: &[f64], rng: &mut StdRng) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point
            .iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, data: &Dataset) -> Result<()> {
        let counts = class_counts(data.y());

        if counts.len() < 2 {
            return Err(PretermError::InsufficientSamples(format!(
                "need rows of both classes, found classes {:?}",
                counts.keys().collect::<Vec<_>>()
            )));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);

        // Each class that needs new rows must be able to form a full neighborhood
        for (&class, &count) in &counts {
            if count < max_count && count < self.k_neighbors + 1 {
                return Err(PretermError::InsufficientSamples(format!(
                    "class {} has {} rows, need at least {} for k_neighbors = {}",
                    class,
                    count,
                    self.k_neighbors + 1,
                    self.k_neighbors
                )));
            }
        }

        let targets = counts.keys().map(|&class| (class, max_count)).collect();
        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, data: &Dataset) -> Result<ResampleResult> {
        let targets = self.target_counts.as_ref().ok_or_else(|| {
            PretermError::ValidationError("SMOTE not fitted".to_string())
        })?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let x = data.x();
        let indices = class_indices(data.y());
        let n_features = x.ncols();

        let mut synthetic_x: Vec<Vec<f64>> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, &target_count) in targets {
            let class_idx = indices.get(&class).map(Vec::as_slice).unwrap_or(&[]);
            let n_to_generate = target_count.saturating_sub(class_idx.len());
            n_synthetic.insert(class, n_to_generate);

            if n_to_generate == 0 {
                continue;
            }
            if class_idx.len() < self.k_neighbors + 1 {
                return Err(PretermError::InsufficientSamples(format!(
                    "class {} has {} rows, need at least {}",
                    class,
                    class_idx.len(),
                    self.k_neighbors + 1
                )));
            }

            let class_samples: Vec<Vec<f64>> = class_idx
                .iter()
                .map(|&i| x.row(i).to_vec())
                .collect();

            let neighbors: Vec<Vec<usize>> = (0..class_samples.len())
                .map(|i| Self::find_neighbors(i, &class_samples, self.k_neighbors))
                .collect();

            for _ in 0..n_to_generate {
                let idx = rng.gen_range(0..class_samples.len());
                let neighbor_idx = neighbors[idx][rng.gen_range(0..neighbors[idx].len())];

                synthetic_x.push(Self::generate_sample(
                    &class_samples[idx],
                    &class_samples[neighbor_idx],
                    &mut rng,
                ));
                synthetic_y.push(class);
            }

            debug!(class, generated = n_to_generate, "SMOTE synthesized rows");
        }

        // Original rows first, then synthetic rows
        let n_original = x.nrows();
        let n_total = n_original + synthetic_x.len();
        let result_x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[i - n_original][j]
            }
        });

        let mut all_y: Vec<i64> = data.y().to_vec();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            data: Dataset::new(result_x, Array1::from_vec(all_y))?,
            n_synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_imbalanced_data() -> Dataset {
        // 20 majority, 8 minority
        let mut data = Vec::new();
        let mut labels = Vec::new();

        // Majority class (1) around (0, 0)
        for i in 0..20 {
            data.push((i % 5) as f64);
            data.push((i / 5) as f64);
            labels.push(1i64);
        }

        // Minority class (0) around (10, 10)
        for i in 0..8 {
            data.push(10.0 + (i % 3) as f64);
            data.push(10.0 + (i / 3) as f64);
            labels.push(0i64);
        }

        let x = Array2::from_shape_vec((28, 2), data).unwrap();
        Dataset::new(x, Array1::from_vec(labels)).unwrap()
    }

    #[test]
    fn test_smote_balances_classes() {
        let data = create_imbalanced_data();

        let mut smote = SMOTE::new().with_k_neighbors(3).with_seed(42);
        let result = smote.fit_resample(&data).unwrap();

        let counts = result.data.class_counts();
        assert_eq!(counts[&0], 20);
        assert_eq!(counts[&1], 20);
        assert_eq!(result.n_synthetic[&0], 12);
        assert_eq!(result.n_synthetic[&1], 0);
        assert_eq!(result.total_synthetic(), 12);
    }

    #[test]
    fn test_smote_preserves_original() {
        let data = create_imbalanced_data();
        let original_rows = data.n_rows();

        let mut smote = SMOTE::new().with_seed(42);
        let result = smote.fit_resample(&data).unwrap();

        for i in 0..original_rows {
            for j in 0..data.n_features() {
                assert_eq!(result.data.x()[[i, j]], data.x()[[i, j]]);
            }
            assert_eq!(result.data.y()[i], data.y()[i]);
        }
    }

    #[test]
    fn test_synthetic_rows_inside_minority_range() {
        let data = create_imbalanced_data();
        let mut smote = SMOTE::new().with_k_neighbors(3).with_seed(7);
        let result = smote.fit_resample(&data).unwrap();

        for row in result.data.x().rows().into_iter().skip(data.n_rows()) {
            assert!(row[0] >= 10.0 && row[0] <= 12.0, "x0 out of range: {}", row[0]);
            assert!(row[1] >= 10.0 && row[1] <= 12.0, "x1 out of range: {}", row[1]);
        }
    }

    #[test]
    fn test_smote_deterministic() {
        let data = create_imbalanced_data();
        let a = SMOTE::new().with_seed(42).fit_resample(&data).unwrap();
        let b = SMOTE::new().with_seed(42).fit_resample(&data).unwrap();
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_smote_single_class() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let data = Dataset::new(x, Array1::from_vec(vec![1, 1, 1])).unwrap();
        let err = SMOTE::new().fit_resample(&data).unwrap_err();
        assert!(matches!(err, PretermError::InsufficientSamples(_)));
    }

    #[test]
    fn test_smote_too_few_minority_rows() {
        let x = Array2::from_shape_fn((12, 2), |(i, j)| (i + j) as f64);
        let mut y = vec![1i64; 12];
        for label in y.iter_mut().take(5) {
            *label = 0;
        }
        let data = Dataset::new(x, Array1::from_vec(y)).unwrap();

        // 5 minority rows cannot form a 6-row neighborhood
        let err = SMOTE::new().with_k_neighbors(5).fit_resample(&data).unwrap_err();
        assert!(matches!(err, PretermError::InsufficientSamples(_)));

        assert!(SMOTE::new().with_k_neighbors(4).fit_resample(&data).is_ok());
    }

    #[test]
    fn test_neighbors_exclude_self_and_sorted() {
        let data = vec![vec![0.0], vec![1.0], vec![3.0], vec![0.5]];
        let n = SMOTE::find_neighbors(0, &data, 2);
        assert_eq!(n, vec![3, 1]);
    }

    #[test]
    fn test_balanced_input_unchanged() {
        let x = Array2::from_shape_fn((4, 1), |(i, _)| i as f64);
        let data = Dataset::new(x, Array1::from_vec(vec![0, 1, 0, 1])).unwrap();
        let result = SMOTE::new().with_k_neighbors(5).fit_resample(&data).unwrap();
        assert_eq!(result.data, data);
        assert_eq!(result.total_synthetic(), 0);
    }
}
