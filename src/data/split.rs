//! Deterministic train/test partitioning

use super::{Dataset, FeatureTable};
use crate::error::{PretermError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Shuffle rows with a seeded RNG and hold out `ceil(n * test_size)` of them.
///
/// Returns `(train, test)`. The two partitions are disjoint and together cover
/// every row of the table.
pub fn train_test_split(table: &FeatureTable, test_size: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PretermError::ValidationError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n = table.n_rows();
    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PretermError::ValidationError(format!(
            "cannot split {} rows with test_size {}",
            n, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let data = table.dataset();
    Ok((data.select(train_idx), data.select(test_idx)))
}
