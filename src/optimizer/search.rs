//! Randomized search with stratified cross-validation

use super::grid::{ForestParams, ParamGrid};
use super::config::SearchConfig;
use crate::config::ForestConfig;
use crate::data::Dataset;
use crate::error::{PretermError, Result};
use crate::training::{accuracy, CVResults, CVSplit, CrossValidator, RandomForest};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Position in evaluation order
    pub trial_id: usize,
    /// Parameters used
    pub params: ForestParams,
    /// Per-fold accuracy
    pub cv: CVResults,
}

/// Outcome of the search: every trial plus the refit winner
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub trials: Vec<TrialResult>,
    pub best_trial_idx: usize,
    /// Best configuration refit on the full training partition
    pub best_model: RandomForest,
    pub duration_secs: f64,
}

impl SearchResult {
    pub fn best_trial(&self) -> &TrialResult {
        &self.trials[self.best_trial_idx]
    }

    pub fn best_params(&self) -> ForestParams {
        self.best_trial().params
    }

    pub fn best_score(&self) -> f64 {
        self.best_trial().cv.mean_score
    }
}

/// Randomized search over a [`ParamGrid`]
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    grid: ParamGrid,
    config: SearchConfig,
    forest: ForestConfig,
}

impl RandomizedSearch {
    pub fn new(grid: ParamGrid, config: SearchConfig, forest: ForestConfig) -> Self {
        Self { grid, config, forest }
    }

    /// Grid points to evaluate, in evaluation order.
    ///
    /// Draws `n_iter` distinct grid indices without replacement from a seeded
    /// Xoshiro256++ stream; the whole grid is used when `n_iter` covers it.
    pub fn sample_candidates(&self) -> Result<Vec<ForestParams>> {
        self.grid.validate()?;
        let size = self.grid.len();
        let n_iter = self.config.n_iter.max(1);

        let indices: Vec<usize> = if n_iter >= size {
            if n_iter > size {
                warn!(n_iter, grid_size = size, "n_iter exceeds grid size; evaluating the full grid");
            }
            (0..size).collect()
        } else {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
            sample(&mut rng, size, n_iter).into_vec()
        };

        Ok(indices.into_iter().filter_map(|i| self.grid.get(i)).collect())
    }

    fn fold_splits(&self, data: &Dataset) -> Result<Vec<CVSplit>> {
        CrossValidator::new(self.config.cv_folds)
            .with_shuffle(self.config.shuffle_folds)
            .with_random_state(self.config.random_state)
            .split(data.y())
    }

    /// Accuracy of one configuration on one fold
    fn score_fold(&self, params: &ForestParams, data: &Dataset, split: &CVSplit) -> Result<f64> {
        let train = data.select(&split.train_indices);
        let test = data.select(&split.test_indices);

        let mut model = params.build(&self.forest);
        model.fit(train.x(), train.y())?;
        let predictions = model.predict(test.x())?;
        Ok(accuracy(test.y(), &predictions))
    }

    /// Evaluate sampled configurations and refit the best one on all of `data`
    pub fn fit(&self, data: &Dataset) -> Result<SearchResult> {
        let start = Instant::now();
        let candidates = self.sample_candidates()?;
        let splits = self.fold_splits(data)?;
        let n_folds = splits.len();

        info!(
            candidates = candidates.len(),
            folds = n_folds,
            rows = data.n_rows(),
            "Starting randomized search"
        );

        // (configuration x fold) tasks, configuration-major; each writes only its own slot
        let tasks: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..n_folds).map(move |f| (c, f)))
            .collect();

        let evaluate = || {
            tasks
                .par_iter()
                .map(|&(c, f)| self.score_fold(&candidates[c], data, &splits[f]))
                .collect::<Result<Vec<f64>>>()
        };

        let scores = match self.config.n_jobs {
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| PretermError::ConfigError(format!("thread pool: {}", e)))?
                .install(evaluate)?,
            None => evaluate()?,
        };

        let trials: Vec<TrialResult> = candidates
            .iter()
            .zip(scores.chunks(n_folds))
            .enumerate()
            .map(|(trial_id, (params, fold_scores))| {
                let cv = CVResults::from_scores(fold_scores.to_vec());
                debug!(trial_id, params = %params, mean = cv.mean_score, std = cv.std_score, "Trial scored");
                TrialResult {
                    trial_id,
                    params: *params,
                    cv,
                }
            })
            .collect();

        // First trial with the maximum mean score wins
        let best_trial_idx = trials
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (i, t)| match best {
                Some((_, score)) if t.cv.mean_score <= score => best,
                _ => Some((i, t.cv.mean_score)),
            })
            .map(|(i, _)| i)
            .ok_or_else(|| PretermError::ValidationError("no candidates evaluated".to_string()))?;

        let best_params = trials[best_trial_idx].params;
        let mut best_model = best_params.build(&self.forest);
        best_model.fit(data.x(), data.y())?;

        let duration_secs = start.elapsed().as_secs_f64();
        info!(
            params = %best_params,
            cv_accuracy = trials[best_trial_idx].cv.mean_score,
            duration_secs,
            "Selected best configuration"
        );

        Ok(SearchResult {
            trials,
            best_trial_idx,
            best_model,
            duration_secs,
        })
    }
}
