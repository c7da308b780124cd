//! Training pipeline
//!
//! Drives a feature table through partitioning, minority over-sampling, scaling
//! and model search, then hands the result to the caller as a [`Predictor`].
//!
//! ```text
//! Uninitialized -> TablePartitioned -> Resampled -> Scaled -> ModelSelected -> Ready
//! ```
//!
//! Stages must run in order. A failing stage drops every intermediate result
//! and returns the pipeline to `Uninitialized`.

use crate::config::PipelineConfig;
use crate::data::{train_test_split, Dataset, FeatureTable, Outcome};
use crate::error::{PretermError, Result};
use crate::inference::Predictor;
use crate::optimizer::{RandomizedSearch, SearchResult};
use crate::preprocessing::Scaler;
use crate::synthetic::{Sampler, SMOTE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

/// Position of the pipeline in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Uninitialized,
    TablePartitioned,
    Resampled,
    Scaled,
    ModelSelected,
    Ready,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Uninitialized => "Uninitialized",
            PipelineStage::TablePartitioned => "TablePartitioned",
            PipelineStage::Resampled => "Resampled",
            PipelineStage::Scaled => "Scaled",
            PipelineStage::ModelSelected => "ModelSelected",
            PipelineStage::Ready => "Ready",
        };
        f.write_str(name)
    }
}

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Training rows after over-sampling
    pub resampled_rows: usize,
    /// Per-class row counts after over-sampling
    pub resampled_class_counts: BTreeMap<i64, usize>,
    pub n_synthetic: BTreeMap<i64, usize>,
    pub best_params: crate::optimizer::ForestParams,
    pub best_cv_accuracy: f64,
    pub n_trials: usize,
    pub duration_secs: f64,
}

/// Staged training pipeline
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
    stage: PipelineStage,
    /// Raw rows at partitioning; tracked for the summary
    original_train_rows: usize,
    train: Option<Dataset>,
    test: Option<Dataset>,
    n_synthetic: BTreeMap<i64, usize>,
    scaler: Option<Scaler>,
    search: Option<SearchResult>,
    predictor: Option<Predictor>,
}

impl Default for TrainingPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            stage: PipelineStage::Uninitialized,
            original_train_rows: 0,
            train: None,
            test: None,
            n_synthetic: BTreeMap::new(),
            scaler: None,
            search: None,
            predictor: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn is_ready(&self) -> bool {
        self.stage == PipelineStage::Ready
    }

    /// Drop all intermediate state and return to `Uninitialized`
    pub fn reset(&mut self) {
        self.stage = PipelineStage::Uninitialized;
        self.original_train_rows = 0;
        self.train = None;
        self.test = None;
        self.n_synthetic.clear();
        self.scaler = None;
        self.search = None;
        self.predictor = None;
    }

    /// Run `step` if the pipeline is at `from`, advancing to `to` on success
    fn advance<F>(&mut self, action: &str, from: PipelineStage, to: PipelineStage, step: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if self.stage != from {
            return Err(PretermError::InvalidTransition {
                action: action.to_string(),
                stage: self.stage.to_string(),
            });
        }

        match step(self) {
            Ok(()) => {
                self.stage = to;
                Ok(())
            }
            Err(e) => {
                warn!(action, error = %e, "Pipeline stage failed; resetting");
                self.reset();
                Err(e)
            }
        }
    }

    fn missing(what: &str) -> PretermError {
        PretermError::ValidationError(format!("pipeline has no {}", what))
    }

    /// Split the table into training and held-out partitions
    pub fn partition(&mut self, table: &FeatureTable) -> Result<()> {
        self.advance("partition", PipelineStage::Uninitialized, PipelineStage::TablePartitioned, |p| {
            let (train, test) =
                train_test_split(table, p.config.split.test_size, p.config.split.random_state)?;
            info!(train_rows = train.n_rows(), test_rows = test.n_rows(), "Partitioned table");
            p.original_train_rows = train.n_rows();
            p.train = Some(train);
            p.test = Some(test);
            Ok(())
        })
    }

    /// Balance the training partition with SMOTE
    pub fn resample(&mut self) -> Result<()> {
        self.advance("resample", PipelineStage::TablePartitioned, PipelineStage::Resampled, |p| {
            let train = p.train.take().ok_or_else(|| Self::missing("training partition"))?;
            let mut smote = SMOTE::new()
                .with_k_neighbors(p.config.smote.k_neighbors)
                .with_seed(p.config.smote.random_state);
            let result = smote.fit_resample(&train)?;

            info!(
                rows = result.data.n_rows(),
                synthetic = result.total_synthetic(),
                "Resampled training partition"
            );
            p.n_synthetic = result.n_synthetic;
            p.train = Some(result.data);
            Ok(())
        })
    }

    /// Fit the scaler on the resampled training rows and apply it to both partitions
    pub fn scale(&mut self) -> Result<()> {
        self.advance("scale", PipelineStage::Resampled, PipelineStage::Scaled, |p| {
            let train = p.train.take().ok_or_else(|| Self::missing("training partition"))?;
            let test = p.test.take().ok_or_else(|| Self::missing("held-out partition"))?;

            let mut scaler = Scaler::new(p.config.scaler.zero_variance);
            let (x_train, y_train) = train.into_parts();
            let x_train = scaler.fit_transform(&x_train)?;
            let (x_test, y_test) = test.into_parts();
            let x_test = scaler.transform(&x_test)?;

            if !scaler.constant_features().is_empty() {
                warn!(features = ?scaler.constant_features(), "Constant features are only centered");
            }

            p.train = Some(Dataset::new(x_train, y_train)?);
            p.test = Some(Dataset::new(x_test, y_test)?);
            p.scaler = Some(scaler);
            Ok(())
        })
    }

    /// Search the hyperparameter grid on the scaled training partition
    pub fn select_model(&mut self) -> Result<()> {
        self.advance("select model", PipelineStage::Scaled, PipelineStage::ModelSelected, |p| {
            let train = p.train.as_ref().ok_or_else(|| Self::missing("training partition"))?;
            let search = RandomizedSearch::new(
                p.config.grid.clone(),
                p.config.search.clone(),
                p.config.forest.clone(),
            );
            p.search = Some(search.fit(train)?);
            Ok(())
        })
    }

    /// Assemble the predictor from the fitted scaler and the selected model
    pub fn finalize(&mut self) -> Result<()> {
        self.advance("finalize", PipelineStage::ModelSelected, PipelineStage::Ready, |p| {
            let scaler = p.scaler.clone().ok_or_else(|| Self::missing("scaler"))?;
            let search = p.search.as_ref().ok_or_else(|| Self::missing("search result"))?;
            let predictor = Predictor::new(scaler, search.best_model.clone())?
                .with_strict_binary_fields(p.config.inference.strict_binary_fields);
            p.predictor = Some(predictor);
            Ok(())
        })
    }

    /// Run every stage on `table`, starting from a clean pipeline
    pub fn fit(&mut self, table: &FeatureTable) -> Result<TrainingSummary> {
        let start = Instant::now();
        self.config.validate()?;
        self.reset();

        self.partition(table)?;
        self.resample()?;
        self.scale()?;
        self.select_model()?;
        self.finalize()?;

        let summary = self.summary(start.elapsed().as_secs_f64())?;
        info!(
            best = %summary.best_params,
            cv_accuracy = summary.best_cv_accuracy,
            duration_secs = summary.duration_secs,
            "Pipeline ready"
        );
        Ok(summary)
    }

    fn summary(&self, duration_secs: f64) -> Result<TrainingSummary> {
        let search = self.search.as_ref().ok_or_else(|| Self::missing("search result"))?;
        Ok(TrainingSummary {
            train_rows: self.original_train_rows,
            test_rows: self.test.as_ref().map_or(0, Dataset::n_rows),
            resampled_rows: self.train.as_ref().map_or(0, Dataset::n_rows),
            resampled_class_counts: self.train.as_ref().map(Dataset::class_counts).unwrap_or_default(),
            n_synthetic: self.n_synthetic.clone(),
            best_params: search.best_params(),
            best_cv_accuracy: search.best_score(),
            n_trials: search.trials.len(),
            duration_secs,
        })
    }

    fn ready_predictor(&self) -> Result<&Predictor> {
        match (&self.stage, &self.predictor) {
            (PipelineStage::Ready, Some(predictor)) => Ok(predictor),
            _ => Err(PretermError::PipelineNotReady(self.stage.to_string())),
        }
    }

    /// Classify a raw record; only valid once the pipeline is `Ready`
    pub fn predict(&self, values: &[f64]) -> Result<Outcome> {
        self.ready_predictor()?.predict(values)
    }

    /// Borrow the predictor of a `Ready` pipeline
    pub fn predictor(&self) -> Result<&Predictor> {
        self.ready_predictor()
    }

    /// Take ownership of the trained predictor
    pub fn into_predictor(self) -> Result<Predictor> {
        match (self.stage, self.predictor) {
            (PipelineStage::Ready, Some(predictor)) => Ok(predictor),
            (stage, _) => Err(PretermError::PipelineNotReady(stage.to_string())),
        }
    }

    /// Held-out partition, scaled once the pipeline has passed `Scaled`
    pub fn test_partition(&self) -> Option<&Dataset> {
        self.test.as_ref()
    }

    /// Training partition in its current form (raw, resampled or scaled)
    pub(crate) fn train_partition(&self) -> Option<&Dataset> {
        self.train.as_ref()
    }

    pub fn scaler(&self) -> Option<&Scaler> {
        self.scaler.as_ref()
    }

    pub fn search_result(&self) -> Option<&SearchResult> {
        self.search.as_ref()
    }

    /// Synthetic rows added per class
    pub fn n_synthetic(&self) -> &BTreeMap<i64, usize> {
        &self.n_synthetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{is_binary_feature, N_FEATURES};
    use crate::optimizer::{ParamGrid, SearchConfig};
    use ndarray::{Array1, Array2};

    /// 60 rows, 20 preterm; feature 0 separates the classes
    fn table() -> FeatureTable {
        let n = 60;
        let y = Array1::from_shape_fn(n, |i| (i % 3 != 0) as i64);
        let x = Array2::from_shape_fn((n, N_FEATURES), |(i, j)| {
            let label = y[i] as f64;
            match j {
                0 => 20.0 + label * 15.0 + (i % 4) as f64,
                j if is_binary_feature(j) => ((i / 3 + j) % 2) as f64,
                _ => ((i * 5 + j * 3) % 13) as f64,
            }
        });
        FeatureTable::from_arrays(x, y).unwrap()
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig::new()
            .with_grid(ParamGrid {
                n_estimators: vec![5, 10],
                max_depth: vec![Some(4), None],
                min_samples_split: vec![2],
            })
            .with_search(SearchConfig::new().with_n_iter(2).with_cv_folds(3))
    }

    #[test]
    fn test_stages_in_order() {
        let mut pipeline = TrainingPipeline::new(fast_config());
        let t = table();

        assert_eq!(pipeline.stage(), PipelineStage::Uninitialized);
        pipeline.partition(&t).unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::TablePartitioned);
        pipeline.resample().unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::Resampled);

        let counts = pipeline.train_partition().unwrap().class_counts();
        assert_eq!(counts[&0], counts[&1]);

        pipeline.scale().unwrap();
        pipeline.select_model().unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::ModelSelected);
        pipeline.finalize().unwrap();
        assert!(pipeline.is_ready());
    }

    #[test]
    fn test_out_of_order_stage() {
        let mut pipeline = TrainingPipeline::new(fast_config());
        let err = pipeline.scale().unwrap_err();
        assert!(matches!(err, PretermError::InvalidTransition { .. }));
        assert_eq!(pipeline.stage(), PipelineStage::Uninitialized);
    }

    #[test]
    fn test_predict_before_ready() {
        let mut pipeline = TrainingPipeline::new(fast_config());
        assert!(matches!(
            pipeline.predict(&[0.0; N_FEATURES]),
            Err(PretermError::PipelineNotReady(_))
        ));

        pipeline.partition(&table()).unwrap();
        assert!(matches!(
            pipeline.predict(&[0.0; N_FEATURES]),
            Err(PretermError::PipelineNotReady(_))
        ));
    }

    #[test]
    fn test_failure_resets() {
        // 5 minority rows cannot support 5 neighbors plus the seed row
        let config = fast_config().with_k_neighbors(5);
        let y = Array1::from_shape_fn(30, |i| (i >= 4) as i64);
        let x = Array2::from_shape_fn((30, N_FEATURES), |(i, j)| {
            if is_binary_feature(j) { 0.0 } else { (i + j) as f64 }
        });
        let t = FeatureTable::from_arrays(x, y).unwrap();

        let mut pipeline = TrainingPipeline::new(config);
        pipeline.partition(&t).unwrap();
        let err = pipeline.resample().unwrap_err();
        assert!(matches!(err, PretermError::InsufficientSamples(_)));
        assert_eq!(pipeline.stage(), PipelineStage::Uninitialized);
        assert!(pipeline.train_partition().is_none());
        assert!(pipeline.test_partition().is_none());
    }

    #[test]
    fn test_fit_and_into_predictor() {
        let mut pipeline = TrainingPipeline::new(fast_config());
        let summary = pipeline.fit(&table()).unwrap();

        assert_eq!(summary.train_rows + summary.test_rows, 60);
        assert_eq!(summary.test_rows, 12);
        assert_eq!(summary.n_trials, 2);
        assert!(summary.resampled_rows >= summary.train_rows);

        let mut record = vec![0.0; N_FEATURES];
        record[0] = 37.0;
        let outcome = pipeline.predict(&record).unwrap();

        let predictor = pipeline.into_predictor().unwrap();
        assert_eq!(predictor.predict(&record).unwrap(), outcome);
    }

    #[test]
    fn test_scaled_training_rows_are_centered() {
        let mut pipeline = TrainingPipeline::new(fast_config());
        let summary = pipeline.fit(&table()).unwrap();

        let train = pipeline.train_partition().unwrap();
        assert_eq!(train.n_rows(), summary.resampled_rows);
        assert_eq!(train.class_counts(), summary.resampled_class_counts);
        let means = train.x().mean_axis(ndarray::Axis(0)).unwrap();
        assert!(means.iter().all(|m| m.abs() < 1e-9));
    }

    #[test]
    fn test_refit_starts_clean() {
        let mut pipeline = TrainingPipeline::new(fast_config());
        pipeline.fit(&table()).unwrap();
        pipeline.fit(&table()).unwrap();
        assert!(pipeline.is_ready());
    }
}
