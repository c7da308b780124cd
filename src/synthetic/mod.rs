//! Synthetic minority over-sampling
//!
//! Balances a skewed training partition by interpolating new minority rows
//! between existing same-class neighbors (SMOTE).

mod smote;

pub use smote::SMOTE;

use crate::data::Dataset;
use crate::error::Result;
use std::collections::BTreeMap;

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Original rows followed by synthetic rows
    pub data: Dataset,
    /// Number of synthetic rows generated per class
    pub n_synthetic: BTreeMap<i64, usize>,
}

impl ResampleResult {
    /// Total synthetic rows across classes
    pub fn total_synthetic(&self) -> usize {
        self.n_synthetic.values().sum()
    }
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, data: &Dataset) -> Result<()>;

    /// Resample data
    fn resample(&self, data: &Dataset) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, data: &Dataset) -> Result<ResampleResult> {
        self.fit(data)?;
        self.resample(data)
    }
}
