//! Standard (z-score) feature scaling

use crate::data::FEATURE_NAMES;
use crate::error::{PretermError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// What to do with a feature whose training variance is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZeroVariance {
    /// Fail the fit with `DegenerateFeature`
    Reject,
    /// Keep the feature, centered only (scale 1.0)
    Unit,
}

impl Default for ZeroVariance {
    fn default() -> Self {
        ZeroVariance::Unit
    }
}

/// Parameters for a fitted scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    mean: Array1<f64>,
    /// Population standard deviation, or 1.0 for zero-variance features
    scale: Array1<f64>,
    /// Features that were fitted with zero variance
    constant: Vec<usize>,
}

/// Per-feature standard scaler: `(x - mean) / std`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    zero_variance: ZeroVariance,
    params: Option<ScalerParams>,
}

impl Default for Scaler {
    fn default() -> Self {
        Self::new(ZeroVariance::default())
    }
}

impl Scaler {
    /// Create a new, unfitted scaler
    pub fn new(zero_variance: ZeroVariance) -> Self {
        Self {
            zero_variance,
            params: None,
        }
    }

    /// Learn per-feature mean and standard deviation from `x`
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.params = None;
        if x.nrows() == 0 {
            return Err(PretermError::ValidationError(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PretermError::ValidationError("empty matrix".to_string()))?;
        let std = x.std_axis(Axis(0), 0.0);

        let mut constant = Vec::new();
        let mut scale = Array1::zeros(std.len());
        for (j, &s) in std.iter().enumerate() {
            if s == 0.0 || !s.is_finite() {
                match self.zero_variance {
                    ZeroVariance::Reject => {
                        return Err(PretermError::DegenerateFeature {
                            index: j,
                            name: FEATURE_NAMES.get(j).copied().unwrap_or("feature").to_string(),
                        });
                    }
                    ZeroVariance::Unit => {
                        constant.push(j);
                        scale[j] = 1.0;
                    }
                }
            } else {
                scale[j] = s;
            }
        }

        self.params = Some(ScalerParams { mean, scale, constant });
        Ok(self)
    }

    fn params(&self) -> Result<&ScalerParams> {
        self.params.as_ref().ok_or(PretermError::NotFitted)
    }

    fn check_width(&self, params: &ScalerParams, width: usize) -> Result<()> {
        if width != params.mean.len() {
            return Err(PretermError::ShapeError {
                expected: format!("{} features", params.mean.len()),
                actual: format!("{} features", width),
            });
        }
        Ok(())
    }

    /// Scale every row of `x` with the fitted statistics
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.params()?;
        self.check_width(params, x.ncols())?;
        Ok((x - &params.mean) / &params.scale)
    }

    /// Scale a single record with the fitted statistics
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Result<Array1<f64>> {
        let params = self.params()?;
        self.check_width(params, row.len())?;
        Ok((&row - &params.mean) / &params.scale)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Map scaled values back to the original units
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.params()?;
        self.check_width(params, x.ncols())?;
        Ok(x * &params.scale + &params.mean)
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Fitted per-feature means
    pub fn means(&self) -> Option<&Array1<f64>> {
        self.params.as_ref().map(|p| &p.mean)
    }

    /// Fitted per-feature scales
    pub fn scales(&self) -> Option<&Array1<f64>> {
        self.params.as_ref().map(|p| &p.scale)
    }

    /// Features fitted with zero variance (centered only)
    pub fn constant_features(&self) -> &[usize] {
        self.params.as_ref().map(|p| p.constant.as_slice()).unwrap_or(&[])
    }
}
