//! Canonical feature layout and prediction outcome

use crate::error::{PretermError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of features in a record
pub const N_FEATURES: usize = 15;

/// Feature names in canonical order. Training and inference share this order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "age",
    "parity",
    "abortions",
    "weight",
    "hypertension",
    "diabetes",
    "placental_position",
    "bleeding_first_trimester",
    "bleeding_second_trimester",
    "funneling",
    "smoker",
    "rms",
    "median_frequency",
    "peak_frequency",
    "sample_entropy",
];

/// Indices of the 0/1-coded clinical flags
pub const BINARY_FEATURES: [usize; 7] = [4, 5, 6, 7, 8, 9, 10];

/// Indices of fields collected as whole numbers
pub const INTEGER_FEATURES: [usize; 2] = [1, 2];

/// Whether the feature at `index` is 0/1-coded
pub fn is_binary_feature(index: usize) -> bool {
    BINARY_FEATURES.contains(&index)
}

/// Index of a feature by canonical name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|&n| n == name)
}

/// Human-readable prompt for each feature, in canonical order
pub fn feature_prompt(index: usize) -> &'static str {
    match index {
        0 => "Age (years)",
        1 => "Parity (Number of children)",
        2 => "Abortions (Number of abortions)",
        3 => "Weight (kg)",
        4 => "Hypertension (1 for Yes, 0 for No)",
        5 => "Diabetes (1 for Yes, 0 for No)",
        6 => "Placental Position (1 for Normal, 0 for Abnormal)",
        7 => "Bleeding First Trimester (1 for Yes, 0 for No)",
        8 => "Bleeding Second Trimester (1 for Yes, 0 for No)",
        9 => "Funneling (1 for Yes, 0 for No)",
        10 => "Smoker (1 for Yes, 0 for No)",
        11 => "Root Mean Square (RMS)",
        12 => "Median Frequency",
        13 => "Peak Frequency",
        14 => "Sample Entropy",
        _ => "Unknown feature",
    }
}

/// A single raw record in canonical feature order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; N_FEATURES]);

impl FeatureVector {
    /// Build from a slice, checking arity
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let array: [f64; N_FEATURES] = values.try_into().map_err(|_| {
            PretermError::InvalidFeatureVector(format!(
                "expected {} values, got {}",
                N_FEATURES,
                values.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Parse a comma-separated record, e.g. `"28,1,0,62.5,0,0,1,0,0,0,0,0.02,0.3,0.25,0.6"`
    pub fn parse_csv_record(record: &str) -> Result<Self> {
        let values = record
            .split(',')
            .map(str::trim)
            .enumerate()
            .map(|(i, field)| {
                field.parse::<f64>().map_err(|_| {
                    let name = FEATURE_NAMES.get(i).copied().unwrap_or("<extra>");
                    PretermError::InvalidFeatureVector(format!(
                        "field {} ({}) is not numeric: '{}'",
                        i, name, field
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Self::from_slice(&values)
    }

    /// Feature values in canonical order
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.0[i])
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Classification outcome. Label 1 is term, label 0 is preterm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Term,
    Preterm,
}

impl Outcome {
    /// Map a binary label to an outcome
    pub fn from_label(label: i64) -> Result<Self> {
        match label {
            1 => Ok(Outcome::Term),
            0 => Ok(Outcome::Preterm),
            other => Err(PretermError::ValidationError(format!(
                "label must be 0 or 1, got {}",
                other
            ))),
        }
    }

    /// Binary label of this outcome
    pub fn label(self) -> i64 {
        match self {
            Outcome::Term => 1,
            Outcome::Preterm => 0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Term => write!(f, "Term"),
            Outcome::Preterm => write!(f, "Preterm"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        assert_eq!(FEATURE_NAMES[0], "age");
        assert_eq!(FEATURE_NAMES[11], "rms");
        assert_eq!(FEATURE_NAMES[14], "sample_entropy");
        for &i in &BINARY_FEATURES {
            assert!(is_binary_feature(i));
        }
        assert!(!is_binary_feature(0));
        assert_eq!(feature_index("smoker"), Some(10));
    }

    #[test]
    fn test_from_slice_arity() {
        assert!(FeatureVector::from_slice(&[0.0; 15]).is_ok());
        assert!(matches!(
            FeatureVector::from_slice(&[0.0; 14]),
            Err(PretermError::InvalidFeatureVector(_))
        ));
        assert!(matches!(
            FeatureVector::from_slice(&[0.0; 16]),
            Err(PretermError::InvalidFeatureVector(_))
        ));
    }

    #[test]
    fn test_parse_csv_record() {
        let v = FeatureVector::parse_csv_record("28,1,0,62.5,0,0,1,0,0,0,0,0.02,0.3,0.25,0.6").unwrap();
        assert_eq!(v.get("age"), Some(28.0));
        assert_eq!(v.get("weight"), Some(62.5));
        assert_eq!(v.get("sample_entropy"), Some(0.6));

        let err = FeatureVector::parse_csv_record("28,x,0").unwrap_err();
        assert!(err.to_string().contains("parity"));
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(Outcome::from_label(1).unwrap(), Outcome::Term);
        assert_eq!(Outcome::from_label(0).unwrap(), Outcome::Preterm);
        assert!(Outcome::from_label(2).is_err());
        assert_eq!(Outcome::Term.to_string(), "Term");
        assert_eq!(Outcome::Preterm.label(), 0);
    }
}
