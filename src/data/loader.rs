//! Feature table loading from CSV files and polars DataFrames

use super::{FeatureTable, FEATURE_NAMES, N_FEATURES};
use crate::error::{PretermError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Column layout of the source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSchema {
    /// Binary label column (1 = term, 0 = preterm)
    pub target_column: String,
    /// Administrative columns removed before modeling
    pub drop_columns: Vec<String>,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            target_column: "term-preterm-status".to_string(),
            drop_columns: vec!["Gestation".to_string()],
        }
    }
}

impl TableSchema {
    /// Set the label column
    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }

    /// Set the administrative columns to drop
    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }
}

/// Alternative spellings seen in upstream exports
fn aliases(canonical: &str) -> &'static [&'static str] {
    match canonical {
        "rms" => &["root_mean_square", "root mean square"],
        "median_frequency" => &["median frequency"],
        "peak_frequency" => &["peak frequency"],
        "sample_entropy" => &["sample entropy"],
        "placental_position" => &["placental position"],
        "bleeding_first_trimester" => &["bleeding first trimester"],
        "bleeding_second_trimester" => &["bleeding second trimester"],
        _ => &[],
    }
}

fn resolve_column<'a>(columns: &'a [String], canonical: &str) -> Option<&'a str> {
    let matches = |c: &str, want: &str| c.trim().eq_ignore_ascii_case(want);
    columns
        .iter()
        .find(|c| matches(c, canonical))
        .or_else(|| {
            aliases(canonical)
                .iter()
                .find_map(|alias| columns.iter().find(|c| matches(c, alias)))
        })
        .map(String::as_str)
}

/// Extract a column as f64, rejecting nulls
fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PretermError::FeatureNotFound(name.to_string()))?;
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| PretermError::DataError(format!("column '{}': {}", name, e)))?;

    if series.null_count() > 0 {
        return Err(PretermError::DataError(format!(
            "column '{}' has {} missing values",
            name,
            series.null_count()
        )));
    }

    let values: Vec<f64> = series
        .f64()
        .map_err(|e| PretermError::DataError(e.to_string()))?
        .into_no_null_iter()
        .collect();
    Ok(values)
}

impl FeatureTable {
    /// Build a table from a DataFrame, reordering features into canonical order
    pub fn from_dataframe(df: &DataFrame, schema: &TableSchema) -> Result<Self> {
        let mut df = df.clone();
        for col in &schema.drop_columns {
            if df.column(col).is_ok() {
                df = df.drop(col)?;
                debug!(column = %col, "Dropped administrative column");
            }
        }

        let columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let target = resolve_column(&columns, &schema.target_column)
            .ok_or_else(|| PretermError::FeatureNotFound(schema.target_column.clone()))?
            .to_string();

        let col_data: Vec<Vec<f64>> = FEATURE_NAMES
            .iter()
            .map(|&name| {
                let resolved = resolve_column(&columns, name)
                    .ok_or_else(|| PretermError::FeatureNotFound(name.to_string()))?;
                column_values(&df, resolved)
            })
            .collect::<Result<Vec<_>>>()?;

        let labels = column_values(&df, &target)?
            .into_iter()
            .map(|v| {
                if v == 0.0 || v == 1.0 {
                    Ok(v as i64)
                } else {
                    Err(PretermError::DataError(format!(
                        "label column '{}' must be 0/1, found {}",
                        target, v
                    )))
                }
            })
            .collect::<Result<Vec<i64>>>()?;

        let n_rows = df.height();
        let x = Array2::from_shape_fn((n_rows, N_FEATURES), |(r, c)| col_data[c][r]);
        Self::from_arrays(x, Array1::from_vec(labels))
    }

    /// Load a table from a CSV file with a header row
    pub fn from_csv(path: impl AsRef<Path>, schema: &TableSchema) -> Result<Self> {
        let path = path.as_ref();
        let start = Instant::now();

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        let table = Self::from_dataframe(&df, schema)?;
        info!(
            path = %path.display(),
            rows = table.n_rows(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded feature table"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            "Gestation" => &[38.0, 33.0, 40.0],
            "age" => &[28.0, 31.0, 24.0],
            "parity" => &[1i64, 0, 2],
            "abortions" => &[0i64, 1, 0],
            "weight" => &[62.0, 70.5, 58.0],
            "hypertension" => &[0i64, 1, 0],
            "diabetes" => &[0i64, 0, 0],
            "placental_position" => &[1i64, 0, 1],
            "bleeding_first_trimester" => &[0i64, 1, 0],
            "bleeding_second_trimester" => &[0i64, 0, 0],
            "funneling" => &[0i64, 1, 0],
            "smoker" => &[0i64, 0, 1],
            "Root_Mean_Square" => &[0.02, 0.05, 0.03],
            "median_frequency" => &[0.31, 0.42, 0.29],
            "peak_frequency" => &[0.25, 0.40, 0.22],
            "sample_entropy" => &[0.61, 0.48, 0.66],
            "term-preterm-status" => &[1i64, 0, 1]
        )
        .unwrap()
    }

    #[test]
    fn test_from_dataframe_canonical_order() {
        let table = FeatureTable::from_dataframe(&sample_df(), &TableSchema::default()).unwrap();
        let x = table.dataset().x();
        assert_eq!(x.ncols(), N_FEATURES);
        assert_eq!(x[[0, 0]], 28.0);
        assert_eq!(x[[1, 11]], 0.05); // resolved through the rms alias
        assert_eq!(table.dataset().y().to_vec(), vec![1, 0, 1]);
    }

    #[test]
    fn test_missing_feature_column() {
        let df = sample_df().drop("smoker").unwrap();
        let err = FeatureTable::from_dataframe(&df, &TableSchema::default()).unwrap_err();
        assert!(matches!(err, PretermError::FeatureNotFound(ref c) if c == "smoker"));
    }

    #[test]
    fn test_missing_target_column() {
        let schema = TableSchema::default().with_target("outcome");
        let err = FeatureTable::from_dataframe(&sample_df(), &schema).unwrap_err();
        assert!(matches!(err, PretermError::FeatureNotFound(_)));
    }
}
