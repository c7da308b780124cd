//! Integration test: Table loading and partitioning

use polars::prelude::*;
use preterm_classifier::data::{train_test_split, FeatureTable, FeatureVector, Outcome, TableSchema, FEATURE_NAMES};
use preterm_classifier::PretermError;
use std::io::Write;

const HEADER: &str = "age,parity,abortions,weight,hypertension,diabetes,placental_position,\
bleeding_first_trimester,bleeding_second_trimester,funneling,smoker,root_mean_square,\
median_frequency,peak_frequency,sample_entropy,Gestation,term-preterm-status";

fn csv_rows(n: usize) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for i in 0..n {
        let label = (i % 3 != 0) as i64;
        out.push_str(&format!(
            "{},{},{},{:.1},{},0,1,{},0,{},{},{:.3},{:.3},{:.3},{:.3},{},{}\n",
            20 + i % 15,
            i % 3,
            i % 2,
            55.0 + i as f64 * 0.5,
            i % 2,
            (i / 2) % 2,
            (i / 3) % 2,
            i % 2,
            0.01 * (i % 7) as f64,
            0.3 + 0.01 * (i % 5) as f64,
            0.2 + 0.01 * (i % 4) as f64,
            0.5 + 0.01 * (i % 6) as f64,
            if label == 1 { 39 } else { 33 },
            label
        ));
    }
    out
}

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_csv() {
    let file = write_csv(&csv_rows(30));
    let table = FeatureTable::from_csv(file.path(), &TableSchema::default()).unwrap();

    assert_eq!(table.n_rows(), 30);
    let data = table.dataset();
    assert_eq!(data.n_features(), FEATURE_NAMES.len());
    assert_eq!(data.x()[[4, 0]], 24.0);
    assert_eq!(data.x()[[4, 3]], 57.0);
    assert_eq!(data.y()[0], 0);
    assert_eq!(data.y()[1], 1);
}

#[test]
fn test_gestation_never_reaches_features() {
    let file = write_csv(&csv_rows(12));
    let table = FeatureTable::from_csv(file.path(), &TableSchema::default()).unwrap();
    // 39 / 33 would only appear if the administrative column leaked in
    assert!(table.dataset().x().iter().all(|&v| v != 39.0 && v != 33.0));
}

#[test]
fn test_load_csv_missing_file() {
    let err = FeatureTable::from_csv("/nonexistent/table.csv", &TableSchema::default()).unwrap_err();
    assert!(matches!(err, PretermError::DataError(_) | PretermError::IoError(_)));
}

#[test]
fn test_invalid_label() {
    let contents = csv_rows(5).replacen(",39,1\n", ",39,2\n", 1);
    let file = write_csv(&contents);
    let err = FeatureTable::from_csv(file.path(), &TableSchema::default()).unwrap_err();
    assert!(matches!(err, PretermError::DataError(_)));
}

#[test]
fn test_from_dataframe_reorders_columns() {
    let mut columns: Vec<Column> = FEATURE_NAMES
        .iter()
        .rev()
        .enumerate()
        .map(|(k, name)| Column::new((*name).into(), vec![k as f64 % 2.0, 1.0]))
        .collect();
    columns.push(Column::new("term-preterm-status".into(), vec![1i64, 0]));
    let df = DataFrame::new(columns).unwrap();

    let table = FeatureTable::from_dataframe(&df, &TableSchema::default()).unwrap();
    let x = table.dataset().x();
    // sample_entropy came first in the frame (value 0), age last (value 14 % 2 = 0)
    assert_eq!(x[[0, 14]], 0.0);
    assert_eq!(x[[0, 13]], 1.0);
    assert_eq!(table.dataset().y().to_vec(), vec![1, 0]);
}

#[test]
fn test_null_values_rejected() {
    let columns: Vec<Column> = FEATURE_NAMES
        .iter()
        .map(|name| {
            let values = if *name == "weight" { vec![Some(60.0), None] } else { vec![Some(0.0), Some(1.0)] };
            Column::new((*name).into(), values)
        })
        .chain(std::iter::once(Column::new("term-preterm-status".into(), vec![1i64, 0])))
        .collect();
    let df = DataFrame::new(columns).unwrap();

    let err = FeatureTable::from_dataframe(&df, &TableSchema::default()).unwrap_err();
    assert!(matches!(err, PretermError::DataError(ref msg) if msg.contains("weight")));
}

#[test]
fn test_partial_frame_rejected() {
    let df = df!(
        "age" => &[28.0, 31.0],
        "term-preterm-status" => &[1i64, 0]
    )
    .unwrap();
    let err = FeatureTable::from_dataframe(&df, &TableSchema::default()).unwrap_err();
    assert!(matches!(err, PretermError::FeatureNotFound(ref c) if c == "parity"));
}

#[test]
fn test_split_is_deterministic_and_disjoint() {
    let file = write_csv(&csv_rows(50));
    let table = FeatureTable::from_csv(file.path(), &TableSchema::default()).unwrap();

    let (train_a, test_a) = train_test_split(&table, 0.2, 42).unwrap();
    let (train_b, test_b) = train_test_split(&table, 0.2, 42).unwrap();
    assert_eq!(train_a, train_b);
    assert_eq!(test_a, test_b);
    assert_eq!(test_a.n_rows(), 10);
    assert_eq!(train_a.n_rows() + test_a.n_rows(), 50);

    let (_, test_c) = train_test_split(&table, 0.2, 7).unwrap();
    assert_ne!(test_a, test_c);
}

#[test]
fn test_split_rejects_bad_fraction() {
    let file = write_csv(&csv_rows(10));
    let table = FeatureTable::from_csv(file.path(), &TableSchema::default()).unwrap();
    assert!(train_test_split(&table, 0.0, 42).is_err());
    assert!(train_test_split(&table, 1.5, 42).is_err());
}

#[test]
fn test_parse_record() {
    let v = FeatureVector::parse_csv_record("28,1,0,62.5,0,0,1,0,0,0,0,0.02,0.3,0.25,0.6").unwrap();
    assert_eq!(v.get("weight"), Some(62.5));
    assert_eq!(v.get("sample_entropy"), Some(0.6));

    assert!(matches!(
        FeatureVector::parse_csv_record("28,1,0"),
        Err(PretermError::InvalidFeatureVector(_))
    ));
    assert!(matches!(
        FeatureVector::parse_csv_record("28,x,0,62.5,0,0,1,0,0,0,0,0.02,0.3,0.25,0.6"),
        Err(PretermError::InvalidFeatureVector(_))
    ));
}

#[test]
fn test_outcome_labels() {
    assert_eq!(Outcome::from_label(1).unwrap(), Outcome::Term);
    assert_eq!(Outcome::from_label(0).unwrap(), Outcome::Preterm);
    assert!(Outcome::from_label(3).is_err());
    assert_eq!(Outcome::Preterm.to_string(), "Preterm");
}
