//! Loader for the bundled Breast Cancer Wisconsin (Diagnostic) table.

use ndarray::{Array2, Axis};
use thiserror::Error;

/// Bundled dataset text: header row of feature names plus a trailing `target` column.
const BUNDLED_CSV: &str = include_str!("../../data/breast_cancer.csv");

/// Name of the label column in the bundled CSV.
pub const TARGET_COLUMN: &str = "target";

/// Class names indexed by label value.
pub const TARGET_NAMES: &[&str] = &["malignant", "benign"];

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("dataset is empty")]
    Empty,
    #[error("missing `target` column in header")]
    MissingTarget,
    #[error("line {line}: expected {expected} columns, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid value {value:?} in column {column:?}")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },
    #[error("line {line}: label {value:?} is not a known class (0..{classes})")]
    InvalidLabel {
        line: usize,
        value: String,
        classes: usize,
    },
    #[error("table shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Numeric feature matrix (rows = samples) with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// Column identifiers in matrix order.
    pub feature_names: Vec<String>,
    /// Row-major sample matrix.
    pub values: Array2<f64>,
}

/// Class labels aligned by row with a [`FeatureTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    /// Class names indexed by label.
    pub class_names: Vec<String>,
    /// One label per sample.
    pub labels: Vec<usize>,
}

impl FeatureTable {
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Copy the given rows (in order) into a new table.
    pub fn select(&self, rows: &[usize]) -> FeatureTable {
        FeatureTable {
            feature_names: self.feature_names.clone(),
            values: self.values.select(Axis(0), rows),
        }
    }
}

impl Targets {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Copy the given rows (in order) into a new target vector.
    pub fn select(&self, rows: &[usize]) -> Targets {
        Targets {
            class_names: self.class_names.clone(),
            labels: rows.iter().map(|&row| self.labels[row]).collect(),
        }
    }

    /// Number of samples per class, indexed by label.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes()];
        for &label in &self.labels {
            if let Some(count) = counts.get_mut(label) {
                *count += 1;
            }
        }
        counts
    }
}

/// Materialize the bundled dataset into a feature table and aligned targets.
pub fn load_data() -> Result<(FeatureTable, Targets), DatasetLoadError> {
    let class_names = TARGET_NAMES.iter().map(|name| (*name).to_string()).collect();
    let (table, targets) = parse_dataset(BUNDLED_CSV, class_names)?;
    tracing::info!(
        samples = table.n_samples(),
        features = table.n_features(),
        "Loaded bundled breast cancer dataset"
    );
    Ok((table, targets))
}

/// Parse a comma-separated table whose header names the features and ends in `target`.
pub fn parse_dataset(
    text: &str,
    class_names: Vec<String>,
) -> Result<(FeatureTable, Targets), DatasetLoadError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());
    let (_, header) = lines.next().ok_or(DatasetLoadError::Empty)?;
    let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
    if columns.last().map(String::as_str) != Some(TARGET_COLUMN) {
        return Err(DatasetLoadError::MissingTarget);
    }
    let feature_names = columns[..columns.len() - 1].to_vec();
    let n_features = feature_names.len();

    let mut values = Vec::new();
    let mut labels = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != columns.len() {
            return Err(DatasetLoadError::RaggedRow {
                line: line_no,
                expected: columns.len(),
                found: cells.len(),
            });
        }
        for (cell, column) in cells.iter().zip(&feature_names) {
            let value = cell
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DatasetLoadError::InvalidValue {
                    line: line_no,
                    column: column.clone(),
                    value: (*cell).to_string(),
                })?;
            values.push(value);
        }
        let raw_label = cells[n_features];
        let label = raw_label
            .parse::<usize>()
            .ok()
            .filter(|&label| label < class_names.len())
            .ok_or_else(|| DatasetLoadError::InvalidLabel {
                line: line_no,
                value: raw_label.to_string(),
                classes: class_names.len(),
            })?;
        labels.push(label);
    }
    if labels.is_empty() {
        return Err(DatasetLoadError::Empty);
    }

    let values = Array2::from_shape_vec((labels.len(), n_features), values)?;
    Ok((
        FeatureTable {
            feature_names,
            values,
        },
        Targets {
            class_names,
            labels,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_classes() -> Vec<String> {
        vec!["neg".to_string(), "pos".to_string()]
    }

    #[test]
    fn bundled_dataset_has_expected_shape() {
        let (table, targets) = load_data().unwrap();
        assert_eq!(table.n_samples(), 569);
        assert_eq!(table.n_features(), 30);
        assert_eq!(table.feature_names[0], "mean radius");
        assert_eq!(table.feature_names[29], "worst fractal dimension");
        assert_eq!(targets.len(), 569);
        assert_eq!(targets.class_counts(), vec![212, 357]);
        assert_eq!(table.values[(0, 0)], 17.99);
    }

    #[test]
    fn parses_small_table() {
        let text = "a,b,target\n1.0,2.0,0\n\n3.5,-4,1\n";
        let (table, targets) = parse_dataset(text, two_classes()).unwrap();
        assert_eq!(table.feature_names, vec!["a", "b"]);
        assert_eq!(table.values.row(1).to_vec(), vec![3.5, -4.0]);
        assert_eq!(targets.labels, vec![0, 1]);
    }

    #[test]
    fn rejects_header_without_target() {
        let err = parse_dataset("a,b\n1,2\n", two_classes()).unwrap_err();
        assert!(matches!(err, DatasetLoadError::MissingTarget));
    }

    #[test]
    fn reports_ragged_row_line() {
        let err = parse_dataset("a,b,target\n1,2,0\n1,0\n", two_classes()).unwrap_err();
        assert!(matches!(
            err,
            DatasetLoadError::RaggedRow {
                line: 3,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_and_unknown_labels() {
        let err = parse_dataset("a,target\nx,0\n", two_classes()).unwrap_err();
        assert!(err.to_string().contains("column \"a\""));
        let err = parse_dataset("a,target\n1,2\n", two_classes()).unwrap_err();
        assert!(matches!(err, DatasetLoadError::InvalidLabel { line: 2, .. }));
    }

    #[test]
    fn select_keeps_row_alignment() {
        let text = "a,target\n1,0\n2,1\n3,1\n";
        let (table, targets) = parse_dataset(text, two_classes()).unwrap();
        let rows = [2, 0];
        assert_eq!(table.select(&rows).values.column(0).to_vec(), vec![3.0, 1.0]);
        assert_eq!(targets.select(&rows).labels, vec![1, 0]);
    }
}
