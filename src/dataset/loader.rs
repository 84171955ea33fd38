//! CSV loader for the iris measurements.
//!
//! The bundled copy is compiled into the binary; an alternate file with the
//! same columns can be loaded from disk.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;

use super::{CLASS_LABELS, Dataset, FEATURE_COUNT, class_index};

const BUNDLED_IRIS_CSV: &str = include_str!("../../assets/iris.csv");
const EXPECTED_HEADER: &str = "sepal_length,sepal_width,petal_length,petal_width,species";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid dataset header: {0}")]
    InvalidHeader(String),
    #[error("invalid dataset row at line {line}: {message}")]
    InvalidRow { line: usize, message: String },
    #[error("unknown species {species:?} at line {line} (expected one of {known:?})")]
    UnknownSpecies {
        line: usize,
        species: String,
        known: [&'static str; 3],
    },
    #[error("dataset contains no samples")]
    Empty,
    #[error("invalid split: {0}")]
    InvalidSplit(String),
}

/// Load the iris dataset compiled into the crate.
pub fn load_bundled() -> Result<Dataset, DatasetError> {
    parse_csv(BUNDLED_IRIS_CSV)
}

/// Load an iris-shaped CSV file from disk.
pub fn load_csv(path: &Path) -> Result<Dataset, DatasetError> {
    let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(&text)
}

/// Parse CSV text with a header row and four numeric columns plus species.
pub fn parse_csv(text: &str) -> Result<Dataset, DatasetError> {
    let mut lines = text.lines().enumerate();
    let header = lines
        .by_ref()
        .find(|(_, line)| !line.trim().is_empty())
        .map(|(_, line)| line.trim())
        .ok_or(DatasetError::Empty)?;
    if header != EXPECTED_HEADER {
        return Err(DatasetError::InvalidHeader(header.to_string()));
    }

    let mut values = Vec::new();
    let mut targets = Vec::new();
    for (idx, line) in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if fields.len() != FEATURE_COUNT + 1 {
            return Err(DatasetError::InvalidRow {
                line: line_no,
                message: format!("expected {} fields, found {}", FEATURE_COUNT + 1, fields.len()),
            });
        }
        for field in &fields[..FEATURE_COUNT] {
            let value = field.parse::<f64>().map_err(|err| DatasetError::InvalidRow {
                line: line_no,
                message: format!("{field:?}: {err}"),
            })?;
            if !value.is_finite() {
                return Err(DatasetError::InvalidRow {
                    line: line_no,
                    message: format!("non-finite value {field:?}"),
                });
            }
            values.push(value);
        }
        let species = fields[FEATURE_COUNT];
        let target = class_index(species).ok_or_else(|| DatasetError::UnknownSpecies {
            line: line_no,
            species: species.to_string(),
            known: CLASS_LABELS,
        })?;
        targets.push(target);
    }

    if targets.is_empty() {
        return Err(DatasetError::Empty);
    }
    let features = Array2::from_shape_vec((targets.len(), FEATURE_COUNT), values).map_err(|err| {
        DatasetError::InvalidRow {
            line: 0,
            message: err.to_string(),
        }
    })?;
    Ok(Dataset { features, targets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bundled_dataset_has_fifty_of_each_class() {
        let dataset = load_bundled().unwrap();
        assert_eq!(dataset.len(), 150);
        assert_eq!(dataset.features.ncols(), FEATURE_COUNT);
        assert_eq!(dataset.class_counts(), vec![50, 50, 50]);
        assert_eq!(dataset.features.row(0).to_vec(), vec![5.1, 3.5, 1.4, 0.2]);
    }

    #[test]
    fn label_mapping_ignores_file_order() {
        let text = "sepal_length,sepal_width,petal_length,petal_width,species\n\
                    6.3,3.3,6.0,2.5,Iris-virginica\n\
                    5.1,3.5,1.4,0.2,Iris-setosa\n";
        let dataset = parse_csv(text).unwrap();
        assert_eq!(dataset.targets, vec![2, 0]);
    }

    #[test]
    fn rejects_unknown_species() {
        let text = "sepal_length,sepal_width,petal_length,petal_width,species\n\
                    5.1,3.5,1.4,0.2,Iris-unknown\n";
        let err = parse_csv(text).unwrap_err();
        assert!(matches!(err, DatasetError::UnknownSpecies { line: 2, .. }));
    }

    #[test]
    fn rejects_non_numeric_feature() {
        let text = "sepal_length,sepal_width,petal_length,petal_width,species\n\
                    5.1,wide,1.4,0.2,Iris-setosa\n";
        let err = parse_csv(text).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn rejects_header_only_file() {
        let err = parse_csv(EXPECTED_HEADER).unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let err = load_csv(&path).unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
    }
}
