//! Iris dataset loading and deterministic train/test splitting.

pub mod loader;
pub mod split;

use ndarray::{Array2, Axis};

pub use loader::{DatasetError, load_bundled, load_csv, parse_csv};
pub use split::{SPLIT_SEED, TEST_FRACTION, TrainTestSplit, train_test_split};

/// Number of numeric attributes per sample.
pub const FEATURE_COUNT: usize = 4;

/// Declared class ordering; index `i` is class `i` everywhere in the crate.
pub const CLASS_LABELS: [&str; 3] = ["Iris-setosa", "Iris-versicolor", "Iris-virginica"];

/// Resolve a species name to its stable class index.
pub fn class_index(species: &str) -> Option<usize> {
    CLASS_LABELS.iter().position(|label| *label == species)
}

/// In-memory feature matrix with integer class targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Shape `[n_samples, FEATURE_COUNT]`.
    pub features: Array2<f64>,
    /// Class index per row.
    pub targets: Vec<usize>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Count of samples per class, in `CLASS_LABELS` order.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; CLASS_LABELS.len()];
        for &target in &self.targets {
            if let Some(count) = counts.get_mut(target) {
                *count += 1;
            }
        }
        counts
    }

    /// Copy out the rows at `indices`, preserving their order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(Axis(0), indices),
            targets: indices.iter().map(|&idx| self.targets[idx]).collect(),
        }
    }
}
