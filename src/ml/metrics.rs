//! Evaluation metrics for classification models.

use serde::{Deserialize, Serialize};

/// Schema tag attached to serialized confusion matrices.
pub const CONFUSION_SCHEMA_TYPE: &str = "confusion_matrix";
/// Schema version attached to serialized confusion matrices.
pub const CONFUSION_SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Tally paired truth/prediction indices. Pairs outside `0..n_classes`
    /// are ignored.
    pub fn from_predictions(n_classes: usize, truth: &[usize], predicted: &[usize]) -> Self {
        let mut cm = Self::new(n_classes);
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    /// Number of samples whose true class is `truth`.
    pub fn row_sum(&self, truth: usize) -> u32 {
        (0..self.n_classes).map(|p| self.get(truth, p)).sum()
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Counts as nested rows (`rows[truth][predicted]`).
    pub fn rows(&self) -> Vec<Vec<u32>> {
        self.counts
            .chunks(self.n_classes.max(1))
            .map(|row| row.to_vec())
            .collect()
    }

    /// Each row divided by its own sum. Rows without samples stay zero.
    pub fn normalized(&self) -> Vec<Vec<f64>> {
        (0..self.n_classes)
            .map(|truth| {
                let sum = self.row_sum(truth);
                (0..self.n_classes)
                    .map(|p| {
                        if sum == 0 {
                            0.0
                        } else {
                            self.get(truth, p) as f64 / sum as f64
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Build the serializable record logged alongside each run.
    pub fn to_record(&self, class_labels: &[&str]) -> ConfusionMatrixRecord {
        ConfusionMatrixRecord {
            schema_type: CONFUSION_SCHEMA_TYPE.to_string(),
            schema_version: CONFUSION_SCHEMA_VERSION.to_string(),
            data: ConfusionMatrixData {
                class_labels: class_labels.iter().map(|label| label.to_string()).collect(),
                matrix: self.rows(),
            },
        }
    }
}

/// Wire shape for a logged confusion matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrixRecord {
    pub schema_type: String,
    pub schema_version: String,
    pub data: ConfusionMatrixData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrixData {
    pub class_labels: Vec<String>,
    pub matrix: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision, recall and F1 from a confusion matrix.
///
/// Undefined ratios (no predicted or no true samples) evaluate to `0.0`.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f64;
        let mut fp = 0f64;
        let mut fn_ = 0f64;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f64;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f64;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        stats.push(PerClassStats {
            precision,
            recall,
            f1,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let mut correct = 0u64;
    let mut total = 0u64;
    for truth in 0..cm.n_classes {
        for predicted in 0..cm.n_classes {
            let v = cm.get(truth, predicted) as u64;
            total += v;
            if truth == predicted {
                correct += v;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        (correct as f64) / (total as f64)
    }
}

/// Average a per-class score weighted by each class's support.
pub fn weighted_average(stats: &[PerClassStats], score: impl Fn(&PerClassStats) -> f64) -> f64 {
    let total: u64 = stats.iter().map(|s| s.support as u64).sum();
    if total == 0 {
        return 0.0;
    }
    stats
        .iter()
        .map(|s| score(s) * s.support as f64)
        .sum::<f64>()
        / total as f64
}

/// Scores computed once per training run on the held-out partition.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<PerClassStats>,
}

/// Score predictions against the truth labels.
pub fn evaluate(n_classes: usize, truth: &[usize], predicted: &[usize]) -> EvaluationReport {
    let confusion = ConfusionMatrix::from_predictions(n_classes, truth, predicted);
    let per_class = precision_recall_by_class(&confusion);
    EvaluationReport {
        accuracy: accuracy(&confusion),
        precision: weighted_average(&per_class, |s| s.precision),
        recall: weighted_average(&per_class, |s| s.recall),
        f1: weighted_average(&per_class, |s| s.f1),
        confusion,
        per_class,
    }
}
