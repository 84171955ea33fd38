//! Support-vector classifier with one-vs-one multi-class voting.
//!
//! One binary linfa-svm machine is fitted per class pair. Prediction lets
//! every pair vote and returns the class with the most votes, breaking ties
//! toward the lower class index. Models round-trip through versioned JSON.

mod kernel;
mod train;

pub use kernel::{KERNEL_COEF0, KernelKind, KernelSpec, POLY_DEGREE};
pub use train::{TrainOptions, scale_gamma, train_svc};

use std::path::{Path, PathBuf};

use linfa::prelude::Predict;
use linfa_svm::{Svm, SvmError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current model file format version.
pub const MODEL_VERSION: i64 = 2;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("unsupported kernel {0:?} (expected one of: linear, poly, rbf)")]
    InvalidKernel(String),
    #[error("penalty must be a finite value > 0, got {0}")]
    InvalidPenalty(f64),
    #[error("empty training set")]
    EmptyTrainingSet,
    #[error("class {0:?} has no training samples")]
    MissingClass(String),
    #[error("training rows and labels disagree: {rows} rows, {labels} labels")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("SVM fit failed: {0}")]
    Fit(#[from] SvmError),
}

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Failed to read model {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid model: {0}")]
    Invalid(String),
}

/// Binary machine voting `positive` when it predicts `true`, else `negative`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryMachine {
    pub positive: usize,
    pub negative: usize,
    pub svm: Svm<f64, bool>,
}

/// Fitted one-vs-one support-vector classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvcModel {
    pub model_version: i64,
    pub kernel: KernelSpec,
    pub penalty: f64,
    pub n_features: usize,
    /// Ordered class names; index `i` is class `i`.
    pub classes: Vec<String>,
    /// One machine per class pair, in `(0,1), (0,2), ..., (1,2), ...` order.
    pub machines: Vec<BinaryMachine>,
}

impl SvcModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            ));
        }
        let k = self.classes.len();
        if k < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.machines.len() != k * (k - 1) / 2 {
            return Err(format!(
                "Expected {} pairwise machines, found {}",
                k * (k - 1) / 2,
                self.machines.len()
            ));
        }
        if !self.kernel.gamma.is_finite() || self.kernel.gamma <= 0.0 {
            return Err("gamma must be > 0".to_string());
        }
        for (idx, machine) in self.machines.iter().enumerate() {
            if machine.positive >= k
                || machine.negative >= k
                || machine.positive == machine.negative
            {
                return Err(format!("Machine {idx} has invalid class pair"));
            }
        }
        Ok(())
    }

    /// Load a model file written by the training workflow.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let bytes = std::fs::read(path).map_err(|source| ModelLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_slice(&bytes)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ModelLoadError> {
        let model: Self = serde_json::from_slice(bytes)?;
        model.validate().map_err(ModelLoadError::Invalid)?;
        Ok(model)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Pairwise votes per class, one tally per row of `features`.
    pub fn votes(&self, features: &Array2<f64>) -> Vec<Vec<u32>> {
        let inputs = features * self.kernel.input_scale();
        let mut votes = vec![vec![0u32; self.classes.len()]; features.nrows()];
        for machine in &self.machines {
            let outcome: Array1<bool> = machine.svm.predict(&inputs);
            for (tally, &positive_wins) in votes.iter_mut().zip(outcome.iter()) {
                let winner = if positive_wins {
                    machine.positive
                } else {
                    machine.negative
                };
                tally[winner] += 1;
            }
        }
        votes
    }

    /// Predict the best class index for a feature vector.
    pub fn predict_class_index(&self, features: ArrayView1<'_, f64>) -> usize {
        let row = features.to_owned().insert_axis(Axis(0));
        self.predict(&row).first().copied().unwrap_or(0)
    }

    /// Predict a class index for every row.
    pub fn predict(&self, features: &Array2<f64>) -> Vec<usize> {
        self.votes(features)
            .iter()
            .map(|tally| winning_class(tally))
            .collect()
    }
}

/// Index with the most votes; ties go to the lower index.
pub fn winning_class(votes: &[u32]) -> usize {
    let mut best = 0usize;
    for (idx, &count) in votes.iter().enumerate() {
        if count > votes[best] {
            best = idx;
        }
    }
    best
}
