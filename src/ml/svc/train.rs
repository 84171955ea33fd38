use linfa::prelude::{DatasetBase, Fit};
use linfa_svm::Svm;
use ndarray::{Array1, Array2, Axis};

use super::{BinaryMachine, KernelKind, KernelSpec, MODEL_VERSION, SvcModel, TrainError};
use crate::dataset::Dataset;

/// Training options for the support-vector classifier.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub kernel: KernelKind,
    /// Regularization strength `C`, applied to both sides of every pair.
    pub penalty: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            kernel: KernelKind::Rbf,
            penalty: 1.0,
        }
    }
}

/// `1 / (n_features * Var(X))` over every entry of the feature matrix.
///
/// Constant inputs fall back to `1.0`.
pub fn scale_gamma(features: &Array2<f64>) -> f64 {
    let n_features = features.ncols();
    let count = features.len();
    if count == 0 || n_features == 0 {
        return 1.0;
    }
    let mean = features.sum() / count as f64;
    let variance = features.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
    if variance > 0.0 {
        1.0 / (n_features as f64 * variance)
    } else {
        1.0
    }
}

/// Fit one linfa-svm machine per class pair on `dataset`.
pub fn train_svc(
    dataset: &Dataset,
    classes: &[&str],
    options: &TrainOptions,
) -> Result<SvcModel, TrainError> {
    if !options.penalty.is_finite() || options.penalty <= 0.0 {
        return Err(TrainError::InvalidPenalty(options.penalty));
    }
    if dataset.is_empty() {
        return Err(TrainError::EmptyTrainingSet);
    }
    if dataset.features.nrows() != dataset.targets.len() {
        return Err(TrainError::ShapeMismatch {
            rows: dataset.features.nrows(),
            labels: dataset.targets.len(),
        });
    }
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); classes.len()];
    for (row, &target) in dataset.targets.iter().enumerate() {
        if let Some(rows) = members.get_mut(target) {
            rows.push(row);
        }
    }
    if let Some(empty) = members.iter().position(|rows| rows.is_empty()) {
        return Err(TrainError::MissingClass(classes[empty].to_string()));
    }

    let kernel = KernelSpec::new(options.kernel, scale_gamma(&dataset.features));
    let inputs = &dataset.features * kernel.input_scale();
    tracing::debug!(
        kernel = %kernel.kind,
        gamma = kernel.gamma,
        penalty = options.penalty,
        "fitting one-vs-one SVC"
    );

    let mut machines = Vec::with_capacity(classes.len() * classes.len().saturating_sub(1) / 2);
    for positive in 0..classes.len() {
        for negative in positive + 1..classes.len() {
            let rows: Vec<usize> = members[positive]
                .iter()
                .chain(&members[negative])
                .copied()
                .collect();
            let records = inputs.select(Axis(0), &rows);
            let targets: Array1<bool> = rows
                .iter()
                .map(|&row| dataset.targets[row] == positive)
                .collect();
            let params = Svm::<f64, bool>::params()
                .pos_neg_weights(options.penalty, options.penalty);
            let svm = kernel
                .configure(params)
                .fit(&DatasetBase::new(records, targets))?;
            tracing::debug!(
                positive,
                negative,
                support_vectors = svm.nsupport(),
                "fitted pair"
            );
            machines.push(BinaryMachine {
                positive,
                negative,
                svm,
            });
        }
    }

    Ok(SvcModel {
        model_version: MODEL_VERSION,
        kernel,
        penalty: options.penalty,
        n_features: dataset.features.ncols(),
        classes: classes.iter().map(|name| name.to_string()).collect(),
        machines,
    })
}
