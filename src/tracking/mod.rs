//! Run tracking: metric logging, artifact persistence and model registration.
//!
//! A [`RunContext`] is created once per process and handed to the workflow by
//! reference. It collects everything logged during the run and writes a
//! `run.json` summary next to the other outputs.

pub mod artifacts;
pub mod registry;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::ml::metrics::ConfusionMatrixRecord;

pub use artifacts::{ArtifactError, ArtifactStore, LocalArtifactStore, StoredArtifact, sha256_hex};
pub use registry::{
    FileModelRegistry, ModelRegistration, ModelRegistry, RegisteredModel, RegistryError,
};

/// File name of the per-run summary.
pub const RUN_RECORD_FILE_NAME: &str = "run.json";

#[derive(Debug, Error)]
pub enum RunContextError {
    #[error("Failed to serialize {name}: {source}")]
    Serialize {
        name: String,
        source: serde_json::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Scalar logged against a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedMetric {
    pub name: String,
    pub value: MetricValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedImage {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedConfusionMatrix {
    pub name: String,
    pub path: PathBuf,
    pub record: ConfusionMatrixRecord,
}

/// Explicit per-run logging context.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    run_id: String,
    output_dir: PathBuf,
    metrics: Vec<LoggedMetric>,
    images: Vec<LoggedImage>,
    confusion_matrices: Vec<LoggedConfusionMatrix>,
}

impl RunContext {
    /// Start a run with a fresh random id.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_run_id(uuid::Uuid::new_v4().to_string(), output_dir)
    }

    pub fn with_run_id(run_id: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_id: run_id.into(),
            output_dir: output_dir.into(),
            metrics: Vec::new(),
            images: Vec::new(),
            confusion_matrices: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Record a scalar metric.
    pub fn log(&mut self, name: &str, value: impl Into<MetricValue>) {
        let value = value.into();
        match &value {
            MetricValue::Number(number) => {
                tracing::info!(run_id = %self.run_id, metric = name, value = *number)
            }
            MetricValue::Text(text) => {
                tracing::info!(run_id = %self.run_id, metric = name, value = %text)
            }
        }
        self.metrics.push(LoggedMetric {
            name: name.to_string(),
            value,
        });
    }

    /// Record an image already written to `path`.
    pub fn log_image(&mut self, name: &str, path: &Path) {
        tracing::info!(run_id = %self.run_id, image = name, path = %path.display());
        self.images.push(LoggedImage {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
    }

    /// Record a confusion matrix and write it to `<output_dir>/<name>.json`.
    pub fn log_confusion_matrix(
        &mut self,
        name: &str,
        record: &ConfusionMatrixRecord,
    ) -> Result<PathBuf, RunContextError> {
        let path = self.output_dir.join(format!("{name}.json"));
        let bytes = serde_json::to_vec_pretty(record).map_err(|source| {
            RunContextError::Serialize {
                name: name.to_string(),
                source,
            }
        })?;
        artifacts::atomic_write(&path, &bytes).map_err(|source| RunContextError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(run_id = %self.run_id, table = name, path = %path.display());
        self.confusion_matrices.push(LoggedConfusionMatrix {
            name: name.to_string(),
            path: path.clone(),
            record: record.clone(),
        });
        Ok(path)
    }

    pub fn metrics(&self) -> &[LoggedMetric] {
        &self.metrics
    }

    /// Most recent value logged under `name`.
    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics
            .iter()
            .rev()
            .find(|metric| metric.name == name)
            .map(|metric| &metric.value)
    }

    pub fn images(&self) -> &[LoggedImage] {
        &self.images
    }

    pub fn confusion_matrices(&self) -> &[LoggedConfusionMatrix] {
        &self.confusion_matrices
    }

    /// Write the run summary to `<output_dir>/run.json`.
    pub fn flush(&self) -> Result<PathBuf, RunContextError> {
        let path = self.output_dir.join(RUN_RECORD_FILE_NAME);
        let bytes = serde_json::to_vec_pretty(self).map_err(|source| RunContextError::Serialize {
            name: RUN_RECORD_FILE_NAME.to_string(),
            source,
        })?;
        artifacts::atomic_write(&path, &bytes).map_err(|source| RunContextError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
