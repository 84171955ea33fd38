//! Model registry: a system of record mapping model names to versioned
//! artifacts plus descriptive metadata.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::artifacts::{StoredArtifact, atomic_write};

/// File name of the JSON index kept by [`FileModelRegistry`].
pub const REGISTRY_FILE_NAME: &str = "models.json";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model name must not be empty")]
    EmptyName,
    #[error("Failed to read registry {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize registry {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write registry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format registration time: {0}")]
    FormatTime(#[from] time::error::Format),
}

/// Request to record a persisted artifact under a model name.
#[derive(Debug, Clone)]
pub struct ModelRegistration {
    pub model_name: String,
    pub artifact: StoredArtifact,
    pub description: String,
    pub framework: String,
    pub framework_version: String,
    pub run_id: String,
}

/// One registered version of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    pub version: u32,
    pub artifact_path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    pub description: String,
    pub framework: String,
    pub framework_version: String,
    pub run_id: String,
    pub registered_at: String,
}

/// Records model versions.
pub trait ModelRegistry {
    fn register(&self, registration: &ModelRegistration) -> Result<RegisteredModel, RegistryError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryIndex {
    #[serde(default)]
    models: Vec<RegisteredModel>,
}

/// Registry backed by a JSON index file. Versions are numbered per model
/// name starting at 1.
#[derive(Debug, Clone)]
pub struct FileModelRegistry {
    path: PathBuf,
}

impl FileModelRegistry {
    /// Registry whose index lives at `dir/models.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(REGISTRY_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every registered version, oldest first.
    pub fn entries(&self) -> Result<Vec<RegisteredModel>, RegistryError> {
        Ok(self.load_index()?.models)
    }

    /// Highest registered version of `name`.
    pub fn latest(&self, name: &str) -> Result<Option<RegisteredModel>, RegistryError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| entry.name == name)
            .max_by_key(|entry| entry.version))
    }

    fn load_index(&self) -> Result<RegistryIndex, RegistryError> {
        if !self.path.exists() {
            return Ok(RegistryIndex::default());
        }
        let bytes = std::fs::read(&self.path).map_err(|source| RegistryError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| RegistryError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save_index(&self, index: &RegistryIndex) -> Result<(), RegistryError> {
        let bytes =
            serde_json::to_vec_pretty(index).map_err(|source| RegistryError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        atomic_write(&self.path, &bytes).map_err(|source| RegistryError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl ModelRegistry for FileModelRegistry {
    fn register(&self, registration: &ModelRegistration) -> Result<RegisteredModel, RegistryError> {
        let name = registration.model_name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut index = self.load_index()?;
        let version = index
            .models
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.version)
            .max()
            .unwrap_or(0)
            + 1;
        let entry = RegisteredModel {
            name: name.to_string(),
            version,
            artifact_path: registration.artifact.path.clone(),
            sha256: registration.artifact.sha256.clone(),
            size_bytes: registration.artifact.size_bytes,
            description: registration.description.clone(),
            framework: registration.framework.clone(),
            framework_version: registration.framework_version.clone(),
            run_id: registration.run_id.clone(),
            registered_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
        };
        index.models.push(entry.clone());
        self.save_index(&index)?;
        tracing::info!(model = %entry.name, version = entry.version, "model registered");
        Ok(entry)
    }
}
