//! Training parameters from command-line flags or a parameter file.
//!
//! Parameter files are JSON (`{"kernel": "rbf", "penalty": 1.0}`) unless the
//! path ends in `.toml`. `model_name` is optional in both formats.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::app_dirs;

/// Default kernel name.
pub const DEFAULT_KERNEL: &str = "rbf";
/// Default SVC penalty.
pub const DEFAULT_PENALTY: f64 = 1.0;
/// Default registered model name.
pub const MODEL_NAME: &str = "iris_model";
/// Parameter file used when `--param-file` is given without a value.
pub const DEFAULT_PARAM_FILE: &str = "dev_params.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read parameter file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON parameter file {path}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid TOML parameter file {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Parameters for one training run.
///
/// The kernel stays a name here; it is resolved when the run starts so that an
/// unknown kernel fails before anything is logged.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub kernel: String,
    pub penalty: f64,
    pub model_name: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            kernel: DEFAULT_KERNEL.to_string(),
            penalty: DEFAULT_PENALTY,
            model_name: MODEL_NAME.to_string(),
        }
    }
}

/// Values supplied on the command line, applied over a base config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainOverrides {
    pub kernel: Option<String>,
    pub penalty: Option<f64>,
    pub model_name: Option<String>,
}

impl TrainOverrides {
    pub fn apply(&self, mut config: TrainConfig) -> TrainConfig {
        if let Some(kernel) = &self.kernel {
            config.kernel = kernel.clone();
        }
        if let Some(penalty) = self.penalty {
            config.penalty = penalty;
        }
        if let Some(model_name) = &self.model_name {
            config.model_name = model_name.clone();
        }
        config
    }
}

#[derive(Debug, Deserialize)]
struct ParamFile {
    kernel: String,
    penalty: f64,
    #[serde(default)]
    model_name: Option<String>,
}

impl From<ParamFile> for TrainConfig {
    fn from(file: ParamFile) -> Self {
        Self {
            kernel: file.kernel,
            penalty: file.penalty,
            model_name: file.model_name.unwrap_or_else(|| MODEL_NAME.to_string()),
        }
    }
}

/// Locate a parameter file: the path as given when it exists, otherwise the
/// same relative path under `config/`.
pub fn resolve_param_path(path: &Path) -> PathBuf {
    resolve_param_path_in(path, &app_dirs::config_dir())
}

fn resolve_param_path_in(path: &Path, config_dir: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    let candidate = config_dir.join(path);
    if candidate.exists() {
        candidate
    } else {
        path.to_path_buf()
    }
}

/// Load a parameter file, resolving relative names under `config/`.
pub fn load_param_file(path: &Path) -> Result<TrainConfig, ConfigError> {
    let path = resolve_param_path(path);
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = parse_params(&path, &text)?;
    tracing::debug!(path = %path.display(), ?config, "loaded parameter file");
    Ok(config)
}

fn parse_params(path: &Path, text: &str) -> Result<TrainConfig, ConfigError> {
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let file: ParamFile = if is_toml {
        toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_json::from_str(text).map_err(|source| ConfigError::ParseJson {
            path: path.to_path_buf(),
            source,
        })?
    };
    Ok(file.into())
}
