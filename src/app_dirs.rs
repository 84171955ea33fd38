//! Run directory helpers anchored to the current working directory.
//!
//! Training outputs land in `outputs/`, registered models are tracked under
//! `registry/` and parameter files are looked up in `config/`. The output and
//! registry roots can be redirected with `IRISFLOW_OUTPUT_DIR` and
//! `IRISFLOW_REGISTRY_DIR` for tests or CI sandboxes.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use thiserror::Error;

/// Default directory for run outputs, relative to the working directory.
pub const OUTPUTS_DIR_NAME: &str = "outputs";
/// Default directory for the local model registry.
pub const REGISTRY_DIR_NAME: &str = "registry";
/// Directory searched for relative parameter files.
pub const CONFIG_DIR_NAME: &str = "config";

const OUTPUT_DIR_ENV: &str = "IRISFLOW_OUTPUT_DIR";
const REGISTRY_DIR_ENV: &str = "IRISFLOW_REGISTRY_DIR";

static OUTPUT_BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing run directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// Failed to create a run directory.
    #[error("Failed to create directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the outputs directory, creating it if needed.
pub fn outputs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(output_base_dir())
}

/// Return the logs directory inside the outputs root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(outputs_dir()?.join("logs"))
}

/// Return the registry directory, creating it if needed.
pub fn registry_dir() -> Result<PathBuf, AppDirError> {
    let path = std::env::var(REGISTRY_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(REGISTRY_DIR_NAME));
    ensure_dir(path)
}

/// Directory holding named parameter files such as `dev_params.json`.
pub fn config_dir() -> PathBuf {
    PathBuf::from(CONFIG_DIR_NAME)
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn output_base_dir() -> PathBuf {
    if let Some(path) = OUTPUT_BASE_OVERRIDE
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
    {
        return path;
    }
    if let Ok(path) = std::env::var(OUTPUT_DIR_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from(OUTPUTS_DIR_NAME)
}

#[cfg(test)]
fn set_output_base_override(path: PathBuf) {
    let mut guard = OUTPUT_BASE_OVERRIDE
        .lock()
        .expect("output base override mutex poisoned");
    *guard = Some(path);
}

#[cfg(test)]
fn clear_output_base_override() {
    let mut guard = OUTPUT_BASE_OVERRIDE
        .lock()
        .expect("output base override mutex poisoned");
    *guard = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct OverrideGuard;

    impl OverrideGuard {
        fn set(path: PathBuf) -> Self {
            set_output_base_override(path);
            Self
        }
    }

    impl Drop for OverrideGuard {
        fn drop(&mut self) {
            clear_output_base_override();
        }
    }

    #[test]
    fn uses_override_for_outputs_and_logs() {
        let base = tempdir().unwrap();
        let root = base.path().join("run");
        let _guard = OverrideGuard::set(root.clone());
        assert_eq!(outputs_dir().unwrap(), root);
        let logs = logs_dir().unwrap();
        assert_eq!(logs, root.join("logs"));
        assert!(logs.is_dir());
    }
}
