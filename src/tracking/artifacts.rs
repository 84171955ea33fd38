//! Artifact persistence behind a narrow trait so workflows can run against
//! in-memory stores in tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid artifact name {0:?}")]
    InvalidName(String),
    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Location and fingerprint of a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
}

impl StoredArtifact {
    pub fn describe(path: PathBuf, bytes: &[u8]) -> Self {
        Self {
            path,
            sha256: sha256_hex(bytes),
            size_bytes: bytes.len() as u64,
        }
    }
}

/// Persists named byte blobs.
pub trait ArtifactStore {
    fn persist(&self, name: &str, bytes: &[u8]) -> Result<StoredArtifact, ArtifactError>;
}

/// Writes artifacts as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn persist(&self, name: &str, bytes: &[u8]) -> Result<StoredArtifact, ArtifactError> {
        let relative = Path::new(name);
        if name.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|part| matches!(part, std::path::Component::ParentDir))
        {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }
        let path = self.root.join(relative);
        atomic_write(&path, bytes).map_err(|source| ArtifactError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "artifact persisted");
        Ok(StoredArtifact::describe(path, bytes))
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write through a sibling temp file and rename so readers never observe a
/// partial file.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other("artifact path has no file name"))?;
    let tmp_path = dir.join(format!(
        "{}.tmp-{}",
        file_name.to_string_lossy(),
        uuid::Uuid::new_v4().simple()
    ));
    let result = (|| -> Result<(), std::io::Error> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn persists_bytes_with_digest() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let stored = store.persist("model.pkl", b"abc").unwrap();
        assert_eq!(stored.path, dir.path().join("model.pkl"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"abc");
        assert_eq!(
            stored.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(stored.size_bytes, 3);
    }

    #[test]
    fn overwrites_previous_artifact_without_leftovers() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        store.persist("model.pkl", b"first").unwrap();
        store.persist("model.pkl", b"second").unwrap();
        assert_eq!(std::fs::read(dir.path().join("model.pkl")).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn rejects_escaping_names() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        assert!(matches!(
            store.persist("../model.pkl", b"x"),
            Err(ArtifactError::InvalidName(_))
        ));
        assert!(matches!(store.persist("", b"x"), Err(ArtifactError::InvalidName(_))));
    }
}
