use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use irisflow::tracking::{
    ArtifactError, ArtifactStore, ModelRegistration, ModelRegistry, RegisteredModel,
    RegistryError, StoredArtifact,
};

/// Artifact store that keeps blobs in memory.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

impl ArtifactStore for MemoryStore {
    fn persist(&self, name: &str, bytes: &[u8]) -> Result<StoredArtifact, ArtifactError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(StoredArtifact::describe(
            PathBuf::from(format!("memory://{name}")),
            bytes,
        ))
    }
}

/// Registry that records registrations in memory.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: Mutex<Vec<RegisteredModel>>,
}

impl MemoryRegistry {
    pub fn entries(&self) -> Vec<RegisteredModel> {
        self.entries.lock().unwrap().clone()
    }
}

impl ModelRegistry for MemoryRegistry {
    fn register(&self, registration: &ModelRegistration) -> Result<RegisteredModel, RegistryError> {
        let mut entries = self.entries.lock().unwrap();
        let version = entries
            .iter()
            .filter(|entry| entry.name == registration.model_name)
            .count() as u32
            + 1;
        let entry = RegisteredModel {
            name: registration.model_name.clone(),
            version,
            artifact_path: registration.artifact.path.clone(),
            sha256: registration.artifact.sha256.clone(),
            size_bytes: registration.artifact.size_bytes,
            description: registration.description.clone(),
            framework: registration.framework.clone(),
            framework_version: registration.framework_version.clone(),
            run_id: registration.run_id.clone(),
            registered_at: "1970-01-01T00:00:00Z".to_string(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }
}
