//! JSON file snapshot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use stakeward_types::Election;

use crate::{ElectionRegistry, RegistryError, RegistryStore};

#[derive(Serialize)]
struct SnapshotRef<'a> {
    elections: Vec<&'a Election>,
}

#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    elections: Vec<Election>,
}

/// Stores the registry as `{"elections": [...]}` in a single file.
///
/// Writes go to a sibling temp file which is then renamed over the snapshot,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<ElectionRegistry, RegistryError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no registry snapshot, starting empty");
            return Ok(ElectionRegistry::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ElectionRegistry::new());
        }
        let snapshot: Snapshot = serde_json::from_str(&content)
            .map_err(|e| RegistryError::Corruption(format!("{}: {e}", self.path.display())))?;
        let registry = ElectionRegistry::from_elections(snapshot.elections);
        tracing::info!(
            path = %self.path.display(),
            elections = registry.len(),
            "loaded registry snapshot"
        );
        Ok(registry)
    }

    fn save(&self, registry: &ElectionRegistry) -> Result<(), RegistryError> {
        let snapshot = SnapshotRef {
            elections: registry.iter().collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), elections = registry.len(), "saved registry");
        Ok(())
    }
}
