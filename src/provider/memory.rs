use super::{SnapshotProvider, StructureSnapshot};
use crate::error::{MappingError, Result};
use crate::types::element::ElementConstraint;
use papaya::HashMap as PapayaMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Snapshot store filled from StructureDefinition JSON.
#[derive(Debug, Default)]
pub struct InMemorySnapshotProvider {
    snapshots: PapayaMap<String, Arc<StructureSnapshot>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructureDefinition {
    resource_type: String,
    url: String,
    #[serde(rename = "type")]
    type_name: String,
    snapshot: Option<SnapshotElements>,
}

#[derive(Debug, Deserialize)]
struct SnapshotElements {
    element: Vec<ElementConstraint>,
}

impl InMemorySnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, snapshot: StructureSnapshot) {
        tracing::debug!("Storing snapshot for {}", snapshot.url);
        self.snapshots
            .pin()
            .insert(snapshot.url.clone(), Arc::new(snapshot));
    }

    pub fn with(self, snapshot: StructureSnapshot) -> Self {
        self.insert(snapshot);
        self
    }

    /// Loads one StructureDefinition resource. Definitions without a
    /// snapshot are rejected.
    pub fn load_json(&self, json: Value) -> Result<String> {
        let definition: StructureDefinition = serde_json::from_value(json)?;
        if definition.resource_type != "StructureDefinition" {
            return Err(MappingError::invalid_snapshot(
                definition.url,
                format!("expected a StructureDefinition, got {}", definition.resource_type),
            ));
        }
        let Some(snapshot) = definition.snapshot else {
            return Err(MappingError::invalid_snapshot(definition.url, "no snapshot"));
        };
        let url = definition.url.clone();
        self.insert(StructureSnapshot::new(
            definition.url,
            definition.type_name,
            snapshot.element,
        ));
        Ok(url)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let content = std::fs::read_to_string(path.as_ref())?;
        self.load_json(serde_json::from_str(&content)?)
    }

    /// Loads every `*.json` StructureDefinition in a directory. Files that
    /// hold other resources are skipped.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.load_file(&path) {
                Ok(url) => {
                    tracing::trace!("Loaded {} from {}", url, path.display());
                    loaded += 1;
                }
                Err(error @ MappingError::Io(_)) => return Err(error),
                Err(error) => tracing::warn!("Skipping {}: {}", path.display(), error),
            }
        }
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.snapshots.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotProvider for InMemorySnapshotProvider {
    fn resolve_snapshot(&self, profile_id: &str) -> Option<Arc<StructureSnapshot>> {
        self.snapshots.pin().get(profile_id).cloned()
    }
}
