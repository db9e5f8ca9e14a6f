use super::{SnapshotProvider, StructureSnapshot};
use std::sync::Arc;

/// Chain of snapshot providers; the first provider that resolves wins.
#[derive(Clone, Default)]
pub struct CompositeSnapshotProvider {
    providers: Vec<Arc<dyn SnapshotProvider>>,
}

impl CompositeSnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn SnapshotProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl SnapshotProvider for CompositeSnapshotProvider {
    fn resolve_snapshot(&self, profile_id: &str) -> Option<Arc<StructureSnapshot>> {
        let resolved = self
            .providers
            .iter()
            .find_map(|provider| provider.resolve_snapshot(profile_id));
        if resolved.is_none() {
            tracing::debug!("No provider resolved {}", profile_id);
        }
        resolved
    }
}

impl std::fmt::Debug for CompositeSnapshotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeSnapshotProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}
