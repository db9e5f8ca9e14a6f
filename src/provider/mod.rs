pub mod cache;
pub mod composite;
pub mod derived;
pub mod memory;

use crate::types::element::ElementConstraint;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use cache::{CacheKey, CacheStats, SchemaCache};
pub use composite::CompositeSnapshotProvider;
pub use derived::DerivedSnapshotProvider;
pub use memory::InMemorySnapshotProvider;

/// Merged element constraints of one profile, in depth-first document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub url: String,
    pub type_name: String,
    pub elements: Vec<ElementConstraint>,
}

/// Resolves a profile identifier to its snapshot.
pub trait SnapshotProvider: Send + Sync {
    fn resolve_snapshot(&self, profile_id: &str) -> Option<Arc<StructureSnapshot>>;
}

impl StructureSnapshot {
    pub fn new(url: impl Into<String>, type_name: impl Into<String>, elements: Vec<ElementConstraint>) -> Self {
        Self {
            url: url.into(),
            type_name: type_name.into(),
            elements,
        }
    }

    /// The root element, when the snapshot starts with one.
    pub fn root(&self) -> Option<&ElementConstraint> {
        self.elements
            .first()
            .filter(|element| element.path == self.type_name)
    }
}
