use super::descriptor::{TypeDescriptor, TypeDescriptorProvider, TypeKind};
use super::r4;
use once_cell::sync::Lazy;
use papaya::HashMap as PapayaMap;
use std::sync::Arc;

static R4_REGISTRY: Lazy<Arc<TypeRegistry>> = Lazy::new(|| Arc::new(TypeRegistry::r4_core()));

/// Registry of type descriptors, populated once and read concurrently.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: PapayaMap<String, Arc<TypeDescriptor>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryMetrics {
    pub total_types: usize,
    pub primitive_count: usize,
    pub complex_count: usize,
    pub resource_count: usize,
    pub backbone_count: usize,
}

impl TypeRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry holding the hand-written R4 descriptors.
    pub fn r4() -> Arc<TypeRegistry> {
        Arc::clone(&R4_REGISTRY)
    }

    /// A fresh registry with the R4 descriptors, for callers that add
    /// their own types on top.
    pub fn r4_core() -> Self {
        let registry = Self::new();
        for descriptor in r4::descriptors() {
            registry.register(descriptor);
        }
        tracing::debug!("Registered {} R4 type descriptors", registry.len());
        registry
    }

    /// Register a descriptor, replacing any previous one with the same name.
    pub fn register(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.types
            .pin()
            .insert(descriptor.name.clone(), Arc::clone(&descriptor));
        descriptor
    }

    pub fn with(self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.pin().contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> RegistryMetrics {
        let mut metrics = RegistryMetrics::default();
        for descriptor in self.types.pin().values() {
            metrics.total_types += 1;
            match descriptor.kind {
                TypeKind::Primitive => metrics.primitive_count += 1,
                TypeKind::Complex => metrics.complex_count += 1,
                TypeKind::Resource => metrics.resource_count += 1,
                TypeKind::Backbone => metrics.backbone_count += 1,
            }
        }
        metrics
    }
}

impl TypeDescriptorProvider for TypeRegistry {
    fn describe(&self, type_id: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.pin().get(type_id).cloned()
    }
}
