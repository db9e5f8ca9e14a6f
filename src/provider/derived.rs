use super::{SnapshotProvider, StructureSnapshot};
use crate::types::descriptor::{TypeDescriptor, TypeDescriptorProvider, TypeKind};
use crate::types::element::ElementConstraint;
use papaya::HashMap as PapayaMap;
use std::sync::Arc;

/// Core definitions synthesised from type descriptors.
///
/// Answers `<base><TypeCode>` for every non-primitive described type. Base
/// cardinalities are permissive (`0..1` or `0..*`); backbone children are
/// inlined since backbone types have no definition of their own.
pub struct DerivedSnapshotProvider {
    types: Arc<dyn TypeDescriptorProvider>,
    base_url: String,
    derived: PapayaMap<String, Arc<StructureSnapshot>>,
}

impl DerivedSnapshotProvider {
    pub fn new(types: Arc<dyn TypeDescriptorProvider>, base_url: impl Into<String>) -> Self {
        Self {
            types,
            base_url: base_url.into(),
            derived: PapayaMap::new(),
        }
    }

    fn derive(&self, url: &str, descriptor: &TypeDescriptor) -> StructureSnapshot {
        let mut elements = vec![ElementConstraint::new(descriptor.name.clone()).with_cardinality(0, "*")];
        let mut visiting = vec![descriptor.name.clone()];
        self.push_elements(&descriptor.name, descriptor, &mut elements, &mut visiting);
        tracing::debug!("Derived {} elements for {}", elements.len(), url);
        StructureSnapshot::new(url, descriptor.name.clone(), elements)
    }

    fn push_elements(
        &self,
        base_path: &str,
        descriptor: &TypeDescriptor,
        out: &mut Vec<ElementConstraint>,
        visiting: &mut Vec<String>,
    ) {
        for accessor in descriptor.elements() {
            let max = if accessor.is_collection { "*" } else { "1" };
            if accessor.is_choice() {
                let element = accessor.choice_types.iter().fold(
                    ElementConstraint::new(format!("{base_path}.{}[x]", accessor.name)).with_cardinality(0, max),
                    |element, code| element.with_type(code.clone()),
                );
                out.push(element);
                continue;
            }

            let path = format!("{base_path}.{}", accessor.name);
            let backbone = self
                .types
                .describe(&accessor.element_type)
                .filter(|nested| nested.kind == TypeKind::Backbone);
            match backbone {
                Some(backbone) if !visiting.contains(&backbone.name) => {
                    out.push(
                        ElementConstraint::new(path.clone())
                            .with_cardinality(0, max)
                            .with_type("BackboneElement"),
                    );
                    visiting.push(backbone.name.clone());
                    self.push_elements(&path, &backbone, out, visiting);
                    visiting.pop();
                }
                _ => out.push(
                    ElementConstraint::new(path)
                        .with_cardinality(0, max)
                        .with_type(accessor.element_type.clone()),
                ),
            }
        }
    }
}

impl SnapshotProvider for DerivedSnapshotProvider {
    fn resolve_snapshot(&self, profile_id: &str) -> Option<Arc<StructureSnapshot>> {
        let type_code = profile_id.strip_prefix(self.base_url.as_str())?;
        let descriptor = self.types.describe(type_code)?;
        if matches!(descriptor.kind, TypeKind::Primitive | TypeKind::Backbone) {
            return None;
        }
        let derived = self.derived.pin();
        Some(Arc::clone(derived.get_or_insert_with(profile_id.to_string(), || {
            Arc::new(self.derive(profile_id, &descriptor))
        })))
    }
}

impl std::fmt::Debug for DerivedSnapshotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedSnapshotProvider")
            .field("base_url", &self.base_url)
            .field("derived", &self.derived.pin().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::registry::TypeRegistry;

    const BASE: &str = "http://hl7.org/fhir/StructureDefinition/";

    fn provider() -> DerivedSnapshotProvider {
        DerivedSnapshotProvider::new(TypeRegistry::r4(), BASE)
    }

    #[test]
    fn test_derives_complex_type() {
        let snapshot = provider()
            .resolve_snapshot("http://hl7.org/fhir/StructureDefinition/HumanName")
            .unwrap();
        assert_eq!(snapshot.type_name, "HumanName");
        let paths: Vec<_> = snapshot.elements.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"HumanName.text"));
        assert!(paths.contains(&"HumanName.given"));
        let given = snapshot.elements.iter().find(|e| e.path == "HumanName.given").unwrap();
        assert_eq!(given.max.as_deref(), Some("*"));
    }

    #[test]
    fn test_backbone_children_are_inlined() {
        let snapshot = provider()
            .resolve_snapshot("http://hl7.org/fhir/StructureDefinition/Practitioner")
            .unwrap();
        let qualification = snapshot
            .elements
            .iter()
            .position(|e| e.path == "Practitioner.qualification")
            .unwrap();
        assert_eq!(snapshot.elements[qualification].types[0].code, "BackboneElement");
        assert!(
            snapshot.elements[qualification + 1]
                .path
                .starts_with("Practitioner.qualification.")
        );
    }

    #[test]
    fn test_choice_elements_keep_all_types() {
        let snapshot = provider()
            .resolve_snapshot("http://hl7.org/fhir/StructureDefinition/Observation")
            .unwrap();
        let value = snapshot
            .elements
            .iter()
            .find(|e| e.path == "Observation.value[x]")
            .unwrap();
        assert_eq!(value.types[0].code, "Quantity");
        assert!(value.types.len() > 1);
    }

    #[test]
    fn test_primitives_and_foreign_urls_are_unresolved() {
        let provider = provider();
        assert!(provider.resolve_snapshot("http://hl7.org/fhir/StructureDefinition/string").is_none());
        assert!(provider.resolve_snapshot("http://example.org/Practitioner").is_none());
    }
}
