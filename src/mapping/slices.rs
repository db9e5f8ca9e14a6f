//! Runtime slice membership.

use crate::path::member_values;
use crate::types::descriptor::TypeDescriptorProvider;
use crate::types::element::DiscriminatorType;
use crate::types::schema::SchemaNode;
use crate::types::value::FhirValue;

/// Whether `value` belongs to the slice `node` describes. Non-slice nodes
/// accept everything, as do slices without usable discriminators.
pub fn matches_slice(node: &SchemaNode, value: &FhirValue, types: &dyn TypeDescriptorProvider) -> bool {
    let Some(slice) = &node.constraint.slice else {
        return true;
    };
    if let (Some(profile), FhirValue::Extension(extension)) = (&node.constraint.extension_profile, value) {
        return extension.url == *profile;
    }

    slice.discriminators.iter().all(|discriminator| {
        let segments: Vec<&str> = discriminator
            .path
            .split('.')
            .filter(|segment| *segment != "$this")
            .collect();
        let Some(target) = descend(node, &segments) else {
            tracing::trace!(
                "Discriminator path '{}' not in slice {}, accepting",
                discriminator.path,
                node.path
            );
            return true;
        };
        let actual = values_at(value, &segments, types);

        match discriminator.kind {
            DiscriminatorType::Value | DiscriminatorType::Pattern => {
                if let Some(fixed) = target.materialized_fixed() {
                    actual.iter().any(|candidate| candidate.matches_fixed(&fixed))
                } else if let Some(pattern) = &target.constraint.pattern {
                    actual.iter().any(|candidate| candidate.matches_pattern(pattern))
                } else {
                    true
                }
            }
            DiscriminatorType::Exists => {
                if target.constraint.min > 0 {
                    !actual.is_empty()
                } else if target.constraint.max.is_prohibited() {
                    actual.is_empty()
                } else {
                    true
                }
            }
            DiscriminatorType::Type => actual
                .iter()
                .all(|candidate| candidate.type_name() == target.type_code),
            DiscriminatorType::Profile => true,
        }
    })
}

fn descend<'a>(node: &'a SchemaNode, segments: &[&str]) -> Option<&'a SchemaNode> {
    segments.iter().try_fold(node, |current, segment| {
        current.child(segment.strip_suffix("[x]").unwrap_or(segment))
    })
}

fn values_at(value: &FhirValue, segments: &[&str], types: &dyn TypeDescriptorProvider) -> Vec<FhirValue> {
    segments.iter().fold(vec![value.clone()], |current, segment| {
        current
            .iter()
            .flat_map(|item| member_values(types, item, segment))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::descriptor::ElementAccessor;
    use crate::types::element::{Discriminator, DiscriminatorType};
    use crate::types::registry::TypeRegistry;
    use crate::types::schema::{NodeConstraint, SliceInfo};
    use crate::types::value::{Composite, ExtensionValue};
    use std::sync::Arc;

    const NPI: &str = "http://hl7.org/fhir/sid/us-npi";

    fn node(path: &str, local: &str, type_code: &str, constraint: NodeConstraint) -> SchemaNode {
        SchemaNode {
            path: path.to_string(),
            local_name: local.to_string(),
            type_code: type_code.to_string(),
            profile: None,
            constraint,
            accessor: Some(Arc::new(ElementAccessor::field(local, type_code, false))),
            type_descriptor: None,
            children: Vec::new(),
        }
    }

    fn npi_slice() -> SchemaNode {
        let mut slice = node(
            "Practitioner.identifier:npi",
            "identifier",
            "Identifier",
            NodeConstraint {
                slice: Some(SliceInfo {
                    name: "npi".into(),
                    discriminators: vec![Discriminator::new(DiscriminatorType::Value, "system")],
                }),
                ..Default::default()
            },
        );
        slice.children.push(node(
            "Practitioner.identifier:npi.system",
            "system",
            "uri",
            NodeConstraint {
                fixed: Some(FhirValue::uri(NPI)),
                ..Default::default()
            },
        ));
        slice
    }

    fn identifier(system: &str) -> FhirValue {
        FhirValue::Composite(
            Composite::new("Identifier")
                .with("system", FhirValue::uri(system))
                .with("value", FhirValue::string("1")),
        )
    }

    #[test]
    fn test_value_discriminator_uses_fixed_child() {
        let registry = TypeRegistry::r4();
        let slice = npi_slice();
        assert!(matches_slice(&slice, &identifier(NPI), registry.as_ref()));
        assert!(!matches_slice(&slice, &identifier("urn:local"), registry.as_ref()));
    }

    #[test]
    fn test_extension_slice_matches_url() {
        let registry = TypeRegistry::r4();
        let slice = node(
            "Practitioner.extension:birthPlace",
            "extension",
            "Extension",
            NodeConstraint {
                slice: Some(SliceInfo {
                    name: "birthPlace".into(),
                    discriminators: vec![Discriminator::new(DiscriminatorType::Value, "url")],
                }),
                extension_profile: Some("http://example.org/birth-place".into()),
                ..Default::default()
            },
        );
        let matching = FhirValue::Extension(ExtensionValue::new("http://example.org/birth-place"));
        let other = FhirValue::Extension(ExtensionValue::new("http://example.org/other"));
        assert!(matches_slice(&slice, &matching, registry.as_ref()));
        assert!(!matches_slice(&slice, &other, registry.as_ref()));
    }

    #[test]
    fn test_non_slice_accepts_everything() {
        let registry = TypeRegistry::r4();
        let base = node("Practitioner.identifier", "identifier", "Identifier", NodeConstraint::default());
        assert!(matches_slice(&base, &identifier("urn:any"), registry.as_ref()));
    }
}
