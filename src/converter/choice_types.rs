use crate::types::descriptor::ElementAccessor;
use crate::types::element::ElementConstraint;

/// Concrete type an element's values take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcreteType {
    Resolved(String),
    /// An open resource slot (`Resource`/`DomainResource`).
    OpenResource,
    /// A choice whose declared type is not admitted by the accessor.
    Unsupported(String),
}

const OPEN_RESOURCE_TYPES: &[&str] = &["Resource", "DomainResource"];

/// Resolves the concrete type of an element against its accessor.
///
/// Type-choice elements take the profile's primary type. Other elements
/// take the accessor's element type, which names backbone types precisely.
pub fn resolve_concrete_type(element: &ElementConstraint, accessor: &ElementAccessor) -> ConcreteType {
    let primary = element.primary_type().map(|t| t.code.as_str());
    if primary.is_some_and(|code| OPEN_RESOURCE_TYPES.contains(&code)) {
        return ConcreteType::OpenResource;
    }

    if accessor.is_choice() {
        return match primary {
            Some(code) if accessor.choice_types.iter().any(|choice| choice == code) => {
                ConcreteType::Resolved(code.to_string())
            }
            Some(code) => ConcreteType::Unsupported(code.to_string()),
            None => ConcreteType::Unsupported(String::new()),
        };
    }

    if OPEN_RESOURCE_TYPES.contains(&accessor.element_type.as_str()) {
        return ConcreteType::OpenResource;
    }
    ConcreteType::Resolved(accessor.element_type.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_takes_primary_type() {
        let accessor = ElementAccessor::choice("value", ["Quantity", "string", "CodeableConcept"]);
        let element = ElementConstraint::new("Observation.value[x]")
            .with_type("CodeableConcept")
            .with_type("string");
        assert_eq!(
            resolve_concrete_type(&element, &accessor),
            ConcreteType::Resolved("CodeableConcept".into())
        );
    }

    #[test]
    fn test_choice_rejects_foreign_type() {
        let accessor = ElementAccessor::choice("value", ["Quantity"]);
        let element = ElementConstraint::new("Observation.value[x]").with_type("Ratio");
        assert_eq!(
            resolve_concrete_type(&element, &accessor),
            ConcreteType::Unsupported("Ratio".into())
        );
    }

    #[test]
    fn test_backbone_uses_accessor_type() {
        let accessor = ElementAccessor::field("qualification", "Practitioner.qualification", true);
        let element = ElementConstraint::new("Practitioner.qualification").with_type("BackboneElement");
        assert_eq!(
            resolve_concrete_type(&element, &accessor),
            ConcreteType::Resolved("Practitioner.qualification".into())
        );
    }

    #[test]
    fn test_open_resource_slot() {
        let accessor = ElementAccessor::field("contained", "Resource", true);
        let element = ElementConstraint::new("Practitioner.contained").with_type("Resource");
        assert_eq!(resolve_concrete_type(&element, &accessor), ConcreteType::OpenResource);
    }
}
