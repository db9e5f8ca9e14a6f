//! Type descriptors: per-type element accessors resolved once through a
//! registry instead of by reflection at each call.

use super::value::{Composite, ExtensionValue, FhirValue, ReferenceValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub type Getter = Arc<dyn Fn(&FhirValue) -> Vec<FhirValue> + Send + Sync>;

/// Writes values into a container. Returns `false` when the container is
/// not of the variant the accessor was written for.
pub type Setter = Arc<dyn Fn(&mut FhirValue, Vec<FhirValue>) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    Primitive,
    Complex,
    Resource,
    Backbone,
}

/// Typed access to one element of a described type.
#[derive(Clone)]
pub struct ElementAccessor {
    pub name: String,
    /// Per-element type; for backbone elements this is the backbone type id
    /// (e.g. `Practitioner.qualification`).
    pub element_type: String,
    pub is_collection: bool,
    /// Concrete types admitted by a type-choice element, empty otherwise.
    pub choice_types: Vec<String>,
    getter: Getter,
    setter: Setter,
}

impl ElementAccessor {
    /// Accessor over a named element of a [`Composite`].
    pub fn field(name: impl Into<String>, element_type: impl Into<String>, is_collection: bool) -> Self {
        let name = name.into();
        let get_name = name.clone();
        let set_name = name.clone();
        Self {
            name,
            element_type: element_type.into(),
            is_collection,
            choice_types: Vec::new(),
            getter: Arc::new(move |container: &FhirValue| match container {
                FhirValue::Composite(c) => c.get(&get_name).to_vec(),
                _ => Vec::new(),
            }),
            setter: Arc::new(move |container: &mut FhirValue, values: Vec<FhirValue>| match container {
                FhirValue::Composite(c) => {
                    c.set(set_name.clone(), values);
                    true
                }
                _ => false,
            }),
        }
    }

    /// Type-choice accessor; `name` is the element name without `[x]`.
    pub fn choice<I, S>(name: impl Into<String>, choice_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut accessor = Self::field(name, "Element", false);
        accessor.choice_types = choice_types.into_iter().map(Into::into).collect();
        accessor
    }

    pub fn custom(
        name: impl Into<String>,
        element_type: impl Into<String>,
        is_collection: bool,
        getter: Getter,
        setter: Setter,
    ) -> Self {
        Self {
            name: name.into(),
            element_type: element_type.into(),
            is_collection,
            choice_types: Vec::new(),
            getter,
            setter,
        }
    }

    pub fn with_choice_types<I, S>(mut self, choice_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choice_types = choice_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_choice(&self) -> bool {
        !self.choice_types.is_empty()
    }

    /// Declared return type: `List<T>` for collections, `T` otherwise.
    pub fn return_type(&self) -> String {
        if self.is_collection {
            format!("List<{}>", self.element_type)
        } else {
            self.element_type.clone()
        }
    }

    pub fn get(&self, container: &FhirValue) -> Vec<FhirValue> {
        (self.getter)(container)
    }

    /// Replaces the element's values. Non-collections keep the first value.
    pub fn set(&self, container: &mut FhirValue, mut values: Vec<FhirValue>) -> bool {
        if !self.is_collection {
            values.truncate(1);
        }
        (self.setter)(container, values)
    }

    /// Appends to a collection, or replaces a single-valued element.
    pub fn append(&self, container: &mut FhirValue, values: Vec<FhirValue>) -> bool {
        if !self.is_collection {
            return self.set(container, values);
        }
        let mut current = self.get(container);
        current.extend(values);
        (self.setter)(container, current)
    }
}

impl fmt::Debug for ElementAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementAccessor")
            .field("name", &self.name)
            .field("return_type", &self.return_type())
            .field("choice_types", &self.choice_types)
            .finish()
    }
}

/// The mapped elements of one type, keyed by structural name.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    elements: IndexMap<String, Arc<ElementAccessor>>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            elements: IndexMap::new(),
        }
    }

    pub fn with_element(mut self, accessor: ElementAccessor) -> Self {
        self.elements.insert(accessor.name.clone(), Arc::new(accessor));
        self
    }

    /// Looks up an accessor by structural name; a trailing `[x]` is ignored.
    pub fn element(&self, name: &str) -> Option<&Arc<ElementAccessor>> {
        self.elements.get(name.strip_suffix("[x]").unwrap_or(name))
    }

    pub fn elements(&self) -> impl Iterator<Item = &Arc<ElementAccessor>> {
        self.elements.values()
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    /// A fresh, empty instance. Primitives have no empty form.
    pub fn instantiate(&self) -> Option<FhirValue> {
        match (self.kind, self.name.as_str()) {
            (TypeKind::Primitive, _) => None,
            (_, "Reference") => Some(FhirValue::Reference(ReferenceValue::default())),
            (_, "Extension") => Some(FhirValue::Extension(ExtensionValue::default())),
            _ => Some(FhirValue::Composite(Composite::new(self.name.clone()))),
        }
    }
}

/// Resolves type ids to descriptors.
pub trait TypeDescriptorProvider: Send + Sync {
    fn describe(&self, type_id: &str) -> Option<Arc<TypeDescriptor>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_type_reflects_collection() {
        assert_eq!(ElementAccessor::field("name", "HumanName", true).return_type(), "List<HumanName>");
        assert_eq!(ElementAccessor::field("active", "boolean", false).return_type(), "boolean");
    }

    #[test]
    fn test_append_keeps_existing_values() {
        let names = ElementAccessor::field("name", "HumanName", true);
        let mut practitioner = FhirValue::Composite(Composite::new("Practitioner"));
        assert!(names.append(&mut practitioner, vec![FhirValue::string("a")]));
        assert!(names.append(&mut practitioner, vec![FhirValue::string("b")]));
        assert_eq!(names.get(&practitioner).len(), 2);
    }

    #[test]
    fn test_single_valued_set_keeps_first() {
        let active = ElementAccessor::field("active", "boolean", false);
        let mut practitioner = FhirValue::Composite(Composite::new("Practitioner"));
        active.set(
            &mut practitioner,
            vec![FhirValue::boolean(true), FhirValue::boolean(false)],
        );
        assert_eq!(active.get(&practitioner), vec![FhirValue::boolean(true)]);
    }

    #[test]
    fn test_setter_rejects_wrong_container() {
        let active = ElementAccessor::field("active", "boolean", false);
        let mut reference = FhirValue::reference("Organization/1");
        assert!(!active.set(&mut reference, vec![FhirValue::boolean(true)]));
    }

    #[test]
    fn test_choice_lookup_strips_suffix() {
        let observation = TypeDescriptor::new("Observation", TypeKind::Resource)
            .with_element(ElementAccessor::choice("value", ["Quantity", "string"]));
        let value = observation.element("value[x]").expect("value accessor");
        assert!(value.is_choice());
    }
}
