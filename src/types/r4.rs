//! Hand-written R4 descriptors for the types this crate maps.

use super::descriptor::{ElementAccessor, Getter, Setter, TypeDescriptor, TypeKind};
use super::value::{ExtensionValue, FhirValue, Primitive, ReferenceValue};
use std::sync::Arc;

const ONE: bool = false;
const MANY: bool = true;

pub const PRIMITIVE_TYPES: &[&str] = &[
    "base64Binary",
    "boolean",
    "canonical",
    "code",
    "date",
    "dateTime",
    "decimal",
    "id",
    "instant",
    "integer",
    "markdown",
    "oid",
    "positiveInt",
    "string",
    "time",
    "unsignedInt",
    "uri",
    "url",
    "uuid",
    "xhtml",
];

const EXTENSION_VALUE_TYPES: &[&str] = &[
    "base64Binary",
    "boolean",
    "canonical",
    "code",
    "date",
    "dateTime",
    "decimal",
    "id",
    "instant",
    "integer",
    "markdown",
    "positiveInt",
    "string",
    "time",
    "unsignedInt",
    "uri",
    "url",
    "Address",
    "Attachment",
    "CodeableConcept",
    "Coding",
    "ContactPoint",
    "HumanName",
    "Identifier",
    "Period",
    "Quantity",
    "Reference",
];

const OBSERVATION_VALUE_TYPES: &[&str] = &[
    "Quantity",
    "CodeableConcept",
    "string",
    "boolean",
    "integer",
    "time",
    "dateTime",
    "Period",
];

pub(crate) fn descriptors() -> Vec<TypeDescriptor> {
    let mut all: Vec<TypeDescriptor> = PRIMITIVE_TYPES
        .iter()
        .map(|code| TypeDescriptor::new(*code, TypeKind::Primitive))
        .collect();

    all.extend([
        complex(
            "Coding",
            &[
                ("system", "uri", ONE),
                ("version", "string", ONE),
                ("code", "code", ONE),
                ("display", "string", ONE),
                ("userSelected", "boolean", ONE),
            ],
        ),
        complex(
            "CodeableConcept",
            &[("coding", "Coding", MANY), ("text", "string", ONE)],
        ),
        complex(
            "Identifier",
            &[
                ("use", "code", ONE),
                ("type", "CodeableConcept", ONE),
                ("system", "uri", ONE),
                ("value", "string", ONE),
                ("period", "Period", ONE),
                ("assigner", "Reference", ONE),
            ],
        ),
        complex(
            "HumanName",
            &[
                ("use", "code", ONE),
                ("text", "string", ONE),
                ("family", "string", ONE),
                ("given", "string", MANY),
                ("prefix", "string", MANY),
                ("suffix", "string", MANY),
                ("period", "Period", ONE),
            ],
        ),
        complex(
            "Period",
            &[("start", "dateTime", ONE), ("end", "dateTime", ONE)],
        ),
        complex(
            "Quantity",
            &[
                ("value", "decimal", ONE),
                ("comparator", "code", ONE),
                ("unit", "string", ONE),
                ("system", "uri", ONE),
                ("code", "code", ONE),
            ],
        ),
        complex(
            "Attachment",
            &[
                ("contentType", "code", ONE),
                ("language", "code", ONE),
                ("data", "base64Binary", ONE),
                ("url", "url", ONE),
                ("size", "unsignedInt", ONE),
                ("title", "string", ONE),
                ("creation", "dateTime", ONE),
            ],
        ),
        complex(
            "ContactPoint",
            &[
                ("system", "code", ONE),
                ("value", "string", ONE),
                ("use", "code", ONE),
                ("rank", "positiveInt", ONE),
                ("period", "Period", ONE),
            ],
        ),
        complex(
            "Address",
            &[
                ("use", "code", ONE),
                ("type", "code", ONE),
                ("text", "string", ONE),
                ("line", "string", MANY),
                ("city", "string", ONE),
                ("district", "string", ONE),
                ("state", "string", ONE),
                ("postalCode", "string", ONE),
                ("country", "string", ONE),
                ("period", "Period", ONE),
            ],
        ),
        complex(
            "Meta",
            &[
                ("versionId", "id", ONE),
                ("lastUpdated", "instant", ONE),
                ("source", "uri", ONE),
                ("profile", "canonical", MANY),
                ("security", "Coding", MANY),
                ("tag", "Coding", MANY),
            ],
        ),
        complex(
            "Narrative",
            &[("status", "code", ONE), ("div", "xhtml", ONE)],
        ),
        reference(),
        extension(),
    ]);

    all.extend([
        resource(
            "Practitioner",
            &[
                ("identifier", "Identifier", MANY),
                ("active", "boolean", ONE),
                ("name", "HumanName", MANY),
                ("telecom", "ContactPoint", MANY),
                ("address", "Address", MANY),
                ("gender", "code", ONE),
                ("birthDate", "date", ONE),
                ("photo", "Attachment", MANY),
                ("qualification", "Practitioner.qualification", MANY),
                ("communication", "CodeableConcept", MANY),
            ],
        ),
        backbone(
            "Practitioner.qualification",
            &[
                ("identifier", "Identifier", MANY),
                ("code", "CodeableConcept", ONE),
                ("period", "Period", ONE),
                ("issuer", "Reference", ONE),
            ],
        ),
        resource(
            "Patient",
            &[
                ("identifier", "Identifier", MANY),
                ("active", "boolean", ONE),
                ("name", "HumanName", MANY),
                ("telecom", "ContactPoint", MANY),
                ("gender", "code", ONE),
                ("birthDate", "date", ONE),
                ("address", "Address", MANY),
                ("maritalStatus", "CodeableConcept", ONE),
                ("photo", "Attachment", MANY),
                ("contact", "Patient.contact", MANY),
                ("communication", "Patient.communication", MANY),
                ("generalPractitioner", "Reference", MANY),
                ("managingOrganization", "Reference", ONE),
            ],
        )
        .with_element(ElementAccessor::choice("deceased", ["boolean", "dateTime"]))
        .with_element(ElementAccessor::choice("multipleBirth", ["boolean", "integer"])),
        backbone(
            "Patient.contact",
            &[
                ("relationship", "CodeableConcept", MANY),
                ("name", "HumanName", ONE),
                ("telecom", "ContactPoint", MANY),
                ("address", "Address", ONE),
                ("gender", "code", ONE),
                ("organization", "Reference", ONE),
                ("period", "Period", ONE),
            ],
        ),
        backbone(
            "Patient.communication",
            &[("language", "CodeableConcept", ONE), ("preferred", "boolean", ONE)],
        ),
        resource(
            "Organization",
            &[
                ("identifier", "Identifier", MANY),
                ("active", "boolean", ONE),
                ("type", "CodeableConcept", MANY),
                ("name", "string", ONE),
                ("alias", "string", MANY),
                ("telecom", "ContactPoint", MANY),
                ("address", "Address", MANY),
                ("partOf", "Reference", ONE),
            ],
        ),
        resource(
            "Observation",
            &[
                ("identifier", "Identifier", MANY),
                ("basedOn", "Reference", MANY),
                ("partOf", "Reference", MANY),
                ("status", "code", ONE),
                ("category", "CodeableConcept", MANY),
                ("code", "CodeableConcept", ONE),
                ("subject", "Reference", ONE),
                ("focus", "Reference", MANY),
                ("encounter", "Reference", ONE),
                ("issued", "instant", ONE),
                ("performer", "Reference", MANY),
                ("dataAbsentReason", "CodeableConcept", ONE),
                ("interpretation", "CodeableConcept", MANY),
                ("bodySite", "CodeableConcept", ONE),
                ("method", "CodeableConcept", ONE),
                ("specimen", "Reference", ONE),
                ("device", "Reference", ONE),
                ("hasMember", "Reference", MANY),
                ("derivedFrom", "Reference", MANY),
                ("component", "Observation.component", MANY),
            ],
        )
        .with_element(ElementAccessor::choice(
            "effective",
            ["dateTime", "Period", "instant"],
        ))
        .with_element(ElementAccessor::choice(
            "value",
            OBSERVATION_VALUE_TYPES.iter().copied(),
        )),
        backbone(
            "Observation.component",
            &[
                ("code", "CodeableConcept", ONE),
                ("dataAbsentReason", "CodeableConcept", ONE),
                ("interpretation", "CodeableConcept", MANY),
            ],
        )
        .with_element(ElementAccessor::choice(
            "value",
            OBSERVATION_VALUE_TYPES.iter().copied(),
        )),
    ]);

    all
}

fn with_fields(mut descriptor: TypeDescriptor, fields: &[(&str, &str, bool)]) -> TypeDescriptor {
    for (name, element_type, is_collection) in fields {
        descriptor = descriptor.with_element(ElementAccessor::field(*name, *element_type, *is_collection));
    }
    descriptor
}

fn complex(name: &str, fields: &[(&str, &str, bool)]) -> TypeDescriptor {
    with_fields(TypeDescriptor::new(name, TypeKind::Complex), fields)
}

fn resource(name: &str, fields: &[(&str, &str, bool)]) -> TypeDescriptor {
    let common = [
        ("id", "id", ONE),
        ("meta", "Meta", ONE),
        ("implicitRules", "uri", ONE),
        ("language", "code", ONE),
        ("text", "Narrative", ONE),
        ("extension", "Extension", MANY),
        ("modifierExtension", "Extension", MANY),
    ];
    let descriptor = with_fields(TypeDescriptor::new(name, TypeKind::Resource), &common);
    with_fields(descriptor, fields)
}

fn backbone(name: &str, fields: &[(&str, &str, bool)]) -> TypeDescriptor {
    let common = [
        ("extension", "Extension", MANY),
        ("modifierExtension", "Extension", MANY),
    ];
    let descriptor = with_fields(TypeDescriptor::new(name, TypeKind::Backbone), &common);
    with_fields(descriptor, fields)
}

fn reference() -> TypeDescriptor {
    TypeDescriptor::new("Reference", TypeKind::Complex)
        .with_element(reference_field(
            "reference",
            "string",
            Primitive::String,
            |r| &r.reference,
            |r| &mut r.reference,
        ))
        .with_element(reference_field(
            "type",
            "uri",
            Primitive::Uri,
            |r| &r.reference_type,
            |r| &mut r.reference_type,
        ))
        .with_element(reference_field(
            "display",
            "string",
            Primitive::String,
            |r| &r.display,
            |r| &mut r.display,
        ))
}

fn reference_field(
    name: &str,
    element_type: &str,
    wrap: fn(String) -> Primitive,
    field: fn(&ReferenceValue) -> &Option<String>,
    field_mut: fn(&mut ReferenceValue) -> &mut Option<String>,
) -> ElementAccessor {
    let getter: Getter = Arc::new(move |container: &FhirValue| match container {
        FhirValue::Reference(r) => field(r)
            .iter()
            .map(|text| FhirValue::Primitive(wrap(text.clone())))
            .collect(),
        _ => Vec::new(),
    });
    let setter: Setter = Arc::new(move |container: &mut FhirValue, values: Vec<FhirValue>| match container {
        FhirValue::Reference(r) => {
            *field_mut(r) = first_text(&values);
            true
        }
        _ => false,
    });
    ElementAccessor::custom(name, element_type, ONE, getter, setter)
}

fn extension() -> TypeDescriptor {
    let url_getter: Getter = Arc::new(|container: &FhirValue| match container {
        FhirValue::Extension(e) if !e.url.is_empty() => {
            vec![FhirValue::Primitive(Primitive::Uri(e.url.clone()))]
        }
        _ => Vec::new(),
    });
    let url_setter: Setter = Arc::new(|container: &mut FhirValue, values: Vec<FhirValue>| match container {
        FhirValue::Extension(e) => {
            e.url = first_text(&values).unwrap_or_default();
            true
        }
        _ => false,
    });

    let value_getter: Getter = Arc::new(|container: &FhirValue| match container {
        FhirValue::Extension(e) => e.value.iter().map(|v| (**v).clone()).collect(),
        _ => Vec::new(),
    });
    let value_setter: Setter = Arc::new(|container: &mut FhirValue, values: Vec<FhirValue>| match container {
        FhirValue::Extension(e) => {
            e.value = values.into_iter().next().map(Box::new);
            true
        }
        _ => false,
    });

    let nested_getter: Getter = Arc::new(|container: &FhirValue| match container {
        FhirValue::Extension(e) => e.extension.iter().cloned().map(FhirValue::Extension).collect(),
        _ => Vec::new(),
    });
    let nested_setter: Setter = Arc::new(|container: &mut FhirValue, values: Vec<FhirValue>| match container {
        FhirValue::Extension(e) => {
            e.extension = values
                .into_iter()
                .filter_map(|value| match value {
                    FhirValue::Extension(nested) => Some(nested),
                    _ => None,
                })
                .collect::<Vec<ExtensionValue>>();
            true
        }
        _ => false,
    });

    TypeDescriptor::new("Extension", TypeKind::Complex)
        .with_element(ElementAccessor::custom("url", "uri", ONE, url_getter, url_setter))
        .with_element(
            ElementAccessor::custom("value", "Element", ONE, value_getter, value_setter)
                .with_choice_types(EXTENSION_VALUE_TYPES.iter().copied()),
        )
        .with_element(ElementAccessor::custom(
            "extension",
            "Extension",
            MANY,
            nested_getter,
            nested_setter,
        ))
}

fn first_text(values: &[FhirValue]) -> Option<String> {
    values
        .first()
        .and_then(FhirValue::as_primitive)
        .and_then(Primitive::as_text)
        .map(str::to_string)
}
