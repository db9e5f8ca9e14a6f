//! Conversion of JSON literals (`fixed[x]`, `pattern[x]`, `defaultValue[x]`)
//! into typed values, and of typed values back into FHIR JSON.

use super::descriptor::{TypeDescriptorProvider, TypeKind};
use super::r4::PRIMITIVE_TYPES;
use super::value::{CodeValue, Composite, ExtensionValue, FhirValue, Primitive, ReferenceValue};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

/// Type code named by a literal suffix: `Uri` -> `uri`, `DateTime` ->
/// `dateTime`, `CodeableConcept` unchanged.
pub fn type_code_for_suffix(suffix: &str) -> String {
    let mut chars = suffix.chars();
    let lowered = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => return String::new(),
    };
    if PRIMITIVE_TYPES.contains(&lowered.as_str()) {
        lowered
    } else {
        suffix.to_string()
    }
}

/// Converts a JSON literal of the given type. Returns `None` when the
/// JSON does not fit the type.
pub fn value_from_json(
    type_code: &str,
    json: &Value,
    types: &dyn TypeDescriptorProvider,
) -> Option<FhirValue> {
    if let Some(primitive) = primitive_from_json(type_code, json) {
        return Some(FhirValue::Primitive(primitive));
    }
    let object = json.as_object()?;
    match type_code {
        "Reference" => Some(FhirValue::Reference(ReferenceValue {
            reference: string_field(object.get("reference")),
            reference_type: string_field(object.get("type")),
            display: string_field(object.get("display")),
        })),
        "Extension" => extension_from_json(json, types).map(FhirValue::Extension),
        _ => {
            let descriptor = types.describe(type_code)?;
            if descriptor.kind == TypeKind::Primitive {
                return None;
            }
            let mut composite = Composite::new(descriptor.name.clone());
            for (key, value) in object {
                if key == "resourceType" {
                    continue;
                }
                let (accessor, element_type) = match descriptor.element(key) {
                    Some(accessor) if !accessor.is_choice() => (accessor, accessor.element_type.clone()),
                    _ => match descriptor.elements().find_map(|accessor| {
                        let suffix = key.strip_prefix(accessor.name.as_str())?;
                        let code = type_code_for_suffix(suffix);
                        accessor.choice_types.contains(&code).then_some((accessor, code))
                    }) {
                        Some(found) => found,
                        None => {
                            tracing::debug!("Ignoring unknown element '{}' on {}", key, type_code);
                            continue;
                        }
                    },
                };
                let items: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    single => vec![single],
                };
                for item in items {
                    if let Some(converted) = value_from_json(&element_type, item, types) {
                        composite.push(accessor.name.clone(), converted);
                    }
                }
            }
            Some(FhirValue::Composite(composite))
        }
    }
}

fn extension_from_json(json: &Value, types: &dyn TypeDescriptorProvider) -> Option<ExtensionValue> {
    let object = json.as_object()?;
    let mut extension = ExtensionValue::new(object.get("url")?.as_str()?);
    for (key, value) in object {
        if let Some(suffix) = key.strip_prefix("value") {
            extension.value = value_from_json(&type_code_for_suffix(suffix), value, types).map(Box::new);
        }
    }
    if let Some(Value::Array(nested)) = object.get("extension") {
        extension.extension = nested
            .iter()
            .filter_map(|item| extension_from_json(item, types))
            .collect();
    }
    Some(extension)
}

fn primitive_from_json(type_code: &str, json: &Value) -> Option<Primitive> {
    let text = || json.as_str().map(str::to_string);
    Some(match type_code {
        "boolean" => Primitive::Boolean(json.as_bool()?),
        "integer" | "positiveInt" | "unsignedInt" => Primitive::Integer(json.as_i64()?),
        "decimal" => Primitive::Decimal(match json {
            Value::Number(number) => Decimal::from_str(&number.to_string()).ok()?,
            Value::String(raw) => Decimal::from_str(raw).ok()?,
            _ => return None,
        }),
        "string" | "xhtml" => Primitive::String(text()?),
        "markdown" => Primitive::Markdown(text()?),
        "uri" | "oid" | "uuid" => Primitive::Uri(text()?),
        "url" => Primitive::Url(text()?),
        "canonical" => Primitive::Canonical(text()?),
        "id" => Primitive::Id(text()?),
        "code" => Primitive::Code(CodeValue::new(text()?)),
        "date" => Primitive::Date(text()?),
        "dateTime" => Primitive::DateTime(text()?),
        "time" => Primitive::Time(text()?),
        "instant" => Primitive::Instant(text()?),
        "base64Binary" => Primitive::Base64Binary(text()?),
        _ => return None,
    })
}

/// Renders a typed value as FHIR JSON. Choice elements get their typed
/// key (`valueQuantity`), collections are always arrays and resources carry
/// `resourceType`.
pub fn value_to_json(value: &FhirValue, types: &dyn TypeDescriptorProvider) -> Value {
    match value {
        FhirValue::Primitive(primitive) => primitive_to_json(primitive),
        FhirValue::Reference(reference) => {
            let mut object = Map::new();
            insert_text(&mut object, "reference", reference.reference.as_deref());
            insert_text(&mut object, "type", reference.reference_type.as_deref());
            insert_text(&mut object, "display", reference.display.as_deref());
            Value::Object(object)
        }
        FhirValue::Extension(extension) => extension_to_json(extension, types),
        FhirValue::Composite(composite) => {
            let descriptor = types.describe(&composite.type_name);
            let mut object = Map::new();
            if descriptor.as_ref().is_some_and(|d| d.kind == TypeKind::Resource) {
                object.insert("resourceType".into(), Value::String(composite.type_name.clone()));
            }
            for name in composite.element_names() {
                let values = composite.get(name);
                let accessor = descriptor.as_ref().and_then(|d| d.element(name));
                match accessor {
                    Some(accessor) if accessor.is_choice() => {
                        for value in values {
                            object.insert(
                                format!("{}{}", name, type_suffix(value.type_name())),
                                value_to_json(value, types),
                            );
                        }
                    }
                    _ => {
                        let is_collection = accessor.map_or(values.len() > 1, |a| a.is_collection);
                        let rendered = if is_collection {
                            Value::Array(values.iter().map(|v| value_to_json(v, types)).collect())
                        } else {
                            match values.first() {
                                Some(single) => value_to_json(single, types),
                                None => continue,
                            }
                        };
                        object.insert(name.to_string(), rendered);
                    }
                }
            }
            Value::Object(object)
        }
    }
}

fn extension_to_json(extension: &ExtensionValue, types: &dyn TypeDescriptorProvider) -> Value {
    let mut object = Map::new();
    object.insert("url".into(), Value::String(extension.url.clone()));
    if let Some(value) = &extension.value {
        object.insert(
            format!("value{}", type_suffix(value.type_name())),
            value_to_json(value, types),
        );
    }
    if !extension.extension.is_empty() {
        object.insert(
            "extension".into(),
            Value::Array(
                extension
                    .extension
                    .iter()
                    .map(|nested| extension_to_json(nested, types))
                    .collect(),
            ),
        );
    }
    Value::Object(object)
}

fn primitive_to_json(primitive: &Primitive) -> Value {
    match primitive {
        Primitive::Boolean(flag) => Value::Bool(*flag),
        Primitive::Integer(number) => Value::Number((*number).into()),
        Primitive::Decimal(number) => {
            let text = number.to_string();
            match text.parse::<Number>() {
                Ok(parsed) => Value::Number(parsed),
                Err(_) => Value::String(text),
            }
        }
        Primitive::Code(code) => Value::String(code.code.clone()),
        other => Value::String(other.as_text().unwrap_or_default().to_string()),
    }
}

/// `dateTime` -> `DateTime`, `Quantity` unchanged.
fn type_suffix(type_code: &str) -> String {
    let mut chars = type_code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn insert_text(object: &mut Map<String, Value>, key: &str, text: Option<&str>) {
    if let Some(text) = text {
        object.insert(key.to_string(), Value::String(text.to_string()));
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}
