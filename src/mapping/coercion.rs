//! Value coercion tables between answer values and instance values.
//!
//! Every accepted conversion is listed here; anything not listed yields
//! `None` and the caller leaves the position empty.

use crate::types::answer::{AnswerValue, Attachment, Coding, ItemKind, Quantity};
use crate::types::value::{CodeValue, Composite, FhirValue, Primitive};
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

static PARTIAL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").expect("partial date regex must compile")
});

static DATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}(-\d{2}(-\d{2})?)?)(T|$)").expect("date prefix regex must compile")
});

/// Source value types each question kind accepts.
const ACCEPTED_SOURCES: &[(ItemKind, &[&str])] = &[
    (ItemKind::Boolean, &["boolean"]),
    (ItemKind::Decimal, &["decimal", "integer"]),
    (ItemKind::Integer, &["integer"]),
    (ItemKind::Date, &["date", "dateTime", "instant"]),
    (ItemKind::DateTime, &["dateTime", "date", "instant"]),
    (ItemKind::Time, &["time"]),
    (ItemKind::String, &["string", "markdown", "id", "code"]),
    (ItemKind::Text, &["string", "markdown"]),
    (ItemKind::Url, &["uri", "url", "canonical"]),
    (ItemKind::Choice, &["Coding", "CodeableConcept", "code"]),
    (ItemKind::OpenChoice, &["Coding", "CodeableConcept", "code", "string"]),
    (ItemKind::Attachment, &["Attachment"]),
    (ItemKind::Reference, &["Reference"]),
    (ItemKind::Quantity, &["Quantity"]),
];

/// Whether a question of `kind` can be answered from a value of `source_type`.
pub fn accepts(kind: ItemKind, source_type: &str) -> bool {
    ACCEPTED_SOURCES
        .iter()
        .find(|(accepted_kind, _)| *accepted_kind == kind)
        .is_some_and(|(_, sources)| sources.contains(&source_type))
}

/// Type code a value of `type_code` is stored as.
pub(crate) fn storage_type(type_code: &str) -> &str {
    match type_code {
        "positiveInt" | "unsignedInt" => "integer",
        "oid" | "uuid" => "uri",
        "xhtml" => "string",
        other => other,
    }
}

/// Converts an instance value to another element type.
pub fn convert_data(value: &FhirValue, target_type: &str) -> Option<FhirValue> {
    let target = storage_type(target_type);
    let source = value.type_name();
    if source == target {
        return Some(value.clone());
    }

    match value {
        FhirValue::Primitive(primitive) => convert_primitive(primitive, target),
        FhirValue::Composite(composite) => match (source, target) {
            ("Coding", "CodeableConcept") => Some(codeable_concept(value.clone())),
            ("Coding", "code") => {
                let (system, code, _) = coding_parts(composite);
                let mut code = CodeValue::new(code?);
                code.system = system;
                Some(FhirValue::Primitive(Primitive::Code(code)))
            }
            ("Coding", "string") => {
                let (_, code, _) = coding_parts(composite);
                Some(FhirValue::string(code?))
            }
            ("CodeableConcept", "Coding" | "code" | "string") => {
                convert_data(composite.first("coding")?, target)
            }
            _ => None,
        },
        FhirValue::Reference(_) | FhirValue::Extension(_) => None,
    }
}

fn convert_primitive(primitive: &Primitive, target: &str) -> Option<FhirValue> {
    let converted = match (primitive, target) {
        (Primitive::Integer(value), "decimal") => Primitive::Decimal(Decimal::from(*value)),
        (Primitive::Date(value), "dateTime") => Primitive::DateTime(value.clone()),
        (Primitive::DateTime(value) | Primitive::Instant(value), "date") => {
            Primitive::Date(truncate_to_date(value)?)
        }
        (Primitive::Instant(value), "dateTime") => Primitive::DateTime(value.clone()),
        (Primitive::String(value), "id") => Primitive::Id(value.clone()),
        (Primitive::String(value), "code") => Primitive::Code(CodeValue::new(value.clone())),
        (Primitive::String(value), "markdown") => Primitive::Markdown(value.clone()),
        (
            Primitive::Code(_) | Primitive::Id(_) | Primitive::Markdown(_) | Primitive::Uri(_),
            "string",
        ) => Primitive::String(primitive.as_text()?.to_string()),
        (Primitive::Uri(value), "url") => Primitive::Url(value.clone()),
        (Primitive::Uri(value), "canonical") => Primitive::Canonical(value.clone()),
        (Primitive::Url(value) | Primitive::Canonical(value), "uri") => Primitive::Uri(value.clone()),
        (Primitive::Code(code), "Coding") => return Some(coding(code.system.clone(), Some(code.code.clone()), None)),
        (Primitive::Code(code), "CodeableConcept") => {
            return Some(codeable_concept(coding(code.system.clone(), Some(code.code.clone()), None)));
        }
        _ => return None,
    };
    Some(FhirValue::Primitive(converted))
}

/// Date part of a dateTime or instant; partial dates pass through.
fn truncate_to_date(value: &str) -> Option<String> {
    if PARTIAL_DATE.is_match(value) {
        return Some(value.to_string());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.date_naive().to_string());
    }
    DATE_PREFIX
        .captures(value)
        .and_then(|captures| captures.get(1))
        .map(|date| date.as_str().to_string())
}

/// Converts an answer value into an element of type `target_type`.
pub fn answer_to_data(answer: &AnswerValue, target_type: &str) -> Option<FhirValue> {
    convert_data(&answer_native(answer), target_type)
}

/// The instance value an answer naturally denotes.
fn answer_native(answer: &AnswerValue) -> FhirValue {
    match answer {
        AnswerValue::Boolean(value) => FhirValue::boolean(*value),
        AnswerValue::Decimal(value) => FhirValue::decimal(*value),
        AnswerValue::Integer(value) => FhirValue::integer(*value),
        AnswerValue::Date(value) => FhirValue::date(value.clone()),
        AnswerValue::DateTime(value) => FhirValue::date_time(value.clone()),
        AnswerValue::Time(value) => FhirValue::Primitive(Primitive::Time(value.clone())),
        AnswerValue::String(value) => FhirValue::string(value.clone()),
        AnswerValue::Uri(value) => FhirValue::uri(value.clone()),
        AnswerValue::Coding(value) => coding(value.system.clone(), value.code.clone(), value.display.clone()),
        AnswerValue::Attachment(value) => {
            let mut attachment = Composite::new("Attachment");
            if let Some(content_type) = &value.content_type {
                attachment.push("contentType", FhirValue::code(content_type.clone()));
            }
            if let Some(url) = &value.url {
                attachment.push("url", FhirValue::Primitive(Primitive::Url(url.clone())));
            }
            if let Some(title) = &value.title {
                attachment.push("title", FhirValue::string(title.clone()));
            }
            FhirValue::Composite(attachment)
        }
        AnswerValue::Reference(value) => FhirValue::Reference(value.clone()),
        AnswerValue::Quantity(value) => {
            let mut quantity = Composite::new("Quantity");
            if let Some(amount) = value.value {
                quantity.push("value", FhirValue::decimal(amount));
            }
            if let Some(unit) = &value.unit {
                quantity.push("unit", FhirValue::string(unit.clone()));
            }
            if let Some(system) = &value.system {
                quantity.push("system", FhirValue::uri(system.clone()));
            }
            if let Some(code) = &value.code {
                quantity.push("code", FhirValue::code(code.clone()));
            }
            FhirValue::Composite(quantity)
        }
    }
}

/// Reads an answer of `kind` from an instance value.
///
/// A code carrying its system answers a choice question as a Coding with
/// that system and code.
pub fn data_to_answer(value: &FhirValue, kind: ItemKind) -> Option<AnswerValue> {
    let source = value.type_name();
    if !accepts(kind, source) {
        tracing::trace!("{} cannot answer a {:?} question", source, kind);
        return None;
    }

    match kind {
        ItemKind::Boolean => match value.as_primitive()? {
            Primitive::Boolean(flag) => Some(AnswerValue::Boolean(*flag)),
            _ => None,
        },
        ItemKind::Decimal => match convert_data(value, "decimal")?.as_primitive()? {
            Primitive::Decimal(amount) => Some(AnswerValue::Decimal(*amount)),
            _ => None,
        },
        ItemKind::Integer => match value.as_primitive()? {
            Primitive::Integer(number) => Some(AnswerValue::Integer(*number)),
            _ => None,
        },
        ItemKind::Date => text_of(&convert_data(value, "date")?).map(AnswerValue::Date),
        ItemKind::DateTime => text_of(&convert_data(value, "dateTime")?).map(AnswerValue::DateTime),
        ItemKind::Time => text_of(value).map(AnswerValue::Time),
        ItemKind::String | ItemKind::Text => text_of(value).map(AnswerValue::String),
        ItemKind::Url => text_of(value).map(AnswerValue::Uri),
        ItemKind::OpenChoice if source == "string" => text_of(value).map(AnswerValue::String),
        ItemKind::Choice | ItemKind::OpenChoice => {
            let coding = convert_data(value, "Coding")?;
            let (system, code, display) = coding_parts(coding.as_composite()?);
            Some(AnswerValue::Coding(Coding { system, code, display }))
        }
        ItemKind::Attachment => {
            let attachment = value.as_composite()?;
            Some(AnswerValue::Attachment(Attachment {
                content_type: first_text(attachment, "contentType"),
                url: first_text(attachment, "url"),
                title: first_text(attachment, "title"),
            }))
        }
        ItemKind::Reference => match value {
            FhirValue::Reference(reference) => Some(AnswerValue::Reference(reference.clone())),
            _ => None,
        },
        ItemKind::Quantity => {
            let quantity = value.as_composite()?;
            let amount = match quantity.first("value").and_then(FhirValue::as_primitive) {
                Some(Primitive::Decimal(amount)) => Some(*amount),
                Some(Primitive::Integer(number)) => Some(Decimal::from(*number)),
                _ => None,
            };
            Some(AnswerValue::Quantity(Quantity {
                value: amount,
                unit: first_text(quantity, "unit"),
                system: first_text(quantity, "system"),
                code: first_text(quantity, "code"),
            }))
        }
        ItemKind::Group | ItemKind::Display => None,
    }
}

fn coding(system: Option<String>, code: Option<String>, display: Option<String>) -> FhirValue {
    let mut coding = Composite::new("Coding");
    if let Some(system) = system {
        coding.push("system", FhirValue::uri(system));
    }
    if let Some(code) = code {
        coding.push("code", FhirValue::code(code));
    }
    if let Some(display) = display {
        coding.push("display", FhirValue::string(display));
    }
    FhirValue::Composite(coding)
}

fn codeable_concept(coding: FhirValue) -> FhirValue {
    FhirValue::Composite(Composite::new("CodeableConcept").with("coding", coding))
}

fn coding_parts(coding: &Composite) -> (Option<String>, Option<String>, Option<String>) {
    (
        first_text(coding, "system"),
        first_text(coding, "code"),
        first_text(coding, "display"),
    )
}

fn first_text(composite: &Composite, name: &str) -> Option<String> {
    composite
        .first(name)
        .and_then(FhirValue::as_primitive)
        .and_then(Primitive::as_text)
        .map(str::to_string)
}

fn text_of(value: &FhirValue) -> Option<String> {
    value.as_primitive()?.as_text().map(str::to_string)
}
