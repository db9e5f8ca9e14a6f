//! Instance values.
//!
//! Resource instances are trees of [`FhirValue`]s. The variant is the
//! discriminant callers match on; composites keep their elements in
//! declaration order.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FhirValue {
    Primitive(Primitive),
    Composite(Composite),
    Reference(ReferenceValue),
    Extension(ExtensionValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Markdown(String),
    Uri(String),
    Url(String),
    Canonical(String),
    Id(String),
    Code(CodeValue),
    Date(String),
    DateTime(String),
    Time(String),
    Instant(String),
    Base64Binary(String),
}

/// A `code` primitive, optionally remembering the system it was bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeValue {
    pub code: String,
    pub system: Option<String>,
}

/// An instance of a complex data type, backbone element or resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composite {
    pub type_name: String,
    elements: IndexMap<String, Vec<FhirValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtensionValue {
    pub url: String,
    pub value: Option<Box<FhirValue>>,
    pub extension: Vec<ExtensionValue>,
}

impl FhirValue {
    pub fn boolean(value: bool) -> Self {
        Self::Primitive(Primitive::Boolean(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::Primitive(Primitive::Integer(value))
    }

    pub fn decimal(value: Decimal) -> Self {
        Self::Primitive(Primitive::Decimal(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Primitive(Primitive::String(value.into()))
    }

    pub fn uri(value: impl Into<String>) -> Self {
        Self::Primitive(Primitive::Uri(value.into()))
    }

    pub fn code(code: impl Into<String>) -> Self {
        Self::Primitive(Primitive::Code(CodeValue::new(code)))
    }

    pub fn code_with_system(code: impl Into<String>, system: impl Into<String>) -> Self {
        Self::Primitive(Primitive::Code(CodeValue::new(code).with_system(system)))
    }

    pub fn date(value: impl Into<String>) -> Self {
        Self::Primitive(Primitive::Date(value.into()))
    }

    pub fn date_time(value: impl Into<String>) -> Self {
        Self::Primitive(Primitive::DateTime(value.into()))
    }

    pub fn reference(reference: impl Into<String>) -> Self {
        Self::Reference(ReferenceValue {
            reference: Some(reference.into()),
            ..Default::default()
        })
    }

    /// FHIR type code of the value.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Primitive(p) => p.type_code(),
            Self::Composite(c) => &c.type_name,
            Self::Reference(_) => "Reference",
            Self::Extension(_) => "Extension",
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Self::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Self::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut Composite> {
        match self {
            Self::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// True when the value carries no data a reader could observe.
    ///
    /// An extension whose only content is its url counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Primitive(_) => false,
            Self::Composite(c) => c.is_empty(),
            Self::Reference(r) => {
                r.reference.is_none() && r.reference_type.is_none() && r.display.is_none()
            }
            Self::Extension(e) => e.is_empty(),
        }
    }

    /// Exact equality, except that a code without a system matches the same
    /// code carrying one.
    pub fn matches_fixed(&self, fixed: &FhirValue) -> bool {
        match (self, fixed) {
            (Self::Primitive(Primitive::Code(actual)), Self::Primitive(Primitive::Code(expected))) => {
                actual.code == expected.code
                    && (expected.system.is_none() || expected.system == actual.system)
            }
            (Self::Composite(actual), Self::Composite(expected)) => {
                actual.type_name == expected.type_name
                    && actual.elements.len() == expected.elements.len()
                    && expected.elements.iter().all(|(name, expected_values)| {
                        let actual_values = actual.get(name);
                        actual_values.len() == expected_values.len()
                            && actual_values
                                .iter()
                                .zip(expected_values)
                                .all(|(a, e)| a.matches_fixed(e))
                    })
            }
            _ => self == fixed,
        }
    }

    /// Pattern semantics: every element present in the pattern must be
    /// matched by some element of this value; extra content is allowed.
    pub fn matches_pattern(&self, pattern: &FhirValue) -> bool {
        match (self, pattern) {
            (Self::Composite(actual), Self::Composite(expected)) => {
                actual.type_name == expected.type_name
                    && expected.elements.iter().all(|(name, expected_values)| {
                        let actual_values = actual.get(name);
                        expected_values
                            .iter()
                            .all(|e| actual_values.iter().any(|a| a.matches_pattern(e)))
                    })
            }
            (Self::Reference(actual), Self::Reference(expected)) => {
                fn field_matches(actual: &Option<String>, expected: &Option<String>) -> bool {
                    expected.is_none() || actual == expected
                }
                field_matches(&actual.reference, &expected.reference)
                    && field_matches(&actual.reference_type, &expected.reference_type)
                    && field_matches(&actual.display, &expected.display)
            }
            (Self::Extension(actual), Self::Extension(expected)) => {
                actual.url == expected.url
                    && match (&actual.value, &expected.value) {
                        (_, None) => true,
                        (Some(a), Some(e)) => a.matches_pattern(e),
                        (None, Some(_)) => false,
                    }
            }
            _ => self.matches_fixed(pattern),
        }
    }
}

impl fmt::Display for FhirValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => match p.as_text() {
                Some(text) => write!(f, "{text}"),
                None => match p {
                    Primitive::Boolean(b) => write!(f, "{b}"),
                    Primitive::Integer(i) => write!(f, "{i}"),
                    Primitive::Decimal(d) => write!(f, "{d}"),
                    _ => write!(f, "{p:?}"),
                },
            },
            Self::Composite(c) => write!(f, "{}({} elements)", c.type_name, c.elements.len()),
            Self::Reference(r) => match (&r.reference, &r.display) {
                (Some(reference), Some(display)) => write!(f, "{reference} \"{display}\""),
                (Some(reference), None) => write!(f, "{reference}"),
                (None, Some(display)) => write!(f, "\"{display}\""),
                (None, None) => write!(f, "Reference()"),
            },
            Self::Extension(e) => write!(f, "Extension({})", e.url),
        }
    }
}

impl Primitive {
    pub fn type_code(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Markdown(_) => "markdown",
            Self::Uri(_) => "uri",
            Self::Url(_) => "url",
            Self::Canonical(_) => "canonical",
            Self::Id(_) => "id",
            Self::Code(_) => "code",
            Self::Date(_) => "date",
            Self::DateTime(_) => "dateTime",
            Self::Time(_) => "time",
            Self::Instant(_) => "instant",
            Self::Base64Binary(_) => "base64Binary",
        }
    }

    /// Textual content of string-shaped primitives.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s)
            | Self::Markdown(s)
            | Self::Uri(s)
            | Self::Url(s)
            | Self::Canonical(s)
            | Self::Id(s)
            | Self::Date(s)
            | Self::DateTime(s)
            | Self::Time(s)
            | Self::Instant(s)
            | Self::Base64Binary(s) => Some(s),
            Self::Code(c) => Some(&c.code),
            Self::Boolean(_) | Self::Integer(_) | Self::Decimal(_) => None,
        }
    }
}

impl CodeValue {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            system: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

impl Composite {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            elements: IndexMap::new(),
        }
    }

    /// Builder-style single value assignment.
    pub fn with(mut self, name: impl Into<String>, value: FhirValue) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> &[FhirValue] {
        self.elements.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&FhirValue> {
        self.get(name).first()
    }

    /// Replaces the values of an element; an empty list removes it.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<FhirValue>) {
        let name = name.into();
        if values.is_empty() {
            self.elements.shift_remove(&name);
        } else {
            self.elements.insert(name, values);
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: FhirValue) {
        self.elements.entry(name.into()).or_default().push(value);
    }

    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.values().all(|values| values.iter().all(FhirValue::is_empty))
    }
}

impl From<Composite> for FhirValue {
    fn from(value: Composite) -> Self {
        Self::Composite(value)
    }
}

impl From<Primitive> for FhirValue {
    fn from(value: Primitive) -> Self {
        Self::Primitive(value)
    }
}

impl From<ReferenceValue> for FhirValue {
    fn from(value: ReferenceValue) -> Self {
        Self::Reference(value)
    }
}

impl From<ExtensionValue> for FhirValue {
    fn from(value: ExtensionValue) -> Self {
        Self::Extension(value)
    }
}

impl TryFrom<FhirValue> for Composite {
    type Error = FhirValue;

    fn try_from(value: FhirValue) -> std::result::Result<Self, Self::Error> {
        match value {
            FhirValue::Composite(c) => Ok(c),
            other => Err(other),
        }
    }
}

impl ExtensionValue {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: FhirValue) -> Self {
        self.value = Some(Box::new(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.value.as_deref().is_none_or(FhirValue::is_empty)
            && self.extension.iter().all(ExtensionValue::is_empty)
    }
}
