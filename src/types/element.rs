//! Snapshot element constraints, deserialisable from StructureDefinition
//! `snapshot.element` entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::Max;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<ElementType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slicing: Option<Slicing>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraint: Vec<Invariant>,
    /// Remaining keys, where `fixed[x]`, `pattern[x]` and `defaultValue[x]`
    /// live under their type-suffixed names.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementType {
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_profile: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slicing {
    #[serde(default)]
    pub discriminator: Vec<Discriminator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,
    #[serde(default)]
    pub rules: SlicingRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discriminator {
    #[serde(rename = "type")]
    pub kind: DiscriminatorType,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorType {
    Value,
    Exists,
    Pattern,
    Type,
    Profile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlicingRules {
    Closed,
    #[default]
    Open,
    OpenAtEnd,
}

/// A declared invariant (`ElementDefinition.constraint`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    pub key: String,
    #[serde(default)]
    pub severity: InvariantSeverity,
    #[serde(default)]
    pub human: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvariantSeverity {
    #[default]
    Error,
    Warning,
}

/// A type-suffixed literal such as `fixedUri` split into its parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypedLiteral<'a> {
    /// Suffix as written, e.g. `Uri`, `Reference`, `DateTime`.
    pub suffix: &'a str,
    pub value: &'a Value,
}

impl ElementConstraint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, code: impl Into<String>) -> Self {
        self.types.push(ElementType {
            code: code.into(),
            ..Default::default()
        });
        self
    }

    pub fn with_profiled_type(mut self, code: impl Into<String>, profile: impl Into<String>) -> Self {
        self.types.push(ElementType {
            code: code.into(),
            profile: vec![profile.into()],
            ..Default::default()
        });
        self
    }

    pub fn with_cardinality(mut self, min: u32, max: impl Into<String>) -> Self {
        self.min = Some(min);
        self.max = Some(max.into());
        self
    }

    pub fn with_slice_name(mut self, slice_name: impl Into<String>) -> Self {
        self.slice_name = Some(slice_name.into());
        self
    }

    pub fn with_slicing(mut self, slicing: Slicing) -> Self {
        self.slicing = Some(slicing);
        self
    }

    pub fn with_invariant(mut self, invariant: Invariant) -> Self {
        self.constraint.push(invariant);
        self
    }

    /// Adds a `fixed<Suffix>` literal, e.g. `with_fixed("Uri", json!("..."))`.
    pub fn with_fixed(mut self, suffix: &str, value: Value) -> Self {
        self.other.insert(format!("fixed{suffix}"), value);
        self
    }

    pub fn fixed(&self) -> Option<TypedLiteral<'_>> {
        self.literal("fixed")
    }

    pub fn pattern(&self) -> Option<TypedLiteral<'_>> {
        self.literal("pattern")
    }

    pub fn default_value(&self) -> Option<TypedLiteral<'_>> {
        self.literal("defaultValue")
    }

    fn literal(&self, prefix: &str) -> Option<TypedLiteral<'_>> {
        self.other.iter().find_map(|(key, value)| {
            key.strip_prefix(prefix)
                .filter(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
                .map(|suffix| TypedLiteral { suffix, value })
        })
    }

    pub fn primary_type(&self) -> Option<&ElementType> {
        self.types.first()
    }

    /// Last path segment, e.g. `value[x]` for `Observation.value[x]`.
    pub fn local_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }

    pub fn is_extension(&self) -> bool {
        matches!(self.local_name(), "extension" | "modifierExtension")
            || self.primary_type().is_some_and(|t| t.code == "Extension")
    }

    /// Profile URL of a mapped extension element.
    pub fn extension_profile(&self) -> Option<&str> {
        if !self.is_extension() {
            return None;
        }
        self.primary_type()
            .and_then(|t| t.profile.first())
            .map(String::as_str)
    }

    pub fn max_cardinality(&self) -> Max {
        self.max.as_deref().map(Max::parse).unwrap_or(Max::Unbounded)
    }
}

impl Discriminator {
    pub fn new(kind: DiscriminatorType, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl Invariant {
    pub fn new(key: impl Into<String>, human: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            severity: InvariantSeverity::Error,
            human: human.into(),
            expression: Some(expression.into()),
        }
    }

    pub fn warning(mut self) -> Self {
        self.severity = InvariantSeverity::Warning;
        self
    }
}
