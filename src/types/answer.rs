//! Answer trees and answer templates.

use super::value::ReferenceValue;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRoot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire: Option<String>,
    #[serde(default, rename = "item", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<AnswerItem>,
}

/// A group or question of an answer tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerItem {
    pub link_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "answer", skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<Answer>,
    #[serde(default, rename = "item", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<AnswerItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub value: AnswerValue,
    #[serde(default, rename = "item", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<AnswerItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum AnswerValue {
    Boolean(bool),
    Decimal(Decimal),
    Integer(i64),
    Date(String),
    DateTime(String),
    Time(String),
    String(String),
    Uri(String),
    Coding(Coding),
    Attachment(Attachment),
    Reference(ReferenceValue),
    Quantity(Quantity),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Answer kind of a question, or `Group`/`Display` for structural items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Group,
    Display,
    Boolean,
    Decimal,
    Integer,
    Date,
    DateTime,
    Time,
    String,
    Text,
    Url,
    Choice,
    OpenChoice,
    Attachment,
    Reference,
    Quantity,
}

/// Shape of the answer tree an extraction should produce.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire: Option<String>,
    #[serde(default, rename = "item")]
    pub items: Vec<TemplateItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    pub link_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// `None` defers to the cardinality of the mapped element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeats: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial: Vec<AnswerValue>,
    #[serde(default, rename = "item", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<TemplateItem>,
}

impl AnswerRoot {
    pub fn new(items: Vec<AnswerItem>) -> Self {
        Self {
            questionnaire: None,
            items,
        }
    }
}

impl AnswerItem {
    pub fn group(link_id: impl Into<String>, items: Vec<AnswerItem>) -> Self {
        Self {
            link_id: link_id.into(),
            items,
            ..Default::default()
        }
    }

    pub fn question(link_id: impl Into<String>, values: Vec<AnswerValue>) -> Self {
        Self {
            link_id: link_id.into(),
            answers: values.into_iter().map(Answer::new).collect(),
            ..Default::default()
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_group(&self) -> bool {
        self.answers.is_empty()
    }

    /// Children reachable without crossing into another item: nested items
    /// first, then items nested under answers.
    pub fn nested_items(&self) -> impl Iterator<Item = &AnswerItem> {
        self.items
            .iter()
            .chain(self.answers.iter().flat_map(|answer| answer.items.iter()))
    }

    pub fn values(&self) -> impl Iterator<Item = &AnswerValue> {
        self.answers.iter().map(|answer| &answer.value)
    }
}

impl Answer {
    pub fn new(value: AnswerValue) -> Self {
        Self {
            value,
            items: Vec::new(),
        }
    }
}

impl AnswerValue {
    /// Question kind that naturally produces this value.
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Boolean(_) => ItemKind::Boolean,
            Self::Decimal(_) => ItemKind::Decimal,
            Self::Integer(_) => ItemKind::Integer,
            Self::Date(_) => ItemKind::Date,
            Self::DateTime(_) => ItemKind::DateTime,
            Self::Time(_) => ItemKind::Time,
            Self::String(_) => ItemKind::String,
            Self::Uri(_) => ItemKind::Url,
            Self::Coding(_) => ItemKind::Choice,
            Self::Attachment(_) => ItemKind::Attachment,
            Self::Reference(_) => ItemKind::Reference,
            Self::Quantity(_) => ItemKind::Quantity,
        }
    }
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

impl ItemKind {
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Group | Self::Display)
    }
}

impl AnswerTemplate {
    /// Derives a template from an answer tree.
    ///
    /// Siblings sharing a linkId merge into one repeating item whose children
    /// are the union of theirs. Question kinds come from the first answer
    /// value; items without answers become groups.
    pub fn from_response(root: &AnswerRoot) -> Self {
        Self {
            questionnaire: root.questionnaire.clone(),
            items: merge_items(root.items.iter().collect()),
        }
    }

    /// Depth-first search by linkId.
    pub fn find(&self, link_id: &str) -> Option<&TemplateItem> {
        fn search<'a>(items: &'a [TemplateItem], link_id: &str) -> Option<&'a TemplateItem> {
            items.iter().find_map(|item| {
                if item.link_id == link_id {
                    Some(item)
                } else {
                    search(&item.items, link_id)
                }
            })
        }
        search(&self.items, link_id)
    }
}

impl TemplateItem {
    pub fn new(link_id: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            link_id: link_id.into(),
            definition: None,
            text: None,
            kind,
            repeats: None,
            initial: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_repeats(mut self, repeats: bool) -> Self {
        self.repeats = Some(repeats);
        self
    }

    pub fn with_initial(mut self, value: AnswerValue) -> Self {
        self.initial.push(value);
        self
    }

    pub fn with_items(mut self, items: Vec<TemplateItem>) -> Self {
        self.items = items;
        self
    }
}

fn merge_items(items: Vec<&AnswerItem>) -> Vec<TemplateItem> {
    let mut by_link_id: IndexMap<&str, Vec<&AnswerItem>> = IndexMap::new();
    for item in items {
        by_link_id.entry(item.link_id.as_str()).or_default().push(item);
    }

    by_link_id
        .into_iter()
        .map(|(link_id, occurrences)| {
            let first = occurrences[0];
            let kind = occurrences
                .iter()
                .flat_map(|item| item.values())
                .map(AnswerValue::kind)
                .next()
                .unwrap_or(ItemKind::Group);
            TemplateItem {
                link_id: link_id.to_string(),
                definition: first.definition.clone(),
                text: first.text.clone(),
                kind,
                repeats: (occurrences.len() > 1).then_some(true),
                initial: Vec::new(),
                items: merge_items(
                    occurrences
                        .iter()
                        .flat_map(|item| item.nested_items())
                        .collect(),
                ),
            }
        })
        .collect()
}
