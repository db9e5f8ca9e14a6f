//! Instance Populator: answers to a typed instance.
//!
//! Owns the answer-to-data direction, fixed values included. A container is
//! instantiated only when answers or a required fixed descendant call for it.

use super::coercion::answer_to_data;
use crate::error::{MappingError, Result};
use crate::types::answer::{AnswerItem, AnswerRoot};
use crate::types::schema::SchemaNode;
use crate::types::value::FhirValue;

/// Fills instances from answer trees whose linkIds are schema paths.
///
/// Groups whose linkId names a composite node become one container each;
/// questions become values converted into the node's type. Fixed values are
/// always written. Unconvertible answers are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstancePopulator;

impl InstancePopulator {
    pub fn new() -> Self {
        Self
    }

    pub fn populate(&self, schema: &SchemaNode, answers: &AnswerRoot) -> Result<FhirValue> {
        let mut instance = instantiate(schema)?;
        let scope: Vec<&AnswerItem> = answers.items.iter().collect();
        self.fill(schema, &mut instance, &scope)?;
        Ok(instance)
    }

    fn fill(&self, node: &SchemaNode, container: &mut FhirValue, scope: &[&AnswerItem]) -> Result<()> {
        for child in &node.children {
            let values = self.values_for(child, scope)?;
            if values.is_empty() {
                continue;
            }
            let accessor = child
                .accessor
                .as_ref()
                .ok_or_else(|| MappingError::missing_accessor(&node.type_code, &child.local_name))?;
            if !accessor.append(container, values) {
                return Err(MappingError::accessor_mismatch(&child.path, container.type_name()));
            }
        }
        Ok(())
    }

    fn values_for(&self, node: &SchemaNode, scope: &[&AnswerItem]) -> Result<Vec<FhirValue>> {
        if node.constraint.fixed.is_some() {
            return Ok(node.materialized_fixed().into_iter().collect());
        }

        let matching = collect_matching(scope, &node.path);
        let mut values = Vec::new();
        for item in &matching {
            if item.answers.is_empty() {
                if !node.is_leaf() {
                    let nested: Vec<&AnswerItem> = item.nested_items().collect();
                    values.push(self.container(node, &nested)?);
                }
                continue;
            }
            for answer in &item.answers {
                let Some(mut value) = answer_to_data(&answer.value, &node.type_code) else {
                    tracing::trace!("Answer to {} does not convert to {}", item.link_id, node.type_code);
                    continue;
                };
                if !answer.items.is_empty() && !node.is_leaf() {
                    let nested: Vec<&AnswerItem> = answer.items.iter().collect();
                    self.fill(node, &mut value, &nested)?;
                }
                values.push(value);
            }
        }

        if matching.is_empty() && !node.is_leaf() {
            if has_descendant_answers(scope, &node.path) {
                values.push(self.container(node, scope)?);
            } else if node.constraint.min > 0 && node.has_fixed_descendant() {
                values.push(self.container(node, &[])?);
            }
        }

        values.retain(|value| !value.is_empty());
        if !node.allows_many() {
            values.truncate(1);
        }
        Ok(values)
    }

    fn container(&self, node: &SchemaNode, scope: &[&AnswerItem]) -> Result<FhirValue> {
        let mut container = instantiate(node)?;
        self.fill(node, &mut container, scope)?;
        if let (FhirValue::Extension(extension), Some(profile)) =
            (&mut container, &node.constraint.extension_profile)
        {
            if extension.url.is_empty() && !extension.is_empty() {
                extension.url = profile.clone();
            }
        }
        Ok(container)
    }
}

fn instantiate(node: &SchemaNode) -> Result<FhirValue> {
    node.type_descriptor
        .as_ref()
        .and_then(|descriptor| descriptor.instantiate())
        .ok_or_else(|| MappingError::uninstantiable(&node.type_code))
}

/// Items whose linkId is `path`, searched through nested groups and items
/// nested under answers. A match is not searched further.
fn collect_matching<'a>(scope: &[&'a AnswerItem], path: &str) -> Vec<&'a AnswerItem> {
    let mut found = Vec::new();
    for item in scope {
        if item.link_id == path {
            found.push(*item);
        } else {
            let nested: Vec<&AnswerItem> = item.nested_items().collect();
            found.extend(collect_matching(&nested, path));
        }
    }
    found
}

/// Whether any item below `path` carries answers.
fn has_descendant_answers(scope: &[&AnswerItem], path: &str) -> bool {
    let prefix = format!("{path}.");
    scope.iter().any(|item| {
        (item.link_id.starts_with(&prefix) && !item.answers.is_empty())
            || item.nested_items().any(|nested| has_descendant_answers(&[nested], path))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_matching_looks_under_answers() {
        let mut question = AnswerItem::question(
            "Practitioner.active",
            vec![crate::types::answer::AnswerValue::Boolean(true)],
        );
        question.answers[0].items.push(AnswerItem::group("Practitioner.qualification", vec![]));
        let root = AnswerItem::group(
            "page",
            vec![question, AnswerItem::group("Practitioner.qualification", vec![])],
        );

        let scope = vec![&root];
        assert_eq!(collect_matching(&scope, "Practitioner.qualification").len(), 2);
        assert_eq!(collect_matching(&scope, "Practitioner.active").len(), 1);
        assert!(collect_matching(&scope, "Practitioner.name").is_empty());
    }

    #[test]
    fn test_descendant_answers() {
        let root = AnswerItem::group(
            "page",
            vec![AnswerItem::question(
                "Practitioner.name.text",
                vec![crate::types::answer::AnswerValue::String("Brian".into())],
            )],
        );
        assert!(has_descendant_answers(&[&root], "Practitioner.name"));
        assert!(!has_descendant_answers(&[&root], "Practitioner.identifier"));
    }
}
