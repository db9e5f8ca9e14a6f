//! Answer Extractor: a typed instance to an answer tree shaped by a template.
//!
//! Owns the data-to-answer direction. Each item resolves its own context;
//! repeating groups fan out per value, and unanswered questions fall back to
//! `initial` or are dropped.

use super::coercion::data_to_answer;
use super::context::{Context, ContextResolver, ResolveOutcome};
use crate::error::Result;
use crate::types::answer::{Answer, AnswerItem, AnswerRoot, AnswerTemplate, ItemKind, TemplateItem};
use crate::types::value::FhirValue;

/// Walks an answer template, resolving each item against the instance.
///
/// Groups fan out into one group per resolved value, or a single shell when
/// nothing resolved. Questions read their answers through the coercion
/// table, fall back to initial and default values, and are left out when
/// nothing remains.
pub struct AnswerExtractor<'b> {
    resolver: ContextResolver<'b>,
}

impl<'b> AnswerExtractor<'b> {
    pub fn new(resolver: ContextResolver<'b>) -> Self {
        Self { resolver }
    }

    pub fn extract(&self, context: &Context<'_>, template: &AnswerTemplate) -> Result<AnswerRoot> {
        Ok(AnswerRoot {
            questionnaire: template.questionnaire.clone(),
            items: self.extract_items(&template.items, context)?,
        })
    }

    fn extract_items(&self, items: &[TemplateItem], context: &Context<'_>) -> Result<Vec<AnswerItem>> {
        let mut extracted = Vec::new();
        for item in items {
            match item.kind {
                ItemKind::Display => {}
                ItemKind::Group => extracted.extend(self.extract_group(item, context)?),
                _ => extracted.extend(self.extract_question(item, context)?),
            }
        }
        Ok(extracted)
    }

    fn extract_group(&self, item: &TemplateItem, context: &Context<'_>) -> Result<Vec<AnswerItem>> {
        let (resolved, outcome) = self.resolver.resolve_with_outcome(item, context)?;
        let scopes = match outcome {
            ResolveOutcome::Switched | ResolveOutcome::Narrowed => {
                let single = match item.repeats {
                    Some(repeats) => !repeats,
                    None => !resolved.node().allows_many(),
                };
                let mut values = resolved.values.clone();
                if single {
                    values.truncate(1);
                }
                values
                    .into_iter()
                    .map(|value| resolved.with_values(vec![value]))
                    .collect()
            }
            ResolveOutcome::Empty | ResolveOutcome::PassThrough => vec![resolved],
        };

        scopes
            .iter()
            .map(|scope| {
                Ok(AnswerItem {
                    items: self.extract_items(&item.items, scope)?,
                    ..shell(item)
                })
            })
            .collect()
    }

    fn extract_question(&self, item: &TemplateItem, context: &Context<'_>) -> Result<Option<AnswerItem>> {
        let (resolved, outcome) = self.resolver.resolve_with_outcome(item, context)?;
        let mapped = matches!(
            outcome,
            ResolveOutcome::Switched | ResolveOutcome::Narrowed | ResolveOutcome::Empty
        );
        let repeats = match item.repeats {
            Some(repeats) => repeats,
            None => mapped && resolved.node().allows_many(),
        };

        let mut sources: Vec<(Option<FhirValue>, Answer)> = Vec::new();
        if mapped {
            for value in &resolved.values {
                if let Some(answer) = data_to_answer(value, item.kind) {
                    sources.push((Some(value.clone()), Answer::new(answer)));
                }
            }
        }
        if sources.is_empty() {
            sources = item
                .initial
                .iter()
                .cloned()
                .map(|initial| (None, Answer::new(initial)))
                .collect();
        }
        if sources.is_empty() && mapped {
            let fallback = resolved
                .node()
                .constraint
                .default_value
                .as_ref()
                .and_then(|default| data_to_answer(default, item.kind));
            sources.extend(fallback.map(|answer| (None, Answer::new(answer))));
        }
        if !repeats {
            sources.truncate(1);
        }
        if sources.is_empty() {
            return Ok(None);
        }

        let mut answers = Vec::with_capacity(sources.len());
        for (source, mut answer) in sources {
            if !item.items.is_empty() {
                let scope = match source {
                    Some(value) => resolved.with_values(vec![value]),
                    None => resolved.with_values(Vec::new()),
                };
                answer.items = self.extract_items(&item.items, &scope)?;
            }
            answers.push(answer);
        }
        Ok(Some(AnswerItem {
            answers,
            ..shell(item)
        }))
    }
}

fn shell(item: &TemplateItem) -> AnswerItem {
    AnswerItem {
        link_id: item.link_id.clone(),
        definition: item.definition.clone(),
        text: item.text.clone(),
        answers: Vec::new(),
        items: Vec::new(),
    }
}
