use super::{IssueKind, IssueSeverity, ValidationIssue, ValidationOutcome};
use crate::error::{MappingError, Result};
use crate::mapping::coercion::storage_type;
use crate::mapping::matches_slice;
use crate::path::{CompiledInvariant, CompiledPath, PathEvaluator};
use crate::types::descriptor::TypeDescriptorProvider;
use crate::types::element::{Invariant, InvariantSeverity};
use crate::types::schema::SchemaNode;
use crate::types::value::FhirValue;
use papaya::HashMap as PapayaMap;
use std::sync::Arc;

/// Walks a schema tree against an instance and collects structural issues.
///
/// Compiled paths and invariants are memoised per expression. An invariant
/// that does not compile is logged once and never evaluated.
pub struct ValidationWalker {
    evaluator: Arc<dyn PathEvaluator>,
    types: Arc<dyn TypeDescriptorProvider>,
    paths: PapayaMap<String, CompiledPath>,
    invariants: PapayaMap<String, Option<CompiledInvariant>>,
}

impl ValidationWalker {
    pub fn new(evaluator: Arc<dyn PathEvaluator>, types: Arc<dyn TypeDescriptorProvider>) -> Self {
        Self {
            evaluator,
            types,
            paths: PapayaMap::new(),
            invariants: PapayaMap::new(),
        }
    }

    /// Validates `instance` against the tree rooted at `schema`.
    ///
    /// Content problems become issues. Only a node without an accessor, or a
    /// select expression the evaluator rejects, is an error.
    pub fn validate(&self, schema: &SchemaNode, instance: &FhirValue) -> Result<ValidationOutcome> {
        let mut outcome = ValidationOutcome::new();
        self.check(schema, vec![instance.clone()], &mut outcome);
        for child in &schema.children {
            self.walk(child, instance, instance, &mut outcome)?;
        }
        tracing::debug!(
            "Validated {} against {}: {} error(s), {} warning(s)",
            instance.type_name(),
            schema.profile.as_deref().unwrap_or(&schema.path),
            outcome.error_count(),
            outcome.warning_count()
        );
        Ok(outcome)
    }

    fn walk(
        &self,
        node: &SchemaNode,
        local: &FhirValue,
        root: &FhirValue,
        outcome: &mut ValidationOutcome,
    ) -> Result<()> {
        let candidates = self.candidates(node, local, root)?;
        self.check(node, candidates.clone(), outcome);
        for candidate in &candidates {
            for child in &node.children {
                self.walk(child, candidate, root, outcome)?;
            }
        }
        Ok(())
    }

    fn candidates(&self, node: &SchemaNode, local: &FhirValue, root: &FhirValue) -> Result<Vec<FhirValue>> {
        let expression = node
            .select_expression()
            .ok_or_else(|| MappingError::missing_accessor(local.type_name(), &node.local_name))?;
        let path = self.compiled_path(expression)?;
        let is_choice = node.accessor.as_ref().is_some_and(|accessor| accessor.is_choice());
        let expected = storage_type(&node.type_code);

        Ok(path
            .evaluate(local, root)
            .filter(|value| !is_choice || value.type_name() == expected)
            .filter(|value| matches_slice(node, value, self.types.as_ref()))
            .collect())
    }

    fn check(&self, node: &SchemaNode, candidates: Vec<FhirValue>, outcome: &mut ValidationOutcome) {
        let constraint = &node.constraint;
        let count = candidates.len();
        if count < constraint.min as usize {
            outcome.push(ValidationIssue::error(
                &node.path,
                IssueKind::MissingRequired,
                cardinality_detail(node, count),
            ));
        } else if !constraint.max.allows(count) {
            outcome.push(ValidationIssue::error(
                &node.path,
                IssueKind::TooMany,
                cardinality_detail(node, count),
            ));
        }

        if constraint.fixed.is_some() {
            let fixed = node.materialized_fixed().or_else(|| constraint.fixed.clone());
            if let Some(fixed) = fixed {
                for candidate in candidates.iter().filter(|c| !c.matches_fixed(&fixed)) {
                    outcome.push(ValidationIssue::error(
                        &node.path,
                        IssueKind::FixedValueMismatch,
                        format!("Value {} does not match fixed value {}", candidate, fixed),
                    ));
                }
            }
        }

        for invariant in &constraint.invariants {
            let Some(compiled) = self.compiled_invariant(invariant) else {
                continue;
            };
            for candidate in &candidates {
                if !compiled.holds(candidate) {
                    outcome.push(invariant_issue(node, invariant));
                }
            }
        }
    }

    fn compiled_path(&self, expression: &str) -> Result<CompiledPath> {
        let paths = self.paths.pin();
        if let Some(path) = paths.get(expression) {
            return Ok(path.clone());
        }
        let compiled = self.evaluator.compile_path(expression)?;
        Ok(paths.get_or_insert(expression.to_string(), compiled).clone())
    }

    fn compiled_invariant(&self, invariant: &Invariant) -> Option<CompiledInvariant> {
        let expression = invariant.expression.as_deref()?;
        let invariants = self.invariants.pin();
        if let Some(compiled) = invariants.get(expression) {
            return compiled.clone();
        }
        let compiled = match self.evaluator.compile_invariant(expression) {
            Ok(compiled) => Some(compiled),
            Err(error) => {
                tracing::warn!("Skipping invariant {}: {}", invariant.key, error);
                None
            }
        };
        invariants.get_or_insert(expression.to_string(), compiled).clone()
    }
}

fn cardinality_detail(node: &SchemaNode, count: usize) -> String {
    format!(
        "Element '{}' has cardinality {}..{}, but found {} occurrence(s)",
        node.path, node.constraint.min, node.constraint.max, count
    )
}

fn invariant_issue(node: &SchemaNode, invariant: &Invariant) -> ValidationIssue {
    let severity = match invariant.severity {
        InvariantSeverity::Error => IssueSeverity::Error,
        InvariantSeverity::Warning => IssueSeverity::Warning,
    };
    let detail = if invariant.human.is_empty() {
        format!("Invariant {} failed", invariant.key)
    } else {
        invariant.human.clone()
    };
    ValidationIssue {
        severity,
        ..ValidationIssue::error(&node.path, IssueKind::InvariantViolation, detail)
    }
    .with_invariant_key(&invariant.key)
}
