use super::navigation::MemberPathEvaluator;
use super::{CompiledInvariant, CompiledPath, PathEvaluator};
use crate::error::{MappingError, Result};
use crate::types::descriptor::TypeDescriptorProvider;
use crate::types::literal::value_to_json;
use crate::types::value::FhirValue;
use octofhir_fhirpath::engine::FhirPathEngine;
use octofhir_fhirpath::model::FhirPathValue;
use octofhir_fhirpath::parser::parse_expression;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static ENGINE: RefCell<FhirPathEngine> = RefCell::new(FhirPathEngine::new());
}

/// Default evaluator: select expressions go through member navigation over
/// typed values, invariants through the FHIRPath engine over the candidate's
/// FHIR JSON.
#[derive(Clone)]
pub struct FhirPathEvaluator {
    members: MemberPathEvaluator,
    types: Arc<dyn TypeDescriptorProvider>,
}

impl FhirPathEvaluator {
    pub fn new(types: Arc<dyn TypeDescriptorProvider>) -> Self {
        Self {
            members: MemberPathEvaluator::new(Arc::clone(&types)),
            types,
        }
    }
}

impl PathEvaluator for FhirPathEvaluator {
    fn compile_path(&self, expression: &str) -> Result<CompiledPath> {
        self.members.compile_path(expression)
    }

    /// Syntax errors surface here. At evaluation time the invariant holds
    /// unless the engine yields a single `false`.
    fn compile_invariant(&self, expression: &str) -> Result<CompiledInvariant> {
        parse_expression(expression)
            .map_err(|error| MappingError::invalid_expression(expression, error.to_string()))?;

        let types = Arc::clone(&self.types);
        let source = expression.to_string();
        Ok(CompiledInvariant::new(
            expression,
            Arc::new(move |candidate: &FhirValue| {
                let input = value_to_json(candidate, types.as_ref());
                let result = ENGINE.with(|engine| {
                    let mut engine = engine.borrow_mut();
                    futures::executor::block_on(engine.evaluate(&source, input))
                });
                match result {
                    Ok(value) => verdict(&value),
                    Err(error) => {
                        tracing::warn!("Invariant '{}' failed to evaluate: {}", source, error);
                        true
                    }
                }
            }),
        ))
    }
}

/// Empty and non-boolean results hold.
fn verdict(result: &FhirPathValue) -> bool {
    if result.len() != 1 {
        return true;
    }
    !matches!(result.first(), Some(FhirPathValue::Boolean(false)))
}

impl std::fmt::Debug for FhirPathEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FhirPathEvaluator").finish_non_exhaustive()
    }
}
