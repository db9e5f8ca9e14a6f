//! Path evaluation over instance values.
//!
//! The mapper compiles each expression once and evaluates the compiled form
//! against many values. [`FhirPathEvaluator`] is the built-in evaluator:
//! select expressions walk members with [`MemberPathEvaluator`], invariants
//! run on the FHIRPath engine. Anything implementing [`PathEvaluator`] can
//! replace it.

mod fhirpath;
mod navigation;

pub use fhirpath::FhirPathEvaluator;
pub use navigation::MemberPathEvaluator;
pub(crate) use navigation::children as member_values;

use crate::error::Result;
use crate::types::value::FhirValue;
use std::fmt;
use std::sync::Arc;

pub type Matches = Box<dyn Iterator<Item = FhirValue>>;

pub type PathFn = Arc<dyn Fn(&FhirValue, &FhirValue) -> Matches + Send + Sync>;

pub type PredicateFn = Arc<dyn Fn(&FhirValue) -> bool + Send + Sync>;

/// Compiles path and invariant expressions.
pub trait PathEvaluator: Send + Sync {
    fn compile_path(&self, expression: &str) -> Result<CompiledPath>;

    fn compile_invariant(&self, expression: &str) -> Result<CompiledInvariant>;
}

/// A relative path, evaluated against a (local, root) pair of values.
#[derive(Clone)]
pub struct CompiledPath {
    expression: String,
    evaluate: PathFn,
}

impl CompiledPath {
    pub fn new(expression: impl Into<String>, evaluate: PathFn) -> Self {
        Self {
            expression: expression.into(),
            evaluate,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Lazily yields the values the path selects.
    pub fn evaluate(&self, local: &FhirValue, root: &FhirValue) -> Matches {
        (self.evaluate)(local, root)
    }
}

/// A boolean invariant over one candidate value.
#[derive(Clone)]
pub struct CompiledInvariant {
    expression: String,
    predicate: PredicateFn,
}

impl CompiledInvariant {
    pub fn new(expression: impl Into<String>, predicate: PredicateFn) -> Self {
        Self {
            expression: expression.into(),
            predicate,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn holds(&self, candidate: &FhirValue) -> bool {
        (self.predicate)(candidate)
    }
}

impl fmt::Debug for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledPath").field(&self.expression).finish()
    }
}

impl fmt::Debug for CompiledInvariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledInvariant").field(&self.expression).finish()
    }
}
