use super::{CompiledPath, Matches};
use crate::error::{MappingError, Result};
use crate::types::descriptor::TypeDescriptorProvider;
use crate::types::literal::type_code_for_suffix;
use crate::types::value::FhirValue;
use std::sync::Arc;

/// Evaluates dotted member paths (`identifier.system`, `$this.name`,
/// `%resource.status`) through the type descriptors.
#[derive(Clone)]
pub struct MemberPathEvaluator {
    types: Arc<dyn TypeDescriptorProvider>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Start {
    Local,
    Root,
}

impl MemberPathEvaluator {
    pub fn new(types: Arc<dyn TypeDescriptorProvider>) -> Self {
        Self { types }
    }

    pub fn compile_path(&self, expression: &str) -> Result<CompiledPath> {
        let (start, segments) = parse_member_path(expression)?;
        let segments: Arc<[String]> = segments.into();
        let types = Arc::clone(&self.types);

        Ok(CompiledPath::new(
            expression,
            Arc::new(move |local: &FhirValue, root: &FhirValue| {
                let origin = match start {
                    Start::Local => local.clone(),
                    Start::Root => root.clone(),
                };
                let mut matches: Matches = Box::new(std::iter::once(origin));
                for segment in segments.iter().cloned() {
                    let types = Arc::clone(&types);
                    matches = Box::new(
                        matches.flat_map(move |value| children(types.as_ref(), &value, &segment)),
                    );
                }
                matches
            }),
        ))
    }
}

fn parse_member_path(expression: &str) -> Result<(Start, Vec<String>)> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(MappingError::invalid_expression(expression, "empty path"));
    }

    let mut start = Start::Local;
    let mut segments = Vec::new();
    for (position, segment) in trimmed.split('.').map(str::trim).enumerate() {
        match segment {
            "$this" if position == 0 => {}
            "%resource" | "%rootResource" if position == 0 => start = Start::Root,
            name if is_member_name(name) => {
                segments.push(name.strip_suffix("[x]").unwrap_or(name).to_string());
            }
            other => {
                return Err(MappingError::invalid_expression(
                    expression,
                    format!("unsupported path segment '{other}'"),
                ));
            }
        }
    }
    Ok((start, segments))
}

fn is_member_name(name: &str) -> bool {
    let name = name.strip_suffix("[x]").unwrap_or(name);
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Values of the member `name` of `value`. Type-suffixed choice names such
/// as `valueQuantity` select the matching choice values only.
pub(crate) fn children(types: &dyn TypeDescriptorProvider, value: &FhirValue, name: &str) -> Vec<FhirValue> {
    let Some(descriptor) = types.describe(value.type_name()) else {
        return match value {
            FhirValue::Composite(composite) => composite.get(name).to_vec(),
            _ => Vec::new(),
        };
    };
    if let Some(accessor) = descriptor.element(name) {
        return accessor.get(value);
    }

    descriptor
        .elements()
        .filter(|accessor| accessor.is_choice())
        .find_map(|accessor| {
            let suffix = name.strip_prefix(accessor.name.as_str())?;
            let code = type_code_for_suffix(suffix);
            accessor.choice_types.contains(&code).then(|| {
                accessor
                    .get(value)
                    .into_iter()
                    .filter(|choice| choice.type_name() == code)
                    .collect()
            })
        })
        .unwrap_or_default()
}

impl std::fmt::Debug for MemberPathEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberPathEvaluator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::registry::TypeRegistry;
    use crate::types::value::Composite;

    fn practitioner() -> FhirValue {
        let npi = Composite::new("Identifier")
            .with("system", FhirValue::uri("http://hl7.org/fhir/sid/us-npi"))
            .with("value", FhirValue::string("123"));
        let local = Composite::new("Identifier").with("value", FhirValue::string("abc"));
        FhirValue::Composite(
            Composite::new("Practitioner")
                .with("identifier", FhirValue::Composite(npi))
                .with("identifier", FhirValue::Composite(local))
                .with("active", FhirValue::boolean(true)),
        )
    }

    #[test]
    fn test_member_path_fans_out() {
        let evaluator = MemberPathEvaluator::new(TypeRegistry::r4());
        let path = evaluator.compile_path("identifier.value").unwrap();
        let instance = practitioner();
        let values: Vec<FhirValue> = path.evaluate(&instance, &instance).collect();
        assert_eq!(values, vec![FhirValue::string("123"), FhirValue::string("abc")]);
    }

    #[test]
    fn test_root_and_this_prefixes() {
        let evaluator = MemberPathEvaluator::new(TypeRegistry::r4());
        let instance = practitioner();
        let identifier = evaluator
            .compile_path("identifier")
            .unwrap()
            .evaluate(&instance, &instance)
            .next()
            .unwrap();

        let from_root = evaluator.compile_path("%resource.active").unwrap();
        assert_eq!(
            from_root.evaluate(&identifier, &instance).collect::<Vec<_>>(),
            vec![FhirValue::boolean(true)]
        );
        let from_this = evaluator.compile_path("$this.system").unwrap();
        assert_eq!(from_this.evaluate(&identifier, &instance).count(), 1);
    }

    #[test]
    fn test_choice_suffix_filters_by_type() {
        let evaluator = MemberPathEvaluator::new(TypeRegistry::r4());
        let observation = FhirValue::Composite(
            Composite::new("Observation").with("value", FhirValue::string("positive")),
        );
        let string_path = evaluator.compile_path("valueString").unwrap();
        assert_eq!(string_path.evaluate(&observation, &observation).count(), 1);
        let quantity_path = evaluator.compile_path("valueQuantity").unwrap();
        assert_eq!(quantity_path.evaluate(&observation, &observation).count(), 0);
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        let evaluator = MemberPathEvaluator::new(TypeRegistry::r4());
        assert!(evaluator.compile_path("").is_err());
        assert!(evaluator.compile_path("name.where(use = 'official')").is_err());
        assert!(evaluator.compile_path("name.$this").is_err());
    }
}
