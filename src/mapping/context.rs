//! Context Resolver: where in the schema, and on which values, an answer
//! node applies.

use super::slices::matches_slice;
use crate::converter::SchemaTreeBuilder;
use crate::error::{MappingError, Result};
use crate::types::answer::{AnswerItem, TemplateItem};
use crate::types::schema::SchemaNode;
use crate::types::value::FhirValue;
use std::sync::Arc;
use url::Url;

/// An answer node as far as context resolution is concerned.
pub trait AnswerNodeRef {
    fn link_id(&self) -> &str;

    fn definition(&self) -> Option<&str>;
}

impl AnswerNodeRef for AnswerItem {
    fn link_id(&self) -> &str {
        &self.link_id
    }

    fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }
}

impl AnswerNodeRef for TemplateItem {
    fn link_id(&self) -> &str {
        &self.link_id
    }

    fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }
}

/// A schema position paired with the values in scope and the working set of
/// instances a definition may switch to.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    root: Arc<SchemaNode>,
    /// Child indices from `root` to the current node.
    position: Vec<usize>,
    pub values: Vec<FhirValue>,
    pub working_set: &'a [FhirValue],
}

impl<'a> Context<'a> {
    pub fn new(root: Arc<SchemaNode>, instance: FhirValue, working_set: &'a [FhirValue]) -> Self {
        Self {
            root,
            position: Vec::new(),
            values: vec![instance],
            working_set,
        }
    }

    pub fn root(&self) -> &Arc<SchemaNode> {
        &self.root
    }

    pub fn node(&self) -> &SchemaNode {
        self.root.at(&self.position)
    }

    /// Profile of the tree the context is positioned in.
    pub fn profile(&self) -> Option<&str> {
        self.root.profile.as_deref()
    }

    /// Same position, other values.
    pub fn with_values(&self, values: Vec<FhirValue>) -> Self {
        Self {
            root: Arc::clone(&self.root),
            position: self.position.clone(),
            values,
            working_set: self.working_set,
        }
    }
}

/// How a context was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The definition named another profile with an instance in the working set.
    Switched,
    /// The path was reachable and selected at least one value.
    Narrowed,
    /// The path was reachable but selected nothing. The context is
    /// positioned at the target with no values.
    Empty,
    /// Nothing applied; the input context is returned.
    PassThrough,
}

/// A parsed `definition` (or bare linkId) reference.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reference<'r> {
    Profile(&'r str),
    Path {
        profile: Option<&'r str>,
        path: &'r str,
    },
}

fn parse_reference(reference: &str) -> Reference<'_> {
    match reference.split_once('#') {
        Some((profile, path)) => Reference::Path {
            profile: (!profile.is_empty()).then_some(profile),
            path,
        },
        None if is_profile_url(reference) => Reference::Profile(reference),
        None => Reference::Path {
            profile: None,
            path: reference,
        },
    }
}

/// Absolute URLs with an authority, or URNs. Slice-qualified paths such as
/// `Practitioner.extension:birthPlace` parse as URLs too, so a scheme alone
/// is not enough.
fn is_profile_url(reference: &str) -> bool {
    Url::parse(reference).is_ok_and(|url| url.has_host() || url.scheme() == "urn")
}

/// Computes the next context for an answer node.
pub struct ContextResolver<'b> {
    builder: &'b SchemaTreeBuilder,
}

impl<'b> ContextResolver<'b> {
    pub fn new(builder: &'b SchemaTreeBuilder) -> Self {
        Self { builder }
    }

    /// The context an answer node applies to. Unresolvable references leave
    /// the input context unchanged.
    pub fn resolve<'a, N: AnswerNodeRef + ?Sized>(&self, node: &N, context: &Context<'a>) -> Result<Context<'a>> {
        let (resolved, outcome) = self.resolve_with_outcome(node, context)?;
        Ok(match outcome {
            ResolveOutcome::Empty => context.clone(),
            _ => resolved,
        })
    }

    pub fn resolve_with_outcome<'a, N: AnswerNodeRef + ?Sized>(
        &self,
        node: &N,
        context: &Context<'a>,
    ) -> Result<(Context<'a>, ResolveOutcome)> {
        let reference = node.definition().unwrap_or_else(|| node.link_id());
        match parse_reference(reference) {
            Reference::Profile(profile) if Some(profile) != context.profile() => {
                self.switch_profile(profile, context)
            }
            Reference::Profile(_) => Ok((context.clone(), ResolveOutcome::PassThrough)),
            Reference::Path {
                profile: Some(profile),
                ..
            } if Some(profile) != context.profile() => {
                tracing::debug!(
                    "'{}' points into {}, not the current profile; passing through",
                    reference,
                    profile
                );
                Ok((context.clone(), ResolveOutcome::PassThrough))
            }
            Reference::Path { path, .. } => self.narrow(path, context),
        }
    }

    fn switch_profile<'a>(&self, profile: &str, context: &Context<'a>) -> Result<(Context<'a>, ResolveOutcome)> {
        let Some(tree) = self.builder.build(profile)? else {
            return Ok((context.clone(), ResolveOutcome::PassThrough));
        };
        let instance = context
            .working_set
            .iter()
            .find(|instance| instance.type_name() == tree.type_code);
        match instance {
            Some(instance) => Ok((
                Context::new(tree, instance.clone(), context.working_set),
                ResolveOutcome::Switched,
            )),
            None => {
                tracing::debug!("No {} instance in the working set for {}", tree.type_code, profile);
                Ok((context.clone(), ResolveOutcome::PassThrough))
            }
        }
    }

    fn narrow<'a>(&self, path: &str, context: &Context<'a>) -> Result<(Context<'a>, ResolveOutcome)> {
        let current = context.node();
        let relative = current.index_path(path).or_else(|| {
            let qualified = format!("{}.{}", current.path, path);
            current.index_path(&qualified)
        });
        let Some(relative) = relative.filter(|steps| !steps.is_empty()) else {
            return Ok((context.clone(), ResolveOutcome::PassThrough));
        };

        let types = self.builder.types().as_ref();
        let mut node = current;
        let mut values = context.values.clone();
        for &index in &relative {
            let child = &node.children[index];
            let accessor = child
                .accessor
                .as_ref()
                .ok_or_else(|| MappingError::missing_accessor(&node.type_code, &child.local_name))?;
            values = values
                .iter()
                .flat_map(|value| accessor.get(value))
                .filter(|value| matches_slice(child, value, types))
                .collect();
            node = child;
        }

        let mut position = context.position.clone();
        position.extend(relative);
        let outcome = if values.is_empty() {
            ResolveOutcome::Empty
        } else {
            ResolveOutcome::Narrowed
        };
        Ok((
            Context {
                root: Arc::clone(&context.root),
                position,
                values,
                working_set: context.working_set,
            },
            outcome,
        ))
    }
}
