use super::descriptor::{ElementAccessor, TypeDescriptor};
use super::element::{Discriminator, Invariant, Slicing};
use super::value::FhirValue;
use crate::mapping::coercion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Upper cardinality bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Max {
    Bounded(u32),
    #[default]
    Unbounded,
}

impl Max {
    /// Parses `*` or a non-negative integer. Anything else is unbounded.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "*" => Self::Unbounded,
            other => other.parse().map(Self::Bounded).unwrap_or_else(|_| {
                tracing::warn!("Unparseable max cardinality '{}', treating as unbounded", raw);
                Self::Unbounded
            }),
        }
    }

    pub fn allows(&self, count: usize) -> bool {
        match self {
            Self::Bounded(max) => count <= *max as usize,
            Self::Unbounded => true,
        }
    }

    pub fn is_many(&self) -> bool {
        !matches!(self, Self::Bounded(0 | 1))
    }

    pub fn is_prohibited(&self) -> bool {
        matches!(self, Self::Bounded(0))
    }
}

impl fmt::Display for Max {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(max) => write!(f, "{max}"),
            Self::Unbounded => write!(f, "*"),
        }
    }
}

/// Membership rule of a slice node.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceInfo {
    pub name: String,
    /// Discriminators declared by the slice group this slice belongs to.
    pub discriminators: Vec<Discriminator>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeConstraint {
    pub min: u32,
    pub max: Max,
    pub fixed: Option<FhirValue>,
    pub pattern: Option<FhirValue>,
    pub default_value: Option<FhirValue>,
    /// Slicing introduced at this element.
    pub slicing: Option<Slicing>,
    pub slice: Option<SliceInfo>,
    pub extension_profile: Option<String>,
    pub invariants: Vec<Invariant>,
}

/// One position in a built schema tree.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub path: String,
    /// Structural name on the parent type, without `[x]` or slice suffix.
    pub local_name: String,
    /// Concrete type of the node's values.
    pub type_code: String,
    /// Profile the tree was built from; set on roots only.
    pub profile: Option<String>,
    pub constraint: NodeConstraint,
    /// Accessor on the parent type. Absent on roots.
    pub accessor: Option<Arc<ElementAccessor>>,
    pub type_descriptor: Option<Arc<TypeDescriptor>>,
    pub children: Vec<SchemaNode>,
}

impl SchemaNode {
    pub fn root(profile: impl Into<String>, type_descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            path: type_descriptor.name.clone(),
            local_name: type_descriptor.name.clone(),
            type_code: type_descriptor.name.clone(),
            profile: Some(profile.into()),
            constraint: NodeConstraint::default(),
            accessor: None,
            type_descriptor: Some(type_descriptor),
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.accessor.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_slice(&self) -> bool {
        self.constraint.slice.is_some()
    }

    pub fn allows_many(&self) -> bool {
        self.constraint.max.is_many()
    }

    /// Relative path selecting this node's values from its parent's value.
    pub fn select_expression(&self) -> Option<&str> {
        self.accessor.as_ref().map(|accessor| accessor.name.as_str())
    }

    pub fn child(&self, local_name: &str) -> Option<&SchemaNode> {
        self.children
            .iter()
            .find(|child| child.local_name == local_name && !child.is_slice())
    }

    /// Finds the node with the given path in this subtree.
    pub fn find(&self, path: &str) -> Option<&SchemaNode> {
        let indices = self.index_path(path)?;
        Some(self.at(&indices))
    }

    /// Child indices leading from this node to the node at `path`.
    pub fn index_path(&self, path: &str) -> Option<Vec<usize>> {
        let mut indices = Vec::new();
        let mut current = self;
        while current.path != path {
            let (index, next) = current.children.iter().enumerate().find(|(_, child)| {
                path == child.path
                    || path
                        .strip_prefix(child.path.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            })?;
            indices.push(index);
            current = next;
        }
        Some(indices)
    }

    /// Node reached by following child indices. Indices must come from
    /// [`SchemaNode::index_path`] on the same tree.
    pub fn at(&self, indices: &[usize]) -> &SchemaNode {
        indices
            .iter()
            .fold(self, |node, index| &node.children[*index])
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SchemaNode::node_count).sum::<usize>()
    }

    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SchemaNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// All paths in document order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.walk(&mut |node| paths.push(node.path.as_str()));
        paths
    }

    pub fn has_fixed_descendant(&self) -> bool {
        self.constraint.fixed.is_some() || self.children.iter().any(SchemaNode::has_fixed_descendant)
    }

    /// Keeps only the sub-trees that contain a fixed value.
    pub fn prune_to_fixed(&self) -> Option<SchemaNode> {
        if !self.has_fixed_descendant() {
            return None;
        }
        Some(SchemaNode {
            children: self
                .children
                .iter()
                .filter_map(SchemaNode::prune_to_fixed)
                .collect(),
            ..self.shallow_clone()
        })
    }

    /// Structural copy with every path under `from` moved under `to`.
    pub fn rebased(&self, from: &str, to: &str) -> SchemaNode {
        let path = match self.path.strip_prefix(from) {
            Some(rest) => format!("{to}{rest}"),
            None => self.path.clone(),
        };
        SchemaNode {
            path,
            profile: None,
            children: self.children.iter().map(|child| child.rebased(from, to)).collect(),
            ..self.shallow_clone()
        }
    }

    /// The fixed value in the node's concrete type.
    pub fn materialized_fixed(&self) -> Option<FhirValue> {
        let fixed = self.constraint.fixed.as_ref()?;
        if fixed.type_name() == self.type_code {
            return Some(fixed.clone());
        }
        let converted = coercion::convert_data(fixed, &self.type_code);
        if converted.is_none() {
            tracing::warn!(
                "Fixed value of type '{}' at '{}' cannot be expressed as '{}'",
                fixed.type_name(),
                self.path,
                self.type_code
            );
        }
        converted
    }

    fn shallow_clone(&self) -> SchemaNode {
        SchemaNode {
            path: self.path.clone(),
            local_name: self.local_name.clone(),
            type_code: self.type_code.clone(),
            profile: self.profile.clone(),
            constraint: self.constraint.clone(),
            accessor: self.accessor.clone(),
            type_descriptor: self.type_descriptor.clone(),
            children: Vec::new(),
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(
            f,
            "{:indent$}{} {}..{} {}",
            "",
            self.path,
            self.constraint.min,
            self.constraint.max,
            self.type_code,
            indent = depth * 2
        )?;
        if let Some(fixed) = &self.constraint.fixed {
            write!(f, " = {fixed}")?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl PartialEq for SchemaNode {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.local_name == other.local_name
            && self.type_code == other.type_code
            && self.profile == other.profile
            && self.constraint == other.constraint
            && self.select_expression() == other.select_expression()
            && self.children == other.children
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
