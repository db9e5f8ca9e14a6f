mod choice_types;
mod context;
mod element_converter;
mod slicing;

pub use choice_types::*;
pub use context::*;
pub use element_converter::*;
pub use slicing::*;

use crate::core::MapperConfig;
use crate::error::{MappingError, Result};
use crate::provider::{CacheKey, SchemaCache, SnapshotProvider};
use crate::types::descriptor::{TypeDescriptor, TypeDescriptorProvider, TypeKind};
use crate::types::element::{ElementConstraint, TypedLiteral};
use crate::types::literal::{type_code_for_suffix, value_from_json};
use crate::types::schema::{NodeConstraint, SchemaNode};
use crate::types::value::FhirValue;
use std::sync::Arc;

/// Composite types that stay leaves instead of being expanded.
const NON_EXPANDED_TYPES: &[&str] = &["Reference", "Extension", "Narrative"];

/// Turns a profile's snapshot into a [`SchemaNode`] tree.
///
/// Trees are cached by profile. Nested data types are expanded from their
/// declared profile or their core definition, then rebased under the
/// element that uses them.
pub struct SchemaTreeBuilder {
    snapshots: Arc<dyn SnapshotProvider>,
    types: Arc<dyn TypeDescriptorProvider>,
    cache: Arc<SchemaCache>,
    config: MapperConfig,
}

impl SchemaTreeBuilder {
    pub fn new(snapshots: Arc<dyn SnapshotProvider>, types: Arc<dyn TypeDescriptorProvider>) -> Self {
        Self {
            snapshots,
            types,
            cache: Arc::new(SchemaCache::new()),
            config: MapperConfig::default(),
        }
    }

    /// Share a cache between builders.
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    pub fn types(&self) -> &Arc<dyn TypeDescriptorProvider> {
        &self.types
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Builds, or fetches from cache, the tree of a profile. An unresolvable
    /// profile yields `None`.
    pub fn build(&self, profile_id: &str) -> Result<Option<Arc<SchemaNode>>> {
        self.build_keyed(CacheKey::profile(profile_id))
    }

    /// Like [`SchemaTreeBuilder::build`], cached per (profile, container).
    pub fn build_for(&self, profile_id: &str, container: &str) -> Result<Option<Arc<SchemaNode>>> {
        self.build_keyed(CacheKey::pair(profile_id, container))
    }

    /// Builds a tree rooted at `path` instead of the profile's type name.
    /// The result is call-specific and never cached.
    pub fn build_rebased(&self, profile_id: &str, path: &str) -> Result<Option<SchemaNode>> {
        let mut context = BuildContext::new(self.config.max_expansion_depth);
        let tree = self.build_profile(profile_id, &mut context)?;
        Ok(tree.map(|tree| tree.rebased(&tree.path, path)))
    }

    fn build_keyed(&self, key: CacheKey) -> Result<Option<Arc<SchemaNode>>> {
        let build = || -> Result<Option<SchemaNode>> {
            let mut context = BuildContext::new(self.config.max_expansion_depth);
            let tree = self.build_profile(&key.profile, &mut context)?;
            let stats = context.finish();
            tracing::debug!(
                "Built schema for {}: {} elements, {} skipped, {} slices, {} expansions ({} cached) in {:?}",
                key.profile,
                stats.elements_processed,
                stats.elements_skipped,
                stats.slices_processed,
                stats.types_expanded,
                stats.cache_hits,
                stats.build_duration.unwrap_or_default()
            );
            Ok(tree)
        };

        let cache_config = &self.config.cache_config;
        if !cache_config.enabled {
            return Ok(build()?.map(Arc::new));
        }
        if cache_config.guard_concurrent_builds {
            return self.cache.get_or_build(key.clone(), build);
        }
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Some(hit));
        }
        Ok(build()?.map(|tree| self.cache.publish(key.clone(), Arc::new(tree))))
    }

    fn build_profile(&self, profile_id: &str, context: &mut BuildContext) -> Result<Option<SchemaNode>> {
        let Some(snapshot) = self.snapshots.resolve_snapshot(profile_id) else {
            tracing::debug!("No snapshot for {}", profile_id);
            return Ok(None);
        };
        let Some(root_element) = snapshot.root() else {
            tracing::warn!("Snapshot of {} does not start with its root element", profile_id);
            return Ok(None);
        };
        let Some(descriptor) = self.types.describe(&snapshot.type_name) else {
            tracing::warn!("No type descriptor for {} ({})", snapshot.type_name, profile_id);
            return Ok(None);
        };
        if !context.enter(profile_id) {
            return Ok(None);
        }

        let children = self.build_children(
            &snapshot.elements[1..],
            &snapshot.type_name,
            &snapshot.type_name,
            &descriptor,
            context,
        );
        context.leave();

        let mut root = SchemaNode::root(profile_id, Arc::clone(&descriptor));
        root.constraint = self.node_constraint(root_element);
        root.children = children?;
        Ok(Some(root))
    }

    fn build_children(
        &self,
        elements: &[ElementConstraint],
        parent_element_path: &str,
        parent_node_path: &str,
        parent_type: &TypeDescriptor,
        context: &mut BuildContext,
    ) -> Result<Vec<SchemaNode>> {
        let mut nodes = Vec::new();
        let mut groups = SliceGroups::new();
        let mut index = 0;

        while index < elements.len() {
            let element = &elements[index];
            let prefix = format!("{}.", element.path);
            let end = index
                + 1
                + elements[index + 1..]
                    .iter()
                    .take_while(|descendant| descendant.path.starts_with(&prefix))
                    .count();
            let descendants = &elements[index + 1..end];
            index = end;

            if element.parent_path() != Some(parent_element_path) {
                tracing::warn!(
                    "Element {} is out of document order under {}",
                    element.path,
                    parent_element_path
                );
                continue;
            }
            if element.slice_name.is_none() {
                groups.declare(&element.path, element.slicing.as_ref());
            }

            let node = self.build_element(
                element,
                descendants,
                parent_node_path,
                parent_type,
                &groups,
                context,
            )?;
            nodes.extend(node);
        }

        Ok(nodes)
    }

    fn build_element(
        &self,
        element: &ElementConstraint,
        descendants: &[ElementConstraint],
        parent_node_path: &str,
        parent_type: &TypeDescriptor,
        groups: &SliceGroups<'_>,
        context: &mut BuildContext,
    ) -> Result<Option<SchemaNode>> {
        context.stats.elements_processed += 1;
        if let Some(reason) = skip_reason(element) {
            tracing::trace!("Skipping {} ({})", element.path, reason);
            context.stats.elements_skipped += 1;
            return Ok(None);
        }

        let local = element.local_name();
        let accessor = parent_type
            .element(local)
            .cloned()
            .ok_or_else(|| MappingError::missing_accessor(&parent_type.name, local))?;

        let type_code = match resolve_concrete_type(element, &accessor) {
            ConcreteType::Resolved(code) => code,
            ConcreteType::OpenResource => {
                tracing::trace!("Skipping open resource slot {}", element.path);
                context.stats.elements_skipped += 1;
                return Ok(None);
            }
            ConcreteType::Unsupported(code) => {
                return Err(MappingError::missing_accessor(
                    &parent_type.name,
                    format!("{local} as '{code}'"),
                ));
            }
        };
        if accessor.is_choice() {
            context.stats.choice_types_resolved += 1;
        }

        let mut constraint = self.node_constraint(element);
        let base_path = format!("{parent_node_path}.{local}");
        let path = match &element.slice_name {
            Some(slice_name) => {
                context.stats.slices_processed += 1;
                constraint.slice =
                    Some(groups.slice_info(&element.path, slice_name, element.is_extension()));
                slice_path(&base_path, slice_name)
            }
            None => base_path,
        };

        let type_descriptor = self.types.describe(&type_code);
        let mut node = SchemaNode {
            path,
            local_name: accessor.name.clone(),
            type_code,
            profile: None,
            constraint,
            accessor: Some(accessor),
            type_descriptor: type_descriptor.clone(),
            children: Vec::new(),
        };

        match type_descriptor {
            Some(descriptor) if !descendants.is_empty() && !descriptor.is_primitive() => {
                node.children =
                    self.build_children(descendants, &element.path, &node.path, &descriptor, context)?;
            }
            Some(descriptor) if descendants.is_empty() => {
                if let Some(profile) = self.expansion_profile(element, &descriptor) {
                    self.expand_into(&mut node, &profile, context)?;
                }
            }
            Some(_) => {
                tracing::trace!("Ignoring {} child elements of primitive {}", descendants.len(), element.path);
            }
            None => {
                tracing::warn!("No type descriptor for {} at {}", node.type_code, node.path);
            }
        }

        Ok(Some(node))
    }

    /// Profile whose tree supplies the children of a childless element.
    fn expansion_profile(&self, element: &ElementConstraint, descriptor: &TypeDescriptor) -> Option<String> {
        if let Some(profile) = element.extension_profile() {
            return Some(profile.to_string());
        }
        if descriptor.kind != TypeKind::Complex || NON_EXPANDED_TYPES.contains(&descriptor.name.as_str()) {
            return None;
        }
        let declared = element
            .primary_type()
            .filter(|primary| primary.code == descriptor.name)
            .and_then(|primary| primary.profile.first().cloned());
        Some(declared.unwrap_or_else(|| self.config.core_profile(&descriptor.name)))
    }

    fn expand_into(&self, node: &mut SchemaNode, profile: &str, context: &mut BuildContext) -> Result<()> {
        let Some(nested) = self.nested_tree(profile, context)? else {
            return Ok(());
        };
        if nested.type_code != node.type_code {
            tracing::warn!(
                "{} describes {}, not {} as used at {}",
                profile,
                nested.type_code,
                node.type_code,
                node.path
            );
            return Ok(());
        }

        context.stats.types_expanded += 1;
        node.children = nested
            .children
            .iter()
            .map(|child| child.rebased(&nested.path, &node.path))
            .collect();
        node.constraint
            .invariants
            .extend(nested.constraint.invariants.iter().cloned());
        Ok(())
    }

    /// Nested trees come from the cache or are built inline. They are only
    /// published when no cycle or depth cut shaped them.
    fn nested_tree(&self, profile: &str, context: &mut BuildContext) -> Result<Option<Arc<SchemaNode>>> {
        let key = CacheKey::profile(profile);
        let caching = self.config.cache_config.enabled;
        if caching {
            if let Some(hit) = self.cache.get(&key) {
                context.stats.cache_hits += 1;
                return Ok(Some(hit));
            }
        }

        let truncations = context.truncations();
        let Some(tree) = self.build_profile(profile, context)? else {
            return Ok(None);
        };
        let tree = Arc::new(tree);
        if caching && context.truncations() == truncations {
            return Ok(Some(self.cache.publish(key, tree)));
        }
        Ok(Some(tree))
    }

    fn node_constraint(&self, element: &ElementConstraint) -> NodeConstraint {
        NodeConstraint {
            min: element.min.unwrap_or(0),
            max: element.max_cardinality(),
            fixed: element.fixed().and_then(|literal| self.literal(&element.path, literal)),
            pattern: element.pattern().and_then(|literal| self.literal(&element.path, literal)),
            default_value: element
                .default_value()
                .and_then(|literal| self.literal(&element.path, literal)),
            slicing: element.slicing.clone(),
            slice: None,
            extension_profile: element.extension_profile().map(str::to_string),
            invariants: element
                .constraint
                .iter()
                .filter(|invariant| invariant.expression.is_some())
                .cloned()
                .collect(),
        }
    }

    fn literal(&self, path: &str, literal: TypedLiteral<'_>) -> Option<FhirValue> {
        let type_code = type_code_for_suffix(literal.suffix);
        let value = value_from_json(&type_code, literal.value, self.types.as_ref());
        if value.is_none() {
            tracing::warn!("Unusable {} literal at {}", type_code, path);
        }
        value
    }
}

impl std::fmt::Debug for SchemaTreeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaTreeBuilder")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}
