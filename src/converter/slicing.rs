use crate::types::element::{Discriminator, DiscriminatorType, Slicing};
use crate::types::schema::SliceInfo;
use std::collections::HashMap;

/// Path of a slice node: the base path qualified with `:<sliceName>`.
pub fn slice_path(base_path: &str, slice_name: &str) -> String {
    format!("{base_path}:{slice_name}")
}

/// Slice groups declared among the siblings of one parent, keyed by the
/// element path that introduced them.
#[derive(Debug, Default)]
pub struct SliceGroups<'a> {
    groups: HashMap<&'a str, &'a Slicing>,
}

impl<'a> SliceGroups<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the slicing an element introduces, if any.
    pub fn declare(&mut self, path: &'a str, slicing: Option<&'a Slicing>) {
        if let Some(slicing) = slicing {
            self.groups.insert(path, slicing);
        }
    }

    /// Slice membership for a slice of the element at `path`. Extension
    /// slices discriminate on url even when the group is undeclared.
    pub fn slice_info(&self, path: &str, slice_name: &str, is_extension: bool) -> SliceInfo {
        let mut discriminators = self
            .groups
            .get(path)
            .map(|slicing| slicing.discriminator.clone())
            .unwrap_or_default();
        if discriminators.is_empty() && is_extension {
            discriminators.push(Discriminator::new(DiscriminatorType::Value, "url"));
        }
        if discriminators.is_empty() {
            tracing::debug!("Slice {}:{} has no discriminators", path, slice_name);
        }
        SliceInfo {
            name: slice_name.to_string(),
            discriminators,
        }
    }
}
