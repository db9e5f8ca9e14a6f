use crate::types::element::ElementConstraint;
use std::fmt;

/// Why an element does not become a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension without a declared extension profile.
    UnmappedExtension,
    Narrative,
    Prohibited,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::UnmappedExtension => "unmapped extension",
            Self::Narrative => "narrative",
            Self::Prohibited => "max cardinality 0",
        };
        f.write_str(reason)
    }
}

pub fn skip_reason(element: &ElementConstraint) -> Option<SkipReason> {
    if element.max_cardinality().is_prohibited() {
        return Some(SkipReason::Prohibited);
    }
    if element.is_extension() && element.extension_profile().is_none() {
        return Some(SkipReason::UnmappedExtension);
    }
    if element
        .primary_type()
        .is_some_and(|element_type| element_type.code == "Narrative")
    {
        return Some(SkipReason::Narrative);
    }
    None
}
