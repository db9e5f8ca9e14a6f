//! Mapping between answer trees and typed instances.

pub mod coercion;
pub mod context;
pub mod extract;
pub mod populate;
pub mod slices;

pub use context::{AnswerNodeRef, Context, ContextResolver, ResolveOutcome};
pub use extract::AnswerExtractor;
pub use populate::InstancePopulator;
pub use slices::matches_slice;
