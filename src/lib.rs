//! # OctoFHIR SDC Mapper
//!
//! Profile-driven mapping between questionnaire answer trees and FHIR
//! resource instances.
//!
//! A profile's snapshot is turned once into a [`SchemaNode`] tree. The same
//! tree then drives three operations:
//!
//! - **Populate**: answers whose linkIds are schema paths become an instance,
//!   with the profile's fixed values always written.
//! - **Extract**: an instance is read back into an answer tree shaped by an
//!   [`AnswerTemplate`], resolving each item's `definition` against the tree.
//! - **Validate**: an instance is checked for cardinality, fixed values and
//!   invariants, producing a [`ValidationOutcome`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use octofhir_sdc_mapper::*;
//! use std::sync::Arc;
//!
//! # fn example(structure_definition: serde_json::Value) -> Result<()> {
//! let profiles = InMemorySnapshotProvider::new();
//! let url = profiles.load_json(structure_definition)?;
//!
//! let mapper = SchemaMapper::r4(MapperConfig::default(), Arc::new(profiles))?;
//! if let Some(schema) = mapper.build_schema(&url)? {
//!     let answers = AnswerRoot::new(vec![AnswerItem::question(
//!         "Practitioner.active",
//!         vec![AnswerValue::Boolean(true)],
//!     )]);
//!     let practitioner = mapper.populate(&schema, &answers)?;
//!     let outcome = mapper.validate(&schema, &practitioner)?;
//!     println!("{}", outcome.to_operation_outcome());
//! }
//! # Ok(())
//! # }
//! ```

pub mod converter;
pub mod core;
pub mod error;
pub mod mapping;
pub mod path;
pub mod provider;
pub mod types;
pub mod validation;

pub use converter::SchemaTreeBuilder;
pub use crate::core::{CacheConfig, MapperConfig, SchemaMapper, ValidationPolicy};
pub use error::{MappingError, Result};
pub use mapping::{AnswerExtractor, Context, ContextResolver, InstancePopulator, ResolveOutcome};
pub use path::{CompiledInvariant, CompiledPath, FhirPathEvaluator, MemberPathEvaluator, PathEvaluator};
pub use provider::{
    CacheKey, CacheStats, CompositeSnapshotProvider, DerivedSnapshotProvider, InMemorySnapshotProvider,
    SchemaCache, SnapshotProvider, StructureSnapshot,
};
pub use types::*;
pub use validation::{
    IssueKind, IssueSeverity, ValidationIssue, ValidationOutcome, ValidationWalker,
};
