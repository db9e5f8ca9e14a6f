pub mod answer;
pub mod descriptor;
pub mod element;
pub mod literal;
pub mod r4;
pub mod registry;
pub mod schema;
pub mod value;

pub use answer::{
    Answer, AnswerItem, AnswerRoot, AnswerTemplate, AnswerValue, Attachment, Coding, ItemKind, Quantity,
    TemplateItem,
};
pub use descriptor::{ElementAccessor, TypeDescriptor, TypeDescriptorProvider, TypeKind};
pub use element::{
    Discriminator, DiscriminatorType, ElementConstraint, ElementType, Invariant, InvariantSeverity,
    Slicing, SlicingRules,
};
pub use registry::TypeRegistry;
pub use schema::{Max, NodeConstraint, SchemaNode, SliceInfo};
pub use value::{CodeValue, Composite, ExtensionValue, FhirValue, Primitive, ReferenceValue};
