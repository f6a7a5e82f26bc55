//! Data model types.
//!
//! - Schema (structured types, enums, navigation sources, bound operations)
//! - Values (the in-memory object graph to encode)
//! - Builders (ergonomic construction)

pub mod builder;
pub mod schema;
pub mod value;

pub use builder::{enum_value, ModelBuilder, NavigationSourceBuilder, ResourceBuilder, StructuredTypeBuilder};
pub use schema::{
    BoundOperation, EdmModel, EnumType, NavigationProperty, NavigationSource, OperationKind,
    PrimitiveKind, StructuralProperty, StructuredType, TypeKind, TypeRef,
};
pub use value::{
    DeletedReason, Deletion, DeltaChangeSet, NestedChange, PrimitiveValue, ResourceInstance,
    StreamReference, Value,
};
