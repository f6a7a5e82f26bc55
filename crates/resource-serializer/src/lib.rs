//! Streaming serializer for resource graphs.
//!
//! This crate turns an in-memory graph of resources into a flat, ordered
//! sequence of write events for a streaming transport (JSON, XML, or any
//! other format that understands nested frames).
//!
//! # Overview
//!
//! One encoder handles every shape a resource can take:
//! - **Declared**: entity and complex types described by an [`EdmModel`]
//! - **Open**: declared types carrying extra, dynamic properties
//! - **Untyped**: schema-less resources whose values are typed at write time
//! - **Delta**: partial-update payloads (changed properties plus keys) and
//!   deleted-resource markers
//!
//! What is written is shaped by a selection/expansion request (projection),
//! the metadata level (how much hypermedia and type naming is emitted) and
//! the link builders and concurrency tokens attached to navigation sources.
//!
//! # Quick Start
//!
//! ```rust
//! use resource_serializer::{
//!     check_frames, EncodeOptions, MetadataLevel, ModelBuilder, ResourceBuilder,
//!     ResourceEncoder, WriteEvent, WriteTarget,
//! };
//!
//! let model = ModelBuilder::new("Sales")
//!     .entity_type("Customer", |t| {
//!         t.key("Id")
//!             .property("Id", "Edm.Int32")
//!             .property("Name", "Edm.String")
//!     })
//!     .entity_set("Customers", "Customer", |s| s.conventional("https://example.com/svc"))
//!     .build()
//!     .unwrap();
//!
//! let customer = ResourceBuilder::new("Sales.Customer")
//!     .property("Id", 1)
//!     .property("Name", "Acme")
//!     .into_value();
//!
//! let options = EncodeOptions::default().with_metadata(MetadataLevel::Full);
//! let encoder = ResourceEncoder::new(&model, options);
//! let events = encoder
//!     .encode_resource(&customer, None, &WriteTarget::entity_set("Customers"))
//!     .unwrap();
//!
//! assert!(check_frames(&events).is_ok());
//! match &events[0] {
//!     WriteEvent::StartResource(header) => {
//!         assert_eq!(header.id.as_deref(), Some("https://example.com/svc/Customers(1)"));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```
//!
//! # Modules
//!
//! - [`model`]: Schema, instance values and fluent builders
//! - [`encode`]: The encoder and its type-to-encoder resolution
//! - [`event`]: Write events, sinks and the frame checker
//! - [`projection`]: Selection/expansion requests and projection plans
//! - [`links`]: Link builders, ETags and metadata-level policy
//! - [`delta`]: Change-set narrowing
//! - [`dynamic`]: Open-type and untyped properties
//! - [`convert`]: Primitive conversion and literal formatting
//! - [`error`]: Error types
//! - [`limits`]: Depth limits and well-known names
//!
//! # Streaming
//!
//! Sinks are asynchronous so a bounded transport can apply backpressure; the
//! encoder awaits every event before producing the next one and never runs
//! anything concurrently. [`ResourceEncoder::encode_resource`] records into a
//! `Vec` for callers that do not need streaming.

pub mod context;
pub mod convert;
pub mod delta;
pub mod dynamic;
pub mod encode;
pub mod error;
pub mod event;
pub mod limits;
pub mod links;
pub mod model;
pub mod options;
pub mod projection;
pub mod util;

// Re-export commonly used types at crate root
pub use context::{ResourceContext, WriteContext};
pub use convert::{DefaultPrimitiveConverter, PrimitiveConverter};
pub use encode::{
    DefaultEncoderProvider, EncoderKind, EncoderProvider, ResourceEncoder, ResourceKind,
    WriteTarget,
};
pub use error::{ErrorCode, SerializeError};
pub use event::{
    check_frames, DeletedResourceHeader, EventSink, NestedInfo, OperationLink, RecordingSink,
    ResourceHeader, ResourceSetHeader, TypeAnnotation, WireValue, WriteEvent,
};
pub use links::{
    ConventionLinkBuilder, ETagHandler, HashETagHandler, LinkBuilder, LiteralETagHandler,
};
pub use model::{
    enum_value, DeletedReason, Deletion, DeltaChangeSet, EdmModel, ModelBuilder, NestedChange,
    PrimitiveKind, PrimitiveValue, ResourceBuilder, ResourceInstance, StreamReference, Value,
};
pub use options::{EncodeOptions, MetadataLevel};
pub use projection::{ExpandItem, ExpandOptions, OrderBy, PropertyFilter, SelectExpandRequest, SelectItem};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
