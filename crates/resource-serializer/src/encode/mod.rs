//! Resource encoding.
//!
//! [`ResourceEncoder`] is the entry point: it validates the root value,
//! builds the root context and drives the recursive writer against an
//! [`EventSink`]. A fresh plan cache is created for every top-level call.
//!
//! ```
//! use resource_serializer::{EncodeOptions, ModelBuilder, ResourceBuilder, ResourceEncoder, WriteTarget};
//!
//! let model = ModelBuilder::new("Sales")
//!     .entity_type("Customer", |t| {
//!         t.key("Id").property("Id", "Edm.Int32").property("Name", "Edm.String")
//!     })
//!     .entity_set("Customers", "Customer", |s| s)
//!     .build()
//!     .unwrap();
//! let customer = ResourceBuilder::new("Sales.Customer")
//!     .property("Id", 1)
//!     .property("Name", "Acme")
//!     .into_value();
//!
//! let encoder = ResourceEncoder::new(&model, EncodeOptions::default());
//! let events = encoder
//!     .encode_resource(&customer, None, &WriteTarget::entity_set("Customers"))
//!     .unwrap();
//! assert_eq!(events.len(), 4);
//! ```

pub mod kind;
pub mod provider;
mod writer;

use std::sync::Arc;

use futures::executor::block_on;
use tracing::debug;

use crate::context::WriteContext;
use crate::convert::{DefaultPrimitiveConverter, PrimitiveConverter};
use crate::error::SerializeError;
use crate::event::{EventSink, RecordingSink, ResourceSetHeader, WriteEvent};
use crate::links::ETagHandler;
use crate::model::{EdmModel, NavigationSource, ResourceInstance, Value};
use crate::options::EncodeOptions;
use crate::projection::SelectExpandRequest;

pub use kind::{classify, ResourceKind};
pub use provider::{DefaultEncoderProvider, EncoderKind, EncoderProvider};

use writer::ResourceWriter;

static DEFAULT_PROVIDER: DefaultEncoderProvider = DefaultEncoderProvider;
static DEFAULT_CONVERTER: DefaultPrimitiveConverter = DefaultPrimitiveConverter;

/// Where a top-level value is written: its navigation source and the
/// selection/expansion request that applies to it.
#[derive(Debug, Clone, Default)]
pub struct WriteTarget {
    pub navigation_source: Option<String>,
    pub select_expand: Option<Arc<SelectExpandRequest>>,
}

impl WriteTarget {
    /// A target with no navigation source and full selection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_set(name: impl Into<String>) -> Self {
        Self {
            navigation_source: Some(name.into()),
            select_expand: None,
        }
    }

    pub fn with_select_expand(mut self, request: SelectExpandRequest) -> Self {
        self.select_expand = Some(Arc::new(request));
        self
    }

    /// Uses a shared request; plans are cached per request instance.
    pub fn with_shared_request(mut self, request: Arc<SelectExpandRequest>) -> Self {
        self.select_expand = Some(request);
        self
    }
}

/// Encodes resource graphs into write events.
#[derive(Debug, Clone)]
pub struct ResourceEncoder<'m> {
    model: &'m EdmModel,
    options: EncodeOptions,
    provider: &'m dyn EncoderProvider,
    converter: &'m dyn PrimitiveConverter,
    etag_handler: Option<&'m dyn ETagHandler>,
}

impl<'m> ResourceEncoder<'m> {
    /// Creates an encoder with the default provider and converter and no
    /// ETag handler.
    pub fn new(model: &'m EdmModel, options: EncodeOptions) -> Self {
        Self {
            model,
            options,
            provider: &DEFAULT_PROVIDER,
            converter: &DEFAULT_CONVERTER,
            etag_handler: None,
        }
    }

    pub fn with_provider(mut self, provider: &'m dyn EncoderProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_converter(mut self, converter: &'m dyn PrimitiveConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_etag_handler(mut self, handler: &'m dyn ETagHandler) -> Self {
        self.etag_handler = Some(handler);
        self
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Writes one resource.
    ///
    /// `expected_type` defaults to the entity type of the target's
    /// navigation source. On error the sink holds a partial, unbalanced
    /// message that must be discarded.
    pub async fn write_resource<W>(
        &self,
        value: &Value,
        expected_type: Option<&str>,
        target: &WriteTarget,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let instance = root_instance(value)?;
        let source = self.navigation_source(target)?;
        let expected = expected_type.or(source.map(|s| s.entity_type.as_str()));
        debug!(
            expected = expected.unwrap_or("<none>"),
            source = source.map_or("<none>", |s| s.name.as_str()),
            metadata = ?self.options.metadata,
            delta = self.options.delta,
            "encoding resource"
        );

        let writer = self.writer();
        let ctx = self.root_context(source, target, expected);
        writer.write_resource(instance, expected, ctx, sink).await?;
        debug!(plans = writer.plan_count(), "resource encoded");
        Ok(())
    }

    /// Writes a top-level resource set.
    pub async fn write_resource_set<W>(
        &self,
        values: &[Value],
        expected_type: Option<&str>,
        target: &WriteTarget,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let source = self.navigation_source(target)?;
        let expected = expected_type.or(source.map(|s| s.entity_type.as_str()));
        debug!(
            expected = expected.unwrap_or("<none>"),
            items = values.len(),
            "encoding resource set"
        );

        let writer = self.writer();
        let ctx = self.root_context(source, target, expected).deeper();
        sink.write_event(WriteEvent::StartResourceSet(ResourceSetHeader {
            type_name: expected.map(|t| format!("Collection({})", t)),
            count: None,
        }))
        .await?;
        for value in values {
            let instance = root_instance(value)?;
            writer
                .write_resource(instance, expected, ctx, &mut *sink)
                .await?;
        }
        sink.write_event(WriteEvent::EndResourceSet).await?;
        debug!(plans = writer.plan_count(), "resource set encoded");
        Ok(())
    }

    /// Writes the entity-reference link of one resource.
    pub async fn write_entity_reference<W>(
        &self,
        value: &Value,
        expected_type: Option<&str>,
        target: &WriteTarget,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let instance = root_instance(value)?;
        let source = self.navigation_source(target)?;
        let expected = expected_type.or(source.map(|s| s.entity_type.as_str()));

        let writer = self.writer();
        let ctx = self
            .root_context(source, target, expected)
            .with_reference_only(true);
        writer.write_resource(instance, expected, ctx, sink).await
    }

    /// Writes a set of entity-reference links.
    pub async fn write_entity_references<W>(
        &self,
        values: &[Value],
        expected_type: Option<&str>,
        target: &WriteTarget,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let source = self.navigation_source(target)?;
        let expected = expected_type.or(source.map(|s| s.entity_type.as_str()));

        let writer = self.writer();
        let ctx = self
            .root_context(source, target, expected)
            .with_reference_only(true)
            .deeper();
        sink.write_event(WriteEvent::StartResourceSet(ResourceSetHeader {
            type_name: None,
            count: None,
        }))
        .await?;
        for value in values {
            let instance = root_instance(value)?;
            writer
                .write_resource(instance, expected, ctx, &mut *sink)
                .await?;
        }
        sink.write_event(WriteEvent::EndResourceSet).await
    }

    /// Encodes one resource into a recorded event list.
    pub fn encode_resource(
        &self,
        value: &Value,
        expected_type: Option<&str>,
        target: &WriteTarget,
    ) -> Result<Vec<WriteEvent>, SerializeError> {
        let mut sink = RecordingSink::new();
        block_on(self.write_resource(value, expected_type, target, &mut sink))?;
        Ok(sink.into_events())
    }

    /// Encodes a resource set into a recorded event list.
    pub fn encode_resource_set(
        &self,
        values: &[Value],
        expected_type: Option<&str>,
        target: &WriteTarget,
    ) -> Result<Vec<WriteEvent>, SerializeError> {
        let mut sink = RecordingSink::new();
        block_on(self.write_resource_set(values, expected_type, target, &mut sink))?;
        Ok(sink.into_events())
    }

    fn writer(&self) -> ResourceWriter<'m> {
        ResourceWriter::new(self.model, self.provider, self.etag_handler)
    }

    fn navigation_source(
        &self,
        target: &WriteTarget,
    ) -> Result<Option<&'m NavigationSource>, SerializeError> {
        target
            .navigation_source
            .as_deref()
            .map(|name| {
                self.model.navigation_source(name).ok_or_else(|| {
                    SerializeError::UnknownNavigationSource {
                        name: name.to_string(),
                    }
                })
            })
            .transpose()
    }

    fn root_context<'a>(
        &'a self,
        source: Option<&'a NavigationSource>,
        target: &'a WriteTarget,
        expected: Option<&'a str>,
    ) -> WriteContext<'a> {
        WriteContext::new(self.model, &self.options, self.converter)
            .with_navigation_source(source)
            .with_request(target.select_expand.as_ref())
            .with_path_type(expected)
    }
}

/// Validates a top-level value.
fn root_instance(value: &Value) -> Result<&ResourceInstance, SerializeError> {
    match value {
        Value::Resource(instance) => Ok(instance),
        Value::Null => Err(SerializeError::NullResource),
        Value::TypedNull(type_name) => Err(SerializeError::NullComplexSentinel {
            type_name: type_name.clone(),
        }),
        other => Err(SerializeError::NotStructured {
            type_name: other.describe(),
        }),
    }
}
