//! The recursive resource writer.
//!
//! One [`ResourceWriter`] lives for one top-level call and owns that call's
//! plan cache. Every resource goes through [`ResourceWriter::write_resource`],
//! which resolves the runtime type, classifies the instance once and
//! dispatches. Everything that can fail for a resource (value conversion,
//! dynamic collisions, link and ETag computation) is resolved before its
//! start event is written.

use futures::future::LocalBoxFuture;
use tracing::{debug, trace};

use crate::context::{ResourceContext, WriteContext};
use crate::delta::{changed_navigations, narrow_plan};
use crate::dynamic::{
    collect_dynamic, infer_structured_type, is_structured_value, resolve_untyped_value,
};
use crate::encode::kind::{classify, ResourceKind};
use crate::encode::provider::{EncoderKind, EncoderProvider};
use crate::error::SerializeError;
use crate::event::{
    DeletedResourceHeader, EventSink, NestedInfo, ResourceHeader, ResourceSetHeader,
    TypeAnnotation, WireValue, WriteEvent,
};
use crate::links::{
    complex_type_annotation, compute_etag, entity_type_annotation, navigation_link_url,
    operation_link, ETagHandler, LinkBuilder,
};
use crate::model::{
    DeltaChangeSet, Deletion, EdmModel, NavigationProperty, NavigationSource, NestedChange,
    OperationKind, ResourceInstance, StreamReference, StructuredType, TypeRef, Value,
};
use crate::options::MetadataLevel;
use crate::projection::{
    apply_expand_options, ExpandOptions, PlanCache, ProjectionPlan, SelectedComplex,
};

/// Shape of one nested frame's content.
#[derive(Debug, Clone, Copy)]
struct Nested<'n> {
    name: &'n str,
    collection: bool,
    expected: Option<&'n str>,
    options: Option<&'n ExpandOptions>,
}

/// A declared untyped property, resolved ahead of the start event.
enum UntypedEntry<'v> {
    Scalar(WriteEvent),
    Nested { name: String, value: &'v Value },
}

pub(crate) struct ResourceWriter<'e> {
    model: &'e EdmModel,
    provider: &'e dyn EncoderProvider,
    etag_handler: Option<&'e dyn ETagHandler>,
    plans: PlanCache,
}

impl<'e> ResourceWriter<'e> {
    pub(crate) fn new(
        model: &'e EdmModel,
        provider: &'e dyn EncoderProvider,
        etag_handler: Option<&'e dyn ETagHandler>,
    ) -> Self {
        Self {
            model,
            provider,
            etag_handler,
            plans: PlanCache::new(),
        }
    }

    /// Number of projection plans resolved by this call.
    pub(crate) fn plan_count(&self) -> usize {
        self.plans.len()
    }

    /// Writes one resource (or its reference link, or its deleted frame).
    pub(crate) fn write_resource<'s, W>(
        &'s self,
        instance: &'s ResourceInstance,
        expected: Option<&'s str>,
        ctx: WriteContext<'s>,
        sink: &'s mut W,
    ) -> LocalBoxFuture<'s, Result<(), SerializeError>>
    where
        W: EventSink + ?Sized + 's,
    {
        Box::pin(async move {
            if ctx.depth > ctx.options.max_depth {
                return Err(SerializeError::DepthExceeded {
                    max: ctx.options.max_depth,
                });
            }

            let ty = self.resolve_type(instance, expected)?;
            let ctx = self.rebind(ctx, instance)?;
            let kind = classify(&ctx, instance, ty);
            let resource = ResourceContext::new(ctx, instance, ty);
            debug!(
                type_name = resource.type_name(),
                kind = ?kind,
                depth = ctx.depth,
                "writing resource"
            );

            match kind {
                ResourceKind::Reference => {
                    let url = entity_id(&resource)?;
                    sink.write_event(WriteEvent::EntityReferenceLink { url })
                        .await
                }
                ResourceKind::Deleted(deletion) => {
                    self.write_deleted(&resource, deletion, sink).await
                }
                ResourceKind::Delta(changes) => {
                    let plan = self.plans.get_or_resolve(self.model, ty, ctx.request);
                    let narrowed = narrow_plan(self.model, ty, &plan, changes);
                    self.write_entry(&resource, &narrowed, Some(changes), sink)
                        .await
                }
                ResourceKind::Untyped | ResourceKind::Open | ResourceKind::Plain => {
                    let plan = self.plans.get_or_resolve(self.model, ty, ctx.request);
                    self.write_entry(&resource, &plan, None, sink).await
                }
            }
        })
    }

    /// Resolves the structured type to write `instance` as.
    ///
    /// The runtime type wins when it derives from the expected type. Without
    /// an expected type an unknown runtime type degrades to untyped.
    fn resolve_type(
        &self,
        instance: &ResourceInstance,
        expected: Option<&str>,
    ) -> Result<Option<&'e StructuredType>, SerializeError> {
        let expected_type = match expected {
            None => None,
            Some(name) => {
                let type_ref =
                    self.model
                        .type_ref(name)
                        .ok_or_else(|| SerializeError::UnknownType {
                            type_name: name.to_string(),
                        })?;
                match self.provider.encoder_for(self.model, &type_ref) {
                    Some(EncoderKind::Untyped) => None,
                    Some(EncoderKind::Resource) => type_ref
                        .structured_name()
                        .and_then(|n| self.model.structured_type(n)),
                    Some(_) => {
                        return Err(SerializeError::NotStructured {
                            type_name: name.to_string(),
                        })
                    }
                    None => {
                        return Err(SerializeError::NoEncoder {
                            type_name: name.to_string(),
                        })
                    }
                }
            }
        };

        let Some(runtime) = instance.type_name.as_deref() else {
            return Ok(expected_type);
        };
        match (infer_structured_type(self.model, instance), expected_type) {
            (None, None) => {
                debug!(runtime, "runtime type not in model, writing untyped");
                Ok(None)
            }
            (None, Some(_)) => Err(SerializeError::UnknownType {
                type_name: runtime.to_string(),
            }),
            (Some(runtime_type), Some(expected_type))
                if !self.model.is_derived_from(runtime_type, expected_type) =>
            {
                Err(SerializeError::TypeNotDerived {
                    runtime: runtime_type.full_name.clone(),
                    expected: expected_type.full_name.clone(),
                })
            }
            (Some(runtime_type), _) => Ok(Some(runtime_type)),
        }
    }

    /// Binds the navigation source an instance carries itself.
    fn rebind<'s>(
        &'s self,
        ctx: WriteContext<'s>,
        instance: &ResourceInstance,
    ) -> Result<WriteContext<'s>, SerializeError> {
        let Some(name) = instance.navigation_source.as_deref() else {
            return Ok(ctx);
        };
        let source = self.model.navigation_source(name).ok_or_else(|| {
            SerializeError::UnknownNavigationSource {
                name: name.to_string(),
            }
        })?;
        trace!(source = name, "instance carries its own navigation source");
        Ok(ctx
            .with_navigation_source(Some(source))
            .with_path_type(Some(source.entity_type.as_str()))
            .with_contained(false))
    }

    async fn write_deleted<W>(
        &self,
        resource: &ResourceContext<'_>,
        deletion: &Deletion,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let id = match &deletion.id {
            Some(id) => id.clone(),
            None => entity_id(resource)?,
        };
        let plan = resource
            .structured_type
            .map(|ty| ProjectionPlan::key_only(self.model, ty))
            .unwrap_or_default();
        let properties = self.property_bag(resource, &plan, &[], true)?;

        sink.write_event(WriteEvent::StartDeletedResource(DeletedResourceHeader {
            id,
            reason: deletion.reason,
            type_name: resource.structured_type.map(|t| t.full_name.clone()),
        }))
        .await?;
        for event in properties {
            sink.write_event(event).await?;
        }
        sink.write_event(WriteEvent::EndResource).await
    }

    async fn write_entry<W>(
        &self,
        resource: &ResourceContext<'_>,
        plan: &ProjectionPlan,
        changes: Option<&DeltaChangeSet>,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let dynamic = collect_dynamic(
            self.model,
            resource.structured_type,
            resource.instance,
            &plan.dynamic,
        )?;
        for (name, value) in &dynamic.deferred {
            check_nested_shape(resource, name, value)?;
        }
        let header = self.header(resource, plan)?;
        let properties = self.property_bag(resource, plan, &dynamic.scalars, false)?;
        let untyped = self.untyped_entries(resource, plan)?;
        let streams = self.stream_properties(resource, plan, header.edit_link.as_deref())?;

        sink.write_event(WriteEvent::StartResource(header)).await?;
        for event in properties {
            sink.write_event(event).await?;
        }
        for entry in untyped {
            match entry {
                UntypedEntry::Scalar(event) => sink.write_event(event).await?,
                UntypedEntry::Nested { name, value } => {
                    self.write_untyped_nested(resource, &name, value, sink)
                        .await?
                }
            }
        }
        for event in streams {
            sink.write_event(event).await?;
        }
        for selected in &plan.complex {
            self.write_complex(resource, selected, sink).await?;
        }
        for (name, value) in &dynamic.deferred {
            self.write_untyped_nested(resource, name, value, sink).await?;
        }
        match changes {
            Some(changes) => self.write_changed_navigations(resource, changes, sink).await?,
            None => self.write_navigations(resource, plan, sink).await?,
        }
        sink.write_event(WriteEvent::EndResource).await
    }

    fn header(
        &self,
        resource: &ResourceContext<'_>,
        plan: &ProjectionPlan,
    ) -> Result<ResourceHeader, SerializeError> {
        let level = resource.write.metadata();
        let mut header = ResourceHeader::new(resource.type_name());

        let ty = match resource.structured_type {
            None => {
                header.type_annotation = match level {
                    MetadataLevel::None => TypeAnnotation::Suppressed,
                    _ => TypeAnnotation::TransportDefault,
                };
                return Ok(header);
            }
            Some(ty) if !ty.is_entity() => {
                header.type_annotation = complex_type_annotation(level, &ty.full_name);
                return Ok(header);
            }
            Some(ty) => ty,
        };

        let builder = link_builder(resource);
        if let Some(builder) = builder {
            header.id = builder.build_id(resource);
            header.edit_link = builder.build_edit_link(resource);
            header.read_link = builder.build_read_link(resource);
        }
        header.etag = compute_etag(resource, self.etag_handler)?;
        header.type_annotation =
            entity_type_annotation(level, &ty.full_name, resource.write.path_type);

        for name in &plan.operations {
            let Some(operation) = self.model.operation(name) else {
                continue;
            };
            if let Some(link) = operation_link(level, builder, resource, operation) {
                match operation.kind {
                    OperationKind::Action => header.actions.push(link),
                    OperationKind::Function => header.functions.push(link),
                }
            }
        }
        Ok(header)
    }

    /// Declared values, then computed values, then dynamic scalars.
    ///
    /// Streams and untyped declared properties are written after the bag.
    fn property_bag(
        &self,
        resource: &ResourceContext<'_>,
        plan: &ProjectionPlan,
        dynamic_scalars: &[(&str, &Value)],
        present_only: bool,
    ) -> Result<Vec<WriteEvent>, SerializeError> {
        let mut events = Vec::with_capacity(plan.structural.len() + dynamic_scalars.len());

        if let Some(ty) = resource.structured_type {
            for name in &plan.structural {
                let Some(property) = self.model.find_property(ty, name) else {
                    continue;
                };
                if matches!(property.type_ref.element(), TypeRef::Stream | TypeRef::Untyped) {
                    continue;
                }
                let value = resource.instance.property(name);
                if present_only && value.is_none() {
                    continue;
                }
                events.push(WriteEvent::Property {
                    name: name.clone(),
                    value: resource.resolve_declared(property, value)?,
                });
            }
        }

        for name in &plan.computed {
            if let Some(value) = resource.instance.computed_value(name) {
                events.push(WriteEvent::Property {
                    name: name.clone(),
                    value: resolve_untyped_value(resource, name, value)?,
                });
            }
        }

        for (name, value) in dynamic_scalars {
            events.push(WriteEvent::Property {
                name: name.to_string(),
                value: resolve_untyped_value(resource, name, value)?,
            });
        }
        Ok(events)
    }

    /// Declared `Edm.Untyped` properties, each typed from its runtime value.
    fn untyped_entries<'v>(
        &self,
        resource: &ResourceContext<'v>,
        plan: &ProjectionPlan,
    ) -> Result<Vec<UntypedEntry<'v>>, SerializeError> {
        let Some(ty) = resource.structured_type else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        for name in &plan.structural {
            let Some(property) = self.model.find_property(ty, name) else {
                continue;
            };
            if !property.type_ref.element().is_untyped() {
                continue;
            }
            let entry = match resource.instance.property(name) {
                Some(value) if is_structured_value(value) => {
                    check_nested_shape(resource, name, value)?;
                    UntypedEntry::Nested {
                        name: name.clone(),
                        value,
                    }
                }
                Some(value) if !value.is_null() => UntypedEntry::Scalar(WriteEvent::Property {
                    name: name.clone(),
                    value: resolve_untyped_value(resource, name, value)?,
                }),
                value => UntypedEntry::Scalar(WriteEvent::Property {
                    name: name.clone(),
                    value: resource.resolve_declared(property, value)?,
                }),
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Stream properties, written under full metadata only.
    ///
    /// A stream with no value gets convention links below the edit link.
    fn stream_properties(
        &self,
        resource: &ResourceContext<'_>,
        plan: &ProjectionPlan,
        edit_link: Option<&str>,
    ) -> Result<Vec<WriteEvent>, SerializeError> {
        let Some(ty) = resource.structured_type else {
            return Ok(Vec::new());
        };
        if resource.write.metadata() != MetadataLevel::Full {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for name in &plan.structural {
            let Some(property) = self.model.find_property(ty, name) else {
                continue;
            };
            if !matches!(property.type_ref, TypeRef::Stream) {
                continue;
            }
            let stream = match resource.instance.property(name) {
                Some(Value::Stream(stream)) => stream.clone(),
                None | Some(Value::Null) | Some(Value::TypedNull(_)) => match edit_link {
                    Some(link) => {
                        let url = format!("{}/{}", link, name);
                        StreamReference {
                            read_link: Some(url.clone()),
                            edit_link: Some(url),
                            ..StreamReference::default()
                        }
                    }
                    None => continue,
                },
                Some(other) => {
                    return Err(SerializeError::UnsupportedValue {
                        property: resource.property_path(name),
                        expected: "Edm.Stream".to_string(),
                        found: other.describe(),
                    })
                }
            };
            events.push(WriteEvent::Property {
                name: name.clone(),
                value: WireValue::Stream(stream),
            });
        }
        Ok(events)
    }

    async fn write_complex<W>(
        &self,
        resource: &ResourceContext<'_>,
        selected: &SelectedComplex,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let Some(property) = resource
            .structured_type
            .and_then(|ty| self.model.find_property(ty, &selected.name))
        else {
            return Ok(());
        };
        self.ensure_encoder(&property.type_ref)?;

        let collection = property.type_ref.is_collection();
        let element = property.type_ref.structured_name();
        let ctx = resource
            .child(&property.name)
            .with_request(selected.request.as_ref())
            .with_path_type(element);
        let nested = Nested {
            name: &property.name,
            collection,
            expected: element,
            options: None,
        };

        start_nested_info(sink, &property.name, collection, None).await?;
        self.write_nested_content(
            ctx,
            nested,
            collection.then(|| property.type_ref.full_name()),
            resource.instance.property(&property.name),
            sink,
        )
        .await?;
        sink.write_event(WriteEvent::EndNestedInfo).await
    }

    /// Structured value with no declared type: a dynamic property, or a
    /// declared `Edm.Untyped` property holding resources.
    async fn write_untyped_nested<W>(
        &self,
        resource: &ResourceContext<'_>,
        name: &str,
        value: &Value,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let collection = matches!(value, Value::Collection(_));
        let ctx = resource.child(name).with_navigation_source(None);
        let nested = Nested {
            name,
            collection,
            expected: None,
            options: None,
        };

        start_nested_info(sink, name, collection, None).await?;
        self.write_nested_content(ctx, nested, None, Some(value), sink)
            .await?;
        sink.write_event(WriteEvent::EndNestedInfo).await
    }

    async fn write_navigations<W>(
        &self,
        resource: &ResourceContext<'_>,
        plan: &ProjectionPlan,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let Some(ty) = resource.structured_type else {
            return Ok(());
        };
        let level = resource.write.metadata();
        let builder = link_builder(resource);

        for name in &plan.navigation_links {
            let Some(navigation) = self.model.find_navigation(ty, name) else {
                continue;
            };
            let url = navigation_link_url(level, builder, resource, navigation);
            start_nested_info(sink, name, navigation.collection, url).await?;
            sink.write_event(WriteEvent::EndNestedInfo).await?;
        }

        for expanded in &plan.expanded {
            let Some(navigation) = self.model.find_navigation(ty, &expanded.name) else {
                continue;
            };
            self.ensure_encoder(&navigation.type_ref())?;
            let url = navigation_link_url(level, builder, resource, navigation);
            let ctx = self
                .navigation_context(resource, navigation)
                .with_request(expanded.request.as_ref());
            let nested = Nested {
                name: &navigation.name,
                collection: navigation.collection,
                expected: Some(navigation.target_type.as_str()),
                options: Some(&expanded.options),
            };

            start_nested_info(sink, &navigation.name, navigation.collection, url).await?;
            self.write_nested_content(
                ctx,
                nested,
                navigation
                    .collection
                    .then(|| navigation.type_ref().full_name()),
                resource.instance.property(&navigation.name),
                sink,
            )
            .await?;
            sink.write_event(WriteEvent::EndNestedInfo).await?;
        }

        for name in &plan.references {
            let Some(navigation) = self.model.find_navigation(ty, name) else {
                continue;
            };
            let url = navigation_link_url(level, builder, resource, navigation);
            let ctx = self
                .navigation_context(resource, navigation)
                .with_reference_only(true);
            let expected = Some(navigation.target_type.as_str());

            start_nested_info(sink, name, navigation.collection, url).await?;
            match resource.instance.property(name) {
                None | Some(Value::Null) | Some(Value::TypedNull(_)) => {}
                Some(Value::Resource(target)) => {
                    self.write_resource(target, expected, ctx, &mut *sink)
                        .await?
                }
                Some(Value::Collection(items)) => {
                    for item in items {
                        match item {
                            Value::Resource(target) => {
                                self.write_resource(target, expected, ctx, &mut *sink)
                                    .await?
                            }
                            Value::Null | Value::TypedNull(_) => {}
                            other => return Err(nested_error(&ctx, name, "a resource", other)),
                        }
                    }
                }
                Some(other) => return Err(nested_error(&ctx, name, "a resource", other)),
            }
            sink.write_event(WriteEvent::EndNestedInfo).await?;
        }
        Ok(())
    }

    /// Delta mode: only navigations the change set reports.
    async fn write_changed_navigations<W>(
        &self,
        resource: &ResourceContext<'_>,
        changes: &DeltaChangeSet,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        let Some(ty) = resource.structured_type else {
            return Ok(());
        };
        for (navigation, change) in changed_navigations(self.model, ty, changes) {
            self.ensure_encoder(&navigation.type_ref())?;
            let value = match change {
                NestedChange::Changed => resource.instance.property(&navigation.name),
                NestedChange::Payload(value) => Some(value),
            };
            let ctx = self.navigation_context(resource, navigation);
            let nested = Nested {
                name: &navigation.name,
                collection: navigation.collection,
                expected: Some(navigation.target_type.as_str()),
                options: None,
            };

            start_nested_info(sink, &navigation.name, navigation.collection, None).await?;
            self.write_nested_content(
                ctx,
                nested,
                navigation
                    .collection
                    .then(|| navigation.type_ref().full_name()),
                value,
                sink,
            )
            .await?;
            sink.write_event(WriteEvent::EndNestedInfo).await?;
        }
        Ok(())
    }

    /// Writes the content of a nested info: a resource set for collections,
    /// a resource or a null marker otherwise.
    async fn write_nested_content<W>(
        &self,
        ctx: WriteContext<'_>,
        nested: Nested<'_>,
        set_type: Option<String>,
        value: Option<&Value>,
        sink: &mut W,
    ) -> Result<(), SerializeError>
    where
        W: EventSink + ?Sized,
    {
        if !nested.collection {
            return match value {
                None | Some(Value::Null) | Some(Value::TypedNull(_)) => {
                    sink.write_event(WriteEvent::NullResource).await
                }
                Some(Value::Resource(instance)) => {
                    self.write_resource(instance, nested.expected, ctx, &mut *sink)
                        .await
                }
                Some(other) => Err(nested_error(&ctx, nested.name, "a resource", other)),
            };
        }

        let items: &[Value] = match value {
            None | Some(Value::Null) | Some(Value::TypedNull(_)) => &[],
            Some(Value::Collection(items)) => items,
            Some(other) => return Err(nested_error(&ctx, nested.name, "a collection", other)),
        };
        let (items, count) = match nested.options {
            Some(options) if !options.is_identity() => apply_expand_options(items, options),
            _ => (items.iter().collect(), None),
        };

        sink.write_event(WriteEvent::StartResourceSet(ResourceSetHeader {
            type_name: set_type,
            count,
        }))
        .await?;
        for item in items {
            match item {
                Value::Resource(instance) => {
                    self.write_resource(instance, nested.expected, ctx, &mut *sink)
                        .await?
                }
                Value::Null | Value::TypedNull(_) => {
                    sink.write_event(WriteEvent::NullResource).await?
                }
                other => return Err(nested_error(&ctx, nested.name, "a resource", other)),
            }
        }
        sink.write_event(WriteEvent::EndResourceSet).await
    }

    /// Context for the target of a navigation property.
    fn navigation_context<'a>(
        &'a self,
        resource: &'a ResourceContext<'a>,
        navigation: &'a NavigationProperty,
    ) -> WriteContext<'a> {
        resource
            .child(&navigation.name)
            .with_navigation_source(
                self.model
                    .navigation_target(resource.navigation_source(), navigation),
            )
            .with_path_type(Some(navigation.target_type.as_str()))
            .with_contained(navigation.contains_target)
    }

    fn ensure_encoder(&self, type_ref: &TypeRef) -> Result<EncoderKind, SerializeError> {
        self.provider
            .encoder_for(self.model, type_ref)
            .ok_or_else(|| SerializeError::NoEncoder {
                type_name: type_ref.full_name(),
            })
    }
}

/// Link builder of the resource's navigation source, unless the resource
/// was reached through containment.
fn link_builder<'a>(resource: &ResourceContext<'a>) -> Option<&'a (dyn LinkBuilder + Send + Sync)> {
    if resource.write.contained {
        return None;
    }
    resource
        .navigation_source()
        .and_then(NavigationSource::link_builder)
}

fn entity_id(resource: &ResourceContext<'_>) -> Result<String, SerializeError> {
    link_builder(resource)
        .and_then(|builder| builder.build_id(resource))
        .ok_or_else(|| SerializeError::MissingEntityId {
            type_name: resource.type_name().to_string(),
        })
}

/// Rejects collections mixing resources with scalar values.
fn check_nested_shape(
    resource: &ResourceContext<'_>,
    name: &str,
    value: &Value,
) -> Result<(), SerializeError> {
    if let Value::Collection(items) = value {
        if let Some(scalar) = items
            .iter()
            .find(|item| !matches!(item, Value::Resource(_)) && !item.is_null())
        {
            return Err(SerializeError::UnsupportedValue {
                property: resource.property_path(name),
                expected: "a collection of resources".to_string(),
                found: scalar.describe(),
            });
        }
    }
    Ok(())
}

fn nested_error(ctx: &WriteContext<'_>, name: &str, expected: &str, found: &Value) -> SerializeError {
    SerializeError::UnsupportedValue {
        property: ctx
            .parent
            .map_or_else(|| name.to_string(), |parent| parent.property_path(name)),
        expected: expected.to_string(),
        found: found.describe(),
    }
}

async fn start_nested_info<W>(
    sink: &mut W,
    name: &str,
    is_collection: bool,
    url: Option<String>,
) -> Result<(), SerializeError>
where
    W: EventSink + ?Sized,
{
    sink.write_event(WriteEvent::StartNestedInfo(NestedInfo {
        name: name.to_string(),
        is_collection,
        url,
    }))
    .await
}
