//! Encoding contexts.
//!
//! A [`WriteContext`] carries the ambient state of one position in the
//! graph: model, options, navigation source, active request. It is `Copy`
//! and never mutated; nested positions derive a child context instead, so
//! a sibling always sees exactly the context its parent was given.
//!
//! A [`ResourceContext`] binds one instance to its resolved type.

use std::sync::Arc;

use crate::convert::{format_key, format_literal, PrimitiveConverter};
use crate::error::SerializeError;
use crate::event::WireValue;
use crate::limits::UNTYPED_TYPE_NAME;
use crate::model::{
    EdmModel, NavigationSource, PrimitiveValue, ResourceInstance, StructuralProperty,
    StructuredType, TypeRef, Value,
};
use crate::options::{EncodeOptions, MetadataLevel};
use crate::projection::SelectExpandRequest;

/// Ambient state for writing at one position of the graph.
#[derive(Debug, Clone, Copy)]
pub struct WriteContext<'a> {
    pub model: &'a EdmModel,
    pub options: &'a EncodeOptions,
    pub converter: &'a dyn PrimitiveConverter,
    pub navigation_source: Option<&'a NavigationSource>,
    pub request: Option<&'a Arc<SelectExpandRequest>>,
    /// Type statically known from the path (entity set or declared property).
    pub path_type: Option<&'a str>,
    /// Reached through a containment navigation.
    pub contained: bool,
    /// Write an entity-reference link instead of the resource.
    pub reference_only: bool,
    pub depth: usize,
    /// Property of the parent resource this position was entered through.
    pub via_property: Option<&'a str>,
    pub parent: Option<&'a ResourceContext<'a>>,
}

impl<'a> WriteContext<'a> {
    /// Creates a root context.
    pub fn new(
        model: &'a EdmModel,
        options: &'a EncodeOptions,
        converter: &'a dyn PrimitiveConverter,
    ) -> Self {
        Self {
            model,
            options,
            converter,
            navigation_source: None,
            request: None,
            path_type: None,
            contained: false,
            reference_only: options.reference_only,
            depth: 0,
            via_property: None,
            parent: None,
        }
    }

    pub fn with_navigation_source(mut self, source: Option<&'a NavigationSource>) -> Self {
        self.navigation_source = source;
        self
    }

    pub fn with_request(mut self, request: Option<&'a Arc<SelectExpandRequest>>) -> Self {
        self.request = request;
        self
    }

    pub fn with_path_type(mut self, path_type: Option<&'a str>) -> Self {
        self.path_type = path_type;
        self
    }

    pub fn with_contained(mut self, contained: bool) -> Self {
        self.contained = contained;
        self
    }

    pub fn with_reference_only(mut self, reference_only: bool) -> Self {
        self.reference_only = reference_only;
        self
    }

    /// Context one level deeper, for an item of a top-level resource set.
    pub fn deeper(mut self) -> Self {
        self.depth += 1;
        self
    }

    pub fn metadata(&self) -> MetadataLevel {
        self.options.metadata
    }

    /// True when partial-update payloads are being written.
    pub fn is_delta(&self) -> bool {
        self.options.delta
    }
}

/// One instance bound to its resolved structured type.
#[derive(Debug, Clone, Copy)]
pub struct ResourceContext<'a> {
    pub write: WriteContext<'a>,
    pub instance: &'a ResourceInstance,
    /// `None` for untyped resources.
    pub structured_type: Option<&'a StructuredType>,
}

impl<'a> ResourceContext<'a> {
    pub fn new(
        write: WriteContext<'a>,
        instance: &'a ResourceInstance,
        structured_type: Option<&'a StructuredType>,
    ) -> Self {
        Self {
            write,
            instance,
            structured_type,
        }
    }

    pub fn model(&self) -> &'a EdmModel {
        self.write.model
    }

    pub fn navigation_source(&self) -> Option<&'a NavigationSource> {
        self.write.navigation_source
    }

    /// Runtime type name, `Edm.Untyped` for untyped resources.
    pub fn type_name(&self) -> &'a str {
        self.structured_type
            .map_or(UNTYPED_TYPE_NAME, |t| t.full_name.as_str())
    }

    pub fn is_entity(&self) -> bool {
        self.structured_type.is_some_and(StructuredType::is_entity)
    }

    /// Reads a property value: declared, then dynamic, then computed.
    pub fn property_value(&self, name: &str) -> Option<&'a Value> {
        self.instance
            .property(name)
            .or_else(|| self.instance.dynamic_property(name))
            .or_else(|| self.instance.computed_value(name))
    }

    /// Derives the context for a value nested under `property` of this resource.
    ///
    /// Request, path type, containment and reference-only are reset; the
    /// navigation source is inherited until the caller rebinds it.
    pub fn child(&'a self, property: &'a str) -> WriteContext<'a> {
        WriteContext {
            request: None,
            path_type: None,
            contained: false,
            reference_only: false,
            depth: self.write.depth + 1,
            via_property: Some(property),
            parent: Some(self),
            ..self.write
        }
    }

    /// Slash-separated path from the root resource to `name`.
    pub fn property_path(&self, name: &str) -> String {
        let mut segments = vec![name];
        let mut current = Some(&self.write);
        while let Some(write) = current {
            if let Some(property) = write.via_property {
                segments.push(property);
            }
            current = write.parent.map(|p| &p.write);
        }
        segments.reverse();
        segments.join("/")
    }

    /// Key values converted to their declared kinds, in key order.
    ///
    /// Returns `None` for non-entities and when any key value is missing,
    /// null, or not primitive.
    pub fn key_values(&self) -> Option<Vec<(&'a str, PrimitiveValue)>> {
        let ty = self.structured_type.filter(|t| t.is_entity())?;
        let model = self.model();
        let keys = model.keys_of(ty);
        if keys.is_empty() {
            return None;
        }

        keys.iter()
            .map(|name| {
                let value = self.instance.property(name)?.as_primitive()?;
                let converted = match model.find_property(ty, name).map(|p| &p.type_ref) {
                    Some(TypeRef::Primitive(kind)) => self.write.converter.convert(
                        value,
                        *kind,
                        self.write.options.time_zone_offset_min,
                    )?,
                    _ => value.clone(),
                };
                Some((name.as_str(), converted))
            })
            .collect()
    }

    /// Key segment for URLs, e.g. `(1)` or `(OrderId=1,Line=2)`.
    ///
    /// Returns `None` when a key has no literal form.
    pub fn key_segment(&self) -> Option<String> {
        let keys = self.key_values()?;
        let literals = keys
            .iter()
            .map(|(name, value)| Some((*name, format_literal(value)?)))
            .collect::<Option<Vec<(&str, String)>>>()?;
        Some(format_key(&literals))
    }

    /// Resolves the wire value of a declared, non-structured property.
    ///
    /// The declared type is authoritative: values are converted to the
    /// declared primitive kind and enum members are checked against the
    /// declared enum. A missing or null collection is written empty; a
    /// missing or null single value is refused when the property is not
    /// nullable.
    pub fn resolve_declared(
        &self,
        property: &StructuralProperty,
        value: Option<&Value>,
    ) -> Result<WireValue, SerializeError> {
        match value {
            None | Some(Value::Null) | Some(Value::TypedNull(_)) => {
                if property.type_ref.is_collection() {
                    Ok(WireValue::Collection {
                        type_name: Some(property.type_ref.full_name()),
                        items: Vec::new(),
                    })
                } else if property.nullable {
                    Ok(WireValue::Null)
                } else {
                    Err(SerializeError::UnsupportedValue {
                        property: self.property_path(&property.name),
                        expected: format!("non-null {}", property.type_ref.full_name()),
                        found: value.map_or_else(|| "nothing".to_string(), Value::describe),
                    })
                }
            }
            Some(value) => self.resolve_typed(&property.name, &property.type_ref, value),
        }
    }

    fn resolve_typed(
        &self,
        name: &str,
        type_ref: &TypeRef,
        value: &Value,
    ) -> Result<WireValue, SerializeError> {
        match (type_ref, value) {
            (_, Value::Null | Value::TypedNull(_)) => Ok(WireValue::Null),
            (TypeRef::Primitive(kind), Value::Primitive(p)) => self
                .write
                .converter
                .convert(p, *kind, self.write.options.time_zone_offset_min)
                .map(WireValue::Primitive)
                .ok_or_else(|| self.unsupported(name, type_ref, value)),
            (TypeRef::Enum(enum_name), Value::Enum { member, .. })
            | (TypeRef::Enum(enum_name), Value::Primitive(PrimitiveValue::String(member))) => {
                let enum_type =
                    self.model()
                        .enum_type(enum_name)
                        .ok_or_else(|| SerializeError::UnknownType {
                            type_name: enum_name.clone(),
                        })?;
                if !enum_type.has_member(member) {
                    return Err(SerializeError::UnknownEnumMember {
                        type_name: enum_name.clone(),
                        member: member.clone(),
                    });
                }
                Ok(WireValue::Enum {
                    type_name: Some(enum_name.clone()),
                    member: member.clone(),
                })
            }
            (TypeRef::Collection(element), Value::Collection(items)) => {
                let items = items
                    .iter()
                    .map(|item| self.resolve_typed(name, element, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(WireValue::Collection {
                    type_name: Some(type_ref.full_name()),
                    items,
                })
            }
            (TypeRef::Stream, Value::Stream(stream)) => Ok(WireValue::Stream(stream.clone())),
            _ => Err(self.unsupported(name, type_ref, value)),
        }
    }

    fn unsupported(&self, name: &str, type_ref: &TypeRef, value: &Value) -> SerializeError {
        SerializeError::UnsupportedValue {
            property: self.property_path(name),
            expected: type_ref.full_name(),
            found: value.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::DefaultPrimitiveConverter;
    use crate::model::{enum_value, ModelBuilder, ResourceBuilder};

    fn model() -> EdmModel {
        ModelBuilder::new("Sales")
            .enum_type("Tier", ["Bronze", "Gold"])
            .entity_type("OrderLine", |t| {
                t.key("OrderId")
                    .key("Line")
                    .property("OrderId", "Edm.Int32")
                    .property("Line", "Edm.Int16")
                    .property("Qty", "Edm.Byte")
                    .property("Tier", "Tier")
                    .property("Tags", "Collection(Edm.String)")
                    .property("At", "Edm.DateTimeOffset")
                    .required("Sku", "Edm.String")
                    .required("Notes", "Collection(Edm.String)")
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_composite_key_segment() {
        let model = model();
        let options = EncodeOptions::default();
        let write = WriteContext::new(&model, &options, &DefaultPrimitiveConverter);
        let line = ResourceBuilder::new("Sales.OrderLine")
            .property("OrderId", 10i64)
            .property("Line", 2)
            .build();
        let resource = ResourceContext::new(write, &line, model.structured_type("Sales.OrderLine"));
        assert_eq!(resource.key_segment().as_deref(), Some("(OrderId=10,Line=2)"));
        assert_eq!(
            resource.key_values().unwrap()[1],
            ("Line", PrimitiveValue::Int16(2))
        );

        let partial = ResourceBuilder::new("Sales.OrderLine").property("OrderId", 10).build();
        let resource =
            ResourceContext::new(write, &partial, model.structured_type("Sales.OrderLine"));
        assert_eq!(resource.key_segment(), None);
    }

    #[test]
    fn test_declared_type_is_authoritative() {
        let model = model();
        let options = EncodeOptions::default().with_time_zone_offset(60);
        let write = WriteContext::new(&model, &options, &DefaultPrimitiveConverter);
        let ty = model.structured_type("Sales.OrderLine").unwrap();
        let line = ResourceInstance::typed("Sales.OrderLine");
        let resource = ResourceContext::new(write, &line, Some(ty));
        let prop = |name| model.find_property(ty, name).unwrap();

        assert_eq!(
            resource.resolve_declared(prop("Qty"), Some(&Value::from(7i64))),
            Ok(WireValue::Primitive(PrimitiveValue::Byte(7)))
        );
        let overflow = resource
            .resolve_declared(prop("Qty"), Some(&Value::from(700)))
            .unwrap_err();
        assert!(matches!(
            overflow,
            SerializeError::UnsupportedValue { ref property, .. } if property == "Qty"
        ));
        assert_eq!(
            resource.resolve_declared(prop("Tier"), Some(&enum_value("Sales.Tier", "Gold"))),
            Ok(WireValue::Enum {
                type_name: Some("Sales.Tier".into()),
                member: "Gold".into()
            })
        );
        assert!(matches!(
            resource.resolve_declared(prop("Tier"), Some(&Value::from("Platinum"))),
            Err(SerializeError::UnknownEnumMember { .. })
        ));
        assert_eq!(
            resource.resolve_declared(prop("Tags"), None),
            Ok(WireValue::Collection {
                type_name: Some("Collection(Edm.String)".into()),
                items: vec![]
            })
        );
        let at = PrimitiveValue::DateTimeOffset {
            epoch_us: 0,
            offset_min: 0,
        };
        assert_eq!(
            resource.resolve_declared(prop("At"), Some(&Value::Primitive(at))),
            Ok(WireValue::Primitive(PrimitiveValue::DateTimeOffset {
                epoch_us: 0,
                offset_min: 60
            }))
        );
    }

    #[test]
    fn test_non_nullable_refuses_null() {
        let model = model();
        let options = EncodeOptions::default();
        let write = WriteContext::new(&model, &options, &DefaultPrimitiveConverter);
        let ty = model.structured_type("Sales.OrderLine").unwrap();
        let line = ResourceInstance::typed("Sales.OrderLine");
        let resource = ResourceContext::new(write, &line, Some(ty));
        let prop = |name| model.find_property(ty, name).unwrap();

        for value in [None, Some(&Value::Null)] {
            assert!(matches!(
                resource.resolve_declared(prop("Sku"), value),
                Err(SerializeError::UnsupportedValue { ref property, ref expected, .. })
                    if property == "Sku" && expected == "non-null Edm.String"
            ));
        }
        assert_eq!(
            resource.resolve_declared(prop("Sku"), Some(&Value::from("A-1"))),
            Ok(WireValue::Primitive(PrimitiveValue::String("A-1".into())))
        );
        assert_eq!(resource.resolve_declared(prop("Qty"), None), Ok(WireValue::Null));
        assert_eq!(
            resource.resolve_declared(prop("Notes"), None),
            Ok(WireValue::Collection {
                type_name: Some("Collection(Edm.String)".into()),
                items: vec![]
            })
        );
    }

    #[test]
    fn test_child_contexts_do_not_touch_parent() {
        let model = model();
        let options = EncodeOptions::default();
        let root = WriteContext::new(&model, &options, &DefaultPrimitiveConverter);
        let line = ResourceInstance::typed("Sales.OrderLine");
        let resource = ResourceContext::new(root, &line, model.structured_type("Sales.OrderLine"));

        let child = resource.child("Lines").with_contained(true);
        assert_eq!(child.depth, 1);
        assert!(child.contained);
        assert!(!resource.write.contained);
        assert_eq!(resource.write.depth, 0);

        let nested = ResourceContext::new(child, &line, None);
        assert_eq!(nested.property_path("Qty"), "Lines/Qty");
        assert_eq!(resource.property_path("Qty"), "Qty");
    }
}
