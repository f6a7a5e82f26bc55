//! Open-type and untyped property handling.
//!
//! Dynamic scalars (primitive, enum, collections of those) are merged into
//! the property bag of the resource header. Structured dynamic values
//! (resources, collections containing resources) are deferred and written
//! as nested content after the header.

use rustc_hash::FxHashSet;
use tracing::warn;

use crate::context::ResourceContext;
use crate::error::SerializeError;
use crate::event::WireValue;
use crate::model::{EdmModel, PrimitiveValue, ResourceInstance, StructuredType, Value};
use crate::projection::DynamicSelection;

/// Selected dynamic properties of one resource, split by shape.
#[derive(Debug, Default)]
pub struct DynamicProperties<'v> {
    pub scalars: Vec<(&'v str, &'v Value)>,
    pub deferred: Vec<(&'v str, &'v Value)>,
}

/// Returns true for values that cannot be flattened into a property bag.
pub fn is_structured_value(value: &Value) -> bool {
    match value {
        Value::Resource(_) => true,
        Value::Collection(items) => items.iter().any(|item| matches!(item, Value::Resource(_))),
        _ => false,
    }
}

/// Collects the dynamic properties of an open or untyped resource.
///
/// Every dynamic name is checked against the declared properties before
/// selection applies; a collision is fatal. On open types, undeclared names
/// in the declared bag count as dynamic too. A name present in both bags is
/// taken once, from the declared bag. Closed types contribute nothing.
pub fn collect_dynamic<'v>(
    model: &EdmModel,
    ty: Option<&StructuredType>,
    instance: &'v ResourceInstance,
    selection: &DynamicSelection,
) -> Result<DynamicProperties<'v>, SerializeError> {
    let candidates: Vec<&'v (String, Value)> = match ty {
        None => instance
            .properties
            .iter()
            .chain(instance.dynamic_properties.iter())
            .collect(),
        Some(ty) if model.is_open(ty) => {
            if let Some((name, _)) = instance
                .dynamic_properties
                .iter()
                .find(|(name, _)| model.is_declared(ty, name))
            {
                return Err(SerializeError::DynamicPropertyConflict {
                    type_name: ty.full_name.clone(),
                    name: name.clone(),
                });
            }
            instance
                .properties
                .iter()
                .filter(|(name, _)| !model.is_declared(ty, name))
                .chain(instance.dynamic_properties.iter())
                .collect()
        }
        Some(_) => return Ok(DynamicProperties::default()),
    };

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut dynamic = DynamicProperties::default();
    for (name, value) in candidates {
        if !seen.insert(name.as_str()) || !selection.includes(name) {
            continue;
        }
        if is_structured_value(value) {
            dynamic.deferred.push((name.as_str(), value));
        } else {
            dynamic.scalars.push((name.as_str(), value));
        }
    }
    Ok(dynamic)
}

/// Resolves the wire value of a property with no declared type.
///
/// Primitives go through the same conversion as declared properties, keeping
/// their runtime kind. Enum values are typed against the model when their
/// type and member are known and otherwise degrade to the bare member name.
pub fn resolve_untyped_value(
    resource: &ResourceContext<'_>,
    name: &str,
    value: &Value,
) -> Result<WireValue, SerializeError> {
    let write = &resource.write;
    match value {
        Value::Null | Value::TypedNull(_) => Ok(WireValue::Null),
        Value::Primitive(p) => write
            .converter
            .convert(p, p.kind(), write.options.time_zone_offset_min)
            .map(WireValue::Primitive)
            .ok_or_else(|| unsupported(resource, name, p.kind().name(), value)),
        Value::Enum { type_name, member } => {
            let known = type_name
                .as_deref()
                .and_then(|t| resource.model().enum_type(t))
                .filter(|e| e.has_member(member));
            match known {
                Some(enum_type) => Ok(WireValue::Enum {
                    type_name: Some(enum_type.full_name.clone()),
                    member: member.clone(),
                }),
                None => {
                    warn!(
                        property = name,
                        enum_type = type_name.as_deref().unwrap_or("<none>"),
                        member = member.as_str(),
                        "enum value has no model match, writing bare member name"
                    );
                    Ok(WireValue::Primitive(PrimitiveValue::String(member.clone())))
                }
            }
        }
        Value::Collection(items) => {
            let items = items
                .iter()
                .map(|item| resolve_untyped_value(resource, name, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(WireValue::Collection {
                type_name: collection_type_name(&items),
                items,
            })
        }
        Value::Stream(stream) => Ok(WireValue::Stream(stream.clone())),
        Value::Resource(_) => Err(unsupported(resource, name, "a scalar", value)),
    }
}

/// Collection type name when every item shares one element type.
fn collection_type_name(items: &[WireValue]) -> Option<String> {
    let element = |item: &WireValue| -> Option<String> {
        match item {
            WireValue::Primitive(p) => Some(p.kind().name().to_string()),
            WireValue::Enum {
                type_name: Some(t), ..
            } => Some(t.clone()),
            _ => None,
        }
    };
    let first = element(items.first()?)?;
    items
        .iter()
        .all(|item| element(item).as_deref() == Some(first.as_str()))
        .then(|| format!("Collection({})", first))
}

/// Best-effort model type of a resource with no declared type.
///
/// Ambiguous cases (no type name, or a name the model does not declare)
/// get no further structural typing.
pub fn infer_structured_type<'m>(
    model: &'m EdmModel,
    instance: &ResourceInstance,
) -> Option<&'m StructuredType> {
    instance
        .type_name
        .as_deref()
        .and_then(|name| model.structured_type(name))
}

fn unsupported(
    resource: &ResourceContext<'_>,
    name: &str,
    expected: &str,
    value: &Value,
) -> SerializeError {
    SerializeError::UnsupportedValue {
        property: resource.property_path(name),
        expected: expected.to_string(),
        found: value.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WriteContext;
    use crate::convert::DefaultPrimitiveConverter;
    use crate::model::{enum_value, ModelBuilder, ResourceBuilder};
    use crate::options::EncodeOptions;

    fn model() -> EdmModel {
        ModelBuilder::new("Sales")
            .enum_type("Tier", ["Bronze", "Gold"])
            .entity_type("Customer", |t| {
                t.key("Id")
                    .open()
                    .property("Id", "Edm.Int32")
                    .property("Name", "Edm.String")
            })
            .entity_type("Order", |t| t.key("Id").property("Id", "Edm.Int32"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_split_scalars_and_deferred() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let customer = ResourceBuilder::new("Sales.Customer")
            .property("Id", 1)
            .dynamic("Nickname", "Ace")
            .dynamic("Scores", vec![Value::from(1), Value::from(2)])
            .dynamic("Home", ResourceBuilder::untyped().property("City", "Oslo"))
            .build();

        let dynamic = collect_dynamic(&model, ty, &customer, &DynamicSelection::All).unwrap();
        let scalars: Vec<_> = dynamic.scalars.iter().map(|(n, _)| *n).collect();
        let deferred: Vec<_> = dynamic.deferred.iter().map(|(n, _)| *n).collect();
        assert_eq!(scalars, ["Nickname", "Scores"]);
        assert_eq!(deferred, ["Home"]);
    }

    #[test]
    fn test_collision_is_fatal_even_when_unselected() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let customer = ResourceBuilder::new("Sales.Customer")
            .property("Id", 1)
            .dynamic("Name", "shadow")
            .build();

        let err = collect_dynamic(&model, ty, &customer, &DynamicSelection::None).unwrap_err();
        assert_eq!(
            err,
            SerializeError::DynamicPropertyConflict {
                type_name: "Sales.Customer".into(),
                name: "Name".into()
            }
        );
    }

    #[test]
    fn test_closed_type_ignores_dynamic() {
        let model = model();
        let ty = model.structured_type("Sales.Order");
        let order = ResourceBuilder::new("Sales.Order").dynamic("Id", 5).build();
        let dynamic = collect_dynamic(&model, ty, &order, &DynamicSelection::All).unwrap();
        assert!(dynamic.scalars.is_empty());
    }

    #[test]
    fn test_untyped_uses_all_properties() {
        let model = model();
        let bag = ResourceBuilder::untyped()
            .property("a", 1)
            .property("b", "x")
            .build();
        let selection = DynamicSelection::Names(["b".to_string()].into_iter().collect());
        let dynamic = collect_dynamic(&model, None, &bag, &selection).unwrap();
        assert_eq!(dynamic.scalars.len(), 1);
        assert_eq!(dynamic.scalars[0].0, "b");
    }

    #[test]
    fn test_open_type_reads_undeclared_names_from_declared_bag() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let customer = ResourceBuilder::new("Sales.Customer")
            .property("Id", 1)
            .property("Name", "Acme")
            .property("Nickname", "Ace")
            .dynamic("Rank", 3)
            .build();

        let dynamic = collect_dynamic(&model, ty, &customer, &DynamicSelection::All).unwrap();
        let scalars: Vec<_> = dynamic.scalars.iter().map(|(n, _)| *n).collect();
        assert_eq!(scalars, ["Nickname", "Rank"]);
    }

    #[test]
    fn test_untyped_name_in_both_bags_is_taken_once() {
        let model = model();
        let bag = ResourceBuilder::untyped()
            .property("a", 1)
            .dynamic("a", 2)
            .dynamic("b", 3)
            .build();
        let dynamic = collect_dynamic(&model, None, &bag, &DynamicSelection::All).unwrap();
        assert_eq!(dynamic.scalars.len(), 2);
        assert_eq!(dynamic.scalars[0], ("a", &Value::from(1)));
        assert_eq!(dynamic.scalars[1].0, "b");
    }

    #[test]
    fn test_runtime_typing() {
        let model = model();
        let options = EncodeOptions::default();
        let write = WriteContext::new(&model, &options, &DefaultPrimitiveConverter);
        let bag = ResourceInstance::untyped();
        let resource = ResourceContext::new(write, &bag, None);

        assert_eq!(
            resolve_untyped_value(&resource, "tier", &enum_value("Sales.Tier", "Gold")),
            Ok(WireValue::Enum {
                type_name: Some("Sales.Tier".into()),
                member: "Gold".into()
            })
        );
        assert_eq!(
            resolve_untyped_value(&resource, "tier", &enum_value("Other.Tier", "Gold")),
            Ok(WireValue::Primitive(PrimitiveValue::String("Gold".into())))
        );

        let scores = Value::Collection(vec![Value::from(1), Value::from(2)]);
        assert_eq!(
            resolve_untyped_value(&resource, "scores", &scores),
            Ok(WireValue::Collection {
                type_name: Some("Collection(Edm.Int32)".into()),
                items: vec![
                    WireValue::Primitive(PrimitiveValue::Int32(1)),
                    WireValue::Primitive(PrimitiveValue::Int32(2)),
                ]
            })
        );
        // Mixed kinds get no collection type; each item keeps its own.
        let mixed = Value::Collection(vec![Value::from(1), Value::from("x")]);
        assert_eq!(
            resolve_untyped_value(&resource, "mixed", &mixed),
            Ok(WireValue::Collection {
                type_name: None,
                items: vec![
                    WireValue::Primitive(PrimitiveValue::Int32(1)),
                    WireValue::Primitive(PrimitiveValue::String("x".into())),
                ]
            })
        );
    }

    #[test]
    fn test_infer_structured_type() {
        let model = model();
        let known = ResourceInstance::typed("Sales.Order");
        let unknown = ResourceInstance::typed("Elsewhere.Thing");
        assert!(infer_structured_type(&model, &known).is_some());
        assert!(infer_structured_type(&model, &unknown).is_none());
        assert!(infer_structured_type(&model, &ResourceInstance::untyped()).is_none());
    }
}
