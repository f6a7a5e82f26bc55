//! ETag construction from concurrency tokens.

use std::fmt;

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::context::ResourceContext;
use crate::convert::format_literal;
use crate::error::SerializeError;
use crate::event::WireValue;
use crate::model::{PrimitiveValue, TypeRef, Value};

/// Builds an ETag from ordered concurrency-token values.
pub trait ETagHandler: fmt::Debug {
    /// `tokens` are sorted by property name; `None` marks a null value.
    fn create_etag(&self, tokens: &[(&str, Option<PrimitiveValue>)]) -> Option<String>;
}

/// Weak ETag listing each token literal: `W/"v1,v2"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralETagHandler;

impl ETagHandler for LiteralETagHandler {
    fn create_etag(&self, tokens: &[(&str, Option<PrimitiveValue>)]) -> Option<String> {
        if tokens.is_empty() {
            return None;
        }
        let literals = tokens
            .iter()
            .map(|(_, value)| match value {
                Some(value) => format_literal(value),
                None => Some("null".to_string()),
            })
            .collect::<Option<Vec<String>>>()?;
        Some(format!("W/\"{}\"", literals.join(",")))
    }
}

/// Weak ETag holding a SHA-256 digest of the tokens: `W/"<hex>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashETagHandler;

impl ETagHandler for HashETagHandler {
    fn create_etag(&self, tokens: &[(&str, Option<PrimitiveValue>)]) -> Option<String> {
        if tokens.is_empty() {
            return None;
        }
        let mut hasher = Sha256::new();
        for (name, value) in tokens {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            match value {
                Some(value) => hasher.update(format_literal(value)?.as_bytes()),
                None => hasher.update(b"null"),
            }
            hasher.update(b";");
        }
        Some(format!("W/\"{}\"", hex::encode(hasher.finalize())))
    }
}

/// Computes the ETag of a resource.
///
/// Returns `None` when there is no handler, no navigation source, or the
/// source declares no concurrency tokens.
pub fn compute_etag(
    resource: &ResourceContext<'_>,
    handler: Option<&dyn ETagHandler>,
) -> Result<Option<String>, SerializeError> {
    let (Some(handler), Some(source)) = (handler, resource.navigation_source()) else {
        return Ok(None);
    };
    if source.concurrency_properties.is_empty() {
        return Ok(None);
    }

    let mut names: Vec<&str> = source
        .concurrency_properties
        .iter()
        .map(String::as_str)
        .collect();
    names.sort_unstable();
    names.dedup();

    let mut tokens = Vec::with_capacity(names.len());
    for name in names {
        let declared = resource
            .structured_type
            .and_then(|ty| resource.model().find_property(ty, name));
        let value = match (resource.property_value(name), declared) {
            (None | Some(Value::Null) | Some(Value::TypedNull(_)), _) => None,
            (Some(value), Some(property)) => match resource.resolve_declared(property, Some(value))? {
                WireValue::Primitive(p) => Some(p),
                WireValue::Enum { member, .. } => Some(PrimitiveValue::String(member)),
                _ => return Err(token_error(name, &property.type_ref, value)),
            },
            (Some(Value::Primitive(p)), None) => Some(p.clone()),
            (Some(Value::Enum { member, .. }), None) => Some(PrimitiveValue::String(member.clone())),
            (Some(value), None) => return Err(token_error(name, &TypeRef::Untyped, value)),
        };
        tokens.push((name, value));
    }

    trace!(source = %source.name, tokens = tokens.len(), "computing etag");
    Ok(handler.create_etag(&tokens))
}

fn token_error(name: &str, expected: &TypeRef, value: &Value) -> SerializeError {
    SerializeError::UnsupportedValue {
        property: name.to_string(),
        expected: format!("concurrency token ({})", expected.full_name()),
        found: value.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WriteContext;
    use crate::convert::DefaultPrimitiveConverter;
    use crate::model::{EdmModel, ModelBuilder, ResourceBuilder, ResourceInstance};
    use crate::options::EncodeOptions;

    fn model() -> EdmModel {
        ModelBuilder::new("Sales")
            .entity_type("Customer", |t| {
                t.key("Id")
                    .property("Id", "Edm.Int32")
                    .property("Version", "Edm.Int64")
                    .property("Stamp", "Edm.String")
            })
            .entity_set("Customers", "Customer", |s| s.concurrency("Version").concurrency("Stamp"))
            .entity_set("Plain", "Customer", |s| s)
            .build()
            .unwrap()
    }

    fn etag(
        model: &EdmModel,
        source: &str,
        instance: &ResourceInstance,
        handler: Option<&dyn ETagHandler>,
    ) -> Result<Option<String>, SerializeError> {
        let options = EncodeOptions::default();
        let write = WriteContext::new(model, &options, &DefaultPrimitiveConverter)
            .with_navigation_source(model.navigation_source(source));
        let resource = ResourceContext::new(write, instance, model.structured_type("Sales.Customer"));
        compute_etag(&resource, handler)
    }

    #[test]
    fn test_tokens_sorted_by_name() {
        let model = model();
        let customer = ResourceBuilder::new("Sales.Customer")
            .property("Id", 1)
            .property("Version", 7i32)
            .property("Stamp", "a")
            .build();
        let etag = etag(&model, "Customers", &customer, Some(&LiteralETagHandler)).unwrap();
        // Stamp sorts before Version; Version is widened to Int64.
        assert_eq!(etag.as_deref(), Some("W/\"'a',7\""));
    }

    #[test]
    fn test_soft_omissions() {
        let model = model();
        let customer = ResourceBuilder::new("Sales.Customer").property("Version", 7i64).build();
        assert_eq!(etag(&model, "Customers", &customer, None), Ok(None));
        assert_eq!(etag(&model, "Plain", &customer, Some(&LiteralETagHandler)), Ok(None));
    }

    #[test]
    fn test_null_token() {
        let model = model();
        let customer = ResourceBuilder::new("Sales.Customer").property("Version", 7i64).build();
        let etag = etag(&model, "Customers", &customer, Some(&LiteralETagHandler)).unwrap();
        assert_eq!(etag.as_deref(), Some("W/\"null,7\""));
    }

    #[test]
    fn test_hash_etag_is_stable() {
        let model = model();
        let customer = ResourceBuilder::new("Sales.Customer")
            .property("Version", 7i64)
            .property("Stamp", "a")
            .build();
        let first = etag(&model, "Customers", &customer, Some(&HashETagHandler)).unwrap();
        let second = etag(&model, "Customers", &customer, Some(&HashETagHandler)).unwrap();
        assert_eq!(first, second);
        let first = first.unwrap();
        assert!(first.starts_with("W/\""));
        assert_eq!(first.len(), 3 + 64 + 1);
    }

    #[test]
    fn test_unformattable_token_omits_etag() {
        let out_of_range = PrimitiveValue::DateTimeOffset {
            epoch_us: i64::MAX - 10,
            offset_min: 60,
        };
        let tokens = [("At", Some(out_of_range))];
        assert_eq!(LiteralETagHandler.create_etag(&tokens), None);
        assert_eq!(HashETagHandler.create_etag(&tokens), None);
    }

    #[test]
    fn test_large_decimal_token_stays_short() {
        let tokens = [(
            "Version",
            Some(PrimitiveValue::Decimal {
                mantissa: 1,
                exponent: 100_000_000,
            }),
        )];
        assert_eq!(
            LiteralETagHandler.create_etag(&tokens).as_deref(),
            Some("W/\"1E+100000000\"")
        );
    }
}
