//! Classification of a resource by its runtime shape.

use crate::context::WriteContext;
use crate::model::{DeltaChangeSet, Deletion, ResourceInstance, StructuredType};

/// How a resource is written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceKind<'v> {
    /// An entity-reference link only.
    Reference,
    /// A deleted-resource frame with keys only.
    Deleted(&'v Deletion),
    /// Changed properties plus keys.
    Delta(&'v DeltaChangeSet),
    /// No static type; every property is dynamic.
    Untyped,
    /// Declared properties plus selected dynamic properties.
    Open,
    /// Declared properties only.
    Plain,
}

/// Selects the encoder variant for `instance` resolved to `ty`.
///
/// First match wins: reference-only positions, deletions, change sets (only
/// while writing delta payloads), untyped, open, plain.
pub fn classify<'v>(
    ctx: &WriteContext<'_>,
    instance: &'v ResourceInstance,
    ty: Option<&StructuredType>,
) -> ResourceKind<'v> {
    if ctx.reference_only {
        return ResourceKind::Reference;
    }
    if let Some(deletion) = &instance.deletion {
        return ResourceKind::Deleted(deletion);
    }
    if ctx.is_delta() {
        if let Some(changes) = &instance.change_set {
            return ResourceKind::Delta(changes);
        }
    }
    match ty {
        None => ResourceKind::Untyped,
        Some(ty) if ctx.model.is_open(ty) => ResourceKind::Open,
        Some(_) => ResourceKind::Plain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::DefaultPrimitiveConverter;
    use crate::model::{DeletedReason, ModelBuilder, ResourceBuilder};
    use crate::options::EncodeOptions;

    #[test]
    fn test_classification_order() {
        let model = ModelBuilder::new("Sales")
            .entity_type("Customer", |t| t.key("Id").open().property("Id", "Edm.Int32"))
            .entity_type("Order", |t| t.key("Id").property("Id", "Edm.Int32"))
            .build()
            .unwrap();
        let plain = EncodeOptions::default();
        let delta = EncodeOptions::delta();
        let converter = DefaultPrimitiveConverter;
        let ctx = WriteContext::new(&model, &plain, &converter);
        let delta_ctx = WriteContext::new(&model, &delta, &converter);
        let customer = model.structured_type("Sales.Customer");
        let order = model.structured_type("Sales.Order");

        let changed = ResourceBuilder::new("Sales.Order").changed(["Id"]).build();
        assert_eq!(classify(&ctx, &changed, order), ResourceKind::Plain);
        assert!(matches!(
            classify(&delta_ctx, &changed, order),
            ResourceKind::Delta(_)
        ));

        let deleted = ResourceBuilder::new("Sales.Order")
            .changed(["Id"])
            .deleted(None, DeletedReason::Changed)
            .build();
        assert!(matches!(
            classify(&delta_ctx, &deleted, order),
            ResourceKind::Deleted(d) if d.reason == DeletedReason::Changed
        ));
        assert_eq!(
            classify(&ctx.with_reference_only(true), &deleted, order),
            ResourceKind::Reference
        );

        let open = ResourceInstance::typed("Sales.Customer");
        assert_eq!(classify(&ctx, &open, customer), ResourceKind::Open);
        assert_eq!(classify(&ctx, &open, None), ResourceKind::Untyped);
    }
}
