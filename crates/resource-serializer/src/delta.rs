//! Change-tracking filter for partial-update payloads.

use tracing::trace;

use crate::model::{DeltaChangeSet, EdmModel, NavigationProperty, NestedChange, StructuredType};
use crate::projection::{DynamicSelection, ProjectionPlan};

/// Narrows a plan to what a change set reports.
///
/// Structural properties keep changed names plus keys; complex properties,
/// dynamic and computed values keep changed names only. Navigations and
/// operations are dropped: changed navigations are written from the change
/// set instead (see [`changed_navigations`]).
pub fn narrow_plan(
    model: &EdmModel,
    ty: Option<&StructuredType>,
    plan: &ProjectionPlan,
    changes: &DeltaChangeSet,
) -> ProjectionPlan {
    let keys = ty.map_or(&[][..], |t| model.keys_of(t));

    let dynamic = match &plan.dynamic {
        DynamicSelection::None => DynamicSelection::None,
        DynamicSelection::All => DynamicSelection::Names(changes.changed.clone()),
        DynamicSelection::Names(names) => {
            DynamicSelection::Names(names.intersection(&changes.changed).cloned().collect())
        }
    };

    let narrowed = ProjectionPlan {
        structural: plan
            .structural
            .iter()
            .filter(|name| changes.is_changed(name) || keys.contains(name))
            .cloned()
            .collect(),
        complex: plan
            .complex
            .iter()
            .filter(|c| changes.is_changed(&c.name))
            .cloned()
            .collect(),
        dynamic,
        computed: plan
            .computed
            .iter()
            .filter(|name| changes.is_changed(name))
            .cloned()
            .collect(),
        ..ProjectionPlan::default()
    };

    trace!(
        structural = narrowed.structural.len(),
        complex = narrowed.complex.len(),
        "narrowed plan to change set"
    );
    narrowed
}

/// Navigations present in the change set, in declaration order.
pub fn changed_navigations<'m, 'c>(
    model: &'m EdmModel,
    ty: &'m StructuredType,
    changes: &'c DeltaChangeSet,
) -> Vec<(&'m NavigationProperty, &'c NestedChange)> {
    model
        .navigations_of(ty)
        .into_iter()
        .filter_map(|navigation| {
            changes
                .navigation(&navigation.name)
                .map(|change| (navigation, change))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelBuilder, Value};

    fn model() -> EdmModel {
        ModelBuilder::new("Sales")
            .complex_type("Address", |t| t.property("City", "Edm.String"))
            .entity_type("Customer", |t| {
                t.key("Id")
                    .open()
                    .property("Id", "Edm.Int32")
                    .property("Name", "Edm.String")
                    .property("Email", "Edm.String")
                    .property("Address", "Address")
                    .navigation("Orders", "Order", true)
                    .navigation("Manager", "Customer", false)
            })
            .entity_type("Order", |t| t.key("Id").property("Id", "Edm.Int32"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_changed_plus_keys() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let plan = ProjectionPlan::resolve(&model, ty, None);
        let changes = DeltaChangeSet::new(["Name", "Nickname"]);

        let narrowed = narrow_plan(&model, ty, &plan, &changes);
        assert_eq!(narrowed.structural, ["Id", "Name"]);
        assert!(narrowed.complex.is_empty());
        assert!(narrowed.navigation_links.is_empty());
        assert!(narrowed.operations.is_empty());
        assert!(narrowed.dynamic.includes("Nickname"));
        assert!(!narrowed.dynamic.includes("Other"));
    }

    #[test]
    fn test_complex_changed_only() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let plan = ProjectionPlan::resolve(&model, ty, None);
        let changes = DeltaChangeSet::new(["Address"]);

        let narrowed = narrow_plan(&model, ty, &plan, &changes);
        assert_eq!(narrowed.structural, ["Id"]);
        assert_eq!(narrowed.complex.len(), 1);
        assert_eq!(narrowed.complex[0].name, "Address");
    }

    #[test]
    fn test_changed_navigations_in_declaration_order() {
        let model = model();
        let ty = model.structured_type("Sales.Customer").unwrap();
        let mut changes = DeltaChangeSet::new(["Manager"]);
        changes
            .navigations
            .insert("Orders".into(), NestedChange::Payload(Value::Collection(vec![])));

        let navigations = changed_navigations(&model, ty, &changes);
        let names: Vec<_> = navigations.iter().map(|(n, _)| n.name.as_str()).collect();
        assert_eq!(names, ["Orders", "Manager"]);
        assert_eq!(navigations[1].1, &NestedChange::Changed);
    }
}
