//! Projection plans: what to write for one (type, request) pair.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::model::{EdmModel, StructuredType};
use crate::projection::{ExpandOptions, SelectExpandRequest, SelectItem, Selection};

/// Which dynamic properties are selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DynamicSelection {
    #[default]
    None,
    All,
    Names(BTreeSet<String>),
}

impl DynamicSelection {
    /// Returns true if the dynamic property `name` is selected.
    pub fn includes(&self, name: &str) -> bool {
        match self {
            DynamicSelection::None => false,
            DynamicSelection::All => true,
            DynamicSelection::Names(names) => names.contains(name),
        }
    }
}

/// A selected complex-typed property.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedComplex {
    pub name: String,
    /// Nested selection; `None` selects everything.
    pub request: Option<Arc<SelectExpandRequest>>,
}

/// An expanded navigation property.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedNavigation {
    pub name: String,
    pub request: Option<Arc<SelectExpandRequest>>,
    pub options: ExpandOptions,
}

/// The resolved selection for one (type, request) pair.
///
/// Properties are listed in declaration order (base type first) so that
/// the written order does not depend on the order of the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionPlan {
    /// Non-structured properties: primitive, enum, collections of those,
    /// streams and untyped.
    pub structural: Vec<String>,
    pub complex: Vec<SelectedComplex>,
    /// Navigations written as a link only.
    pub navigation_links: Vec<String>,
    pub expanded: Vec<ExpandedNavigation>,
    /// Navigations written as entity-reference links.
    pub references: Vec<String>,
    pub dynamic: DynamicSelection,
    pub computed: Vec<String>,
    /// Qualified names of selected bound operations.
    pub operations: Vec<String>,
}

impl ProjectionPlan {
    /// Plan selecting only the key properties of `ty`.
    pub fn key_only(model: &EdmModel, ty: &StructuredType) -> Self {
        Self {
            structural: model.keys_of(ty).to_vec(),
            ..Self::default()
        }
    }

    /// Resolves the plan for `ty` (or an untyped resource when `None`).
    ///
    /// Without a request everything declared is selected, navigations are
    /// written as links and every bound operation is advertised.
    pub fn resolve(
        model: &EdmModel,
        ty: Option<&StructuredType>,
        request: Option<&SelectExpandRequest>,
    ) -> Self {
        let items = match request.map(|r| &r.select) {
            Some(Selection::Items(items)) => Some(items.as_slice()),
            _ => None,
        };
        let computed_names = request.map(|r| r.computed.as_slice()).unwrap_or(&[]);

        let Some(ty) = ty else {
            return Self::resolve_untyped(items, computed_names);
        };

        let mut plan = match items {
            None => Self::select_all(model, ty),
            Some(items) => Self::select_items(model, ty, items, computed_names),
        };

        plan.computed = match items {
            None => computed_names.to_vec(),
            Some(items) => computed_names
                .iter()
                .filter(|name| is_selected(items, name))
                .cloned()
                .collect(),
        };

        if let Some(request) = request {
            for item in &request.expand {
                if model.find_navigation(ty, &item.navigation).is_none() {
                    continue;
                }
                plan.navigation_links.retain(|n| n != &item.navigation);
                if item.reference_only {
                    plan.references.push(item.navigation.clone());
                } else {
                    plan.expanded.push(ExpandedNavigation {
                        name: item.navigation.clone(),
                        request: item.request.clone(),
                        options: item.options.clone(),
                    });
                }
            }
        }

        plan
    }

    fn select_all(model: &EdmModel, ty: &StructuredType) -> Self {
        let mut plan = Self::default();
        for property in model.properties_of(ty) {
            if property.type_ref.is_structured() {
                plan.complex.push(SelectedComplex {
                    name: property.name.clone(),
                    request: None,
                });
            } else {
                plan.structural.push(property.name.clone());
            }
        }
        plan.navigation_links = model
            .navigations_of(ty)
            .iter()
            .map(|n| n.name.clone())
            .collect();
        if model.is_open(ty) {
            plan.dynamic = DynamicSelection::All;
        }
        plan.operations = model
            .bound_operations(ty)
            .iter()
            .map(|op| op.full_name.clone())
            .collect();
        plan
    }

    fn select_items(
        model: &EdmModel,
        ty: &StructuredType,
        items: &[SelectItem],
        computed: &[String],
    ) -> Self {
        let wildcard = items.iter().any(|i| matches!(i, SelectItem::Wildcard));
        let mut nested: BTreeMap<&str, &Arc<SelectExpandRequest>> = BTreeMap::new();
        let mut named: BTreeSet<&str> = BTreeSet::new();
        for item in items {
            match item {
                SelectItem::Property(name) => {
                    named.insert(name);
                }
                SelectItem::Nested { property, request } => {
                    named.insert(property);
                    nested.insert(property, request);
                }
                _ => {}
            }
        }

        let mut plan = Self::default();
        for property in model.properties_of(ty) {
            if !wildcard && !named.contains(property.name.as_str()) {
                continue;
            }
            if property.type_ref.is_structured() {
                plan.complex.push(SelectedComplex {
                    name: property.name.clone(),
                    request: nested.get(property.name.as_str()).map(|r| Arc::clone(r)),
                });
            } else {
                plan.structural.push(property.name.clone());
            }
        }

        plan.navigation_links = model
            .navigations_of(ty)
            .iter()
            .filter(|n| wildcard || named.contains(n.name.as_str()))
            .map(|n| n.name.clone())
            .collect();

        if model.is_open(ty) {
            plan.dynamic = if wildcard {
                DynamicSelection::All
            } else {
                let undeclared: BTreeSet<String> = named
                    .iter()
                    .filter(|name| !model.is_declared(ty, name))
                    .filter(|name| !computed.iter().any(|c| c == **name))
                    .map(|name| name.to_string())
                    .collect();
                if undeclared.is_empty() {
                    DynamicSelection::None
                } else {
                    DynamicSelection::Names(undeclared)
                }
            };
        }

        plan.operations = model
            .bound_operations(ty)
            .iter()
            .filter(|op| {
                items.iter().any(|item| match item {
                    SelectItem::Operation(name) => *name == op.full_name,
                    SelectItem::AllOperations(namespace) => op.namespace() == namespace,
                    _ => false,
                })
            })
            .map(|op| op.full_name.clone())
            .collect();
        plan
    }

    fn resolve_untyped(items: Option<&[SelectItem]>, computed: &[String]) -> Self {
        let (dynamic, computed) = match items {
            None => (DynamicSelection::All, computed.to_vec()),
            Some(items) if items.iter().any(|i| matches!(i, SelectItem::Wildcard)) => {
                (DynamicSelection::All, computed.to_vec())
            }
            Some(items) => {
                let names: BTreeSet<String> = items
                    .iter()
                    .filter_map(|item| match item {
                        SelectItem::Property(name) => Some(name.clone()),
                        SelectItem::Nested { property, .. } => Some(property.clone()),
                        _ => None,
                    })
                    .filter(|name| !computed.contains(name))
                    .collect();
                let computed = computed
                    .iter()
                    .filter(|name| is_selected(items, name))
                    .cloned()
                    .collect();
                (DynamicSelection::Names(names), computed)
            }
        };
        Self {
            dynamic,
            computed,
            ..Self::default()
        }
    }

    /// Returns the complex selection for `name`, if selected.
    pub fn complex(&self, name: &str) -> Option<&SelectedComplex> {
        self.complex.iter().find(|c| c.name == name)
    }
}

fn is_selected(items: &[SelectItem], name: &str) -> bool {
    items.iter().any(|item| match item {
        SelectItem::Property(n) => n == name,
        SelectItem::Wildcard => true,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelBuilder;
    use crate::projection::ExpandItem;

    fn model() -> EdmModel {
        ModelBuilder::new("Sales")
            .complex_type("Address", |t| t.property("City", "Edm.String"))
            .entity_type("Customer", |t| {
                t.key("Id")
                    .open()
                    .property("Id", "Edm.Int32")
                    .property("Name", "Edm.String")
                    .property("Address", "Address")
                    .property("Photo", "Edm.Stream")
                    .navigation("Orders", "Order", true)
                    .navigation("Manager", "Customer", false)
            })
            .entity_type("Order", |t| t.key("Id").property("Id", "Edm.Int32"))
            .action("Customer", "Approve")
            .function("Customer", "Rating")
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_without_request() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let plan = ProjectionPlan::resolve(&model, ty, None);

        assert_eq!(plan.structural, ["Id", "Name", "Photo"]);
        assert_eq!(plan.complex.len(), 1);
        assert_eq!(plan.complex[0].name, "Address");
        assert_eq!(plan.navigation_links, ["Orders", "Manager"]);
        assert_eq!(plan.dynamic, DynamicSelection::All);
        assert_eq!(plan.operations, ["Sales.Approve", "Sales.Rating"]);
        assert!(plan.expanded.is_empty());
    }

    #[test]
    fn test_resolve_selected_items() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let request = SelectExpandRequest::select([
            SelectItem::Property("Name".into()),
            SelectItem::Property("Nickname".into()),
            SelectItem::Operation("Sales.Approve".into()),
        ])
        .expand(ExpandItem::new("Orders"))
        .expand(ExpandItem::references("Manager"))
        .expand(ExpandItem::new("Missing"));
        let plan = ProjectionPlan::resolve(&model, ty, Some(&request));

        assert_eq!(plan.structural, ["Name"]);
        assert!(plan.complex.is_empty());
        assert!(plan.navigation_links.is_empty());
        assert_eq!(plan.expanded.len(), 1);
        assert_eq!(plan.expanded[0].name, "Orders");
        assert_eq!(plan.references, ["Manager"]);
        assert!(plan.dynamic.includes("Nickname"));
        assert!(!plan.dynamic.includes("Other"));
        assert_eq!(plan.operations, ["Sales.Approve"]);
    }

    #[test]
    fn test_expand_replaces_link() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let request = SelectExpandRequest::all().expand(ExpandItem::new("Orders"));
        let plan = ProjectionPlan::resolve(&model, ty, Some(&request));
        assert_eq!(plan.navigation_links, ["Manager"]);
        assert_eq!(plan.expanded[0].name, "Orders");
    }

    #[test]
    fn test_namespace_operations_and_computed() {
        let model = model();
        let ty = model.structured_type("Sales.Customer");
        let request = SelectExpandRequest::select([
            SelectItem::AllOperations("Sales".into()),
            SelectItem::Property("Total".into()),
        ])
        .with_computed("Total")
        .with_computed("Unselected");
        let plan = ProjectionPlan::resolve(&model, ty, Some(&request));
        assert_eq!(plan.operations.len(), 2);
        assert_eq!(plan.computed, ["Total"]);
        assert_eq!(plan.dynamic, DynamicSelection::None);
    }

    #[test]
    fn test_key_only_and_untyped() {
        let model = model();
        let ty = model.structured_type("Sales.Customer").unwrap();
        let plan = ProjectionPlan::key_only(&model, ty);
        assert_eq!(plan.structural, ["Id"]);
        assert_eq!(plan.dynamic, DynamicSelection::None);

        let plan = ProjectionPlan::resolve(&model, None, None);
        assert_eq!(plan.dynamic, DynamicSelection::All);
        let request = SelectExpandRequest::properties(["a"]);
        let plan = ProjectionPlan::resolve(&model, None, Some(&request));
        assert!(plan.dynamic.includes("a"));
        assert!(!plan.dynamic.includes("b"));
    }
}
