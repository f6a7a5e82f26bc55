//! Per-call projection plan cache.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::limits::UNTYPED_TYPE_NAME;
use crate::model::{EdmModel, StructuredType};
use crate::projection::{ProjectionPlan, SelectExpandRequest};

/// (request identity, type name). Identity 0 stands for "no request".
type PlanKey = (usize, String);

/// Memoizes resolved plans for one top-level encode call.
///
/// Requests are keyed by `Arc` identity, which is only stable while every
/// request is alive; the cache must therefore never outlive the call it was
/// created for.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: RefCell<FxHashMap<PlanKey, Rc<ProjectionPlan>>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the plan for (`ty`, `request`), resolving it on first use.
    pub fn get_or_resolve(
        &self,
        model: &EdmModel,
        ty: Option<&StructuredType>,
        request: Option<&Arc<SelectExpandRequest>>,
    ) -> Rc<ProjectionPlan> {
        let identity = request.map_or(0, |r| Arc::as_ptr(r) as usize);
        let type_name = ty.map_or(UNTYPED_TYPE_NAME, |t| t.full_name.as_str());
        let key = (identity, type_name.to_string());

        if let Some(plan) = self.plans.borrow().get(&key) {
            trace!(type_name, identity, "projection plan cache hit");
            return Rc::clone(plan);
        }

        let plan = Rc::new(ProjectionPlan::resolve(model, ty, request.map(|r| &**r)));
        trace!(type_name, identity, "projection plan resolved");
        self.plans.borrow_mut().insert(key, Rc::clone(&plan));
        plan
    }

    /// Number of distinct plans resolved so far.
    pub fn len(&self) -> usize {
        self.plans.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelBuilder;

    #[test]
    fn test_cache_keys_on_request_identity() {
        let model = ModelBuilder::new("Sales")
            .entity_type("Customer", |t| {
                t.key("Id")
                    .property("Id", "Edm.Int32")
                    .property("Name", "Edm.String")
            })
            .build()
            .unwrap();
        let ty = model.structured_type("Sales.Customer");
        let cache = PlanCache::new();

        let names = Arc::new(SelectExpandRequest::properties(["Name"]));
        let same_content = Arc::new(SelectExpandRequest::properties(["Name"]));

        let first = cache.get_or_resolve(&model, ty, Some(&names));
        let again = cache.get_or_resolve(&model, ty, Some(&names));
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 1);

        // Equal content but a different request instance resolves separately.
        let other = cache.get_or_resolve(&model, ty, Some(&same_content));
        assert!(!Rc::ptr_eq(&first, &other));
        assert_eq!(first, other);

        let full = cache.get_or_resolve(&model, ty, None);
        assert_eq!(full.structural, ["Id", "Name"]);
        let untyped = cache.get_or_resolve(&model, None, None);
        assert!(untyped.structural.is_empty());
        assert_eq!(cache.len(), 4);
    }
}
