//! Selection/expansion projection.
//!
//! - Requests (resolved by a query layer, consumed here)
//! - Plans (what to write for one type under one request)
//! - The per-call plan cache
//! - Filter/order/paging of expanded collections

pub mod cache;
pub mod paging;
pub mod plan;
pub mod request;

pub use cache::PlanCache;
pub use paging::{apply_expand_options, compare_values};
pub use plan::{DynamicSelection, ExpandedNavigation, ProjectionPlan, SelectedComplex};
pub use request::{
    ExpandItem, ExpandOptions, OrderBy, PropertyFilter, SelectExpandRequest, SelectItem,
    Selection,
};
