//! Limits applied while walking resource graphs.

/// Default maximum nesting depth of resources, nested infos and resource sets.
///
/// Cyclic object graphs (a customer whose order points back at the customer,
/// expanded in both directions) are cut off here instead of overflowing.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Type name used when no static type applies to a resource.
pub const UNTYPED_TYPE_NAME: &str = "Edm.Untyped";

/// Default reason attached to deleted resources.
pub const DEFAULT_DELETED_REASON: &str = "deleted";
