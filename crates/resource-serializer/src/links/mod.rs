//! Hypermedia links, ETags and type annotations.
//!
//! A [`LinkBuilder`] is attached per navigation source and computes the
//! identity and navigation URLs of the resources written under it. Whether a
//! computed link reaches the wire is decided by the metadata-level policy in
//! [`annotations`].

pub mod annotations;
pub mod etag;

use std::fmt;

use crate::context::ResourceContext;
use crate::model::{BoundOperation, NavigationProperty};

pub use annotations::{
    complex_type_annotation, entity_type_annotation, navigation_link_url, operation_link,
};
pub use etag::{compute_etag, ETagHandler, HashETagHandler, LiteralETagHandler};

/// Computes links for resources of one navigation source.
pub trait LinkBuilder: fmt::Debug {
    /// Identity URI of the resource.
    fn build_id(&self, resource: &ResourceContext<'_>) -> Option<String>;

    fn build_edit_link(&self, resource: &ResourceContext<'_>) -> Option<String> {
        self.build_id(resource)
    }

    fn build_read_link(&self, resource: &ResourceContext<'_>) -> Option<String> {
        self.build_edit_link(resource)
    }

    /// URL of a navigation property of the resource.
    fn build_navigation_link(
        &self,
        resource: &ResourceContext<'_>,
        navigation: &NavigationProperty,
    ) -> Option<String> {
        self.build_edit_link(resource)
            .map(|link| format!("{}/{}", link, navigation.name))
    }

    /// Target URL of a bound action or function.
    fn build_operation_link(
        &self,
        resource: &ResourceContext<'_>,
        operation: &BoundOperation,
    ) -> Option<String> {
        self.build_edit_link(resource)
            .map(|link| format!("{}/{}", link, operation.full_name))
    }

    /// Returns true when every link follows URL conventions, letting clients
    /// compute them and minimal metadata omit them.
    fn follows_conventions(&self) -> bool {
        true
    }
}

/// Convention-based links: `{root}/{Set}({key})`.
///
/// Edit links of derived instances carry a type-cast segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionLinkBuilder {
    service_root: String,
    entity_set: String,
}

impl ConventionLinkBuilder {
    pub fn new(service_root: impl Into<String>, entity_set: impl Into<String>) -> Self {
        Self {
            service_root: service_root.into(),
            entity_set: entity_set.into(),
        }
    }
}

impl LinkBuilder for ConventionLinkBuilder {
    fn build_id(&self, resource: &ResourceContext<'_>) -> Option<String> {
        let key = resource.key_segment()?;
        Some(format!("{}/{}{}", self.service_root, self.entity_set, key))
    }

    fn build_edit_link(&self, resource: &ResourceContext<'_>) -> Option<String> {
        let id = self.build_id(resource)?;
        let declared = resource.navigation_source().map(|s| s.entity_type.as_str());
        match declared {
            Some(declared) if declared != resource.type_name() => {
                Some(format!("{}/{}", id, resource.type_name()))
            }
            _ => Some(id),
        }
    }
}
