//! Resolved selection/expansion requests.
//!
//! These are produced by a query layer; this crate only consumes them.
//! Nested requests are shared through `Arc` so that the identity of a
//! request can key the per-call plan cache.

use std::sync::Arc;

use crate::model::Value;

/// What a request selects.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Selection {
    /// Every declared property, navigation link, dynamic property and
    /// bound operation.
    #[default]
    All,
    /// Only the listed items.
    Items(Vec<SelectItem>),
}

/// One selected item.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// A declared, dynamic or computed property by name.
    Property(String),
    /// A complex property with its own nested selection.
    Nested {
        property: String,
        request: Arc<SelectExpandRequest>,
    },
    /// `*`: every declared structural property, navigation link and dynamic property.
    Wildcard,
    /// A bound action or function by qualified name.
    Operation(String),
    /// Every bound operation in a namespace (`Namespace.*`).
    AllOperations(String),
}

/// Filter applied to expanded collections: keeps items whose property equals a value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub property: String,
    pub equals: Value,
}

/// One ordering key of an expanded collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub property: String,
    pub descending: bool,
}

/// Filter, ordering and paging applied to an expanded collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandOptions {
    pub filter: Option<PropertyFilter>,
    pub order_by: Vec<OrderBy>,
    pub skip: Option<usize>,
    pub top: Option<usize>,
    /// Report the number of items after filtering, before paging.
    pub count: bool,
}

impl ExpandOptions {
    /// Returns true when no option changes the collection.
    pub fn is_identity(&self) -> bool {
        self.filter.is_none()
            && self.order_by.is_empty()
            && self.skip.is_none()
            && self.top.is_none()
    }
}

/// One expanded navigation property.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandItem {
    pub navigation: String,
    /// Nested selection/expansion for the expanded resources.
    pub request: Option<Arc<SelectExpandRequest>>,
    /// Write entity-reference links instead of resource bodies.
    pub reference_only: bool,
    pub options: ExpandOptions,
}

impl ExpandItem {
    /// Expands a navigation with the full default projection.
    pub fn new(navigation: impl Into<String>) -> Self {
        Self {
            navigation: navigation.into(),
            request: None,
            reference_only: false,
            options: ExpandOptions::default(),
        }
    }

    /// Expands a navigation into entity-reference links.
    pub fn references(navigation: impl Into<String>) -> Self {
        Self {
            reference_only: true,
            ..Self::new(navigation)
        }
    }

    pub fn with_request(mut self, request: SelectExpandRequest) -> Self {
        self.request = Some(Arc::new(request));
        self
    }

    pub fn with_options(mut self, options: ExpandOptions) -> Self {
        self.options = options;
        self
    }
}

/// A resolved selection/expansion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectExpandRequest {
    pub select: Selection,
    pub expand: Vec<ExpandItem>,
    /// Names of computed properties produced by the query layer.
    pub computed: Vec<String>,
}

impl SelectExpandRequest {
    /// Selects everything and expands nothing.
    pub fn all() -> Self {
        Self::default()
    }

    /// Selects only the listed items.
    pub fn select(items: impl IntoIterator<Item = SelectItem>) -> Self {
        Self {
            select: Selection::Items(items.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Selects the named properties.
    pub fn properties<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self::select(names.into_iter().map(|n| SelectItem::Property(n.to_string())))
    }

    pub fn expand(mut self, item: ExpandItem) -> Self {
        self.expand.push(item);
        self
    }

    pub fn with_computed(mut self, name: impl Into<String>) -> Self {
        self.computed.push(name.into());
        self
    }

    /// Returns the expand item for a navigation, if expanded.
    pub fn expanded(&self, navigation: &str) -> Option<&ExpandItem> {
        self.expand.iter().find(|e| e.navigation == navigation)
    }
}
