//! Metadata-level policy for links and type annotations.
//!
//! | Concern              | full     | minimal                          | none                |
//! |----------------------|----------|----------------------------------|---------------------|
//! | Operation title      | emitted  | omitted                          | omitted             |
//! | Operation target     | emitted  | only for non-conventional links  | as minimal          |
//! | Operation presence   | always   | omitted if conventional          | as minimal          |
//! | Entity annotation    | always   | only if runtime != path type     | never               |
//! | Complex annotation   | explicit | transport default                | suppressed          |
//! | Navigation link URL  | emitted  | only for non-conventional links  | as minimal          |

use crate::context::ResourceContext;
use crate::event::{OperationLink, TypeAnnotation};
use crate::links::LinkBuilder;
use crate::model::{BoundOperation, NavigationProperty};
use crate::options::MetadataLevel;

/// Type annotation for an entity whose runtime type is `runtime_type`.
pub fn entity_type_annotation(
    level: MetadataLevel,
    runtime_type: &str,
    path_type: Option<&str>,
) -> TypeAnnotation {
    match level {
        MetadataLevel::Full => TypeAnnotation::Explicit(runtime_type.to_string()),
        MetadataLevel::Minimal if path_type != Some(runtime_type) => {
            TypeAnnotation::Explicit(runtime_type.to_string())
        }
        MetadataLevel::Minimal => TypeAnnotation::TransportDefault,
        MetadataLevel::None => TypeAnnotation::Suppressed,
    }
}

/// Type annotation for a complex value.
pub fn complex_type_annotation(level: MetadataLevel, runtime_type: &str) -> TypeAnnotation {
    match level {
        MetadataLevel::Full => TypeAnnotation::Explicit(runtime_type.to_string()),
        MetadataLevel::Minimal => TypeAnnotation::TransportDefault,
        MetadataLevel::None => TypeAnnotation::Suppressed,
    }
}

/// Advertisement of a bound operation, or `None` when the level omits it.
pub fn operation_link(
    level: MetadataLevel,
    builder: Option<&(dyn LinkBuilder + Send + Sync)>,
    resource: &ResourceContext<'_>,
    operation: &BoundOperation,
) -> Option<OperationLink> {
    let conventional = builder.is_none_or(|b| b.follows_conventions());
    if level != MetadataLevel::Full && conventional {
        return None;
    }

    let target = builder.and_then(|b| b.build_operation_link(resource, operation));
    Some(OperationLink {
        metadata: format!("#{}", operation.full_name),
        title: (level == MetadataLevel::Full).then(|| operation.name().to_string()),
        target,
    })
}

/// URL written on a navigation property's nested info.
pub fn navigation_link_url(
    level: MetadataLevel,
    builder: Option<&(dyn LinkBuilder + Send + Sync)>,
    resource: &ResourceContext<'_>,
    navigation: &NavigationProperty,
) -> Option<String> {
    let builder = builder?;
    if level == MetadataLevel::Full || !builder.follows_conventions() {
        builder.build_navigation_link(resource, navigation)
    } else {
        None
    }
}
