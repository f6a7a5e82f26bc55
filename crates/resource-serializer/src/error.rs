//! Error types for resource serialization.

use thiserror::Error;

/// Error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// S001: Caller misuse (null graph, non-structured root, depth limit)
    Precondition,
    /// S002: No encoder or model type for a value
    UnsupportedType,
    /// S003: Dynamic property collides with a declared one
    SchemaConflict,
    /// S004: Value has no wire representation for its target type
    UnsupportedValue,
    /// S005: The event sink rejected a write
    Transport,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "S001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::Precondition => "S001",
            ErrorCode::UnsupportedType => "S002",
            ErrorCode::SchemaConflict => "S003",
            ErrorCode::UnsupportedValue => "S004",
            ErrorCode::Transport => "S005",
        }
    }
}

/// Error during resource serialization.
///
/// Every variant is fatal for the message being written: the caller must
/// abandon the in-progress payload rather than append further events.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializeError {
    // === S001: Precondition ===
    #[error("[S001] cannot write a null resource")]
    NullResource,

    #[error("[S001] cannot write the null sentinel of complex type {type_name}")]
    NullComplexSentinel { type_name: String },

    #[error("[S001] type {type_name} is not a structured or untyped type")]
    NotStructured { type_name: String },

    #[error("[S001] nesting depth exceeds maximum {max}")]
    DepthExceeded { max: usize },

    #[error("[S001] cannot compute an entity id for a reference to {type_name}")]
    MissingEntityId { type_name: String },

    // === S002: Unsupported type ===
    #[error("[S002] type {type_name} is not declared in the model")]
    UnknownType { type_name: String },

    #[error("[S002] navigation source {name} is not declared in the model")]
    UnknownNavigationSource { name: String },

    #[error("[S002] no encoder resolves for {type_name}")]
    NoEncoder { type_name: String },

    #[error("[S002] runtime type {runtime} does not derive from {expected}")]
    TypeNotDerived { runtime: String, expected: String },

    // === S003: Schema conflict ===
    #[error("[S003] dynamic property {name} on {type_name} collides with a declared property")]
    DynamicPropertyConflict { type_name: String, name: String },

    // === S004: Unsupported value ===
    #[error("[S004] property {property}: {found} value has no wire representation as {expected}")]
    UnsupportedValue {
        property: String,
        expected: String,
        found: String,
    },

    #[error("[S004] {member:?} is not a member of enum {type_name}")]
    UnknownEnumMember { type_name: String, member: String },

    // === S005: Transport ===
    #[error("[S005] event sink failed: {0}")]
    Sink(String),

    #[error("[S005] unbalanced write frame at event {position}: {detail}")]
    UnbalancedFrame { position: usize, detail: String },
}

impl SerializeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SerializeError::NullResource
            | SerializeError::NullComplexSentinel { .. }
            | SerializeError::NotStructured { .. }
            | SerializeError::DepthExceeded { .. }
            | SerializeError::MissingEntityId { .. } => ErrorCode::Precondition,
            SerializeError::UnknownType { .. }
            | SerializeError::UnknownNavigationSource { .. }
            | SerializeError::NoEncoder { .. }
            | SerializeError::TypeNotDerived { .. } => ErrorCode::UnsupportedType,
            SerializeError::DynamicPropertyConflict { .. } => ErrorCode::SchemaConflict,
            SerializeError::UnsupportedValue { .. } | SerializeError::UnknownEnumMember { .. } => {
                ErrorCode::UnsupportedValue
            }
            SerializeError::Sink(_) | SerializeError::UnbalancedFrame { .. } => {
                ErrorCode::Transport
            }
        }
    }
}
