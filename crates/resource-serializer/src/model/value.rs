//! Runtime values: the in-memory object graph handed to the encoder.
//!
//! A graph is a tree of [`Value`]s. Structured nodes are
//! [`ResourceInstance`]s, which may be declared (their runtime type names a
//! model type), open (declared plus ad hoc dynamic properties) or untyped
//! (no type name at all).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use uuid::Uuid;

use crate::limits::DEFAULT_DELETED_REASON;
use crate::model::PrimitiveKind;

/// A primitive value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PrimitiveValue {
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    /// Decimal: value = mantissa * 10^exponent.
    Decimal { mantissa: i64, exponent: i32 },
    String(String),
    Guid(Uuid),
    Binary(Vec<u8>),
    /// Signed days since Unix epoch (1970-01-01).
    Date { days: i32 },
    /// Microseconds since midnight.
    TimeOfDay { micros: i64 },
    /// Microseconds since Unix epoch plus the offset it was observed in.
    DateTimeOffset { epoch_us: i64, offset_min: i16 },
    /// Signed duration in microseconds.
    Duration { micros: i64 },
}

impl PrimitiveValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimitiveValue::Boolean(_) => PrimitiveKind::Boolean,
            PrimitiveValue::Byte(_) => PrimitiveKind::Byte,
            PrimitiveValue::SByte(_) => PrimitiveKind::SByte,
            PrimitiveValue::Int16(_) => PrimitiveKind::Int16,
            PrimitiveValue::Int32(_) => PrimitiveKind::Int32,
            PrimitiveValue::Int64(_) => PrimitiveKind::Int64,
            PrimitiveValue::Single(_) => PrimitiveKind::Single,
            PrimitiveValue::Double(_) => PrimitiveKind::Double,
            PrimitiveValue::Decimal { .. } => PrimitiveKind::Decimal,
            PrimitiveValue::String(_) => PrimitiveKind::String,
            PrimitiveValue::Guid(_) => PrimitiveKind::Guid,
            PrimitiveValue::Binary(_) => PrimitiveKind::Binary,
            PrimitiveValue::Date { .. } => PrimitiveKind::Date,
            PrimitiveValue::TimeOfDay { .. } => PrimitiveKind::TimeOfDay,
            PrimitiveValue::DateTimeOffset { .. } => PrimitiveKind::DateTimeOffset,
            PrimitiveValue::Duration { .. } => PrimitiveKind::Duration,
        }
    }

    /// Returns the integral value widened to i64, if integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrimitiveValue::Byte(v) => Some(i64::from(*v)),
            PrimitiveValue::SByte(v) => Some(i64::from(*v)),
            PrimitiveValue::Int16(v) => Some(i64::from(*v)),
            PrimitiveValue::Int32(v) => Some(i64::from(*v)),
            PrimitiveValue::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

/// Reference to the content of a stream property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamReference {
    pub read_link: Option<String>,
    pub edit_link: Option<String>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

/// A node of the object graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// Typed null sentinel for a complex value; rejected as a root.
    TypedNull(String),
    Primitive(PrimitiveValue),
    /// Enum member; the type name may be absent for schema-less values.
    Enum {
        type_name: Option<String>,
        member: String,
    },
    Resource(Box<ResourceInstance>),
    Collection(Vec<Value>),
    Stream(StreamReference),
}

impl Value {
    /// Returns true for `Null` and typed nulls.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::TypedNull(_))
    }

    /// Returns the resource instance, if this is a resource.
    pub fn as_resource(&self) -> Option<&ResourceInstance> {
        match self {
            Value::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the primitive value, if this is a primitive.
    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Value::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Short description of the runtime shape, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::TypedNull(t) => format!("null {}", t),
            Value::Primitive(p) => p.kind().name().to_string(),
            Value::Enum { type_name, .. } => {
                type_name.clone().unwrap_or_else(|| "enum".to_string())
            }
            Value::Resource(r) => r
                .type_name
                .clone()
                .unwrap_or_else(|| "untyped resource".to_string()),
            Value::Collection(_) => "collection".to_string(),
            Value::Stream(_) => "stream".to_string(),
        }
    }
}

/// Why a resource appears as deleted in a delta payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletedReason {
    #[default]
    Deleted,
    /// The resource no longer matches the tracked query.
    Changed,
}

impl DeletedReason {
    /// Returns the wire form of the reason.
    pub fn as_str(self) -> &'static str {
        match self {
            DeletedReason::Deleted => DEFAULT_DELETED_REASON,
            DeletedReason::Changed => "changed",
        }
    }
}

/// Marks a resource as deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deletion {
    /// Identity URI; computed from the link builder when absent.
    pub id: Option<String>,
    pub reason: DeletedReason,
}

/// A changed navigation in a delta payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedChange {
    /// The navigation changed; its current value is read from the instance.
    Changed,
    /// The changed nested value itself, whose runtime shape (delta, deleted
    /// or plain) selects the nested encoder.
    Payload(Value),
}

/// Change tracking attached to an instance for partial-update payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaChangeSet {
    /// Names of changed structural properties.
    pub changed: BTreeSet<String>,
    /// Changed navigation properties.
    pub navigations: BTreeMap<String, NestedChange>,
}

impl DeltaChangeSet {
    /// Creates a change set from changed property names.
    pub fn new<I, S>(changed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            changed: changed.into_iter().map(Into::into).collect(),
            navigations: BTreeMap::new(),
        }
    }

    /// Returns true if `name` is reported as changed.
    pub fn is_changed(&self, name: &str) -> bool {
        self.changed.contains(name)
    }

    /// Returns the nested change for a navigation, treating a navigation
    /// listed only in `changed` as a bare `Changed` marker.
    pub fn navigation(&self, name: &str) -> Option<&NestedChange> {
        const CHANGED: &NestedChange = &NestedChange::Changed;
        match self.navigations.get(name) {
            Some(change) => Some(change),
            None if self.changed.contains(name) => Some(CHANGED),
            None => None,
        }
    }
}

/// A structured node of the object graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceInstance {
    /// Runtime type name; `None` for untyped instances.
    pub type_name: Option<String>,
    /// Declared property values (every property, for untyped instances).
    pub properties: Vec<(String, Value)>,
    /// Open-type properties not declared by the schema.
    pub dynamic_properties: Vec<(String, Value)>,
    /// Values attached by the query layer for computed properties.
    pub computed: Vec<(String, Value)>,
    pub change_set: Option<DeltaChangeSet>,
    pub deletion: Option<Deletion>,
    /// Navigation source this instance belongs to, when it differs from the
    /// one it is written under (delta entries, deleted resources).
    pub navigation_source: Option<String>,
}

impl ResourceInstance {
    /// Creates an empty instance of the given type.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Creates an empty untyped instance.
    pub fn untyped() -> Self {
        Self::default()
    }

    /// Returns true for instances without a runtime type.
    pub fn is_untyped(&self) -> bool {
        self.type_name.is_none()
    }

    /// Reads a declared property value.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Reads a dynamic property value.
    pub fn dynamic_property(&self, name: &str) -> Option<&Value> {
        self.dynamic_properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Reads a computed value.
    pub fn computed_value(&self, name: &str) -> Option<&Value> {
        self.computed
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl From<PrimitiveValue> for Value {
    fn from(value: PrimitiveValue) -> Self {
        Value::Primitive(value)
    }
}

impl From<ResourceInstance> for Value {
    fn from(value: ResourceInstance) -> Self {
        Value::Resource(Box::new(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Collection(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

macro_rules! primitive_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PrimitiveValue {
                fn from(value: $ty) -> Self {
                    PrimitiveValue::$variant(value.into())
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Primitive(PrimitiveValue::$variant(value.into()))
                }
            }
        )*
    };
}

primitive_from! {
    bool => Boolean,
    u8 => Byte,
    i8 => SByte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Single,
    f64 => Double,
    String => String,
    &str => String,
    Uuid => Guid,
    Vec<u8> => Binary,
}
