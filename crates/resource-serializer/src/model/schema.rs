//! Schema types: structured types, enums, navigation sources and bound operations.
//!
//! The model is read-only during encoding. Derived types inherit declared
//! properties, keys and openness from their base chain.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::limits::UNTYPED_TYPE_NAME;
use crate::links::LinkBuilder;

/// Primitive kinds with a wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Guid,
    Binary,
    Date,
    TimeOfDay,
    DateTimeOffset,
    Duration,
}

lazy_static! {
    static ref PRIMITIVE_KINDS: FxHashMap<&'static str, PrimitiveKind> = {
        let mut kinds = FxHashMap::default();
        for kind in PrimitiveKind::ALL {
            kinds.insert(kind.name(), kind);
        }
        kinds
    };
}

impl PrimitiveKind {
    /// Every primitive kind, in declaration order.
    pub const ALL: [PrimitiveKind; 16] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::SByte,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::Single,
        PrimitiveKind::Double,
        PrimitiveKind::Decimal,
        PrimitiveKind::String,
        PrimitiveKind::Guid,
        PrimitiveKind::Binary,
        PrimitiveKind::Date,
        PrimitiveKind::TimeOfDay,
        PrimitiveKind::DateTimeOffset,
        PrimitiveKind::Duration,
    ];

    /// Looks up a kind by its qualified name (e.g. `Edm.Int32`).
    pub fn from_name(name: &str) -> Option<PrimitiveKind> {
        PRIMITIVE_KINDS.get(name).copied()
    }

    /// Returns the qualified name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Edm.Boolean",
            PrimitiveKind::Byte => "Edm.Byte",
            PrimitiveKind::SByte => "Edm.SByte",
            PrimitiveKind::Int16 => "Edm.Int16",
            PrimitiveKind::Int32 => "Edm.Int32",
            PrimitiveKind::Int64 => "Edm.Int64",
            PrimitiveKind::Single => "Edm.Single",
            PrimitiveKind::Double => "Edm.Double",
            PrimitiveKind::Decimal => "Edm.Decimal",
            PrimitiveKind::String => "Edm.String",
            PrimitiveKind::Guid => "Edm.Guid",
            PrimitiveKind::Binary => "Edm.Binary",
            PrimitiveKind::Date => "Edm.Date",
            PrimitiveKind::TimeOfDay => "Edm.TimeOfDay",
            PrimitiveKind::DateTimeOffset => "Edm.DateTimeOffset",
            PrimitiveKind::Duration => "Edm.Duration",
        }
    }

    /// Returns true for integral kinds.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::SByte
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
        )
    }
}

/// Reference to the type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    Enum(String),
    Complex(String),
    Entity(String),
    Collection(Box<TypeRef>),
    Stream,
    Untyped,
}

impl TypeRef {
    /// Returns true for collection types.
    pub fn is_collection(&self) -> bool {
        matches!(self, TypeRef::Collection(_))
    }

    /// Returns the element type of a collection, or self.
    pub fn element(&self) -> &TypeRef {
        match self {
            TypeRef::Collection(inner) => inner,
            other => other,
        }
    }

    /// Returns true for `Edm.Untyped` and `Collection(Edm.Untyped)`.
    pub fn is_untyped(&self) -> bool {
        matches!(self.element(), TypeRef::Untyped)
    }

    /// Returns true when the element type is complex or entity.
    pub fn is_structured(&self) -> bool {
        matches!(self.element(), TypeRef::Complex(_) | TypeRef::Entity(_))
    }

    /// Returns the qualified name of the element's structured type, if any.
    pub fn structured_name(&self) -> Option<&str> {
        match self.element() {
            TypeRef::Complex(name) | TypeRef::Entity(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the qualified type name (e.g. `Collection(Edm.String)`).
    pub fn full_name(&self) -> String {
        match self {
            TypeRef::Primitive(kind) => kind.name().to_string(),
            TypeRef::Enum(name) | TypeRef::Complex(name) | TypeRef::Entity(name) => name.clone(),
            TypeRef::Collection(inner) => format!("Collection({})", inner.full_name()),
            TypeRef::Stream => "Edm.Stream".to_string(),
            TypeRef::Untyped => UNTYPED_TYPE_NAME.to_string(),
        }
    }
}

/// A declared structural property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralProperty {
    pub name: String,
    pub type_ref: TypeRef,
    pub nullable: bool,
}

/// A declared navigation property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationProperty {
    pub name: String,
    /// Qualified name of the target entity type.
    pub target_type: String,
    pub collection: bool,
    /// Targets reached through containment carry no links of their own.
    pub contains_target: bool,
}

impl NavigationProperty {
    /// Returns the property's type as a type reference.
    pub fn type_ref(&self) -> TypeRef {
        let target = TypeRef::Entity(self.target_type.clone());
        if self.collection {
            TypeRef::Collection(Box::new(target))
        } else {
            target
        }
    }
}

/// Entity or complex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Entity,
    Complex,
}

/// A structured type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredType {
    /// Qualified name (`Namespace.Name`).
    pub full_name: String,
    pub kind: TypeKind,
    pub base_type: Option<String>,
    pub open: bool,
    pub is_abstract: bool,
    /// Key property names (entities only; empty means inherited).
    pub keys: Vec<String>,
    pub properties: Vec<StructuralProperty>,
    pub navigation_properties: Vec<NavigationProperty>,
}

impl StructuredType {
    /// Returns true for entity types.
    pub fn is_entity(&self) -> bool {
        self.kind == TypeKind::Entity
    }

    /// Returns the unqualified name.
    pub fn name(&self) -> &str {
        self.full_name.rsplit('.').next().unwrap_or(&self.full_name)
    }
}

/// An enum type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub full_name: String,
    pub members: Vec<(String, i64)>,
    pub is_flags: bool,
}

impl EnumType {
    /// Returns true if `member` names a declared member (each flag, for flags enums).
    pub fn has_member(&self, member: &str) -> bool {
        let known = |name: &str| self.members.iter().any(|(m, _)| m == name);
        if self.is_flags {
            member.split(',').map(str::trim).all(known)
        } else {
            known(member)
        }
    }
}

/// Action or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Action,
    Function,
}

/// An operation bound to a structured type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundOperation {
    /// Qualified name (`Namespace.Name`).
    pub full_name: String,
    pub kind: OperationKind,
    /// Qualified name of the binding type.
    pub binding_type: String,
}

impl BoundOperation {
    /// Returns the unqualified name, used as the operation title.
    pub fn name(&self) -> &str {
        self.full_name.rsplit('.').next().unwrap_or(&self.full_name)
    }

    /// Returns the namespace part of the qualified name.
    pub fn namespace(&self) -> &str {
        self.full_name
            .rsplit_once('.')
            .map(|(ns, _)| ns)
            .unwrap_or("")
    }
}

/// An entity set or singleton.
#[derive(Clone)]
pub struct NavigationSource {
    pub name: String,
    /// Qualified name of the entity type.
    pub entity_type: String,
    /// Properties whose values make up the ETag.
    pub concurrency_properties: Vec<String>,
    /// Navigation property name to target navigation source name.
    pub bindings: BTreeMap<String, String>,
    pub link_builder: Option<Arc<dyn LinkBuilder + Send + Sync>>,
}

impl fmt::Debug for NavigationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationSource")
            .field("name", &self.name)
            .field("entity_type", &self.entity_type)
            .field("concurrency_properties", &self.concurrency_properties)
            .field("bindings", &self.bindings)
            .field("link_builder", &self.link_builder.is_some())
            .finish()
    }
}

impl NavigationSource {
    /// Returns the link builder as a trait object.
    pub fn link_builder(&self) -> Option<&(dyn LinkBuilder + Send + Sync)> {
        self.link_builder.as_deref()
    }
}

/// The active model.
#[derive(Debug, Clone, Default)]
pub struct EdmModel {
    pub(crate) types: FxHashMap<String, StructuredType>,
    pub(crate) enums: FxHashMap<String, EnumType>,
    pub(crate) sources: FxHashMap<String, NavigationSource>,
    pub(crate) operations: Vec<BoundOperation>,
}

impl EdmModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a structured type by qualified name.
    pub fn structured_type(&self, name: &str) -> Option<&StructuredType> {
        self.types.get(name)
    }

    /// Looks up an enum type by qualified name.
    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    /// Looks up a navigation source by name.
    pub fn navigation_source(&self, name: &str) -> Option<&NavigationSource> {
        self.sources.get(name)
    }

    /// Resolves a qualified type name (`Edm.*`, `Collection(..)` or a model type).
    pub fn type_ref(&self, name: &str) -> Option<TypeRef> {
        if let Some(inner) = name
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return self
                .type_ref(inner)
                .map(|element| TypeRef::Collection(Box::new(element)));
        }
        if name == UNTYPED_TYPE_NAME {
            return Some(TypeRef::Untyped);
        }
        if name == "Edm.Stream" {
            return Some(TypeRef::Stream);
        }
        if let Some(kind) = PrimitiveKind::from_name(name) {
            return Some(TypeRef::Primitive(kind));
        }
        if self.enums.contains_key(name) {
            return Some(TypeRef::Enum(name.to_string()));
        }
        self.types.get(name).map(|ty| match ty.kind {
            TypeKind::Entity => TypeRef::Entity(name.to_string()),
            TypeKind::Complex => TypeRef::Complex(name.to_string()),
        })
    }

    /// Looks up a bound operation by qualified name.
    pub fn operation(&self, full_name: &str) -> Option<&BoundOperation> {
        self.operations.iter().find(|op| op.full_name == full_name)
    }

    /// Returns the type followed by its base chain, most derived first.
    pub fn type_chain<'m>(&'m self, ty: &'m StructuredType) -> Vec<&'m StructuredType> {
        let mut chain = vec![ty];
        let mut current = ty;
        while let Some(base) = current.base_type.as_deref().and_then(|b| self.types.get(b)) {
            // Guard against a malformed cyclic hierarchy.
            if chain.iter().any(|t| t.full_name == base.full_name) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Returns true if `ty` is `base` or derives from it.
    pub fn is_derived_from(&self, ty: &StructuredType, base: &StructuredType) -> bool {
        self.type_chain(ty)
            .iter()
            .any(|t| t.full_name == base.full_name)
    }

    /// Declared structural properties including inherited ones, base first.
    pub fn properties_of<'m>(&'m self, ty: &'m StructuredType) -> Vec<&'m StructuralProperty> {
        self.type_chain(ty)
            .into_iter()
            .rev()
            .flat_map(|t| t.properties.iter())
            .collect()
    }

    /// Declared navigation properties including inherited ones, base first.
    pub fn navigations_of<'m>(&'m self, ty: &'m StructuredType) -> Vec<&'m NavigationProperty> {
        self.type_chain(ty)
            .into_iter()
            .rev()
            .flat_map(|t| t.navigation_properties.iter())
            .collect()
    }

    /// Finds a declared structural property, searching the base chain.
    pub fn find_property<'m>(
        &'m self,
        ty: &'m StructuredType,
        name: &str,
    ) -> Option<&'m StructuralProperty> {
        self.type_chain(ty)
            .into_iter()
            .find_map(|t| t.properties.iter().find(|p| p.name == name))
    }

    /// Finds a declared navigation property, searching the base chain.
    pub fn find_navigation<'m>(
        &'m self,
        ty: &'m StructuredType,
        name: &str,
    ) -> Option<&'m NavigationProperty> {
        self.type_chain(ty)
            .into_iter()
            .find_map(|t| t.navigation_properties.iter().find(|p| p.name == name))
    }

    /// Returns true if `name` is declared as any property of `ty`.
    pub fn is_declared(&self, ty: &StructuredType, name: &str) -> bool {
        self.find_property(ty, name).is_some() || self.find_navigation(ty, name).is_some()
    }

    /// Key property names, taken from the nearest type in the chain that declares them.
    pub fn keys_of<'m>(&'m self, ty: &'m StructuredType) -> &'m [String] {
        self.type_chain(ty)
            .into_iter()
            .find(|t| !t.keys.is_empty())
            .map(|t| t.keys.as_slice())
            .unwrap_or(&[])
    }

    /// Returns true if `ty` or any base type is open.
    pub fn is_open(&self, ty: &StructuredType) -> bool {
        self.type_chain(ty).iter().any(|t| t.open)
    }

    /// Operations bound to `ty` or one of its base types, in declaration order.
    pub fn bound_operations<'m>(&'m self, ty: &'m StructuredType) -> Vec<&'m BoundOperation> {
        let chain = self.type_chain(ty);
        self.operations
            .iter()
            .filter(|op| chain.iter().any(|t| t.full_name == op.binding_type))
            .collect()
    }

    /// Resolves the navigation source a navigation property leads to.
    pub fn navigation_target(
        &self,
        source: Option<&NavigationSource>,
        navigation: &NavigationProperty,
    ) -> Option<&NavigationSource> {
        if navigation.contains_target {
            return None;
        }
        source
            .and_then(|s| s.bindings.get(&navigation.name))
            .and_then(|target| self.sources.get(target))
    }
}
