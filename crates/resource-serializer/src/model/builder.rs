//! Builder API for ergonomic model and instance construction.
//!
//! # Example
//!
//! ```rust
//! use resource_serializer::model::builder::{ModelBuilder, ResourceBuilder};
//!
//! let model = ModelBuilder::new("Sales")
//!     .entity_type("Customer", |t| t
//!         .key("Id")
//!         .property("Id", "Edm.Int32")
//!         .property("Name", "Edm.String")
//!     )
//!     .entity_set("Customers", "Customer", |s| s.conventional("https://host/svc"))
//!     .build()
//!     .unwrap();
//!
//! let customer = ResourceBuilder::new("Sales.Customer")
//!     .property("Id", 1)
//!     .property("Name", "Acme")
//!     .build();
//!
//! assert!(model.structured_type("Sales.Customer").is_some());
//! assert_eq!(customer.properties.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::SerializeError;
use crate::limits::UNTYPED_TYPE_NAME;
use crate::links::{ConventionLinkBuilder, LinkBuilder};
use crate::model::{
    BoundOperation, DeletedReason, Deletion, DeltaChangeSet, EdmModel, EnumType,
    NavigationProperty, NavigationSource, NestedChange, OperationKind, PrimitiveKind,
    ResourceInstance, StructuralProperty, StructuredType, TypeKind, TypeRef, Value,
};

/// Builder for constructing an [`EdmModel`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    namespace: String,
    types: Vec<StructuredTypeBuilder>,
    enums: Vec<EnumType>,
    sources: Vec<NavigationSourceBuilder>,
    operations: Vec<BoundOperation>,
}

impl ModelBuilder {
    /// Creates a builder; unqualified names are placed in `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            types: Vec::new(),
            enums: Vec::new(),
            sources: Vec::new(),
            operations: Vec::new(),
        }
    }

    fn qualify(&self, name: &str) -> String {
        qualify(&self.namespace, name)
    }

    /// Adds an entity type using a builder function.
    pub fn entity_type<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(StructuredTypeBuilder) -> StructuredTypeBuilder,
    {
        let builder = f(StructuredTypeBuilder::new(self.qualify(name), TypeKind::Entity));
        self.types.push(builder);
        self
    }

    /// Adds a complex type using a builder function.
    pub fn complex_type<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(StructuredTypeBuilder) -> StructuredTypeBuilder,
    {
        let builder = f(StructuredTypeBuilder::new(self.qualify(name), TypeKind::Complex));
        self.types.push(builder);
        self
    }

    /// Adds an enum type; member values are assigned in order from 0.
    pub fn enum_type<'a>(mut self, name: &str, members: impl IntoIterator<Item = &'a str>) -> Self {
        let enum_type = EnumType {
            full_name: self.qualify(name),
            members: members
                .into_iter()
                .enumerate()
                .map(|(i, m)| (m.to_string(), i as i64))
                .collect(),
            is_flags: false,
        };
        self.enums.push(enum_type);
        self
    }

    /// Adds a flags enum type; member values are powers of two.
    pub fn flags_enum_type<'a>(
        mut self,
        name: &str,
        members: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let enum_type = EnumType {
            full_name: self.qualify(name),
            members: members
                .into_iter()
                .enumerate()
                .map(|(i, m)| (m.to_string(), 1i64 << i))
                .collect(),
            is_flags: true,
        };
        self.enums.push(enum_type);
        self
    }

    /// Adds an entity set using a builder function.
    pub fn entity_set<F>(mut self, name: &str, entity_type: &str, f: F) -> Self
    where
        F: FnOnce(NavigationSourceBuilder) -> NavigationSourceBuilder,
    {
        let builder = f(NavigationSourceBuilder::new(name, self.qualify(entity_type)));
        self.sources.push(builder);
        self
    }

    /// Binds an action to a type.
    pub fn action(mut self, binding_type: &str, name: &str) -> Self {
        self.operations.push(BoundOperation {
            full_name: self.qualify(name),
            kind: OperationKind::Action,
            binding_type: self.qualify(binding_type),
        });
        self
    }

    /// Binds a function to a type.
    pub fn function(mut self, binding_type: &str, name: &str) -> Self {
        self.operations.push(BoundOperation {
            full_name: self.qualify(name),
            kind: OperationKind::Function,
            binding_type: self.qualify(binding_type),
        });
        self
    }

    /// Resolves every type reference and builds the model.
    pub fn build(self) -> Result<EdmModel, SerializeError> {
        let mut model = EdmModel::new();
        for enum_type in self.enums {
            model.enums.insert(enum_type.full_name.clone(), enum_type);
        }

        // Register shells first so properties can reference any type.
        let kinds: BTreeMap<String, TypeKind> = self
            .types
            .iter()
            .map(|t| (t.full_name.clone(), t.kind))
            .collect();

        for builder in self.types {
            let mut properties = Vec::with_capacity(builder.properties.len());
            for (name, raw_type, nullable) in builder.properties {
                let type_ref = resolve_type_ref(&self.namespace, &raw_type, &kinds, &model)?;
                properties.push(StructuralProperty {
                    name,
                    type_ref,
                    nullable,
                });
            }

            let mut navigation_properties = Vec::with_capacity(builder.navigations.len());
            for mut navigation in builder.navigations {
                navigation.target_type = qualify(&self.namespace, &navigation.target_type);
                if kinds.get(&navigation.target_type) != Some(&TypeKind::Entity) {
                    return Err(SerializeError::UnknownType {
                        type_name: navigation.target_type,
                    });
                }
                navigation_properties.push(navigation);
            }

            let base_type = builder.base_type.map(|b| qualify(&self.namespace, &b));
            if let Some(base) = &base_type {
                if !kinds.contains_key(base) {
                    return Err(SerializeError::UnknownType {
                        type_name: base.clone(),
                    });
                }
            }

            model.types.insert(
                builder.full_name.clone(),
                StructuredType {
                    full_name: builder.full_name,
                    kind: builder.kind,
                    base_type,
                    open: builder.open,
                    is_abstract: builder.is_abstract,
                    keys: builder.keys,
                    properties,
                    navigation_properties,
                },
            );
        }

        for source in self.sources {
            if !model.types.contains_key(&source.entity_type) {
                return Err(SerializeError::UnknownType {
                    type_name: source.entity_type,
                });
            }
            let link_builder = source.link_builder.or_else(|| {
                source.service_root.as_ref().map(|root| {
                    Arc::new(ConventionLinkBuilder::new(root.clone(), source.name.clone()))
                        as Arc<dyn LinkBuilder + Send + Sync>
                })
            });
            model.sources.insert(
                source.name.clone(),
                NavigationSource {
                    name: source.name,
                    entity_type: source.entity_type,
                    concurrency_properties: source.concurrency_properties,
                    bindings: source.bindings,
                    link_builder,
                },
            );
        }

        model.operations = self.operations;
        Ok(model)
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if name.contains('.') || name.starts_with("Collection(") {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

fn resolve_type_ref(
    namespace: &str,
    raw: &str,
    kinds: &BTreeMap<String, TypeKind>,
    model: &EdmModel,
) -> Result<TypeRef, SerializeError> {
    if let Some(inner) = raw
        .strip_prefix("Collection(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let element = resolve_type_ref(namespace, inner, kinds, model)?;
        return Ok(TypeRef::Collection(Box::new(element)));
    }
    if raw == UNTYPED_TYPE_NAME {
        return Ok(TypeRef::Untyped);
    }
    if raw == "Edm.Stream" {
        return Ok(TypeRef::Stream);
    }
    if let Some(kind) = PrimitiveKind::from_name(raw) {
        return Ok(TypeRef::Primitive(kind));
    }

    let name = qualify(namespace, raw);
    if model.enums.contains_key(&name) {
        return Ok(TypeRef::Enum(name));
    }
    match kinds.get(&name) {
        Some(TypeKind::Complex) => Ok(TypeRef::Complex(name)),
        Some(TypeKind::Entity) => Ok(TypeRef::Entity(name)),
        None => Err(SerializeError::UnknownType { type_name: name }),
    }
}

/// Builder for a structured type declaration.
#[derive(Debug, Clone)]
pub struct StructuredTypeBuilder {
    full_name: String,
    kind: TypeKind,
    base_type: Option<String>,
    open: bool,
    is_abstract: bool,
    keys: Vec<String>,
    properties: Vec<(String, String, bool)>,
    navigations: Vec<NavigationProperty>,
}

impl StructuredTypeBuilder {
    fn new(full_name: String, kind: TypeKind) -> Self {
        Self {
            full_name,
            kind,
            base_type: None,
            open: false,
            is_abstract: false,
            keys: Vec::new(),
            properties: Vec::new(),
            navigations: Vec::new(),
        }
    }

    /// Adds a key property name (call repeatedly for composite keys).
    pub fn key(mut self, name: &str) -> Self {
        self.keys.push(name.to_string());
        self
    }

    /// Derives this type from `base`.
    pub fn base(mut self, base: &str) -> Self {
        self.base_type = Some(base.to_string());
        self
    }

    /// Marks the type as open (permits dynamic properties).
    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    /// Marks the type as abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds a nullable structural property (`Edm.*`, `Collection(..)`, or a model type name).
    pub fn property(mut self, name: &str, type_name: &str) -> Self {
        self.properties
            .push((name.to_string(), type_name.to_string(), true));
        self
    }

    /// Adds a non-nullable structural property.
    pub fn required(mut self, name: &str, type_name: &str) -> Self {
        self.properties
            .push((name.to_string(), type_name.to_string(), false));
        self
    }

    /// Adds a navigation property.
    pub fn navigation(mut self, name: &str, target_type: &str, collection: bool) -> Self {
        self.navigations.push(NavigationProperty {
            name: name.to_string(),
            target_type: target_type.to_string(),
            collection,
            contains_target: false,
        });
        self
    }

    /// Adds a containment navigation property.
    pub fn contained(mut self, name: &str, target_type: &str, collection: bool) -> Self {
        self.navigations.push(NavigationProperty {
            name: name.to_string(),
            target_type: target_type.to_string(),
            collection,
            contains_target: true,
        });
        self
    }
}

/// Builder for an entity set.
#[derive(Debug, Clone)]
pub struct NavigationSourceBuilder {
    name: String,
    entity_type: String,
    concurrency_properties: Vec<String>,
    bindings: BTreeMap<String, String>,
    service_root: Option<String>,
    link_builder: Option<Arc<dyn LinkBuilder + Send + Sync>>,
}

impl NavigationSourceBuilder {
    fn new(name: &str, entity_type: String) -> Self {
        Self {
            name: name.to_string(),
            entity_type,
            concurrency_properties: Vec::new(),
            bindings: BTreeMap::new(),
            service_root: None,
            link_builder: None,
        }
    }

    /// Adds a concurrency-token property.
    pub fn concurrency(mut self, property: &str) -> Self {
        self.concurrency_properties.push(property.to_string());
        self
    }

    /// Binds a navigation property to a target entity set.
    pub fn bind(mut self, navigation: &str, target: &str) -> Self {
        self.bindings
            .insert(navigation.to_string(), target.to_string());
        self
    }

    /// Uses a convention-based link builder rooted at `service_root`.
    pub fn conventional(mut self, service_root: &str) -> Self {
        self.service_root = Some(service_root.trim_end_matches('/').to_string());
        self
    }

    /// Uses a custom link builder.
    pub fn link_builder(mut self, builder: Arc<dyn LinkBuilder + Send + Sync>) -> Self {
        self.link_builder = Some(builder);
        self
    }
}

/// Builder for a [`ResourceInstance`].
#[derive(Debug, Clone, Default)]
pub struct ResourceBuilder {
    instance: ResourceInstance,
}

impl ResourceBuilder {
    /// Creates a builder for an instance of `type_name`.
    pub fn new(type_name: &str) -> Self {
        Self {
            instance: ResourceInstance::typed(type_name),
        }
    }

    /// Creates a builder for an untyped instance.
    pub fn untyped() -> Self {
        Self::default()
    }

    /// Sets a declared property.
    pub fn property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.instance
            .properties
            .push((name.to_string(), value.into()));
        self
    }

    /// Sets a dynamic (open-type) property.
    pub fn dynamic(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.instance
            .dynamic_properties
            .push((name.to_string(), value.into()));
        self
    }

    /// Attaches a computed value.
    pub fn computed(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.instance.computed.push((name.to_string(), value.into()));
        self
    }

    /// Reports structural properties as changed.
    pub fn changed<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let changes = self.instance.change_set.get_or_insert_with(DeltaChangeSet::default);
        changes.changed.extend(names.into_iter().map(str::to_string));
        self
    }

    /// Reports a navigation property as changed.
    pub fn changed_navigation(mut self, name: &str, change: NestedChange) -> Self {
        let changes = self.instance.change_set.get_or_insert_with(DeltaChangeSet::default);
        changes.navigations.insert(name.to_string(), change);
        self
    }

    /// Marks the instance as deleted.
    pub fn deleted(mut self, id: Option<&str>, reason: DeletedReason) -> Self {
        self.instance.deletion = Some(Deletion {
            id: id.map(str::to_string),
            reason,
        });
        self
    }

    /// Sets the navigation source the instance belongs to.
    pub fn navigation_source(mut self, name: &str) -> Self {
        self.instance.navigation_source = Some(name.to_string());
        self
    }

    /// Returns the built instance.
    pub fn build(self) -> ResourceInstance {
        self.instance
    }

    /// Returns the built instance as a graph value.
    pub fn into_value(self) -> Value {
        Value::Resource(Box::new(self.instance))
    }
}

impl From<ResourceBuilder> for Value {
    fn from(builder: ResourceBuilder) -> Self {
        builder.into_value()
    }
}

/// Creates an enum member value of a declared enum type.
pub fn enum_value(type_name: &str, member: &str) -> Value {
    Value::Enum {
        type_name: Some(type_name.to_string()),
        member: member.to_string(),
    }
}
