//! Encoder resolution per declared type.

use std::fmt;

use crate::model::{EdmModel, TypeRef};

/// Which encoder writes values of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    /// A single entity or complex value.
    Resource,
    /// A collection of entity or complex values.
    ResourceSet,
    Primitive,
    Enum,
    /// A collection of primitive or enum values.
    PrimitiveCollection,
    Stream,
    Untyped,
}

/// Resolves the encoder for a type reference.
///
/// `None` means no encoder is registered for the type; writing a value of it
/// fails with [`SerializeError::NoEncoder`](crate::error::SerializeError).
pub trait EncoderProvider: fmt::Debug {
    fn encoder_for(&self, model: &EdmModel, type_ref: &TypeRef) -> Option<EncoderKind>;
}

/// Provider covering every type the model declares.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncoderProvider;

impl EncoderProvider for DefaultEncoderProvider {
    fn encoder_for(&self, model: &EdmModel, type_ref: &TypeRef) -> Option<EncoderKind> {
        match type_ref {
            TypeRef::Primitive(_) => Some(EncoderKind::Primitive),
            TypeRef::Enum(name) => model.enum_type(name).map(|_| EncoderKind::Enum),
            TypeRef::Complex(name) | TypeRef::Entity(name) => {
                model.structured_type(name).map(|_| EncoderKind::Resource)
            }
            TypeRef::Collection(element) => match self.encoder_for(model, element)? {
                EncoderKind::Resource => Some(EncoderKind::ResourceSet),
                EncoderKind::Primitive | EncoderKind::Enum => Some(EncoderKind::PrimitiveCollection),
                EncoderKind::Untyped => Some(EncoderKind::Untyped),
                _ => None,
            },
            TypeRef::Stream => Some(EncoderKind::Stream),
            TypeRef::Untyped => Some(EncoderKind::Untyped),
        }
    }
}
