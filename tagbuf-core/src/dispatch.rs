//! Chooses how a type is serialized.
//!
//! The first matching rule wins:
//!
//! 1. a custom declaration (registered at runtime, then the descriptor's own);
//! 2. string, date-time and uuid;
//! 3. enums;
//! 4. primitives and decimal;
//! 5. optionals;
//! 6. arrays, packed when the element type is primitive;
//! 7. untyped arrays;
//! 8. dictionaries;
//! 9. lists, packed when the element type is primitive;
//! 10. dynamic values;
//! 11. composites.
//!
//! Opaque types without a custom declaration are rejected.

use std::sync::Arc;

use tracing::debug;

use crate::codec::{builtin, dynamic, sequence, Codec};
use crate::composite;
use crate::custom;
use crate::descriptor::{Shape, TypeDescriptor};
use crate::error::{Result, TagbufError};
use crate::registry::RegistryShared;

/// Builds the codec of `descriptor`'s type. Nested types are resolved
/// through `registry`.
pub(crate) fn build_codec(
    registry: &Arc<RegistryShared>,
    descriptor: &TypeDescriptor,
) -> Result<Codec> {
    if let Some(declaration) = registry.custom_declaration(descriptor.id()) {
        debug!(
            type_name = descriptor.name(),
            owner = declaration.owner(),
            "using runtime custom declaration"
        );
        return custom::build_codec(descriptor, &declaration, registry.config());
    }
    if let Some(declaration) = descriptor.custom() {
        debug!(
            type_name = descriptor.name(),
            owner = declaration.owner(),
            "using declared custom serialization"
        );
        return custom::build_codec(descriptor, declaration, registry.config());
    }

    match descriptor.shape() {
        Shape::String => Ok(builtin::string(descriptor)),
        Shape::DateTime => Ok(builtin::date_time(descriptor)),
        Shape::Uuid => Ok(builtin::uuid(descriptor)),
        Shape::Enum(shape) => Ok(builtin::enumeration(descriptor, *shape)),
        Shape::Primitive(shape) => Ok(builtin::primitive(descriptor, *shape)),
        Shape::Decimal => Ok(builtin::decimal(descriptor)),
        Shape::Optional(shape) => builtin::optional(registry, descriptor, *shape),
        Shape::Array(shape) => sequence::sequence(registry, descriptor, *shape, false),
        Shape::UntypedArray => sequence::untyped_array(registry, descriptor),
        Shape::Dictionary(shape) => sequence::dictionary(registry, descriptor, *shape),
        Shape::List(shape) => sequence::sequence(registry, descriptor, *shape, true),
        Shape::Dynamic => Ok(dynamic::any_value(registry, descriptor)),
        Shape::Composite(_) => composite::build_codec(registry, descriptor),
        Shape::Opaque => Err(TagbufError::UnsupportedType(format!(
            "{} has no structural form and no custom serialization",
            descriptor.name()
        ))),
    }
}
