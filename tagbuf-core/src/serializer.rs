//! The serializer facade.

use std::sync::Arc;

use crate::buffer::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};
use crate::codec::Codec;
use crate::config::SerializerConfig;
use crate::custom::CustomDeclaration;
use crate::descriptor::Described;
use crate::error::{DecodeError, Result};
use crate::extract::MemberExtractor;
use crate::registry::CodecRegistry;

/// Serializes and deserializes [`Described`] values.
///
/// Each serializer owns its codec registry; codecs are built on first use
/// of a type and shared by every thread using the serializer.
///
/// # Example
///
/// ```
/// use tagbuf_core::{CompositeBuilder, Described, Serializer, TypeDescriptor};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Order {
///     id: u64,
///     note: Option<String>,
/// }
///
/// impl Described for Order {
///     fn describe() -> TypeDescriptor {
///         let shape = CompositeBuilder::<Self>::new()
///             .field("id", |o| &o.id, |o, v| o.id = v)
///             .field("note", |o| &o.note, |o, v| o.note = v)
///             .build();
///         TypeDescriptor::of::<Self>("Order", shape)
///     }
/// }
///
/// let serializer = Serializer::new();
/// let order = Order { id: 42, note: None };
/// let bytes = serializer.serialize(&order).unwrap();
/// let decoded: Order = serializer.deserialize(&bytes).unwrap();
/// assert_eq!(decoded, order);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    registry: CodecRegistry,
}

impl Serializer {
    /// Creates a serializer with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a serializer with the given configuration.
    pub fn with_config(config: SerializerConfig) -> Self {
        Self {
            registry: CodecRegistry::new(config),
        }
    }

    /// Creates a serializer with an explicit member extractor, overriding
    /// the one selected by `config`.
    pub fn with_extractor(config: SerializerConfig, extractor: Arc<dyn MemberExtractor>) -> Self {
        Self {
            registry: CodecRegistry::with_extractor(config, extractor),
        }
    }

    /// Returns the codec registry.
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Returns the codec of `T`, building it on first use.
    pub fn codec<T: Described>(&self) -> Result<Arc<Codec>> {
        self.registry.codec::<T>()
    }

    /// Makes `T` resolvable when read as a dynamic value.
    pub fn register<T: Described>(&self) {
        self.registry.register::<T>();
    }

    /// Declares custom serialization for `T`.
    pub fn declare_custom<T: Described>(&self, declaration: CustomDeclaration) {
        self.registry.declare_custom::<T>(declaration);
    }

    /// Returns the encoded size of `value` in bytes.
    pub fn size_of<T: Described>(&self, value: &T) -> Result<usize> {
        self.codec::<T>()?.size(value)
    }

    /// Serializes `value` into a new buffer.
    pub fn serialize<T: Described>(&self, value: &T) -> Result<Vec<u8>> {
        let codec = self.codec::<T>()?;
        let size = codec.size(value)?;
        let mut output = ObjectDataOutput::with_capacity(size);
        codec.write(value, &mut output)?;
        Ok(output.into_bytes())
    }

    /// Appends the encoding of `value` to `output`.
    pub fn serialize_into<T: Described>(&self, value: &T, output: &mut dyn DataOutput) -> Result<()> {
        self.codec::<T>()?.write(value, output)
    }

    /// Deserializes a `T` that spans all of `bytes`.
    pub fn deserialize<T: Described>(&self, bytes: &[u8]) -> Result<T> {
        let mut input = ObjectDataInput::new(bytes);
        let value = self.deserialize_from(&mut input)?;
        if input.remaining() > 0 {
            return Err(DecodeError::new(format!(
                "{} trailing bytes after value",
                input.remaining()
            ))
            .into());
        }
        Ok(value)
    }

    /// Reads one `T` from `input`, leaving anything after it unread.
    pub fn deserialize_from<T: Described>(&self, input: &mut dyn DataInput) -> Result<T> {
        self.codec::<T>()?.read_typed(input)
    }

    /// Deep-copies `value` through its encoding.
    pub fn copy<T: Described>(&self, value: &T) -> Result<T> {
        self.deserialize(&self.serialize(value)?)
    }

    /// Reads the encoding of `value` as a `U`.
    ///
    /// Composite members are matched by name: members of `U` that `value`
    /// does not have keep their defaults, members `U` does not have are
    /// dropped.
    pub fn change_type<T: Described, U: Described>(&self, value: &T) -> Result<U> {
        self.deserialize(&self.serialize(value)?)
    }
}
