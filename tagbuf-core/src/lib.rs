//! Tagged binary serialization for described Rust types.
//!
//! Every value is written as a one-byte category tag followed by a payload
//! that can be skipped without knowing the type. Composite members are keyed
//! by a hash of their name, which keeps encodings readable across versions
//! of a type that add, drop or reorder members.
//!
//! Types take part by implementing [`Described`], usually through
//! `#[derive(Described)]` from `tagbuf-derive`. A [`Serializer`] builds one
//! [`Codec`] per type on first use and caches it in its [`CodecRegistry`].

#![warn(missing_docs)]

pub mod buffer;
pub mod codec;
pub mod config;
pub mod custom;
pub mod descriptor;
pub mod error;
pub mod extract;
pub mod registry;
pub mod serializer;
pub mod wire;

mod composite;
mod dispatch;

pub use buffer::{
    DataInput, DataOutput, InputFrame, ObjectDataInput, ObjectDataOutput, OutputFrame,
};
pub use codec::Codec;
pub use config::{ConfigError, ExtractorKind, SerializerConfig, SerializerConfigBuilder};
pub use custom::{CustomDeclaration, CustomDeclarationBuilder, CustomSerializer};
pub use descriptor::{
    AnyValue, CompositeBuilder, CompositeShape, Described, DescribedEnum, DictionaryShape,
    DynArray, DynValue, EnumShape, ErasedValue, MemberDescriptor, MemberGetter, MemberOrigin,
    MemberRef, MemberSetter, OptionalShape, PackedOps, PackedSequence, Primitive, PrimitiveShape,
    SequenceShape, Shape, TypeDescriptor, TypeRef,
};
pub use error::{DecodeError, MemberFrame, Result, TagbufError};
pub use extract::{AccessorPairExtractor, FieldExtractor, MemberExtractor};
pub use registry::CodecRegistry;
pub use serializer::Serializer;
pub use wire::{PrimitiveKind, WireTag};
