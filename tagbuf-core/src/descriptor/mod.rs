//! Type descriptors: the reflection capability codecs are built from.
//!
//! Rust has no runtime member reflection, so every serializable type states
//! its structure once through [`Described`], either with
//! `#[derive(Described)]` or by hand with [`CompositeBuilder`]. A
//! [`TypeDescriptor`] carries the type's identity, its structural [`Shape`]
//! and an optional custom serialization declaration. Values cross the
//! type-erased codec boundary as `&dyn Any` on write and [`ErasedValue`] on
//! read; every shape carries the monomorphized functions needed to look inside
//! such values.

mod builtin;
mod dynamic;
mod member;
mod primitive;

use std::any::{type_name, Any, TypeId};
use std::fmt;

use crate::buffer::{DataInput, DataOutput};
use crate::custom::CustomDeclaration;
use crate::error::{Result, TagbufError};
use crate::wire::PrimitiveKind;

pub use dynamic::{AnyValue, DynArray, DynValue};
pub use member::{
    CompositeBuilder, MemberDescriptor, MemberGetter, MemberOrigin, MemberRef, MemberSetter,
};
pub use primitive::{PackedOps, Primitive};

/// An owned value whose concrete type is known only to its codec.
pub type ErasedValue = Box<dyn Any + Send>;

/// Trait for types that can describe their own structure.
///
/// `Default` is required because decoding starts from the default value and
/// assigns the members found in the input.
pub trait Described: Any + Send + Sync + Default {
    /// Returns the descriptor for this type.
    fn describe() -> TypeDescriptor;

    /// Bulk encoding for primitive element types. Only primitives override this.
    #[doc(hidden)]
    fn packed() -> Option<PackedOps<Self>> {
        None
    }
}

/// A fieldless enum encoded through its underlying integer.
pub trait DescribedEnum: Described {
    /// Returns the underlying integer of this variant.
    fn to_repr(&self) -> i64;

    /// Returns the variant with the given underlying integer.
    fn from_repr(repr: i64) -> Option<Self>;
}

pub(crate) fn downcast<T: Any>(value: &dyn Any) -> Result<&T> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| TagbufError::Encode(format!("value is not a {}", type_name::<T>())))
}

pub(crate) fn unbox<T: Any>(value: ErasedValue) -> Result<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| TagbufError::decode(format!("decoded value is not a {}", type_name::<T>())))
}

/// A lazily described reference to another type.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    describe: fn() -> TypeDescriptor,
}

impl TypeRef {
    /// Creates a reference to `T`.
    pub fn of<T: Described>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            describe: T::describe,
        }
    }

    /// Returns the referenced type's identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Builds the referenced type's descriptor.
    pub fn describe(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.id).finish()
    }
}

/// Identity and structure of one runtime type.
///
/// Descriptors compare by type identity only.
#[derive(Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    shape: Shape,
    custom: Option<CustomDeclaration>,
    default: fn() -> ErasedValue,
    dynamic: fn(ErasedValue) -> Option<AnyValue>,
}

impl TypeDescriptor {
    /// Creates a descriptor for `T`.
    ///
    /// `name` is the stable name used to resolve dynamically typed values on
    /// read; it must be unique among the types a serializer handles.
    pub fn of<T: Described>(name: &'static str, shape: Shape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
            shape,
            custom: None,
            default: default_value::<T>,
            dynamic: into_dynamic::<T>,
        }
    }

    /// Attaches a custom serialization declaration.
    pub fn with_custom(mut self, declaration: CustomDeclaration) -> Self {
        self.custom = Some(declaration);
        self
    }

    /// Returns the type identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the registered type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the structural shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the custom serialization declaration, if any.
    pub fn custom(&self) -> Option<&CustomDeclaration> {
        self.custom.as_ref()
    }

    /// Returns a freshly constructed default value.
    pub fn default_value(&self) -> ErasedValue {
        (self.default)()
    }

    pub(crate) fn default_fn(&self) -> fn() -> ErasedValue {
        self.default
    }

    pub(crate) fn to_dynamic(&self, value: ErasedValue) -> Option<AnyValue> {
        (self.dynamic)(value)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("category", &self.shape.category())
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

fn default_value<T: Described>() -> ErasedValue {
    Box::new(T::default())
}

fn into_dynamic<T: Described>(value: ErasedValue) -> Option<AnyValue> {
    value.downcast::<T>().ok().map(AnyValue::from_box)
}

/// Structural category of a type, in dispatch order.
#[derive(Clone)]
pub enum Shape {
    /// `String`.
    String,
    /// `chrono::DateTime<Utc>`.
    DateTime,
    /// `uuid::Uuid`.
    Uuid,
    /// Fieldless enum encoded as its underlying integer.
    Enum(EnumShape),
    /// Fixed-width numeric or `bool`.
    Primitive(PrimitiveShape),
    /// `rust_decimal::Decimal`.
    Decimal,
    /// `Option<U>`.
    Optional(OptionalShape),
    /// Fixed or boxed array of `T`.
    Array(SequenceShape),
    /// Heterogeneous array of dynamically typed values.
    UntypedArray,
    /// Map of `K` to `V`.
    Dictionary(DictionaryShape),
    /// Growable list of `T`.
    List(SequenceShape),
    /// A value whose concrete type is only known at runtime.
    Dynamic,
    /// A user type serialized member by member.
    Composite(CompositeShape),
    /// A type with no structural form; needs a custom declaration.
    Opaque,
}

impl Shape {
    /// Returns a short category name for diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::DateTime => "datetime",
            Shape::Uuid => "uuid",
            Shape::Enum(_) => "enum",
            Shape::Primitive(_) => "primitive",
            Shape::Decimal => "decimal",
            Shape::Optional(_) => "optional",
            Shape::Array(_) => "array",
            Shape::UntypedArray => "untyped-array",
            Shape::Dictionary(_) => "dictionary",
            Shape::List(_) => "list",
            Shape::Dynamic => "dynamic",
            Shape::Composite(_) => "composite",
            Shape::Opaque => "opaque",
        }
    }
}

/// Conversions between an enum value and its underlying integer.
#[derive(Clone, Copy)]
pub struct EnumShape {
    to_repr: fn(&dyn Any) -> Result<i64>,
    from_repr: fn(i64) -> Option<ErasedValue>,
}

impl EnumShape {
    /// Builds the enum shape of `T`.
    pub fn of<T: DescribedEnum>() -> Self {
        Self {
            to_repr: enum_to_repr::<T>,
            from_repr: enum_from_repr::<T>,
        }
    }

    pub(crate) fn to_repr(&self, value: &dyn Any) -> Result<i64> {
        (self.to_repr)(value)
    }

    pub(crate) fn from_repr(&self, repr: i64) -> Option<ErasedValue> {
        (self.from_repr)(repr)
    }
}

fn enum_to_repr<T: DescribedEnum>(value: &dyn Any) -> Result<i64> {
    Ok(downcast::<T>(value)?.to_repr())
}

fn enum_from_repr<T: DescribedEnum>(repr: i64) -> Option<ErasedValue> {
    T::from_repr(repr).map(|v| Box::new(v) as ErasedValue)
}

/// Single-value encoding of a primitive.
#[derive(Clone, Copy)]
pub struct PrimitiveShape {
    kind: PrimitiveKind,
    write: fn(&dyn Any, &mut dyn DataOutput) -> Result<()>,
    read: fn(&mut dyn DataInput) -> Result<ErasedValue>,
}

impl PrimitiveShape {
    /// Builds the primitive shape of `P`.
    pub fn of<P: Primitive>() -> Self {
        Self {
            kind: P::KIND,
            write: primitive::write_erased::<P>,
            read: primitive::read_erased::<P>,
        }
    }

    /// Returns the primitive kind.
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub(crate) fn write(&self, value: &dyn Any, output: &mut dyn DataOutput) -> Result<()> {
        (self.write)(value, output)
    }

    pub(crate) fn read(&self, input: &mut dyn DataInput) -> Result<ErasedValue> {
        (self.read)(input)
    }
}

/// Access to the payload of an `Option<U>`.
#[derive(Clone, Copy)]
pub struct OptionalShape {
    inner: TypeRef,
    get: for<'a> fn(&'a dyn Any) -> Result<Option<&'a dyn Any>>,
    wrap: fn(Option<ErasedValue>) -> Result<ErasedValue>,
}

impl OptionalShape {
    /// Returns the payload type `U`.
    pub fn inner(&self) -> TypeRef {
        self.inner
    }

    pub(crate) fn get<'a>(&self, value: &'a dyn Any) -> Result<Option<&'a dyn Any>> {
        (self.get)(value)
    }

    pub(crate) fn wrap(&self, payload: Option<ErasedValue>) -> Result<ErasedValue> {
        (self.wrap)(payload)
    }
}

type ElementIter<'a> = Box<dyn Iterator<Item = &'a dyn Any> + 'a>;
type EntryIter<'a> = Box<dyn Iterator<Item = (&'a dyn Any, &'a dyn Any)> + 'a>;

/// Element access for arrays and lists.
#[derive(Clone, Copy)]
pub struct SequenceShape {
    element: TypeRef,
    len: fn(&dyn Any) -> Result<usize>,
    iter: for<'a> fn(&'a dyn Any) -> Result<ElementIter<'a>>,
    collect: fn(Vec<ErasedValue>) -> Result<ErasedValue>,
    packed: Option<PackedSequence>,
    fixed_len: Option<usize>,
}

impl SequenceShape {
    /// Returns the element type.
    pub fn element(&self) -> TypeRef {
        self.element
    }

    /// Returns the bulk path when the element type is primitive.
    pub fn packed(&self) -> Option<PackedSequence> {
        self.packed
    }

    /// Returns the required element count for fixed-size arrays.
    pub fn fixed_len(&self) -> Option<usize> {
        self.fixed_len
    }

    pub(crate) fn len(&self, value: &dyn Any) -> Result<usize> {
        (self.len)(value)
    }

    pub(crate) fn iter<'a>(&self, value: &'a dyn Any) -> Result<ElementIter<'a>> {
        (self.iter)(value)
    }

    pub(crate) fn collect(&self, items: Vec<ErasedValue>) -> Result<ErasedValue> {
        (self.collect)(items)
    }
}

/// Contiguous raw encoding of a sequence of primitives.
#[derive(Clone, Copy)]
pub struct PackedSequence {
    kind: PrimitiveKind,
    write: fn(&dyn Any, &mut dyn DataOutput) -> Result<()>,
    read: fn(&mut dyn DataInput, usize) -> Result<ErasedValue>,
}

impl PackedSequence {
    /// Returns the element kind.
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub(crate) fn write(&self, value: &dyn Any, output: &mut dyn DataOutput) -> Result<()> {
        (self.write)(value, output)
    }

    pub(crate) fn read(&self, input: &mut dyn DataInput, count: usize) -> Result<ErasedValue> {
        (self.read)(input, count)
    }
}

/// Entry access for maps.
#[derive(Clone, Copy)]
pub struct DictionaryShape {
    key: TypeRef,
    value: TypeRef,
    len: fn(&dyn Any) -> Result<usize>,
    iter: for<'a> fn(&'a dyn Any) -> Result<EntryIter<'a>>,
    collect: fn(Vec<(ErasedValue, ErasedValue)>) -> Result<ErasedValue>,
}

impl DictionaryShape {
    /// Returns the key type.
    pub fn key(&self) -> TypeRef {
        self.key
    }

    /// Returns the value type.
    pub fn value(&self) -> TypeRef {
        self.value
    }

    pub(crate) fn len(&self, value: &dyn Any) -> Result<usize> {
        (self.len)(value)
    }

    pub(crate) fn iter<'a>(&self, value: &'a dyn Any) -> Result<EntryIter<'a>> {
        (self.iter)(value)
    }

    pub(crate) fn collect(&self, entries: Vec<(ErasedValue, ErasedValue)>) -> Result<ErasedValue> {
        (self.collect)(entries)
    }
}

/// The candidate members of a composite type, in declaration order.
#[derive(Clone, Default)]
pub struct CompositeShape {
    members: Vec<MemberDescriptor>,
}

impl CompositeShape {
    /// Returns every candidate member, including ones an extractor may reject.
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }
}
