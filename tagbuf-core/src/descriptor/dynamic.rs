//! Dynamically typed values.

use std::any::Any;
use std::fmt;

use super::{Described, ErasedValue, Shape, TypeDescriptor, TypeRef};

/// A value that knows its own descriptor.
///
/// Implemented for every [`Described`] type.
pub trait DynValue: Any + Send + Sync {
    /// Returns the value as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Returns a reference to the value's concrete type.
    fn type_ref(&self) -> TypeRef;

    /// Converts the boxed value into an erased value.
    fn into_any(self: Box<Self>) -> ErasedValue;
}

impl<T: Described> DynValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_ref(&self) -> TypeRef {
        TypeRef::of::<T>()
    }

    fn into_any(self: Box<Self>) -> ErasedValue {
        self
    }
}

/// A member whose concrete type is only known at runtime.
///
/// Written with a discriminator derived from the concrete type's registered
/// name. On read the discriminator is resolved through the serializer's
/// dynamic-type table, so the concrete type must have been registered or
/// serialized before.
#[derive(Default)]
pub struct AnyValue(Option<Box<dyn DynValue>>);

impl AnyValue {
    /// Wraps a value.
    pub fn new<T: Described>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    /// Returns the null value.
    pub fn null() -> Self {
        Self(None)
    }

    /// Wraps an already boxed value.
    pub fn from_box<T: Described>(value: Box<T>) -> Self {
        Self(Some(value))
    }

    /// Returns true if no value is held.
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Returns a reference to the concrete type of the held value.
    pub fn type_ref(&self) -> Option<TypeRef> {
        self.0.as_ref().map(|value| value.type_ref())
    }

    /// Returns the held value as `&dyn Any`.
    pub fn as_any(&self) -> Option<&dyn Any> {
        self.0.as_ref().map(|value| value.as_any())
    }

    /// Returns true if the held value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().map_or(false, |value| value.is::<T>())
    }

    /// Returns the held value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().and_then(|value| value.downcast_ref::<T>())
    }

    /// Takes the held value if it is a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        match self.0.map(|value| value.into_any().downcast::<T>()) {
            Some(Ok(value)) => Ok(*value),
            _ => Err(Self::null()),
        }
    }

    /// Returns the held value, erased.
    pub fn into_inner(self) -> Option<ErasedValue> {
        self.0.map(|value| value.into_any())
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_ref() {
            Some(ty) => write!(f, "AnyValue({})", ty.describe().name()),
            None => f.write_str("AnyValue(null)"),
        }
    }
}

impl Described for AnyValue {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>("any", Shape::Dynamic)
    }
}

/// A heterogeneous array of dynamically typed values.
#[derive(Debug, Default)]
pub struct DynArray(pub Vec<AnyValue>);

impl DynArray {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    pub fn push<T: Described>(&mut self, value: T) {
        self.0.push(AnyValue::new(value));
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the element at `index`.
    pub fn get(&self, index: usize) -> Option<&AnyValue> {
        self.0.get(index)
    }
}

impl From<Vec<AnyValue>> for DynArray {
    fn from(values: Vec<AnyValue>) -> Self {
        Self(values)
    }
}

impl Described for DynArray {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>("any[]", Shape::UntypedArray)
    }
}
