//! Descriptors of the standard value types and containers.

use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    downcast, unbox, Described, DictionaryShape, ElementIter, EntryIter, ErasedValue,
    OptionalShape, PackedSequence, SequenceShape, Shape, TypeDescriptor, TypeRef,
};
use crate::buffer::{DataInput, DataOutput};
use crate::error::{Result, TagbufError};

impl Described for String {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>("string", Shape::String)
    }
}

impl Described for DateTime<Utc> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>("datetime", Shape::DateTime)
    }
}

impl Described for Uuid {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>("uuid", Shape::Uuid)
    }
}

impl Described for Decimal {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>("decimal", Shape::Decimal)
    }
}

impl<T: Described> Described for Option<T> {
    fn describe() -> TypeDescriptor {
        let shape = OptionalShape {
            inner: TypeRef::of::<T>(),
            get: option_get::<T>,
            wrap: option_wrap::<T>,
        };
        TypeDescriptor::of::<Self>(type_name::<Self>(), Shape::Optional(shape))
    }
}

fn option_get<T: Described>(value: &dyn Any) -> Result<Option<&dyn Any>> {
    Ok(downcast::<Option<T>>(value)?
        .as_ref()
        .map(|inner| inner as &dyn Any))
}

fn option_wrap<T: Described>(payload: Option<ErasedValue>) -> Result<ErasedValue> {
    let value: Option<T> = payload.map(unbox::<T>).transpose()?;
    Ok(Box::new(value))
}

/// Contiguous containers of `Element`.
trait Sequence: Described {
    type Element: Described;

    fn elements(&self) -> &[Self::Element];

    fn from_elements(items: Vec<Self::Element>) -> Result<Self>;
}

impl<T: Described> Sequence for Vec<T> {
    type Element = T;

    fn elements(&self) -> &[T] {
        self
    }

    fn from_elements(items: Vec<T>) -> Result<Self> {
        Ok(items)
    }
}

impl<T: Described> Sequence for Box<[T]> {
    type Element = T;

    fn elements(&self) -> &[T] {
        self
    }

    fn from_elements(items: Vec<T>) -> Result<Self> {
        Ok(items.into_boxed_slice())
    }
}

impl<T: Described, const N: usize> Sequence for [T; N]
where
    [T; N]: Default,
{
    type Element = T;

    fn elements(&self) -> &[T] {
        self
    }

    fn from_elements(items: Vec<T>) -> Result<Self> {
        let found = items.len();
        <[T; N]>::try_from(items).map_err(|_| {
            TagbufError::decode(format!(
                "fixed-size array expects {} elements, found {}",
                N, found
            ))
        })
    }
}

fn sequence_shape<S: Sequence>(fixed_len: Option<usize>) -> SequenceShape {
    let packed = S::Element::packed().map(|ops| PackedSequence {
        kind: ops.kind,
        write: sequence_write_packed::<S>,
        read: sequence_read_packed::<S>,
    });
    SequenceShape {
        element: TypeRef::of::<S::Element>(),
        len: sequence_len::<S>,
        iter: sequence_iter::<S>,
        collect: sequence_collect::<S>,
        packed,
        fixed_len,
    }
}

fn sequence_len<S: Sequence>(value: &dyn Any) -> Result<usize> {
    Ok(downcast::<S>(value)?.elements().len())
}

fn sequence_iter<S: Sequence>(value: &dyn Any) -> Result<ElementIter<'_>> {
    let items = downcast::<S>(value)?.elements();
    Ok(Box::new(items.iter().map(|item| item as &dyn Any)))
}

fn sequence_collect<S: Sequence>(items: Vec<ErasedValue>) -> Result<ErasedValue> {
    let items = items
        .into_iter()
        .map(unbox::<S::Element>)
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(S::from_elements(items)?))
}

fn packed_ops_missing<S: Sequence>() -> TagbufError {
    TagbufError::UnsupportedType(format!(
        "{} has no packed encoding",
        type_name::<S::Element>()
    ))
}

fn sequence_write_packed<S: Sequence>(value: &dyn Any, output: &mut dyn DataOutput) -> Result<()> {
    let ops = S::Element::packed().ok_or_else(packed_ops_missing::<S>)?;
    (ops.write)(downcast::<S>(value)?.elements(), output)
}

fn sequence_read_packed<S: Sequence>(input: &mut dyn DataInput, count: usize) -> Result<ErasedValue> {
    let ops = S::Element::packed().ok_or_else(packed_ops_missing::<S>)?;
    let items = (ops.read)(input, count)?;
    Ok(Box::new(S::from_elements(items)?))
}

impl<T: Described> Described for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>(type_name::<Self>(), Shape::List(sequence_shape::<Self>(None)))
    }
}

impl<T: Described> Described for Box<[T]> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>(type_name::<Self>(), Shape::Array(sequence_shape::<Self>(None)))
    }
}

impl<T: Described, const N: usize> Described for [T; N]
where
    [T; N]: Default,
{
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>(
            type_name::<Self>(),
            Shape::Array(sequence_shape::<Self>(Some(N))),
        )
    }
}

/// Key/value containers.
trait Dictionary: Described {
    type Key: Described;
    type Value: Described;

    fn entry_count(&self) -> usize;

    fn entries(&self) -> EntryIter<'_>;

    fn from_entries(entries: Vec<(Self::Key, Self::Value)>) -> Self;
}

impl<K, V> Dictionary for HashMap<K, V>
where
    K: Described + Eq + Hash,
    V: Described,
{
    type Key = K;
    type Value = V;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> EntryIter<'_> {
        Box::new(self.iter().map(|(k, v)| (k as &dyn Any, v as &dyn Any)))
    }

    fn from_entries(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V> Dictionary for BTreeMap<K, V>
where
    K: Described + Ord,
    V: Described,
{
    type Key = K;
    type Value = V;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> EntryIter<'_> {
        Box::new(self.iter().map(|(k, v)| (k as &dyn Any, v as &dyn Any)))
    }

    fn from_entries(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

fn dictionary_shape<D: Dictionary>() -> DictionaryShape {
    DictionaryShape {
        key: TypeRef::of::<D::Key>(),
        value: TypeRef::of::<D::Value>(),
        len: dictionary_len::<D>,
        iter: dictionary_iter::<D>,
        collect: dictionary_collect::<D>,
    }
}

fn dictionary_len<D: Dictionary>(value: &dyn Any) -> Result<usize> {
    Ok(downcast::<D>(value)?.entry_count())
}

fn dictionary_iter<D: Dictionary>(value: &dyn Any) -> Result<EntryIter<'_>> {
    Ok(downcast::<D>(value)?.entries())
}

fn dictionary_collect<D: Dictionary>(entries: Vec<(ErasedValue, ErasedValue)>) -> Result<ErasedValue> {
    let entries = entries
        .into_iter()
        .map(|(k, v)| Ok((unbox::<D::Key>(k)?, unbox::<D::Value>(v)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(D::from_entries(entries)))
}

impl<K, V> Described for HashMap<K, V>
where
    K: Described + Eq + Hash,
    V: Described,
{
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>(type_name::<Self>(), Shape::Dictionary(dictionary_shape::<Self>()))
    }
}

impl<K, V> Described for BTreeMap<K, V>
where
    K: Described + Ord,
    V: Described,
{
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>(type_name::<Self>(), Shape::Dictionary(dictionary_shape::<Self>()))
    }
}
