//! Codecs for arrays, lists, untyped arrays and dictionaries.
//!
//! Sequences of primitives take the packed path: one element tag, a count and
//! the raw element bytes, with no per-element codec call. Every other
//! sequence is framed by its payload byte length so that readers can skip it.

use std::any::{Any, TypeId};
use std::sync::Arc;

use super::{read_count, read_header, Codec};
use crate::buffer::{DataInput, DataOutput};
use crate::descriptor::{
    downcast, unbox, AnyValue, DictionaryShape, DynArray, ErasedValue, PackedSequence,
    SequenceShape, TypeDescriptor, TypeRef,
};
use crate::error::{DecodeError, Result, TagbufError};
use crate::registry::RegistryShared;
use crate::wire::{WireTag, LEN_PREFIX};

const GENERAL_TAGS: [WireTag; 2] = [WireTag::Array, WireTag::List];
const PACKED_TAGS: [WireTag; 2] = [WireTag::PrimitiveArray, WireTag::PrimitiveList];

fn check_fixed_len(fixed_len: Option<usize>, count: usize, type_name: &str) -> Result<()> {
    match fixed_len {
        Some(expected) if expected != count => Err(DecodeError::new(format!(
            "{} expects {} elements, found {}",
            type_name, expected, count
        ))
        .into()),
        _ => Ok(()),
    }
}

/// Builds the codec of an array (`is_list == false`) or list.
pub(crate) fn sequence(
    registry: &Arc<RegistryShared>,
    descriptor: &TypeDescriptor,
    shape: SequenceShape,
    is_list: bool,
) -> Result<Codec> {
    let max_len = registry.config().max_collection_len();
    if let Some(packed) = shape.packed() {
        return Ok(packed_sequence(descriptor, shape, packed, is_list, max_len));
    }

    let element = registry.resolve(shape.element())?;
    let tag = if is_list { WireTag::List } else { WireTag::Array };
    let type_name = descriptor.name();
    let default = descriptor.default_fn();
    let write_element = Arc::clone(&element);
    let read_element = Arc::clone(&element);
    let size_element = element;

    let payload_size = move |value: &dyn Any| -> Result<usize> {
        let mut size = LEN_PREFIX;
        for item in shape.iter(value)? {
            size += size_element.size(item)?;
        }
        Ok(size)
    };

    Ok(Codec::new(
        descriptor,
        tag,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            let frame = output.begin_frame(tag)?;
            output.write_len(shape.len(value)?)?;
            for item in shape.iter(value)? {
                write_element.write(item, output)?;
            }
            output.end_frame(frame)?;
            Ok(())
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            if read_header(input, type_name, &GENERAL_TAGS)?.is_none() {
                return Ok(default());
            }
            let frame = input.open_frame()?;
            let count = read_count(input, max_len)?;
            check_fixed_len(shape.fixed_len(), count, type_name)?;
            let mut items = Vec::with_capacity(count.min(frame.len()));
            for _ in 0..count {
                items.push(read_element.read(input)?);
            }
            input.close_frame(frame, type_name)?;
            shape.collect(items)
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            Ok(1 + LEN_PREFIX + payload_size(value)?)
        }),
    ))
}

fn packed_sequence(
    descriptor: &TypeDescriptor,
    shape: SequenceShape,
    packed: PackedSequence,
    is_list: bool,
    max_len: usize,
) -> Codec {
    let tag = if is_list {
        WireTag::PrimitiveList
    } else {
        WireTag::PrimitiveArray
    };
    let element_tag = packed.kind().wire_tag();
    let width = packed.kind().width();
    let type_name = descriptor.name();
    let default = descriptor.default_fn();

    Codec::new(
        descriptor,
        tag,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            let count = shape.len(value)?;
            output.write_tag(tag)?;
            output.write_tag(element_tag)?;
            output.write_len(count)?;
            packed.write(value, output)
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            if read_header(input, type_name, &PACKED_TAGS)?.is_none() {
                return Ok(default());
            }
            let found = input.read_tag()?;
            if found != element_tag {
                return Err(DecodeError::new(format!(
                    "{} holds {:?} elements, found {:?}",
                    type_name, element_tag, found
                ))
                .into());
            }
            let count = read_count(input, max_len)?;
            check_fixed_len(shape.fixed_len(), count, type_name)?;
            packed.read(input, count)
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            Ok(2 + LEN_PREFIX + shape.len(value)? * width)
        }),
    )
}

/// Builds the codec of a map.
pub(crate) fn dictionary(
    registry: &Arc<RegistryShared>,
    descriptor: &TypeDescriptor,
    shape: DictionaryShape,
) -> Result<Codec> {
    let key = registry.resolve(shape.key())?;
    let value = registry.resolve(shape.value())?;
    let max_len = registry.config().max_collection_len();
    let type_name = descriptor.name();
    let default = descriptor.default_fn();
    let (write_key, write_value) = (Arc::clone(&key), Arc::clone(&value));
    let (read_key, read_value) = (Arc::clone(&key), Arc::clone(&value));
    let (size_key, size_value) = (key, value);

    let payload_size = move |map: &dyn Any| -> Result<usize> {
        let mut size = LEN_PREFIX;
        for (k, v) in shape.iter(map)? {
            size += size_key.size(k)? + size_value.size(v)?;
        }
        Ok(size)
    };

    Ok(Codec::new(
        descriptor,
        WireTag::Dictionary,
        Box::new(move |map: &dyn Any, output: &mut dyn DataOutput| {
            let frame = output.begin_frame(WireTag::Dictionary)?;
            output.write_len(shape.len(map)?)?;
            for (k, v) in shape.iter(map)? {
                write_key.write(k, output)?;
                write_value.write(v, output)?;
            }
            output.end_frame(frame)?;
            Ok(())
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            if read_header(input, type_name, &[WireTag::Dictionary])?.is_none() {
                return Ok(default());
            }
            let frame = input.open_frame()?;
            let count = read_count(input, max_len)?;
            let mut entries = Vec::with_capacity(count.min(frame.len() / 2));
            for _ in 0..count {
                let k = read_key.read(input)?;
                let v = read_value.read(input)?;
                entries.push((k, v));
            }
            input.close_frame(frame, type_name)?;
            shape.collect(entries)
        }),
        Box::new(move |map: &dyn Any| -> Result<usize> {
            Ok(1 + LEN_PREFIX + payload_size(map)?)
        }),
    ))
}

/// Builds the codec of [`DynArray`], whose elements are written as dynamic values.
pub(crate) fn untyped_array(
    registry: &Arc<RegistryShared>,
    descriptor: &TypeDescriptor,
) -> Result<Codec> {
    if descriptor.id() != TypeId::of::<DynArray>() {
        return Err(TagbufError::UnsupportedType(format!(
            "{} is described as an untyped array but is not a DynArray",
            descriptor.name()
        )));
    }
    let element = registry.resolve(TypeRef::of::<AnyValue>())?;
    let max_len = registry.config().max_collection_len();
    let type_name = descriptor.name();
    let write_element = Arc::clone(&element);
    let read_element = Arc::clone(&element);
    let size_element = element;

    let payload_size = move |array: &DynArray| -> Result<usize> {
        let mut size = LEN_PREFIX;
        for item in &array.0 {
            size += size_element.size(item)?;
        }
        Ok(size)
    };

    Ok(Codec::new(
        descriptor,
        WireTag::UntypedArray,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            let array = downcast::<DynArray>(value)?;
            let frame = output.begin_frame(WireTag::UntypedArray)?;
            output.write_len(array.len())?;
            for item in &array.0 {
                write_element.write(item, output)?;
            }
            output.end_frame(frame)?;
            Ok(())
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            if read_header(input, type_name, &[WireTag::UntypedArray])?.is_none() {
                return Ok(Box::new(DynArray::new()));
            }
            let frame = input.open_frame()?;
            let count = read_count(input, max_len)?;
            let mut items = Vec::with_capacity(count.min(frame.len()));
            for _ in 0..count {
                items.push(unbox::<AnyValue>(read_element.read(input)?)?);
            }
            input.close_frame(frame, type_name)?;
            Ok(Box::new(DynArray(items)))
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            Ok(1 + LEN_PREFIX + payload_size(downcast::<DynArray>(value)?)?)
        }),
    ))
}
