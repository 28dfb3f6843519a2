//! Codecs: the writer, reader and sizer routines built for one type.
//!
//! A [`Codec`] is immutable once built and is shared as `Arc<Codec>` by every
//! codec that nests it. Values cross the codec boundary type-erased; the
//! typed helpers [`Codec::write_typed`] and [`Codec::read_typed`] check the
//! concrete type on the way in and out.

pub(crate) mod builtin;
pub(crate) mod dynamic;
pub(crate) mod sequence;

pub use dynamic::MAX_DYNAMIC_DEPTH;

use std::any::{Any, TypeId};
use std::fmt;

use crate::buffer::{DataInput, DataOutput};
use crate::descriptor::{downcast, unbox, ErasedValue, TypeDescriptor};
use crate::error::{DecodeError, Result, TagbufError};
use crate::wire::WireTag;

pub(crate) type WriteFn = Box<dyn Fn(&dyn Any, &mut dyn DataOutput) -> Result<()> + Send + Sync>;
pub(crate) type ReadFn = Box<dyn Fn(&mut dyn DataInput) -> Result<ErasedValue> + Send + Sync>;
pub(crate) type SizeFn = Box<dyn Fn(&dyn Any) -> Result<usize> + Send + Sync>;
pub(crate) type AbsentFn = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// The serialization routines of one type.
pub struct Codec {
    type_name: &'static str,
    type_id: TypeId,
    category: WireTag,
    writer: WriteFn,
    reader: ReadFn,
    sizer: SizeFn,
    absent: Option<AbsentFn>,
}

impl Codec {
    pub(crate) fn new(
        descriptor: &TypeDescriptor,
        category: WireTag,
        writer: WriteFn,
        reader: ReadFn,
        sizer: SizeFn,
    ) -> Self {
        Self {
            type_name: descriptor.name(),
            type_id: descriptor.id(),
            category,
            writer,
            reader,
            sizer,
            absent: None,
        }
    }

    /// Marks values for which `absent` holds as omittable composite members.
    pub(crate) fn with_absent(mut self, absent: AbsentFn) -> Self {
        self.absent = Some(absent);
        self
    }

    /// Returns the registered name of the type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the identity of the type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the wire category this codec writes.
    pub fn category(&self) -> WireTag {
        self.category
    }

    /// Writes one value, tag included.
    pub fn write(&self, value: &dyn Any, output: &mut dyn DataOutput) -> Result<()> {
        (self.writer)(value, output)
    }

    /// Reads one value, tag included.
    pub fn read(&self, input: &mut dyn DataInput) -> Result<ErasedValue> {
        (self.reader)(input)
    }

    /// Returns the exact number of bytes [`Codec::write`] appends for `value`.
    pub fn size(&self, value: &dyn Any) -> Result<usize> {
        (self.sizer)(value)
    }

    /// Returns true if `value` is an absent optional or a null dynamic value.
    pub fn is_absent(&self, value: &dyn Any) -> bool {
        self.absent.as_ref().map_or(false, |absent| absent(value))
    }

    /// Writes a value of the codec's concrete type.
    pub fn write_typed<T: Any>(&self, value: &T, output: &mut dyn DataOutput) -> Result<()> {
        self.write(value, output)
    }

    /// Reads a value of the codec's concrete type.
    pub fn read_typed<T: Any>(&self, input: &mut dyn DataInput) -> Result<T> {
        unbox::<T>(self.read(input)?)
    }

    /// Returns the size of a value of the codec's concrete type.
    pub fn size_typed<T: Any>(&self, value: &T) -> Result<usize> {
        self.size(downcast::<T>(value)?)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("type_name", &self.type_name)
            .field("category", &self.category)
            .finish()
    }
}

/// Reads a value header.
///
/// Returns `None` for the empty tag, which stands for the type's default
/// value, and the tag itself when it is one of `accepted`.
pub(crate) fn read_header(
    input: &mut dyn DataInput,
    type_name: &str,
    accepted: &[WireTag],
) -> Result<Option<WireTag>> {
    let tag = input.read_tag()?;
    if tag == WireTag::Empty {
        return Ok(None);
    }
    if accepted.contains(&tag) {
        return Ok(Some(tag));
    }
    Err(DecodeError::new(format!(
        "unexpected {:?} tag for {}, expected {:?}",
        tag, type_name, accepted
    ))
    .into())
}

/// Reads a `u32` element or entry count and checks it against `max`.
pub(crate) fn read_count(input: &mut dyn DataInput, max: usize) -> Result<usize> {
    let count = input.read_len()?;
    if count > max {
        return Err(DecodeError::new(format!(
            "collection of {} entries exceeds the limit of {}",
            count, max
        ))
        .into());
    }
    Ok(count)
}

/// Fails unless `value` is of the type `id`.
pub(crate) fn check_type(value: &dyn Any, id: TypeId, type_name: &str) -> Result<()> {
    if (*value).type_id() != id {
        return Err(TagbufError::Encode(format!("value is not a {}", type_name)));
    }
    Ok(())
}
