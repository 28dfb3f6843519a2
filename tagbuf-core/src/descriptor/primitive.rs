//! Primitive numeric types and their packed bulk encoding.

use std::any::Any;

use bytes::{Buf, BufMut, BytesMut};

use super::{downcast, Described, ErasedValue, PrimitiveShape, Shape, TypeDescriptor};
use crate::buffer::{DataInput, DataOutput};
use crate::error::{DecodeError, Result};
use crate::wire::PrimitiveKind;

/// A fixed-width value that can be packed contiguously.
pub trait Primitive: Described + Copy {
    /// The wire kind of this type.
    const KIND: PrimitiveKind;

    /// Writes one value through a data output.
    fn write_to(self, output: &mut dyn DataOutput) -> Result<()>;

    /// Reads one value from a data input.
    fn read_from(input: &mut dyn DataInput) -> Result<Self>;

    /// Appends the big-endian bytes of this value.
    fn put(self, buf: &mut BytesMut);

    /// Takes one value from the front of `buf`; `buf` holds at least the width.
    fn take(buf: &mut &[u8]) -> Self;
}

/// Bulk encoders for slices of a primitive type.
pub struct PackedOps<T> {
    /// The element kind.
    pub kind: PrimitiveKind,
    /// Writes the raw bytes of every element, without header.
    pub write: fn(&[T], &mut dyn DataOutput) -> Result<()>,
    /// Reads `count` raw elements.
    pub read: fn(&mut dyn DataInput, usize) -> Result<Vec<T>>,
}

impl<T> Clone for PackedOps<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PackedOps<T> {}

impl<P: Primitive> PackedOps<P> {
    /// Returns the bulk encoders of `P`.
    pub fn of() -> Self {
        Self {
            kind: P::KIND,
            write: write_packed::<P>,
            read: read_packed::<P>,
        }
    }
}

fn write_packed<P: Primitive>(items: &[P], output: &mut dyn DataOutput) -> Result<()> {
    let mut buf = BytesMut::with_capacity(items.len() * P::KIND.width());
    for &item in items {
        item.put(&mut buf);
    }
    output.write_bytes(&buf)
}

fn read_packed<P: Primitive>(input: &mut dyn DataInput, count: usize) -> Result<Vec<P>> {
    let total = count
        .checked_mul(P::KIND.width())
        .ok_or_else(|| DecodeError::new("packed length overflow"))?;
    if total > input.remaining() {
        return Err(DecodeError::new(format!(
            "packed payload of {} bytes exceeds the {} remaining",
            total,
            input.remaining()
        ))
        .into());
    }
    let bytes = input.read_bytes(total)?;
    let mut cursor = bytes.as_slice();
    Ok((0..count).map(|_| P::take(&mut cursor)).collect())
}

pub(super) fn write_erased<P: Primitive>(value: &dyn Any, output: &mut dyn DataOutput) -> Result<()> {
    downcast::<P>(value)?.write_to(output)
}

pub(super) fn read_erased<P: Primitive>(input: &mut dyn DataInput) -> Result<ErasedValue> {
    Ok(Box::new(P::read_from(input)?))
}

macro_rules! impl_primitive {
    ($ty:ty, $name:literal, $kind:ident, $put:ident, $get:ident, |$w:ident, $v:ident| $write:expr, |$r:ident| $read:expr) => {
        impl Described for $ty {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::of::<Self>($name, Shape::Primitive(PrimitiveShape::of::<Self>()))
            }

            fn packed() -> Option<PackedOps<Self>> {
                Some(PackedOps::of())
            }
        }

        impl Primitive for $ty {
            const KIND: PrimitiveKind = PrimitiveKind::$kind;

            fn write_to(self, $w: &mut dyn DataOutput) -> Result<()> {
                let $v = self;
                $write
            }

            fn read_from($r: &mut dyn DataInput) -> Result<Self> {
                $read
            }

            fn put(self, buf: &mut BytesMut) {
                buf.$put(self);
            }

            fn take(buf: &mut &[u8]) -> Self {
                buf.$get()
            }
        }
    };
}

impl_primitive!(i8, "i8", Int8, put_i8, get_i8, |w, v| w.write_byte(v), |r| r.read_byte());
impl_primitive!(u8, "u8", UInt8, put_u8, get_u8, |w, v| w.write_byte(v as i8), |r| {
    r.read_byte().map(|b| b as u8)
});
impl_primitive!(i16, "i16", Int16, put_i16, get_i16, |w, v| w.write_short(v), |r| r.read_short());
impl_primitive!(u16, "u16", UInt16, put_u16, get_u16, |w, v| w.write_short(v as i16), |r| {
    r.read_short().map(|s| s as u16)
});
impl_primitive!(i32, "i32", Int32, put_i32, get_i32, |w, v| w.write_int(v), |r| r.read_int());
impl_primitive!(u32, "u32", UInt32, put_u32, get_u32, |w, v| w.write_int(v as i32), |r| {
    r.read_int().map(|i| i as u32)
});
impl_primitive!(i64, "i64", Int64, put_i64, get_i64, |w, v| w.write_long(v), |r| r.read_long());
impl_primitive!(u64, "u64", UInt64, put_u64, get_u64, |w, v| w.write_long(v as i64), |r| {
    r.read_long().map(|l| l as u64)
});
impl_primitive!(f32, "f32", Float32, put_f32, get_f32, |w, v| w.write_float(v), |r| r.read_float());
impl_primitive!(f64, "f64", Float64, put_f64, get_f64, |w, v| w.write_double(v), |r| r.read_double());

impl Described for bool {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Self>("bool", Shape::Primitive(PrimitiveShape::of::<Self>()))
    }

    fn packed() -> Option<PackedOps<Self>> {
        Some(PackedOps::of())
    }
}

impl Primitive for bool {
    const KIND: PrimitiveKind = PrimitiveKind::Bool;

    fn write_to(self, output: &mut dyn DataOutput) -> Result<()> {
        output.write_bool(self)
    }

    fn read_from(input: &mut dyn DataInput) -> Result<Self> {
        input.read_bool()
    }

    fn put(self, buf: &mut BytesMut) {
        buf.put_u8(u8::from(self));
    }

    fn take(buf: &mut &[u8]) -> Self {
        buf.get_u8() != 0
    }
}
