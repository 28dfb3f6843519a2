//! Codecs for strings, scalar value types, enums, primitives and optionals.

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::trace;
use uuid::Uuid;

use super::{check_type, read_header, Codec};
use crate::buffer::{DataInput, DataOutput};
use crate::descriptor::{
    downcast, Described, EnumShape, ErasedValue, OptionalShape, PrimitiveShape, TypeDescriptor,
};
use crate::error::{DecodeError, Result};
use crate::registry::RegistryShared;
use crate::wire::{WireTag, LEN_PREFIX};

/// Builds a codec for a type with a single tag and a self-delimiting payload.
fn scalar<T: Described>(
    descriptor: &TypeDescriptor,
    tag: WireTag,
    write: fn(&T, &mut dyn DataOutput) -> Result<()>,
    read: fn(&mut dyn DataInput) -> Result<T>,
    payload_size: fn(&T) -> usize,
) -> Codec {
    let type_name = descriptor.name();
    Codec::new(
        descriptor,
        tag,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            let value = downcast::<T>(value)?;
            output.write_tag(tag)?;
            write(value, output)
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            match read_header(input, type_name, &[tag])? {
                None => Ok(Box::new(T::default())),
                Some(_) => Ok(Box::new(read(input)?)),
            }
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            Ok(1 + payload_size(downcast::<T>(value)?))
        }),
    )
}

pub(crate) fn string(descriptor: &TypeDescriptor) -> Codec {
    scalar::<String>(
        descriptor,
        WireTag::String,
        |value, output| output.write_string(value),
        |input| input.read_string(),
        |value| LEN_PREFIX + value.len(),
    )
}

pub(crate) fn date_time(descriptor: &TypeDescriptor) -> Codec {
    scalar::<DateTime<Utc>>(
        descriptor,
        WireTag::DateTime,
        write_date_time,
        read_date_time,
        |_| 12,
    )
}

fn write_date_time(value: &DateTime<Utc>, output: &mut dyn DataOutput) -> Result<()> {
    output.write_long(value.timestamp())?;
    output.write_int(value.timestamp_subsec_nanos() as i32)
}

fn read_date_time(input: &mut dyn DataInput) -> Result<DateTime<Utc>> {
    let secs = input.read_long()?;
    let nanos = input.read_int()? as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos).ok_or_else(|| {
        DecodeError::new(format!("timestamp {}s {}ns is out of range", secs, nanos)).into()
    })
}

pub(crate) fn uuid(descriptor: &TypeDescriptor) -> Codec {
    scalar::<Uuid>(
        descriptor,
        WireTag::Uuid,
        |value, output| output.write_bytes(value.as_bytes()),
        |input| {
            let mut bytes = [0u8; 16];
            input.read_into(&mut bytes)?;
            Ok(Uuid::from_bytes(bytes))
        },
        |_| 16,
    )
}

pub(crate) fn decimal(descriptor: &TypeDescriptor) -> Codec {
    scalar::<Decimal>(
        descriptor,
        WireTag::Decimal,
        |value, output| output.write_bytes(&value.serialize()),
        |input| {
            let mut bytes = [0u8; 16];
            input.read_into(&mut bytes)?;
            Ok(Decimal::deserialize(bytes))
        },
        |_| 16,
    )
}

pub(crate) fn primitive(descriptor: &TypeDescriptor, shape: PrimitiveShape) -> Codec {
    let tag = shape.kind().wire_tag();
    let width = shape.kind().width();
    let type_name = descriptor.name();
    let type_id = descriptor.id();
    let default = descriptor.default_fn();
    Codec::new(
        descriptor,
        tag,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            check_type(value, type_id, type_name)?;
            output.write_tag(tag)?;
            shape.write(value, output)
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            match read_header(input, type_name, &[tag])? {
                None => Ok(default()),
                Some(_) => shape.read(input),
            }
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            check_type(value, type_id, type_name)?;
            Ok(1 + width)
        }),
    )
}

pub(crate) fn enumeration(descriptor: &TypeDescriptor, shape: EnumShape) -> Codec {
    let type_name = descriptor.name();
    let default = descriptor.default_fn();
    Codec::new(
        descriptor,
        WireTag::Enum,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            let repr = shape.to_repr(value)?;
            output.write_tag(WireTag::Enum)?;
            output.write_long(repr)
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            if read_header(input, type_name, &[WireTag::Enum])?.is_none() {
                return Ok(default());
            }
            let repr = input.read_long()?;
            Ok(shape.from_repr(repr).unwrap_or_else(|| {
                trace!(type_name, repr, "unknown enum value, using default variant");
                default()
            }))
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            shape.to_repr(value)?;
            Ok(9)
        }),
    )
}

pub(crate) fn optional(
    registry: &Arc<RegistryShared>,
    descriptor: &TypeDescriptor,
    shape: OptionalShape,
) -> Result<Codec> {
    let inner = registry.resolve(shape.inner())?;
    let type_name = descriptor.name();
    let write_inner = Arc::clone(&inner);
    let read_inner = Arc::clone(&inner);
    let size_inner = inner;

    let codec = Codec::new(
        descriptor,
        WireTag::Optional,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            let payload = shape.get(value)?;
            output.write_tag(WireTag::Optional)?;
            output.write_bool(payload.is_some())?;
            match payload {
                Some(payload) => write_inner.write(payload, output),
                None => Ok(()),
            }
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            if read_header(input, type_name, &[WireTag::Optional])?.is_none() {
                return shape.wrap(None);
            }
            if input.read_bool()? {
                shape.wrap(Some(read_inner.read(input)?))
            } else {
                shape.wrap(None)
            }
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            match shape.get(value)? {
                Some(payload) => Ok(2 + size_inner.size(payload)?),
                None => Ok(2),
            }
        }),
    );
    Ok(codec.with_absent(Box::new(move |value: &dyn Any| {
        matches!(shape.get(value), Ok(None))
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{ObjectDataInput, ObjectDataOutput};
    use crate::descriptor::{unbox, DescribedEnum, Shape};

    fn encode(codec: &Codec, value: &dyn Any) -> Vec<u8> {
        let mut output = ObjectDataOutput::new();
        codec.write(value, &mut output).unwrap();
        let bytes = output.into_bytes();
        assert_eq!(bytes.len(), codec.size(value).unwrap());
        bytes
    }

    #[test]
    fn test_string_layout() {
        let codec = string(&String::describe());
        let bytes = encode(&codec, &"hé".to_string());
        assert_eq!(bytes, [0x10, 0, 0, 0, 3, b'h', 0xC3, 0xA9]);
        let decoded: String = codec.read_typed(&mut ObjectDataInput::new(&bytes)).unwrap();
        assert_eq!(decoded, "hé");
    }

    #[test]
    fn test_empty_tag_reads_default() {
        let codec = uuid(&Uuid::describe());
        let decoded: Uuid = codec
            .read_typed(&mut ObjectDataInput::new(&[WireTag::Empty.byte()]))
            .unwrap();
        assert!(decoded.is_nil());
    }

    #[test]
    fn test_wrong_tag_is_decode_error() {
        let codec = decimal(&Decimal::describe());
        let err = codec
            .read(&mut ObjectDataInput::new(&[WireTag::String.byte(), 0, 0, 0, 0]))
            .unwrap_err();
        assert!(err.to_string().contains("unexpected String tag"));
    }

    #[test]
    fn test_date_time_and_decimal_values() {
        let codec = date_time(&DateTime::<Utc>::describe());
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let bytes = encode(&codec, &now);
        assert_eq!(bytes.len(), 13);
        let decoded: DateTime<Utc> = codec.read_typed(&mut ObjectDataInput::new(&bytes)).unwrap();
        assert_eq!(decoded, now);

        let codec = decimal(&Decimal::describe());
        let price = Decimal::new(-12345, 3);
        let bytes = encode(&codec, &price);
        let decoded: Decimal = codec.read_typed(&mut ObjectDataInput::new(&bytes)).unwrap();
        assert_eq!(decoded, price);
    }

    #[test]
    fn test_primitive_rejects_other_width() {
        let Shape::Primitive(shape) = i32::describe().shape().clone() else {
            panic!("expected primitive shape");
        };
        let codec = primitive(&i32::describe(), shape);
        let bytes = encode(&codec, &-5i32);
        assert_eq!(bytes, [0x06, 0xFF, 0xFF, 0xFF, 0xFB]);

        let mut output = ObjectDataOutput::new();
        assert!(codec.write(&5i64, &mut output).is_err());
        assert_eq!(output.written(), 0);

        let err = codec.read(&mut ObjectDataInput::new(&[0x08, 0, 0, 0, 0, 0, 0, 0, 1]));
        assert!(err.is_err());
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    enum Color {
        #[default]
        Red,
        Green,
    }

    impl Described for Color {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::of::<Self>("Color", Shape::Enum(EnumShape::of::<Self>()))
        }
    }

    impl DescribedEnum for Color {
        fn to_repr(&self) -> i64 {
            *self as i64
        }

        fn from_repr(repr: i64) -> Option<Self> {
            match repr {
                0 => Some(Color::Red),
                1 => Some(Color::Green),
                _ => None,
            }
        }
    }

    #[test]
    fn test_enum_unknown_value_decodes_to_default() {
        let Shape::Enum(shape) = Color::describe().shape().clone() else {
            panic!("expected enum shape");
        };
        let codec = enumeration(&Color::describe(), shape);
        let bytes = encode(&codec, &Color::Green);
        let decoded: Color = codec.read_typed(&mut ObjectDataInput::new(&bytes)).unwrap();
        assert_eq!(decoded, Color::Green);

        let unknown = [0x13, 0, 0, 0, 0, 0, 0, 0, 7];
        let decoded = unbox::<Color>(codec.read(&mut ObjectDataInput::new(&unknown)).unwrap());
        assert_eq!(decoded.unwrap(), Color::Red);
    }
}
