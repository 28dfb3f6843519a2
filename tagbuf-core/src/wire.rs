//! Wire-level vocabulary: category tags, primitive kinds, member tags and
//! value skipping.
//!
//! Every encoded value starts with a one-byte [`WireTag`]. The tag alone is
//! enough to find the end of the value, which is what lets composite readers
//! step over members they do not know.

use crate::buffer::DataInput;
use crate::error::{DecodeError, Result};

/// Seed and feedback polynomial of the fingerprint, the CRC-64-ECMA constant.
const FINGERPRINT_POLY: u64 = 0xc15d213aa4d7a795;

/// Hashes `data` to the 64-bit value used for member tags and type
/// discriminators.
///
/// This is a Rabin fingerprint computed bit by bit, least significant bit of
/// each byte first. It is part of the wire format: changing it changes every
/// member tag, so encodings written before the change can no longer be
/// matched to their members.
pub fn fingerprint_64(data: &[u8]) -> i64 {
    let fp = data.iter().fold(FINGERPRINT_POLY, |fp, &byte| {
        (0..8).fold(fp, |fp, i| {
            let carry = (fp ^ u64::from(byte >> i)) & 1;
            (fp >> 1) ^ (FINGERPRINT_POLY & carry.wrapping_neg())
        })
    });
    fp as i64
}

/// Returns the wire tag of a composite member, derived from its name only.
pub fn member_tag(name: &str) -> i64 {
    fingerprint_64(name.as_bytes())
}

/// Returns the discriminator written before a dynamically typed value.
pub fn type_discriminator(type_name: &str) -> i64 {
    fingerprint_64(type_name.as_bytes())
}

/// Encoded size of a member tag.
pub const MEMBER_TAG_LEN: usize = 8;

/// Encoded size of a dynamic type discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Encoded size of a `u32` length or count prefix.
pub const LEN_PREFIX: usize = 4;

/// Category tag that starts every encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireTag {
    /// Absent value; decodes to the type's default.
    Empty = 0x00,
    /// `bool`.
    Bool = 0x01,
    /// `i8`.
    Int8 = 0x02,
    /// `u8`.
    UInt8 = 0x03,
    /// `i16`.
    Int16 = 0x04,
    /// `u16`.
    UInt16 = 0x05,
    /// `i32`.
    Int32 = 0x06,
    /// `u32`.
    UInt32 = 0x07,
    /// `i64`.
    Int64 = 0x08,
    /// `u64`.
    UInt64 = 0x09,
    /// `f32`.
    Float32 = 0x0A,
    /// `f64`.
    Float64 = 0x0B,
    /// 128-bit decimal.
    Decimal = 0x0C,
    /// Length-prefixed UTF-8.
    String = 0x10,
    /// Seconds and nanoseconds since the Unix epoch.
    DateTime = 0x11,
    /// 16-byte identifier.
    Uuid = 0x12,
    /// Underlying enum integer.
    Enum = 0x13,
    /// Presence byte, then the value.
    Optional = 0x14,
    /// Packed array of primitives.
    PrimitiveArray = 0x20,
    /// Length-prefixed array.
    Array = 0x21,
    /// Length-prefixed list.
    List = 0x22,
    /// Packed list of primitives.
    PrimitiveList = 0x23,
    /// Array of dynamic values.
    UntypedArray = 0x24,
    /// Length-prefixed key/value pairs.
    Dictionary = 0x25,
    /// Type discriminator, then the value.
    Dynamic = 0x30,
    /// Length-prefixed composite members.
    Object = 0x40,
    /// Length-prefixed user payload.
    Custom = 0x41,
}

impl WireTag {
    /// Parses a tag byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        let tag = match byte {
            0x00 => Self::Empty,
            0x01 => Self::Bool,
            0x02 => Self::Int8,
            0x03 => Self::UInt8,
            0x04 => Self::Int16,
            0x05 => Self::UInt16,
            0x06 => Self::Int32,
            0x07 => Self::UInt32,
            0x08 => Self::Int64,
            0x09 => Self::UInt64,
            0x0A => Self::Float32,
            0x0B => Self::Float64,
            0x0C => Self::Decimal,
            0x10 => Self::String,
            0x11 => Self::DateTime,
            0x12 => Self::Uuid,
            0x13 => Self::Enum,
            0x14 => Self::Optional,
            0x20 => Self::PrimitiveArray,
            0x21 => Self::Array,
            0x22 => Self::List,
            0x23 => Self::PrimitiveList,
            0x24 => Self::UntypedArray,
            0x25 => Self::Dictionary,
            0x30 => Self::Dynamic,
            0x40 => Self::Object,
            0x41 => Self::Custom,
            _ => {
                return Err(DecodeError::new(format!("unknown wire tag: {:#04x}", byte)).into())
            }
        };
        Ok(tag)
    }

    /// Returns the byte written on the wire.
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Returns the payload size for fixed-size categories.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Empty => Some(0),
            Self::Bool | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Enum => Some(8),
            Self::DateTime => Some(12),
            Self::Decimal | Self::Uuid => Some(16),
            _ => None,
        }
    }

    /// Returns true for categories whose payload starts with a byte length.
    pub fn is_length_prefixed(self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Array
                | Self::List
                | Self::UntypedArray
                | Self::Dictionary
                | Self::Object
                | Self::Custom
        )
    }
}

/// Fixed-width primitive numeric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `bool`.
    Bool,
    /// `i8`.
    Int8,
    /// `u8`.
    UInt8,
    /// `i16`.
    Int16,
    /// `u16`.
    UInt16,
    /// `i32`.
    Int32,
    /// `u32`.
    UInt32,
    /// `i64`.
    Int64,
    /// `u64`.
    UInt64,
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
}

impl PrimitiveKind {
    /// Returns the wire tag for a single value of this kind.
    pub fn wire_tag(self) -> WireTag {
        match self {
            Self::Bool => WireTag::Bool,
            Self::Int8 => WireTag::Int8,
            Self::UInt8 => WireTag::UInt8,
            Self::Int16 => WireTag::Int16,
            Self::UInt16 => WireTag::UInt16,
            Self::Int32 => WireTag::Int32,
            Self::UInt32 => WireTag::UInt32,
            Self::Int64 => WireTag::Int64,
            Self::UInt64 => WireTag::UInt64,
            Self::Float32 => WireTag::Float32,
            Self::Float64 => WireTag::Float64,
        }
    }

    /// Maps a wire tag back to a primitive kind.
    pub fn from_wire_tag(tag: WireTag) -> Option<Self> {
        match tag {
            WireTag::Bool => Some(Self::Bool),
            WireTag::Int8 => Some(Self::Int8),
            WireTag::UInt8 => Some(Self::UInt8),
            WireTag::Int16 => Some(Self::Int16),
            WireTag::UInt16 => Some(Self::UInt16),
            WireTag::Int32 => Some(Self::Int32),
            WireTag::UInt32 => Some(Self::UInt32),
            WireTag::Int64 => Some(Self::Int64),
            WireTag::UInt64 => Some(Self::UInt64),
            WireTag::Float32 => Some(Self::Float32),
            WireTag::Float64 => Some(Self::Float64),
            _ => None,
        }
    }

    /// Returns the encoded width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }
}

/// Skips one complete encoded value, tag included.
pub fn skip_value(input: &mut dyn DataInput) -> Result<()> {
    let tag = input.read_tag()?;
    skip_payload(tag, input)
}

/// Skips the payload of a value whose tag was already consumed.
pub fn skip_payload(mut tag: WireTag, input: &mut dyn DataInput) -> Result<()> {
    // Optional and dynamic wrappers are unwrapped in a loop so that deeply
    // nested input cannot exhaust the stack.
    loop {
        match tag {
            WireTag::Optional => {
                if !input.read_bool()? {
                    return Ok(());
                }
            }
            WireTag::Dynamic => {
                input.read_long()?;
            }
            other => return skip_flat(other, input),
        }
        tag = input.read_tag()?;
    }
}

fn skip_flat(tag: WireTag, input: &mut dyn DataInput) -> Result<()> {
    if let Some(width) = tag.fixed_width() {
        return input.skip(width);
    }
    if tag.is_length_prefixed() {
        let len = input.read_len()?;
        return input.skip(len);
    }
    match tag {
        WireTag::PrimitiveArray | WireTag::PrimitiveList => {
            let element = input.read_tag()?;
            let kind = PrimitiveKind::from_wire_tag(element).ok_or_else(|| {
                DecodeError::new(format!("{:?} is not a primitive element tag", element))
            })?;
            let count = input.read_len()?;
            let total = count
                .checked_mul(kind.width())
                .ok_or_else(|| DecodeError::new("packed length overflow"))?;
            input.skip(total)
        }
        other => Err(DecodeError::new(format!("cannot skip {:?}", other)).into()),
    }
}
