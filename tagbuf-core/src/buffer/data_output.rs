//! Byte sink for encoded values.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, TagbufError};
use crate::wire::{WireTag, LEN_PREFIX};

/// Length prefix of a frame opened by [`DataOutput::begin_frame`], waiting
/// to be filled in by [`DataOutput::end_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an open frame must be closed with `end_frame`"]
pub struct OutputFrame {
    len_at: usize,
}

fn len_to_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| TagbufError::Encode(format!("length {} exceeds u32 range", len)))
}

/// Sequential sink that codecs append to. Multi-byte values are big-endian.
///
/// Implementors provide the fixed-width writes, [`DataOutput::written`] and
/// [`DataOutput::write_int_at`]; tag and frame helpers are built on those.
pub trait DataOutput {
    /// Writes one byte.
    fn write_byte(&mut self, v: i8) -> Result<()>;

    /// Writes `1` or `0`.
    fn write_bool(&mut self, v: bool) -> Result<()>;

    /// Writes an `i16`.
    fn write_short(&mut self, v: i16) -> Result<()>;

    /// Writes an `i32`.
    fn write_int(&mut self, v: i32) -> Result<()>;

    /// Writes an `i64`.
    fn write_long(&mut self, v: i64) -> Result<()>;

    /// Writes the IEEE 754 bits.
    fn write_float(&mut self, v: f32) -> Result<()>;

    /// Writes the IEEE 754 bits.
    fn write_double(&mut self, v: f64) -> Result<()>;

    /// Appends `v` as is.
    fn write_bytes(&mut self, v: &[u8]) -> Result<()>;

    /// Returns the number of bytes appended so far.
    fn written(&self) -> usize;

    /// Overwrites four already written bytes at `position` with `v`.
    fn write_int_at(&mut self, position: usize, v: i32) -> Result<()>;

    /// Writes UTF-8 text after its `u32` byte length.
    fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_len(v.len())?;
        self.write_bytes(v.as_bytes())
    }

    /// Writes the category tag that starts a value.
    fn write_tag(&mut self, tag: WireTag) -> Result<()> {
        self.write_byte(tag.byte() as i8)
    }

    /// Writes a `u32` length or element count.
    fn write_len(&mut self, len: usize) -> Result<()> {
        self.write_int(len_to_u32(len)? as i32)
    }

    /// Writes `tag` followed by a placeholder byte length for the payload
    /// written next.
    fn begin_frame(&mut self, tag: WireTag) -> Result<OutputFrame> {
        self.write_tag(tag)?;
        let len_at = self.written();
        self.write_int(0)?;
        Ok(OutputFrame { len_at })
    }

    /// Back-fills the byte length of `frame` and returns it.
    fn end_frame(&mut self, frame: OutputFrame) -> Result<usize> {
        let len = self.written() - frame.len_at - LEN_PREFIX;
        self.write_int_at(frame.len_at, len_to_u32(len)? as i32)?;
        Ok(len)
    }
}

/// Growable in-memory output backed by `BytesMut`.
#[derive(Debug, Default)]
pub struct ObjectDataOutput {
    buffer: BytesMut,
}

impl ObjectDataOutput {
    /// Creates an empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an output that holds `capacity` bytes without reallocating.
    ///
    /// Pair with a codec's sizer to write a value in one allocation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the output and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

impl DataOutput for ObjectDataOutput {
    fn write_byte(&mut self, v: i8) -> Result<()> {
        self.buffer.put_i8(v);
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.buffer.put_u8(u8::from(v));
        Ok(())
    }

    fn write_short(&mut self, v: i16) -> Result<()> {
        self.buffer.put_i16(v);
        Ok(())
    }

    fn write_int(&mut self, v: i32) -> Result<()> {
        self.buffer.put_i32(v);
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        self.buffer.put_i64(v);
        Ok(())
    }

    fn write_float(&mut self, v: f32) -> Result<()> {
        self.buffer.put_f32(v);
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.buffer.put_f64(v);
        Ok(())
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.buffer.put_slice(v);
        Ok(())
    }

    fn written(&self) -> usize {
        self.buffer.len()
    }

    fn write_int_at(&mut self, position: usize, v: i32) -> Result<()> {
        let end = position + LEN_PREFIX;
        let len = self.buffer.len();
        let slot = self.buffer.get_mut(position..end).ok_or_else(|| {
            TagbufError::Encode(format!(
                "cannot patch bytes {}..{} of a {} byte output",
                position, end, len
            ))
        })?;
        slot.copy_from_slice(&v.to_be_bytes());
        Ok(())
    }
}
