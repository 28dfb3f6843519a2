//! Byte source for encoded values.

use std::io::Cursor;

use bytes::Buf;

use crate::error::{DecodeError, Result};
use crate::wire::WireTag;

/// Bounds of a length-prefixed payload opened by [`DataInput::open_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFrame {
    start: usize,
    len: usize,
}

impl InputFrame {
    /// Position of the first payload byte.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-length payload.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position just past the payload.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Sequential, skippable source that codecs consume. Multi-byte values are
/// big-endian.
pub trait DataInput {
    /// Reads one byte.
    fn read_byte(&mut self) -> Result<i8>;

    /// Reads one byte; any non-zero value is `true`.
    fn read_bool(&mut self) -> Result<bool>;

    /// Reads an `i16`.
    fn read_short(&mut self) -> Result<i16>;

    /// Reads an `i32`.
    fn read_int(&mut self) -> Result<i32>;

    /// Reads an `i64`.
    fn read_long(&mut self) -> Result<i64>;

    /// Reads IEEE 754 bits.
    fn read_float(&mut self) -> Result<f32>;

    /// Reads IEEE 754 bits.
    fn read_double(&mut self) -> Result<f64>;

    /// Fills `buf` with the next `buf.len()` bytes.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Advances past `len` bytes without decoding them.
    fn skip(&mut self, len: usize) -> Result<()>;

    /// Returns the number of bytes consumed so far.
    fn position(&self) -> usize;

    /// Returns the number of bytes left.
    fn remaining(&self) -> usize;

    /// Reads `len` raw bytes.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > self.remaining() {
            return Err(insufficient(len, self.remaining()));
        }
        let mut buf = vec![0u8; len];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Reads UTF-8 text written by `DataOutput::write_string`.
    fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|e| DecodeError::new(format!("invalid UTF-8 string: {}", e)).into())
    }

    /// Reads the category tag that starts a value.
    fn read_tag(&mut self) -> Result<WireTag> {
        WireTag::from_byte(self.read_byte()? as u8)
    }

    /// Reads a `u32` length or element count.
    fn read_len(&mut self) -> Result<usize> {
        Ok(self.read_int()? as u32 as usize)
    }

    /// Reads a payload byte length and checks that the input holds it.
    fn open_frame(&mut self) -> Result<InputFrame> {
        let len = self.read_len()?;
        if len > self.remaining() {
            return Err(DecodeError::new(format!(
                "payload of {} bytes exceeds the {} remaining",
                len,
                self.remaining()
            ))
            .into());
        }
        Ok(InputFrame {
            start: self.position(),
            len,
        })
    }

    /// Fails unless exactly the bytes of `frame` have been consumed.
    fn close_frame(&self, frame: InputFrame, type_name: &str) -> Result<()> {
        let consumed = self.position() - frame.start;
        if consumed != frame.len {
            return Err(DecodeError::new(format!(
                "{} payload declared {} bytes but {} were consumed",
                type_name, frame.len, consumed
            ))
            .into());
        }
        Ok(())
    }
}

fn insufficient(need: usize, have: usize) -> crate::error::TagbufError {
    DecodeError::new(format!("insufficient data: need {} bytes, have {}", need, have)).into()
}

/// Input over a borrowed byte slice.
#[derive(Debug)]
pub struct ObjectDataInput<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ObjectDataInput<'a> {
    /// Reads from the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    fn ensure_remaining(&self, n: usize) -> Result<()> {
        if self.cursor.remaining() < n {
            return Err(insufficient(n, self.cursor.remaining()));
        }
        Ok(())
    }
}

impl DataInput for ObjectDataInput<'_> {
    fn read_byte(&mut self) -> Result<i8> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_i8())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_u8() != 0)
    }

    fn read_short(&mut self) -> Result<i16> {
        self.ensure_remaining(2)?;
        Ok(self.cursor.get_i16())
    }

    fn read_int(&mut self) -> Result<i32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_i32())
    }

    fn read_long(&mut self) -> Result<i64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_i64())
    }

    fn read_float(&mut self) -> Result<f32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_f32())
    }

    fn read_double(&mut self) -> Result<f64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_f64())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure_remaining(buf.len())?;
        self.cursor.copy_to_slice(buf);
        Ok(())
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure_remaining(len)?;
        self.cursor.advance(len);
        Ok(())
    }

    fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TagbufError;

    #[test]
    fn test_fixed_width_values_are_big_endian() {
        let data = [
            0xFF, 0x01, 0x02, 0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
            0x08, 0x3F, 0x80, 0x00, 0x00,
        ];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_byte().unwrap(), -1);
        assert_eq!(input.read_short().unwrap(), 0x0102);
        assert_eq!(input.read_int().unwrap(), 0x01020304);
        assert_eq!(input.read_long().unwrap(), 0x0102030405060708);
        assert_eq!(input.read_float().unwrap(), 1.0f32);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_short_input_is_decode_error() {
        let data = [0x01, 0x02, 0x03];
        let mut input = ObjectDataInput::new(&data);
        let err = input.read_int().unwrap_err();
        assert!(matches!(err, TagbufError::Decode(_)));
        assert!(err.to_string().contains("insufficient data"));
        assert!(input.read_bytes(5).is_err());
        assert!(input.skip(4).is_err());
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn test_read_string() {
        let mut input = ObjectDataInput::new(&[0, 0, 0, 4, b't', b'e', b's', b't']);
        assert_eq!(input.read_string().unwrap(), "test");

        let mut bad_utf8 = ObjectDataInput::new(&[0, 0, 0, 2, 0xFF, 0xFE]);
        assert!(bad_utf8.read_string().is_err());

        // A length with the top bit set is read as a huge u32, not a negative.
        let mut huge = ObjectDataInput::new(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(huge.read_string().is_err());
    }

    #[test]
    fn test_read_tag() {
        let mut input = ObjectDataInput::new(&[0x40, 0x7F]);
        assert_eq!(input.read_tag().unwrap(), WireTag::Object);
        assert!(input.read_tag().is_err());
    }

    #[test]
    fn test_frame_bounds() {
        let data = [0, 0, 0, 3, 1, 2, 3, 4];
        let mut input = ObjectDataInput::new(&data);
        let frame = input.open_frame().unwrap();
        assert_eq!((frame.start(), frame.len(), frame.end()), (4, 3, 7));
        input.skip(2).unwrap();
        assert!(input.close_frame(frame, "T").is_err());
        input.skip(1).unwrap();
        input.close_frame(frame, "T").unwrap();
    }

    #[test]
    fn test_frame_longer_than_input() {
        let mut input = ObjectDataInput::new(&[0, 0, 0, 100, 1, 2, 3]);
        let err = input.open_frame().unwrap_err();
        assert!(err.to_string().contains("exceeds the 3 remaining"));
    }
}
