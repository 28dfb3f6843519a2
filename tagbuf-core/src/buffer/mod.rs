//! Byte sink and source used by every codec.
//!
//! Besides fixed-width values, both sides know the framing the codecs share:
//! a one-byte category tag and, for variable-size payloads, a `u32` byte
//! length. An [`OutputFrame`] writes the length after the payload, so
//! nested values are written in a single pass.

mod data_input;
mod data_output;

pub use data_input::{DataInput, InputFrame, ObjectDataInput};
pub use data_output::{DataOutput, ObjectDataOutput, OutputFrame};
