//! Error types for tagbuf operations.

use std::fmt;
use std::io;
use thiserror::Error;

use crate::config::ConfigError;

/// The main error type for codec construction and (de)serialization.
#[derive(Debug, Error)]
pub enum TagbufError {
    /// A custom serialization is declared for a type but one of its
    /// writer, reader or sizer routines is missing.
    #[error("missing custom {routine} for type '{owner}'")]
    MissingCustomMethod {
        /// The type (or helper type) the routine was resolved against.
        owner: String,
        /// Which routine is missing: `writer`, `reader` or `sizer`.
        routine: &'static str,
    },

    /// The declared member types of a composite form a cycle.
    #[error("recursive type not supported: {type_name} (cycle: {cycle})")]
    RecursiveTypeNotSupported {
        /// The type that was requested again while it was being built.
        type_name: String,
        /// The chain of types that leads back to `type_name`.
        cycle: String,
    },

    /// The dispatcher could not classify the type.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Two member names of one composite type hash to the same member tag.
    #[error("members '{first}' and '{second}' of type '{type_name}' share member tag {tag:#018x}")]
    DuplicateMemberTag {
        /// The composite type.
        type_name: String,
        /// The member declared first.
        first: String,
        /// The member declared second.
        second: String,
        /// The colliding tag.
        tag: i64,
    },

    /// Malformed or truncated input.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A value could not be written.
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid serializer configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TagbufError {
    /// Creates a decode error with no member context.
    pub fn decode(reason: impl Into<String>) -> Self {
        TagbufError::Decode(DecodeError::new(reason))
    }

    /// Attaches a `(type, member)` frame to a decode error.
    ///
    /// Any other variant is returned unchanged.
    pub fn in_member(self, type_name: &str, member: &str) -> Self {
        match self {
            TagbufError::Decode(err) => TagbufError::Decode(err.in_member(type_name, member)),
            other => other,
        }
    }

    /// Returns true for errors raised while building a codec.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            TagbufError::MissingCustomMethod { .. }
                | TagbufError::RecursiveTypeNotSupported { .. }
                | TagbufError::UnsupportedType(_)
                | TagbufError::DuplicateMemberTag { .. }
        )
    }
}

/// One step of the member path a decode error unwound through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFrame {
    /// The composite type owning the member.
    pub type_name: String,
    /// The member being decoded.
    pub member: String,
}

/// A read-time failure, carrying the composite members it unwound through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    reason: String,
    // outermost frame first
    frames: Vec<MemberFrame>,
}

impl DecodeError {
    /// Creates a decode error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            frames: Vec::new(),
        }
    }

    /// Prepends a frame; called by composite codecs while the error unwinds.
    pub fn in_member(mut self, type_name: &str, member: &str) -> Self {
        self.frames.insert(
            0,
            MemberFrame {
                type_name: type_name.to_string(),
                member: member.to_string(),
            },
        );
        self
    }

    /// Returns the low-level reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the composite type that owns the failing member.
    pub fn owner(&self) -> Option<&str> {
        self.frames.last().map(|f| f.type_name.as_str())
    }

    /// Returns the name of the failing member.
    pub fn member(&self) -> Option<&str> {
        self.frames.last().map(|f| f.member.as_str())
    }

    /// Returns every frame, outermost first.
    pub fn frames(&self) -> &[MemberFrame] {
        &self.frames
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return write!(f, "decode error: {}", self.reason);
        }
        write!(f, "decode error in ")?;
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}.{}", frame.type_name, frame.member)?;
        }
        write!(f, ": {}", self.reason)
    }
}

impl std::error::Error for DecodeError {}

/// A specialized `Result` type for tagbuf operations.
pub type Result<T> = std::result::Result<T, TagbufError>;
