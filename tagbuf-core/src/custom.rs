//! User-supplied serialization routines.
//!
//! A type opts out of structural serialization by carrying a
//! [`CustomDeclaration`], either in its descriptor (`#[tagbuf(custom)]`) or
//! registered at runtime through `Serializer::declare_custom`. The
//! declaration's writer, reader and sizer are wrapped in a codec that frames
//! the user payload with a `Custom` tag and a byte length, so readers that do
//! not know the type can still skip it. The length is taken from what the
//! writer actually wrote; the sizer is only consulted to pre-size buffers
//! and, when enabled, to check the writer.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::buffer::{DataInput, DataOutput};
use crate::codec::{read_header, Codec};
use crate::config::SerializerConfig;
use crate::descriptor::{downcast, Described, ErasedValue, TypeDescriptor};
use crate::error::{DecodeError, Result, TagbufError};
use crate::wire::{WireTag, LEN_PREFIX};

/// Serialization routines a type (or a helper type) provides for `T`.
///
/// The sizer must return exactly the number of bytes the writer appends.
///
/// # Example
///
/// ```
/// use tagbuf_core::{CustomSerializer, DataInput, DataOutput, Result};
///
/// #[derive(Default)]
/// struct Rgb(u8, u8, u8);
///
/// struct RgbSerializer;
///
/// impl CustomSerializer<Rgb> for RgbSerializer {
///     fn write(value: &Rgb, output: &mut dyn DataOutput) -> Result<()> {
///         output.write_bytes(&[value.0, value.1, value.2])
///     }
///
///     fn read(input: &mut dyn DataInput) -> Result<Rgb> {
///         let bytes = input.read_bytes(3)?;
///         Ok(Rgb(bytes[0], bytes[1], bytes[2]))
///     }
///
///     fn size(_: &Rgb) -> usize {
///         3
///     }
/// }
/// ```
pub trait CustomSerializer<T> {
    /// Writes the payload of `value`.
    fn write(value: &T, output: &mut dyn DataOutput) -> Result<()>;

    /// Reads a payload written by [`CustomSerializer::write`].
    fn read(input: &mut dyn DataInput) -> Result<T>;

    /// Returns the payload size of `value` in bytes.
    fn size(value: &T) -> usize;
}

type CustomWriteFn = Arc<dyn Fn(&dyn Any, &mut dyn DataOutput) -> Result<()> + Send + Sync>;
type CustomReadFn = Arc<dyn Fn(&mut dyn DataInput) -> Result<ErasedValue> + Send + Sync>;
type CustomSizeFn = Arc<dyn Fn(&dyn Any) -> Result<usize> + Send + Sync>;

/// The custom routines declared for one type.
#[derive(Clone)]
pub struct CustomDeclaration {
    owner: &'static str,
    writer: Option<CustomWriteFn>,
    reader: Option<CustomReadFn>,
    sizer: Option<CustomSizeFn>,
}

impl CustomDeclaration {
    /// Declares the routines of `S` for `T`.
    pub fn from_serializer<T, S>() -> Self
    where
        T: Described,
        S: CustomSerializer<T> + 'static,
    {
        Self::builder::<T>()
            .owner(type_name::<S>())
            .writer(S::write)
            .reader(S::read)
            .sizer(S::size)
            .build()
    }

    /// Starts a declaration for `T` from individual routines.
    pub fn builder<T: Described>() -> CustomDeclarationBuilder<T> {
        CustomDeclarationBuilder {
            owner: type_name::<T>(),
            writer: None,
            reader: None,
            sizer: None,
            _marker: PhantomData,
        }
    }

    /// Returns the name of the type the routines belong to.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Returns true if all three routines are present.
    pub fn is_complete(&self) -> bool {
        self.writer.is_some() && self.reader.is_some() && self.sizer.is_some()
    }
}

impl fmt::Debug for CustomDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDeclaration")
            .field("owner", &self.owner)
            .field("writer", &self.writer.is_some())
            .field("reader", &self.reader.is_some())
            .field("sizer", &self.sizer.is_some())
            .finish()
    }
}

/// Builder for a [`CustomDeclaration`] of `T`.
pub struct CustomDeclarationBuilder<T> {
    owner: &'static str,
    writer: Option<CustomWriteFn>,
    reader: Option<CustomReadFn>,
    sizer: Option<CustomSizeFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Described> CustomDeclarationBuilder<T> {
    /// Sets the name reported when a routine is missing.
    pub fn owner(mut self, owner: &'static str) -> Self {
        self.owner = owner;
        self
    }

    /// Sets the writer.
    pub fn writer<W>(mut self, writer: W) -> Self
    where
        W: Fn(&T, &mut dyn DataOutput) -> Result<()> + Send + Sync + 'static,
    {
        self.writer = Some(Arc::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            writer(downcast::<T>(value)?, output)
        }));
        self
    }

    /// Sets the reader.
    pub fn reader<R>(mut self, reader: R) -> Self
    where
        R: Fn(&mut dyn DataInput) -> Result<T> + Send + Sync + 'static,
    {
        self.reader = Some(Arc::new(
            move |input: &mut dyn DataInput| -> Result<ErasedValue> { Ok(Box::new(reader(input)?)) },
        ));
        self
    }

    /// Sets the sizer.
    pub fn sizer<Z>(mut self, sizer: Z) -> Self
    where
        Z: Fn(&T) -> usize + Send + Sync + 'static,
    {
        self.sizer = Some(Arc::new(move |value: &dyn Any| -> Result<usize> {
            Ok(sizer(downcast::<T>(value)?))
        }));
        self
    }

    /// Finishes the declaration. Missing routines are reported when a codec
    /// is built from it.
    pub fn build(self) -> CustomDeclaration {
        CustomDeclaration {
            owner: self.owner,
            writer: self.writer,
            reader: self.reader,
            sizer: self.sizer,
        }
    }
}

fn missing(owner: &str, routine: &'static str) -> TagbufError {
    TagbufError::MissingCustomMethod {
        owner: owner.to_string(),
        routine,
    }
}

/// Builds the codec adapting `declaration` for `descriptor`'s type.
pub(crate) fn build_codec(
    descriptor: &TypeDescriptor,
    declaration: &CustomDeclaration,
    config: &SerializerConfig,
) -> Result<Codec> {
    let owner = declaration.owner;
    let writer = declaration.writer.clone().ok_or_else(|| missing(owner, "writer"))?;
    let reader = declaration.reader.clone().ok_or_else(|| missing(owner, "reader"))?;
    let sizer = declaration.sizer.clone().ok_or_else(|| missing(owner, "sizer"))?;

    let type_name = descriptor.name();
    let default = descriptor.default_fn();
    let verify = config.verify_custom_sizes();
    let write_sizer = Arc::clone(&sizer);

    Ok(Codec::new(
        descriptor,
        WireTag::Custom,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            let frame = output.begin_frame(WireTag::Custom)?;
            writer(value, output)?;
            let written = output.end_frame(frame)?;
            if verify {
                let size = write_sizer(value)?;
                if written != size {
                    return Err(TagbufError::Encode(format!(
                        "custom writer of {} wrote {} bytes but its sizer reported {}",
                        owner, written, size
                    )));
                }
            }
            Ok(())
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            if read_header(input, type_name, &[WireTag::Custom])?.is_none() {
                return Ok(default());
            }
            let frame = input.open_frame()?;
            let value = reader(input)?;
            let consumed = input.position() - frame.start();
            if consumed > frame.len() {
                return Err(DecodeError::new(format!(
                    "custom reader of {} consumed {} bytes of a {} byte payload",
                    owner, consumed, frame.len()
                ))
                .into());
            }
            input.skip(frame.len() - consumed)?;
            Ok(value)
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            Ok(1 + LEN_PREFIX + sizer(value)?)
        }),
    ))
}
