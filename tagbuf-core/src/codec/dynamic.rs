//! Codec for [`AnyValue`]: a discriminator naming the concrete type, then the
//! concrete type's own encoding.

use std::any::Any;
use std::cell::Cell;
use std::sync::{Arc, Weak};

use super::Codec;
use crate::buffer::{DataInput, DataOutput};
use crate::descriptor::{downcast, AnyValue, ErasedValue, TypeDescriptor};
use crate::error::{DecodeError, Result, TagbufError};
use crate::registry::RegistryShared;
use crate::wire::{type_discriminator, WireTag, DISCRIMINATOR_LEN};

/// Deepest nesting of non-null dynamic values that is written, sized or read.
pub const MAX_DYNAMIC_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy)]
enum Pass {
    Write = 0,
    Read = 1,
    Size = 2,
}

thread_local! {
    // One counter per pass: a custom writer may size values while writing.
    static DEPTH: [Cell<usize>; 3] = [Cell::new(0), Cell::new(0), Cell::new(0)];
}

/// Counts the dynamic values a pass is inside of on this thread.
struct DepthGuard {
    pass: Pass,
}

impl DepthGuard {
    fn enter(pass: Pass) -> Result<Self> {
        DEPTH.with(|depth: &[Cell<usize>; 3]| -> Result<Self> {
            let depth = &depth[pass as usize];
            if depth.get() >= MAX_DYNAMIC_DEPTH {
                let reason = format!("dynamic values nested deeper than {}", MAX_DYNAMIC_DEPTH);
                return Err(match pass {
                    Pass::Read => DecodeError::new(reason).into(),
                    Pass::Write | Pass::Size => TagbufError::Encode(reason),
                });
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard { pass })
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| {
            let depth = &depth[self.pass as usize];
            depth.set(depth.get() - 1);
        });
    }
}

pub(crate) fn any_value(registry: &Arc<RegistryShared>, descriptor: &TypeDescriptor) -> Codec {
    // Weak: the registry owns this codec.
    let write_registry = Arc::downgrade(registry);
    let read_registry = Weak::clone(&write_registry);
    let size_registry = Weak::clone(&write_registry);

    Codec::new(
        descriptor,
        WireTag::Dynamic,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            let value = downcast::<AnyValue>(value)?;
            let Some((codec, inner)) = concrete(&write_registry, value)? else {
                return output.write_tag(WireTag::Empty);
            };
            let _depth = DepthGuard::enter(Pass::Write)?;
            output.write_tag(WireTag::Dynamic)?;
            output.write_long(type_discriminator(codec.type_name()))?;
            codec.write(inner, output)
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            match input.read_tag()? {
                WireTag::Empty => Ok(Box::new(AnyValue::null())),
                WireTag::Dynamic => {
                    let _depth = DepthGuard::enter(Pass::Read)?;
                    let registry = read_registry
                        .upgrade()
                        .ok_or_else(|| DecodeError::new("codec registry has been dropped"))?;
                    let discriminator = input.read_long()?;
                    let descriptor = registry.dynamic_type(discriminator).ok_or_else(|| {
                        DecodeError::new(format!(
                            "no registered type for discriminator {:#018x}",
                            discriminator
                        ))
                    })?;
                    let codec = registry.resolve_descriptor(&descriptor)?;
                    let value = codec.read(input)?;
                    let value = descriptor.to_dynamic(value).ok_or_else(|| {
                        DecodeError::new(format!(
                            "codec of {} produced a value of another type",
                            descriptor.name()
                        ))
                    })?;
                    Ok(Box::new(value))
                }
                other => Err(DecodeError::new(format!(
                    "unexpected {:?} tag for a dynamic value",
                    other
                ))
                .into()),
            }
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            let value = downcast::<AnyValue>(value)?;
            match concrete(&size_registry, value)? {
                Some((codec, inner)) => {
                    let _depth = DepthGuard::enter(Pass::Size)?;
                    Ok(1 + DISCRIMINATOR_LEN + codec.size(inner)?)
                }
                None => Ok(1),
            }
        }),
    )
    .with_absent(Box::new(|value: &dyn Any| {
        value.downcast_ref::<AnyValue>().map_or(false, AnyValue::is_null)
    }))
}

/// Resolves the codec of the value held by `value`, if any.
fn concrete<'a>(
    registry: &Weak<RegistryShared>,
    value: &'a AnyValue,
) -> Result<Option<(Arc<Codec>, &'a dyn Any)>> {
    let (Some(ty), Some(inner)) = (value.type_ref(), value.as_any()) else {
        return Ok(None);
    };
    let registry = registry
        .upgrade()
        .ok_or_else(|| TagbufError::Encode("codec registry has been dropped".to_string()))?;
    let codec = registry.resolve(ty)?;
    // A reader maps the discriminator back to whichever type claimed the name first.
    let discriminator = type_discriminator(codec.type_name());
    match registry.dynamic_type(discriminator) {
        Some(owner) if owner.id() == codec.type_id() => Ok(Some((codec, inner))),
        Some(owner) => Err(TagbufError::Encode(format!(
            "{} cannot be written as a dynamic value: its name is registered to {}",
            codec.type_name(),
            owner.name()
        ))),
        None => Err(TagbufError::Encode(format!(
            "{} has no dynamic registration",
            codec.type_name()
        ))),
    }
}
