//! Composite object codec.
//!
//! A composite value is written as an `Object` frame holding one
//! `(member tag, value)` entry per serialized member. The member tag
//! is a hash of the member name alone, so a reader matches entries to
//! members by name: entries it does not know are skipped, members missing
//! from the input keep their default value.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::buffer::{DataInput, DataOutput};
use crate::codec::{read_header, Codec};
use crate::descriptor::{ErasedValue, MemberDescriptor, TypeDescriptor};
use crate::error::{Result, TagbufError};
use crate::registry::RegistryShared;
use crate::wire::{member_tag, skip_value, WireTag, LEN_PREFIX, MEMBER_TAG_LEN};

struct MemberCodec {
    member: MemberDescriptor,
    tag: i64,
    codec: Arc<Codec>,
}

struct Layout {
    type_name: &'static str,
    members: Vec<MemberCodec>,
    by_tag: HashMap<i64, usize>,
    omit_absent: bool,
}

impl Layout {
    fn build(registry: &Arc<RegistryShared>, descriptor: &TypeDescriptor) -> Result<Self> {
        let extracted = registry.extractor().extract(descriptor);
        let mut members: Vec<MemberCodec> = Vec::with_capacity(extracted.len());
        let mut by_tag = HashMap::with_capacity(extracted.len());

        for member in extracted {
            let tag = member_tag(member.name());
            if let Some(&index) = by_tag.get(&tag) {
                let first: &MemberCodec = &members[index];
                return Err(TagbufError::DuplicateMemberTag {
                    type_name: descriptor.name().to_string(),
                    first: first.member.name().to_string(),
                    second: member.name().to_string(),
                    tag,
                });
            }
            let codec = registry.resolve(member.ty())?;
            by_tag.insert(tag, members.len());
            members.push(MemberCodec { member, tag, codec });
        }

        Ok(Self {
            type_name: descriptor.name(),
            members,
            by_tag,
            omit_absent: registry.config().omit_absent_members(),
        })
    }

    /// Visits every member value that is written.
    fn for_each_written<F>(&self, value: &dyn Any, mut visit: F) -> Result<()>
    where
        F: FnMut(&MemberCodec, &dyn Any) -> Result<()>,
    {
        for entry in &self.members {
            let member_value = entry.member.get(value)?;
            let member_value = member_value.as_any();
            if self.omit_absent && entry.codec.is_absent(member_value) {
                continue;
            }
            visit(entry, member_value)?;
        }
        Ok(())
    }

    fn payload_size(&self, value: &dyn Any) -> Result<usize> {
        let mut size = 0;
        self.for_each_written(value, |entry, member_value| {
            size += MEMBER_TAG_LEN + entry.codec.size(member_value)?;
            Ok(())
        })?;
        Ok(size)
    }

    fn write(&self, value: &dyn Any, output: &mut dyn DataOutput) -> Result<()> {
        let frame = output.begin_frame(WireTag::Object)?;
        self.for_each_written(value, |entry, member_value| {
            output.write_long(entry.tag)?;
            entry.codec.write(member_value, output)
        })?;
        output.end_frame(frame)?;
        Ok(())
    }

    fn read_into(&self, target: &mut dyn Any, input: &mut dyn DataInput) -> Result<()> {
        let frame = input.open_frame()?;
        while input.position() < frame.end() {
            let tag = input.read_long()?;
            let Some(&index) = self.by_tag.get(&tag) else {
                trace!(type_name = self.type_name, tag, "skipping unknown member");
                skip_value(input)?;
                continue;
            };
            let entry = &self.members[index];
            let name = entry.member.name();
            let member_value = entry
                .codec
                .read(input)
                .map_err(|e| e.in_member(self.type_name, name))?;
            entry
                .member
                .set(target, member_value)
                .map_err(|e| e.in_member(self.type_name, name))?;
        }

        input.close_frame(frame, self.type_name)
    }
}

/// Builds the codec of a composite type from its extracted members.
pub(crate) fn build_codec(
    registry: &Arc<RegistryShared>,
    descriptor: &TypeDescriptor,
) -> Result<Codec> {
    let layout = Arc::new(Layout::build(registry, descriptor)?);
    let default = descriptor.default_fn();
    let write_layout = Arc::clone(&layout);
    let read_layout = Arc::clone(&layout);
    let size_layout = layout;

    Ok(Codec::new(
        descriptor,
        WireTag::Object,
        Box::new(move |value: &dyn Any, output: &mut dyn DataOutput| {
            write_layout.write(value, output)
        }),
        Box::new(move |input: &mut dyn DataInput| -> Result<ErasedValue> {
            let mut value = default();
            if read_header(input, read_layout.type_name, &[WireTag::Object])?.is_some() {
                read_layout.read_into(&mut *value, input)?;
            }
            Ok(value)
        }),
        Box::new(move |value: &dyn Any| -> Result<usize> {
            Ok(1 + LEN_PREFIX + size_layout.payload_size(value)?)
        }),
    ))
}
