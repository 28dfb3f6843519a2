//! Member extraction strategies.
//!
//! An extractor decides which candidate members of a composite type take
//! part in serialization. It is chosen once per serializer.

use crate::config::ExtractorKind;
use crate::descriptor::{MemberDescriptor, MemberOrigin, Shape, TypeDescriptor};

/// Selects the serialized members of a composite type.
pub trait MemberExtractor: Send + Sync {
    /// Returns the members of `descriptor` to serialize, in declaration order.
    ///
    /// Returns no members for non-composite descriptors.
    fn extract(&self, descriptor: &TypeDescriptor) -> Vec<MemberDescriptor>;
}

fn candidates(descriptor: &TypeDescriptor) -> &[MemberDescriptor] {
    match descriptor.shape() {
        Shape::Composite(shape) => shape.members(),
        _ => &[],
    }
}

/// Keeps every member that has both a getter and a setter, regardless of
/// the accessibility of either.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessorPairExtractor;

impl MemberExtractor for AccessorPairExtractor {
    fn extract(&self, descriptor: &TypeDescriptor) -> Vec<MemberDescriptor> {
        candidates(descriptor)
            .iter()
            .filter(|m| m.has_getter() && m.has_setter())
            .cloned()
            .collect()
    }
}

/// Keeps only storage-slot members that can be read and assigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl MemberExtractor for FieldExtractor {
    fn extract(&self, descriptor: &TypeDescriptor) -> Vec<MemberDescriptor> {
        candidates(descriptor)
            .iter()
            .filter(|m| m.origin() == MemberOrigin::Field && m.has_getter() && m.has_setter())
            .cloned()
            .collect()
    }
}

impl ExtractorKind {
    /// Returns the extractor implementing this strategy.
    pub fn extractor(self) -> Box<dyn MemberExtractor> {
        match self {
            ExtractorKind::AccessorPairs => Box::new(AccessorPairExtractor),
            ExtractorKind::Fields => Box::new(FieldExtractor),
        }
    }
}
