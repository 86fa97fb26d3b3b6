//! Write-block planning: before encoding a run of members,
//! sum the statically-known upper bound of a contiguous prefix and issue one
//! allocator reservation for it, rather than growing the buffer member by
//! member. Purely a throughput optimization — it changes nothing about what
//! gets written, only how the backing buffer grows while it's written.

use crate::registry::{DescriptorKind, MemberDescriptor};
use crate::wire::{PrimitiveKind, MAX_SPAN_SIZE};

/// Upper bound, in bytes, on one varint tag id plus one member's payload, or
/// `None` if the member's size depends on runtime data (strings, bytes,
/// collections, structs, refs).
fn static_member_upper_bound(member: &MemberDescriptor) -> Option<usize> {
	const TAG_MAX: usize = 5;
	let payload = match member.wire_kind {
		DescriptorKind::Primitive(p) => primitive_upper_bound(p),
		DescriptorKind::NullablePrimitive(p) => 1 + primitive_upper_bound(p),
		DescriptorKind::Enum { underlying } => primitive_upper_bound(underlying),
		DescriptorKind::NullableEnum { underlying } => 1 + primitive_upper_bound(underlying),
		DescriptorKind::DynamicEnum => 5,
		_ => return None,
	};
	Some(TAG_MAX + payload)
}

fn primitive_upper_bound(p: PrimitiveKind) -> usize {
	match p {
		PrimitiveKind::Bool | PrimitiveKind::Int8 | PrimitiveKind::UInt8 => 2,
		PrimitiveKind::Int16 | PrimitiveKind::UInt16 => 3,
		PrimitiveKind::Int32 | PrimitiveKind::UInt32 | PrimitiveKind::Char => 5,
		PrimitiveKind::Int64 | PrimitiveKind::UInt64 => 10,
		PrimitiveKind::UInt128 => 19,
		PrimitiveKind::F32 => 4,
		PrimitiveKind::F32Vec2 => 8,
		PrimitiveKind::F32Vec3 => 12,
		PrimitiveKind::F64 => 8,
		PrimitiveKind::F64Vec2 => 16,
		PrimitiveKind::F64Vec3 => 24,
		PrimitiveKind::Float32 => 4,
		PrimitiveKind::Float64 => 8,
		PrimitiveKind::MetaGuid => 16,
	}
}

/// Splits `members` into runs that can be reserved as one block: each run is
/// a maximal sequence of statically-sized members, capped at
/// [`MAX_SPAN_SIZE`] bytes so one pathological struct can't force one huge
/// up-front allocation.
pub(crate) fn plan(members: &[MemberDescriptor]) -> Vec<usize> {
	let mut reservations = Vec::new();
	let mut run = 0usize;
	for member in members {
		match static_member_upper_bound(member) {
			Some(size) if run + size <= MAX_SPAN_SIZE => run += size,
			Some(size) => {
				if run > 0 {
					reservations.push(run);
				}
				run = size;
			},
			None => {
				if run > 0 {
					reservations.push(run);
				}
				run = 0;
			},
		}
	}
	if run > 0 {
		reservations.push(run);
	}
	reservations
}
