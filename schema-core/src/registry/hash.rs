//! Protocol hash: a Horner's-method multiplicative string hash (base 18471,
//! wrapping mod 2^32) folded first over each public type's non-`Hidden`
//! members, then over the lexicographically-ordered list of public types.
//! Two registries built from the same schema always agree on this value,
//! even across process restarts.

use crate::registry::descriptor::TypeDescriptor;
use crate::registry::flags::MemberFlags;

const HASH_BASE: u32 = 18471;
const TYPE_CODE_MULTIPLIER: u32 = 117;
const MEMBER_FOLD_MULTIPLIER: u32 = 17;
const TYPE_FOLD_MULTIPLIER: u32 = 13;

pub(crate) fn string_hash(s: &str) -> u32 {
	s.bytes().fold(0u32, |h, b| h.wrapping_mul(HASH_BASE).wrapping_add(b as u32))
}

fn type_hash(desc: &TypeDescriptor) -> u32 {
	let type_code = desc.type_code.unwrap_or(0) as u32;
	let mut h = string_hash(&desc.name).wrapping_add(TYPE_CODE_MULTIPLIER.wrapping_mul(type_code));
	for member in desc.members.iter().filter(|m| !m.flags.contains(MemberFlags::HIDDEN)) {
		h = h
			.wrapping_mul(MEMBER_FOLD_MULTIPLIER)
			.wrapping_add(string_hash(&member.name))
			.wrapping_add(string_hash(&member.declared_type_name))
			.wrapping_add(member.tag_id as u32);
	}
	h
}

/// `types` need not be pre-sorted; this folds in lexicographic-namespace
/// order and considers only `is_public` descriptors.
pub(crate) fn protocol_hash<'a>(types: impl Iterator<Item = &'a TypeDescriptor>) -> u32 {
	let mut public: Vec<&TypeDescriptor> = types.filter(|t| t.is_public).collect();
	public.sort_by(|a, b| a.name.cmp(&b.name));
	public.into_iter().fold(0u32, |h, t| h.wrapping_mul(TYPE_FOLD_MULTIPLIER).wrapping_add(type_hash(t)))
}
