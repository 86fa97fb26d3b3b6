//! Generic reachability walk over a decoded value, stopping only at
//! `ConfigRef`/`ConfigData` members. Shares the
//! same descriptor-driven recursion as encode/decode but carries no wire
//! reader/writer — it just visits values already sitting in memory.

use crate::error::Result;
use crate::registry::{DescriptorKind, Registry, TypeDescriptor, TypeId};
use crate::value::{RefValue, WireValue};

use super::Context;

/// Receives every `ConfigRef`/`ConfigData` value reached while walking a
/// decoded tree. `target` is the registered type of the ref itself (its key
/// type is `registry.get(target).key_type`).
pub trait RefVisitor {
	fn visit_ref(&mut self, registry: &Registry, target: TypeId, value: &mut RefValue) -> Result<()>;
}

/// Walks `value` (already decoded as `type_id`) looking for `ConfigRef`s,
/// short-circuiting any subtree whose registered type can't reach one.
pub fn traverse_refs(registry: &Registry, type_id: TypeId, value: &mut WireValue, ctx: &mut Context, visitor: &mut dyn RefVisitor) -> Result<()> {
	let desc = registry.get(type_id);
	if !desc.contains_config_ref {
		return Ok(());
	}
	walk(registry, desc, value, ctx, visitor)
}

fn walk(registry: &Registry, desc: &TypeDescriptor, value: &mut WireValue, ctx: &mut Context, visitor: &mut dyn RefVisitor) -> Result<()> {
	match (&desc.wire_kind, value) {
		(DescriptorKind::ConfigRef | DescriptorKind::ConfigData, WireValue::Ref(r)) => visitor.visit_ref(registry, desc.id, r),
		(DescriptorKind::Struct | DescriptorKind::Tuple, WireValue::Struct(sv)) => {
			for member in &desc.members {
				let Some(member_type) = member.member_type else { continue };
				let member_desc = registry.get(member_type);
				if !member_desc.contains_config_ref {
					continue;
				}
				if let Some(mv) = sv.members.get_mut(&member.tag_id) {
					ctx.path.push_member(&member.name);
					let result = walk(registry, member_desc, mv, ctx, visitor);
					ctx.path.pop();
					result?;
				}
			}
			Ok(())
		},
		(DescriptorKind::AbstractStruct, whole @ WireValue::Struct(_)) => {
			let type_id = match &*whole {
				WireValue::Struct(sv) => sv.type_id,
				_ => unreachable!(),
			};
			let concrete = registry.get(type_id);
			let name = concrete.name.clone();
			ctx.path.push_derived(&name);
			let result = walk(registry, concrete, whole, ctx, visitor);
			ctx.path.pop();
			result
		},
		(DescriptorKind::ValueCollection, WireValue::ValueCollection(items)) => {
			let element_desc = registry.get(desc.element_type.expect("ValueCollection always has an element type"));
			if !element_desc.contains_config_ref {
				return Ok(());
			}
			for (i, item) in items.iter_mut().enumerate() {
				ctx.path.push_index(i);
				let result = walk(registry, element_desc, item, ctx, visitor);
				ctx.path.pop();
				result?;
			}
			Ok(())
		},
		(DescriptorKind::KeyValueCollection, WireValue::KeyValueCollection(pairs)) => {
			let value_desc = registry.get(desc.element_type.expect("KeyValueCollection always has a value type"));
			if !value_desc.contains_config_ref {
				return Ok(());
			}
			for (i, (_, v)) in pairs.iter_mut().enumerate() {
				ctx.path.push_index(i);
				ctx.path.push_map_value();
				let result = walk(registry, value_desc, v, ctx, visitor);
				ctx.path.pop();
				ctx.path.pop();
				result?;
			}
			Ok(())
		},
		(DescriptorKind::ConfigDataContent, value) => {
			let inner_desc = registry.get(desc.element_type.expect("ConfigDataContent always has an element type"));
			walk(registry, inner_desc, value, ctx, visitor)
		},
		_ => Ok(()),
	}
}
