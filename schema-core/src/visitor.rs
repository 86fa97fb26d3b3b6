//! Dynamic Visitor: a descriptor-driven walk
//! over an already-decoded [`WireValue`] with a begin/end hook for every
//! wire kind, collection element, map key/value, member and derived-class
//! transition. Tools (inspectors, the reference-graph collector) implement
//! [`Visitor`] and get a breadcrumb path for free via [`MemberPath`].

use uuid::Uuid;

use crate::dispatch::{Context, MemberPath};
use crate::registry::{Registry, TypeDescriptor, TypeId};
use crate::value::{RefValue, StructValue, WireValue};

/// Every hook defaults to a no-op; implementations override only the steps
/// they care about.
#[allow(unused_variables)]
pub trait Visitor {
	fn visit_null(&mut self, path: &MemberPath) {}
	fn visit_bool(&mut self, path: &MemberPath, v: bool) {}
	fn visit_int(&mut self, path: &MemberPath, v: i64) {}
	fn visit_uint(&mut self, path: &MemberPath, v: u64) {}
	fn visit_uint128(&mut self, path: &MemberPath, v: u128) {}
	fn visit_f32(&mut self, path: &MemberPath, v: f32) {}
	fn visit_f32_vec2(&mut self, path: &MemberPath, v: [f32; 2]) {}
	fn visit_f32_vec3(&mut self, path: &MemberPath, v: [f32; 3]) {}
	fn visit_f64(&mut self, path: &MemberPath, v: f64) {}
	fn visit_f64_vec2(&mut self, path: &MemberPath, v: [f64; 2]) {}
	fn visit_f64_vec3(&mut self, path: &MemberPath, v: [f64; 3]) {}
	fn visit_float32(&mut self, path: &MemberPath, v: f32) {}
	fn visit_float64(&mut self, path: &MemberPath, v: f64) {}
	fn visit_guid(&mut self, path: &MemberPath, v: Uuid) {}
	fn visit_string(&mut self, path: &MemberPath, v: &str) {}
	fn visit_bytes(&mut self, path: &MemberPath, v: &[u8]) {}
	fn visit_ref(&mut self, path: &MemberPath, v: &RefValue) {}

	fn enter_struct(&mut self, path: &MemberPath, type_name: &str) {}
	fn exit_struct(&mut self, path: &MemberPath) {}
	fn enter_derived(&mut self, path: &MemberPath, type_name: &str) {}
	fn exit_derived(&mut self, path: &MemberPath) {}
	fn enter_member(&mut self, path: &MemberPath, name: &str) {}
	fn exit_member(&mut self, path: &MemberPath) {}
	fn enter_collection(&mut self, path: &MemberPath, len: usize) {}
	fn exit_collection(&mut self, path: &MemberPath) {}
	fn enter_element(&mut self, path: &MemberPath, index: usize) {}
	fn exit_element(&mut self, path: &MemberPath) {}
	fn enter_map(&mut self, path: &MemberPath, len: usize) {}
	fn exit_map(&mut self, path: &MemberPath) {}
	fn enter_map_key(&mut self, path: &MemberPath, index: usize) {}
	fn exit_map_key(&mut self, path: &MemberPath) {}
	fn enter_map_value(&mut self, path: &MemberPath, index: usize) {}
	fn exit_map_value(&mut self, path: &MemberPath) {}
}

/// Walks `value` (already decoded as `type_id`) depth-first, firing
/// `visitor`'s hooks in document order.
pub fn walk(registry: &Registry, type_id: TypeId, value: &WireValue, ctx: &mut Context, visitor: &mut dyn Visitor) {
	let desc = registry.get(type_id);
	walk_value(registry, desc, value, ctx, visitor);
}

fn walk_value(registry: &Registry, desc: &TypeDescriptor, value: &WireValue, ctx: &mut Context, visitor: &mut dyn Visitor) {
	match value {
		WireValue::Null => visitor.visit_null(ctx.path()),
		WireValue::Bool(v) => visitor.visit_bool(ctx.path(), *v),
		WireValue::Int(v) => visitor.visit_int(ctx.path(), *v),
		WireValue::UInt(v) => visitor.visit_uint(ctx.path(), *v),
		WireValue::UInt128(v) => visitor.visit_uint128(ctx.path(), *v),
		WireValue::F32(v) => visitor.visit_f32(ctx.path(), *v),
		WireValue::F32Vec2(v) => visitor.visit_f32_vec2(ctx.path(), *v),
		WireValue::F32Vec3(v) => visitor.visit_f32_vec3(ctx.path(), *v),
		WireValue::F64(v) => visitor.visit_f64(ctx.path(), *v),
		WireValue::F64Vec2(v) => visitor.visit_f64_vec2(ctx.path(), *v),
		WireValue::F64Vec3(v) => visitor.visit_f64_vec3(ctx.path(), *v),
		WireValue::Float32(v) => visitor.visit_float32(ctx.path(), *v),
		WireValue::Float64(v) => visitor.visit_float64(ctx.path(), *v),
		WireValue::Guid(v) => visitor.visit_guid(ctx.path(), *v),
		WireValue::String(v) => visitor.visit_string(ctx.path(), v),
		WireValue::Bytes(v) => visitor.visit_bytes(ctx.path(), v),
		WireValue::Ref(v) => visitor.visit_ref(ctx.path(), v),
		WireValue::Struct(sv) => walk_struct(registry, desc, sv, ctx, visitor),
		WireValue::ValueCollection(items) => {
			let element_desc = registry.get(desc.element_type.expect("ValueCollection always has an element type"));
			visitor.enter_collection(ctx.path(), items.len());
			for (i, item) in items.iter().enumerate() {
				ctx.path.push_index(i);
				visitor.enter_element(ctx.path(), i);
				walk_value(registry, element_desc, item, ctx, visitor);
				visitor.exit_element(ctx.path());
				ctx.path.pop();
			}
			visitor.exit_collection(ctx.path());
		},
		WireValue::KeyValueCollection(pairs) => {
			let key_desc = registry.get(desc.key_type.expect("KeyValueCollection always has a key type"));
			let value_desc = registry.get(desc.element_type.expect("KeyValueCollection always has a value type"));
			visitor.enter_map(ctx.path(), pairs.len());
			for (i, (k, v)) in pairs.iter().enumerate() {
				ctx.path.push_map_keys_index(i);
				visitor.enter_map_key(ctx.path(), i);
				walk_value(registry, key_desc, k, ctx, visitor);
				visitor.exit_map_key(ctx.path());
				ctx.path.pop();
				ctx.path.push_index(i);
				ctx.path.push_map_value();
				visitor.enter_map_value(ctx.path(), i);
				walk_value(registry, value_desc, v, ctx, visitor);
				visitor.exit_map_value(ctx.path());
				ctx.path.pop();
				ctx.path.pop();
			}
			visitor.exit_map(ctx.path());
		},
	}
}

fn walk_struct(registry: &Registry, desc: &TypeDescriptor, sv: &StructValue, ctx: &mut Context, visitor: &mut dyn Visitor) {
	let is_derived = desc.is_abstract_root();
	// `sv.type_id` only carries meaningful information for a polymorphic
	// value (it names the concrete leaf chosen at encode time); for a plain
	// struct the statically-known `desc` already is the real type, and
	// nothing requires a dynamically-built `StructValue` to stamp its own
	// registered id correctly.
	let concrete = if is_derived { registry.get(sv.type_id) } else { desc };
	let name = concrete.name.clone();
	if is_derived {
		ctx.path.push_derived(&name);
		visitor.enter_derived(ctx.path(), &name);
	} else {
		visitor.enter_struct(ctx.path(), &name);
	}
	for member in &concrete.members {
		let Some(mv) = sv.members.get(&member.tag_id) else { continue };
		let Some(member_type) = member.member_type else { continue };
		let member_desc = registry.get(member_type);
		ctx.path.push_member(&member.name);
		visitor.enter_member(ctx.path(), &member.name);
		walk_value(registry, member_desc, mv, ctx, visitor);
		visitor.exit_member(ctx.path());
		ctx.path.pop();
	}
	if is_derived {
		visitor.exit_derived(ctx.path());
		ctx.path.pop();
	} else {
		visitor.exit_struct(ctx.path());
	}
}
