use crate::error::{BoundKind, Error, Result};
use crate::registry::{DescriptorKind, MemberDescriptor, Registry, TypeDescriptor};
use crate::value::WireValue;
use crate::wire::{ByteWriter, PrimitiveKind, WireKind};

use super::util::{check_len, kind_error};
use super::{blocks, Context};

/// Writes the bare payload for a value of `desc`'s own shape: no leading
/// wire kind byte. Nullable wrapping is a property of the *member* that
/// references a type, not of the type itself, so it's handled one level up
/// in [`encode_wrapped`].
pub(super) fn encode_body(registry: &Registry, desc: &TypeDescriptor, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	match desc.wire_kind {
		DescriptorKind::Primitive(p) => encode_primitive(p, value, ctx, writer),
		DescriptorKind::NullablePrimitive(p) => encode_nullable_primitive(p, value, writer),
		DescriptorKind::Enum { underlying } => encode_primitive(underlying, value, ctx, writer),
		DescriptorKind::NullableEnum { underlying } => encode_nullable_primitive(underlying, value, writer),
		DescriptorKind::String => encode_string(desc, value, ctx, writer),
		DescriptorKind::Bytes => encode_bytes(desc, value, ctx, writer),
		DescriptorKind::StringId => match value {
			WireValue::String(s) => {
				writer.write_string(Some(s));
				Ok(())
			},
			other => Err(kind_error(ctx, WireKind::String, other)),
		},
		DescriptorKind::DynamicEnum => match value {
			WireValue::Int(v) => {
				writer.write_varint_i64(*v);
				Ok(())
			},
			WireValue::UInt(v) => {
				writer.write_varint_i64(*v as i64);
				Ok(())
			},
			other => Err(kind_error(ctx, WireKind::VarInt, other)),
		},
		DescriptorKind::ValueCollection => encode_value_collection(registry, desc, value, ctx, writer),
		DescriptorKind::KeyValueCollection => encode_key_value_collection(registry, desc, value, ctx, writer),
		DescriptorKind::Struct | DescriptorKind::Tuple => encode_struct_members(registry, desc, value, ctx, writer),
		DescriptorKind::NullableStruct => {
			// Only reachable for a type directly registered as NullableStruct
			// (there is none: see `encode_wrapped`), kept for exhaustiveness.
			if value.is_null() {
				writer.write_u8(0);
				return Ok(());
			}
			writer.write_u8(1);
			encode_struct_members(registry, desc, value, ctx, writer)
		},
		DescriptorKind::AbstractStruct => encode_abstract_struct(registry, desc, value, ctx, writer),
		DescriptorKind::ConfigRef | DescriptorKind::ConfigData => encode_ref(registry, desc, value, ctx, writer),
		DescriptorKind::ConfigDataContent => {
			let inner_id = desc.element_type.expect("ConfigDataContent always has an element type");
			encode_body(registry, registry.get(inner_id), value, ctx, writer)
		},
	}
}

/// Writes one member: its wire kind byte, its tag id, then its payload —
/// wrapped in nullable framing when the member's wire kind calls for it.
fn encode_member(registry: &Registry, member: &MemberDescriptor, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	let member_type = member.member_type.expect("every resolved member has a registered value type");
	let member_desc = registry.get(member_type);
	writer.write_wire_kind(member.physical_kind);
	writer.write_varint_i32(member.tag_id);
	ctx.path.push_member(&member.name);
	let saved_bound = ctx.max_collection_size;
	if let Some(max) = member.max_collection_size {
		ctx.max_collection_size = max;
	}
	let result = encode_wrapped(registry, member.wire_kind, member_desc, value, ctx, writer);
	ctx.max_collection_size = saved_bound;
	ctx.path.pop();
	result
}

fn encode_wrapped(registry: &Registry, wire_kind: DescriptorKind, desc: &TypeDescriptor, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	match wire_kind {
		DescriptorKind::NullablePrimitive(p) => encode_nullable_primitive(p, value, writer),
		DescriptorKind::NullableEnum { underlying } => encode_nullable_primitive(underlying, value, writer),
		DescriptorKind::NullableStruct => {
			if value.is_null() {
				writer.write_u8(0);
				return Ok(());
			}
			writer.write_u8(1);
			encode_struct_members(registry, desc, value, ctx, writer)
		},
		_ => encode_body(registry, desc, value, ctx, writer),
	}
}

fn encode_primitive(p: PrimitiveKind, value: &WireValue, ctx: &Context, writer: &mut ByteWriter) -> Result<()> {
	match (p, value) {
		(PrimitiveKind::Bool, WireValue::Bool(b)) => writer.write_uvarint(*b as u128),
		(PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32, WireValue::Int(v)) => writer.write_varint_i32(*v as i32),
		(PrimitiveKind::Int64, WireValue::Int(v)) => writer.write_varint_i64(*v),
		(PrimitiveKind::UInt8 | PrimitiveKind::UInt16 | PrimitiveKind::UInt32 | PrimitiveKind::Char, WireValue::UInt(v)) => {
			writer.write_uvarint(*v as u128)
		},
		(PrimitiveKind::UInt64, WireValue::UInt(v)) => writer.write_uvarint(*v as u128),
		(PrimitiveKind::UInt128, WireValue::UInt128(v)) => writer.write_uvarint(*v),
		(PrimitiveKind::F32, WireValue::F32(v)) => writer.write_f32(*v),
		(PrimitiveKind::Float32, WireValue::Float32(v)) => writer.write_f32(*v),
		(PrimitiveKind::F64, WireValue::F64(v)) => writer.write_f64(*v),
		(PrimitiveKind::Float64, WireValue::Float64(v)) => writer.write_f64(*v),
		(PrimitiveKind::F32Vec2, WireValue::F32Vec2([a, b])) => {
			writer.write_f32(*a);
			writer.write_f32(*b);
		},
		(PrimitiveKind::F32Vec3, WireValue::F32Vec3([a, b, c])) => {
			writer.write_f32(*a);
			writer.write_f32(*b);
			writer.write_f32(*c);
		},
		(PrimitiveKind::F64Vec2, WireValue::F64Vec2([a, b])) => {
			writer.write_f64(*a);
			writer.write_f64(*b);
		},
		(PrimitiveKind::F64Vec3, WireValue::F64Vec3([a, b, c])) => {
			writer.write_f64(*a);
			writer.write_f64(*b);
			writer.write_f64(*c);
		},
		(PrimitiveKind::MetaGuid, WireValue::Guid(g)) => writer.write_guid(*g),
		(expected, other) => return Err(kind_error(ctx, expected.physical(), other)),
	}
	Ok(())
}

fn encode_nullable_primitive(p: PrimitiveKind, value: &WireValue, writer: &mut ByteWriter) -> Result<()> {
	if value.is_null() {
		writer.write_u8(0);
		return Ok(());
	}
	writer.write_u8(2);
	encode_primitive(p, value, &Context::new(), writer)
}

fn encode_string(desc: &TypeDescriptor, value: &WireValue, ctx: &Context, writer: &mut ByteWriter) -> Result<()> {
	let s = match value {
		WireValue::Null => None,
		WireValue::String(s) => Some(s.as_str()),
		other => return Err(kind_error(ctx, desc.physical_kind, other)),
	};
	check_len(ctx, BoundKind::StringLength, ctx.max_string_size, s.map(str::len))?;
	writer.write_string(s);
	Ok(())
}

fn encode_bytes(desc: &TypeDescriptor, value: &WireValue, ctx: &Context, writer: &mut ByteWriter) -> Result<()> {
	let b = match value {
		WireValue::Null => None,
		WireValue::Bytes(b) => Some(b.as_slice()),
		other => return Err(kind_error(ctx, desc.physical_kind, other)),
	};
	check_len(ctx, BoundKind::ByteArrayLength, ctx.max_byte_array_size, b.map(<[u8]>::len))?;
	writer.write_bytes(b);
	Ok(())
}

fn encode_value_collection(registry: &Registry, desc: &TypeDescriptor, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	let element_id = desc.element_type.expect("ValueCollection always has an element type");
	let element_desc = registry.get(element_id);
	match value {
		WireValue::Null => {
			writer.write_length(None);
			writer.write_wire_kind(element_desc.physical_kind);
			Ok(())
		},
		WireValue::ValueCollection(items) => {
			check_len(ctx, BoundKind::CollectionSize, ctx.max_collection_size, Some(items.len()))?;
			writer.write_length(Some(items.len()));
			writer.write_wire_kind(element_desc.physical_kind);
			for (i, item) in items.iter().enumerate() {
				ctx.path.push_index(i);
				let result = encode_body(registry, element_desc, item, ctx, writer);
				ctx.path.pop();
				result?;
			}
			Ok(())
		},
		other => Err(kind_error(ctx, desc.physical_kind, other)),
	}
}

fn encode_key_value_collection(registry: &Registry, desc: &TypeDescriptor, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	let key_id = desc.key_type.expect("KeyValueCollection always has a key type");
	let value_id = desc.element_type.expect("KeyValueCollection always has a value type");
	let key_desc = registry.get(key_id);
	let value_desc = registry.get(value_id);
	match value {
		WireValue::Null => {
			writer.write_length(None);
			writer.write_wire_kind(key_desc.physical_kind);
			writer.write_wire_kind(value_desc.physical_kind);
			Ok(())
		},
		WireValue::KeyValueCollection(pairs) => {
			check_len(ctx, BoundKind::CollectionSize, ctx.max_collection_size, Some(pairs.len()))?;
			writer.write_length(Some(pairs.len()));
			writer.write_wire_kind(key_desc.physical_kind);
			writer.write_wire_kind(value_desc.physical_kind);
			for (i, (k, v)) in pairs.iter().enumerate() {
				ctx.path.push_map_keys_index(i);
				let kr = encode_body(registry, key_desc, k, ctx, writer);
				ctx.path.pop();
				kr?;
				ctx.path.push_index(i);
				ctx.path.push_map_value();
				let vr = encode_body(registry, value_desc, v, ctx, writer);
				ctx.path.pop();
				ctx.path.pop();
				vr?;
			}
			Ok(())
		},
		other => Err(kind_error(ctx, desc.physical_kind, other)),
	}
}

pub(super) fn encode_struct_members(registry: &Registry, desc: &TypeDescriptor, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	let sv = match value {
		WireValue::Struct(s) => s,
		other => return Err(kind_error(ctx, desc.physical_kind, other)),
	};
	let budget: usize = blocks::plan(&desc.members).into_iter().sum();
	if budget > 0 {
		writer.reserve(budget);
	}
	for member in &desc.members {
		if member.flags.intersects(ctx.exclude_flags) {
			continue;
		}
		if !member.active_at(ctx.logic_version) {
			continue;
		}
		let Some(mv) = sv.members.get(&member.tag_id) else { continue };
		encode_member(registry, member, mv, ctx, writer)?;
	}
	writer.write_wire_kind(WireKind::EndStruct);
	Ok(())
}

fn encode_abstract_struct(registry: &Registry, desc: &TypeDescriptor, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	if value.is_null() {
		writer.write_varint_i32(0);
		return Ok(());
	}
	let sv = match value {
		WireValue::Struct(s) => s,
		other => return Err(kind_error(ctx, desc.physical_kind, other)),
	};
	let concrete = registry.get(sv.type_id);
	let type_code = concrete
		.type_code
		.ok_or_else(|| Error::UnknownDerivedType { root: desc.name.clone(), type_code: 0 })?;
	writer.write_varint_i32(type_code);
	ctx.path.push_derived(&concrete.name);
	let result = encode_struct_members(registry, concrete, value, ctx, writer);
	ctx.path.pop();
	result
}

fn encode_ref(registry: &Registry, desc: &TypeDescriptor, value: &WireValue, ctx: &mut Context, writer: &mut ByteWriter) -> Result<()> {
	let key_id = desc.key_type.expect("ConfigRef/ConfigData always has a key type");
	let key_desc = registry.get(key_id);
	let key_value = match value {
		WireValue::Ref(r) if r.is_null() => desc.null_sentinel_key.clone().unwrap_or(WireValue::Null),
		WireValue::Ref(r) => (*r.key).clone(),
		WireValue::Null => desc.null_sentinel_key.clone().unwrap_or(WireValue::Null),
		other => return Err(kind_error(ctx, desc.physical_kind, other)),
	};
	encode_body(registry, key_desc, &key_value, ctx, writer)
}
