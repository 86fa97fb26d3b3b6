use crate::error::{BoundKind, Error, IntegrityError, Result};
use crate::registry::{DescriptorKind, MemberDescriptor, Registry, TypeDescriptor};
use crate::value::{RefValue, StructValue, WireValue};
use crate::wire::{ByteReader, PrimitiveKind, WireKind};

use super::util::check_len;
use super::Context;

/// Reads a length-prefixed string, bound-checking the declared length against
/// `ctx.max_string_size` before the UTF-8 buffer is allocated.
fn decode_bounded_string(ctx: &Context, reader: &mut ByteReader) -> Result<Option<String>> {
	let Some(len) = reader.read_length()? else { return Ok(None) };
	check_len(ctx, BoundKind::StringLength, ctx.max_string_size, Some(len))?;
	reader.read_string_body(len).map(Some)
}

/// Reads a length-prefixed byte array, bound-checking the declared length
/// against `ctx.max_byte_array_size` before the buffer is allocated.
fn decode_bounded_bytes(ctx: &Context, reader: &mut ByteReader) -> Result<Option<Vec<u8>>> {
	let Some(len) = reader.read_length()? else { return Ok(None) };
	check_len(ctx, BoundKind::ByteArrayLength, ctx.max_byte_array_size, Some(len))?;
	reader.read_bytes_body(len).map(Some)
}

/// Caps eager `Vec::with_capacity` pre-allocation for a collection length
/// read straight off the wire, so a malformed/adversarial length can't force
/// a large allocation before the real bound check has a chance to run.
const PREALLOC_CAP: usize = 4096;

/// Entry point shared by [`super::decode_object`] and nullable-struct/member
/// dispatch: `found` is whatever wire kind byte was just read off the
/// stream; only once it's confirmed to match `desc` do we read a payload.
pub(super) fn decode_found(registry: &Registry, desc: &TypeDescriptor, found: WireKind, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	if found != desc.physical_kind {
		return Err(Error::WireKindMismatch { expected: desc.physical_kind, found, path: ctx.path().clone() });
	}
	decode_payload(registry, desc, ctx, reader)
}

fn decode_payload(registry: &Registry, desc: &TypeDescriptor, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	match desc.wire_kind {
		DescriptorKind::Primitive(p) => decode_primitive_payload(p, reader),
		DescriptorKind::NullablePrimitive(p) => decode_nullable_generic(reader, |r| decode_primitive_payload(p, r)),
		DescriptorKind::Enum { underlying } => decode_primitive_payload(underlying, reader),
		DescriptorKind::NullableEnum { underlying } => decode_nullable_generic(reader, |r| decode_primitive_payload(underlying, r)),
		DescriptorKind::String => Ok(decode_bounded_string(ctx, reader)?.map(WireValue::String).unwrap_or(WireValue::Null)),
		DescriptorKind::Bytes => Ok(decode_bounded_bytes(ctx, reader)?.map(WireValue::Bytes).unwrap_or(WireValue::Null)),
		DescriptorKind::StringId => Ok(decode_bounded_string(ctx, reader)?.map(WireValue::String).unwrap_or(WireValue::Null)),
		DescriptorKind::DynamicEnum => Ok(WireValue::Int(reader.read_varint_i64()?)),
		DescriptorKind::ValueCollection => decode_value_collection(registry, desc, ctx, reader),
		DescriptorKind::KeyValueCollection => decode_key_value_collection(registry, desc, ctx, reader),
		DescriptorKind::Struct | DescriptorKind::Tuple => decode_struct_members(registry, desc, ctx, reader),
		DescriptorKind::NullableStruct => match reader.read_u8()? {
			0 => Ok(WireValue::Null),
			1 => decode_struct_members(registry, desc, ctx, reader),
			other => Err(Error::Integrity(IntegrityError::InvalidPresenceByte(other))),
		},
		DescriptorKind::AbstractStruct => decode_abstract_struct(registry, desc, ctx, reader),
		DescriptorKind::ConfigRef | DescriptorKind::ConfigData => decode_ref(registry, desc, ctx, reader),
		DescriptorKind::ConfigDataContent => {
			let inner_id = desc.element_type.expect("ConfigDataContent always has an element type");
			decode_payload(registry, registry.get(inner_id), ctx, reader)
		},
	}
}

/// Mirrors `encode::encode_wrapped`: nullable framing is read here, one
/// level above the referenced type's own payload decoder.
fn decode_wrapped(registry: &Registry, wire_kind: DescriptorKind, desc: &TypeDescriptor, found: WireKind, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	match wire_kind {
		DescriptorKind::NullablePrimitive(p) => {
			let expected = p.nullable_physical();
			if found != expected {
				return Err(Error::WireKindMismatch { expected, found, path: ctx.path().clone() });
			}
			decode_nullable_generic(reader, |r| decode_primitive_payload(p, r))
		},
		DescriptorKind::NullableEnum { underlying } => {
			let expected = underlying.nullable_physical();
			if found != expected {
				return Err(Error::WireKindMismatch { expected, found, path: ctx.path().clone() });
			}
			decode_nullable_generic(reader, |r| decode_primitive_payload(underlying, r))
		},
		DescriptorKind::NullableStruct => {
			if found != WireKind::NullableStruct {
				return Err(Error::WireKindMismatch { expected: WireKind::NullableStruct, found, path: ctx.path().clone() });
			}
			match reader.read_u8()? {
				0 => Ok(WireValue::Null),
				1 => decode_struct_members(registry, desc, ctx, reader),
				other => Err(Error::Integrity(IntegrityError::InvalidPresenceByte(other))),
			}
		},
		_ => decode_found(registry, desc, found, ctx, reader),
	}
}

fn decode_primitive_payload(p: PrimitiveKind, reader: &mut ByteReader) -> Result<WireValue> {
	Ok(match p {
		PrimitiveKind::Bool => WireValue::Bool(reader.read_uvarint()? != 0),
		PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32 => WireValue::Int(reader.read_varint_i32()? as i64),
		PrimitiveKind::Int64 => WireValue::Int(reader.read_varint_i64()?),
		PrimitiveKind::UInt8 | PrimitiveKind::UInt16 | PrimitiveKind::UInt32 | PrimitiveKind::Char => {
			WireValue::UInt(reader.read_uvarint()? as u64)
		},
		PrimitiveKind::UInt64 => WireValue::UInt(reader.read_uvarint()? as u64),
		PrimitiveKind::UInt128 => WireValue::UInt128(reader.read_uvarint()?),
		PrimitiveKind::F32 => WireValue::F32(reader.read_f32()?),
		PrimitiveKind::F32Vec2 => WireValue::F32Vec2([reader.read_f32()?, reader.read_f32()?]),
		PrimitiveKind::F32Vec3 => WireValue::F32Vec3([reader.read_f32()?, reader.read_f32()?, reader.read_f32()?]),
		PrimitiveKind::F64 => WireValue::F64(reader.read_f64()?),
		PrimitiveKind::F64Vec2 => WireValue::F64Vec2([reader.read_f64()?, reader.read_f64()?]),
		PrimitiveKind::F64Vec3 => WireValue::F64Vec3([reader.read_f64()?, reader.read_f64()?, reader.read_f64()?]),
		PrimitiveKind::Float32 => WireValue::Float32(reader.read_f32()?),
		PrimitiveKind::Float64 => WireValue::Float64(reader.read_f64()?),
		PrimitiveKind::MetaGuid => WireValue::Guid(reader.read_guid()?),
	})
}

fn decode_nullable_generic(reader: &mut ByteReader, f: impl FnOnce(&mut ByteReader) -> Result<WireValue>) -> Result<WireValue> {
	match reader.read_u8()? {
		0 => Ok(WireValue::Null),
		2 => f(reader),
		other => Err(Error::Integrity(IntegrityError::InvalidPresenceByte(other))),
	}
}

/// Decodes a value purely from its wire kind byte, with no declared type to
/// guide it. Used only on the converter fallback path, where the declared
/// member type differs from what's actually on the wire. Unsigned by default
/// for the `VarInt` family
/// since that's what every built-in unsigned/char/bool shape writes; a
/// converter that needs the original sign back reinterprets the raw bits
/// itself.
fn decode_generic(ctx: &Context, kind: WireKind, reader: &mut ByteReader) -> Result<WireValue> {
	Ok(match kind {
		WireKind::Null => WireValue::Null,
		WireKind::VarInt => WireValue::UInt(reader.read_uvarint()? as u64),
		WireKind::VarInt128 => WireValue::UInt128(reader.read_uvarint()?),
		WireKind::F32 => WireValue::F32(reader.read_f32()?),
		WireKind::F32Vec2 => WireValue::F32Vec2([reader.read_f32()?, reader.read_f32()?]),
		WireKind::F32Vec3 => WireValue::F32Vec3([reader.read_f32()?, reader.read_f32()?, reader.read_f32()?]),
		WireKind::F64 => WireValue::F64(reader.read_f64()?),
		WireKind::F64Vec2 => WireValue::F64Vec2([reader.read_f64()?, reader.read_f64()?]),
		WireKind::F64Vec3 => WireValue::F64Vec3([reader.read_f64()?, reader.read_f64()?, reader.read_f64()?]),
		WireKind::Float32 => WireValue::Float32(reader.read_f32()?),
		WireKind::Float64 => WireValue::Float64(reader.read_f64()?),
		WireKind::String => decode_bounded_string(ctx, reader)?.map(WireValue::String).unwrap_or(WireValue::Null),
		WireKind::Bytes => decode_bounded_bytes(ctx, reader)?.map(WireValue::Bytes).unwrap_or(WireValue::Null),
		WireKind::MetaGuid => WireValue::Guid(reader.read_guid()?),
		WireKind::NullableVarInt => decode_nullable_generic(reader, |r| Ok(WireValue::UInt(r.read_uvarint()? as u64)))?,
		WireKind::NullableVarInt128 => decode_nullable_generic(reader, |r| Ok(WireValue::UInt128(r.read_uvarint()?)))?,
		WireKind::NullableF32 => decode_nullable_generic(reader, |r| Ok(WireValue::F32(r.read_f32()?)))?,
		WireKind::NullableF32Vec2 => decode_nullable_generic(reader, |r| Ok(WireValue::F32Vec2([r.read_f32()?, r.read_f32()?])))?,
		WireKind::NullableF32Vec3 => {
			decode_nullable_generic(reader, |r| Ok(WireValue::F32Vec3([r.read_f32()?, r.read_f32()?, r.read_f32()?])))?
		},
		WireKind::NullableF64 => decode_nullable_generic(reader, |r| Ok(WireValue::F64(r.read_f64()?)))?,
		WireKind::NullableF64Vec2 => decode_nullable_generic(reader, |r| Ok(WireValue::F64Vec2([r.read_f64()?, r.read_f64()?])))?,
		WireKind::NullableF64Vec3 => {
			decode_nullable_generic(reader, |r| Ok(WireValue::F64Vec3([r.read_f64()?, r.read_f64()?, r.read_f64()?])))?
		},
		WireKind::NullableFloat32 => decode_nullable_generic(reader, |r| Ok(WireValue::Float32(r.read_f32()?)))?,
		WireKind::NullableFloat64 => decode_nullable_generic(reader, |r| Ok(WireValue::Float64(r.read_f64()?)))?,
		WireKind::NullableMetaGuid => decode_nullable_generic(reader, |r| Ok(WireValue::Guid(r.read_guid()?)))?,
		other => return Err(Error::Integrity(IntegrityError::InvalidTypeCode(other.to_byte() as i32))),
	})
}

fn decode_value_collection(registry: &Registry, desc: &TypeDescriptor, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	let element_id = desc.element_type.expect("ValueCollection always has an element type");
	let element_desc = registry.get(element_id);
	let Some(len) = reader.read_length()? else {
		reader.read_wire_kind()?;
		return Ok(WireValue::Null);
	};
	if len > ctx.max_collection_size {
		return Err(Error::BoundExceeded { bound: BoundKind::CollectionSize, limit: ctx.max_collection_size, actual: len, path: ctx.path().clone() });
	}
	let element_kind = reader.read_wire_kind()?;
	let mut items = Vec::with_capacity(len.min(PREALLOC_CAP));
	for i in 0..len {
		ctx.path.push_index(i);
		let item = decode_found(registry, element_desc, element_kind, ctx, reader);
		ctx.path.pop();
		items.push(item?);
	}
	Ok(WireValue::ValueCollection(items))
}

fn decode_key_value_collection(registry: &Registry, desc: &TypeDescriptor, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	let key_id = desc.key_type.expect("KeyValueCollection always has a key type");
	let value_id = desc.element_type.expect("KeyValueCollection always has a value type");
	let key_desc = registry.get(key_id);
	let value_desc = registry.get(value_id);
	let Some(len) = reader.read_length()? else {
		reader.read_wire_kind()?;
		reader.read_wire_kind()?;
		return Ok(WireValue::Null);
	};
	if len > ctx.max_collection_size {
		return Err(Error::BoundExceeded { bound: BoundKind::CollectionSize, limit: ctx.max_collection_size, actual: len, path: ctx.path().clone() });
	}
	let key_kind = reader.read_wire_kind()?;
	let value_kind = reader.read_wire_kind()?;
	let mut pairs = Vec::with_capacity(len.min(PREALLOC_CAP));
	for i in 0..len {
		ctx.path.push_map_keys_index(i);
		let key = decode_found(registry, key_desc, key_kind, ctx, reader);
		ctx.path.pop();
		let key = key?;
		ctx.path.push_index(i);
		ctx.path.push_map_value();
		let value = decode_found(registry, value_desc, value_kind, ctx, reader);
		ctx.path.pop();
		ctx.path.pop();
		pairs.push((key, value?));
	}
	Ok(WireValue::KeyValueCollection(pairs))
}

pub(super) fn decode_struct_members(registry: &Registry, desc: &TypeDescriptor, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	let mut sv = StructValue::new(desc.id);
	loop {
		let found = reader.read_wire_kind()?;
		if found == WireKind::EndStruct {
			break;
		}
		let tag_id = reader.read_varint_i32()?;
		if tag_id <= 0 {
			return Err(Error::Integrity(IntegrityError::NonPositiveTagId(tag_id)));
		}
		match desc.member_by_tag(tag_id) {
			Some(member) => {
				let value = decode_member_value(registry, &desc.name, member, found, ctx, reader)?;
				sv.members.insert(tag_id, value);
			},
			None => skip_value(found, reader)?,
		}
	}
	for hook in &desc.on_deserialized_hooks {
		hook(&mut sv);
	}
	Ok(WireValue::Struct(sv))
}

fn decode_member_value(
	registry: &Registry,
	containing_name: &str,
	member: &MemberDescriptor,
	found: WireKind,
	ctx: &mut Context,
	reader: &mut ByteReader,
) -> Result<WireValue> {
	let member_type = member.member_type.expect("every resolved member has a registered value type");
	let member_desc = registry.get(member_type);
	ctx.path.push_member(&member.name);
	let saved_bound = ctx.max_collection_size;
	if let Some(max) = member.max_collection_size {
		ctx.max_collection_size = max;
	}
	let mut outcome = decode_wrapped(registry, member.wire_kind, member_desc, found, ctx, reader);
	if let Err(Error::WireKindMismatch { found: mismatched, .. }) = &outcome {
		let mismatched = *mismatched;
		if let Some((_, convert)) = member.converters.iter().find(|(k, _)| *k == mismatched) {
			outcome = decode_generic(ctx, mismatched, reader).and_then(|raw| {
				convert(raw).map_err(|e| match e {
					Error::Converter { reason, .. } => Error::Converter { from: mismatched, to: member_desc.name.clone(), reason },
					other => other,
				})
			});
		}
	}
	ctx.max_collection_size = saved_bound;
	ctx.path.pop();
	match outcome {
		Ok(v) => Ok(v),
		Err(e) => match member.substitute {
			Some(substitute) => {
				// A `WireKindMismatch` is always raised before any payload byte
				// is consumed (see `decode_found`/`decode_wrapped`); the stream
				// still has the whole mismatched value sitting where this
				// member's payload was expected. Skip it by its actual wire
				// kind so the reader stays aligned for whatever comes next,
				// same as an unrecognized tag id would be.
				if let Error::WireKindMismatch { found: mismatched, .. } = &e {
					skip_value(*mismatched, reader)?;
				}
				Ok(substitute(&e))
			},
			None => Err(Error::MemberDeserialization {
				type_name: containing_name.into(),
				member: member.name.clone(),
				tag_id: member.tag_id,
				source: Box::new(e),
			}),
		},
	}
}

fn decode_abstract_struct(registry: &Registry, desc: &TypeDescriptor, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	let type_code = reader.read_varint_i32()?;
	if type_code == 0 {
		return Ok(WireValue::Null);
	}
	let concrete = registry
		.resolve_derived(desc.id, type_code)
		.ok_or_else(|| Error::UnknownDerivedType { root: desc.name.clone(), type_code })?;
	ctx.path.push_derived(&concrete.name);
	let result = decode_struct_members(registry, concrete, ctx, reader);
	ctx.path.pop();
	result
}

fn decode_ref(registry: &Registry, desc: &TypeDescriptor, ctx: &mut Context, reader: &mut ByteReader) -> Result<WireValue> {
	let key_id = desc.key_type.expect("ConfigRef/ConfigData always has a key type");
	let key_desc = registry.get(key_id);
	// The outer dispatch already consumed the wire kind byte for this member
	// (a ConfigRef/ConfigData serializes as its key type, with nothing on the
	// wire to distinguish it), so only the key's own body remains to read.
	let key_value = decode_payload(registry, key_desc, ctx, reader)?;
	let is_null = match &desc.null_sentinel_key {
		Some(sentinel) => &key_value == sentinel,
		None => key_value.is_null(),
	};
	if is_null {
		return Ok(WireValue::Ref(RefValue::unresolved(WireValue::Null)));
	}
	let resolved = ctx.resolver.and_then(|r| r.resolve(desc.id, &key_value));
	Ok(WireValue::Ref(RefValue { key: Box::new(key_value), resolved: resolved.map(Box::new) }))
}

/// Discards one value of `kind` without knowing its declared type — how an
/// unrecognized member tag is skipped to stay forward/backward compatible.
/// Every wire kind is self-delimiting: strings/bytes carry
/// their own length, collections carry an element kind plus length, and
/// struct bodies always end with `EndStruct`.
fn skip_value(kind: WireKind, reader: &mut ByteReader) -> Result<()> {
	match kind {
		WireKind::Null => {},
		WireKind::VarInt | WireKind::VarInt128 => {
			reader.read_uvarint()?;
		},
		WireKind::F32 | WireKind::Float32 => {
			reader.read_f32()?;
		},
		WireKind::F32Vec2 => {
			reader.read_f32()?;
			reader.read_f32()?;
		},
		WireKind::F32Vec3 => {
			reader.read_f32()?;
			reader.read_f32()?;
			reader.read_f32()?;
		},
		WireKind::F64 | WireKind::Float64 => {
			reader.read_f64()?;
		},
		WireKind::F64Vec2 => {
			reader.read_f64()?;
			reader.read_f64()?;
		},
		WireKind::F64Vec3 => {
			reader.read_f64()?;
			reader.read_f64()?;
			reader.read_f64()?;
		},
		WireKind::MetaGuid => {
			reader.read_guid()?;
		},
		WireKind::String => {
			reader.read_string()?;
		},
		WireKind::Bytes => {
			reader.read_bytes()?;
		},
		WireKind::NullableVarInt | WireKind::NullableVarInt128 => skip_nullable(reader, |r| {
			r.read_uvarint()?;
			Ok(())
		})?,
		WireKind::NullableF32 | WireKind::NullableFloat32 => skip_nullable(reader, |r| {
			r.read_f32()?;
			Ok(())
		})?,
		WireKind::NullableF32Vec2 => skip_nullable(reader, |r| {
			r.read_f32()?;
			r.read_f32()?;
			Ok(())
		})?,
		WireKind::NullableF32Vec3 => skip_nullable(reader, |r| {
			r.read_f32()?;
			r.read_f32()?;
			r.read_f32()?;
			Ok(())
		})?,
		WireKind::NullableF64 | WireKind::NullableFloat64 => skip_nullable(reader, |r| {
			r.read_f64()?;
			Ok(())
		})?,
		WireKind::NullableF64Vec2 => skip_nullable(reader, |r| {
			r.read_f64()?;
			r.read_f64()?;
			Ok(())
		})?,
		WireKind::NullableF64Vec3 => skip_nullable(reader, |r| {
			r.read_f64()?;
			r.read_f64()?;
			r.read_f64()?;
			Ok(())
		})?,
		WireKind::NullableMetaGuid => skip_nullable(reader, |r| {
			r.read_guid()?;
			Ok(())
		})?,
		WireKind::AbstractStruct => {
			let type_code = reader.read_varint_i32()?;
			if type_code != 0 {
				skip_struct_body(reader)?;
			}
		},
		WireKind::NullableStruct => {
			if reader.read_u8()? == 1 {
				skip_struct_body(reader)?;
			}
		},
		WireKind::Struct => skip_struct_body(reader)?,
		WireKind::ValueCollection => {
			if let Some(len) = reader.read_length()? {
				let element_kind = reader.read_wire_kind()?;
				for _ in 0..len {
					skip_value(element_kind, reader)?;
				}
			} else {
				reader.read_wire_kind()?;
			}
		},
		WireKind::KeyValueCollection => {
			if let Some(len) = reader.read_length()? {
				let key_kind = reader.read_wire_kind()?;
				let value_kind = reader.read_wire_kind()?;
				for _ in 0..len {
					skip_value(key_kind, reader)?;
					skip_value(value_kind, reader)?;
				}
			} else {
				reader.read_wire_kind()?;
				reader.read_wire_kind()?;
			}
		},
		WireKind::EndStruct | WireKind::ObjectTable | WireKind::Invalid => {
			return Err(Error::Integrity(IntegrityError::InvalidTypeCode(kind.to_byte() as i32)));
		},
	}
	Ok(())
}

fn skip_nullable(reader: &mut ByteReader, f: impl FnOnce(&mut ByteReader) -> Result<()>) -> Result<()> {
	match reader.read_u8()? {
		0 => Ok(()),
		2 => f(reader),
		other => Err(Error::Integrity(IntegrityError::InvalidPresenceByte(other))),
	}
}

fn skip_struct_body(reader: &mut ByteReader) -> Result<()> {
	loop {
		let kind = reader.read_wire_kind()?;
		if kind == WireKind::EndStruct {
			break;
		}
		reader.read_varint_i32()?;
		skip_value(kind, reader)?;
	}
	Ok(())
}
