//! End-to-end scenarios covering wire encoding, polymorphism, schema
//! validation and error handling, each implemented directly as a test.
//!
//! Expected wire bytes are computed by a small LEB128/zig-zag helper
//! re-implemented here (not by calling back into `schema_core::wire`), so a
//! regression in the codec's own varint math would actually be caught
//! instead of the test trivially agreeing with itself.

use schema_core::dispatch::{decode_object, encode_object, Context};
use schema_core::error::{BoundKind, Error};
use schema_core::registry::{DescriptorKind, MemberFlags};
use schema_core::scanner::{MemberSpec, RecordRole, RecordSpec, Scanner, TypeSpec};
use schema_core::value::{StructValue, WireValue};
use schema_core::wire::{ByteReader, ByteWriter, WireKind};

fn zigzag32(v: i32) -> u32 {
	((v << 1) ^ (v >> 31)) as u32
}

fn zigzag64(v: i64) -> u64 {
	((v << 1) ^ (v >> 63)) as u64
}

fn leb128(mut value: u128) -> Vec<u8> {
	let mut out = Vec::new();
	loop {
		let byte = (value & 0x7F) as u8;
		value >>= 7;
		if value == 0 {
			out.push(byte);
			break;
		}
		out.push(byte | 0x80);
	}
	out
}

/// Scenario 1: `int32 = -1234567` encodes as `{VarInt, zigzag(-1234567)}` and
/// decodes back to the same value.
#[test]
fn scenario_primitive_round_trip() {
	let registry = Scanner::build(Vec::new(), &[]).expect("builtins always build");
	let i32_type = registry.by_name("i32").expect("i32 is a seeded builtin").id;

	let mut writer = ByteWriter::new();
	let mut ctx = Context::new();
	encode_object(&registry, i32_type, &WireValue::Int(-1234567), &mut ctx, &mut writer).expect("encodes");
	let bytes = writer.into_bytes();

	let mut expected = vec![WireKind::VarInt.to_byte()];
	expected.extend(leb128(zigzag32(-1234567) as u128));
	assert_eq!(bytes, expected);

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, i32_type, &mut ctx, &mut reader).expect("decodes");
	assert_eq!(decoded, WireValue::Int(-1234567));
}

fn build_polymorphic_registry() -> (schema_core::registry::Registry, schema_core::registry::TypeId, schema_core::registry::TypeId) {
	let a = RecordSpec::new("A").with_role(RecordRole::AbstractRoot);
	let value_member = MemberSpec {
		name: "value".into(),
		tag_id: 1,
		hidden: false,
		exclude_from_game_state: false,
		descriptor_kind: DescriptorKind::Primitive(schema_core::wire::PrimitiveKind::Int32),
		element_type: "i32".into(),
		key_type: None,
		version_window: None,
		max_collection_size: None,
		substitute: None,
		converters: Vec::new(),
	};
	let b = RecordSpec::new("B").derives_from("A", 3);
	let b = RecordSpec { members: vec![value_member], ..b };
	let registry = Scanner::build(vec![TypeSpec::Record(a), TypeSpec::Record(b)], &["A", "B"]).expect("registry builds");
	let a_id = registry.by_name("A").expect("A is registered").id;
	let b_id = registry.by_name("B").expect("B is registered").id;
	(registry, a_id, b_id)
}

/// Scenario 2: encoding `(Abstract A) null` writes `{AbstractStruct, 0}` and
/// decodes back to null.
#[test]
fn scenario_null_in_abstract_root() {
	let (registry, a_id, _b_id) = build_polymorphic_registry();

	let mut writer = ByteWriter::new();
	let mut ctx = Context::new();
	encode_object(&registry, a_id, &WireValue::Null, &mut ctx, &mut writer).expect("encodes");
	let bytes = writer.into_bytes();
	assert_eq!(bytes, vec![WireKind::AbstractStruct.to_byte(), 0]);

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, a_id, &mut ctx, &mut reader).expect("decodes");
	assert_eq!(decoded, WireValue::Null);
}

/// Scenario 3: `B{7}` encoded as `A` writes
/// `{AbstractStruct, 3, VarInt, 1, 7, EndStruct}` and decodes to a `B` with
/// field `7`.
#[test]
fn scenario_polymorphic_struct() {
	let (registry, a_id, b_id) = build_polymorphic_registry();

	let mut members = std::collections::BTreeMap::new();
	members.insert(1, WireValue::Int(7));
	let value = WireValue::Struct(StructValue { type_id: b_id, members });

	let mut writer = ByteWriter::new();
	let mut ctx = Context::new();
	encode_object(&registry, a_id, &value, &mut ctx, &mut writer).expect("encodes");
	let bytes = writer.into_bytes();

	let mut expected = vec![WireKind::AbstractStruct.to_byte()];
	expected.extend(leb128(zigzag32(3) as u128)); // type-code varint
	expected.push(WireKind::VarInt.to_byte());
	expected.extend(leb128(zigzag32(1) as u128)); // tag-id varint
	expected.extend(leb128(zigzag32(7) as u128)); // member payload
	expected.push(WireKind::EndStruct.to_byte());
	assert_eq!(bytes, expected);

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, a_id, &mut ctx, &mut reader).expect("decodes");
	let WireValue::Struct(sv) = &decoded else { panic!("expected a struct value") };
	assert_eq!(sv.type_id, b_id);
	assert_eq!(sv.members.get(&1), Some(&WireValue::Int(7)));
}

fn build_map_registry() -> (schema_core::registry::Registry, schema_core::registry::TypeId) {
	let specs = vec![TypeSpec::KeyValueCollection { name: "HashMap<String, i32>".into(), key: "String".into(), value: "i32".into(), max_size: None }];
	let registry = Scanner::build(specs, &[]).expect("registry builds");
	let map_id = registry.by_name("HashMap<String, i32>").expect("map type is registered").id;
	(registry, map_id)
}

/// Scenario 4: `map{"a"→1, "b"→2}` against `max_collection_size=10` encodes
/// as `{KeyValueCollection, 2, String, VarInt, "a", 1, "b", 2}`; against
/// `max_collection_size=1` it raises `BoundExceeded`.
#[test]
fn scenario_map_with_max() {
	let (registry, map_id) = build_map_registry();
	let value = WireValue::KeyValueCollection(vec![
		(WireValue::String("a".into()), WireValue::Int(1)),
		(WireValue::String("b".into()), WireValue::Int(2)),
	]);

	let mut writer = ByteWriter::new();
	let mut ctx = Context::new().with_max_collection_size(10);
	encode_object(&registry, map_id, &value, &mut ctx, &mut writer).expect("fits under the bound");
	let bytes = writer.into_bytes();

	let mut expected = vec![WireKind::KeyValueCollection.to_byte()];
	expected.extend(leb128(zigzag64(2) as u128)); // length, zig-zagged like every other varint
	expected.push(WireKind::String.to_byte());
	expected.push(WireKind::VarInt.to_byte());
	expected.extend(leb128(zigzag64(1) as u128)); // "a".len()
	expected.extend(b"a");
	expected.extend(leb128(zigzag32(1) as u128));
	expected.extend(leb128(zigzag64(1) as u128)); // "b".len()
	expected.extend(b"b");
	expected.extend(leb128(zigzag32(2) as u128));
	assert_eq!(bytes, expected);

	let mut writer = ByteWriter::new();
	let mut ctx = Context::new().with_max_collection_size(1);
	let err = encode_object(&registry, map_id, &value, &mut ctx, &mut writer).unwrap_err();
	assert!(matches!(err, Error::BoundExceeded { bound: BoundKind::CollectionSize, limit: 1, actual: 2, .. }));
}

fn placeholder_p(_: &Error) -> WireValue {
	WireValue::Struct(StructValue::new(schema_core::registry::TypeId::placeholder()))
}

/// Scenario 5: a member tagged 2 of struct type `P` with a declared
/// substitute. Injecting `{memberKind=VarInt, tag=2, 42}` where `P` expects
/// `Struct` makes the decoder catch the wire-kind mismatch, skip the
/// mismatched payload, and install the substitute in its place.
#[test]
fn scenario_substitute_on_bad_payload() {
	let p = RecordSpec::new("P");
	let member = MemberSpec {
		name: "p".into(),
		tag_id: 2,
		hidden: false,
		exclude_from_game_state: false,
		descriptor_kind: DescriptorKind::Struct,
		element_type: "P".into(),
		key_type: None,
		version_window: None,
		max_collection_size: None,
		substitute: Some(placeholder_p),
		converters: Vec::new(),
	};
	let container = RecordSpec { members: vec![member], ..RecordSpec::new("Container") };
	let registry = Scanner::build(vec![TypeSpec::Record(p), TypeSpec::Record(container)], &[]).expect("registry builds");
	let container_id = registry.by_name("Container").expect("Container is registered").id;

	// Hand-craft a stream where the wire says the member is a VarInt(42)
	// instead of the Struct `P` expects.
	let mut writer = ByteWriter::new();
	writer.write_wire_kind(WireKind::Struct);
	writer.write_wire_kind(WireKind::VarInt);
	writer.write_varint_i32(2);
	writer.write_varint_i32(42);
	writer.write_wire_kind(WireKind::EndStruct);
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, container_id, &mut ctx, &mut reader).expect("substitute recovers the decode");
	let WireValue::Struct(sv) = &decoded else { panic!("expected a struct value") };
	let substituted = sv.members.get(&2).expect("member 2 is present via substitution");
	let WireValue::Struct(inner) = substituted else { panic!("substitute produced a struct value") };
	assert_eq!(inner.type_id, schema_core::registry::TypeId::placeholder());
}

/// Scenario 6: encoding `B{type_code=9}` where the reading registry has no
/// `type_code=9` under `A.derived_types` raises `UnknownDerivedType(9)`.
#[test]
fn scenario_unknown_derived_type() {
	let (registry, a_id, _b_id) = build_polymorphic_registry();

	let mut writer = ByteWriter::new();
	writer.write_wire_kind(WireKind::AbstractStruct);
	writer.write_varint_i32(9);
	writer.write_wire_kind(WireKind::VarInt);
	writer.write_varint_i32(1);
	writer.write_varint_i32(7);
	writer.write_wire_kind(WireKind::EndStruct);
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let err = decode_object(&registry, a_id, &mut ctx, &mut reader).unwrap_err();
	assert!(matches!(err, Error::UnknownDerivedType { type_code: 9, .. }));
}

/// Forward/backward skip: an unknown tag+payload inserted before
/// `EndStruct` is skipped by wire kind and the rest of the record still
/// decodes with all known members populated.
#[test]
fn unknown_member_tag_is_skipped() {
	let member = MemberSpec {
		name: "known".into(),
		tag_id: 1,
		hidden: false,
		exclude_from_game_state: false,
		descriptor_kind: DescriptorKind::Primitive(schema_core::wire::PrimitiveKind::Int32),
		element_type: "i32".into(),
		key_type: None,
		version_window: None,
		max_collection_size: None,
		substitute: None,
		converters: Vec::new(),
	};
	let record = RecordSpec { members: vec![member], ..RecordSpec::new("Record") };
	let registry = Scanner::build(vec![TypeSpec::Record(record)], &[]).expect("registry builds");
	let record_id = registry.by_name("Record").expect("Record is registered").id;

	let mut writer = ByteWriter::new();
	writer.write_wire_kind(WireKind::Struct);
	// An unknown tag 99 carrying a string payload, written before the known
	// member — tag order on the wire is unconstrained.
	writer.write_wire_kind(WireKind::String);
	writer.write_varint_i32(99);
	writer.write_string(Some("future field"));
	writer.write_wire_kind(WireKind::VarInt);
	writer.write_varint_i32(1);
	writer.write_varint_i32(42);
	writer.write_wire_kind(WireKind::EndStruct);
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, record_id, &mut ctx, &mut reader).expect("unknown tag is skipped, not fatal");
	let WireValue::Struct(sv) = &decoded else { panic!("expected a struct value") };
	assert_eq!(sv.members.get(&1), Some(&WireValue::Int(42)));
	assert_eq!(sv.members.len(), 1);
}

/// Nullable discipline: a `NullableStruct` encoding `null` writes exactly a
/// one-byte `{presence=0}` body and decodes back to null.
#[test]
fn nullable_struct_null_is_one_byte() {
	let field = RecordSpec::new("Leaf");
	let holder_member = MemberSpec {
		name: "leaf".into(),
		tag_id: 1,
		hidden: false,
		exclude_from_game_state: false,
		descriptor_kind: DescriptorKind::NullableStruct,
		element_type: "Leaf".into(),
		key_type: None,
		version_window: None,
		max_collection_size: None,
		substitute: None,
		converters: Vec::new(),
	};
	let holder = RecordSpec { members: vec![holder_member], ..RecordSpec::new("Holder") };
	let registry = Scanner::build(vec![TypeSpec::Record(field), TypeSpec::Record(holder)], &[]).expect("registry builds");
	let holder_id = registry.by_name("Holder").expect("Holder is registered").id;

	let mut members = std::collections::BTreeMap::new();
	members.insert(1, WireValue::Null);
	let value = WireValue::Struct(StructValue { type_id: holder_id, members });

	let mut writer = ByteWriter::new();
	let mut ctx = Context::new();
	encode_object(&registry, holder_id, &value, &mut ctx, &mut writer).expect("encodes");
	let bytes = writer.into_bytes();

	let mut expected = vec![WireKind::Struct.to_byte()];
	expected.push(WireKind::NullableStruct.to_byte());
	expected.extend(leb128(zigzag32(1) as u128));
	expected.push(0); // presence byte: absent
	expected.push(WireKind::EndStruct.to_byte());
	assert_eq!(bytes, expected);

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, holder_id, &mut ctx, &mut reader).expect("decodes");
	let WireValue::Struct(sv) = &decoded else { panic!("expected a struct value") };
	assert_eq!(sv.members.get(&1), Some(&WireValue::Null));
}

/// Length-bound enforcement: a collection of `N+1` elements against a
/// context whose `max_collection_size = N` raises `BoundExceeded` with no
/// partial decode.
#[test]
fn collection_length_bound_rejects_oversized_input() {
	let specs = vec![TypeSpec::ValueCollection { name: "Vec<i32>".into(), element: "i32".into(), max_size: None }];
	let registry = Scanner::build(specs, &[]).expect("registry builds");
	let vec_id = registry.by_name("Vec<i32>").expect("collection type is registered").id;

	let mut writer = ByteWriter::new();
	writer.write_wire_kind(WireKind::ValueCollection);
	writer.write_length(Some(3));
	writer.write_wire_kind(WireKind::VarInt);
	for v in [1, 2, 3] {
		writer.write_varint_i32(v);
	}
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new().with_max_collection_size(2);
	let err = decode_object(&registry, vec_id, &mut ctx, &mut reader).unwrap_err();
	assert!(matches!(err, Error::BoundExceeded { bound: BoundKind::CollectionSize, limit: 2, actual: 3, .. }));
}

/// Tag uniqueness / reserved-range enforcement: a member whose explicit tag
/// id collides with another member in the same hierarchy is rejected at
/// scan time rather than surfacing as a decode-time ambiguity.
#[test]
fn duplicate_tag_id_is_a_schema_error() {
	let member_a = MemberSpec {
		name: "a".into(),
		tag_id: 1,
		hidden: false,
		exclude_from_game_state: false,
		descriptor_kind: DescriptorKind::Primitive(schema_core::wire::PrimitiveKind::Int32),
		element_type: "i32".into(),
		key_type: None,
		version_window: None,
		max_collection_size: None,
		substitute: None,
		converters: Vec::new(),
	};
	let member_b = MemberSpec { name: "b".into(), ..member_a.clone() };
	let record = RecordSpec { members: vec![member_a, member_b], ..RecordSpec::new("Clashing") };
	let err = Scanner::build(vec![TypeSpec::Record(record)], &[]).unwrap_err();
	assert!(matches!(err, Error::Schema(_)));
}

/// Hash stability: adding a `Hidden`-flagged member to a public type leaves
/// `protocol_hash()` unchanged; changing a tag id changes it.
#[test]
fn hidden_member_does_not_change_protocol_hash() {
	fn member(tag_id: i32, hidden: bool) -> MemberSpec {
		MemberSpec {
			name: "value".into(),
			tag_id,
			hidden,
			exclude_from_game_state: false,
			descriptor_kind: DescriptorKind::Primitive(schema_core::wire::PrimitiveKind::Int32),
			element_type: "i32".into(),
			key_type: None,
			version_window: None,
			max_collection_size: None,
			substitute: None,
			converters: Vec::new(),
		}
	}

	let base = RecordSpec { members: vec![member(1, false)], ..RecordSpec::new("Public") };
	let base_hash = Scanner::build(vec![TypeSpec::Record(base)], &["Public"]).unwrap().protocol_hash();

	let with_hidden_extra = RecordSpec {
		members: vec![member(1, false), member(2, true)],
		..RecordSpec::new("Public")
	};
	let with_hidden_hash = Scanner::build(vec![TypeSpec::Record(with_hidden_extra)], &["Public"]).unwrap().protocol_hash();
	assert_eq!(base_hash, with_hidden_hash);

	let retagged = RecordSpec { members: vec![member(5, false)], ..RecordSpec::new("Public") };
	let retagged_hash = Scanner::build(vec![TypeSpec::Record(retagged)], &["Public"]).unwrap().protocol_hash();
	assert_ne!(base_hash, retagged_hash);
}

/// Schema determinism: two independent constructions of the registry from
/// the same type set produce the same `protocol_hash()`.
#[test]
fn schema_determinism_across_independent_builds() {
	fn specs() -> Vec<TypeSpec> {
		let member = MemberSpec {
			name: "value".into(),
			tag_id: 1,
			hidden: false,
			exclude_from_game_state: false,
			descriptor_kind: DescriptorKind::Primitive(schema_core::wire::PrimitiveKind::Int32),
			element_type: "i32".into(),
			key_type: None,
			version_window: None,
			max_collection_size: None,
			substitute: None,
			converters: Vec::new(),
		};
		vec![TypeSpec::Record(RecordSpec { members: vec![member], ..RecordSpec::new("Public") })]
	}

	let first = Scanner::build(specs(), &["Public"]).unwrap();
	let second = Scanner::build(specs(), &["Public"]).unwrap();
	assert_eq!(first.protocol_hash(), second.protocol_hash());
	assert_eq!(first.all().len(), second.all().len());
}

/// String-length bound enforcement: a declared length of `N+1` against a
/// context whose `max_string_size = N` raises `BoundExceeded` before the
/// (malformed, truncated) body is ever read as UTF-8.
#[test]
fn string_length_bound_rejects_oversized_input() {
	let registry = Scanner::build(Vec::new(), &[]).expect("builtins always build");
	let string_type = registry.by_name("String").expect("String is a seeded builtin").id;

	let mut writer = ByteWriter::new();
	writer.write_wire_kind(WireKind::String);
	writer.write_string(Some("hello"));
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new().with_max_string_size(3);
	let err = decode_object(&registry, string_type, &mut ctx, &mut reader).unwrap_err();
	assert!(matches!(err, Error::BoundExceeded { bound: BoundKind::StringLength, limit: 3, actual: 5, .. }));
}

/// Byte-array-length bound enforcement: mirrors
/// `string_length_bound_rejects_oversized_input` for `Vec<u8>`.
#[test]
fn byte_array_length_bound_rejects_oversized_input() {
	let registry = Scanner::build(Vec::new(), &[]).expect("builtins always build");
	let bytes_type = registry.by_name("ByteBuf").expect("ByteBuf is a seeded builtin").id;

	let mut writer = ByteWriter::new();
	writer.write_wire_kind(WireKind::Bytes);
	writer.write_bytes(Some(&[1, 2, 3, 4, 5]));
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new().with_max_byte_array_size(3);
	let err = decode_object(&registry, bytes_type, &mut ctx, &mut reader).unwrap_err();
	assert!(matches!(err, Error::BoundExceeded { bound: BoundKind::ByteArrayLength, limit: 3, actual: 5, .. }));
}

/// An `Option<AbstractRoot>` member frames as a plain `AbstractStruct` (the
/// root's own `type-code=0` already carries null), not as a `NullableStruct`
/// wrapping one. Round-tripping a populated value exercises this: before the
/// fix, the `NullableStruct` presence-byte path would hand the payload to
/// the abstract root's own (memberless) descriptor and drop the concrete
/// member data on the floor instead of writing the type-code framing.
#[test]
fn optional_abstract_root_member_round_trips() {
	let a = RecordSpec::new("A").with_role(RecordRole::AbstractRoot);
	let value_member = MemberSpec {
		name: "value".into(),
		tag_id: 1,
		hidden: false,
		exclude_from_game_state: false,
		descriptor_kind: DescriptorKind::Primitive(schema_core::wire::PrimitiveKind::Int32),
		element_type: "i32".into(),
		key_type: None,
		version_window: None,
		max_collection_size: None,
		substitute: None,
		converters: Vec::new(),
	};
	let b = RecordSpec::new("B").derives_from("A", 3);
	let b = RecordSpec { members: vec![value_member], ..b };

	let opt_member = MemberSpec {
		name: "maybe_a".into(),
		tag_id: 1,
		hidden: false,
		exclude_from_game_state: false,
		descriptor_kind: DescriptorKind::NullableStruct,
		element_type: "A".into(),
		key_type: None,
		version_window: None,
		max_collection_size: None,
		substitute: None,
		converters: Vec::new(),
	};
	let holder = RecordSpec { members: vec![opt_member], ..RecordSpec::new("Holder") };

	let registry =
		Scanner::build(vec![TypeSpec::Record(a), TypeSpec::Record(b), TypeSpec::Record(holder)], &["A", "B", "Holder"]).expect("registry builds");
	let holder_id = registry.by_name("Holder").expect("Holder is registered").id;
	let b_id = registry.by_name("B").expect("B is registered").id;

	let mut inner_members = std::collections::BTreeMap::new();
	inner_members.insert(1, WireValue::Int(9));
	let mut members = std::collections::BTreeMap::new();
	members.insert(1, WireValue::Struct(StructValue { type_id: b_id, members: inner_members }));
	let value = WireValue::Struct(StructValue { type_id: holder_id, members });

	let mut writer = ByteWriter::new();
	let mut ctx = Context::new();
	encode_object(&registry, holder_id, &value, &mut ctx, &mut writer).expect("encodes");
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, holder_id, &mut ctx, &mut reader).expect("decodes");
	let WireValue::Struct(sv) = &decoded else { panic!("expected a struct value") };
	let inner_value = sv.members.get(&1).expect("member 1 is present");
	let WireValue::Struct(inner) = inner_value else { panic!("expected a nested struct value") };
	assert_eq!(inner.type_id, b_id);
	assert_eq!(inner.members.get(&1), Some(&WireValue::Int(9)));
}

#[allow(dead_code)]
fn assert_flags_carry_no_checksum() {
	// Compile-time check that this flag exists even though no in-scope
	// operation consumes it yet (see DESIGN.md).
	let _ = MemberFlags::NO_CHECKSUM;
}
