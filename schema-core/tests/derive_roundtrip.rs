//! Round-trips `#[derive(Serializable)]` structs through the wire codec,
//! including a `Vec<T>` field of another derived struct — the path that
//! exercises `ToWireValue`/`FromWireValue`'s `TypeId::placeholder()` stamp
//! instead of `dispatch::Serializable`'s registry-supplied id.

use schema_core::dispatch::{decode_object, encode_object, Context, Serializable};
use schema_core::scanner::{RecordSpec, Scanner, TypeSpec};
use schema_core::value::{FromWireValue, ToWireValue, WireValue};
use schema_core::wire::{ByteReader, ByteWriter};
use schema_core::Serializable as DeriveSerializable;

#[derive(Debug, Clone, PartialEq, DeriveSerializable)]
struct Reward {
	#[tag(1)]
	item_id: String,
	#[tag(2)]
	quantity: i32,
}

#[derive(Debug, Clone, PartialEq, DeriveSerializable)]
struct Quest {
	#[tag(1)]
	name: String,
	#[tag(2)]
	level_requirement: i32,
	#[tag(3)]
	rewards: Vec<Reward>,
	#[tag(4)]
	#[hidden]
	internal_notes: Option<String>,
}

fn build_registry() -> schema_core::registry::Registry {
	let specs = vec![
		TypeSpec::Record(RecordSpec::from_describe::<Reward>()),
		TypeSpec::Record(RecordSpec::from_describe::<Quest>()),
		TypeSpec::ValueCollection { name: "Vec<Reward>".into(), element: "Reward".into(), max_size: None },
		TypeSpec::Nullable { name: "Option<String>".into(), inner: "String".into() },
	];
	Scanner::build(specs, &["Quest", "Reward"]).expect("registry builds")
}

fn sample_quest() -> Quest {
	Quest {
		name: "Slay the Wyrm".into(),
		level_requirement: 30,
		rewards: vec![
			Reward { item_id: "sword_of_embers".into(), quantity: 1 },
			Reward { item_id: "gold".into(), quantity: 500 },
		],
		internal_notes: Some("drop rate tuned in patch 1.4".into()),
	}
}

#[test]
fn struct_with_nested_vec_round_trips_through_the_wire() {
	let registry = build_registry();
	let quest_type = registry.by_name("Quest").expect("Quest is registered").id;
	let quest = sample_quest();

	let value = Serializable::to_wire_value(&quest, quest_type);
	let mut writer = ByteWriter::new();
	let mut ctx = Context::new();
	encode_object(&registry, quest_type, &value, &mut ctx, &mut writer).expect("encodes");
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, quest_type, &mut ctx, &mut reader).expect("decodes");
	let round_tripped = <Quest as Serializable>::from_wire_value(&decoded).expect("converts back");

	assert_eq!(round_tripped, quest);
}

#[test]
fn hidden_member_is_still_carried_on_the_wire() {
	let registry = build_registry();
	let quest_type = registry.by_name("Quest").expect("Quest is registered").id;
	let quest = sample_quest();

	let value = Serializable::to_wire_value(&quest, quest_type);
	let mut writer = ByteWriter::new();
	let mut ctx = Context::new();
	encode_object(&registry, quest_type, &value, &mut ctx, &mut writer).expect("encodes");
	let bytes = writer.into_bytes();

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, quest_type, &mut ctx, &mut reader).expect("decodes");
	let round_tripped = <Quest as Serializable>::from_wire_value(&decoded).expect("converts back");

	// `#[hidden]` only removes a member from the protocol hash, never from
	// the wire itself.
	assert_eq!(round_tripped.internal_notes, quest.internal_notes);
}

#[test]
fn nested_struct_to_wire_value_uses_a_placeholder_type_id() {
	// `Reward::to_wire_value` (the `ToWireValue` impl, not the `Serializable`
	// one) has no registry to draw a real `TypeId` from; confirm it still
	// produces a value `Reward::from_wire_value` can read back, proving the
	// placeholder id is never inspected on this path.
	let reward = Reward { item_id: "potion".into(), quantity: 3 };
	let value = ToWireValue::to_wire_value(&reward);
	let WireValue::Struct(sv) = &value else { panic!("expected a struct value") };
	assert_eq!(sv.type_id, schema_core::registry::TypeId::placeholder());

	let back = <Reward as FromWireValue>::from_wire_value(Some(&value)).expect("converts back");
	assert_eq!(back, reward);
}

#[test]
fn missing_required_nested_struct_is_an_error() {
	let err = <Reward as FromWireValue>::from_wire_value(None).unwrap_err();
	assert!(matches!(err, schema_core::Error::Converter { .. }));
}
