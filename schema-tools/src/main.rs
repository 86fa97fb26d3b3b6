//! Small inspection binary for schema-core: builds a toy game-config
//! registry, prints its protocol hash, round-trips a sample value through
//! the wire codec, and walks the decoded result with a path-tracking
//! dynamic visitor.

use std::time::SystemTime;

use schema_core::dispatch::{decode_object, encode_object, Context, MemberPath, Serializable};
use schema_core::scanner::{RecordSpec, Scanner, TypeSpec};
use schema_core::value::WireValue;
use schema_core::visitor::{walk, Visitor};
use schema_core::wire::{ByteReader, ByteWriter};
use schema_core::{Result, Serializable as DeriveSerializable};

#[derive(Debug, Clone, DeriveSerializable)]
struct Reward {
	#[tag(1)]
	item_id: String,
	#[tag(2)]
	quantity: i32,
}

#[derive(Debug, Clone, DeriveSerializable)]
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

fn build_registry() -> Result<schema_core::registry::Registry> {
	let specs = vec![
		TypeSpec::Record(RecordSpec::from_describe::<Reward>()),
		TypeSpec::Record(RecordSpec::from_describe::<Quest>()),
		TypeSpec::ValueCollection { name: "Vec<Reward>".into(), element: "Reward".into(), max_size: None },
		TypeSpec::Nullable { name: "Option<String>".into(), inner: "String".into() },
	];
	Scanner::build(specs, &["Quest", "Reward"])
}

/// Prints every member as it's visited, with its breadcrumb path — the kind
/// of read-only inspector the dynamic visitor exists to support.
struct PrintingVisitor;

impl Visitor for PrintingVisitor {
	fn visit_string(&mut self, path: &MemberPath, v: &str) {
		println!("  {path} = {v:?}");
	}
	fn visit_int(&mut self, path: &MemberPath, v: i64) {
		println!("  {path} = {v}");
	}
	fn enter_struct(&mut self, path: &MemberPath, type_name: &str) {
		println!("{path} enter struct `{type_name}`");
	}
}

fn main() -> Result<()> {
	tracing_subscriber::fmt::init();

	let start = SystemTime::now();
	let registry = build_registry()?;
	println!("Registry built in {:?}", start.elapsed().unwrap());
	println!("Protocol hash: {:#010x}", registry.protocol_hash());

	let quest = Quest {
		name: "Slay the Wyrm".into(),
		level_requirement: 30,
		rewards: vec![Reward { item_id: "sword_of_embers".into(), quantity: 1 }, Reward { item_id: "gold".into(), quantity: 500 }],
		internal_notes: Some("drop rate tuned in patch 1.4".into()),
	};

	let quest_type = registry.by_name("Quest").expect("Quest is registered").id;
	let value: WireValue = quest.to_wire_value(quest_type);

	let mut writer = ByteWriter::new();
	let mut ctx = Context::new();
	encode_object(&registry, quest_type, &value, &mut ctx, &mut writer)?;
	let bytes = writer.into_bytes();
	println!("Encoded {} bytes", bytes.len());

	let mut reader = ByteReader::new(&bytes);
	let mut ctx = Context::new();
	let decoded = decode_object(&registry, quest_type, &mut ctx, &mut reader)?;
	let round_tripped = Quest::from_wire_value(&decoded)?;
	assert_eq!(round_tripped.name, quest.name);
	assert_eq!(round_tripped.rewards.len(), quest.rewards.len());
	println!("Round-tripped: {round_tripped:?}");

	println!("Walking decoded value:");
	let mut visitor = PrintingVisitor;
	let mut walk_ctx = Context::new();
	walk(&registry, quest_type, &decoded, &mut walk_ctx, &mut visitor);

	Ok(())
}
