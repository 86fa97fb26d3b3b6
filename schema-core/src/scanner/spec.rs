//! Inputs to the Schema Scanner: the compile-time/macro description of one
//! type's registration rule, fed in place of runtime attribute reflection.

use std::ops::Range;

use crate::registry::{ConverterFn, DescriptorKind, HookFn, SubstituteFn};
use crate::value::WireValue;
use crate::wire::WireKind;

/// Implemented by `#[derive(Serializable)]` for every record struct; the
/// scanner calls this instead of walking runtime attributes.
pub trait Describe {
	fn type_name() -> &'static str;
	fn member_specs() -> Vec<MemberSpec>;
}

#[derive(Clone)]
pub struct MemberSpec {
	pub name: Box<str>,
	pub tag_id: i32,
	pub hidden: bool,
	pub exclude_from_game_state: bool,
	pub descriptor_kind: DescriptorKind,
	/// Name of the registered type backing this member's value (element type
	/// for scalars/structs/`Vec<T>`, value type for `HashMap<K, V>`).
	pub element_type: Box<str>,
	/// `Some(key type name)` only for `HashMap<K, V>` members.
	pub key_type: Option<Box<str>>,
	pub version_window: Option<(i32, i32)>,
	pub max_collection_size: Option<usize>,
	pub substitute: Option<SubstituteFn>,
	pub converters: Vec<(WireKind, ConverterFn)>,
}

impl MemberSpec {
	pub fn with_version_window(mut self, added_in: i32, removed_in: i32) -> Self {
		self.version_window = Some((added_in, removed_in));
		self
	}

	pub fn with_max_collection_size(mut self, max: usize) -> Self {
		self.max_collection_size = Some(max);
		self
	}

	pub fn with_substitute(mut self, f: SubstituteFn) -> Self {
		self.substitute = Some(f);
		self
	}

	pub fn with_converter(mut self, from: WireKind, f: ConverterFn) -> Self {
		self.converters.push((from, f));
		self
	}
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub enum RecordRole {
	/// An ordinary concrete record, or the concrete leaf of a hierarchy when
	/// `abstract_root` is set.
	Concrete,
	/// A polymorphic root; its `derived_types` map is populated from every
	/// other `RecordSpec` whose `abstract_root` names it.
	AbstractRoot,
}

/// One concrete or abstract record type.
#[derive(Clone)]
pub struct RecordSpec {
	pub name: Box<str>,
	pub role: RecordRole,
	/// Ancestor chain, base-most first. Tag ids, reserved/blocked ranges and
	/// implicit ranges are checked for conflicts across this whole chain.
	pub bases: Vec<Box<str>>,
	/// Name of the abstract root this concrete type derives from, if any.
	pub abstract_root: Option<Box<str>>,
	/// Required (and must be positive, unique among siblings) when
	/// `abstract_root` is set.
	pub type_code: Option<i32>,
	pub members: Vec<MemberSpec>,
	pub reserved_ranges: Vec<Range<i32>>,
	pub blocked_ranges: Vec<Range<i32>>,
	pub allow_non_reserved: bool,
	/// Fixed-arity tuple: members get implicit tag ids `1..=n` and
	/// construction is always collect-then-construct. Max arity 7.
	pub is_tuple: bool,
	pub on_deserialized: Vec<HookFn>,
}

impl RecordSpec {
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self {
			name: name.into(),
			role: RecordRole::Concrete,
			bases: Vec::new(),
			abstract_root: None,
			type_code: None,
			members: Vec::new(),
			reserved_ranges: Vec::new(),
			blocked_ranges: Vec::new(),
			allow_non_reserved: false,
			is_tuple: false,
			on_deserialized: Vec::new(),
		}
	}

	pub fn from_describe<T: Describe>() -> Self {
		Self { members: T::member_specs(), ..Self::new(T::type_name()) }
	}

	pub fn abstract_root() -> RecordRole {
		RecordRole::AbstractRoot
	}

	pub fn with_role(mut self, role: RecordRole) -> Self {
		self.role = role;
		self
	}

	pub fn with_base(mut self, base: impl Into<Box<str>>) -> Self {
		self.bases.push(base.into());
		self
	}

	pub fn derives_from(mut self, root: impl Into<Box<str>>, type_code: i32) -> Self {
		self.abstract_root = Some(root.into());
		self.type_code = Some(type_code);
		self
	}

	pub fn with_reserved_range(mut self, range: Range<i32>) -> Self {
		self.reserved_ranges.push(range);
		self
	}

	pub fn with_blocked_range(mut self, range: Range<i32>) -> Self {
		self.blocked_ranges.push(range);
		self
	}

	pub fn allow_non_reserved(mut self) -> Self {
		self.allow_non_reserved = true;
		self
	}

	pub fn as_tuple(mut self) -> Self {
		self.is_tuple = true;
		self
	}

	pub fn with_hook(mut self, hook: HookFn) -> Self {
		self.on_deserialized.push(hook);
		self
	}
}

/// One registration rule. The scanner resolves the name references between
/// specs (and against the seeded built-ins) into a dependency graph before
/// producing descriptors, in a fixed discovery rule order.
#[derive(Clone)]
pub enum TypeSpec {
	Nullable {
		name: Box<str>,
		inner: Box<str>,
	},
	ValueCollection {
		name: Box<str>,
		element: Box<str>,
		max_size: Option<usize>,
	},
	KeyValueCollection {
		name: Box<str>,
		key: Box<str>,
		value: Box<str>,
		max_size: Option<usize>,
	},
	/// A user-defined enum: `values` carries every
	/// declared element's underlying discriminant, which must be pairwise
	/// distinct.
	Enum {
		name: Box<str>,
		underlying: crate::wire::PrimitiveKind,
		values: Vec<(Box<str>, i64)>,
	},
	/// A type implementing the `StringId` capability.
	StringId {
		name: Box<str>,
	},
	/// A type implementing the `DynamicEnum` capability, keyed by `id`.
	DynamicEnum {
		name: Box<str>,
	},
	Record(RecordSpec),
	ConfigRef {
		name: Box<str>,
		key: Box<str>,
	},
	ConfigData {
		name: Box<str>,
		key: Box<str>,
		null_sentinel: Option<WireValue>,
	},
	ConfigDataContent {
		name: Box<str>,
		inner: Box<str>,
	},
}

impl TypeSpec {
	pub fn name(&self) -> &str {
		match self {
			TypeSpec::Nullable { name, .. } => name,
			TypeSpec::ValueCollection { name, .. } => name,
			TypeSpec::KeyValueCollection { name, .. } => name,
			TypeSpec::Enum { name, .. } => name,
			TypeSpec::StringId { name } => name,
			TypeSpec::DynamicEnum { name } => name,
			TypeSpec::Record(r) => &r.name,
			TypeSpec::ConfigRef { name, .. } => name,
			TypeSpec::ConfigData { name, .. } => name,
			TypeSpec::ConfigDataContent { name, .. } => name,
		}
	}
}
