use crate::error::Error;
use crate::registry::flags::MemberFlags;
use crate::value::{StructValue, WireValue};
use crate::wire::{PrimitiveKind, WireKind};

/// A dense, stable handle into [`Registry`](crate::registry::Registry)'s
/// type table. Distinct from a type's `type_code`: a `TypeId` is unique
/// across the whole registry, while a `type_code` is only unique among the
/// concrete siblings of one abstract root and is author-assigned.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
	pub(crate) fn new(index: u32) -> Self {
		Self(index)
	}

	pub fn index(self) -> usize {
		self.0 as usize
	}

	/// A `TypeId` that names no registered type. [`crate::value::ToWireValue`]
	/// impls for `#[derive(Serializable)]` types stamp their `StructValue`
	/// with this: building a value outside a registry, they have no real id
	/// to give it, and the dispatch engine never needs one for a plain
	/// (non-polymorphic) struct — it already knows the real type statically
	/// from the descriptor it's walking. Only an `AbstractStruct` value reads
	/// `StructValue::type_id` at all, and the derive macro never targets one.
	pub const fn placeholder() -> Self {
		Self(u32::MAX)
	}
}

/// Descriptor-level classification of a type's shape. Distinct
/// from the physical [`WireKind`] byte tag: several of these collapse onto
/// the same physical framing (e.g. `Enum`'s physical kind is its underlying
/// integer's, `ConfigRef`'s is its key type's).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DescriptorKind {
	Primitive(PrimitiveKind),
	NullablePrimitive(PrimitiveKind),
	String,
	Bytes,
	Enum { underlying: PrimitiveKind },
	NullableEnum { underlying: PrimitiveKind },
	StringId,
	DynamicEnum,
	ValueCollection,
	KeyValueCollection,
	Struct,
	NullableStruct,
	AbstractStruct,
	ConfigData,
	ConfigRef,
	ConfigDataContent,
	Tuple,
}

impl DescriptorKind {
	/// The physical wire kind this descriptor kind frames itself with, for
	/// the shapes that don't need to borrow one from a referenced type.
	pub fn self_contained_physical(self) -> Option<WireKind> {
		Some(match self {
			DescriptorKind::Primitive(p) => p.physical(),
			DescriptorKind::NullablePrimitive(p) => p.nullable_physical(),
			DescriptorKind::String => WireKind::String,
			DescriptorKind::Bytes => WireKind::Bytes,
			DescriptorKind::Enum { underlying } => underlying.physical(),
			DescriptorKind::NullableEnum { underlying } => underlying.nullable_physical(),
			DescriptorKind::StringId => WireKind::String,
			DescriptorKind::DynamicEnum => WireKind::VarInt,
			DescriptorKind::ValueCollection => WireKind::ValueCollection,
			DescriptorKind::KeyValueCollection => WireKind::KeyValueCollection,
			DescriptorKind::Struct | DescriptorKind::Tuple => WireKind::Struct,
			DescriptorKind::NullableStruct => WireKind::NullableStruct,
			DescriptorKind::AbstractStruct => WireKind::AbstractStruct,
			// ConfigData/ConfigRef/ConfigDataContent borrow their physical
			// kind from a referenced type; resolved by the scanner instead.
			DescriptorKind::ConfigData | DescriptorKind::ConfigRef | DescriptorKind::ConfigDataContent => return None,
		})
	}
}

/// Installed when a member fails to decode and the schema declares a
/// fallback. Receives the error that was raised; its return value is
/// installed in place of the member and the raw bytes/error are kept on the
/// `Error` that propagates up as `Error::MemberDeserialization`.
pub type SubstituteFn = fn(&Error) -> WireValue;

/// Accepts a value decoded under a non-canonical wire kind and produces the
/// member's declared type. Matched by the wire kind actually found on the
/// stream; at most one converter level is applied.
pub type ConverterFn = fn(WireValue) -> crate::error::Result<WireValue>;

/// Runs base-most first after member assignment/construction.
pub type HookFn = fn(&mut StructValue);

#[derive(Debug, Clone)]
pub struct MemberDescriptor {
	pub name: Box<str>,
	pub tag_id: i32,
	pub flags: MemberFlags,
	pub wire_kind: DescriptorKind,
	pub physical_kind: WireKind,
	/// The registered type backing this member's value, when the member's
	/// shape references another registered type (struct, collection element,
	/// config ref/data, enum underlying type).
	pub member_type: Option<TypeId>,
	/// Name of the declared member type as it contributes to the protocol
	/// hash; stored directly so hashing never needs a registry round-trip.
	pub declared_type_name: Box<str>,
	/// `[added_in, removed_in)`; `None` means present in every logic version.
	pub version_window: Option<(i32, i32)>,
	pub max_collection_size: Option<usize>,
	#[allow(clippy::type_complexity)]
	pub converters: Vec<(WireKind, ConverterFn)>,
	pub substitute: Option<SubstituteFn>,
}

impl MemberDescriptor {
	/// True when `logic_version` falls inside this member's version window,
	/// or the member carries no window at all.
	pub fn active_at(&self, logic_version: Option<i32>) -> bool {
		match (self.version_window, logic_version) {
			(None, _) => true,
			(Some(_), None) => true,
			(Some((added, removed)), Some(v)) => v >= added && v < removed,
		}
	}
}

/// One registered type's full schema: its wire shape, its members (if a
/// struct/tuple), and the polymorphism/collection/config relationships the
/// dispatch engine and reachability analysis need.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
	pub id: TypeId,
	pub name: Box<str>,
	pub wire_kind: DescriptorKind,
	pub physical_kind: WireKind,
	/// Discriminant under `abstract_root`, when this type is a concrete leaf
	/// of a polymorphic hierarchy.
	pub type_code: Option<i32>,
	pub abstract_root: Option<TypeId>,
	/// Populated only on the abstract root descriptor itself.
	pub derived: Vec<TypeId>,
	pub members: Vec<MemberDescriptor>,
	pub reserved_ranges: Vec<(i32, i32)>,
	pub blocked_tags: Vec<i32>,
	/// Element type for `ValueCollection`/`ConfigDataContent`/`ConfigRef`.
	pub element_type: Option<TypeId>,
	/// Key type for `KeyValueCollection`/`ConfigData`/`ConfigRef`.
	pub key_type: Option<TypeId>,
	/// Value used to represent a null `ConfigRef`/`ConfigData` key when the
	/// key type itself is not nullable.
	pub null_sentinel_key: Option<WireValue>,
	/// Whether this type's namespace falls under a declared public prefix,
	/// propagated transitively. Drives membership in the protocol hash.
	pub is_public: bool,
	/// True when this type, or anything reachable through its members,
	/// contains a `ConfigRef`. Computed once at scan time so `traverse_refs`
	/// can short-circuit non-ref types without walking them.
	pub contains_config_ref: bool,
	/// Base-most-first; invoked by the dispatch engine after member
	/// assignment on every decode.
	pub on_deserialized_hooks: Vec<HookFn>,
}

impl TypeDescriptor {
	pub fn is_abstract_root(&self) -> bool {
		matches!(self.wire_kind, DescriptorKind::AbstractStruct) && self.abstract_root.is_none()
	}

	/// Looks up a member by tag id; members are kept sorted by tag id
	/// ascending, so this is a binary search.
	pub fn member_by_tag(&self, tag_id: i32) -> Option<&MemberDescriptor> {
		self.members.binary_search_by_key(&tag_id, |m| m.tag_id).ok().map(|i| &self.members[i])
	}
}
