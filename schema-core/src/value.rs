//! The dynamic runtime value that flows through encode/decode/traverse.
//!
//! The schema scanner and dispatch engine are generic over
//! [`TypeDescriptor`](crate::registry::TypeDescriptor); they never see a
//! concrete Rust struct. `WireValue` is the one representation both sides
//! agree on. Concrete domain types cross this boundary through
//! `#[derive(Serializable)]`, which implements [`ToWireValue`],
//! [`FromWireValue`] and [`WireSchema`] for each field.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::registry::{DescriptorKind, TypeId};
use crate::wire::{PrimitiveKind, WireKind};

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
	pub type_id: TypeId,
	pub members: BTreeMap<i32, WireValue>,
}

impl StructValue {
	pub fn new(type_id: TypeId) -> Self {
		Self { type_id, members: BTreeMap::new() }
	}
}

/// A byte sequence, distinct from `ValueCollection<u8>` at the schema level
/// (wire kind `Bytes` rather than a length-prefixed element collection).
/// Plain `Vec<u8>` is deliberately not given a `ToWireValue` impl: it would
/// collide with the blanket `Vec<T>` → `ValueCollection` impl below, so a
/// wrapper makes the intended wire kind unambiguous at the call site.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ByteBuf(pub Vec<u8>);

#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
	Null,
	Bool(bool),
	Int(i64),
	UInt(u64),
	UInt128(u128),
	F32(f32),
	F32Vec2([f32; 2]),
	F32Vec3([f32; 3]),
	F64(f64),
	F64Vec2([f64; 2]),
	F64Vec3([f64; 3]),
	Float32(f32),
	Float64(f64),
	Guid(Uuid),
	String(String),
	Bytes(Vec<u8>),
	Struct(StructValue),
	ValueCollection(Vec<WireValue>),
	KeyValueCollection(Vec<(WireValue, WireValue)>),
	/// A `ConfigRef<T>`/`ConfigData<T>` member: holds the key as it crossed
	/// the wire and, once a resolver has run, the item it names. `resolved`
	/// is always `None` immediately after decode.
	Ref(RefValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefValue {
	pub key: Box<WireValue>,
	pub resolved: Option<Box<WireValue>>,
}

impl RefValue {
	pub fn unresolved(key: WireValue) -> Self {
		Self { key: Box::new(key), resolved: None }
	}

	pub fn is_null(&self) -> bool {
		self.key.is_null()
	}
}

impl WireValue {
	/// The physical wire kind this value would be framed with, ignoring any
	/// nullable wrapping a descriptor might add. Used for diagnostics only;
	/// the authoritative kind for a given member comes from its descriptor.
	pub fn physical_kind(&self) -> WireKind {
		match self {
			WireValue::Null => WireKind::Null,
			WireValue::Bool(_) | WireValue::Int(_) | WireValue::UInt(_) => WireKind::VarInt,
			WireValue::UInt128(_) => WireKind::VarInt128,
			WireValue::F32(_) => WireKind::F32,
			WireValue::F32Vec2(_) => WireKind::F32Vec2,
			WireValue::F32Vec3(_) => WireKind::F32Vec3,
			WireValue::F64(_) => WireKind::F64,
			WireValue::F64Vec2(_) => WireKind::F64Vec2,
			WireValue::F64Vec3(_) => WireKind::F64Vec3,
			WireValue::Float32(_) => WireKind::Float32,
			WireValue::Float64(_) => WireKind::Float64,
			WireValue::Guid(_) => WireKind::MetaGuid,
			WireValue::String(_) => WireKind::String,
			WireValue::Bytes(_) => WireKind::Bytes,
			WireValue::Struct(_) => WireKind::Struct,
			WireValue::ValueCollection(_) => WireKind::ValueCollection,
			WireValue::KeyValueCollection(_) => WireKind::KeyValueCollection,
			WireValue::Ref(r) => r.key.physical_kind(),
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, WireValue::Null)
	}
}

/// Converts a concrete Rust value into its dynamic wire representation.
pub trait ToWireValue {
	fn to_wire_value(&self) -> WireValue;
}

/// Converts a dynamic wire representation back into a concrete Rust value.
/// `None` means the member's tag id was absent from the stream, skipped
/// under the forward/backward-compatible field-skip rule.
pub trait FromWireValue: Sized {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self>;
}

/// Maps a Rust field type onto the descriptor-level wire-kind taxonomy the
/// schema scanner works with. Implemented for every primitive
/// and collection shape the derive macro can emit field code for.
pub trait WireSchema {
	fn descriptor_kind() -> DescriptorKind;

	/// The canonical name this shape is registered under. Built-in shapes
	/// are seeded by the scanner under exactly these names (see
	/// `scanner::build::seed_builtins`); `#[derive(Serializable)]` overrides
	/// this to the struct's own Rust identifier for everything else.
	fn type_name() -> Box<str>;
}

macro_rules! impl_signed_int {
	($($ty:ty => $prim:ident, $name:literal),* $(,)?) => {$(
		impl ToWireValue for $ty {
			fn to_wire_value(&self) -> WireValue { WireValue::Int(*self as i64) }
		}
		impl FromWireValue for $ty {
			fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
				match value {
					None | Some(WireValue::Null) => Ok(<$ty>::default()),
					Some(WireValue::Int(v)) => Ok(*v as $ty),
					Some(other) => Err(Error::Converter {
						from: other.physical_kind(),
						to: stringify!($ty).into(),
						reason: "expected an integer value".into(),
					}),
				}
			}
		}
		impl WireSchema for $ty {
			fn descriptor_kind() -> DescriptorKind { DescriptorKind::Primitive(PrimitiveKind::$prim) }
			fn type_name() -> Box<str> { $name.into() }
		}
	)*};
}

macro_rules! impl_unsigned_int {
	($($ty:ty => $prim:ident, $name:literal),* $(,)?) => {$(
		impl ToWireValue for $ty {
			fn to_wire_value(&self) -> WireValue { WireValue::UInt(*self as u64) }
		}
		impl FromWireValue for $ty {
			fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
				match value {
					None | Some(WireValue::Null) => Ok(<$ty>::default()),
					Some(WireValue::UInt(v)) => Ok(*v as $ty),
					Some(other) => Err(Error::Converter {
						from: other.physical_kind(),
						to: stringify!($ty).into(),
						reason: "expected an unsigned integer value".into(),
					}),
				}
			}
		}
		impl WireSchema for $ty {
			fn descriptor_kind() -> DescriptorKind { DescriptorKind::Primitive(PrimitiveKind::$prim) }
			fn type_name() -> Box<str> { $name.into() }
		}
	)*};
}

impl_signed_int!(i8 => Int8, "i8", i16 => Int16, "i16", i32 => Int32, "i32", i64 => Int64, "i64");
impl_unsigned_int!(u8 => UInt8, "u8", u16 => UInt16, "u16", u32 => UInt32, "u32", u64 => UInt64, "u64");

impl ToWireValue for u128 {
	fn to_wire_value(&self) -> WireValue {
		WireValue::UInt128(*self)
	}
}
impl FromWireValue for u128 {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok(0),
			Some(WireValue::UInt128(v)) => Ok(*v),
			Some(other) => Err(Error::Converter { from: other.physical_kind(), to: "u128".into(), reason: "expected a 128-bit unsigned value".into() }),
		}
	}
}
impl WireSchema for u128 {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::Primitive(PrimitiveKind::UInt128)
	}
	fn type_name() -> Box<str> {
		"u128".into()
	}
}

impl ToWireValue for bool {
	fn to_wire_value(&self) -> WireValue {
		WireValue::Bool(*self)
	}
}
impl FromWireValue for bool {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok(false),
			Some(WireValue::Bool(v)) => Ok(*v),
			Some(other) => Err(Error::Converter { from: other.physical_kind(), to: "bool".into(), reason: "expected a bool value".into() }),
		}
	}
}
impl WireSchema for bool {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::Primitive(PrimitiveKind::Bool)
	}
	fn type_name() -> Box<str> {
		"bool".into()
	}
}

impl ToWireValue for char {
	fn to_wire_value(&self) -> WireValue {
		WireValue::UInt(*self as u64)
	}
}
impl FromWireValue for char {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok('\0'),
			Some(WireValue::UInt(v)) => char::from_u32(*v as u32)
				.ok_or_else(|| Error::Converter { from: WireKind::VarInt, to: "char".into(), reason: "not a valid scalar value".into() }),
			Some(other) => Err(Error::Converter { from: other.physical_kind(), to: "char".into(), reason: "expected an unsigned integer value".into() }),
		}
	}
}
impl WireSchema for char {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::Primitive(PrimitiveKind::Char)
	}
	fn type_name() -> Box<str> {
		"char".into()
	}
}

macro_rules! impl_float_like {
	($ty:ty, $variant:ident, $prim:ident) => {
		impl ToWireValue for $ty {
			fn to_wire_value(&self) -> WireValue {
				WireValue::$variant(*self)
			}
		}
		impl FromWireValue for $ty {
			fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
				match value {
					None | Some(WireValue::Null) => Ok(<$ty>::default()),
					Some(WireValue::$variant(v)) => Ok(*v),
					Some(other) => Err(Error::Converter {
						from: other.physical_kind(),
						to: stringify!($ty).into(),
						reason: "expected a floating-point value".into(),
					}),
				}
			}
		}
	};
}

impl_float_like!(f32, F32, F32);
impl_float_like!(f64, F64, F64);
impl WireSchema for f32 {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::Primitive(PrimitiveKind::F32)
	}
	fn type_name() -> Box<str> {
		"f32".into()
	}
}
impl WireSchema for f64 {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::Primitive(PrimitiveKind::F64)
	}
	fn type_name() -> Box<str> {
		"f64".into()
	}
}

macro_rules! impl_vec_like {
	($ty:ty, $variant:ident, $prim:ident, $name:literal) => {
		impl ToWireValue for $ty {
			fn to_wire_value(&self) -> WireValue {
				WireValue::$variant(*self)
			}
		}
		impl FromWireValue for $ty {
			fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
				match value {
					None | Some(WireValue::Null) => Ok(Default::default()),
					Some(WireValue::$variant(v)) => Ok(*v),
					Some(other) => Err(Error::Converter {
						from: other.physical_kind(),
						to: stringify!($ty).into(),
						reason: "expected a fixed-width vector value".into(),
					}),
				}
			}
		}
		impl WireSchema for $ty {
			fn descriptor_kind() -> DescriptorKind {
				DescriptorKind::Primitive(PrimitiveKind::$prim)
			}
			fn type_name() -> Box<str> {
				$name.into()
			}
		}
	};
}

impl_vec_like!([f32; 2], F32Vec2, F32Vec2, "f32x2");
impl_vec_like!([f32; 3], F32Vec3, F32Vec3, "f32x3");
impl_vec_like!([f64; 2], F64Vec2, F64Vec2, "f64x2");
impl_vec_like!([f64; 3], F64Vec3, F64Vec3, "f64x3");

impl ToWireValue for Uuid {
	fn to_wire_value(&self) -> WireValue {
		WireValue::Guid(*self)
	}
}
impl FromWireValue for Uuid {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok(Uuid::nil()),
			Some(WireValue::Guid(v)) => Ok(*v),
			Some(other) => Err(Error::Converter { from: other.physical_kind(), to: "Uuid".into(), reason: "expected a guid value".into() }),
		}
	}
}
impl WireSchema for Uuid {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::Primitive(PrimitiveKind::MetaGuid)
	}
	fn type_name() -> Box<str> {
		"Uuid".into()
	}
}

impl ToWireValue for String {
	fn to_wire_value(&self) -> WireValue {
		WireValue::String(self.clone())
	}
}
impl FromWireValue for String {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok(String::new()),
			Some(WireValue::String(v)) => Ok(v.clone()),
			Some(other) => Err(Error::Converter { from: other.physical_kind(), to: "String".into(), reason: "expected a string value".into() }),
		}
	}
}
impl WireSchema for String {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::String
	}
	fn type_name() -> Box<str> {
		"String".into()
	}
}

impl ToWireValue for ByteBuf {
	fn to_wire_value(&self) -> WireValue {
		WireValue::Bytes(self.0.clone())
	}
}
impl FromWireValue for ByteBuf {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok(ByteBuf::default()),
			Some(WireValue::Bytes(v)) => Ok(ByteBuf(v.clone())),
			Some(other) => Err(Error::Converter { from: other.physical_kind(), to: "ByteBuf".into(), reason: "expected a byte array".into() }),
		}
	}
}
impl WireSchema for ByteBuf {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::Bytes
	}
	fn type_name() -> Box<str> {
		"ByteBuf".into()
	}
}

impl<T: ToWireValue> ToWireValue for Option<T> {
	fn to_wire_value(&self) -> WireValue {
		match self {
			None => WireValue::Null,
			Some(v) => v.to_wire_value(),
		}
	}
}
impl<T: FromWireValue> FromWireValue for Option<T> {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok(None),
			some => Ok(Some(T::from_wire_value(some)?)),
		}
	}
}
impl<T: WireSchema> WireSchema for Option<T> {
	fn descriptor_kind() -> DescriptorKind {
		match T::descriptor_kind() {
			DescriptorKind::Primitive(p) => DescriptorKind::NullablePrimitive(p),
			DescriptorKind::Enum { underlying } => DescriptorKind::NullableEnum { underlying },
			DescriptorKind::Struct => DescriptorKind::NullableStruct,
			DescriptorKind::AbstractStruct => DescriptorKind::NullableStruct,
			already_nullable => already_nullable,
		}
	}
	fn type_name() -> Box<str> {
		T::type_name()
	}
}

impl<T: ToWireValue> ToWireValue for Vec<T> {
	fn to_wire_value(&self) -> WireValue {
		WireValue::ValueCollection(self.iter().map(ToWireValue::to_wire_value).collect())
	}
}
impl<T: FromWireValue> FromWireValue for Vec<T> {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok(Vec::new()),
			Some(WireValue::ValueCollection(items)) => items.iter().map(|v| T::from_wire_value(Some(v))).collect(),
			Some(other) => Err(Error::Converter { from: other.physical_kind(), to: "Vec<T>".into(), reason: "expected a value collection".into() }),
		}
	}
}
impl<T: WireSchema> WireSchema for Vec<T> {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::ValueCollection
	}
	fn type_name() -> Box<str> {
		format!("Vec<{}>", T::type_name()).into()
	}
}

impl<K: ToWireValue, V: ToWireValue> ToWireValue for HashMap<K, V> {
	fn to_wire_value(&self) -> WireValue {
		WireValue::KeyValueCollection(self.iter().map(|(k, v)| (k.to_wire_value(), v.to_wire_value())).collect())
	}
}
impl<K: FromWireValue + Eq + std::hash::Hash, V: FromWireValue> FromWireValue for HashMap<K, V> {
	fn from_wire_value(value: Option<&WireValue>) -> Result<Self> {
		match value {
			None | Some(WireValue::Null) => Ok(HashMap::new()),
			Some(WireValue::KeyValueCollection(entries)) => entries
				.iter()
				.map(|(k, v)| Ok((K::from_wire_value(Some(k))?, V::from_wire_value(Some(v))?)))
				.collect(),
			Some(other) => Err(Error::Converter { from: other.physical_kind(), to: "HashMap<K, V>".into(), reason: "expected a key-value collection".into() }),
		}
	}
}
impl<K: WireSchema, V: WireSchema> WireSchema for HashMap<K, V> {
	fn descriptor_kind() -> DescriptorKind {
		DescriptorKind::KeyValueCollection
	}
	fn type_name() -> Box<str> {
		format!("HashMap<{}, {}>", K::type_name(), V::type_name()).into()
	}
}
