use std::fmt::{Debug, Formatter};

use schema_derive::WireRepr;

/// The physical tag byte that prefixes a value on the wire.
///
/// Relative order and discriminants are part of the wire contract: adding a
/// variant in the middle would break every previously-encoded stream, so new
/// kinds are only ever appended before `Invalid`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, WireRepr)]
#[repr(u8)]
pub enum WireKind {
	Null = 0,
	VarInt = 1,
	VarInt128 = 2,
	F32 = 3,
	F32Vec2 = 4,
	F32Vec3 = 5,
	F64 = 6,
	F64Vec2 = 7,
	F64Vec3 = 8,
	Float32 = 9,
	Float64 = 10,
	String = 11,
	Bytes = 12,
	MetaGuid = 13,
	AbstractStruct = 14,
	NullableStruct = 15,
	Struct = 16,
	ValueCollection = 17,
	KeyValueCollection = 18,
	NullableVarInt = 19,
	NullableVarInt128 = 20,
	NullableF32 = 21,
	NullableF32Vec2 = 22,
	NullableF32Vec3 = 23,
	NullableF64 = 24,
	NullableF64Vec2 = 25,
	NullableF64Vec3 = 26,
	NullableFloat32 = 27,
	NullableFloat64 = 28,
	NullableMetaGuid = 29,
	EndStruct = 30,
	ObjectTable = 31,
	Invalid = 32,
}

impl Debug for WireKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			WireKind::Null => "Null",
			WireKind::VarInt => "VarInt",
			WireKind::VarInt128 => "VarInt128",
			WireKind::F32 => "F32",
			WireKind::F32Vec2 => "F32Vec2",
			WireKind::F32Vec3 => "F32Vec3",
			WireKind::F64 => "F64",
			WireKind::F64Vec2 => "F64Vec2",
			WireKind::F64Vec3 => "F64Vec3",
			WireKind::Float32 => "Float32",
			WireKind::Float64 => "Float64",
			WireKind::String => "String",
			WireKind::Bytes => "Bytes",
			WireKind::MetaGuid => "MetaGuid",
			WireKind::AbstractStruct => "AbstractStruct",
			WireKind::NullableStruct => "NullableStruct",
			WireKind::Struct => "Struct",
			WireKind::ValueCollection => "ValueCollection",
			WireKind::KeyValueCollection => "KeyValueCollection",
			WireKind::NullableVarInt => "NullableVarInt",
			WireKind::NullableVarInt128 => "NullableVarInt128",
			WireKind::NullableF32 => "NullableF32",
			WireKind::NullableF32Vec2 => "NullableF32Vec2",
			WireKind::NullableF32Vec3 => "NullableF32Vec3",
			WireKind::NullableF64 => "NullableF64",
			WireKind::NullableF64Vec2 => "NullableF64Vec2",
			WireKind::NullableF64Vec3 => "NullableF64Vec3",
			WireKind::NullableFloat32 => "NullableFloat32",
			WireKind::NullableFloat64 => "NullableFloat64",
			WireKind::NullableMetaGuid => "NullableMetaGuid",
			WireKind::EndStruct => "EndStruct",
			WireKind::ObjectTable => "ObjectTable",
			WireKind::Invalid => "Invalid",
		};
		f.write_str(name)
	}
}

impl WireKind {
	#[inline]
	pub fn to_byte(self) -> u8 {
		self as u8
	}

	#[inline]
	pub fn from_byte(byte: u8) -> Option<Self> {
		Self::from_repr(byte)
	}

	/// The nullable physical kind that wraps this one, if any. Used by the
	/// descriptor builder when a `Nullable<T>` wraps a fixed/varint primitive.
	pub fn nullable_counterpart(self) -> Option<WireKind> {
		Some(match self {
			WireKind::VarInt => WireKind::NullableVarInt,
			WireKind::VarInt128 => WireKind::NullableVarInt128,
			WireKind::F32 => WireKind::NullableF32,
			WireKind::F32Vec2 => WireKind::NullableF32Vec2,
			WireKind::F32Vec3 => WireKind::NullableF32Vec3,
			WireKind::F64 => WireKind::NullableF64,
			WireKind::F64Vec2 => WireKind::NullableF64Vec2,
			WireKind::F64Vec3 => WireKind::NullableF64Vec3,
			WireKind::Float32 => WireKind::NullableFloat32,
			WireKind::Float64 => WireKind::NullableFloat64,
			WireKind::MetaGuid => WireKind::NullableMetaGuid,
			_ => return None,
		})
	}
}

/// The shape of a fixed or variable-length primitive value, independent of
/// nullability. Drives both the physical [`WireKind`] chosen for a
/// descriptor and the in-memory representation inside [`crate::value::WireValue`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveKind {
	Bool,
	Int8,
	Int16,
	Int32,
	Int64,
	UInt8,
	UInt16,
	UInt32,
	UInt64,
	UInt128,
	Char,
	F32,
	F32Vec2,
	F32Vec3,
	F64,
	F64Vec2,
	F64Vec3,
	Float32,
	Float64,
	MetaGuid,
}

impl PrimitiveKind {
	/// True for the zig-zag-encoded signed integer family.
	pub fn is_zigzag(self) -> bool {
		matches!(self, PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Int64)
	}

	/// The physical wire kind a value of this shape is framed with.
	pub fn physical(self) -> WireKind {
		match self {
			PrimitiveKind::Bool
			| PrimitiveKind::Int8
			| PrimitiveKind::Int16
			| PrimitiveKind::Int32
			| PrimitiveKind::Int64
			| PrimitiveKind::UInt8
			| PrimitiveKind::UInt16
			| PrimitiveKind::UInt32
			| PrimitiveKind::UInt64
			| PrimitiveKind::Char => WireKind::VarInt,
			PrimitiveKind::UInt128 => WireKind::VarInt128,
			PrimitiveKind::F32 => WireKind::F32,
			PrimitiveKind::F32Vec2 => WireKind::F32Vec2,
			PrimitiveKind::F32Vec3 => WireKind::F32Vec3,
			PrimitiveKind::F64 => WireKind::F64,
			PrimitiveKind::F64Vec2 => WireKind::F64Vec2,
			PrimitiveKind::F64Vec3 => WireKind::F64Vec3,
			PrimitiveKind::Float32 => WireKind::Float32,
			PrimitiveKind::Float64 => WireKind::Float64,
			PrimitiveKind::MetaGuid => WireKind::MetaGuid,
		}
	}

	/// The nullable physical wire kind, e.g. for a `Nullable<T>` member.
	pub fn nullable_physical(self) -> WireKind {
		self.physical().nullable_counterpart().expect("every primitive physical kind has a nullable counterpart")
	}
}
