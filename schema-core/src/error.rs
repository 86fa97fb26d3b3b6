use std::fmt::{Display, Formatter};

use crate::dispatch::MemberPath;
use crate::wire::WireKind;

/// The single tagged error type surfaced by every public entry point.
///
/// Scan-time failures (`Schema`, `DuplicateTypeCode`) are fatal to registry
/// construction. Everything else is a runtime failure raised while encoding,
/// decoding or traversing a value against an already-frozen [`Registry`](crate::registry::Registry).
#[derive(Debug)]
pub enum Error {
	Schema(SchemaError),
	DuplicateTypeCode {
		root: Box<str>,
		type_code: i32,
	},
	UnknownDerivedType {
		root: Box<str>,
		type_code: i32,
	},
	WireKindMismatch {
		expected: WireKind,
		found: WireKind,
		path: MemberPath,
	},
	BoundExceeded {
		bound: BoundKind,
		limit: usize,
		actual: usize,
		path: MemberPath,
	},
	Integrity(IntegrityError),
	MemberDeserialization {
		type_name: Box<str>,
		member: Box<str>,
		tag_id: i32,
		source: Box<Error>,
	},
	Converter {
		from: WireKind,
		to: Box<str>,
		reason: Box<str>,
	},
	Io(std::io::Error),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BoundKind {
	CollectionSize,
	StringLength,
	ByteArrayLength,
}

impl Display for BoundKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			BoundKind::CollectionSize => write!(f, "collection size"),
			BoundKind::StringLength => write!(f, "string length"),
			BoundKind::ByteArrayLength => write!(f, "byte array length"),
		}
	}
}

/// Decode-time malformed-stream conditions: a negative count other than -1,
/// a nonpositive struct tag, or a presence byte other than 0/2 (nullable
/// primitives) or 0/1 (nullable structs).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IntegrityError {
	NegativeCollectionLength(i64),
	NonPositiveTagId(i32),
	InvalidPresenceByte(u8),
	InvalidTypeCode(i32),
}

impl Display for IntegrityError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			IntegrityError::NegativeCollectionLength(n) => {
				write!(f, "negative collection length {n} (only -1 is valid for null)")
			}
			IntegrityError::NonPositiveTagId(tag) => write!(f, "nonpositive member tag id {tag}"),
			IntegrityError::InvalidPresenceByte(b) => write!(f, "invalid presence byte {b:#x}"),
			IntegrityError::InvalidTypeCode(code) => write!(f, "invalid type code {code}"),
		}
	}
}

/// Failure in the Schema Scanner. Wraps a chain of `(type, parent-type-chain)`
/// breadcrumbs ending at the type that originally failed; unwinding keeps the
/// outermost failing type stable as errors bubble up through nested wraps.
#[derive(Debug)]
pub struct SchemaError {
	pub kind: SchemaErrorKind,
	pub breadcrumbs: Vec<Box<str>>,
}

impl SchemaError {
	pub fn new(kind: SchemaErrorKind, type_name: impl Into<Box<str>>) -> Self {
		Self { kind, breadcrumbs: vec![type_name.into()] }
	}

	/// Wraps this error with an additional ancestor on the breadcrumb chain.
	/// The originally failing type (the innermost breadcrumb) never moves.
	pub fn wrap(mut self, parent_type_name: impl Into<Box<str>>) -> Self {
		self.breadcrumbs.push(parent_type_name.into());
		self
	}
}

#[derive(Debug)]
pub enum SchemaErrorKind {
	OverlappingReservedRanges { a: Box<str>, b: Box<str> },
	BlockedTagReuse { tag_id: i32 },
	TagIdCollision { tag_id: i32, first: Box<str>, second: Box<str> },
	TagOutsideReservation { tag_id: i32 },
	UnreachableConfigRef { path: Box<str> },
	MissingSerializableAnnotation,
	MissingZeroArgConstructor,
	OverridableMemberNotSealed { member: Box<str> },
	DuplicateMemberName { member: Box<str> },
	ImplicitRangeOverlap { a: Box<str>, b: Box<str> },
	AmbiguousTagId { member: Box<str>, explicit: i32, implicit: i32 },
	DuplicateTypeCodeInHierarchy { type_code: i32 },
	NonAbstractBaseClass { base: Box<str> },
	TupleArityExceeded { arity: usize },
	MissingNullSentinel,
	ConflictingSerializableDeclarations,
}

impl Display for SchemaErrorKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			SchemaErrorKind::OverlappingReservedRanges { a, b } => {
				write!(f, "reserved ranges of `{a}` and `{b}` overlap")
			}
			SchemaErrorKind::BlockedTagReuse { tag_id } => write!(f, "tag id {tag_id} lies in a blocked range"),
			SchemaErrorKind::TagIdCollision { tag_id, first, second } => {
				write!(f, "tag id {tag_id} is used by both `{first}` and `{second}`")
			}
			SchemaErrorKind::TagOutsideReservation { tag_id } => {
				write!(f, "tag id {tag_id} does not lie in any reservation of its declaring type")
			}
			SchemaErrorKind::UnreachableConfigRef { path } => {
				write!(f, "ConfigRef reached through a non-serialized path: {path}")
			}
			SchemaErrorKind::MissingSerializableAnnotation => write!(f, "type requires a serializable annotation"),
			SchemaErrorKind::MissingZeroArgConstructor => {
				write!(f, "type has no zero-argument constructor and no deserialization constructor")
			}
			SchemaErrorKind::OverridableMemberNotSealed { member } => {
				write!(f, "member override `{member}` must be sealed")
			}
			SchemaErrorKind::DuplicateMemberName { member } => {
				write!(f, "member name `{member}` is reused by an unrelated declaration")
			}
			SchemaErrorKind::ImplicitRangeOverlap { a, b } => {
				write!(f, "implicit tag ranges of `{a}` and `{b}` overlap")
			}
			SchemaErrorKind::AmbiguousTagId { member, explicit, implicit } => {
				write!(f, "member `{member}` declares tag {explicit} but its implicit range would assign {implicit}")
			}
			SchemaErrorKind::DuplicateTypeCodeInHierarchy { type_code } => {
				write!(f, "type code {type_code} is used by more than one concrete type in the hierarchy")
			}
			SchemaErrorKind::NonAbstractBaseClass { base } => {
				write!(f, "`{base}` is not abstract and cannot be derived from")
			}
			SchemaErrorKind::TupleArityExceeded { arity } => {
				write!(f, "tuple arity {arity} exceeds the maximum of 7 elements")
			}
			SchemaErrorKind::MissingNullSentinel => {
				write!(f, "ConfigData key type is not nullable and declares no null sentinel")
			}
			SchemaErrorKind::ConflictingSerializableDeclarations => {
				write!(f, "type carries mutually conflicting serializable declarations")
			}
		}
	}
}

impl Display for SchemaError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.kind)?;
		if !self.breadcrumbs.is_empty() {
			write!(f, " (in ")?;
			for (i, b) in self.breadcrumbs.iter().enumerate() {
				if i > 0 {
					write!(f, " <- ")?;
				}
				write!(f, "{b}")?;
			}
			write!(f, ")")?;
		}
		Ok(())
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::Schema(e) => Display::fmt(e, f),
			Error::DuplicateTypeCode { root, type_code } => {
				write!(f, "type code {type_code} is already taken under abstract root `{root}`")
			}
			Error::UnknownDerivedType { root, type_code } => {
				write!(f, "unknown derived type code {type_code} for abstract root `{root}`")
			}
			Error::WireKindMismatch { expected, found, path } => {
				write!(f, "expected wire kind {expected:?}, found {found:?} at {path}")
			}
			Error::BoundExceeded { bound, limit, actual, path } => {
				write!(f, "{bound} {actual} exceeds the configured maximum of {limit} at {path}")
			}
			Error::Integrity(e) => Display::fmt(e, f),
			Error::MemberDeserialization { type_name, member, tag_id, source } => {
				write!(f, "failed to deserialize member `{member}` (tag {tag_id}) of `{type_name}`: {source}")
			}
			Error::Converter { from, to, reason } => {
				write!(f, "converter from {from:?} to `{to}` failed: {reason}")
			}
			Error::Io(e) => Display::fmt(e, f),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(value: std::io::Error) -> Self {
		Self::Io(value)
	}
}

impl From<SchemaError> for Error {
	fn from(value: SchemaError) -> Self {
		Self::Schema(value)
	}
}

impl From<IntegrityError> for Error {
	fn from(value: IntegrityError) -> Self {
		Self::Integrity(value)
	}
}

pub type Result<T> = std::result::Result<T, Error>;
