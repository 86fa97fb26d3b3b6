use crate::dispatch::MemberPath;
use crate::registry::{MemberFlags, TypeId};
use crate::value::WireValue;

/// Resolves a `ConfigRef`/`ConfigData` key to the item it names.
/// Implementations typically look the key up in a content-addressed table
/// built once at load time.
pub trait Resolver {
	fn resolve(&self, target: TypeId, key: &WireValue) -> Option<WireValue>;
}

/// Shared options threaded through one encode/decode/traverse call. Bounds
/// default to unlimited; callers that accept untrusted input should set them.
pub struct Context<'r> {
	pub logic_version: Option<i32>,
	pub exclude_flags: MemberFlags,
	pub max_collection_size: usize,
	pub max_string_size: usize,
	pub max_byte_array_size: usize,
	pub resolver: Option<&'r dyn Resolver>,
	pub(crate) path: MemberPath,
}

impl<'r> Context<'r> {
	pub fn new() -> Self {
		Self {
			logic_version: None,
			exclude_flags: MemberFlags::empty(),
			max_collection_size: usize::MAX,
			max_string_size: usize::MAX,
			max_byte_array_size: usize::MAX,
			resolver: None,
			path: MemberPath::new(),
		}
	}

	pub fn with_logic_version(mut self, version: i32) -> Self {
		self.logic_version = Some(version);
		self
	}

	pub fn with_exclude_flags(mut self, flags: MemberFlags) -> Self {
		self.exclude_flags = flags;
		self
	}

	pub fn with_max_collection_size(mut self, max: usize) -> Self {
		self.max_collection_size = max;
		self
	}

	pub fn with_max_string_size(mut self, max: usize) -> Self {
		self.max_string_size = max;
		self
	}

	pub fn with_max_byte_array_size(mut self, max: usize) -> Self {
		self.max_byte_array_size = max;
		self
	}

	pub fn with_resolver(mut self, resolver: &'r dyn Resolver) -> Self {
		self.resolver = Some(resolver);
		self
	}

	pub fn path(&self) -> &MemberPath {
		&self.path
	}
}

impl<'r> Default for Context<'r> {
	fn default() -> Self {
		Self::new()
	}
}

/// The same context type serves both directions; these aliases exist only
/// to keep call sites self-documenting.
pub type EncodeContext<'r> = Context<'r>;
pub type DecodeContext<'r> = Context<'r>;
