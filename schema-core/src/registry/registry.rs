use std::sync::Arc;

use fxhash::FxHashMap;

use crate::registry::descriptor::{TypeDescriptor, TypeId};

/// The frozen, `Send + Sync` result of a successful
/// [`Scanner::build`](crate::scanner::Scanner::build). Every lookup is O(1);
/// nothing inside mutates after construction, so shared references may be
/// handed to any number of threads encoding or decoding distinct values
/// concurrently.
#[derive(Debug)]
pub struct Registry {
	types: Vec<Arc<TypeDescriptor>>,
	by_name: FxHashMap<Box<str>, TypeId>,
	by_root_code: FxHashMap<(TypeId, i32), TypeId>,
	protocol_hash: u32,
}

impl Registry {
	pub(crate) fn new(types: Vec<Arc<TypeDescriptor>>, protocol_hash: u32) -> Self {
		let mut by_name = FxHashMap::default();
		let mut by_root_code = FxHashMap::default();
		for t in &types {
			by_name.insert(t.name.clone(), t.id);
			if let (Some(root), Some(code)) = (t.abstract_root, t.type_code) {
				by_root_code.insert((root, code), t.id);
			}
		}
		Self { types, by_name, by_root_code, protocol_hash }
	}

	/// Panics if `id` was not produced by this registry. Internal dispatch
	/// code relies on this invariant to avoid threading `Option` everywhere;
	/// external callers should prefer [`Registry::try_get`].
	pub fn get(&self, id: TypeId) -> &Arc<TypeDescriptor> {
		&self.types[id.index()]
	}

	pub fn try_get(&self, id: TypeId) -> Option<&Arc<TypeDescriptor>> {
		self.types.get(id.index())
	}

	pub fn by_name(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
		self.by_name.get(name).map(|id| self.get(*id))
	}

	/// Resolves a concrete leaf type given the abstract root it was declared
	/// under and the `type_code` found on the wire.
	pub fn resolve_derived(&self, root: TypeId, type_code: i32) -> Option<&Arc<TypeDescriptor>> {
		self.by_root_code.get(&(root, type_code)).map(|id| self.get(*id))
	}

	pub fn all(&self) -> &[Arc<TypeDescriptor>] {
		&self.types
	}

	/// Deterministic hash over every non-`Hidden` member's name, tag id and
	/// wire kind across the whole registry. Two builds with the same schema
	/// (even across process restarts) always agree on this value.
	pub fn protocol_hash(&self) -> u32 {
		self.protocol_hash
	}
}
