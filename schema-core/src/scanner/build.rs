//! Schema Scanner: turns a flat list of
//! [`TypeSpec`]s into a frozen [`Registry`] or a precise [`SchemaError`].
//!
//! This crate has no runtime reflection to walk — every type is named up
//! front by its author (directly, or via `#[derive(Serializable)]`'s
//! [`Describe`] impl), so "discovery" collapses to resolving name references
//! inside one flat list instead of walking a live object graph.
//! Pre-registration of every name happens before any cross-reference is
//! resolved, so cyclic member graphs terminate for free.

use std::ops::Range;

use fxhash::FxHashMap;

use crate::error::{Result, SchemaError, SchemaErrorKind};
use crate::registry::{hash, DescriptorKind, MemberDescriptor, MemberFlags, Registry, TypeDescriptor, TypeId};
use crate::scanner::spec::{RecordRole, RecordSpec, TypeSpec};
use crate::value::WireSchema;
use crate::wire::{PrimitiveKind, WireKind};

const MAX_TUPLE_ARITY: usize = 7;

/// Entry point for the Schema Scanner. A unit struct purely so call sites
/// read as `Scanner::build(...)`.
pub struct Scanner;

impl Scanner {
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn build(specs: Vec<TypeSpec>, public_prefixes: &[&str]) -> Result<Registry> {
		Builder::new(public_prefixes).run(specs)
	}
}

struct Builder<'a> {
	public_prefixes: &'a [&'a str],
	by_name: FxHashMap<Box<str>, TypeId>,
	descriptors: Vec<TypeDescriptor>,
}

macro_rules! seed_builtin {
	($self:ident, $ty:ty) => {
		$self.seed_primitive(<$ty as WireSchema>::type_name(), <$ty as WireSchema>::descriptor_kind())
	};
}

impl<'a> Builder<'a> {
	fn new(public_prefixes: &'a [&'a str]) -> Self {
		Self { public_prefixes, by_name: FxHashMap::default(), descriptors: Vec::new() }
	}

	fn run(mut self, specs: Vec<TypeSpec>) -> Result<Registry> {
		self.seed_builtins();
		self.allocate(&specs)?;
		self.resolve(&specs)?;
		self.propagate_public();
		self.compute_contains_ref();
		let protocol_hash = hash::protocol_hash(self.descriptors.iter());
		Ok(Registry::new(self.descriptors.into_iter().map(std::sync::Arc::new).collect(), protocol_hash))
	}

	fn next_id(&self) -> TypeId {
		TypeId::new(self.descriptors.len() as u32)
	}

	fn seed_primitive(&mut self, name: Box<str>, kind: DescriptorKind) {
		let id = self.next_id();
		let physical = kind.self_contained_physical().expect("builtin kinds are self-contained");
		self.by_name.insert(name.clone(), id);
		self.descriptors.push(blank_descriptor(id, name, kind, physical));
	}

	fn seed_builtins(&mut self) {
		seed_builtin!(self, i8);
		seed_builtin!(self, i16);
		seed_builtin!(self, i32);
		seed_builtin!(self, i64);
		seed_builtin!(self, u8);
		seed_builtin!(self, u16);
		seed_builtin!(self, u32);
		seed_builtin!(self, u64);
		seed_builtin!(self, u128);
		seed_builtin!(self, bool);
		seed_builtin!(self, char);
		seed_builtin!(self, f32);
		seed_builtin!(self, f64);
		seed_builtin!(self, [f32; 2]);
		seed_builtin!(self, [f32; 3]);
		seed_builtin!(self, [f64; 2]);
		seed_builtin!(self, [f64; 3]);
		seed_builtin!(self, uuid::Uuid);
		seed_builtin!(self, String);
		seed_builtin!(self, crate::value::ByteBuf);
	}

	/// Reserves a [`TypeId`] for every spec before any resolution runs, so
	/// member/element/key name lookups always succeed regardless of
	/// declaration order, including self-references.
	fn allocate(&mut self, specs: &[TypeSpec]) -> Result<()> {
		for spec in specs {
			let name: Box<str> = spec.name().into();
			if self.by_name.contains_key(&name) {
				return Err(SchemaError::new(SchemaErrorKind::ConflictingSerializableDeclarations, name).into());
			}
			let id = self.next_id();
			self.by_name.insert(name.clone(), id);
			self.descriptors.push(blank_descriptor(id, name, DescriptorKind::Struct, WireKind::Invalid));
		}
		Ok(())
	}

	fn lookup(&self, name: &str, requested_by: &str) -> Result<TypeId> {
		self.by_name.get(name).copied().ok_or_else(|| {
			SchemaError::new(SchemaErrorKind::MissingSerializableAnnotation, name.to_string()).wrap(requested_by.to_string()).into()
		})
	}

	fn find_record<'s>(&self, specs: &'s [TypeSpec], name: &str) -> Option<&'s RecordSpec> {
		specs.iter().find_map(|s| match s {
			TypeSpec::Record(r) if &*r.name == name => Some(r),
			_ => None,
		})
	}

	fn resolve(&mut self, specs: &[TypeSpec]) -> Result<()> {
		for spec in specs {
			let id = self.by_name[spec.name()];
			let descriptor = match spec {
				TypeSpec::Nullable { name, inner } => self.resolve_nullable(name, inner, id)?,
				TypeSpec::ValueCollection { name, element, max_size } => {
					self.resolve_value_collection(name, element, *max_size, id)?
				},
				TypeSpec::KeyValueCollection { name, key, value, max_size } => {
					self.resolve_key_value_collection(name, key, value, *max_size, id)?
				},
				TypeSpec::Enum { name, underlying, values } => self.resolve_enum(name, *underlying, values, id)?,
				TypeSpec::StringId { name } => blank_descriptor(id, name.clone(), DescriptorKind::StringId, WireKind::String),
				TypeSpec::DynamicEnum { name } => blank_descriptor(id, name.clone(), DescriptorKind::DynamicEnum, WireKind::VarInt),
				TypeSpec::Record(r) => self.resolve_record(specs, r, id)?,
				TypeSpec::ConfigRef { name, key } => self.resolve_config_ref(name, key, id)?,
				TypeSpec::ConfigData { name, key, null_sentinel } => {
					self.resolve_config_data(name, key, null_sentinel.clone(), id)?
				},
				TypeSpec::ConfigDataContent { name, inner } => self.resolve_config_data_content(name, inner, id)?,
			};
			self.descriptors[id.index()] = descriptor;
		}
		// Abstract roots' `derived` lists are populated from the concrete
		// side (each concrete leaf's `abstract_root` points up); fill the
		// reverse edge once every descriptor exists.
		self.link_derived_types(specs)?;
		Ok(())
	}

	fn resolve_nullable(&self, name: &str, inner: &str, id: TypeId) -> Result<TypeDescriptor> {
		let inner_id = self.lookup(inner, name)?;
		let inner_desc = &self.descriptors[inner_id.index()];
		let (kind, physical) = nullable_wrap(inner_desc);
		let mut d = blank_descriptor(id, name.into(), kind, physical);
		d.element_type = Some(inner_id);
		Ok(d)
	}

	fn resolve_value_collection(&self, name: &str, element: &str, max_size: Option<usize>, id: TypeId) -> Result<TypeDescriptor> {
		let element_id = self.lookup(element, name)?;
		let mut d = blank_descriptor(id, name.into(), DescriptorKind::ValueCollection, WireKind::ValueCollection);
		d.element_type = Some(element_id);
		let _ = max_size; // collection-level bound is enforced via context, not a descriptor field
		Ok(d)
	}

	fn resolve_key_value_collection(
		&self,
		name: &str,
		key: &str,
		value: &str,
		max_size: Option<usize>,
		id: TypeId,
	) -> Result<TypeDescriptor> {
		let key_id = self.lookup(key, name)?;
		let value_id = self.lookup(value, name)?;
		let mut d = blank_descriptor(id, name.into(), DescriptorKind::KeyValueCollection, WireKind::KeyValueCollection);
		d.key_type = Some(key_id);
		d.element_type = Some(value_id);
		let _ = max_size;
		Ok(d)
	}

	fn resolve_enum(&self, name: &str, underlying: PrimitiveKind, values: &[(Box<str>, i64)], _id: TypeId) -> Result<TypeDescriptor> {
		let mut seen = std::collections::HashSet::new();
		for (_, v) in values {
			if !seen.insert(*v) {
				return Err(SchemaError::new(SchemaErrorKind::TagIdCollision { tag_id: *v as i32, first: name.into(), second: name.into() }, name.to_string()).into());
			}
		}
		Ok(blank_descriptor(_id, name.into(), DescriptorKind::Enum { underlying }, underlying.physical()))
	}

	fn resolve_config_ref(&self, name: &str, key: &str, id: TypeId) -> Result<TypeDescriptor> {
		let key_id = self.lookup(key, name)?;
		let physical = self.descriptors[key_id.index()].physical_kind;
		let mut d = blank_descriptor(id, name.into(), DescriptorKind::ConfigRef, physical);
		d.key_type = Some(key_id);
		Ok(d)
	}

	fn resolve_config_data(&self, name: &str, key: &str, null_sentinel: Option<crate::value::WireValue>, id: TypeId) -> Result<TypeDescriptor> {
		let key_id = self.lookup(key, name)?;
		let key_desc = &self.descriptors[key_id.index()];
		let key_is_nullable = matches!(
			key_desc.wire_kind,
			DescriptorKind::NullablePrimitive(_) | DescriptorKind::NullableEnum { .. } | DescriptorKind::NullableStruct | DescriptorKind::String
		);
		if !key_is_nullable && null_sentinel.is_none() {
			return Err(SchemaError::new(SchemaErrorKind::MissingNullSentinel, name.to_string()).into());
		}
		let mut d = blank_descriptor(id, name.into(), DescriptorKind::ConfigData, key_desc.physical_kind);
		d.key_type = Some(key_id);
		d.null_sentinel_key = null_sentinel;
		Ok(d)
	}

	fn resolve_config_data_content(&self, name: &str, inner: &str, id: TypeId) -> Result<TypeDescriptor> {
		let inner_id = self.lookup(inner, name)?;
		let inner_desc = &self.descriptors[inner_id.index()];
		let mut d = blank_descriptor(id, name.into(), DescriptorKind::ConfigDataContent, inner_desc.physical_kind);
		d.element_type = Some(inner_id);
		Ok(d)
	}

	fn ancestor_chain<'s>(&self, specs: &'s [TypeSpec], r: &'s RecordSpec) -> Vec<&'s RecordSpec> {
		let mut chain = Vec::new();
		for base in &r.bases {
			if let Some(b) = self.find_record(specs, base) {
				chain.push(b);
			}
		}
		if let Some(root) = &r.abstract_root {
			if !r.bases.iter().any(|b| &**b == &**root) {
				if let Some(b) = self.find_record(specs, root) {
					chain.push(b);
				}
			}
		}
		chain
	}

	fn resolve_record(&self, specs: &[TypeSpec], r: &RecordSpec, id: TypeId) -> Result<TypeDescriptor> {
		if r.role == RecordRole::Concrete {
			if let Some(root) = &r.abstract_root {
				match self.find_record(specs, root) {
					Some(root_spec) if root_spec.role == RecordRole::AbstractRoot => {},
					_ => return Err(SchemaError::new(SchemaErrorKind::NonAbstractBaseClass { base: root.clone() }, r.name.to_string()).into()),
				}
				if !matches!(r.type_code, Some(tc) if tc > 0) {
					return Err(SchemaError::new(SchemaErrorKind::DuplicateTypeCodeInHierarchy { type_code: r.type_code.unwrap_or(0) }, r.name.to_string()).into());
				}
			}
		}

		if r.is_tuple && r.members.len() > MAX_TUPLE_ARITY {
			return Err(SchemaError::new(SchemaErrorKind::TupleArityExceeded { arity: r.members.len() }, r.name.to_string()).into());
		}

		let chain = self.ancestor_chain(specs, r);

		// Reserved ranges must not overlap pairwise across the whole chain,
		// including `r` itself.
		let mut all_reserved: Vec<(&str, &Range<i32>)> = Vec::new();
		for anc in chain.iter().chain(std::iter::once(&r)) {
			for range in &anc.reserved_ranges {
				all_reserved.push((&anc.name, range));
			}
		}
		for i in 0..all_reserved.len() {
			for j in (i + 1)..all_reserved.len() {
				let (name_a, ra) = all_reserved[i];
				let (name_b, rb) = all_reserved[j];
				if name_a != name_b && ranges_overlap(ra, rb) {
					return Err(SchemaError::new(
						SchemaErrorKind::OverlappingReservedRanges { a: name_a.into(), b: name_b.into() },
						r.name.to_string(),
					)
					.into());
				}
			}
		}

		// Collect (tag_id, name, declaring type, declaring type's own
		// reservations/blocked ranges) across the full hierarchy.
		struct Declared<'s> {
			spec: &'s crate::scanner::spec::MemberSpec,
			declaring: &'s str,
		}
		let mut declared: Vec<Declared> = Vec::new();
		for anc in chain.iter().chain(std::iter::once(&r)) {
			for m in &anc.members {
				declared.push(Declared { spec: m, declaring: &anc.name });
			}
		}

		if r.is_tuple {
			// Tuple members get implicit sequential tag ids; ignore any
			// explicit tag the author supplied.
		}

		// Keyed by tag id to `(declaring type, member name)`: a tag may only be
		// reused by the exact same member slot (the inherited-override
		// pattern), never by a second, differently
		// named member — whether that member lives on an ancestor or is a
		// second field of `r` itself reusing the same explicit tag id.
		let mut seen_tags: FxHashMap<i32, (&str, &str)> = FxHashMap::default();
		let mut seen_names: FxHashMap<&str, i32> = FxHashMap::default();
		let mut members = Vec::with_capacity(declared.len());
		for (idx, d) in declared.iter().enumerate() {
			let tag_id = if r.is_tuple { (idx + 1) as i32 } else { d.spec.tag_id };

			if let Some((first_declaring, first_name)) = seen_tags.get(&tag_id) {
				if *first_name != d.spec.name.as_ref() {
					return Err(SchemaError::new(
						SchemaErrorKind::TagIdCollision { tag_id, first: (*first_declaring).into(), second: d.declaring.into() },
						r.name.to_string(),
					)
					.into());
				}
			}
			seen_tags.insert(tag_id, (d.declaring, &d.spec.name));

			if let Some(prev_tag) = seen_names.get(d.spec.name.as_ref()) {
				if *prev_tag != tag_id {
					return Err(SchemaError::new(SchemaErrorKind::DuplicateMemberName { member: d.spec.name.clone() }, r.name.to_string()).into());
				}
			}
			seen_names.insert(&d.spec.name, tag_id);

			for anc in chain.iter().chain(std::iter::once(&r)) {
				for blocked in &anc.blocked_ranges {
					if blocked.contains(&tag_id) {
						return Err(SchemaError::new(SchemaErrorKind::BlockedTagReuse { tag_id }, r.name.to_string()).into());
					}
				}
			}

			let declaring_spec = chain.iter().chain(std::iter::once(&r)).find(|a| &*a.name == d.declaring).expect("declaring type is in chain");
			if !declaring_spec.allow_non_reserved && !declaring_spec.reserved_ranges.is_empty() {
				let in_range = declaring_spec.reserved_ranges.iter().any(|rr| rr.contains(&tag_id));
				if !in_range {
					return Err(SchemaError::new(SchemaErrorKind::TagOutsideReservation { tag_id }, r.name.to_string()).into());
				}
			}

			// A collection-kind member names its element (and key) types, not
			// the collection type itself — the collection has to be its own
			// registered `TypeSpec` (its descriptor carries the element/key
			// ids the dispatch engine reads at encode/decode time), found
			// under the same synthesized name `<T as WireSchema>::type_name`
			// produces for `Vec<T>`/`HashMap<K, V>`.
			let lookup_name: Box<str> = match d.spec.descriptor_kind {
				DescriptorKind::ValueCollection => format!("Vec<{}>", d.spec.element_type).into(),
				DescriptorKind::KeyValueCollection => {
					let key_name = d.spec.key_type.as_deref().unwrap_or("");
					format!("HashMap<{}, {}>", key_name, d.spec.element_type).into()
				},
				_ => d.spec.element_type.clone(),
			};
			let member_type = self.lookup(&lookup_name, &r.name).ok();
			let key_type = match &d.spec.key_type {
				Some(k) => Some(self.lookup(k, &r.name)?),
				None => None,
			};
			let member_type_desc = member_type.map(|id| &self.descriptors[id.index()]);
			let (wire_kind, physical_kind) = resolved_kind_for(d.spec.descriptor_kind, member_type_desc);

			let mut flags = MemberFlags::empty();
			if d.spec.hidden {
				flags |= MemberFlags::HIDDEN;
			}
			if d.spec.exclude_from_game_state {
				flags |= MemberFlags::EXCLUDE_FROM_GAME_STATE;
			}

			members.push(MemberDescriptor {
				name: d.spec.name.clone(),
				tag_id,
				flags,
				wire_kind,
				physical_kind,
				member_type,
				declared_type_name: d.spec.element_type.clone(),
				version_window: d.spec.version_window,
				max_collection_size: d.spec.max_collection_size,
				converters: d.spec.converters.clone(),
				substitute: d.spec.substitute,
			});

			let _ = key_type;
		}
		members.sort_by_key(|m| m.tag_id);

		let wire_kind = if r.role == RecordRole::AbstractRoot { DescriptorKind::AbstractStruct } else { DescriptorKind::Struct };
		let physical_kind = if r.role == RecordRole::AbstractRoot { WireKind::AbstractStruct } else { WireKind::Struct };

		let mut d = blank_descriptor(id, r.name.clone(), wire_kind, physical_kind);
		d.members = members;
		d.reserved_ranges = r.reserved_ranges.iter().map(|r| (r.start, r.end)).collect();
		d.blocked_tags = r.blocked_ranges.iter().flat_map(|r| r.clone()).collect();
		d.on_deserialized_hooks = r.on_deserialized.clone();
		if let Some(root) = &r.abstract_root {
			d.abstract_root = Some(self.lookup(root, &r.name)?);
			d.type_code = r.type_code;
		}
		Ok(d)
	}

	fn link_derived_types(&mut self, specs: &[TypeSpec]) -> Result<()> {
		let mut by_root: FxHashMap<TypeId, Vec<(i32, TypeId)>> = FxHashMap::default();
		for spec in specs {
			if let TypeSpec::Record(r) = spec {
				if let (Some(root_id), Some(code)) = (r.abstract_root.as_ref().map(|n| self.by_name[n]), r.type_code) {
					by_root.entry(root_id).or_default().push((code, self.by_name[&r.name]));
				}
			}
		}
		for (root_id, mut entries) in by_root {
			entries.sort_by_key(|(code, _)| *code);
			for w in entries.windows(2) {
				if w[0].0 == w[1].0 {
					let root_name = self.descriptors[root_id.index()].name.clone();
					return Err(SchemaError::new(SchemaErrorKind::DuplicateTypeCodeInHierarchy { type_code: w[0].0 }, root_name.to_string()).into());
				}
			}
			self.descriptors[root_id.index()].derived = entries.into_iter().map(|(_, id)| id).collect();
		}
		Ok(())
	}

	fn propagate_public(&mut self) {
		for d in &mut self.descriptors {
			d.is_public = self.public_prefixes.iter().any(|p| d.name.starts_with(p));
		}
		loop {
			let mut changed = false;
			for i in 0..self.descriptors.len() {
				if !self.descriptors[i].is_public {
					continue;
				}
				let mut deps: Vec<TypeId> = self.descriptors[i].members.iter().filter_map(|m| m.member_type).collect();
				deps.extend(self.descriptors[i].element_type);
				deps.extend(self.descriptors[i].key_type);
				deps.extend(self.descriptors[i].abstract_root);
				deps.extend(self.descriptors[i].derived.iter().copied());
				for dep in deps {
					if !self.descriptors[dep.index()].is_public {
						self.descriptors[dep.index()].is_public = true;
						changed = true;
					}
				}
			}
			if !changed {
				break;
			}
		}
	}

	/// `contains_config_ref`, memoized across the whole descriptor list in
	/// one pass over a topologically-safe traversal (the allocate pass
	/// guarantees every referenced id already exists, so plain recursion
	/// with a visited set terminates even through cycles).
	fn compute_contains_ref(&mut self) {
		let len = self.descriptors.len();
		let mut resolved = vec![None; len];
		let mut in_progress = vec![false; len];
		for i in 0..len {
			self.contains_ref_of(i, &mut resolved, &mut in_progress);
		}
		for (i, v) in resolved.into_iter().enumerate() {
			self.descriptors[i].contains_config_ref = v.unwrap_or(false);
		}
	}

	fn contains_ref_of(&self, i: usize, resolved: &mut [Option<bool>], in_progress: &mut [bool]) -> bool {
		if let Some(v) = resolved[i] {
			return v;
		}
		if in_progress[i] {
			// A cycle; assume no ref along the back-edge rather than failing —
			// breaking such cycles deterministically at scan time is enough.
			return false;
		}
		in_progress[i] = true;
		let d = &self.descriptors[i];
		let is_ref = matches!(d.wire_kind, DescriptorKind::ConfigRef);
		let mut deps: Vec<usize> = d.members.iter().filter_map(|m| m.member_type).map(|t| t.index()).collect();
		deps.extend(d.element_type.map(|t| t.index()));
		deps.extend(d.key_type.map(|t| t.index()));
		deps.extend(d.derived.iter().map(|t| t.index()));
		let any_dep_ref = deps.iter().any(|&dep| self.contains_ref_of(dep, resolved, in_progress));
		in_progress[i] = false;
		let result = is_ref || any_dep_ref;
		resolved[i] = Some(result);
		result
	}
}

fn ranges_overlap(a: &Range<i32>, b: &Range<i32>) -> bool {
	a.start < b.end && b.start < a.end
}

fn nullable_wrap(inner: &TypeDescriptor) -> (DescriptorKind, WireKind) {
	match inner.wire_kind {
		DescriptorKind::Primitive(p) => (DescriptorKind::NullablePrimitive(p), p.nullable_physical()),
		DescriptorKind::Enum { underlying } => (DescriptorKind::NullableEnum { underlying }, underlying.nullable_physical()),
		// An abstract root already encodes null natively (type-code 0); no
		// extra presence byte is needed.
		DescriptorKind::AbstractStruct => (DescriptorKind::AbstractStruct, WireKind::AbstractStruct),
		DescriptorKind::Struct | DescriptorKind::Tuple => (DescriptorKind::NullableStruct, WireKind::NullableStruct),
		other => (other, inner.physical_kind),
	}
}

/// Resolves a member's descriptor kind and physical wire kind together,
/// correcting the compile-time guess a `#[derive(Serializable)]`-generated
/// [`DescriptorKind`] makes for `Option<T>` members whose `T` turns out to
/// name an abstract root (the derive macro cannot know this without the
/// scan). An abstract root already encodes null natively via `type-code=0`
/// (§4.A), so such a member frames as a plain `AbstractStruct`, not as a
/// `NullableStruct` wrapping one — both halves must agree, or the dispatch
/// engine would write one presence scheme and read another.
fn resolved_kind_for(kind: DescriptorKind, member_type: Option<&TypeDescriptor>) -> (DescriptorKind, WireKind) {
	if kind == DescriptorKind::NullableStruct {
		if let Some(t) = member_type {
			if t.is_abstract_root() {
				return (DescriptorKind::AbstractStruct, WireKind::AbstractStruct);
			}
		}
	}
	let physical = kind
		.self_contained_physical()
		.unwrap_or_else(|| member_type.expect("non-self-contained kind needs a referenced type").physical_kind);
	(kind, physical)
}

fn blank_descriptor(id: TypeId, name: Box<str>, wire_kind: DescriptorKind, physical_kind: WireKind) -> TypeDescriptor {
	TypeDescriptor {
		id,
		name,
		wire_kind,
		physical_kind,
		type_code: None,
		abstract_root: None,
		derived: Vec::new(),
		members: Vec::new(),
		reserved_ranges: Vec::new(),
		blocked_tags: Vec::new(),
		element_type: None,
		key_type: None,
		null_sentinel_key: None,
		is_public: false,
		contains_config_ref: false,
		on_deserialized_hooks: Vec::new(),
	}
}
