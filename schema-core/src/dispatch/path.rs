//! Breadcrumb tracking shared by [`crate::error::Error`] and the dynamic
//! visitor: the same path that lands in a
//! `WireKindMismatch`/`BoundExceeded` is what a `Visitor` implementation
//! receives at every step of a walk.

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
enum Segment {
	Member(Box<str>),
	Index(usize),
	MapKeysIndex(usize),
	MapKey,
	MapValue,
	Derived(Box<str>),
}

/// A breadcrumb trail through a value being encoded, decoded or visited.
/// Renders as `.Member`, `[index]`, `.Keys[index]`, `[key]`, `.Value` and
/// `{as DerivedType}` tokens.
#[derive(Debug, Clone, Default)]
pub struct MemberPath(Vec<Segment>);

impl MemberPath {
	pub fn new() -> Self {
		Self(Vec::new())
	}

	pub(crate) fn push_member(&mut self, name: &str) {
		self.0.push(Segment::Member(name.into()));
	}

	pub(crate) fn push_index(&mut self, index: usize) {
		self.0.push(Segment::Index(index));
	}

	pub(crate) fn push_map_keys_index(&mut self, index: usize) {
		self.0.push(Segment::MapKeysIndex(index));
	}

	pub(crate) fn push_map_key(&mut self) {
		self.0.push(Segment::MapKey);
	}

	pub(crate) fn push_map_value(&mut self) {
		self.0.push(Segment::MapValue);
	}

	pub(crate) fn push_derived(&mut self, name: &str) {
		self.0.push(Segment::Derived(name.into()));
	}

	pub(crate) fn pop(&mut self) {
		self.0.pop();
	}
}

impl Display for MemberPath {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if self.0.is_empty() {
			return write!(f, "$");
		}
		for segment in &self.0 {
			match segment {
				Segment::Member(name) => write!(f, ".{name}")?,
				Segment::Index(i) => write!(f, "[{i}]")?,
				Segment::MapKeysIndex(i) => write!(f, ".Keys[{i}]")?,
				Segment::MapKey => write!(f, "[key]")?,
				Segment::MapValue => write!(f, ".Value")?,
				Segment::Derived(name) => write!(f, "{{as {name}}}")?,
			}
		}
		Ok(())
	}
}
