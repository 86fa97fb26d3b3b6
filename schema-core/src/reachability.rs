//! Reference Graph reachability analysis: a tooling-only BFS over a
//! reverse-reference index, used to answer "which items could be affected by
//! this change" without touching encode/decode.
//!
//! This is deliberately decoupled from [`crate::dispatch::traverse_refs`],
//! which walks one already-decoded value looking for `ConfigRef`s. The
//! reverse index here is built once (by a caller who has already walked
//! every item with `traverse_refs`/the dynamic visitor) and is then reused
//! across many reachability queries as a read-only snapshot passed by value
//! to analysis runs.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use fxhash::FxHashMap;

use crate::registry::TypeId;

/// `(from_type, to_type, path)` — identifies one kind of reference edge, not
/// one specific edge instance. Multiple edges between the same two items can
/// share a label if they cross the same member path.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct EdgeLabel {
	pub from_type: TypeId,
	pub to_type: TypeId,
	pub path: Box<str>,
}

/// `referred_id → {(referrer_id, label)}`: for every item, the set of items
/// that hold a `ConfigRef` pointing at it. Built once by walking the whole
/// config library; immutable for the lifetime of an analysis run.
#[derive(Debug, Default, Clone)]
pub struct ReverseReferenceIndex<Id: Eq + Hash> {
	edges: FxHashMap<Id, Vec<(Id, EdgeLabel)>>,
}

impl<Id: Eq + Hash + Clone> ReverseReferenceIndex<Id> {
	pub fn new() -> Self {
		Self { edges: FxHashMap::default() }
	}

	/// Records that `referrer` holds a reference to `referred` via `label`.
	pub fn insert(&mut self, referred: Id, referrer: Id, label: EdgeLabel) {
		self.edges.entry(referred).or_default().push((referrer, label));
	}

	fn referrers_of(&self, id: &Id) -> &[(Id, EdgeLabel)] {
		self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
	}
}

#[derive(Debug, Clone)]
pub struct ReachabilityResult<Id> {
	/// Every item reachable from the changed set, in BFS discovery order
	/// (every start node is itself reachable).
	pub reachable: Vec<Id>,
	/// Per-label count of distinct items reached via at least one edge
	/// carrying that label. Never exceeds `reachable.len()`.
	pub influence: FxHashMap<EdgeLabel, usize>,
}

/// Runs a breadth-first reachability walk from `changed` over `index`.
///
/// Deterministic in the iteration order of `index` because the only
/// iteration performed is over `changed` (caller-supplied order) and, for
/// each visited item, the referrer list's own insertion order — never over
/// the backing hash map itself.
pub fn analyze<Id: Eq + Hash + Clone>(changed: &[Id], index: &ReverseReferenceIndex<Id>, disabled_labels: &HashSet<EdgeLabel>) -> ReachabilityResult<Id> {
	let mut reachable_order = Vec::new();
	let mut reachable_set = HashSet::new();
	let mut influence: FxHashMap<EdgeLabel, HashSet<Id>> = FxHashMap::default();
	let mut queue = VecDeque::new();

	for id in changed {
		if reachable_set.insert(id.clone()) {
			reachable_order.push(id.clone());
			queue.push_back(id.clone());
		}
	}

	while let Some(current) = queue.pop_front() {
		for (referrer, label) in index.referrers_of(&current) {
			if disabled_labels.contains(label) {
				continue;
			}
			influence.entry(label.clone()).or_default().insert(referrer.clone());
			if reachable_set.insert(referrer.clone()) {
				reachable_order.push(referrer.clone());
				queue.push_back(referrer.clone());
			}
		}
	}

	ReachabilityResult { reachable: reachable_order, influence: influence.into_iter().map(|(label, items)| (label, items.len())).collect() }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn label(from: u32, to: u32, path: &str) -> EdgeLabel {
		EdgeLabel { from_type: TypeId::new(from), to_type: TypeId::new(to), path: path.into() }
	}

	#[test]
	fn every_start_node_is_reachable() {
		let index: ReverseReferenceIndex<&str> = ReverseReferenceIndex::new();
		let result = analyze(&["a", "b"], &index, &HashSet::new());
		assert_eq!(result.reachable, vec!["a", "b"]);
	}

	#[test]
	fn bfs_follows_reverse_edges_and_counts_influence() {
		let mut index = ReverseReferenceIndex::new();
		// "item" is referred to by "quest1" and "quest2" via the same label.
		index.insert("item", "quest1", label(1, 2, ".Reward"));
		index.insert("item", "quest2", label(1, 2, ".Reward"));
		// "quest1" is itself referred to by "chapter" via a different label.
		index.insert("quest1", "chapter", label(3, 1, ".Quests[0]"));

		let result = analyze(&["item"], &index, &HashSet::new());

		assert_eq!(result.reachable, vec!["item", "quest1", "quest2", "chapter"]);
		assert_eq!(result.influence[&label(1, 2, ".Reward")], 2);
		assert_eq!(result.influence[&label(3, 1, ".Quests[0]")], 1);
		for count in result.influence.values() {
			assert!(*count <= result.reachable.len());
		}
	}

	#[test]
	fn disabled_labels_prune_edges() {
		let mut index = ReverseReferenceIndex::new();
		index.insert("item", "quest1", label(1, 2, ".Reward"));

		let mut disabled = HashSet::new();
		disabled.insert(label(1, 2, ".Reward"));

		let result = analyze(&["item"], &index, &disabled);
		assert_eq!(result.reachable, vec!["item"]);
		assert!(result.influence.is_empty());
	}
}
