//! Keyed child reconciliation
//!
//! Builds the child list of a work-in-progress unit from the previous
//! children (those of its alternate) and a new sequence of descriptions, in
//! five passes:
//!
//! 1. walk both lists in lockstep while the units match, reusing them
//! 2. new list exhausted: delete the remaining old children
//! 3. old list exhausted: create every remaining new child
//! 4. look up each remaining new child among the remaining old ones by key
//!    (or position), reusing on a match and creating otherwise
//! 5. delete the old children nobody claimed
//!
//! Moves are detected with a single high-water mark over the old indices of
//! reused children (`last_placed_index`): a reused child whose old index lies
//! left of the mark is flagged for placement.

use std::collections::HashMap;

use tracing::trace;

use crate::element::{Key, Node};
use crate::fiber::{Fiber, FiberArena, FiberId, Flags};

/// Identity of an old child during the keyed pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ChildKey {
	Key(Key),
	Index(usize),
}

impl ChildKey {
	fn new(key: Option<&Key>, index: usize) -> Self {
		match key {
			Some(key) => ChildKey::Key(key.clone()),
			None => ChildKey::Index(index),
		}
	}
}

struct ChildList {
	parent: FiberId,
	track_side_effects: bool,
	last_placed_index: usize,
	first: Option<FiberId>,
	previous: Option<FiberId>,
}

impl ChildList {
	fn push<T: Clone>(&mut self, arena: &mut FiberArena<T>, fiber: FiberId, index: usize) {
		self.last_placed_index = place_child(
			arena,
			fiber,
			self.last_placed_index,
			index,
			self.track_side_effects,
		);
		match self.previous {
			Some(previous) => arena[previous].sibling = Some(fiber),
			None => self.first = Some(fiber),
		}
		self.previous = Some(fiber);
	}
}

fn same_node<T>(fiber: &Fiber<T>, node: &Node) -> bool {
	fiber.element_type == node.element_type() && fiber.key.as_ref() == node.key()
}

/// Reuses `current` for `node`, flagged as an update.
fn use_fiber<T: Clone>(arena: &mut FiberArena<T>, parent: FiberId, current: FiberId, node: &Node) -> FiberId {
	let fiber = arena.create_work_in_progress(current, node.props());
	let unit = &mut arena[fiber];
	unit.return_ = Some(parent);
	unit.sibling = None;
	unit.flags = Flags::UPDATE;
	fiber
}

/// Creates a unit for `node`, flagged for placement.
fn create_child<T: Clone>(arena: &mut FiberArena<T>, parent: FiberId, node: &Node) -> FiberId {
	let mut fiber = Fiber::from_node(node);
	fiber.return_ = Some(parent);
	fiber.flags = Flags::PLACEMENT;
	arena.insert(fiber)
}

fn delete_child<T: Clone>(arena: &mut FiberArena<T>, parent: FiberId, child: FiberId) {
	trace!(?parent, ?child, "child deleted");
	let parent = &mut arena[parent];
	parent.deletions.push(child);
	parent.flags |= Flags::DELETION;
}

fn delete_remaining_children<T: Clone>(arena: &mut FiberArena<T>, parent: FiberId, first: Option<FiberId>) {
	let mut next = first;
	while let Some(child) = next {
		next = arena[child].sibling;
		delete_child(arena, parent, child);
	}
}

/// Assigns `index` to `fiber` and flags it for placement when it is new or
/// moved left of the high-water mark. Returns the new mark.
pub(crate) fn place_child<T: Clone>(
	arena: &mut FiberArena<T>,
	fiber: FiberId,
	last_placed_index: usize,
	index: usize,
	track_side_effects: bool,
) -> usize {
	arena[fiber].index = index;
	if !track_side_effects {
		return last_placed_index;
	}
	match arena[fiber].alternate {
		Some(current) => {
			let old_index = arena[current].index;
			if old_index < last_placed_index {
				arena[fiber].flags |= Flags::PLACEMENT;
				last_placed_index
			} else {
				old_index
			}
		}
		None => {
			arena[fiber].flags |= Flags::PLACEMENT;
			last_placed_index
		}
	}
}

/// Reconciles the children of `parent` against `children` and links the
/// result as `parent.child`. Returns the first child.
pub(crate) fn reconcile_children<T: Clone>(
	arena: &mut FiberArena<T>,
	parent: FiberId,
	children: &[Option<Node>],
) -> Option<FiberId> {
	let current = arena[parent].alternate;
	let mut old_fiber = current.and_then(|current| arena[current].child);
	let mut list = ChildList {
		parent,
		track_side_effects: current.is_some(),
		last_placed_index: 0,
		first: None,
		previous: None,
	};
	let mut i = 0;

	// Common prefix.
	while let Some(old) = old_fiber {
		if i >= children.len() {
			break;
		}
		let Some(node) = &children[i] else {
			i += 1;
			continue;
		};
		let (candidate, next_old) = if arena[old].index > i {
			(None, Some(old))
		} else {
			(Some(old), arena[old].sibling)
		};
		let Some(matched) = candidate.filter(|old| same_node(&arena[*old], node)) else {
			break;
		};
		let fiber = use_fiber(arena, list.parent, matched, node);
		list.push(arena, fiber, i);
		old_fiber = next_old;
		i += 1;
	}

	if i == children.len() {
		delete_remaining_children(arena, parent, old_fiber);
		return finish(arena, list);
	}

	if old_fiber.is_none() {
		for (index, node) in children.iter().enumerate().skip(i) {
			let Some(node) = node else {
				continue;
			};
			let fiber = create_child(arena, parent, node);
			list.push(arena, fiber, index);
		}
		return finish(arena, list);
	}

	// Keyed lookup over the rest.
	let mut remaining = Vec::new();
	let mut next = old_fiber;
	while let Some(old) = next {
		let fiber = &arena[old];
		remaining.push((ChildKey::new(fiber.key.as_ref(), fiber.index), Some(old)));
		next = fiber.sibling;
	}
	let mut existing: HashMap<ChildKey, usize> = HashMap::with_capacity(remaining.len());
	for (slot, (key, _)) in remaining.iter().enumerate() {
		existing.insert(key.clone(), slot);
	}

	for (index, node) in children.iter().enumerate().skip(i) {
		let Some(node) = node else {
			continue;
		};
		let key = ChildKey::new(node.key(), index);
		let matched = existing.get(&key).copied().and_then(|slot| {
			let old = remaining[slot].1?;
			same_node(&arena[old], node).then_some((slot, old))
		});
		let fiber = match matched {
			Some((slot, old)) => {
				existing.remove(&key);
				remaining[slot].1 = None;
				use_fiber(arena, parent, old, node)
			}
			None => create_child(arena, parent, node),
		};
		list.push(arena, fiber, index);
	}

	if list.track_side_effects {
		for old in remaining.into_iter().filter_map(|(_, old)| old) {
			delete_child(arena, parent, old);
		}
	}

	finish(arena, list)
}

fn finish<T: Clone>(arena: &mut FiberArena<T>, list: ChildList) -> Option<FiberId> {
	arena[list.parent].child = list.first;
	list.first
}
