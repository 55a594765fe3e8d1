//! Work units and their arena
//!
//! Every node of the render tree is a [`Fiber`] stored in a [`FiberArena`] and
//! addressed by a generational [`FiberId`]. Parents own their children through
//! the `child`/`sibling` chain; `return_` is a plain back-reference.
//!
//! Each logical unit occupies at most two slots: the committed ("current")
//! fiber and its `alternate`. A new render reuses the alternate's slot for the
//! work-in-progress copy, so committing simply makes the other slot current.

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;
use slotmap::{SlotMap, new_key_type};

use crate::context::ContextId;
use crate::element::{Component, ElementType, Key, Node, Props};
use crate::hooks::{Effect, HookCell};

new_key_type! {
	/// Stable address of a work unit.
	pub struct FiberId;
}

bitflags! {
	/// Side effects pending on a work unit.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct Flags: u32 {
		/// Insert (or move) the unit's host nodes.
		const PLACEMENT = 0b0000_0010;
		/// Patch a reused unit; run layout effects of a component.
		const UPDATE = 0b0000_0100;
		/// The unit has children queued for removal in `deletions`.
		const DELETION = 0b0000_1000;
		/// Passive effects are waiting for the follow-up task.
		const PASSIVE = 0b1000_0000_0000;
	}
}

impl Flags {
	/// Flags handled by the mutation pass.
	pub const MUTATION: Flags = Flags::PLACEMENT
		.union(Flags::UPDATE)
		.union(Flags::DELETION);
}

/// Kind of work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkTag {
	Root,
	HostElement,
	HostText,
	FunctionComponent,
	ClassComponent,
	Fragment,
	ContextProvider,
	ContextConsumer,
}

impl WorkTag {
	pub fn of(element_type: &ElementType) -> Self {
		match element_type {
			ElementType::Root => WorkTag::Root,
			ElementType::Host(_) => WorkTag::HostElement,
			ElementType::Text => WorkTag::HostText,
			ElementType::Function(_) => WorkTag::FunctionComponent,
			ElementType::Class(_) => WorkTag::ClassComponent,
			ElementType::Fragment => WorkTag::Fragment,
			ElementType::Provider(_) => WorkTag::ContextProvider,
			ElementType::Consumer(_) => WorkTag::ContextConsumer,
		}
	}

	/// Units that own a host node.
	pub fn is_host(self) -> bool {
		matches!(self, WorkTag::HostElement | WorkTag::HostText)
	}

	/// Units whose host node can contain other host nodes.
	pub fn is_host_parent(self) -> bool {
		matches!(self, WorkTag::HostElement | WorkTag::Root)
	}
}

/// What a unit holds onto between renders.
#[derive(Clone, Default)]
pub enum StateNode<T> {
	#[default]
	None,
	/// Host node of an element or text unit.
	Host(T),
	/// Container the root renders into.
	Container(T),
	/// Instance of a class component.
	Instance(Rc<dyn Component>),
}

impl<T> StateNode<T> {
	/// The host node, for units that have one (the root's container included).
	pub fn handle(&self) -> Option<&T> {
		match self {
			StateNode::Host(handle) | StateNode::Container(handle) => Some(handle),
			StateNode::None | StateNode::Instance(_) => None,
		}
	}
}

/// The hook chain of a function component.
#[derive(Clone)]
pub(crate) struct Hooks {
	/// Points at the fiber that last rendered this logical unit.
	pub(crate) owner: Rc<Cell<FiberId>>,
	pub(crate) cells: Vec<HookCell>,
}

#[derive(Clone, Default)]
pub(crate) enum MemoizedState {
	#[default]
	None,
	Hooks(Hooks),
}

impl MemoizedState {
	pub(crate) fn hooks(&self) -> Option<&Hooks> {
		match self {
			MemoizedState::Hooks(hooks) => Some(hooks),
			MemoizedState::None => None,
		}
	}
}

/// One node of the render tree.
pub struct Fiber<T> {
	pub tag: WorkTag,
	pub key: Option<Key>,
	pub element_type: ElementType,
	pub pending_props: Props,
	/// Props of the last completed render, `None` before the first.
	pub memoized_props: Option<Props>,
	pub state_node: StateNode<T>,
	pub return_: Option<FiberId>,
	pub child: Option<FiberId>,
	pub sibling: Option<FiberId>,
	/// Position among siblings, counting holes in the description.
	pub index: usize,
	pub flags: Flags,
	pub subtree_flags: Flags,
	pub deletions: Vec<FiberId>,
	pub alternate: Option<FiberId>,
	pub(crate) update_queue: Vec<Effect>,
	pub(crate) memoized_state: MemoizedState,
	/// Contexts read during the last render.
	pub dependencies: Vec<ContextId>,
}

impl<T> Fiber<T> {
	pub fn new(element_type: ElementType, key: Option<Key>, pending_props: Props) -> Self {
		Self {
			tag: WorkTag::of(&element_type),
			key,
			element_type,
			pending_props,
			memoized_props: None,
			state_node: StateNode::None,
			return_: None,
			child: None,
			sibling: None,
			index: 0,
			flags: Flags::empty(),
			subtree_flags: Flags::empty(),
			deletions: Vec::new(),
			alternate: None,
			update_queue: Vec::new(),
			memoized_state: MemoizedState::None,
			dependencies: Vec::new(),
		}
	}

	pub fn from_node(node: &Node) -> Self {
		Self::new(node.element_type(), node.key().cloned(), node.props())
	}

	/// Text of a text unit.
	pub fn text(&self) -> Option<&str> {
		self.pending_props.text_content()
	}

	pub fn handle(&self) -> Option<&T> {
		self.state_node.handle()
	}
}

/// Storage for every work unit of one root.
pub struct FiberArena<T> {
	fibers: SlotMap<FiberId, Fiber<T>>,
}

impl<T> Default for FiberArena<T> {
	fn default() -> Self {
		Self {
			fibers: SlotMap::with_key(),
		}
	}
}

impl<T> core::ops::Index<FiberId> for FiberArena<T> {
	type Output = Fiber<T>;

	fn index(&self, id: FiberId) -> &Self::Output {
		&self.fibers[id]
	}
}

impl<T> core::ops::IndexMut<FiberId> for FiberArena<T> {
	fn index_mut(&mut self, id: FiberId) -> &mut Self::Output {
		&mut self.fibers[id]
	}
}

impl<T: Clone> FiberArena<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.fibers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fibers.is_empty()
	}

	pub fn get(&self, id: FiberId) -> Option<&Fiber<T>> {
		self.fibers.get(id)
	}

	pub fn insert(&mut self, fiber: Fiber<T>) -> FiberId {
		self.fibers.insert(fiber)
	}

	/// Children of `id` in sibling order.
	pub fn children(&self, id: FiberId) -> Vec<FiberId> {
		let mut children = Vec::new();
		let mut next = self.fibers.get(id).and_then(|fiber| fiber.child);
		while let Some(child) = next {
			children.push(child);
			next = self.fibers.get(child).and_then(|fiber| fiber.sibling);
		}
		children
	}

	/// Builds the work-in-progress copy of `current` carrying `pending_props`.
	///
	/// The slot of `current.alternate` is reused when it is still allocated;
	/// otherwise a new slot is paired with `current`.
	pub fn create_work_in_progress(&mut self, current: FiberId, pending_props: Props) -> FiberId {
		let source = &self.fibers[current];
		let reusable = source
			.alternate
			.filter(|alternate| {
				self.fibers
					.get(*alternate)
					.is_some_and(|fiber| fiber.alternate == Some(current))
			});

		let tag = source.tag;
		let key = source.key.clone();
		let element_type = source.element_type.clone();
		let memoized_props = source.memoized_props.clone();
		let state_node = source.state_node.clone();
		let return_ = source.return_;
		let sibling = source.sibling;
		let index = source.index;

		match reusable {
			Some(alternate) => {
				let fiber = &mut self.fibers[alternate];
				fiber.tag = tag;
				fiber.key = key;
				fiber.element_type = element_type;
				fiber.pending_props = pending_props;
				fiber.memoized_props = memoized_props;
				fiber.state_node = state_node;
				fiber.return_ = return_;
				fiber.child = None;
				fiber.sibling = sibling;
				fiber.index = index;
				fiber.flags = Flags::empty();
				fiber.subtree_flags = Flags::empty();
				fiber.deletions.clear();
				fiber.update_queue.clear();
				fiber.memoized_state = MemoizedState::None;
				fiber.dependencies.clear();
				alternate
			}
			None => {
				let mut fiber = Fiber::new(element_type, key, pending_props);
				fiber.tag = tag;
				fiber.memoized_props = memoized_props;
				fiber.state_node = state_node;
				fiber.return_ = return_;
				fiber.sibling = sibling;
				fiber.index = index;
				fiber.alternate = Some(current);
				let id = self.fibers.insert(fiber);
				self.fibers[current].alternate = Some(id);
				id
			}
		}
	}

	/// Frees `root` and everything below it, together with their alternates.
	pub fn free_subtree(&mut self, root: FiberId) -> usize {
		let mut freed = 0;
		let mut stack = vec![root];
		while let Some(id) = stack.pop() {
			let Some(fiber) = self.fibers.remove(id) else {
				continue;
			};
			freed += 1;
			let mut next = fiber.child;
			while let Some(child) = next {
				stack.push(child);
				next = self.fibers.get(child).and_then(|child| child.sibling);
			}
			if let Some(alternate) = fiber.alternate {
				let paired = self
					.fibers
					.get(alternate)
					.is_some_and(|other| other.alternate == Some(id));
				if paired {
					self.fibers.remove(alternate);
					freed += 1;
				}
			}
		}
		freed
	}

	/// Host nodes directly below `id`: its own node for host units, otherwise
	/// the nearest host descendants of every branch.
	pub fn top_level_host_nodes(&self, id: FiberId) -> Vec<T> {
		let mut nodes = Vec::new();
		self.collect_host_nodes(id, &mut nodes);
		nodes
	}

	fn collect_host_nodes(&self, id: FiberId, nodes: &mut Vec<T>) {
		let Some(fiber) = self.fibers.get(id) else {
			return;
		};
		if fiber.tag.is_host() {
			if let Some(handle) = fiber.handle() {
				nodes.push(handle.clone());
			}
			return;
		}
		let mut next = fiber.child;
		while let Some(child) = next {
			self.collect_host_nodes(child, nodes);
			next = self.fibers.get(child).and_then(|child| child.sibling);
		}
	}

	/// Nearest ancestor of `id` that can hold host nodes.
	pub fn host_parent(&self, id: FiberId) -> Option<FiberId> {
		let mut next = self.fibers.get(id).and_then(|fiber| fiber.return_);
		while let Some(parent) = next {
			let fiber = self.fibers.get(parent)?;
			if fiber.tag.is_host_parent() {
				return Some(parent);
			}
			next = fiber.return_;
		}
		None
	}
}
