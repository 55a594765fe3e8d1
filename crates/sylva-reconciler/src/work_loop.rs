//! Depth-first render driver
//!
//! A render starts at a *render root*: the work-in-progress copy of the unit
//! an update targets (the tree root for [`crate::Root::render`], a component
//! for a state update). The loop begins each unit, descends into its first
//! child, and on the way back up completes units until it finds a sibling.
//! It never climbs past the render root.
//!
//! The concurrent loop checks the scheduler after every unit and returns when
//! the time slice is exhausted; the same `work_in_progress` pointer resumes on
//! the next slice.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use sylva_scheduler::Scheduler;
use tracing::{debug, trace, warn};

use crate::context::{ContextStack, VALUE_PROP, provider_value};
use crate::element::{Children, ElementType, Props};
use crate::fiber::{Fiber, FiberArena, FiberId, StateNode};
use crate::hooks::ScheduleUpdate;
use crate::host::HostRenderer;

/// What a queued update asks to re-render.
pub(crate) enum UpdateTarget {
	/// The whole tree, with new children for the root.
	Root(Children),
	/// The component whose hook chain is owned by this cell.
	Unit(Rc<Cell<FiberId>>),
}

/// The render in flight.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderPass {
	/// Work-in-progress copy of the target.
	pub(crate) root: FiberId,
	/// Committed unit being replaced.
	pub(crate) target: FiberId,
}

/// Everything a root owns between tasks.
pub(crate) struct RenderState<H: HostRenderer> {
	pub(crate) arena: FiberArena<H::Handle>,
	pub(crate) host: H,
	/// Committed root unit.
	pub(crate) current: FiberId,
	pub(crate) context_stack: ContextStack,
	pub(crate) work_in_progress: Option<FiberId>,
	pub(crate) render: Option<RenderPass>,
	pub(crate) updater: Weak<dyn ScheduleUpdate>,
}

impl<H: HostRenderer> RenderState<H> {
	pub(crate) fn new(container: H::Handle, host: H, updater: Weak<dyn ScheduleUpdate>) -> Self {
		let mut arena = FiberArena::new();
		let mut root = Fiber::new(ElementType::Root, None, Props::new());
		root.state_node = StateNode::Container(container);
		let current = arena.insert(root);
		Self {
			arena,
			host,
			current,
			context_stack: ContextStack::new(),
			work_in_progress: None,
			render: None,
			updater,
		}
	}

	pub(crate) fn is_rendering(&self) -> bool {
		self.render.is_some()
	}

	/// True when `fiber` is part of the committed tree.
	pub(crate) fn is_attached(&self, fiber: FiberId) -> bool {
		let mut node = fiber;
		loop {
			let Some(unit) = self.arena.get(node) else {
				return false;
			};
			match unit.return_ {
				None => return node == self.current,
				Some(parent) => {
					if !self.arena.children(parent).contains(&node) {
						return false;
					}
					node = parent;
				}
			}
		}
	}

	/// Committed unit that `owner` refers to.
	///
	/// An owner left pointing at an aborted work-in-progress copy resolves to
	/// that copy's committed alternate.
	fn resolve_owner(&self, owner: &Rc<Cell<FiberId>>) -> Option<FiberId> {
		let fiber = owner.get();
		if self.is_attached(fiber) {
			return Some(fiber);
		}
		let alternate = self.arena.get(fiber)?.alternate?;
		self.is_attached(alternate).then_some(alternate)
	}

	/// Starts a render for `target`. Returns `false` when the target no longer
	/// exists.
	pub(crate) fn prepare_fresh_stack(&mut self, target: UpdateTarget) -> bool {
		let (fiber, props) = match target {
			UpdateTarget::Root(children) => (self.current, Props::with_children(children)),
			UpdateTarget::Unit(owner) => {
				let Some(fiber) = self.resolve_owner(&owner) else {
					warn!(unit = ?owner.get(), "update for a unit that is no longer mounted");
					return false;
				};
				let unit = &self.arena[fiber];
				let props = unit
					.memoized_props
					.clone()
					.unwrap_or_else(|| unit.pending_props.clone());
				(fiber, props)
			}
		};

		self.push_ancestor_providers(fiber);
		let root = self.arena.create_work_in_progress(fiber, props);
		debug!(target_unit = ?fiber, render_root = ?root, tag = ?self.arena[root].tag, "render started");
		self.render = Some(RenderPass { root, target: fiber });
		self.work_in_progress = Some(root);
		true
	}

	/// Re-enters the providers above `fiber`, outermost first.
	fn push_ancestor_providers(&mut self, fiber: FiberId) {
		let mut providers = Vec::new();
		let mut next = self.arena[fiber].return_;
		while let Some(ancestor) = next {
			let unit = &self.arena[ancestor];
			if let ElementType::Provider(handle) = &unit.element_type {
				let props = unit.memoized_props.as_ref().unwrap_or(&unit.pending_props);
				providers.push((handle.clone(), provider_value(handle, props.get(VALUE_PROP))));
			}
			next = unit.return_;
		}
		for (handle, value) in providers.into_iter().rev() {
			self.context_stack.push_provider(&handle, value);
		}
	}

	/// Runs units until the render is complete.
	pub(crate) fn work_loop_sync(&mut self) {
		while let Some(unit) = self.work_in_progress {
			self.perform_unit_of_work(unit);
		}
	}

	/// Runs units until the render is complete or `scheduler` asks to yield.
	///
	/// Returns `true` when the render is complete.
	pub(crate) fn work_loop_concurrent(&mut self, scheduler: &Scheduler) -> bool {
		while let Some(unit) = self.work_in_progress {
			self.perform_unit_of_work(unit);
			if self.work_in_progress.is_some() && scheduler.should_yield_to_host() {
				trace!(next = ?self.work_in_progress, "render yielded");
				return false;
			}
		}
		true
	}

	fn perform_unit_of_work(&mut self, unit: FiberId) {
		match self.begin_work(unit) {
			Some(child) => self.work_in_progress = Some(child),
			None => self.complete_unit_of_work(unit),
		}
	}

	/// Completes `unit` and its ancestors until a sibling is found.
	fn complete_unit_of_work(&mut self, unit: FiberId) {
		let render_root = self.render.map(|render| render.root);
		let mut completed = unit;
		loop {
			let fiber = &self.arena[completed];
			trace!(unit = ?completed, tag = ?fiber.tag, "complete");
			if let ElementType::Provider(handle) = &fiber.element_type {
				let handle = handle.clone();
				self.context_stack.pop_provider(&handle);
			}
			if Some(completed) == render_root {
				self.work_in_progress = None;
				return;
			}

			let fiber = &self.arena[completed];
			let bubbled = fiber.flags | fiber.subtree_flags;
			let sibling = fiber.sibling;
			let Some(parent) = fiber.return_ else {
				self.work_in_progress = None;
				return;
			};
			self.arena[parent].subtree_flags |= bubbled;

			if let Some(sibling) = sibling {
				self.work_in_progress = Some(sibling);
				return;
			}
			completed = parent;
		}
	}

	/// Restores saved provider values while the render is paused.
	pub(crate) fn suspend(&mut self) {
		self.context_stack.suspend();
	}

	pub(crate) fn resume(&mut self) {
		self.context_stack.resume();
	}

	/// Drops the render in flight.
	///
	/// Units the render created fresh are freed. Work-in-progress copies of
	/// committed units stay paired with them and are reused by the next render.
	pub(crate) fn abort_render(&mut self) {
		if let Some(render) = self.render.take() {
			let freed = self.discard_work_in_progress(render.root);
			debug!(render_root = ?render.root, freed, "render aborted");
		}
		self.work_in_progress = None;
		self.context_stack.reset();
	}

	fn discard_work_in_progress(&mut self, root: FiberId) -> usize {
		let mut freed = 0;
		let mut stack = vec![root];
		while let Some(unit) = stack.pop() {
			for child in self.arena.children(unit) {
				if self.arena[child].alternate.is_some() {
					stack.push(child);
				} else {
					freed += self.arena.free_subtree(child);
				}
			}
			self.arena[unit].child = None;
		}
		freed
	}
}
