//! Commit phase
//!
//! The mutation pass walks the finished render root, children before the
//! unit itself, and applies each unit's flags to the host tree. Effects are
//! not run here: the pass hands back the layout effects and teardowns it
//! collected, and the passive effects stay queued on their units until
//! [`RenderState::collect_passive_effects`] drains them in a follow-up task.
//!
//! Layout effects therefore run once the whole mutation pass has finished,
//! not interleaved with it, so every layout effect observes the complete
//! host tree of the commit.

use core::mem;

use tracing::{debug, trace};

use crate::fiber::{FiberId, Flags, WorkTag};
use crate::hooks::{Effect, EffectKind, HookCell, Teardown};
use crate::host::HostRenderer;
use crate::work_loop::{RenderPass, RenderState};

/// Work a commit leaves for the root to run once the host tree is consistent.
#[derive(Default)]
pub(crate) struct CommitOutcome {
	pub(crate) layout: Vec<Effect>,
	/// Teardowns of effects whose units were deleted.
	pub(crate) teardowns: Vec<Teardown>,
	/// Render root whose subtree carries passive effects.
	pub(crate) passive_root: Option<FiberId>,
}

impl<H: HostRenderer> RenderState<H> {
	/// Applies the finished render to the host tree.
	///
	/// Returns `None` when no completed render is waiting.
	pub(crate) fn commit_root(&mut self) -> Option<CommitOutcome> {
		if self.work_in_progress.is_some() {
			return None;
		}
		let RenderPass { root: finished, target } = self.render.take()?;
		debug!(render_root = ?finished, "commit started");

		self.relink(finished, target);
		let mut outcome = CommitOutcome::default();
		self.commit_mutation_effects(finished, &mut outcome);
		self.context_stack.reset();

		let pending = self.arena[finished].flags | self.arena[finished].subtree_flags;
		if pending.contains(Flags::PASSIVE) {
			outcome.passive_root = Some(finished);
		}
		debug!(
			layout = outcome.layout.len(),
			teardowns = outcome.teardowns.len(),
			passive = outcome.passive_root.is_some(),
			"commit finished"
		);
		Some(outcome)
	}

	/// Puts `finished` where `target` sits in the committed tree.
	fn relink(&mut self, finished: FiberId, target: FiberId) {
		if target == self.current {
			self.current = finished;
			return;
		}
		let Some(parent) = self.arena[finished].return_ else {
			return;
		};
		if self.arena[parent].child == Some(target) {
			self.arena[parent].child = Some(finished);
			return;
		}
		let mut next = self.arena[parent].child;
		while let Some(sibling) = next {
			if self.arena[sibling].sibling == Some(target) {
				self.arena[sibling].sibling = Some(finished);
				return;
			}
			next = self.arena[sibling].sibling;
		}
	}

	fn commit_mutation_effects(&mut self, unit: FiberId, outcome: &mut CommitOutcome) {
		let deletions = mem::take(&mut self.arena[unit].deletions);
		for child in deletions {
			self.commit_deletion(unit, child, outcome);
		}

		if self.arena[unit].subtree_flags.intersects(Flags::MUTATION) {
			for child in self.arena.children(unit) {
				self.commit_mutation_effects(child, outcome);
			}
		}

		let flags = self.arena[unit].flags;
		if flags.contains(Flags::PLACEMENT) {
			self.commit_placement(unit);
		}
		if flags.contains(Flags::UPDATE) {
			self.commit_update(unit, outcome);
		}

		let fiber = &mut self.arena[unit];
		fiber.flags.remove(Flags::MUTATION);
		fiber.subtree_flags.remove(Flags::MUTATION);
	}

	/// Nearest host node able to contain the host nodes of `unit`.
	fn host_parent_handle(&self, unit: FiberId) -> Option<H::Handle> {
		let parent = self.arena.host_parent(unit)?;
		self.arena[parent].handle().cloned()
	}

	/// First host node after `unit` that is already in place.
	fn host_sibling(&self, unit: FiberId) -> Option<H::Handle> {
		let mut node = unit;
		'siblings: loop {
			while self.arena[node].sibling.is_none() {
				let parent = self.arena[node].return_?;
				if self.arena[parent].tag.is_host_parent() {
					return None;
				}
				node = parent;
			}
			node = self.arena[node].sibling?;

			while !self.arena[node].tag.is_host() {
				if self.arena[node].flags.contains(Flags::PLACEMENT) {
					continue 'siblings;
				}
				match self.arena[node].child {
					Some(child) => node = child,
					None => continue 'siblings,
				}
			}
			if !self.arena[node].flags.contains(Flags::PLACEMENT) {
				return self.arena[node].handle().cloned();
			}
		}
	}

	/// Inserts the host nodes of `unit` before the next settled host node.
	///
	/// New units below a new non-host unit carry their own placement, so only
	/// a moved non-host unit re-inserts its descendants.
	fn commit_placement(&mut self, unit: FiberId) {
		let fiber = &self.arena[unit];
		if !fiber.tag.is_host() && fiber.alternate.is_none() {
			return;
		}
		let Some(parent) = self.host_parent_handle(unit) else {
			return;
		};
		let anchor = self.host_sibling(unit);
		trace!(?unit, has_anchor = anchor.is_some(), "placement");
		for node in self.arena.top_level_host_nodes(unit) {
			match &anchor {
				Some(anchor) => self.host.insert_before(&parent, &node, anchor),
				None => self.host.append_child(&parent, &node),
			}
		}
	}

	fn commit_update(&mut self, unit: FiberId, outcome: &mut CommitOutcome) {
		let fiber = &self.arena[unit];
		match fiber.tag {
			WorkTag::HostElement => {
				let (Some(handle), Some(current)) = (fiber.handle().cloned(), fiber.alternate) else {
					return;
				};
				let Some(previous) = self.arena[current].memoized_props.clone() else {
					return;
				};
				let next = fiber.pending_props.clone();
				self.host.patch_properties(&handle, &previous, &next);
			}
			WorkTag::HostText => {
				let (Some(handle), Some(current)) = (fiber.handle().cloned(), fiber.alternate) else {
					return;
				};
				let next = fiber.text().unwrap_or_default();
				if self.arena[current].text() != Some(next) {
					let next = next.to_string();
					self.host.set_text(&handle, &next);
				}
			}
			WorkTag::FunctionComponent => {
				let queue = mem::take(&mut self.arena[unit].update_queue);
				let (layout, passive): (Vec<_>, Vec<_>) = queue
					.into_iter()
					.partition(|effect| effect.kind() == EffectKind::Layout);
				outcome.layout.extend(layout);
				self.arena[unit].update_queue = passive;
			}
			_ => {}
		}
	}

	fn commit_deletion(&mut self, parent: FiberId, child: FiberId, outcome: &mut CommitOutcome) {
		let host_parent = if self.arena[parent].tag.is_host_parent() {
			self.arena[parent].handle().cloned()
		} else {
			self.host_parent_handle(parent)
		};
		if let Some(host_parent) = host_parent {
			for node in self.arena.top_level_host_nodes(child) {
				self.host.remove_child(&host_parent, &node);
			}
		}
		self.collect_teardowns(child, &mut outcome.teardowns);
		let freed = self.arena.free_subtree(child);
		trace!(?child, freed, "subtree deleted");
	}

	/// Takes the pending teardown of every effect below (and at) `root`.
	pub(crate) fn collect_teardowns(&self, root: FiberId, teardowns: &mut Vec<Teardown>) {
		let mut stack = vec![root];
		while let Some(unit) = stack.pop() {
			let Some(fiber) = self.arena.get(unit) else {
				continue;
			};
			if let Some(hooks) = fiber.memoized_state.hooks() {
				for cell in &hooks.cells {
					if let HookCell::Effect(_, state) = cell {
						if let Some(teardown) = state.borrow_mut().take_teardown() {
							teardowns.push(teardown);
						}
					}
				}
			}
			stack.extend(self.arena.children(unit));
		}
	}

	/// Drains the passive effects queued below `root`, children before their
	/// parent, in the same order layout effects run.
	pub(crate) fn collect_passive_effects(&mut self, root: FiberId) -> Vec<Effect> {
		let mut effects = Vec::new();
		let mut stack = vec![(root, false)];
		while let Some((unit, visited)) = stack.pop() {
			let Some(fiber) = self.arena.get(unit) else {
				continue;
			};
			if !visited {
				let pending = fiber.flags | fiber.subtree_flags;
				if !pending.contains(Flags::PASSIVE) {
					continue;
				}
				stack.push((unit, true));
				let children = self.arena.children(unit);
				stack.extend(children.into_iter().rev().map(|child| (child, false)));
				continue;
			}

			let fiber = &mut self.arena[unit];
			if fiber.flags.contains(Flags::PASSIVE) {
				effects.extend(
					mem::take(&mut fiber.update_queue)
						.into_iter()
						.filter(|effect| effect.kind() == EffectKind::Passive),
				);
			}
			fiber.flags.remove(Flags::PASSIVE);
			fiber.subtree_flags.remove(Flags::PASSIVE);
		}
		effects
	}

	/// Removes the rendered tree and returns the teardowns of its effects.
	pub(crate) fn unmount(&mut self) -> Vec<Teardown> {
		self.abort_render();
		let mut teardowns = Vec::new();
		let container = self.arena[self.current].handle().cloned();
		for child in self.arena.children(self.current) {
			if let Some(container) = &container {
				for node in self.arena.top_level_host_nodes(child) {
					self.host.remove_child(container, &node);
				}
			}
			self.collect_teardowns(child, &mut teardowns);
			self.arena.free_subtree(child);
		}
		self.arena[self.current].child = None;
		debug!(remaining = self.arena.len(), "root unmounted");
		teardowns
	}
}
