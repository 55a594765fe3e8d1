//! Roots: the entry point tying a tree, a host and a scheduler together
//!
//! A root owns the render state of one tree. Updates (new children for the
//! root, or state changes inside a component) are queued and processed by a
//! single render task on the scheduler. The task renders one queued target
//! at a time, yields between units when the slice runs out, and commits as
//! soon as a render completes. Passive effects of a commit run in a separate
//! normal-priority task, or earlier if another render is about to start.

use core::fmt;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use sylva_scheduler::{PriorityLevel, Scheduler, Task, TaskCallback};
use tracing::{debug, trace, warn};

use crate::commit::CommitOutcome;
use crate::element::Children;
use crate::error::RootError;
use crate::fiber::FiberId;
use crate::hooks::ScheduleUpdate;
use crate::host::HostRenderer;
use crate::work_loop::{RenderState, UpdateTarget};

struct RootInner<H: HostRenderer> {
	state: RefCell<RenderState<H>>,
	scheduler: Scheduler,
	queue: RefCell<VecDeque<UpdateTarget>>,
	/// Render task, present from scheduling until the queue is drained.
	callback_node: RefCell<Option<Task>>,
	/// Render root of the last commit while its passive effects are pending.
	pending_passive: Cell<Option<FiberId>>,
	unmounted: Cell<bool>,
	this: Weak<RootInner<H>>,
}

/// Aborts the render in flight if the render task unwinds.
struct RenderGuard<'a, H: HostRenderer> {
	inner: &'a RootInner<H>,
}

impl<H: HostRenderer> Drop for RenderGuard<'_, H> {
	fn drop(&mut self) {
		if !std::thread::panicking() {
			return;
		}
		warn!("render task panicked, discarding the render in flight");
		if let Ok(mut state) = self.inner.state.try_borrow_mut() {
			state.abort_render();
		}
		if let Ok(mut callback_node) = self.inner.callback_node.try_borrow_mut() {
			callback_node.take();
		}
	}
}

impl<H: HostRenderer> RootInner<H> {
	fn ensure_root_is_scheduled(&self) {
		if self.callback_node.borrow().is_some() {
			return;
		}
		let Some(this) = self.this.upgrade() else {
			return;
		};
		let priority = self.scheduler.current_priority_level();
		let task = self
			.scheduler
			.schedule_callback(priority, move |scheduler, did_timeout| {
				this.perform_render_work(scheduler, did_timeout)
			});
		trace!(task = %task.id(), %priority, "render task scheduled");
		*self.callback_node.borrow_mut() = Some(task);
	}

	fn continuation(&self) -> Option<TaskCallback> {
		let this = self.this.upgrade()?;
		Some(TaskCallback::new(move |scheduler, did_timeout| {
			this.perform_render_work(scheduler, did_timeout)
		}))
	}

	fn finish_task(&self) -> Option<TaskCallback> {
		self.callback_node.borrow_mut().take();
		None
	}

	/// Body of the render task.
	///
	/// An expired task (`did_timeout`) renders without checking the slice.
	fn perform_render_work(&self, scheduler: &Scheduler, did_timeout: bool) -> Option<TaskCallback> {
		let _guard = RenderGuard { inner: self };
		loop {
			if self.unmounted.get() {
				return self.finish_task();
			}

			let rendering = self.state.borrow().is_rendering();
			if rendering {
				self.state.borrow_mut().resume();
			} else {
				if self.queue.borrow().is_empty() {
					return self.finish_task();
				}
				if !did_timeout && scheduler.should_yield_to_host() {
					return self.continuation();
				}
				self.flush_passive_effects();
				let next = self.queue.borrow_mut().pop_front();
				let Some(target) = next else {
					return self.finish_task();
				};
				if !self.state.borrow_mut().prepare_fresh_stack(target) {
					continue;
				}
			}

			let mut state = self.state.borrow_mut();
			let complete = if did_timeout {
				state.work_loop_sync();
				true
			} else {
				state.work_loop_concurrent(scheduler)
			};
			if !complete {
				state.suspend();
				drop(state);
				return self.continuation();
			}

			let outcome = state.commit_root();
			drop(state);
			if let Some(outcome) = outcome {
				self.run_commit_effects(outcome);
			}
		}
	}

	fn run_commit_effects(&self, outcome: CommitOutcome) {
		for teardown in outcome.teardowns {
			teardown.run();
		}
		for effect in outcome.layout {
			effect.run();
		}
		if let Some(root) = outcome.passive_root {
			self.pending_passive.set(Some(root));
			let Some(this) = self.this.upgrade() else {
				return;
			};
			self.scheduler
				.schedule_callback(PriorityLevel::Normal, move |_, _| {
					this.flush_passive_effects();
					None
				});
		}
	}

	fn flush_passive_effects(&self) {
		let Some(root) = self.pending_passive.take() else {
			return;
		};
		let effects = self.state.borrow_mut().collect_passive_effects(root);
		debug!(count = effects.len(), "flushing passive effects");
		for effect in effects {
			effect.run();
		}
	}
}

impl<H: HostRenderer> ScheduleUpdate for RootInner<H> {
	fn schedule_update(&self, owner: &Rc<Cell<FiberId>>) {
		if self.unmounted.get() {
			warn!(unit = ?owner.get(), "state update on an unmounted root ignored");
			return;
		}
		{
			let mut queue = self.queue.borrow_mut();
			let queued = queue
				.iter()
				.any(|target| matches!(target, UpdateTarget::Unit(queued) if Rc::ptr_eq(queued, owner)));
			if !queued {
				queue.push_back(UpdateTarget::Unit(owner.clone()));
			}
		}
		self.ensure_root_is_scheduled();
	}
}

/// A rendered tree attached to a host container.
///
/// # Example
///
/// ```rust
/// use sylva_reconciler::{Element, MemoryHost, create_root};
/// use sylva_scheduler::{ManualClock, Scheduler};
///
/// let scheduler = Scheduler::with_clock(ManualClock::new());
/// let mut host = MemoryHost::new();
/// let container = host.create_container();
/// let root = create_root(container, host, &scheduler);
///
/// root.render(Element::host("p").text("hello")).unwrap();
/// scheduler.run_until_idle();
///
/// assert_eq!(root.host().to_markup(container), "<p>hello</p>");
/// ```
pub struct Root<H: HostRenderer> {
	inner: Rc<RootInner<H>>,
}

impl<H: HostRenderer> Clone for Root<H> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<H: HostRenderer> fmt::Debug for Root<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Root")
			.field("queued", &self.inner.queue.borrow().len())
			.field("unmounted", &self.inner.unmounted.get())
			.finish_non_exhaustive()
	}
}

/// Creates a root rendering into `container`, which `host` must own.
pub fn create_root<H: HostRenderer>(container: H::Handle, host: H, scheduler: &Scheduler) -> Root<H> {
	let inner = Rc::new_cyclic(|this: &Weak<RootInner<H>>| {
		let updater: Weak<dyn ScheduleUpdate> = this.clone();
		RootInner {
			state: RefCell::new(RenderState::new(container, host, updater)),
			scheduler: scheduler.clone(),
			queue: RefCell::new(VecDeque::new()),
			callback_node: RefCell::new(None),
			pending_passive: Cell::new(None),
			unmounted: Cell::new(false),
			this: this.clone(),
		}
	});
	Root { inner }
}

impl<H: HostRenderer> Root<H> {
	/// Queues a render of `children` into the container.
	///
	/// The render runs in a scheduler task at the ambient priority. Calling
	/// again before that task picks the update up replaces the queued
	/// children.
	pub fn render(&self, children: impl Into<Children>) -> Result<(), RootError> {
		if self.inner.unmounted.get() {
			return Err(RootError::Unmounted);
		}
		let children = children.into();
		{
			let mut queue = self.inner.queue.borrow_mut();
			match queue
				.iter_mut()
				.find(|target| matches!(target, UpdateTarget::Root(_)))
			{
				Some(queued) => *queued = UpdateTarget::Root(children),
				None => queue.push_back(UpdateTarget::Root(children)),
			}
		}
		self.inner.ensure_root_is_scheduled();
		Ok(())
	}

	/// Removes the rendered tree from the container and runs every pending
	/// effect teardown.
	pub fn unmount(&self) -> Result<(), RootError> {
		if self.inner.unmounted.get() {
			return Err(RootError::Unmounted);
		}
		let teardowns = {
			let Ok(mut state) = self.inner.state.try_borrow_mut() else {
				return Err(RootError::RenderInProgress);
			};
			self.inner.unmounted.set(true);
			state.unmount()
		};
		if let Some(task) = self.inner.callback_node.borrow_mut().take() {
			self.inner.scheduler.cancel_callback(&task);
		}
		self.inner.queue.borrow_mut().clear();
		self.inner.pending_passive.set(None);
		for teardown in teardowns {
			teardown.run();
		}
		Ok(())
	}

	pub fn is_unmounted(&self) -> bool {
		self.inner.unmounted.get()
	}

	/// Number of updates waiting for the render task.
	pub fn pending_updates(&self) -> usize {
		self.inner.queue.borrow().len()
	}

	/// True while a render has started and not yet committed.
	pub fn is_rendering(&self) -> bool {
		self.inner.state.borrow().is_rendering()
	}

	pub fn scheduler(&self) -> &Scheduler {
		&self.inner.scheduler
	}

	/// The host renderer, for inspection.
	///
	/// # Panics
	///
	/// Panics if called from inside a component render.
	pub fn host(&self) -> Ref<'_, H> {
		Ref::map(self.inner.state.borrow(), |state| &state.host)
	}

	/// The host renderer, mutably.
	///
	/// # Panics
	///
	/// Panics if called from inside a component render.
	pub fn host_mut(&self) -> RefMut<'_, H> {
		RefMut::map(self.inner.state.borrow_mut(), |state| &mut state.host)
	}

	/// Number of work units currently allocated, both buffers included.
	pub fn unit_count(&self) -> usize {
		self.inner.state.borrow().arena.len()
	}
}
