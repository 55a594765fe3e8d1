//! Scheduled tasks

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::heap::HeapNode;
use crate::priority::PriorityLevel;
use crate::scheduler::Scheduler;

/// Monotonic task identifier, assigned in scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "task#{}", self.0)
	}
}

type BoxedCallback = Box<dyn FnOnce(&Scheduler, bool) -> Option<TaskCallback>>;

/// A unit of work.
///
/// The callback receives the scheduler and `did_timeout` (whether the task's
/// expiration had passed when it was invoked). Returning `Some` keeps the task
/// in the queue with the returned continuation; returning `None` completes it.
pub struct TaskCallback(BoxedCallback);

impl TaskCallback {
	pub fn new<F>(callback: F) -> Self
	where
		F: FnOnce(&Scheduler, bool) -> Option<TaskCallback> + 'static,
	{
		Self(Box::new(callback))
	}

	pub(crate) fn invoke(self, scheduler: &Scheduler, did_timeout: bool) -> Option<TaskCallback> {
		(self.0)(scheduler, did_timeout)
	}
}

impl fmt::Debug for TaskCallback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("TaskCallback(..)")
	}
}

#[derive(Debug)]
struct TaskInner {
	id: TaskId,
	priority_level: PriorityLevel,
	start_time: Duration,
	expiration_time: Duration,
	sort_index: Cell<Duration>,
	callback: RefCell<Option<TaskCallback>>,
}

/// Handle to a scheduled task.
///
/// Cloning shares the task. The handle returned by
/// [`Scheduler::schedule_callback`] is what [`Scheduler::cancel_callback`]
/// expects.
#[derive(Debug, Clone)]
pub struct Task {
	inner: Rc<TaskInner>,
}

impl Task {
	pub(crate) fn new(
		id: TaskId,
		priority_level: PriorityLevel,
		start_time: Duration,
		expiration_time: Duration,
		callback: TaskCallback,
	) -> Self {
		Self {
			inner: Rc::new(TaskInner {
				id,
				priority_level,
				start_time,
				expiration_time,
				sort_index: Cell::new(Duration::ZERO),
				callback: RefCell::new(Some(callback)),
			}),
		}
	}

	pub fn id(&self) -> TaskId {
		self.inner.id
	}

	pub fn priority_level(&self) -> PriorityLevel {
		self.inner.priority_level
	}

	/// Earliest time the task may run.
	pub fn start_time(&self) -> Duration {
		self.inner.start_time
	}

	/// Start time plus the priority's timeout budget.
	pub fn expiration_time(&self) -> Duration {
		self.inner.expiration_time
	}

	/// Current heap ordering value: start time while delayed, expiration once
	/// ready.
	pub fn sort_index(&self) -> Duration {
		self.inner.sort_index.get()
	}

	/// Returns `false` once the task has been cancelled or has completed.
	pub fn has_callback(&self) -> bool {
		self.inner.callback.borrow().is_some()
	}

	pub(crate) fn set_sort_index(&self, sort_index: Duration) {
		self.inner.sort_index.set(sort_index);
	}

	pub(crate) fn take_callback(&self) -> Option<TaskCallback> {
		self.inner.callback.borrow_mut().take()
	}

	pub(crate) fn set_callback(&self, callback: TaskCallback) {
		*self.inner.callback.borrow_mut() = Some(callback);
	}

	pub(crate) fn cancel(&self) {
		// Dropping the callback can run arbitrary destructors, so release
		// the borrow first.
		let callback = self.take_callback();
		drop(callback);
	}

	/// Returns `true` when both handles refer to the same task.
	pub fn ptr_eq(&self, other: &Task) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl HeapNode for Task {
	type Key = (Duration, TaskId);

	fn key(&self) -> Self::Key {
		(self.inner.sort_index.get(), self.inner.id)
	}
}
