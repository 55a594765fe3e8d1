//! Cooperative priority scheduler
//!
//! The scheduler owns two heaps:
//!
//! - the ready queue, ordered by expiration time
//! - the timer queue, ordered by start time, holding delayed tasks
//!
//! Work happens in time slices. [`Scheduler::perform_work_until_deadline`]
//! runs ready tasks until the slice (`frame_interval`) is exhausted; an expired
//! task always runs even if the slice ran out. Between slices the host is free
//! to do other work. [`Scheduler::run_until_idle`] emulates a host message loop
//! by running slices back to back and sleeping the clock until the next
//! delayed task is due.

use core::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::error::ConfigError;
use crate::heap::MinHeap;
use crate::priority::PriorityLevel;
use crate::task::{Task, TaskCallback, TaskId};

/// Options for [`Scheduler::schedule_callback_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
	/// Defers the task's start time. `None` and zero both mean "ready now".
	pub delay: Option<Duration>,
}

impl ScheduleOptions {
	pub fn delayed(delay: Duration) -> Self {
		Self { delay: Some(delay) }
	}
}

struct SchedulerInner {
	config: SchedulerConfig,
	clock: Rc<dyn Clock>,
	task_queue: RefCell<MinHeap<Task>>,
	timer_queue: RefCell<MinHeap<Task>>,
	task_id_counter: Cell<u64>,
	current_task: RefCell<Option<Task>>,
	current_priority_level: Cell<PriorityLevel>,
	is_performing_work: Cell<bool>,
	is_host_callback_scheduled: Cell<bool>,
	is_host_timeout_scheduled: Cell<bool>,
	is_message_loop_running: Cell<bool>,
	host_timeout_deadline: Cell<Option<Duration>>,
	slice_start: Cell<Duration>,
	is_paused: Cell<bool>,
}

/// Single-threaded cooperative scheduler.
///
/// `Scheduler` is a cheap handle; clones share the same queues. Task callbacks
/// receive a handle so they can schedule follow-up work or check
/// [`Scheduler::should_yield_to_host`].
#[derive(Clone)]
pub struct Scheduler {
	inner: Rc<SchedulerInner>,
}

impl core::fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Scheduler")
			.field("config", &self.inner.config)
			.field("ready", &self.ready_len())
			.field("delayed", &self.delayed_len())
			.field(
				"current_priority_level",
				&self.inner.current_priority_level.get(),
			)
			.finish_non_exhaustive()
	}
}

/// Restores the ambient priority when dropped.
struct PriorityGuard<'a> {
	inner: &'a SchedulerInner,
	previous: PriorityLevel,
}

impl Drop for PriorityGuard<'_> {
	fn drop(&mut self) {
		self.inner.current_priority_level.set(self.previous);
	}
}

/// Resets flush bookkeeping when a flush ends, including by panic.
struct WorkGuard<'a> {
	inner: &'a SchedulerInner,
	previous_priority: PriorityLevel,
}

impl Drop for WorkGuard<'_> {
	fn drop(&mut self) {
		self.inner.current_task.borrow_mut().take();
		self.inner
			.current_priority_level
			.set(self.previous_priority);
		self.inner.is_performing_work.set(false);
	}
}

impl Default for Scheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl Scheduler {
	/// Creates a scheduler on the system clock with the default configuration.
	pub fn new() -> Self {
		Self::build(SchedulerConfig::default(), Rc::new(SystemClock::new()))
	}

	/// Creates a scheduler on `clock` with the default configuration.
	pub fn with_clock<C: Clock + 'static>(clock: C) -> Self {
		Self::build(SchedulerConfig::default(), Rc::new(clock))
	}

	/// Creates a scheduler after validating `config`.
	pub fn with_config<C: Clock + 'static>(
		config: SchedulerConfig,
		clock: C,
	) -> Result<Self, ConfigError> {
		config.validate()?;
		Ok(Self::build(config, Rc::new(clock)))
	}

	fn build(config: SchedulerConfig, clock: Rc<dyn Clock>) -> Self {
		Self {
			inner: Rc::new(SchedulerInner {
				config,
				clock,
				task_queue: RefCell::new(MinHeap::new()),
				timer_queue: RefCell::new(MinHeap::new()),
				task_id_counter: Cell::new(1),
				current_task: RefCell::new(None),
				current_priority_level: Cell::new(PriorityLevel::Normal),
				is_performing_work: Cell::new(false),
				is_host_callback_scheduled: Cell::new(false),
				is_host_timeout_scheduled: Cell::new(false),
				is_message_loop_running: Cell::new(false),
				host_timeout_deadline: Cell::new(None),
				slice_start: Cell::new(Duration::ZERO),
				is_paused: Cell::new(false),
			}),
		}
	}

	pub fn config(&self) -> &SchedulerConfig {
		&self.inner.config
	}

	/// Current time on the scheduler's clock.
	pub fn now(&self) -> Duration {
		self.inner.clock.now()
	}

	/// Schedules `callback` to run as soon as possible at `priority`.
	pub fn schedule_callback<F>(&self, priority: PriorityLevel, callback: F) -> Task
	where
		F: FnOnce(&Scheduler, bool) -> Option<TaskCallback> + 'static,
	{
		self.schedule_callback_with_options(priority, ScheduleOptions::default(), callback)
	}

	/// Schedules `callback` at `priority`, optionally deferring its start.
	///
	/// A delayed task sits in the timer queue until its start time, then moves
	/// to the ready queue keyed by its expiration.
	pub fn schedule_callback_with_options<F>(
		&self,
		priority: PriorityLevel,
		options: ScheduleOptions,
		callback: F,
	) -> Task
	where
		F: FnOnce(&Scheduler, bool) -> Option<TaskCallback> + 'static,
	{
		let inner = &self.inner;
		let current_time = self.now();
		let start_time = match options.delay {
			Some(delay) if delay > Duration::ZERO => current_time + delay,
			_ => current_time,
		};
		let expiration_time = start_time + inner.config.timeout_for(priority);

		let id = TaskId(inner.task_id_counter.get());
		inner.task_id_counter.set(id.0 + 1);
		let task = Task::new(
			id,
			priority,
			start_time,
			expiration_time,
			TaskCallback::new(callback),
		);

		if start_time > current_time {
			task.set_sort_index(start_time);
			inner.timer_queue.borrow_mut().push(task.clone());
			trace!(task = %id, %priority, ?start_time, "delayed task queued");

			let is_first_timer = inner
				.timer_queue
				.borrow()
				.peek()
				.is_some_and(|first| first.ptr_eq(&task));
			if inner.task_queue.borrow().is_empty() && is_first_timer {
				if inner.is_host_timeout_scheduled.get() {
					self.cancel_host_timeout();
				} else {
					inner.is_host_timeout_scheduled.set(true);
				}
				self.request_host_timeout(start_time - current_time);
			}
		} else {
			task.set_sort_index(expiration_time);
			inner.task_queue.borrow_mut().push(task.clone());
			trace!(task = %id, %priority, ?expiration_time, "task queued");

			if !inner.is_host_callback_scheduled.get() && !inner.is_performing_work.get() {
				inner.is_host_callback_scheduled.set(true);
				self.request_host_callback();
			}
		}

		task
	}

	/// Cancels `task`. The task stays in its heap and is discarded when it
	/// reaches the top.
	pub fn cancel_callback(&self, task: &Task) {
		trace!(task = %task.id(), "task cancelled");
		task.cancel();
	}

	/// Ambient priority: that of the running task, or the one set by
	/// [`Scheduler::run_with_priority`].
	pub fn current_priority_level(&self) -> PriorityLevel {
		self.inner.current_priority_level.get()
	}

	/// Runs `f` with the ambient priority set to `priority`.
	///
	/// The previous priority is restored afterwards, even if `f` panics.
	pub fn run_with_priority<R>(&self, priority: PriorityLevel, f: impl FnOnce() -> R) -> R {
		let _guard = PriorityGuard {
			inner: &self.inner,
			previous: self.inner.current_priority_level.replace(priority),
		};
		f()
	}

	/// Runs `f` at [`PriorityLevel::Normal`] unless the ambient priority is
	/// already lower than that.
	pub fn run_next<R>(&self, f: impl FnOnce() -> R) -> R {
		let priority = match self.current_priority_level() {
			PriorityLevel::Immediate | PriorityLevel::UserBlocking | PriorityLevel::Normal => {
				PriorityLevel::Normal
			}
			other => other,
		};
		self.run_with_priority(priority, f)
	}

	/// Returns `true` once the current slice has used up `frame_interval`.
	pub fn should_yield_to_host(&self) -> bool {
		let elapsed = self.now().saturating_sub(self.inner.slice_start.get());
		elapsed >= self.inner.config.frame_interval()
	}

	/// Stops the work loop from starting new tasks.
	pub fn pause_execution(&self) {
		self.inner.is_paused.set(true);
	}

	/// Resumes a paused scheduler.
	pub fn continue_execution(&self) {
		self.inner.is_paused.set(false);
		if !self.inner.is_host_callback_scheduled.get() && !self.inner.is_performing_work.get() {
			self.inner.is_host_callback_scheduled.set(true);
			self.request_host_callback();
		}
	}

	pub fn is_paused(&self) -> bool {
		self.inner.is_paused.get()
	}

	/// Number of tasks in the ready queue, cancelled ones included.
	pub fn ready_len(&self) -> usize {
		self.inner.task_queue.borrow().len()
	}

	/// Number of tasks in the timer queue, cancelled ones included.
	pub fn delayed_len(&self) -> usize {
		self.inner.timer_queue.borrow().len()
	}

	/// The task the next slice would run first.
	pub fn peek_ready(&self) -> Option<Task> {
		self.inner.task_queue.borrow().peek().cloned()
	}

	/// The task currently being run, if any.
	pub fn current_task(&self) -> Option<Task> {
		self.inner.current_task.borrow().clone()
	}

	/// Deadline of the pending host timeout, if one was requested.
	pub fn next_timeout(&self) -> Option<Duration> {
		self.inner.host_timeout_deadline.get()
	}

	/// Returns `true` when a slice has been requested and not yet run.
	pub fn has_pending_work(&self) -> bool {
		self.inner.is_message_loop_running.get()
	}

	/// Runs one time slice.
	///
	/// Returns `true` when ready work remains and another slice is needed.
	pub fn perform_work_until_deadline(&self) -> bool {
		if !self.inner.is_message_loop_running.get() {
			return false;
		}
		let current_time = self.now();
		self.inner.slice_start.set(current_time);

		// A panicking task leaves the loop running so the next slice retries.
		let has_more_work = self.flush_work(current_time);
		if !has_more_work {
			self.inner.is_message_loop_running.set(false);
		}
		has_more_work
	}

	/// Fires the pending host timeout: promotes due timers and requests a
	/// slice if anything became ready.
	pub fn handle_timeout(&self) {
		let current_time = self.now();
		self.inner.host_timeout_deadline.set(None);
		self.inner.is_host_timeout_scheduled.set(false);
		self.advance_timers(current_time);

		if self.inner.is_host_callback_scheduled.get() {
			return;
		}
		if !self.inner.task_queue.borrow().is_empty() {
			self.inner.is_host_callback_scheduled.set(true);
			self.request_host_callback();
		} else {
			self.request_timeout_for_first_timer(current_time);
		}
	}

	/// Drives the scheduler until both queues are drained or it is paused.
	///
	/// Waits for delayed tasks by sleeping the clock, so with a
	/// [`crate::ManualClock`] this returns without blocking.
	pub fn run_until_idle(&self) {
		loop {
			if self.is_paused() {
				break;
			}
			if self.inner.is_message_loop_running.get() {
				self.perform_work_until_deadline();
				continue;
			}
			let Some(deadline) = self.inner.host_timeout_deadline.get() else {
				break;
			};
			let now = self.now();
			if deadline > now {
				self.inner.clock.sleep(deadline - now);
			}
			self.handle_timeout();
		}
	}

	fn request_host_callback(&self) {
		self.inner.is_message_loop_running.set(true);
	}

	fn request_host_timeout(&self, after: Duration) {
		let deadline = self.now() + after;
		trace!(?deadline, "host timeout requested");
		self.inner.host_timeout_deadline.set(Some(deadline));
	}

	fn cancel_host_timeout(&self) {
		self.inner.host_timeout_deadline.set(None);
	}

	fn request_timeout_for_first_timer(&self, current_time: Duration) {
		let first_start = self
			.inner
			.timer_queue
			.borrow()
			.peek()
			.map(|timer| timer.start_time());
		if let Some(start_time) = first_start {
			self.request_host_timeout(start_time.saturating_sub(current_time));
		}
	}

	fn flush_work(&self, initial_time: Duration) -> bool {
		let inner = &self.inner;
		inner.is_host_callback_scheduled.set(false);
		if inner.is_host_timeout_scheduled.get() {
			inner.is_host_timeout_scheduled.set(false);
			self.cancel_host_timeout();
		}

		inner.is_performing_work.set(true);
		let _guard = WorkGuard {
			inner,
			previous_priority: inner.current_priority_level.get(),
		};
		debug!(ready = self.ready_len(), "flushing work");
		self.work_loop(initial_time)
	}

	fn work_loop(&self, initial_time: Duration) -> bool {
		let inner = &self.inner;
		let mut current_time = initial_time;
		self.advance_timers(current_time);

		loop {
			let Some(task) = self.peek_ready() else {
				break;
			};
			if inner.is_paused.get() {
				return true;
			}
			if task.expiration_time() > current_time && self.should_yield_to_host() {
				// Unexpired and out of time: yield and resume in the next slice.
				trace!(task = %task.id(), "yielding to host");
				return true;
			}

			*inner.current_task.borrow_mut() = Some(task.clone());
			match task.take_callback() {
				Some(callback) => {
					inner.current_priority_level.set(task.priority_level());
					let did_timeout = task.expiration_time() <= current_time;
					trace!(task = %task.id(), did_timeout, "running task");

					let continuation = callback.invoke(self, did_timeout);
					current_time = self.now();
					match continuation {
						Some(next) => task.set_callback(next),
						None => {
							let mut queue = inner.task_queue.borrow_mut();
							if queue.peek().is_some_and(|top| top.ptr_eq(&task)) {
								queue.pop();
							}
						}
					}
					self.advance_timers(current_time);
				}
				None => {
					inner.task_queue.borrow_mut().pop();
				}
			}
		}

		self.request_timeout_for_first_timer(current_time);
		false
	}

	/// Moves due timers to the ready queue and discards cancelled ones.
	fn advance_timers(&self, current_time: Duration) {
		let mut timers = self.inner.timer_queue.borrow_mut();
		loop {
			let Some(timer) = timers.peek() else {
				return;
			};
			if !timer.has_callback() {
				timers.pop();
			} else if timer.start_time() <= current_time {
				let Some(timer) = timers.pop() else {
					return;
				};
				timer.set_sort_index(timer.expiration_time());
				trace!(task = %timer.id(), "timer promoted");
				self.inner.task_queue.borrow_mut().push(timer);
			} else {
				return;
			}
		}
	}
}
