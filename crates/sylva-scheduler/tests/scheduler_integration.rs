//! End-to-end scheduler behaviour on a simulated clock.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::time::Duration;

use rstest::{fixture, rstest};
use sylva_scheduler::{
	Clock, ManualClock, PriorityLevel, ScheduleOptions, Scheduler, SchedulerConfig, Task,
	TaskCallback,
};

type Log = Rc<RefCell<Vec<String>>>;

struct Harness {
	clock: ManualClock,
	scheduler: Scheduler,
	log: Log,
}

impl Harness {
	fn record(&self, priority: PriorityLevel, label: &str) -> Task {
		let log = self.log.clone();
		let label = label.to_string();
		self.scheduler.schedule_callback(priority, move |_, _| {
			log.borrow_mut().push(label);
			None
		})
	}

	fn entries(&self) -> Vec<String> {
		self.log.borrow().clone()
	}
}

#[fixture]
fn harness() -> Harness {
	let clock = ManualClock::new();
	Harness {
		scheduler: Scheduler::with_clock(clock.clone()),
		clock,
		log: Rc::new(RefCell::new(Vec::new())),
	}
}

#[rstest]
fn test_user_blocking_runs_before_normal(harness: Harness) {
	// Arrange
	let normal = harness.record(PriorityLevel::Normal, "normal");
	let urgent = harness.record(PriorityLevel::UserBlocking, "user-blocking");

	// Assert
	assert!(urgent.expiration_time() < normal.expiration_time());
	assert!(
		harness
			.scheduler
			.peek_ready()
			.is_some_and(|top| top.ptr_eq(&urgent))
	);

	// Act
	harness.scheduler.run_until_idle();

	// Assert
	assert_eq!(harness.entries(), vec!["user-blocking", "normal"]);
	assert_eq!(harness.scheduler.ready_len(), 0);
}

#[rstest]
fn test_same_priority_runs_in_insertion_order(harness: Harness) {
	for label in ["a", "b", "c"] {
		harness.record(PriorityLevel::Low, label);
	}

	harness.scheduler.run_until_idle();

	assert_eq!(harness.entries(), vec!["a", "b", "c"]);
}

#[rstest]
fn test_delayed_task_is_promoted_once_due(harness: Harness) {
	// Arrange
	let log = harness.log.clone();
	let delayed = harness.scheduler.schedule_callback_with_options(
		PriorityLevel::Normal,
		ScheduleOptions::delayed(Duration::from_millis(50)),
		move |_, _| {
			log.borrow_mut().push("delayed".into());
			None
		},
	);
	assert_eq!(delayed.start_time(), Duration::from_millis(50));
	assert_eq!(harness.scheduler.ready_len(), 0);
	assert_eq!(harness.scheduler.delayed_len(), 1);

	// Act: not yet due
	harness.clock.advance(Duration::from_millis(49));
	harness.scheduler.handle_timeout();

	// Assert
	assert_eq!(harness.scheduler.ready_len(), 0);
	assert_eq!(harness.scheduler.delayed_len(), 1);

	// Act: due
	harness.clock.advance(Duration::from_millis(1));
	harness.scheduler.handle_timeout();

	// Assert
	assert_eq!(harness.scheduler.ready_len(), 1);
	assert_eq!(harness.scheduler.delayed_len(), 0);
	assert_eq!(delayed.sort_index(), delayed.expiration_time());

	harness.scheduler.run_until_idle();
	assert_eq!(harness.entries(), vec!["delayed"]);
	assert_eq!(harness.scheduler.ready_len(), 0);
}

#[rstest]
fn test_run_until_idle_waits_for_timers(harness: Harness) {
	let log = harness.log.clone();
	harness.scheduler.schedule_callback_with_options(
		PriorityLevel::Normal,
		ScheduleOptions::delayed(Duration::from_millis(20)),
		move |_, _| {
			log.borrow_mut().push("later".into());
			None
		},
	);
	harness.record(PriorityLevel::Low, "now");

	harness.scheduler.run_until_idle();

	assert_eq!(harness.entries(), vec!["now", "later"]);
	assert_eq!(harness.clock.now(), Duration::from_millis(20));
}

#[rstest]
fn test_cancelled_task_is_skipped(harness: Harness) {
	// Arrange
	harness.record(PriorityLevel::Normal, "first");
	let cancelled = harness.record(PriorityLevel::Normal, "cancelled");
	harness.record(PriorityLevel::Normal, "third");

	// Act
	harness.scheduler.cancel_callback(&cancelled);

	// Assert: still queued until it reaches the top
	assert!(!cancelled.has_callback());
	assert_eq!(harness.scheduler.ready_len(), 3);

	harness.record(PriorityLevel::UserBlocking, "urgent");
	harness.scheduler.run_until_idle();

	assert_eq!(harness.entries(), vec!["urgent", "first", "third"]);
	assert_eq!(harness.scheduler.ready_len(), 0);
}

#[rstest]
fn test_cancelled_delayed_task_never_runs(harness: Harness) {
	let ran = Rc::new(Cell::new(false));
	let flag = ran.clone();
	let task = harness.scheduler.schedule_callback_with_options(
		PriorityLevel::Normal,
		ScheduleOptions::delayed(Duration::from_millis(5)),
		move |_, _| {
			flag.set(true);
			None
		},
	);

	harness.scheduler.cancel_callback(&task);
	harness.scheduler.run_until_idle();

	assert!(!ran.get());
	assert_eq!(harness.scheduler.delayed_len(), 0);
}

#[rstest]
fn test_slice_yields_when_time_runs_out(harness: Harness) {
	// Arrange: each task burns 3ms of a 5ms slice
	for label in ["a", "b", "c"] {
		let log = harness.log.clone();
		let clock = harness.clock.clone();
		let label = label.to_string();
		harness
			.scheduler
			.schedule_callback(PriorityLevel::Normal, move |_, _| {
				clock.advance(Duration::from_millis(3));
				log.borrow_mut().push(label);
				None
			});
	}

	// Act
	let has_more = harness.scheduler.perform_work_until_deadline();

	// Assert
	assert!(has_more);
	assert_eq!(harness.entries(), vec!["a", "b"]);

	assert!(!harness.scheduler.perform_work_until_deadline());
	assert_eq!(harness.entries(), vec!["a", "b", "c"]);
}

#[rstest]
fn test_expired_task_runs_even_when_slice_is_exhausted(harness: Harness) {
	let clock = harness.clock.clone();
	let log = harness.log.clone();
	harness
		.scheduler
		.schedule_callback(PriorityLevel::Normal, move |_, _| {
			clock.advance(Duration::from_millis(10));
			log.borrow_mut().push("slow".into());
			None
		});
	let log = harness.log.clone();
	harness
		.scheduler
		.schedule_callback(PriorityLevel::Immediate, move |_, did_timeout| {
			log.borrow_mut().push(format!("immediate:{did_timeout}"));
			None
		});

	harness.scheduler.perform_work_until_deadline();

	// Immediate runs first and has already timed out on arrival.
	assert_eq!(harness.entries(), vec!["immediate:true", "slow"]);
}

#[rstest]
fn test_continuation_keeps_task_in_queue(harness: Harness) {
	let steps = Rc::new(Cell::new(0));
	let counter = steps.clone();

	fn step(counter: Rc<Cell<u32>>) -> TaskCallback {
		TaskCallback::new(move |_, _| {
			counter.set(counter.get() + 1);
			if counter.get() < 3 {
				Some(step(counter))
			} else {
				None
			}
		})
	}

	let task = harness
		.scheduler
		.schedule_callback(PriorityLevel::Normal, move |_, _| Some(step(counter)));

	harness.scheduler.run_until_idle();

	assert_eq!(steps.get(), 3);
	assert!(!task.has_callback());
	assert_eq!(harness.scheduler.ready_len(), 0);
}

#[rstest]
fn test_task_sees_its_own_priority(harness: Harness) {
	let seen = Rc::new(Cell::new(None));
	let slot = seen.clone();
	harness
		.scheduler
		.schedule_callback(PriorityLevel::Low, move |scheduler, _| {
			slot.set(Some(scheduler.current_priority_level()));
			None
		});

	harness.scheduler.run_until_idle();

	assert_eq!(seen.get(), Some(PriorityLevel::Low));
	assert_eq!(
		harness.scheduler.current_priority_level(),
		PriorityLevel::Normal
	);
}

#[rstest]
fn test_panicking_task_restores_bookkeeping(harness: Harness) {
	// Arrange
	harness
		.scheduler
		.schedule_callback(PriorityLevel::Idle, |_, _| panic!("task failed"));
	harness.record(PriorityLevel::Idle, "after");

	// Act
	let result = catch_unwind(AssertUnwindSafe(|| {
		harness.scheduler.perform_work_until_deadline()
	}));

	// Assert
	assert!(result.is_err());
	assert_eq!(
		harness.scheduler.current_priority_level(),
		PriorityLevel::Normal
	);
	assert!(harness.scheduler.current_task().is_none());
	assert!(harness.scheduler.has_pending_work());

	harness.scheduler.run_until_idle();
	assert_eq!(harness.entries(), vec!["after"]);
}

#[rstest]
fn test_run_with_priority_restores_after_panic(harness: Harness) {
	let result = catch_unwind(AssertUnwindSafe(|| {
		harness
			.scheduler
			.run_with_priority(PriorityLevel::Immediate, || -> u8 { panic!("boom") })
	}));

	assert!(result.is_err());
	assert_eq!(
		harness.scheduler.current_priority_level(),
		PriorityLevel::Normal
	);
}

#[rstest]
fn test_config_from_json() {
	// Arrange
	let json = r#"{ "frame_interval_ms": 16, "timeouts": { "user_blocking_ms": 100 } }"#;

	// Act
	let config: SchedulerConfig = serde_json::from_str(json).unwrap();
	let scheduler = Scheduler::with_config(config, ManualClock::new()).unwrap();

	// Assert
	assert_eq!(scheduler.config().frame_interval(), Duration::from_millis(16));
	assert_eq!(
		scheduler.config().timeout_for(PriorityLevel::UserBlocking),
		Duration::from_millis(100)
	);
	assert_eq!(
		scheduler.config().timeout_for(PriorityLevel::Normal),
		Duration::from_millis(5000)
	);
}

#[rstest]
fn test_invalid_config_is_rejected() {
	let json = r#"{ "frame_interval_ms": 0 }"#;
	let config: SchedulerConfig = serde_json::from_str(json).unwrap();

	let err = Scheduler::with_config(config, ManualClock::new()).unwrap_err();

	assert_eq!(err.to_string(), "frame interval must be greater than zero");
}
