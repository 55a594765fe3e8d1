//! # Sylva Scheduler
//!
//! A cooperative, single-threaded priority scheduler that spreads work across
//! bounded time slices.
//!
//! ## Architecture
//!
//! - [`heap`]: array-backed binary min-heap keyed by `(sort_index, id)`
//! - [`Scheduler`]: the ready queue (ordered by expiration) and the delayed
//!   timer queue (ordered by start time), driven one time slice at a time
//! - [`Clock`]: time source, with [`ManualClock`] for deterministic tests
//! - [`SchedulerConfig`]: slice length and per-priority timeout budgets
//!
//! Tasks are never removed from the middle of a heap. Cancelling a task nulls
//! its callback and the task is dropped lazily when it reaches the top.
//!
//! ## Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use sylva_scheduler::{ManualClock, PriorityLevel, Scheduler};
//!
//! let scheduler = Scheduler::with_clock(ManualClock::new());
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let normal = log.clone();
//! scheduler.schedule_callback(PriorityLevel::Normal, move |_, _| {
//! 	normal.borrow_mut().push("normal");
//! 	None
//! });
//! let urgent = log.clone();
//! scheduler.schedule_callback(PriorityLevel::UserBlocking, move |_, _| {
//! 	urgent.borrow_mut().push("user-blocking");
//! 	None
//! });
//!
//! scheduler.run_until_idle();
//! assert_eq!(*log.borrow(), vec!["user-blocking", "normal"]);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod heap;
pub mod priority;
pub mod scheduler;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PriorityTimeouts, SchedulerConfig};
pub use error::{ConfigError, ParsePriorityError};
pub use heap::{HeapNode, MinHeap};
pub use priority::PriorityLevel;
pub use scheduler::{ScheduleOptions, Scheduler};
pub use task::{Task, TaskCallback, TaskId};
