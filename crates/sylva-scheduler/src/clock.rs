//! Time sources
//!
//! The scheduler measures everything as a [`Duration`] since an arbitrary
//! origin. [`SystemClock`] reads a monotonic clock; [`ManualClock`] only moves
//! when told to, which makes slice exhaustion and delayed timers reproducible
//! in tests.

use core::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock {
	/// Time elapsed since the clock's origin.
	fn now(&self) -> Duration;

	/// Blocks until `duration` has passed.
	///
	/// Used by [`crate::Scheduler::run_until_idle`] while waiting for the
	/// earliest delayed task.
	fn sleep(&self, duration: Duration) {
		std::thread::sleep(duration);
	}
}

/// Wall-clock time source backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
	origin: Instant,
}

impl SystemClock {
	/// Creates a clock whose origin is now.
	pub fn new() -> Self {
		Self {
			origin: Instant::now(),
		}
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now(&self) -> Duration {
		self.origin.elapsed()
	}
}

/// Simulated time source.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to the scheduler. `sleep` advances the shared time instead of
/// blocking.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use sylva_scheduler::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
///
/// handle.advance(Duration::from_millis(50));
/// assert_eq!(clock.now(), Duration::from_millis(50));
///
/// clock.sleep(Duration::from_millis(25));
/// assert_eq!(handle.now(), Duration::from_millis(75));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
	now: Rc<Cell<Duration>>,
}

impl ManualClock {
	/// Creates a clock starting at zero.
	pub fn new() -> Self {
		Self::default()
	}

	/// Moves time forward by `duration`.
	pub fn advance(&self, duration: Duration) {
		self.now.set(self.now.get() + duration);
	}

	/// Sets the absolute time. Moving backwards is ignored.
	pub fn set(&self, now: Duration) {
		if now > self.now.get() {
			self.now.set(now);
		}
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Duration {
		self.now.get()
	}

	fn sleep(&self, duration: Duration) {
		self.advance(duration);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_manual_clock_never_goes_backwards() {
		let clock = ManualClock::new();
		clock.set(Duration::from_millis(10));
		clock.set(Duration::from_millis(3));
		assert_eq!(clock.now(), Duration::from_millis(10));
	}

	#[rstest]
	fn test_system_clock_is_monotonic() {
		let clock = SystemClock::new();
		let first = clock.now();
		let second = clock.now();
		assert!(second >= first);
	}
}
