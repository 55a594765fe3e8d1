//! Scheduler error types

use crate::priority::PriorityLevel;

/// Error returned when a [`crate::SchedulerConfig`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
	/// The time slice would be empty, so every task would yield immediately.
	#[error("frame interval must be greater than zero")]
	ZeroFrameInterval,

	/// A more urgent level was given a budget that is not strictly shorter.
	#[error(
		"timeout for {urgent} priority ({urgent_ms}ms) must be shorter than for {relaxed} priority ({relaxed_ms}ms)"
	)]
	TimeoutOrder {
		/// The more urgent level
		urgent: PriorityLevel,
		/// Its configured budget
		urgent_ms: u64,
		/// The less urgent level
		relaxed: PriorityLevel,
		/// Its configured budget
		relaxed_ms: u64,
	},
}

/// Error returned when parsing a [`PriorityLevel`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority level: {0}")]
pub struct ParsePriorityError(pub String);
