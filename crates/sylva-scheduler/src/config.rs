//! Scheduler configuration
//!
//! All values are plain milliseconds so the configuration can be loaded from
//! JSON or TOML with serde. Missing fields fall back to the defaults below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::priority::PriorityLevel;

/// Default length of one time slice.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 5;
/// Budget for [`PriorityLevel::Immediate`] tasks; they are expired on arrival.
pub const IMMEDIATE_TIMEOUT_MS: u64 = 0;
/// Budget for [`PriorityLevel::UserBlocking`] tasks.
pub const USER_BLOCKING_TIMEOUT_MS: u64 = 250;
/// Budget for [`PriorityLevel::Normal`] tasks.
pub const NORMAL_TIMEOUT_MS: u64 = 5000;
/// Budget for [`PriorityLevel::Low`] tasks.
pub const LOW_TIMEOUT_MS: u64 = 10000;
/// Budget for [`PriorityLevel::Idle`] tasks (2^30 - 1, effectively never).
pub const IDLE_TIMEOUT_MS: u64 = 1_073_741_823;

/// Timeout budget per priority level, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityTimeouts {
	pub immediate_ms: u64,
	pub user_blocking_ms: u64,
	pub normal_ms: u64,
	pub low_ms: u64,
	pub idle_ms: u64,
}

impl Default for PriorityTimeouts {
	fn default() -> Self {
		Self {
			immediate_ms: IMMEDIATE_TIMEOUT_MS,
			user_blocking_ms: USER_BLOCKING_TIMEOUT_MS,
			normal_ms: NORMAL_TIMEOUT_MS,
			low_ms: LOW_TIMEOUT_MS,
			idle_ms: IDLE_TIMEOUT_MS,
		}
	}
}

impl PriorityTimeouts {
	/// Budget in milliseconds for `level`.
	pub fn millis_for(&self, level: PriorityLevel) -> u64 {
		match level {
			PriorityLevel::Immediate => self.immediate_ms,
			PriorityLevel::UserBlocking => self.user_blocking_ms,
			PriorityLevel::Normal => self.normal_ms,
			PriorityLevel::Low => self.low_ms,
			PriorityLevel::Idle => self.idle_ms,
		}
	}
}

/// Tunables for a [`crate::Scheduler`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use sylva_scheduler::{PriorityLevel, SchedulerConfig};
///
/// let config = SchedulerConfig::default().with_frame_interval(Duration::from_millis(16));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.frame_interval(), Duration::from_millis(16));
/// assert_eq!(config.timeout_for(PriorityLevel::Normal), Duration::from_millis(5000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
	/// Length of one time slice before the work loop yields to the host.
	pub frame_interval_ms: u64,
	/// Per-priority timeout budgets.
	pub timeouts: PriorityTimeouts,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
			timeouts: PriorityTimeouts::default(),
		}
	}
}

impl SchedulerConfig {
	/// Sets the slice length. Sub-millisecond precision is truncated.
	pub fn with_frame_interval(mut self, interval: Duration) -> Self {
		self.frame_interval_ms = interval.as_millis() as u64;
		self
	}

	pub fn with_timeouts(mut self, timeouts: PriorityTimeouts) -> Self {
		self.timeouts = timeouts;
		self
	}

	pub fn frame_interval(&self) -> Duration {
		Duration::from_millis(self.frame_interval_ms)
	}

	/// Timeout budget for `level`.
	pub fn timeout_for(&self, level: PriorityLevel) -> Duration {
		Duration::from_millis(self.timeouts.millis_for(level))
	}

	/// Checks that the slice is non-empty and that budgets strictly grow from
	/// `Immediate` to `Idle`.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.frame_interval_ms == 0 {
			return Err(ConfigError::ZeroFrameInterval);
		}

		for pair in PriorityLevel::ALL.windows(2) {
			let (urgent, relaxed) = (pair[0], pair[1]);
			let urgent_ms = self.timeouts.millis_for(urgent);
			let relaxed_ms = self.timeouts.millis_for(relaxed);
			if urgent_ms >= relaxed_ms {
				return Err(ConfigError::TimeoutOrder {
					urgent,
					urgent_ms,
					relaxed,
					relaxed_ms,
				});
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults_are_valid() {
		let config = SchedulerConfig::default();
		assert_eq!(config.frame_interval(), Duration::from_millis(5));
		assert_eq!(config.timeout_for(PriorityLevel::Immediate), Duration::ZERO);
		assert_eq!(
			config.timeout_for(PriorityLevel::Idle),
			Duration::from_millis(1_073_741_823)
		);
		assert!(config.validate().is_ok());
	}

	#[rstest]
	fn test_zero_frame_interval_is_rejected() {
		let config = SchedulerConfig::default().with_frame_interval(Duration::from_micros(400));
		assert_eq!(config.validate(), Err(ConfigError::ZeroFrameInterval));
	}

	#[rstest]
	fn test_timeouts_must_increase() {
		let timeouts = PriorityTimeouts {
			low_ms: 4000,
			..PriorityTimeouts::default()
		};
		let config = SchedulerConfig::default().with_timeouts(timeouts);

		assert_eq!(
			config.validate(),
			Err(ConfigError::TimeoutOrder {
				urgent: PriorityLevel::Normal,
				urgent_ms: 5000,
				relaxed: PriorityLevel::Low,
				relaxed_ms: 4000,
			})
		);
	}
}
