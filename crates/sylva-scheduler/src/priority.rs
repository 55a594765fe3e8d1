//! Priority levels

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParsePriorityError;

/// Urgency class of a scheduled task.
///
/// Each level maps to a timeout budget (see [`crate::PriorityTimeouts`]); a
/// task's expiration is its start time plus that budget, and the ready queue is
/// ordered by expiration. Variants are declared from most to least urgent, so
/// the derived `Ord` agrees with urgency.
///
/// # Example
///
/// ```rust
/// use sylva_scheduler::PriorityLevel;
///
/// assert!(PriorityLevel::Immediate < PriorityLevel::Idle);
/// assert_eq!("user_blocking".parse::<PriorityLevel>(), Ok(PriorityLevel::UserBlocking));
/// assert_eq!(PriorityLevel::from_level(42), PriorityLevel::Normal);
/// ```
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
	/// Must run as soon as possible; its budget is already exhausted on arrival.
	Immediate = 1,
	/// Direct response to user input.
	UserBlocking = 2,
	/// Default level for updates and follow-up work.
	#[default]
	Normal = 3,
	/// Work that can wait.
	Low = 4,
	/// Only runs when nothing else is pending.
	Idle = 5,
}

impl PriorityLevel {
	/// All levels, most urgent first.
	pub const ALL: [PriorityLevel; 5] = [
		PriorityLevel::Immediate,
		PriorityLevel::UserBlocking,
		PriorityLevel::Normal,
		PriorityLevel::Low,
		PriorityLevel::Idle,
	];

	/// Converts a numeric level (1 = Immediate ... 5 = Idle).
	///
	/// Unknown levels normalise to [`PriorityLevel::Normal`].
	pub fn from_level(level: u8) -> Self {
		match level {
			1 => PriorityLevel::Immediate,
			2 => PriorityLevel::UserBlocking,
			3 => PriorityLevel::Normal,
			4 => PriorityLevel::Low,
			5 => PriorityLevel::Idle,
			_ => PriorityLevel::Normal,
		}
	}

	/// Numeric level of this priority.
	pub fn level(self) -> u8 {
		self as u8
	}

	/// Snake-case name, as used in configuration files.
	pub fn as_str(self) -> &'static str {
		match self {
			PriorityLevel::Immediate => "immediate",
			PriorityLevel::UserBlocking => "user_blocking",
			PriorityLevel::Normal => "normal",
			PriorityLevel::Low => "low",
			PriorityLevel::Idle => "idle",
		}
	}
}

impl fmt::Display for PriorityLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PriorityLevel {
	type Err = ParsePriorityError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
			"immediate" => Ok(PriorityLevel::Immediate),
			"user_blocking" | "userblocking" => Ok(PriorityLevel::UserBlocking),
			"normal" => Ok(PriorityLevel::Normal),
			"low" => Ok(PriorityLevel::Low),
			"idle" => Ok(PriorityLevel::Idle),
			_ => Err(ParsePriorityError(s.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(1, PriorityLevel::Immediate)]
	#[case(2, PriorityLevel::UserBlocking)]
	#[case(3, PriorityLevel::Normal)]
	#[case(4, PriorityLevel::Low)]
	#[case(5, PriorityLevel::Idle)]
	#[case(0, PriorityLevel::Normal)]
	#[case(99, PriorityLevel::Normal)]
	fn test_from_level(#[case] level: u8, #[case] expected: PriorityLevel) {
		assert_eq!(PriorityLevel::from_level(level), expected);
	}

	#[rstest]
	fn test_level_round_trip() {
		for priority in PriorityLevel::ALL {
			assert_eq!(PriorityLevel::from_level(priority.level()), priority);
		}
	}

	#[rstest]
	#[case("immediate", PriorityLevel::Immediate)]
	#[case("User-Blocking", PriorityLevel::UserBlocking)]
	#[case(" idle ", PriorityLevel::Idle)]
	fn test_parse(#[case] input: &str, #[case] expected: PriorityLevel) {
		assert_eq!(input.parse::<PriorityLevel>(), Ok(expected));
	}

	#[rstest]
	fn test_parse_unknown() {
		let err = "urgent".parse::<PriorityLevel>().unwrap_err();
		assert_eq!(err.to_string(), "unknown priority level: urgent");
	}

	#[rstest]
	fn test_ordering_matches_urgency() {
		let mut sorted = PriorityLevel::ALL;
		sorted.reverse();
		sorted.sort();
		assert_eq!(sorted, PriorityLevel::ALL);
		assert_eq!(PriorityLevel::default(), PriorityLevel::Normal);
	}
}
