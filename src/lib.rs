//! # Sylva
//!
//! An incremental UI tree reconciler driven by a cooperative priority
//! scheduler.
//!
//! Components describe the tree they want; Sylva diffs each description
//! against the committed tree, renders in interruptible time slices, and
//! applies the minimal set of host mutations in a single commit.
//!
//! ## Feature Flags
//!
//! - `minimal` - The scheduler only
//! - `reconciler` - Work units, child diffing, hooks, context and the
//!   in-memory host
//! - `full` (default) - Everything
//!
//! ## Quick Example
//!
//! ```rust
//! # #[cfg(feature = "reconciler")]
//! # {
//! use sylva::prelude::*;
//!
//! fn counter(cx: &mut HookContext, _props: &Props) -> Children {
//! 	let (count, _set_count) = cx.use_state(|| 0_i64);
//! 	Element::host("output").text(count.to_string()).into()
//! }
//!
//! let scheduler = Scheduler::with_clock(ManualClock::new());
//! let mut host = MemoryHost::new();
//! let container = host.create_container();
//! let root = create_root(container, host, &scheduler);
//!
//! root.render(Element::function(counter)).unwrap();
//! scheduler.run_until_idle();
//!
//! assert_eq!(root.host().to_markup(container), "<output>0</output>");
//! # }
//! ```

pub use sylva_scheduler as scheduler;

#[cfg(feature = "reconciler")]
pub use sylva_reconciler as reconciler;

pub use sylva_scheduler::{
	Clock, ManualClock, PriorityLevel, Scheduler, SchedulerConfig, SystemClock, Task, TaskCallback,
};

#[cfg(feature = "reconciler")]
pub use sylva_reconciler::{
	Children, Component, Context, Element, HookContext, HostRenderer, MemoryHost, Props, Root,
	RootError, create_context, create_root,
};

/// Prelude module for convenient imports
///
/// Import everything you need with a single use statement:
///
/// ```rust
/// use sylva::prelude::*;
/// ```
pub mod prelude {
	// Scheduler - always available
	pub use crate::{ManualClock, PriorityLevel, Scheduler, SystemClock};

	#[cfg(feature = "reconciler")]
	pub use crate::{
		Children, Component, Context, Element, HookContext, MemoryHost, Props, Root, create_context,
		create_root,
	};

	#[cfg(feature = "reconciler")]
	pub use sylva_reconciler::{Teardown, deps};
}

#[cfg(test)]
mod tests {
	use super::prelude::*;
	use rstest::rstest;

	#[rstest]
	fn test_prelude_drives_a_scheduler() {
		let scheduler = Scheduler::with_clock(ManualClock::new());
		let task = scheduler.schedule_callback(PriorityLevel::Low, |_, _| None);

		scheduler.run_until_idle();

		assert!(!task.has_callback());
	}
}
