//! Hook chain of function components
//!
//! A function component receives a [`HookContext`] for the duration of one
//! render. Every hook call claims the next cell of the unit's chain: on the
//! first render the cell is created, on later renders the cell created at the
//! same position is handed back. Cells are shared between the committed unit
//! and its work-in-progress copy, so state survives the buffer swap.
//!
//! Hooks must be called unconditionally and in the same order on every
//! render. A change in the kind sequence is a programming error and panics.

mod context;
mod deps;
mod effect;
mod memo;
mod state;

use core::any::Any;
use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::context::ContextId;
use crate::fiber::{FiberId, Flags};

pub use deps::{Dep, Deps, are_hook_inputs_equal};
pub(crate) use effect::{Effect, EffectKind, EffectState};
pub use effect::Teardown;
pub(crate) use memo::MemoState;
pub use state::{Dispatch, SetState};

/// Receiver of state updates dispatched by hooks.
pub(crate) trait ScheduleUpdate {
	/// Queues a render of the unit currently recorded in `owner`.
	fn schedule_update(&self, owner: &Rc<Cell<FiberId>>);
}

/// One cell of a hook chain.
#[derive(Clone)]
pub(crate) enum HookCell {
	State(Rc<RefCell<Rc<dyn Any>>>),
	Memo(Rc<RefCell<MemoState>>),
	Effect(EffectKind, Rc<RefCell<EffectState>>),
	Ref(Rc<dyn Any>),
}

impl HookCell {
	fn kind(&self) -> &'static str {
		match self {
			HookCell::State(_) => "state",
			HookCell::Memo(_) => "memo",
			HookCell::Effect(EffectKind::Passive, _) => "effect",
			HookCell::Effect(EffectKind::Layout, _) => "layout effect",
			HookCell::Ref(_) => "ref",
		}
	}
}

/// What a finished render leaves on its unit.
pub(crate) struct RenderedHooks {
	pub(crate) cells: Vec<HookCell>,
	pub(crate) effects: Vec<Effect>,
	pub(crate) flags: Flags,
	pub(crate) dependencies: Vec<ContextId>,
}

/// Per-render access to a function component's hook chain.
///
/// # Example
///
/// ```rust
/// use sylva_reconciler::{Children, Element, HookContext, Props};
///
/// fn counter(cx: &mut HookContext, _props: &Props) -> Children {
/// 	let (count, set_count) = cx.use_state(|| 0_i64);
/// 	Element::host("button")
/// 		.on("click", move |_| set_count.update(|n| n + 1))
/// 		.text(count.to_string())
/// 		.into()
/// }
///
/// let element = Element::function(counter);
/// assert!(element.tag().is_none());
/// ```
pub struct HookContext {
	previous: Option<Vec<HookCell>>,
	cells: Vec<HookCell>,
	owner: Rc<Cell<FiberId>>,
	updater: Weak<dyn ScheduleUpdate>,
	effects: Vec<Effect>,
	flags: Flags,
	dependencies: Vec<ContextId>,
}

impl fmt::Debug for HookContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookContext")
			.field("unit", &self.owner.get())
			.field("cursor", &self.cells.len())
			.field("mounting", &self.previous.is_none())
			.finish_non_exhaustive()
	}
}

impl HookContext {
	pub(crate) fn new(
		owner: Rc<Cell<FiberId>>,
		previous: Option<Vec<HookCell>>,
		updater: Weak<dyn ScheduleUpdate>,
	) -> Self {
		let capacity = previous.as_ref().map_or(0, Vec::len);
		Self {
			previous,
			cells: Vec::with_capacity(capacity),
			owner,
			updater,
			effects: Vec::new(),
			flags: Flags::empty(),
			dependencies: Vec::new(),
		}
	}

	/// True during the first render of the unit.
	pub fn is_mounting(&self) -> bool {
		self.previous.is_none()
	}

	/// Claims the next cell, creating it with `mount` on the first render.
	///
	/// Returns the cell and whether it was just created.
	fn next_cell(&mut self, kind: &'static str, mount: impl FnOnce() -> HookCell) -> (HookCell, bool) {
		let index = self.cells.len();
		let (cell, mounted) = match &self.previous {
			None => (mount(), true),
			Some(previous) => {
				let Some(cell) = previous.get(index) else {
					panic!(
						"hook #{index} ({kind}) was not called during the previous render; hooks must be called in the same order on every render"
					);
				};
				if cell.kind() != kind {
					panic!(
						"hook #{index} changed from {} to {kind}; hooks must be called in the same order on every render",
						cell.kind()
					);
				}
				(cell.clone(), false)
			}
		};
		self.cells.push(cell.clone());
		(cell, mounted)
	}

	fn push_effect(&mut self, effect: Effect) {
		self.flags |= match effect.kind() {
			EffectKind::Layout => Flags::UPDATE,
			EffectKind::Passive => Flags::PASSIVE,
		};
		self.effects.push(effect);
	}

	pub(crate) fn finish(self) -> RenderedHooks {
		if let Some(previous) = &self.previous {
			debug_assert_eq!(
				previous.len(),
				self.cells.len(),
				"rendered a different number of hooks than during the previous render"
			);
		}
		RenderedHooks {
			cells: self.cells,
			effects: self.effects,
			flags: self.flags,
			dependencies: self.dependencies,
		}
	}
}


#[cfg(test)]
mod tests {
	use super::testing::Harness;
	use rstest::rstest;

	#[rstest]
	fn test_first_render_is_mounting() {
		let mut harness = Harness::new();

		let (mounting, _) = harness.render(|cx| cx.is_mounting());
		let (remounting, _) = harness.render(|cx| cx.is_mounting());

		assert!(mounting);
		assert!(!remounting);
	}

	#[rstest]
	#[should_panic(expected = "hooks must be called in the same order")]
	fn test_kind_drift_panics() {
		let mut harness = Harness::new();
		harness.render(|cx| {
			cx.use_state(|| 1_u8);
		});

		harness.render(|cx| {
			cx.use_ref(|| 1_u8);
		});
	}

	#[rstest]
	#[should_panic(expected = "changed from effect to layout effect")]
	fn test_effect_flavor_drift_panics() {
		let mut harness = Harness::new();
		harness.render(|cx| cx.use_effect(|| {}, None));

		harness.render(|cx| cx.use_layout_effect(|| {}, None));
	}

	#[rstest]
	#[should_panic(expected = "was not called during the previous render")]
	fn test_extra_hook_panics() {
		let mut harness = Harness::new();
		harness.render(|_| {});

		harness.render(|cx| {
			cx.use_state(|| 1_u8);
		});
	}
}
