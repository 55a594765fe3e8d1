//! Effect hooks: use_effect and use_layout_effect
//!
//! Effects never run during render. The render records them on the unit and
//! the commit runs them: layout effects right after the host tree has been
//! mutated, passive effects in a follow-up task.

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use super::{Deps, HookCell, HookContext, are_hook_inputs_equal};

/// Cleanup returned by an effect.
///
/// It runs before the effect runs again and when the component is removed.
#[derive(Default)]
pub struct Teardown(Option<Box<dyn FnOnce()>>);

impl Teardown {
	pub fn new(f: impl FnOnce() + 'static) -> Self {
		Self(Some(Box::new(f)))
	}

	pub fn none() -> Self {
		Self(None)
	}

	pub fn is_none(&self) -> bool {
		self.0.is_none()
	}

	pub(crate) fn run(self) {
		if let Some(f) = self.0 {
			f();
		}
	}
}

impl From<()> for Teardown {
	fn from(_: ()) -> Self {
		Self::none()
	}
}

impl fmt::Debug for Teardown {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(if self.0.is_some() { "Teardown(..)" } else { "Teardown(None)" })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EffectKind {
	Layout,
	Passive,
}

/// Committed state of one effect hook.
#[derive(Default)]
pub(crate) struct EffectState {
	/// Dependencies of the last run, `None` before the first run or when the
	/// effect runs after every render.
	deps: Option<Deps>,
	teardown: Option<Teardown>,
}

impl EffectState {
	pub(crate) fn take_teardown(&mut self) -> Option<Teardown> {
		self.teardown.take()
	}
}

/// An effect queued by a render.
pub(crate) struct Effect {
	kind: EffectKind,
	create: Box<dyn FnOnce() -> Teardown>,
	deps: Option<Deps>,
	state: Rc<RefCell<EffectState>>,
}

impl Effect {
	pub(crate) fn kind(&self) -> EffectKind {
		self.kind
	}

	/// Runs the previous teardown, then the effect, and stores the new
	/// teardown and dependencies.
	pub(crate) fn run(self) {
		let previous = self.state.borrow_mut().teardown.take();
		if let Some(teardown) = previous {
			teardown.run();
		}
		let teardown = (self.create)();
		let mut state = self.state.borrow_mut();
		state.deps = self.deps;
		state.teardown = (!teardown.is_none()).then_some(teardown);
	}
}

impl fmt::Debug for Effect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Effect")
			.field("kind", &self.kind)
			.field("deps", &self.deps)
			.finish_non_exhaustive()
	}
}

impl HookContext {
	fn effect_impl<F, R>(&mut self, kind: EffectKind, create: F, deps: Option<Deps>)
	where
		F: FnOnce() -> R + 'static,
		R: Into<Teardown>,
	{
		let name = match kind {
			EffectKind::Passive => "effect",
			EffectKind::Layout => "layout effect",
		};
		let (cell, mounted) = self.next_cell(name, || {
			HookCell::Effect(kind, Rc::new(RefCell::new(EffectState::default())))
		});
		let HookCell::Effect(_, state) = cell else {
			unreachable!("next_cell checks the kind");
		};
		if !mounted {
			if let Some(next) = &deps {
				if are_hook_inputs_equal(next, state.borrow().deps.as_deref()) {
					return;
				}
			}
		}
		self.push_effect(Effect {
			kind,
			create: Box::new(move || create().into()),
			deps,
			state,
		});
	}

	/// Runs `create` after the commit, in a separate task.
	///
	/// With `Some(deps)` the effect is skipped while the dependencies compare
	/// equal to those of its last run; with `None` it runs after every render.
	/// `create` may return a [`Teardown`].
	///
	/// # Example
	///
	/// ```rust
	/// use sylva_reconciler::{Children, HookContext, Props, Teardown, deps};
	///
	/// fn ticker(cx: &mut HookContext, props: &Props) -> Children {
	/// 	let id = props.get_int("id").unwrap_or_default();
	/// 	cx.use_effect(
	/// 		move || Teardown::new(move || println!("stop {id}")),
	/// 		Some(deps![id]),
	/// 	);
	/// 	Children::Empty
	/// }
	/// # let _ = ticker;
	/// ```
	pub fn use_effect<F, R>(&mut self, create: F, deps: Option<Deps>)
	where
		F: FnOnce() -> R + 'static,
		R: Into<Teardown>,
	{
		self.effect_impl(EffectKind::Passive, create, deps);
	}

	/// Like [`HookContext::use_effect`], but runs synchronously during the
	/// commit, after the host tree has been mutated.
	pub fn use_layout_effect<F, R>(&mut self, create: F, deps: Option<Deps>)
	where
		F: FnOnce() -> R + 'static,
		R: Into<Teardown>,
	{
		self.effect_impl(EffectKind::Layout, create, deps);
	}
}

#[cfg(test)]
mod tests {
	use super::super::testing::Harness;
	use super::*;
	use crate::deps;
	use crate::fiber::Flags;
	use rstest::rstest;

	type Log = Rc<RefCell<Vec<String>>>;

	fn logging_effect(cx: &mut HookContext, log: &Log, value: i32, layout: bool) {
		let log = log.clone();
		let create = move || {
			log.borrow_mut().push(format!("run {value}"));
			let log = log.clone();
			Teardown::new(move || log.borrow_mut().push(format!("cleanup {value}")))
		};
		if layout {
			cx.use_layout_effect(create, Some(deps![value]));
		} else {
			cx.use_effect(create, Some(deps![value]));
		}
	}

	#[rstest]
	#[case(false, Flags::PASSIVE)]
	#[case(true, Flags::UPDATE)]
	fn test_effect_flags(#[case] layout: bool, #[case] expected: Flags) {
		let mut harness = Harness::new();
		let log = Log::default();

		let (_, rendered) = harness.render(|cx| logging_effect(cx, &log, 1, layout));

		assert_eq!(rendered.flags, expected);
		assert_eq!(rendered.effects.len(), 1);
		assert!(log.borrow().is_empty());
	}

	#[rstest]
	fn test_unchanged_deps_skip_effect() {
		// Arrange
		let mut harness = Harness::new();
		let log = Log::default();
		let (_, rendered) = harness.render(|cx| logging_effect(cx, &log, 1, false));
		Harness::commit(rendered);

		// Act
		let (_, same) = harness.render(|cx| logging_effect(cx, &log, 1, false));

		// Assert
		assert!(same.effects.is_empty());
		assert!(same.flags.is_empty());
		assert_eq!(*log.borrow(), vec!["run 1"]);
	}

	#[rstest]
	fn test_changed_deps_run_teardown_first() {
		// Arrange
		let mut harness = Harness::new();
		let log = Log::default();
		let (_, rendered) = harness.render(|cx| logging_effect(cx, &log, 1, true));
		Harness::commit(rendered);

		// Act
		let (_, changed) = harness.render(|cx| logging_effect(cx, &log, 2, true));
		Harness::commit(changed);

		// Assert
		assert_eq!(*log.borrow(), vec!["run 1", "cleanup 1", "run 2"]);
	}

	#[rstest]
	fn test_effect_without_deps_runs_every_render() {
		let mut harness = Harness::new();
		let count = Rc::new(RefCell::new(0));

		for _ in 0..3 {
			let count = count.clone();
			let (_, rendered) = harness.render(move |cx| {
				cx.use_effect(move || *count.borrow_mut() += 1, None);
			});
			Harness::commit(rendered);
		}

		assert_eq!(*count.borrow(), 3);
	}
}
