//! Memoization hooks: use_memo, use_callback and use_ref

use core::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::{Deps, HookCell, HookContext, are_hook_inputs_equal};

pub(crate) struct MemoState {
	value: Rc<dyn Any>,
	deps: Deps,
}

fn downcast<T: 'static>(value: Rc<dyn Any>, hook: &str) -> Rc<T> {
	match value.downcast::<T>() {
		Ok(value) => value,
		Err(_) => panic!(
			"{hook} hook holds a value of another type than {}; hooks must be called in the same order on every render",
			core::any::type_name::<T>()
		),
	}
}

impl HookContext {
	fn memo_impl<T: 'static>(&mut self, compute: impl FnOnce() -> Rc<T>, deps: Deps) -> Rc<T> {
		let (cell, mounted) = self.next_cell("memo", || {
			HookCell::Memo(Rc::new(RefCell::new(MemoState {
				value: Rc::new(()),
				deps: Deps::new(),
			})))
		});
		let HookCell::Memo(state) = cell else {
			unreachable!("next_cell checks the kind");
		};
		if !mounted && are_hook_inputs_equal(&deps, Some(state.borrow().deps.as_slice())) {
			let value = state.borrow().value.clone();
			return downcast(value, "memo");
		}
		let value = compute();
		let mut state = state.borrow_mut();
		state.value = value.clone();
		state.deps = deps;
		value
	}

	/// Recomputes `compute` only when `deps` change.
	///
	/// # Example
	///
	/// ```rust
	/// use sylva_reconciler::{Children, HookContext, Props, deps};
	///
	/// fn total(cx: &mut HookContext, props: &Props) -> Children {
	/// 	let n = props.get_int("n").unwrap_or(0);
	/// 	let sum = cx.use_memo(move || (1..=n).sum::<i64>(), deps![n]);
	/// 	(*sum).into()
	/// }
	/// # let _ = total;
	/// ```
	pub fn use_memo<T: 'static>(&mut self, compute: impl FnOnce() -> T, deps: Deps) -> Rc<T> {
		self.memo_impl(|| Rc::new(compute()), deps)
	}

	/// Keeps the identity of `callback` stable until `deps` change.
	pub fn use_callback<F: 'static>(&mut self, callback: F, deps: Deps) -> Rc<F> {
		self.memo_impl(|| Rc::new(callback), deps)
	}

	/// A mutable cell whose identity never changes.
	///
	/// `init` runs once; writing to the cell does not schedule a render.
	pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
		let (cell, _) = self.next_cell("ref", || {
			let value: Rc<dyn Any> = Rc::new(RefCell::new(init()));
			HookCell::Ref(value)
		});
		let HookCell::Ref(value) = cell else {
			unreachable!("next_cell checks the kind");
		};
		downcast(value, "ref")
	}
}

#[cfg(test)]
mod tests {
	use super::super::testing::Harness;
	use crate::deps;
	use rstest::rstest;
	use std::cell::Cell;
	use std::rc::Rc;

	#[rstest]
	fn test_memo_recomputes_only_on_change() {
		// Arrange
		let mut harness = Harness::new();
		let calls = Cell::new(0);
		let mut render = |input: i32| {
			let (value, _) = harness.render(|cx| {
				cx.use_memo(
					|| {
						calls.set(calls.get() + 1);
						input * 10
					},
					deps![input],
				)
			});
			*value
		};

		// Act
		let results = [render(1), render(1), render(2), render(2)];

		// Assert
		assert_eq!(results, [10, 10, 20, 20]);
		assert_eq!(calls.get(), 2);
	}

	#[rstest]
	fn test_empty_deps_compute_once() {
		let mut harness = Harness::new();

		let (first, _) = harness.render(|cx| cx.use_memo(|| String::from("a"), deps![]));
		let (second, _) = harness.render(|cx| cx.use_memo(|| String::from("b"), deps![]));

		assert!(Rc::ptr_eq(&first, &second));
		assert_eq!(*second, "a");
	}

	fn add_one(x: i32) -> i32 {
		x + 1
	}

	#[rstest]
	fn test_callback_identity_is_stable() {
		let mut harness = Harness::new();

		let (first, _) = harness.render(|cx| cx.use_callback(add_one as fn(i32) -> i32, deps![]));
		let (second, _) = harness.render(|cx| cx.use_callback(add_one as fn(i32) -> i32, deps![]));

		assert_eq!(first(1), 2);
		assert!(Rc::ptr_eq(&first, &second));
	}

	#[rstest]
	fn test_ref_keeps_identity_and_value() {
		// Arrange
		let mut harness = Harness::new();
		let (first, _) = harness.render(|cx| cx.use_ref(|| 0_u32));

		// Act
		*first.borrow_mut() = 7;
		let (second, _) = harness.render(|cx| cx.use_ref(|| 0_u32));

		// Assert
		assert!(Rc::ptr_eq(&first, &second));
		assert_eq!(*second.borrow(), 7);
		assert!(harness.updater.updates.borrow().is_empty());
	}
}
