//! State hooks: use_state and use_reducer

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::{HookCell, HookContext, ScheduleUpdate};
use crate::fiber::FiberId;

type StateCell = Rc<RefCell<Rc<dyn Any>>>;

fn read<T: 'static>(cell: &StateCell) -> Rc<T> {
	let value = cell.borrow().clone();
	match value.downcast::<T>() {
		Ok(value) => value,
		Err(_) => panic!(
			"state hook holds a value of another type than {}; hooks must be called in the same order on every render",
			core::any::type_name::<T>()
		),
	}
}

struct Dispatcher {
	cell: StateCell,
	owner: Rc<Cell<FiberId>>,
	updater: Weak<dyn ScheduleUpdate>,
}

impl Dispatcher {
	fn store(&self, value: Rc<dyn Any>) {
		*self.cell.borrow_mut() = value;
		trace!(unit = ?self.owner.get(), "state updated");
		if let Some(updater) = self.updater.upgrade() {
			updater.schedule_update(&self.owner);
		}
	}
}

/// Setter returned by [`HookContext::use_state`].
///
/// Replacing the value stores it immediately and schedules a render of the
/// owning component. Setters are cheap to clone and stay valid across renders.
pub struct SetState<T> {
	dispatcher: Rc<Dispatcher>,
	_marker: PhantomData<fn(T)>,
}

impl<T> Clone for SetState<T> {
	fn clone(&self) -> Self {
		Self {
			dispatcher: self.dispatcher.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> fmt::Debug for SetState<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SetState")
			.field("unit", &self.dispatcher.owner.get())
			.finish()
	}
}

impl<T: 'static> SetState<T> {
	pub fn set(&self, value: T) {
		self.dispatcher.store(Rc::new(value));
	}

	/// Replaces the value with `f(current)`.
	pub fn update(&self, f: impl FnOnce(&T) -> T) {
		let current = read::<T>(&self.dispatcher.cell);
		self.set(f(&current));
	}

	/// Latest stored value, including updates not yet rendered.
	pub fn get(&self) -> Rc<T> {
		read(&self.dispatcher.cell)
	}
}

/// Dispatcher returned by [`HookContext::use_reducer`].
pub struct Dispatch<A> {
	dispatcher: Rc<Dispatcher>,
	reduce: Rc<dyn Fn(&Rc<dyn Any>, A) -> Rc<dyn Any>>,
}

impl<A> Clone for Dispatch<A> {
	fn clone(&self) -> Self {
		Self {
			dispatcher: self.dispatcher.clone(),
			reduce: self.reduce.clone(),
		}
	}
}

impl<A> fmt::Debug for Dispatch<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dispatch")
			.field("unit", &self.dispatcher.owner.get())
			.finish()
	}
}

impl<A> Dispatch<A> {
	/// Applies the reducer to the stored state and `action`.
	pub fn dispatch(&self, action: A) {
		let current = self.dispatcher.cell.borrow().clone();
		let next = (self.reduce)(&current, action);
		self.dispatcher.store(next);
	}
}

impl HookContext {
	fn state_cell(&mut self, init: impl FnOnce() -> Rc<dyn Any>) -> StateCell {
		let (cell, _) = self.next_cell("state", || HookCell::State(Rc::new(RefCell::new(init()))));
		match cell {
			HookCell::State(cell) => cell,
			_ => unreachable!("next_cell checks the kind"),
		}
	}

	fn dispatcher(&self, cell: StateCell) -> Rc<Dispatcher> {
		Rc::new(Dispatcher {
			cell,
			owner: self.owner.clone(),
			updater: self.updater.clone(),
		})
	}

	/// Local state of the component.
	///
	/// `init` runs only on the first render; later renders return the stored
	/// value.
	///
	/// # Example
	///
	/// ```rust
	/// use sylva_reconciler::{Children, HookContext, Props};
	///
	/// fn toggle(cx: &mut HookContext, _props: &Props) -> Children {
	/// 	let (on, set_on) = cx.use_state(|| false);
	/// 	let _ = set_on;
	/// 	if *on { "on".into() } else { "off".into() }
	/// }
	/// # let _ = toggle;
	/// ```
	pub fn use_state<T: 'static>(&mut self, init: impl FnOnce() -> T) -> (Rc<T>, SetState<T>) {
		let cell = self.state_cell(|| Rc::new(init()));
		let value = read::<T>(&cell);
		let setter = SetState {
			dispatcher: self.dispatcher(cell),
			_marker: PhantomData,
		};
		(value, setter)
	}

	/// State updated through a reducer.
	///
	/// Dispatching an action stores `reducer(&state, action)` and schedules a
	/// render of the component.
	pub fn use_reducer<S, A, R>(&mut self, reducer: R, init: impl FnOnce() -> S) -> (Rc<S>, Dispatch<A>)
	where
		S: 'static,
		A: 'static,
		R: Fn(&S, A) -> S + 'static,
	{
		let cell = self.state_cell(|| Rc::new(init()));
		let value = read::<S>(&cell);
		let reduce = move |state: &Rc<dyn Any>, action: A| -> Rc<dyn Any> {
			let state = match state.clone().downcast::<S>() {
				Ok(state) => state,
				Err(_) => panic!(
					"reducer state is not a {}",
					core::any::type_name::<S>()
				),
			};
			Rc::new(reducer(&state, action))
		};
		let dispatch = Dispatch {
			dispatcher: self.dispatcher(cell),
			reduce: Rc::new(reduce),
		};
		(value, dispatch)
	}
}
