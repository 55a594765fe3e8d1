//! Context values and the provider cursor stack
//!
//! A context object carries its current value. Providers overwrite it when the
//! work loop enters them and restore the saved value when they complete, so a
//! consumer always reads the value of its nearest enclosing provider, or the
//! default when there is none.

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};
use std::cell::RefCell;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::element::{Children, Element, ElementType, PropValue};

/// Property under which a provider element carries its value.
pub(crate) const VALUE_PROP: &str = "value";

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a context object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

struct ContextInner {
	id: ContextId,
	default: Rc<dyn Any>,
	current: RefCell<Rc<dyn Any>>,
}

/// Type-erased handle to a context object.
#[derive(Clone)]
pub struct ContextHandle {
	inner: Rc<ContextInner>,
}

impl ContextHandle {
	pub fn id(&self) -> ContextId {
		self.inner.id
	}

	/// Value of the nearest provider being rendered, or the default.
	pub fn current(&self) -> Rc<dyn Any> {
		self.inner.current.borrow().clone()
	}

	pub(crate) fn default_value(&self) -> Rc<dyn Any> {
		self.inner.default.clone()
	}

	fn replace(&self, value: Rc<dyn Any>) -> Rc<dyn Any> {
		self.inner.current.replace(value)
	}
}

impl fmt::Debug for ContextHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContextHandle")
			.field("id", &self.inner.id)
			.finish_non_exhaustive()
	}
}

/// A typed context object.
///
/// # Example
///
/// ```rust
/// use sylva_reconciler::{Element, create_context};
///
/// let theme = create_context(String::from("light"));
/// assert_eq!(*theme.read(), "light");
///
/// let tree = theme.provider(String::from("dark"), Element::host("main"));
/// assert!(tree.get_key().is_none());
/// ```
pub struct Context<T> {
	handle: ContextHandle,
	default: Rc<T>,
	_marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Context<T> {
	fn clone(&self) -> Self {
		Self {
			handle: self.handle.clone(),
			default: self.default.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> fmt::Debug for Context<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Context").field(&self.handle.id()).finish()
	}
}

/// Creates a context whose consumers see `default_value` outside any provider.
pub fn create_context<T: 'static>(default_value: T) -> Context<T> {
	let default = Rc::new(default_value);
	let erased: Rc<dyn Any> = default.clone();
	let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
	Context {
		handle: ContextHandle {
			inner: Rc::new(ContextInner {
				id,
				default: erased.clone(),
				current: RefCell::new(erased),
			}),
		},
		default,
		_marker: PhantomData,
	}
}

impl<T: 'static> Context<T> {
	pub fn id(&self) -> ContextId {
		self.handle.id()
	}

	pub fn handle(&self) -> ContextHandle {
		self.handle.clone()
	}

	/// Current value, falling back to the default.
	pub fn read(&self) -> Rc<T> {
		self.resolve(Some(self.handle.current()))
	}

	/// Downcasts an erased value read from this context.
	pub fn resolve(&self, value: Option<Rc<dyn Any>>) -> Rc<T> {
		value
			.and_then(|value| value.downcast::<T>().ok())
			.unwrap_or_else(|| self.default.clone())
	}

	/// A provider element making `value` visible to `children`.
	pub fn provider(&self, value: T, children: impl Into<Children>) -> Element {
		let value: Rc<dyn Any> = Rc::new(value);
		Element::new(ElementType::Provider(self.handle.clone()))
			.prop(VALUE_PROP, PropValue::Opaque(value))
			.children(children)
	}

	/// A consumer element rendering `render` with the current value.
	pub fn consumer<F>(&self, render: F) -> Element
	where
		F: Fn(&T) -> Children + 'static,
	{
		let context = self.clone();
		Element::new(ElementType::Consumer(self.handle.clone())).children(Children::Render(
			Rc::new(move |value: &Rc<dyn Any>| {
				let value = context.resolve(Some(value.clone()));
				render(&value)
			}),
		))
	}
}

struct ProviderEntry {
	handle: ContextHandle,
	previous: Rc<dyn Any>,
	value: Rc<dyn Any>,
}

/// Saved values of the providers currently entered by the work loop.
#[derive(Default)]
pub(crate) struct ContextStack {
	entries: Vec<ProviderEntry>,
	suspended: bool,
}

impl ContextStack {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	pub(crate) fn push_provider(&mut self, handle: &ContextHandle, value: Rc<dyn Any>) {
		let previous = handle.replace(value.clone());
		trace!(context = ?handle.id(), depth = self.entries.len(), "push provider");
		self.entries.push(ProviderEntry {
			handle: handle.clone(),
			previous,
			value,
		});
	}

	pub(crate) fn pop_provider(&mut self, handle: &ContextHandle) {
		let Some(entry) = self.entries.pop() else {
			warn!(context = ?handle.id(), "provider stack underflow");
			return;
		};
		debug_assert_eq!(
			entry.handle.id(),
			handle.id(),
			"providers must be popped in reverse push order"
		);
		entry.handle.replace(entry.previous);
	}

	/// Restores every saved value, emptying the stack.
	pub(crate) fn reset(&mut self) {
		self.resume();
		while let Some(entry) = self.entries.pop() {
			entry.handle.replace(entry.previous);
		}
	}

	/// Temporarily restores the saved values while the render is paused
	/// between time slices, so other work never observes them.
	pub(crate) fn suspend(&mut self) {
		if self.suspended {
			return;
		}
		for entry in self.entries.iter().rev() {
			entry.handle.replace(entry.previous.clone());
		}
		self.suspended = true;
	}

	/// Re-applies the provider values after [`ContextStack::suspend`].
	pub(crate) fn resume(&mut self) {
		if !self.suspended {
			return;
		}
		for entry in self.entries.iter_mut() {
			entry.previous = entry.handle.replace(entry.value.clone());
		}
		self.suspended = false;
	}
}

/// Value a provider element carries, or the context default when absent.
pub(crate) fn provider_value(handle: &ContextHandle, value: Option<&PropValue>) -> Rc<dyn Any> {
	match value {
		Some(PropValue::Opaque(value)) => value.clone(),
		_ => handle.default_value(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_nested_providers_restore_in_order() {
		// Arrange
		let context = create_context(0_i32);
		let handle = context.handle();
		let mut stack = ContextStack::new();

		// Act
		stack.push_provider(&handle, Rc::new(1_i32));
		stack.push_provider(&handle, Rc::new(2_i32));

		// Assert
		assert_eq!(*context.read(), 2);
		stack.pop_provider(&handle);
		assert_eq!(*context.read(), 1);
		stack.pop_provider(&handle);
		assert_eq!(*context.read(), 0);
		assert_eq!(stack.len(), 0);
	}

	#[rstest]
	fn test_suspend_hides_values_until_resumed() {
		let context = create_context("default");
		let mut stack = ContextStack::new();
		stack.push_provider(&context.handle(), Rc::new("provided"));

		stack.suspend();
		assert_eq!(*context.read(), "default");

		stack.resume();
		assert_eq!(*context.read(), "provided");

		stack.reset();
		assert_eq!(*context.read(), "default");
	}

	#[rstest]
	fn test_foreign_value_falls_back_to_default() {
		let context = create_context(7_u8);
		let foreign: Rc<dyn Any> = Rc::new("not a number");
		assert_eq!(*context.resolve(Some(foreign)), 7);
		assert_eq!(*context.resolve(None), 7);
	}

	#[rstest]
	fn test_contexts_have_distinct_ids() {
		let a = create_context(());
		let b = create_context(());
		assert_ne!(a.id(), b.id());
	}
}
