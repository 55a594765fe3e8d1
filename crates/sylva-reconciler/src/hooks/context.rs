//! Context hook: use_context

use std::rc::Rc;

use super::HookContext;
use crate::context::Context;

impl HookContext {
	/// Value of the nearest enclosing provider of `context`, or its default.
	///
	/// Reading a context does not take a cell of the hook chain, so it may be
	/// called conditionally. The read is recorded as a dependency of the unit.
	pub fn use_context<T: 'static>(&mut self, context: &Context<T>) -> Rc<T> {
		let id = context.id();
		if !self.dependencies.contains(&id) {
			self.dependencies.push(id);
		}
		context.read()
	}
}
