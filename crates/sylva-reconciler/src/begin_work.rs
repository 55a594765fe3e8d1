//! Per-tag render logic
//!
//! `begin_work` renders one unit and reconciles its children. It returns the
//! first child to descend into, or `None` when the unit is a leaf.

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use crate::child_fiber::reconcile_children;
use crate::context::{VALUE_PROP, provider_value};
use crate::element::{Children, ElementType, Props};
use crate::fiber::{FiberId, Hooks, MemoizedState, StateNode, WorkTag};
use crate::hooks::HookContext;
use crate::host::HostRenderer;
use crate::work_loop::RenderState;

impl<H: HostRenderer> RenderState<H> {
	pub(crate) fn begin_work(&mut self, unit: FiberId) -> Option<FiberId> {
		let tag = self.arena[unit].tag;
		trace!(?unit, ?tag, "begin");
		let next = match tag {
			WorkTag::Root | WorkTag::Fragment => {
				let children = self.arena[unit].pending_props.children().clone();
				self.reconcile(unit, &children)
			}
			WorkTag::HostElement => self.update_host_element(unit),
			WorkTag::HostText => self.update_host_text(unit),
			WorkTag::FunctionComponent => self.update_function_component(unit),
			WorkTag::ClassComponent => self.update_class_component(unit),
			WorkTag::ContextProvider => self.update_context_provider(unit),
			WorkTag::ContextConsumer => self.update_context_consumer(unit),
		};
		let fiber = &mut self.arena[unit];
		fiber.memoized_props = Some(fiber.pending_props.clone());
		next
	}

	fn reconcile(&mut self, unit: FiberId, children: &Children) -> Option<FiberId> {
		reconcile_children(&mut self.arena, unit, &children.to_sequence())
	}

	fn update_host_element(&mut self, unit: FiberId) -> Option<FiberId> {
		let fiber = &self.arena[unit];
		if fiber.handle().is_none() {
			let ElementType::Host(tag) = &fiber.element_type else {
				unreachable!("host element units carry a host type");
			};
			let handle = self.host.create_element(tag);
			self.host
				.patch_properties(&handle, &Props::new(), &self.arena[unit].pending_props);
			self.arena[unit].state_node = StateNode::Host(handle);
		}

		let children = self.arena[unit].pending_props.children().clone();
		if children.is_text() {
			// Text content is set by the property patch; drop element children.
			reconcile_children(&mut self.arena, unit, &[]);
			return None;
		}
		self.reconcile(unit, &children)
	}

	fn update_host_text(&mut self, unit: FiberId) -> Option<FiberId> {
		let fiber = &self.arena[unit];
		if fiber.handle().is_none() {
			let text = fiber.text().unwrap_or_default().to_string();
			let handle = self.host.create_text(&text);
			self.arena[unit].state_node = StateNode::Host(handle);
		}
		None
	}

	fn update_function_component(&mut self, unit: FiberId) -> Option<FiberId> {
		let fiber = &self.arena[unit];
		let ElementType::Function(render) = fiber.element_type else {
			unreachable!("function component units carry a render function");
		};
		let previous = fiber
			.alternate
			.and_then(|current| self.arena[current].memoized_state.hooks().cloned());
		let (owner, cells) = match previous {
			Some(hooks) => (hooks.owner, Some(hooks.cells)),
			None => (Rc::new(Cell::new(unit)), None),
		};
		owner.set(unit);

		let props = fiber.pending_props.clone();
		let mut cx = HookContext::new(owner.clone(), cells, self.updater.clone());
		let children = render(&mut cx, &props);
		let rendered = cx.finish();

		let fiber = &mut self.arena[unit];
		fiber.memoized_state = MemoizedState::Hooks(Hooks {
			owner,
			cells: rendered.cells,
		});
		fiber.update_queue = rendered.effects;
		fiber.flags |= rendered.flags;
		fiber.dependencies = rendered.dependencies;
		self.reconcile(unit, &children)
	}

	fn update_class_component(&mut self, unit: FiberId) -> Option<FiberId> {
		let fiber = &self.arena[unit];
		let ElementType::Class(class) = fiber.element_type else {
			unreachable!("class component units carry a class type");
		};
		let context = class
			.context_type()
			.map(|handle| (handle.id(), handle.current()));
		let instance = class.construct(
			&fiber.pending_props,
			context.as_ref().map(|(_, value)| value.clone()),
		);
		let children = instance.render();

		let fiber = &mut self.arena[unit];
		fiber.state_node = StateNode::Instance(instance);
		fiber.dependencies = context.map(|(id, _)| vec![id]).unwrap_or_default();
		self.reconcile(unit, &children)
	}

	fn update_context_provider(&mut self, unit: FiberId) -> Option<FiberId> {
		let fiber = &self.arena[unit];
		let ElementType::Provider(handle) = &fiber.element_type else {
			unreachable!("provider units carry a context");
		};
		let handle = handle.clone();
		let value = provider_value(&handle, fiber.pending_props.get(VALUE_PROP));
		let children = fiber.pending_props.children().clone();
		self.context_stack.push_provider(&handle, value);
		self.reconcile(unit, &children)
	}

	fn update_context_consumer(&mut self, unit: FiberId) -> Option<FiberId> {
		let fiber = &self.arena[unit];
		let ElementType::Consumer(handle) = &fiber.element_type else {
			unreachable!("consumer units carry a context");
		};
		let id = handle.id();
		let value = handle.current();
		let children = match fiber.pending_props.children() {
			Children::Render(render) => render(&value),
			other => other.clone(),
		};
		self.arena[unit].dependencies = vec![id];
		self.reconcile(unit, &children)
	}
}
