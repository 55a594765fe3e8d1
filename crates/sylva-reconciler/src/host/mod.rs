//! Host renderer contract
//!
//! The reconciler never touches host nodes directly. It drives a
//! [`HostRenderer`], which owns the real tree (a DOM, a terminal buffer, or the
//! in-memory [`MemoryHost`] used by tests).

pub mod memory;

use core::fmt;
use std::rc::Rc;

use crate::element::{Listener, PropValue, Props};

pub use memory::{HostOp, MemoryHost, NodeId, Snapshot};

/// One change produced by [`diff_properties`].
#[derive(Clone)]
pub enum PropPatch {
	/// Scalar `children` became (or changed to) this text.
	SetTextContent(Rc<str>),
	/// Scalar `children` went away.
	ClearTextContent,
	AddListener { event: String, listener: Listener },
	RemoveListener { event: String, listener: Listener },
	Set { name: Rc<str>, value: PropValue },
	/// The property disappeared from the next bag.
	Clear { name: Rc<str> },
}

impl fmt::Debug for PropPatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PropPatch::SetTextContent(text) => f.debug_tuple("SetTextContent").field(text).finish(),
			PropPatch::ClearTextContent => f.write_str("ClearTextContent"),
			PropPatch::AddListener { event, .. } => f
				.debug_struct("AddListener")
				.field("event", event)
				.finish_non_exhaustive(),
			PropPatch::RemoveListener { event, .. } => f
				.debug_struct("RemoveListener")
				.field("event", event)
				.finish_non_exhaustive(),
			PropPatch::Set { name, value } => f
				.debug_struct("Set")
				.field("name", name)
				.field("value", value)
				.finish(),
			PropPatch::Clear { name } => f.debug_struct("Clear").field("name", name).finish(),
		}
	}
}

/// Event name carried by a listener property: `onClick` is `click`.
///
/// Only keys of the form `on` followed by an upper-case letter qualify, so
/// `one` or `onion` stay ordinary properties.
pub fn event_name(key: &str) -> Option<String> {
	let rest = key.strip_prefix("on")?;
	let first = rest.chars().next()?;
	first.is_ascii_uppercase().then(|| rest.to_ascii_lowercase())
}

/// Computes the patches that turn `previous` into `next`.
///
/// - scalar `children` set the text content, which is cleared when the next
///   bag has none
/// - listener properties remove the previous listener and add the next one
/// - every other property is assigned, or cleared when it disappears
///
/// Unchanged values produce no patch.
pub fn diff_properties(previous: &Props, next: &Props) -> Vec<PropPatch> {
	let mut patches = Vec::new();

	match (previous.text_content(), next.text_content()) {
		(Some(_), None) => patches.push(PropPatch::ClearTextContent),
		(Some(old), Some(new)) if old == new => {}
		(_, Some(new)) => patches.push(PropPatch::SetTextContent(Rc::from(new))),
		(None, None) => {}
	}

	for (name, value) in previous.iter() {
		let next_value = next.get(name);
		if next_value == Some(value) {
			continue;
		}
		match (event_name(name), value) {
			(Some(event), PropValue::Listener(listener)) => patches.push(PropPatch::RemoveListener {
				event,
				listener: listener.clone(),
			}),
			_ if next_value.is_none() => patches.push(PropPatch::Clear { name: Rc::from(name) }),
			_ => {}
		}
	}

	for (name, value) in next.iter() {
		if previous.get(name) == Some(value) {
			continue;
		}
		match (event_name(name), value) {
			(Some(event), PropValue::Listener(listener)) => patches.push(PropPatch::AddListener {
				event,
				listener: listener.clone(),
			}),
			_ => patches.push(PropPatch::Set {
				name: Rc::from(name),
				value: value.clone(),
			}),
		}
	}

	patches
}

/// Primitives the reconciler needs from a host tree.
pub trait HostRenderer: 'static {
	/// Handle of a host node. Handles are compared to detect identity.
	type Handle: Clone + fmt::Debug + PartialEq + 'static;

	fn create_element(&mut self, tag: &str) -> Self::Handle;

	fn create_text(&mut self, text: &str) -> Self::Handle;

	/// Replaces the value of a text node.
	fn set_text(&mut self, node: &Self::Handle, text: &str);

	/// Inserts `child` before `anchor`, detaching it from its current
	/// position first.
	fn insert_before(&mut self, parent: &Self::Handle, child: &Self::Handle, anchor: &Self::Handle);

	/// Appends `child`, detaching it from its current position first.
	fn append_child(&mut self, parent: &Self::Handle, child: &Self::Handle);

	fn remove_child(&mut self, parent: &Self::Handle, child: &Self::Handle);

	fn apply_patch(&mut self, node: &Self::Handle, patch: PropPatch);

	fn patch_properties(&mut self, node: &Self::Handle, previous: &Props, next: &Props) {
		for patch in diff_properties(previous, next) {
			self.apply_patch(node, patch);
		}
	}
}
