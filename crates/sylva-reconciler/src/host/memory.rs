//! In-memory host tree
//!
//! [`MemoryHost`] implements [`HostRenderer`] over a slot map of nodes. It
//! records every primitive it receives, renders its tree as markup and as a
//! serialisable [`Snapshot`], and can deliver events to attached listeners.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use tracing::{trace, warn};

use super::{HostRenderer, PropPatch};
use crate::element::{Event, Listener};

new_key_type! {
	/// Handle of a node owned by a [`MemoryHost`].
	pub struct NodeId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
	Container,
	Element(String),
	Text,
}

struct HostNode {
	kind: NodeKind,
	/// Value of a text node, or the text content of an element.
	text: Option<String>,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	attributes: BTreeMap<String, String>,
	listeners: Vec<(String, Listener)>,
}

impl HostNode {
	fn new(kind: NodeKind, text: Option<String>) -> Self {
		Self {
			kind,
			text,
			parent: None,
			children: Vec::new(),
			attributes: BTreeMap::new(),
			listeners: Vec::new(),
		}
	}
}

/// A primitive applied to a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
	CreateElement { node: NodeId, tag: String },
	CreateText { node: NodeId, text: String },
	SetText { node: NodeId, text: String },
	Insert { parent: NodeId, child: NodeId, before: NodeId },
	Append { parent: NodeId, child: NodeId },
	Remove { parent: NodeId, child: NodeId },
	SetAttribute { node: NodeId, name: String, value: String },
	RemoveAttribute { node: NodeId, name: String },
	AddListener { node: NodeId, event: String },
	RemoveListener { node: NodeId, event: String },
}

/// Serialisable view of a subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
	/// Tag of an element, `None` for text nodes and containers.
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub tag: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub text: Option<String>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
	pub attributes: BTreeMap<String, String>,
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub children: Vec<Snapshot>,
}

/// Host tree kept in memory.
#[derive(Default)]
pub struct MemoryHost {
	nodes: SlotMap<NodeId, HostNode>,
	ops: Vec<HostOp>,
}

impl MemoryHost {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a detached container to render into.
	pub fn create_container(&mut self) -> NodeId {
		self.nodes.insert(HostNode::new(NodeKind::Container, None))
	}

	/// Number of nodes below `root`, `root` excluded.
	pub fn descendant_count(&self, root: NodeId) -> usize {
		self.nodes.get(root).map_or(0, |node| {
			node.children
				.iter()
				.map(|child| 1 + self.descendant_count(*child))
				.sum()
		})
	}

	pub fn children(&self, node: NodeId) -> &[NodeId] {
		match self.nodes.get(node) {
			Some(node) => &node.children,
			None => &[],
		}
	}

	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.nodes.get(node).and_then(|node| node.parent)
	}

	pub fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.nodes.get(node)?.kind {
			NodeKind::Element(tag) => Some(tag),
			NodeKind::Container | NodeKind::Text => None,
		}
	}

	pub fn text(&self, node: NodeId) -> Option<&str> {
		self.nodes.get(node)?.text.as_deref()
	}

	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		self.nodes.get(node)?.attributes.get(name).map(String::as_str)
	}

	/// Elements below `root` with tag `tag`, in document order.
	pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
		let mut found = Vec::new();
		for child in self.children(root) {
			if self.tag(*child) == Some(tag) {
				found.push(*child);
			}
			found.extend(self.elements_by_tag(*child, tag));
		}
		found
	}

	/// Primitives applied since the last call.
	pub fn take_ops(&mut self) -> Vec<HostOp> {
		std::mem::take(&mut self.ops)
	}

	/// Calls every listener of `node` registered for `event.name`.
	///
	/// Returns the number of listeners called.
	pub fn dispatch_event(&self, node: NodeId, event: &Event) -> usize {
		let listeners: Vec<Listener> = self.nodes.get(node).map_or_else(Vec::new, |node| {
			node.listeners
				.iter()
				.filter(|(name, _)| *name == event.name)
				.map(|(_, listener)| listener.clone())
				.collect()
		});
		for listener in &listeners {
			listener(event);
		}
		listeners.len()
	}

	/// Renders the subtree below `root` as markup.
	pub fn to_markup(&self, root: NodeId) -> String {
		let mut out = String::new();
		for child in self.children(root) {
			self.write_markup(*child, &mut out);
		}
		out
	}

	fn write_markup(&self, id: NodeId, out: &mut String) {
		let Some(node) = self.nodes.get(id) else {
			return;
		};
		match &node.kind {
			NodeKind::Text => out.push_str(node.text.as_deref().unwrap_or_default()),
			NodeKind::Container => {
				for child in &node.children {
					self.write_markup(*child, out);
				}
			}
			NodeKind::Element(tag) => {
				let _ = write!(out, "<{tag}");
				for (name, value) in &node.attributes {
					let _ = write!(out, " {name}=\"{value}\"");
				}
				out.push('>');
				if let Some(text) = &node.text {
					out.push_str(text);
				}
				for child in &node.children {
					self.write_markup(*child, out);
				}
				let _ = write!(out, "</{tag}>");
			}
		}
	}

	pub fn snapshot(&self, root: NodeId) -> Snapshot {
		let Some(node) = self.nodes.get(root) else {
			return Snapshot::default();
		};
		Snapshot {
			tag: match &node.kind {
				NodeKind::Element(tag) => Some(tag.clone()),
				NodeKind::Container | NodeKind::Text => None,
			},
			text: node.text.clone(),
			attributes: node.attributes.clone(),
			children: node
				.children
				.iter()
				.map(|child| self.snapshot(*child))
				.collect(),
		}
	}

	fn detach(&mut self, child: NodeId) {
		let Some(parent) = self.nodes.get_mut(child).and_then(|node| node.parent.take()) else {
			return;
		};
		if let Some(parent) = self.nodes.get_mut(parent) {
			parent.children.retain(|id| *id != child);
		}
	}
}

impl HostRenderer for MemoryHost {
	type Handle = NodeId;

	fn create_element(&mut self, tag: &str) -> NodeId {
		let node = self
			.nodes
			.insert(HostNode::new(NodeKind::Element(tag.to_string()), None));
		self.ops.push(HostOp::CreateElement {
			node,
			tag: tag.to_string(),
		});
		node
	}

	fn create_text(&mut self, text: &str) -> NodeId {
		let node = self
			.nodes
			.insert(HostNode::new(NodeKind::Text, Some(text.to_string())));
		self.ops.push(HostOp::CreateText {
			node,
			text: text.to_string(),
		});
		node
	}

	fn set_text(&mut self, node: &NodeId, text: &str) {
		if let Some(target) = self.nodes.get_mut(*node) {
			target.text = Some(text.to_string());
			self.ops.push(HostOp::SetText {
				node: *node,
				text: text.to_string(),
			});
		}
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, anchor: &NodeId) {
		self.detach(*child);
		let Some(target) = self.nodes.get_mut(*parent) else {
			warn!(?parent, "insert into unknown node");
			return;
		};
		match target.children.iter().position(|id| id == anchor) {
			Some(position) => target.children.insert(position, *child),
			None => {
				warn!(?parent, ?anchor, "anchor is not a child, appending");
				target.children.push(*child);
			}
		}
		if let Some(node) = self.nodes.get_mut(*child) {
			node.parent = Some(*parent);
		}
		self.ops.push(HostOp::Insert {
			parent: *parent,
			child: *child,
			before: *anchor,
		});
	}

	fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
		self.detach(*child);
		let Some(target) = self.nodes.get_mut(*parent) else {
			warn!(?parent, "append to unknown node");
			return;
		};
		target.children.push(*child);
		if let Some(node) = self.nodes.get_mut(*child) {
			node.parent = Some(*parent);
		}
		self.ops.push(HostOp::Append {
			parent: *parent,
			child: *child,
		});
	}

	fn remove_child(&mut self, parent: &NodeId, child: &NodeId) {
		if self.parent(*child) != Some(*parent) {
			trace!(?parent, ?child, "remove of a node that is not a child");
			return;
		}
		self.detach(*child);
		self.ops.push(HostOp::Remove {
			parent: *parent,
			child: *child,
		});
	}

	fn apply_patch(&mut self, node: &NodeId, patch: PropPatch) {
		let Some(target) = self.nodes.get_mut(*node) else {
			return;
		};
		let op = match patch {
			PropPatch::SetTextContent(text) => {
				target.text = Some(text.to_string());
				HostOp::SetText {
					node: *node,
					text: text.to_string(),
				}
			}
			PropPatch::ClearTextContent => {
				target.text = None;
				HostOp::SetText {
					node: *node,
					text: String::new(),
				}
			}
			PropPatch::AddListener { event, listener } => {
				target.listeners.push((event.clone(), listener));
				HostOp::AddListener { node: *node, event }
			}
			PropPatch::RemoveListener { event, listener } => {
				target
					.listeners
					.retain(|(name, current)| !(*name == event && std::rc::Rc::ptr_eq(current, &listener)));
				HostOp::RemoveListener { node: *node, event }
			}
			PropPatch::Set { name, value } => {
				let Some(value) = value.to_text() else {
					trace!(?node, %name, "property has no text form");
					return;
				};
				target.attributes.insert(name.to_string(), value.clone());
				HostOp::SetAttribute {
					node: *node,
					name: name.to_string(),
					value,
				}
			}
			PropPatch::Clear { name } => {
				target.attributes.remove(&*name);
				HostOp::RemoveAttribute {
					node: *node,
					name: name.to_string(),
				}
			}
		};
		self.ops.push(op);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::element::Element;
	use rstest::{fixture, rstest};
	use std::cell::Cell;
	use std::rc::Rc;

	struct Tree {
		host: MemoryHost,
		root: NodeId,
	}

	#[fixture]
	fn tree() -> Tree {
		let mut host = MemoryHost::new();
		let root = host.create_container();
		Tree { host, root }
	}

	#[rstest]
	fn test_insert_before_moves_existing_child(mut tree: Tree) {
		// Arrange
		let a = tree.host.create_text("a");
		let b = tree.host.create_text("b");
		let c = tree.host.create_text("c");
		for node in [a, b, c] {
			tree.host.append_child(&tree.root, &node);
		}

		// Act
		tree.host.insert_before(&tree.root, &c, &a);

		// Assert
		assert_eq!(tree.host.to_markup(tree.root), "cab");
		assert_eq!(tree.host.descendant_count(tree.root), 3);
	}

	#[rstest]
	fn test_patch_properties_follows_host_contract(mut tree: Tree) {
		// Arrange
		let div = tree.host.create_element("div");
		tree.host.append_child(&tree.root, &div);
		let first = Element::host("div").prop("id", "x").prop("title", "t").text("hi");
		let second = Element::host("div").prop("id", "y");

		// Act
		tree.host.patch_properties(&div, &Default::default(), first.props());
		let mounted = tree.host.to_markup(tree.root);
		tree.host.patch_properties(&div, first.props(), second.props());

		// Assert
		assert_eq!(mounted, "<div id=\"x\" title=\"t\">hi</div>");
		assert_eq!(tree.host.to_markup(tree.root), "<div id=\"y\"></div>");
	}

	#[rstest]
	fn test_listeners_are_swapped_on_patch(mut tree: Tree) {
		// Arrange
		let clicks = Rc::new(Cell::new(0));
		let button = tree.host.create_element("button");
		let counter = clicks.clone();
		let first = Element::host("button").on("click", move |_| counter.set(counter.get() + 1));
		let counter = clicks.clone();
		let second = Element::host("button").on("click", move |_| counter.set(counter.get() + 10));
		tree.host.patch_properties(&button, &Default::default(), first.props());

		// Act
		tree.host.patch_properties(&button, first.props(), second.props());
		let called = tree.host.dispatch_event(button, &Event::new("click"));

		// Assert
		assert_eq!(called, 1);
		assert_eq!(clicks.get(), 10);
	}

	#[rstest]
	fn test_snapshot_serializes_structure(mut tree: Tree) {
		let list = tree.host.create_element("ul");
		let item = tree.host.create_element("li");
		let label = tree.host.create_text("one");
		tree.host.append_child(&tree.root, &list);
		tree.host.append_child(&list, &item);
		tree.host.append_child(&item, &label);

		let value = serde_json::to_value(tree.host.snapshot(list)).unwrap();

		assert_eq!(
			value,
			serde_json::json!({
				"tag": "ul",
				"children": [{ "tag": "li", "children": [{ "text": "one" }] }]
			})
		);
	}

	#[rstest]
	fn test_remove_of_foreign_child_is_ignored(mut tree: Tree) {
		let other = tree.host.create_container();
		let text = tree.host.create_text("x");
		tree.host.append_child(&other, &text);
		tree.host.take_ops();

		tree.host.remove_child(&tree.root, &text);

		assert_eq!(tree.host.parent(text), Some(other));
		assert!(tree.host.take_ops().is_empty());
	}
}
