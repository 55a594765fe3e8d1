//! Element descriptions
//!
//! An [`Element`] describes one node of the desired tree: its type, an
//! optional key and a property bag whose `children` field holds the nested
//! descriptions. Descriptions are cheap to clone (everything shared is behind
//! an `Rc`) and are rebuilt on every render; the reconciler compares them
//! against the previous render to decide what to reuse.

use core::any::{Any, TypeId};
use core::fmt;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::context::ContextHandle;
use crate::hooks::HookContext;

/// Render function of a function component.
///
/// Components are plain functions so their identity (the function address)
/// stays stable across renders.
pub type RenderFn = fn(&mut HookContext, &Props) -> Children;

/// Event listener attached through an `on*` property.
pub type Listener = Rc<dyn Fn(&Event)>;

/// Children produced from a context value by a consumer.
pub type RenderChildren = Rc<dyn Fn(&Rc<dyn Any>) -> Children>;

/// Event delivered to a [`Listener`].
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	/// Lower-case event name, e.g. `"click"`.
	pub name: String,
	/// Optional payload, e.g. the new value of an input.
	pub value: Option<String>,
}

impl Event {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: None,
		}
	}

	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}
}

/// Identity of an element among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Rc<str>);

impl Key {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Key {
	fn from(value: &str) -> Self {
		Self(Rc::from(value))
	}
}

impl From<String> for Key {
	fn from(value: String) -> Self {
		Self(Rc::from(value))
	}
}

impl From<Rc<str>> for Key {
	fn from(value: Rc<str>) -> Self {
		Self(value)
	}
}

macro_rules! key_from_integer {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Key {
				fn from(value: $ty) -> Self {
					Self(Rc::from(value.to_string()))
				}
			}
		)*
	};
}

key_from_integer!(i32, i64, u32, u64, usize);

/// A single property value.
#[derive(Clone)]
pub enum PropValue {
	Str(Rc<str>),
	Int(i64),
	Float(f64),
	Bool(bool),
	Listener(Listener),
	/// Arbitrary shared data, compared by pointer.
	Opaque(Rc<dyn Any>),
}

impl PropValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			PropValue::Str(value) => Some(value),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			PropValue::Int(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			PropValue::Bool(value) => Some(*value),
			_ => None,
		}
	}

	/// Text form used by hosts that store properties as strings.
	///
	/// Listeners and opaque values have no text form.
	pub fn to_text(&self) -> Option<String> {
		match self {
			PropValue::Str(value) => Some(value.to_string()),
			PropValue::Int(value) => Some(value.to_string()),
			PropValue::Float(value) => Some(value.to_string()),
			PropValue::Bool(value) => Some(value.to_string()),
			PropValue::Listener(_) | PropValue::Opaque(_) => None,
		}
	}
}

impl fmt::Debug for PropValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PropValue::Str(value) => f.debug_tuple("Str").field(value).finish(),
			PropValue::Int(value) => f.debug_tuple("Int").field(value).finish(),
			PropValue::Float(value) => f.debug_tuple("Float").field(value).finish(),
			PropValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			PropValue::Listener(_) => f.write_str("Listener(..)"),
			PropValue::Opaque(_) => f.write_str("Opaque(..)"),
		}
	}
}

impl PartialEq for PropValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(PropValue::Str(a), PropValue::Str(b)) => a == b,
			(PropValue::Int(a), PropValue::Int(b)) => a == b,
			(PropValue::Float(a), PropValue::Float(b)) => a.to_bits() == b.to_bits(),
			(PropValue::Bool(a), PropValue::Bool(b)) => a == b,
			(PropValue::Listener(a), PropValue::Listener(b)) => Rc::ptr_eq(a, b),
			(PropValue::Opaque(a), PropValue::Opaque(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl From<&str> for PropValue {
	fn from(value: &str) -> Self {
		PropValue::Str(Rc::from(value))
	}
}

impl From<String> for PropValue {
	fn from(value: String) -> Self {
		PropValue::Str(Rc::from(value))
	}
}

impl From<Rc<str>> for PropValue {
	fn from(value: Rc<str>) -> Self {
		PropValue::Str(value)
	}
}

impl From<i64> for PropValue {
	fn from(value: i64) -> Self {
		PropValue::Int(value)
	}
}

impl From<i32> for PropValue {
	fn from(value: i32) -> Self {
		PropValue::Int(i64::from(value))
	}
}

impl From<f64> for PropValue {
	fn from(value: f64) -> Self {
		PropValue::Float(value)
	}
}

impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		PropValue::Bool(value)
	}
}

/// Nested descriptions carried in a property bag.
#[derive(Clone, Default)]
pub enum Children {
	#[default]
	Empty,
	/// A scalar. Host elements render it as their text content; every other
	/// parent turns it into a single text node.
	Text(Rc<str>),
	/// An ordered sequence. `None` entries are holes that keep their index.
	Nodes(Vec<Option<Node>>),
	/// Function of a context value, used by consumers.
	Render(RenderChildren),
}

impl Children {
	pub fn is_text(&self) -> bool {
		matches!(self, Children::Text(_))
	}

	/// The children as an indexable sequence for reconciliation.
	pub(crate) fn to_sequence(&self) -> Vec<Option<Node>> {
		match self {
			Children::Empty | Children::Render(_) => Vec::new(),
			Children::Text(text) => vec![Some(Node::Text(text.clone()))],
			Children::Nodes(nodes) => nodes.clone(),
		}
	}
}

impl fmt::Debug for Children {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Children::Empty => f.write_str("Empty"),
			Children::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Children::Nodes(nodes) => f.debug_tuple("Nodes").field(nodes).finish(),
			Children::Render(_) => f.write_str("Render(..)"),
		}
	}
}

impl From<Node> for Children {
	fn from(node: Node) -> Self {
		Children::Nodes(vec![Some(node)])
	}
}

impl From<Element> for Children {
	fn from(element: Element) -> Self {
		Children::Nodes(vec![Some(Node::Element(element))])
	}
}

impl From<Option<Node>> for Children {
	fn from(node: Option<Node>) -> Self {
		Children::Nodes(vec![node])
	}
}

impl From<Vec<Node>> for Children {
	fn from(nodes: Vec<Node>) -> Self {
		Children::Nodes(nodes.into_iter().map(Some).collect())
	}
}

impl From<Vec<Element>> for Children {
	fn from(elements: Vec<Element>) -> Self {
		Children::Nodes(
			elements
				.into_iter()
				.map(|element| Some(Node::Element(element)))
				.collect(),
		)
	}
}

impl From<Vec<Option<Node>>> for Children {
	fn from(nodes: Vec<Option<Node>>) -> Self {
		Children::Nodes(nodes)
	}
}

impl From<&str> for Children {
	fn from(text: &str) -> Self {
		Children::Text(Rc::from(text))
	}
}

impl From<String> for Children {
	fn from(text: String) -> Self {
		Children::Text(Rc::from(text))
	}
}

impl From<i64> for Children {
	fn from(value: i64) -> Self {
		Children::Text(Rc::from(value.to_string()))
	}
}

impl From<()> for Children {
	fn from(_: ()) -> Self {
		Children::Empty
	}
}

/// Property bag of an element.
#[derive(Clone, Default)]
pub struct Props {
	entries: BTreeMap<Rc<str>, PropValue>,
	children: Children,
}

impl Props {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_children(children: impl Into<Children>) -> Self {
		Self {
			entries: BTreeMap::new(),
			children: children.into(),
		}
	}

	pub(crate) fn text(text: Rc<str>) -> Self {
		Self::with_children(Children::Text(text))
	}

	pub fn get(&self, key: &str) -> Option<&PropValue> {
		self.entries.get(key)
	}

	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(PropValue::as_str)
	}

	pub fn get_int(&self, key: &str) -> Option<i64> {
		self.get(key).and_then(PropValue::as_int)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn insert(&mut self, key: impl Into<Rc<str>>, value: impl Into<PropValue>) {
		self.entries.insert(key.into(), value.into());
	}

	pub fn children(&self) -> &Children {
		&self.children
	}

	pub fn set_children(&mut self, children: impl Into<Children>) {
		self.children = children.into();
	}

	/// Scalar children as text, if any.
	pub fn text_content(&self) -> Option<&str> {
		match &self.children {
			Children::Text(text) => Some(text),
			_ => None,
		}
	}

	/// Iterates over properties other than `children`, in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
		self.entries.iter().map(|(key, value)| (key.as_ref(), value))
	}
}

impl fmt::Debug for Props {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Props")
			.field("entries", &self.entries)
			.field("children", &self.children)
			.finish()
	}
}

/// A class-style component.
///
/// A fresh instance is constructed on every render of the unit, receiving the
/// latest props and, when [`Component::context_type`] names a context, the
/// value of its nearest provider.
pub trait Component: 'static {
	fn construct(props: &Props, context: Option<Rc<dyn Any>>) -> Self
	where
		Self: Sized;

	fn render(&self) -> Children;

	/// Context read before construction.
	fn context_type() -> Option<ContextHandle>
	where
		Self: Sized,
	{
		None
	}
}

type ConstructFn = fn(&Props, Option<Rc<dyn Any>>) -> Rc<dyn Component>;

fn construct_erased<C: Component>(
	props: &Props,
	context: Option<Rc<dyn Any>>,
) -> Rc<dyn Component> {
	Rc::new(C::construct(props, context))
}

/// Type-erased handle to a [`Component`] implementation.
#[derive(Clone, Copy)]
pub struct ClassType {
	type_id: TypeId,
	name: &'static str,
	construct: ConstructFn,
	context_type: fn() -> Option<ContextHandle>,
}

impl ClassType {
	pub fn of<C: Component>() -> Self {
		Self {
			type_id: TypeId::of::<C>(),
			name: core::any::type_name::<C>(),
			construct: construct_erased::<C>,
			context_type: C::context_type,
		}
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub(crate) fn construct(
		&self,
		props: &Props,
		context: Option<Rc<dyn Any>>,
	) -> Rc<dyn Component> {
		(self.construct)(props, context)
	}

	pub(crate) fn context_type(&self) -> Option<ContextHandle> {
		(self.context_type)()
	}
}

/// What an element is.
#[derive(Clone)]
pub enum ElementType {
	Root,
	Host(Rc<str>),
	Text,
	Function(RenderFn),
	Class(ClassType),
	Fragment,
	Provider(ContextHandle),
	Consumer(ContextHandle),
}

impl PartialEq for ElementType {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(ElementType::Root, ElementType::Root)
			| (ElementType::Text, ElementType::Text)
			| (ElementType::Fragment, ElementType::Fragment) => true,
			(ElementType::Host(a), ElementType::Host(b)) => a == b,
			(ElementType::Function(a), ElementType::Function(b)) => core::ptr::fn_addr_eq(*a, *b),
			(ElementType::Class(a), ElementType::Class(b)) => a.type_id == b.type_id,
			(ElementType::Provider(a), ElementType::Provider(b))
			| (ElementType::Consumer(a), ElementType::Consumer(b)) => a.id() == b.id(),
			_ => false,
		}
	}
}

impl fmt::Debug for ElementType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ElementType::Root => f.write_str("Root"),
			ElementType::Host(tag) => f.debug_tuple("Host").field(tag).finish(),
			ElementType::Text => f.write_str("Text"),
			ElementType::Function(_) => f.write_str("Function"),
			ElementType::Class(class) => f.debug_tuple("Class").field(&class.name).finish(),
			ElementType::Fragment => f.write_str("Fragment"),
			ElementType::Provider(handle) => f.debug_tuple("Provider").field(&handle.id()).finish(),
			ElementType::Consumer(handle) => f.debug_tuple("Consumer").field(&handle.id()).finish(),
		}
	}
}

/// Description of a non-text node.
///
/// # Example
///
/// ```rust
/// use sylva_reconciler::{Element, Node};
///
/// let list = Element::host("ul").children(vec![
/// 	Element::host("li").key("a").text("first"),
/// 	Element::host("li").key("b").text("second"),
/// ]);
///
/// assert_eq!(list.tag(), Some("ul"));
/// let node: Node = list.into();
/// assert!(matches!(node, Node::Element(_)));
/// ```
#[derive(Clone, Debug)]
pub struct Element {
	pub(crate) element_type: ElementType,
	pub(crate) key: Option<Key>,
	pub(crate) props: Props,
}

impl Element {
	pub fn new(element_type: ElementType) -> Self {
		Self {
			element_type,
			key: None,
			props: Props::new(),
		}
	}

	/// A host element such as `div`.
	pub fn host(tag: &str) -> Self {
		Self::new(ElementType::Host(Rc::from(tag)))
	}

	pub fn function(render: RenderFn) -> Self {
		Self::new(ElementType::Function(render))
	}

	pub fn class<C: Component>() -> Self {
		Self::new(ElementType::Class(ClassType::of::<C>()))
	}

	/// Groups children without a host node of its own.
	pub fn fragment(children: impl Into<Children>) -> Self {
		Self::new(ElementType::Fragment).children(children)
	}

	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	pub fn prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
		self.props.insert(key, value);
		self
	}

	/// Attaches `listener` under the `on<Event>` property.
	pub fn on(mut self, event: &str, listener: impl Fn(&Event) + 'static) -> Self {
		let mut name = String::with_capacity(event.len() + 2);
		name.push_str("on");
		let mut chars = event.chars();
		if let Some(first) = chars.next() {
			name.extend(first.to_uppercase());
			name.push_str(chars.as_str());
		}
		self.props
			.insert(name.as_str(), PropValue::Listener(Rc::new(listener)));
		self
	}

	pub fn children(mut self, children: impl Into<Children>) -> Self {
		self.props.set_children(children);
		self
	}

	/// Appends one child, turning scalar children into a sequence.
	pub fn child(mut self, child: impl Into<Node>) -> Self {
		let child = child.into();
		let mut nodes = match core::mem::take(&mut self.props.children) {
			Children::Nodes(nodes) => nodes,
			Children::Text(text) => vec![Some(Node::Text(text))],
			Children::Empty | Children::Render(_) => Vec::new(),
		};
		nodes.push(Some(child));
		self.props.children = Children::Nodes(nodes);
		self
	}

	/// Sets scalar text children.
	pub fn text(self, text: impl Into<Rc<str>>) -> Self {
		self.children(Children::Text(text.into()))
	}

	pub fn props(&self) -> &Props {
		&self.props
	}

	pub fn element_type(&self) -> &ElementType {
		&self.element_type
	}

	pub fn get_key(&self) -> Option<&Key> {
		self.key.as_ref()
	}

	/// Tag name of a host element.
	pub fn tag(&self) -> Option<&str> {
		match &self.element_type {
			ElementType::Host(tag) => Some(tag),
			_ => None,
		}
	}
}

/// One entry of a child sequence.
#[derive(Clone, Debug)]
pub enum Node {
	Element(Element),
	Text(Rc<str>),
}

impl Node {
	pub(crate) fn element_type(&self) -> ElementType {
		match self {
			Node::Element(element) => element.element_type.clone(),
			Node::Text(_) => ElementType::Text,
		}
	}

	pub(crate) fn key(&self) -> Option<&Key> {
		match self {
			Node::Element(element) => element.key.as_ref(),
			Node::Text(_) => None,
		}
	}

	pub(crate) fn props(&self) -> Props {
		match self {
			Node::Element(element) => element.props.clone(),
			Node::Text(text) => Props::text(text.clone()),
		}
	}
}

impl From<Element> for Node {
	fn from(element: Element) -> Self {
		Node::Element(element)
	}
}

impl From<&str> for Node {
	fn from(text: &str) -> Self {
		Node::Text(Rc::from(text))
	}
}

impl From<String> for Node {
	fn from(text: String) -> Self {
		Node::Text(Rc::from(text))
	}
}

impl From<i64> for Node {
	fn from(value: i64) -> Self {
		Node::Text(Rc::from(value.to_string()))
	}
}

/// A text node.
pub fn text(value: impl Into<Rc<str>>) -> Node {
	Node::Text(value.into())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn first(_: &mut HookContext, _: &Props) -> Children {
		Children::Empty
	}

	fn second(_: &mut HookContext, _: &Props) -> Children {
		Children::Text(Rc::from("second"))
	}

	#[rstest]
	fn test_function_identity_is_the_function_address() {
		let a = Element::function(first);
		let b = Element::function(first);
		let c = Element::function(second);

		assert_eq!(a.element_type, b.element_type);
		assert_ne!(a.element_type, c.element_type);
	}

	#[rstest]
	fn test_host_identity_is_the_tag() {
		assert_eq!(
			Element::host("div").element_type,
			Element::host("div").element_type
		);
		assert_ne!(
			Element::host("div").element_type,
			Element::host("span").element_type
		);
		assert_ne!(Element::host("div").element_type, ElementType::Text);
	}

	#[rstest]
	fn test_on_builds_event_property() {
		let element = Element::host("button").on("click", |_| {});
		assert!(matches!(
			element.props.get("onClick"),
			Some(PropValue::Listener(_))
		));
	}

	#[rstest]
	fn test_child_appends_after_scalar_text() {
		let element = Element::host("p").text("hello").child(Element::host("b"));
		let sequence = element.props.children().to_sequence();
		assert_eq!(sequence.len(), 2);
		assert!(matches!(&sequence[0], Some(Node::Text(text)) if &**text == "hello"));
	}

	#[rstest]
	fn test_scalar_children_become_one_text_node() {
		let children = Children::from("hi");
		assert!(children.is_text());
		assert_eq!(children.to_sequence().len(), 1);
		assert!(Children::Empty.to_sequence().is_empty());
	}
}
