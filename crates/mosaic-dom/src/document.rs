//! In-memory document.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;
use scraper::selector::Simple;
use selectors::OpaqueElement;
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{ElementSelectorFlags, MatchingContext};
use selectors::parser::SelectorImpl;
use tracing::trace;

use crate::element::Element;
use crate::event::{DetachListener, DomEvent, EventListener, ListenerId};
use crate::markup::{Fragment, escape_attribute, escape_text, is_void, parse_fragment};
use crate::selector::Selector;
use crate::{Dom, NodeId};

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

static NEXT_NODE: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

fn next_node() -> NodeId {
	NodeId(NEXT_NODE.fetch_add(1, Ordering::Relaxed))
}

fn next_listener() -> ListenerId {
	ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed))
}

enum NodeData {
	Document,
	Element {
		tag: String,
		attributes: IndexMap<String, String>,
	},
	Text(String),
}

struct Node {
	data: NodeData,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

struct Listener {
	id: ListenerId,
	node: NodeId,
	kind: String,
	filter: Option<Selector>,
	callback: EventListener,
}

struct Watcher {
	id: ListenerId,
	node: NodeId,
	callback: DetachListener,
}

struct Tree {
	root: NodeId,
	body: NodeId,
	nodes: HashMap<NodeId, Node>,
	listeners: Vec<Listener>,
	watchers: Vec<Watcher>,
}

/// A thread-safe, in-memory document.
///
/// Cloning a `Document` yields another handle to the same tree. A fresh
/// document contains a single `<body>` element under the document node.
///
/// Children replaced by [`Dom::set_inner_html`] are dropped from the
/// document; handles to them behave like handles to an empty, detached node.
/// Nodes detached with [`Dom::detach`] are kept so they can be re-attached.
///
/// # Examples
///
/// ```
/// use mosaic_dom::{Document, DomEvent};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let document = Document::new();
/// document.body().set_html("<ul><li>a</li><li>b</li></ul>");
///
/// let clicks = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&clicks);
/// document
///     .body()
///     .on("click", Some("li"), move |_| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
///
/// let items = document.body().find("li").unwrap();
/// items[1].trigger(DomEvent::new("click"));
/// assert_eq!(clicks.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct Document {
	inner: Arc<RwLock<Tree>>,
}

impl Document {
	/// Creates an empty document with a `<body>`.
	pub fn new() -> Self {
		let root = next_node();
		let body = next_node();
		let mut nodes = HashMap::new();
		nodes.insert(
			root,
			Node {
				data: NodeData::Document,
				parent: None,
				children: vec![body],
			},
		);
		nodes.insert(
			body,
			Node {
				data: NodeData::Element {
					tag: "body".to_string(),
					attributes: IndexMap::new(),
				},
				parent: Some(root),
				children: Vec::new(),
			},
		);
		Self {
			inner: Arc::new(RwLock::new(Tree {
				root,
				body,
				nodes,
				listeners: Vec::new(),
				watchers: Vec::new(),
			})),
		}
	}

	/// Wraps a node of this document in an [`Element`] handle.
	pub fn handle(&self, node: NodeId) -> Element {
		Element::new(Arc::new(self.clone()), node)
	}

	/// The document node.
	pub fn document_element(&self) -> Element {
		let root = self.inner.read().root;
		self.handle(root)
	}

	/// The `<body>` element.
	pub fn body(&self) -> Element {
		let body = self.inner.read().body;
		self.handle(body)
	}

	/// Creates a detached element.
	pub fn create(&self, tag: &str) -> Element {
		let node = self.create_element(tag);
		self.handle(node)
	}

	/// Number of bound event listeners, across all nodes.
	pub fn listener_count(&self) -> usize {
		self.inner.read().listeners.len()
	}

	/// Number of pending detach watchers.
	pub fn watcher_count(&self) -> usize {
		self.inner.read().watchers.len()
	}

	/// Number of nodes the document holds, attached or not.
	pub fn node_count(&self) -> usize {
		self.inner.read().nodes.len()
	}
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tree = self.inner.read();
		f.debug_struct("Document")
			.field("nodes", &tree.nodes.len())
			.field("listeners", &tree.listeners.len())
			.field("watchers", &tree.watchers.len())
			.finish()
	}
}

/// An element of a [`Tree`] as seen by the selector engine.
#[derive(Clone, Copy)]
struct TreeElement<'a> {
	tree: &'a Tree,
	id: NodeId,
	node: &'a Node,
}

impl<'a> TreeElement<'a> {
	fn new(tree: &'a Tree, id: NodeId) -> Option<Self> {
		let node = tree.nodes.get(&id)?;
		matches!(node.data, NodeData::Element { .. }).then_some(Self { tree, id, node })
	}

	fn tag(&self) -> &'a str {
		let node: &'a Node = self.node;
		match &node.data {
			NodeData::Element { tag, .. } => tag,
			_ => "",
		}
	}

	fn attribute(&self, name: &str) -> Option<&'a str> {
		let node: &'a Node = self.node;
		match &node.data {
			NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
			_ => None,
		}
	}

	fn siblings(&self) -> &'a [NodeId] {
		let tree: &'a Tree = self.tree;
		self.node
			.parent
			.and_then(|parent| tree.nodes.get(&parent))
			.map(|parent| parent.children.as_slice())
			.unwrap_or_default()
	}

	fn element(&self, id: NodeId) -> Option<Self> {
		Self::new(self.tree, id)
	}
}

impl fmt::Debug for TreeElement<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TreeElement(<{}> {})", self.tag(), self.id.0)
	}
}

// Pseudo-classes that depend on user interaction never match.
impl selectors::Element for TreeElement<'_> {
	type Impl = Simple;

	fn opaque(&self) -> OpaqueElement {
		OpaqueElement::new(self.node)
	}

	fn parent_element(&self) -> Option<Self> {
		self.node.parent.and_then(|parent| self.element(parent))
	}

	fn parent_node_is_shadow_root(&self) -> bool {
		false
	}

	fn containing_shadow_host(&self) -> Option<Self> {
		None
	}

	fn is_pseudo_element(&self) -> bool {
		false
	}

	fn prev_sibling_element(&self) -> Option<Self> {
		let siblings = self.siblings();
		let index = siblings.iter().position(|id| *id == self.id)?;
		siblings[..index].iter().rev().find_map(|id| self.element(*id))
	}

	fn next_sibling_element(&self) -> Option<Self> {
		let siblings = self.siblings();
		let index = siblings.iter().position(|id| *id == self.id)?;
		siblings[index + 1..].iter().find_map(|id| self.element(*id))
	}

	fn first_element_child(&self) -> Option<Self> {
		self.node.children.iter().find_map(|id| self.element(*id))
	}

	fn is_html_element_in_html_document(&self) -> bool {
		true
	}

	fn has_local_name(&self, local_name: &<Simple as SelectorImpl>::BorrowedLocalName) -> bool {
		self.tag() == &*local_name.0
	}

	fn has_namespace(&self, ns: &<Simple as SelectorImpl>::BorrowedNamespaceUrl) -> bool {
		let url: &str = ns;
		url.is_empty() || url == XHTML_NAMESPACE
	}

	fn is_same_type(&self, other: &Self) -> bool {
		self.tag() == other.tag()
	}

	fn attr_matches(
		&self,
		ns: &NamespaceConstraint<&<Simple as SelectorImpl>::NamespaceUrl>,
		local_name: &<Simple as SelectorImpl>::LocalName,
		operation: &AttrSelectorOperation<&<Simple as SelectorImpl>::AttrValue>,
	) -> bool {
		// Attributes carry no namespace.
		if let NamespaceConstraint::Specific(url) = ns {
			if !url.is_empty() {
				return false;
			}
		}
		self.attribute(&local_name.0)
			.is_some_and(|value| operation.eval_str(value))
	}

	fn match_non_ts_pseudo_class(
		&self,
		_pc: &<Simple as SelectorImpl>::NonTSPseudoClass,
		_context: &mut MatchingContext<'_, Self::Impl>,
	) -> bool {
		false
	}

	fn match_pseudo_element(
		&self,
		_pe: &<Simple as SelectorImpl>::PseudoElement,
		_context: &mut MatchingContext<'_, Self::Impl>,
	) -> bool {
		false
	}

	fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

	fn is_link(&self) -> bool {
		matches!(self.tag(), "a" | "area" | "link") && self.attribute("href").is_some()
	}

	fn is_html_slot_element(&self) -> bool {
		self.tag() == "slot"
	}

	fn has_id(
		&self,
		id: &<Simple as SelectorImpl>::Identifier,
		case_sensitivity: CaseSensitivity,
	) -> bool {
		self.attribute("id")
			.is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
	}

	fn has_class(
		&self,
		name: &<Simple as SelectorImpl>::Identifier,
		case_sensitivity: CaseSensitivity,
	) -> bool {
		self.attribute("class").is_some_and(|classes| {
			classes
				.split_ascii_whitespace()
				.any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
		})
	}

	fn has_custom_state(&self, _name: &<Simple as SelectorImpl>::Identifier) -> bool {
		false
	}

	fn imported_part(
		&self,
		_name: &<Simple as SelectorImpl>::Identifier,
	) -> Option<<Simple as SelectorImpl>::Identifier> {
		None
	}

	fn is_part(&self, _name: &<Simple as SelectorImpl>::Identifier) -> bool {
		false
	}

	fn is_empty(&self) -> bool {
		self.node.children.iter().all(|id| {
			match self.tree.nodes.get(id).map(|child| &child.data) {
				Some(NodeData::Text(text)) => text.is_empty(),
				Some(_) => false,
				None => true,
			}
		})
	}

	fn is_root(&self) -> bool {
		self.node.parent == Some(self.tree.root)
	}

	fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
		false
	}
}

impl Tree {
	fn tag_name(&self, node: NodeId) -> Option<&str> {
		match &self.nodes.get(&node)?.data {
			NodeData::Element { tag, .. } => Some(tag),
			_ => None,
		}
	}

	fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.nodes.get(&node)?.data {
			NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
			_ => None,
		}
	}

	fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.nodes.get(&node)?.parent
	}

	fn is_connected(&self, node: NodeId) -> bool {
		let mut current = Some(node);
		while let Some(id) = current {
			if id == self.root {
				return true;
			}
			current = self.parent(id);
		}
		false
	}

	fn matches(&self, node: NodeId, selector: &Selector) -> bool {
		TreeElement::new(self, node).is_some_and(|element| selector.matches(&element))
	}

	fn insert(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
		let id = next_node();
		self.nodes.insert(
			id,
			Node {
				data,
				parent,
				children: Vec::new(),
			},
		);
		if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
			parent.children.push(id);
		}
		id
	}

	fn build(&mut self, parent: NodeId, fragments: Vec<Fragment>) {
		for fragment in fragments {
			match fragment {
				Fragment::Text(text) => {
					self.insert(NodeData::Text(text), Some(parent));
				}
				Fragment::Element {
					tag,
					attributes,
					children,
				} => {
					let id = self.insert(
						NodeData::Element {
							tag,
							attributes: attributes.into_iter().collect(),
						},
						Some(parent),
					);
					self.build(id, children);
				}
			}
		}
	}

	fn is_element(&self, node: NodeId) -> bool {
		matches!(
			self.nodes.get(&node).map(|n| &n.data),
			Some(NodeData::Element { .. })
		)
	}

	/// `node` and all its descendants, pre-order.
	fn subtree(&self, node: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut stack = vec![node];
		while let Some(id) = stack.pop() {
			out.push(id);
			if let Some(n) = self.nodes.get(&id) {
				stack.extend(n.children.iter().rev().copied());
			}
		}
		out
	}

	fn unlink(&mut self, node: NodeId) -> bool {
		let Some(parent) = self.nodes.get(&node).and_then(|n| n.parent) else {
			return false;
		};
		if let Some(p) = self.nodes.get_mut(&parent) {
			p.children.retain(|child| *child != node);
		}
		if let Some(n) = self.nodes.get_mut(&node) {
			n.parent = None;
		}
		true
	}

	/// Drops an unlinked subtree along with the listeners bound inside it.
	fn evict(&mut self, node: NodeId) {
		let evicted: HashSet<NodeId> = self.subtree(node).into_iter().collect();
		for id in &evicted {
			self.nodes.remove(id);
		}
		self.listeners.retain(|listener| !evicted.contains(&listener.node));
		self.watchers.retain(|watcher| !evicted.contains(&watcher.node));
		trace!(node = ?node, count = evicted.len(), "Evicted replaced nodes");
	}

	fn take_watchers(&mut self, node: NodeId) -> Vec<(NodeId, DetachListener)> {
		if self.watchers.is_empty() {
			return Vec::new();
		}
		let subtree = self.subtree(node);
		let (fired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.watchers)
			.into_iter()
			.partition(|watcher| subtree.contains(&watcher.node));
		self.watchers = kept;
		fired
			.into_iter()
			.map(|watcher| (watcher.node, watcher.callback))
			.collect()
	}

	fn serialize(&self, node: NodeId, out: &mut String) {
		let Some(n) = self.nodes.get(&node) else {
			return;
		};
		match &n.data {
			NodeData::Text(text) => out.push_str(&escape_text(text)),
			NodeData::Document => self.serialize_children(node, out),
			NodeData::Element { tag, attributes } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attributes {
					out.push_str(&format!(" {name}=\"{}\"", escape_attribute(value)));
				}
				out.push('>');
				if !is_void(tag) {
					self.serialize_children(node, out);
					out.push_str(&format!("</{tag}>"));
				}
			}
		}
	}

	fn serialize_children(&self, node: NodeId, out: &mut String) {
		if let Some(n) = self.nodes.get(&node) {
			for child in &n.children {
				self.serialize(*child, out);
			}
		}
	}
}

fn fire_detached(fired: Vec<(NodeId, DetachListener)>) {
	for (node, callback) in fired {
		trace!(node = ?node, "Element detached");
		callback(node);
	}
}

impl Dom for Document {
	fn root(&self) -> NodeId {
		self.inner.read().root
	}

	fn create_element(&self, tag: &str) -> NodeId {
		self.inner.write().insert(
			NodeData::Element {
				tag: tag.to_ascii_lowercase(),
				attributes: IndexMap::new(),
			},
			None,
		)
	}

	fn tag_name(&self, node: NodeId) -> Option<String> {
		self.inner.read().tag_name(node).map(String::from)
	}

	fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
		match self.inner.read().nodes.get(&node).map(|n| &n.data) {
			Some(NodeData::Element { attributes, .. }) => attributes
				.iter()
				.map(|(k, v)| (k.clone(), v.clone()))
				.collect(),
			_ => Vec::new(),
		}
	}

	fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
		self.inner.read().attribute(node, name).map(String::from)
	}

	fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
		let mut tree = self.inner.write();
		if let Some(NodeData::Element { attributes, .. }) = tree.nodes.get_mut(&node).map(|n| &mut n.data) {
			attributes.insert(name.to_ascii_lowercase(), value.to_string());
		}
	}

	fn remove_attribute(&self, node: NodeId, name: &str) {
		let mut tree = self.inner.write();
		if let Some(NodeData::Element { attributes, .. }) = tree.nodes.get_mut(&node).map(|n| &mut n.data) {
			attributes.shift_remove(&name.to_ascii_lowercase());
		}
	}

	fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.inner.read().parent(node)
	}

	fn children(&self, node: NodeId) -> Vec<NodeId> {
		let tree = self.inner.read();
		tree.nodes
			.get(&node)
			.map(|n| {
				n.children
					.iter()
					.copied()
					.filter(|child| tree.is_element(*child))
					.collect()
			})
			.unwrap_or_default()
	}

	fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
		let tree = self.inner.read();
		tree.subtree(scope)
			.into_iter()
			.skip(1)
			.filter(|node| tree.matches(*node, selector))
			.collect()
	}

	fn matches(&self, node: NodeId, selector: &Selector) -> bool {
		self.inner.read().matches(node, selector)
	}

	fn is_connected(&self, node: NodeId) -> bool {
		self.inner.read().is_connected(node)
	}

	fn append_child(&self, parent: NodeId, child: NodeId) {
		let fired = {
			let mut tree = self.inner.write();
			if !tree.nodes.contains_key(&parent) || !tree.nodes.contains_key(&child) {
				return;
			}
			// A node cannot become its own descendant.
			if tree.subtree(child).contains(&parent) {
				return;
			}
			let was_connected = tree.is_connected(child);
			tree.unlink(child);
			if let Some(n) = tree.nodes.get_mut(&child) {
				n.parent = Some(parent);
			}
			if let Some(p) = tree.nodes.get_mut(&parent) {
				p.children.push(child);
			}
			// Moving within the document is not a detachment.
			if was_connected && !tree.is_connected(child) {
				tree.take_watchers(child)
			} else {
				Vec::new()
			}
		};
		fire_detached(fired);
	}

	fn detach(&self, node: NodeId) {
		let fired = {
			let mut tree = self.inner.write();
			if !tree.unlink(node) {
				return;
			}
			tree.take_watchers(node)
		};
		fire_detached(fired);
	}

	fn set_inner_html(&self, node: NodeId, markup: &str) {
		let fragments = parse_fragment(markup);
		let fired = {
			let mut tree = self.inner.write();
			match tree.nodes.get(&node).map(|n| &n.data) {
				Some(NodeData::Element { .. } | NodeData::Document) => {}
				_ => return,
			}
			let old = tree
				.nodes
				.get(&node)
				.map(|n| n.children.clone())
				.unwrap_or_default();
			let mut fired = Vec::new();
			for child in old {
				tree.unlink(child);
				fired.extend(tree.take_watchers(child));
				tree.evict(child);
			}
			tree.build(node, fragments);
			fired
		};
		fire_detached(fired);
	}

	fn inner_html(&self, node: NodeId) -> String {
		let mut out = String::new();
		self.inner.read().serialize_children(node, &mut out);
		out
	}

	fn text_content(&self, node: NodeId) -> String {
		let tree = self.inner.read();
		tree.subtree(node)
			.into_iter()
			.filter_map(|id| match tree.nodes.get(&id).map(|n| &n.data) {
				Some(NodeData::Text(text)) => Some(text.as_str()),
				_ => None,
			})
			.collect()
	}

	fn listen(
		&self,
		node: NodeId,
		kind: &str,
		filter: Option<Selector>,
		listener: EventListener,
	) -> ListenerId {
		let id = next_listener();
		self.inner.write().listeners.push(Listener {
			id,
			node,
			kind: kind.to_string(),
			filter,
			callback: listener,
		});
		id
	}

	fn unlisten(&self, id: ListenerId) -> bool {
		let mut tree = self.inner.write();
		let before = tree.listeners.len();
		tree.listeners.retain(|listener| listener.id != id);
		tree.listeners.len() != before
	}

	fn dispatch(&self, target: NodeId, event: DomEvent) -> DomEvent {
		let path: Vec<NodeId> = {
			let tree = self.inner.read();
			let mut path = Vec::new();
			let mut current = Some(target);
			while let Some(id) = current {
				path.push(id);
				current = tree.nodes.get(&id).and_then(|n| n.parent);
			}
			path
		};

		for (depth, current) in path.iter().enumerate() {
			let calls: Vec<(EventListener, DomEvent)> = {
				let tree = self.inner.read();
				let bound: Vec<&Listener> = tree
					.listeners
					.iter()
					.filter(|listener| listener.node == *current && listener.kind == event.kind())
					.collect();
				let mut calls = Vec::new();
				// Delegated listeners first, deepest match first.
				for matched in &path[..depth] {
					for listener in &bound {
						if let Some(filter) = &listener.filter {
							if tree.matches(*matched, filter) {
								calls.push((Arc::clone(&listener.callback), event.retarget(target, *matched)));
							}
						}
					}
				}
				for listener in &bound {
					if listener.filter.is_none() {
						calls.push((Arc::clone(&listener.callback), event.retarget(target, *current)));
					}
				}
				calls
			};
			for (callback, event) in calls {
				callback(&event);
			}
			if event.propagation_stopped() {
				break;
			}
		}

		event.retarget(target, target)
	}

	fn on_detach(&self, node: NodeId, listener: DetachListener) -> ListenerId {
		let id = next_listener();
		self.inner.write().watchers.push(Watcher {
			id,
			node,
			callback: listener,
		});
		id
	}

	fn cancel_detach(&self, id: ListenerId) -> bool {
		let mut tree = self.inner.write();
		let before = tree.watchers.len();
		tree.watchers.retain(|watcher| watcher.id != id);
		tree.watchers.len() != before
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;
	use rstest::{fixture, rstest};

	#[fixture]
	fn document() -> Document {
		let document = Document::new();
		document.body().set_html(
			r#"<div id="outer" data-dropdown="" data-dropdown-size="large"><ul><li class="item"><span>one</span></li><li class="item">two</li></ul></div><p>tail</p>"#,
		);
		document
	}

	fn node(document: &Document, selector: &str) -> NodeId {
		document.body().find(selector).unwrap()[0].node()
	}

	#[rstest]
	fn test_query_all_in_document_order(document: Document) {
		// Act
		let items = document.body().find("li").unwrap();

		// Assert
		let texts: Vec<String> = items.iter().map(Element::text).collect();
		assert_eq!(texts, vec!["one", "two"]);
	}

	#[rstest]
	fn test_query_excludes_scope(document: Document) {
		let outer = document.body().find("#outer").unwrap().remove(0);

		assert!(outer.find("div").unwrap().is_empty());
		assert_eq!(outer.find("ul li").unwrap().len(), 2);
	}

	#[rstest]
	fn test_attributes_keep_source_order(document: Document) {
		let outer = document.body().find("#outer").unwrap().remove(0);

		let names: Vec<String> = outer.attributes().into_iter().map(|(k, _)| k).collect();

		assert_eq!(names, vec!["id", "data-dropdown", "data-dropdown-size"]);
	}

	#[rstest]
	fn test_inner_html_round_trips_markup() {
		// Arrange
		let document = Document::new();
		let markup = r#"<div data-superman="yes">Superman lives here<br></div>"#;

		// Act
		document.body().set_html(markup);

		// Assert
		assert_eq!(document.body().html(), markup);
	}

	#[rstest]
	fn test_delegated_listener_sets_current_target(document: Document) {
		// Arrange
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let root = document.root();
		document.listen(
			root,
			"click",
			Some(Selector::parse("li").unwrap()),
			Arc::new(move |event: &DomEvent| sink.lock().push(event.current_target())),
		);
		let span = node(&document, "span");
		let li = node(&document, "li");

		// Act
		let event = document.dispatch(span, DomEvent::new("click"));

		// Assert
		assert_eq!(*seen.lock(), vec![Some(li)]);
		assert_eq!(event.target(), Some(span));
	}

	#[rstest]
	fn test_delegated_before_direct_and_bubbling_order(document: Document) {
		// Arrange
		let order = Arc::new(Mutex::new(Vec::new()));
		let outer = document.body().find("#outer").unwrap().remove(0);
		let direct = Arc::clone(&order);
		outer
			.on("click", None, move |_| direct.lock().push("outer"))
			.unwrap();
		let delegated = Arc::clone(&order);
		outer
			.on("click", Some(".item, ul"), move |e| {
				let tag = if e.current_target() == e.target() { "self" } else { "delegated" };
				delegated.lock().push(tag)
			})
			.unwrap();
		let body = Arc::clone(&order);
		document
			.body()
			.on("click", None, move |_| body.lock().push("body"))
			.unwrap();

		// Act
		document.body().find("span").unwrap()[0].trigger(DomEvent::new("click"));

		// Assert
		assert_eq!(*order.lock(), vec!["delegated", "delegated", "outer", "body"]);
	}

	#[rstest]
	fn test_stop_propagation_halts_bubbling(document: Document) {
		// Arrange
		let reached = Arc::new(Mutex::new(false));
		let flag = Arc::clone(&reached);
		document
			.body()
			.on("click", None, move |_| *flag.lock() = true)
			.unwrap();
		let li = document.body().find("li").unwrap().remove(0);
		li.on("click", None, |e| e.stop_propagation()).unwrap();

		// Act
		li.trigger(DomEvent::new("click"));

		// Assert
		assert!(!*reached.lock());
	}

	#[rstest]
	fn test_prevent_default_is_shared(document: Document) {
		let li = document.body().find("li").unwrap().remove(0);
		li.on("click", None, |e| e.prevent_default()).unwrap();

		let event = li.trigger(DomEvent::new("click"));

		assert!(event.default_prevented());
	}

	#[rstest]
	fn test_unlisten_removes_listener(document: Document) {
		// Arrange
		let count = Arc::new(Mutex::new(0));
		let counter = Arc::clone(&count);
		let li = document.body().find("li").unwrap().remove(0);
		let id = li.on("click", None, move |_| *counter.lock() += 1).unwrap();

		// Act
		assert!(li.off(id));
		li.trigger(DomEvent::new("click"));

		// Assert
		assert_eq!(*count.lock(), 0);
		assert!(!li.off(id));
	}

	#[rstest]
	fn test_detach_fires_for_descendants_once(document: Document) {
		// Arrange
		let fired = Arc::new(Mutex::new(Vec::new()));
		let span = document.body().find("span").unwrap().remove(0);
		let outer = document.body().find("#outer").unwrap().remove(0);
		for element in [&span, &outer] {
			let sink = Arc::clone(&fired);
			element.on_detach(move |node| sink.lock().push(node));
		}

		// Act
		outer.remove();
		outer.remove();

		// Assert
		assert_eq!(*fired.lock(), vec![span.node(), outer.node()]);
		assert!(!outer.is_connected());
		assert_eq!(document.watcher_count(), 0);
	}

	#[rstest]
	fn test_set_html_detaches_previous_children(document: Document) {
		// Arrange
		let fired = Arc::new(Mutex::new(0));
		let sink = Arc::clone(&fired);
		let li = document.body().find("li").unwrap().remove(0);
		li.on_detach(move |_| *sink.lock() += 1);

		// Act
		document.body().set_html("<p>fresh</p>");

		// Assert
		assert_eq!(*fired.lock(), 1);
		assert_eq!(document.body().html(), "<p>fresh</p>");
	}

	#[rstest]
	fn test_cancel_detach(document: Document) {
		let fired = Arc::new(Mutex::new(false));
		let sink = Arc::clone(&fired);
		let li = document.body().find("li").unwrap().remove(0);
		let id = li.on_detach(move |_| *sink.lock() = true);

		assert!(li.dom().cancel_detach(id));
		li.remove();

		assert!(!*fired.lock());
	}

	#[rstest]
	fn test_moving_within_document_keeps_watchers(document: Document) {
		// Arrange
		let fired = Arc::new(Mutex::new(0));
		let sink = Arc::clone(&fired);
		let li = document.body().find("li").unwrap().remove(0);
		li.on_detach(move |_| *sink.lock() += 1);
		let tail = document.body().find("p").unwrap().remove(0);

		// Act
		tail.append(&li);

		// Assert
		assert_eq!(*fired.lock(), 0);
		assert_eq!(li.parent(), Some(tail));
		assert!(li.is_connected());
		assert_eq!(document.watcher_count(), 1);
	}

	#[rstest]
	fn test_moving_out_of_document_fires_watchers(document: Document) {
		// Arrange
		let fired = Arc::new(Mutex::new(0));
		let sink = Arc::clone(&fired);
		let span = document.body().find("span").unwrap().remove(0);
		span.on_detach(move |_| *sink.lock() += 1);
		let detached = document.create("section");

		// Act
		detached.append(&span);

		// Assert
		assert_eq!(*fired.lock(), 1);
		assert!(!span.is_connected());
		assert_eq!(document.watcher_count(), 0);
	}

	#[rstest]
	fn test_repeated_set_html_does_not_grow_document() {
		// Arrange
		let document = Document::new();
		let markup = r#"<ul><li class="item">a</li><li class="item">b</li></ul>"#;
		document.body().set_html(markup);
		let baseline = document.node_count();

		// Act
		for _ in 0..3 {
			document.body().set_html(markup);
		}

		// Assert
		assert_eq!(document.node_count(), baseline);
	}

	#[rstest]
	fn test_set_html_drops_listeners_of_replaced_nodes(document: Document) {
		// Arrange
		let outer = document.body().find("#outer").unwrap().remove(0);
		outer.on("click", None, |_| {}).unwrap();
		document.body().on("click", None, |_| {}).unwrap();

		// Act
		document.body().set_html("<p>fresh</p>");

		// Assert
		assert_eq!(document.listener_count(), 1);
		assert!(!outer.is_connected());
		assert_eq!(outer.attribute("id"), None);
	}

	#[rstest]
	fn test_serialization_escapes_text_and_attributes() {
		let document = Document::new();

		document.body().set_html(r#"<p title="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#);

		assert_eq!(
			document.body().html(),
			r#"<p title="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#
		);
		assert_eq!(document.body().text(), "1 < 2 & 3");
	}

	#[rstest]
	fn test_append_moves_node_and_rejects_cycles(document: Document) {
		// Arrange
		let outer = document.body().find("#outer").unwrap().remove(0);
		let span = document.body().find("span").unwrap().remove(0);
		let fresh = document.create("section");

		// Act
		outer.append(&fresh);
		span.append(&outer);

		// Assert
		assert_eq!(fresh.parent(), Some(outer.clone()));
		assert_eq!(outer.parent(), Some(document.body()));
		assert!(fresh.is_connected());
	}
}
