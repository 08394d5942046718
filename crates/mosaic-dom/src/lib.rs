//! # Mosaic DOM
//!
//! The document seam of the runtime. Modules never talk to a concrete page;
//! they go through the [`Dom`] trait, which provides:
//!
//! - element selection by CSS selector ([`Selector`])
//! - attribute read/write
//! - delegated event binding and dispatch
//! - a single detach notification when a node (or an ancestor) leaves its tree
//!
//! [`Document`] is the in-memory implementation used on the server side and in
//! tests, and [`Element`] is the cloneable handle most code works with.
//!
//! ## Example
//!
//! ```
//! use mosaic_dom::Document;
//!
//! let document = Document::new();
//! let body = document.body();
//! body.set_html(r#"<div data-dropdown><button>Open</button></div>"#);
//!
//! let modules = body.find("[data-dropdown]").unwrap();
//! assert_eq!(modules.len(), 1);
//! assert_eq!(modules[0].find("button").unwrap()[0].text(), "Open");
//! ```

pub mod document;
pub mod element;
pub mod event;
pub mod markup;
pub mod selector;

pub use document::Document;
pub use element::Element;
pub use event::{DetachListener, DomEvent, EventListener, ListenerId};
pub use selector::Selector;

/// Identifier of a node. Unique across all documents in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

/// Operations the runtime needs from a document.
///
/// Implementations must be usable from any thread and must not hold internal
/// locks while invoking listeners, since listeners routinely call back into
/// the document.
pub trait Dom: Send + Sync {
	/// The document node.
	fn root(&self) -> NodeId;

	/// Creates a detached element.
	fn create_element(&self, tag: &str) -> NodeId;

	/// Lower-case tag name, `None` for non-element nodes.
	fn tag_name(&self, node: NodeId) -> Option<String>;

	/// Attributes in document order.
	fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

	/// Single attribute value.
	fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

	/// Sets or replaces an attribute.
	fn set_attribute(&self, node: NodeId, name: &str, value: &str);

	/// Removes an attribute.
	fn remove_attribute(&self, node: NodeId, name: &str);

	/// Parent node, if attached.
	fn parent(&self, node: NodeId) -> Option<NodeId>;

	/// Element children in document order.
	fn children(&self, node: NodeId) -> Vec<NodeId>;

	/// Whether the node is reachable from [`root`](Self::root).
	fn is_connected(&self, node: NodeId) -> bool {
		let root = self.root();
		let mut current = Some(node);
		while let Some(id) = current {
			if id == root {
				return true;
			}
			current = self.parent(id);
		}
		false
	}

	/// Descendants of `scope` matching `selector`, in document order.
	fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>;

	/// Whether `node` matches `selector`.
	fn matches(&self, node: NodeId, selector: &Selector) -> bool;

	/// Moves `child` under `parent` as its last child.
	///
	/// Detach watchers in the subtree fire only if the move takes it out of
	/// the document.
	fn append_child(&self, parent: NodeId, child: NodeId);

	/// Removes `node` from its parent, firing detach watchers for the subtree.
	fn detach(&self, node: NodeId);

	/// Replaces the children of `node` with parsed markup.
	///
	/// Replaced children are detached and their watchers fire. The document
	/// may drop them afterwards.
	fn set_inner_html(&self, node: NodeId, markup: &str);

	/// Serialized children of `node`.
	fn inner_html(&self, node: NodeId) -> String;

	/// Concatenated text of the subtree.
	fn text_content(&self, node: NodeId) -> String;

	/// Binds `listener` to events of type `kind` bubbling through `node`.
	///
	/// With a `filter`, the listener runs once for every node between the
	/// event target and `node` (exclusive) that matches the filter, with that
	/// node as the current target.
	fn listen(
		&self,
		node: NodeId,
		kind: &str,
		filter: Option<Selector>,
		listener: EventListener,
	) -> ListenerId;

	/// Unbinds a listener. Returns `false` if it was not bound.
	fn unlisten(&self, id: ListenerId) -> bool;

	/// Dispatches `event` at `target` and bubbles it to the root.
	fn dispatch(&self, target: NodeId, event: DomEvent) -> DomEvent;

	/// Watches `node` for removal from its tree. Fires at most once.
	fn on_detach(&self, node: NodeId, listener: DetachListener) -> ListenerId;

	/// Cancels a detach watcher. Returns `false` if it already fired.
	fn cancel_detach(&self, id: ListenerId) -> bool;
}
