//! Element handles.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use mosaic_core::Result;

use crate::event::{DomEvent, ListenerId};
use crate::selector::Selector;
use crate::{Dom, NodeId};

/// A cloneable handle to one node of a [`Dom`].
///
/// Handles compare equal when they refer to the same node.
#[derive(Clone)]
pub struct Element {
	dom: Arc<dyn Dom>,
	node: NodeId,
}

impl Element {
	/// Wraps `node` of `dom`.
	pub fn new(dom: Arc<dyn Dom>, node: NodeId) -> Self {
		Self { dom, node }
	}

	/// The wrapped node.
	pub fn node(&self) -> NodeId {
		self.node
	}

	/// The document this element belongs to.
	pub fn dom(&self) -> &Arc<dyn Dom> {
		&self.dom
	}

	/// Another node of the same document.
	pub fn handle(&self, node: NodeId) -> Element {
		Element::new(Arc::clone(&self.dom), node)
	}

	pub fn tag_name(&self) -> Option<String> {
		self.dom.tag_name(self.node)
	}

	pub fn attribute(&self, name: &str) -> Option<String> {
		self.dom.attribute(self.node, name)
	}

	pub fn attributes(&self) -> Vec<(String, String)> {
		self.dom.attributes(self.node)
	}

	pub fn set_attribute(&self, name: &str, value: &str) -> &Self {
		self.dom.set_attribute(self.node, name, value);
		self
	}

	pub fn remove_attribute(&self, name: &str) -> &Self {
		self.dom.remove_attribute(self.node, name);
		self
	}

	pub fn parent(&self) -> Option<Element> {
		self.dom.parent(self.node).map(|node| self.handle(node))
	}

	/// This element followed by its ancestors, nearest first.
	pub fn self_and_ancestors(&self) -> Vec<Element> {
		let mut out = vec![self.clone()];
		let mut current = self.dom.parent(self.node);
		while let Some(node) = current {
			out.push(self.handle(node));
			current = self.dom.parent(node);
		}
		out
	}

	pub fn children(&self) -> Vec<Element> {
		self.dom
			.children(self.node)
			.into_iter()
			.map(|node| self.handle(node))
			.collect()
	}

	pub fn append(&self, child: &Element) -> &Self {
		self.dom.append_child(self.node, child.node);
		self
	}

	/// Detaches this element from its parent.
	pub fn remove(&self) {
		self.dom.detach(self.node);
	}

	pub fn is_connected(&self) -> bool {
		self.dom.is_connected(self.node)
	}

	/// Replaces the element's content with parsed markup.
	pub fn set_html(&self, markup: &str) -> &Self {
		self.dom.set_inner_html(self.node, markup);
		self
	}

	pub fn html(&self) -> String {
		self.dom.inner_html(self.node)
	}

	pub fn text(&self) -> String {
		self.dom.text_content(self.node)
	}

	/// Descendants matching `selector`, in document order.
	///
	/// # Examples
	///
	/// ```
	/// use mosaic_dom::Document;
	///
	/// let document = Document::new();
	/// document.body().set_html("<p><span>a</span></p><span>b</span>");
	/// let paragraph = &document.body().find("p").unwrap()[0];
	/// assert_eq!(paragraph.find("span").unwrap().len(), 1);
	/// ```
	pub fn find(&self, selector: &str) -> Result<Vec<Element>> {
		let selector = Selector::parse(selector)?;
		Ok(self.select(&selector))
	}

	/// Like [`find`](Self::find) with an already parsed selector.
	pub fn select(&self, selector: &Selector) -> Vec<Element> {
		self.dom
			.query_all(self.node, selector)
			.into_iter()
			.map(|node| self.handle(node))
			.collect()
	}

	pub fn is(&self, selector: &str) -> Result<bool> {
		let selector = Selector::parse(selector)?;
		Ok(self.matches(&selector))
	}

	/// Like [`is`](Self::is) with an already parsed selector.
	pub fn matches(&self, selector: &Selector) -> bool {
		self.dom.matches(self.node, selector)
	}

	/// Binds a listener, optionally delegated to descendants matching `selector`.
	pub fn on<F>(&self, kind: &str, selector: Option<&str>, listener: F) -> Result<ListenerId>
	where
		F: Fn(&DomEvent) + Send + Sync + 'static,
	{
		let filter = selector.map(Selector::parse).transpose()?;
		Ok(self.dom.listen(self.node, kind, filter, Arc::new(listener)))
	}

	/// Unbinds a listener bound with [`on`](Self::on).
	pub fn off(&self, id: ListenerId) -> bool {
		self.dom.unlisten(id)
	}

	/// Dispatches `event` with this element as the target.
	pub fn trigger(&self, event: DomEvent) -> DomEvent {
		self.dom.dispatch(self.node, event)
	}

	/// Dispatches a plain `click`.
	pub fn click(&self) -> DomEvent {
		self.trigger(DomEvent::new("click"))
	}

	/// Runs `listener` once when this element leaves its tree.
	pub fn on_detach<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(NodeId) + Send + Sync + 'static,
	{
		self.dom.on_detach(self.node, Arc::new(listener))
	}
}

impl PartialEq for Element {
	fn eq(&self, other: &Self) -> bool {
		self.node == other.node
	}
}

impl Eq for Element {}

impl Hash for Element {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.node.hash(state);
	}
}

impl fmt::Debug for Element {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tag = self.tag_name().unwrap_or_else(|| "#document".to_string());
		write!(f, "Element(<{tag}> {})", self.node.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Document;
	use rstest::rstest;

	#[rstest]
	fn test_handles_compare_by_node() {
		// Arrange
		let document = Document::new();

		// Act
		let first = document.body();
		let second = document.body();

		// Assert
		assert_eq!(first, second);
		assert_ne!(first, document.document_element());
	}

	#[rstest]
	fn test_self_and_ancestors_ends_at_document() {
		// Arrange
		let document = Document::new();
		document.body().set_html("<section><p>x</p></section>");
		let paragraph = document.body().find("p").unwrap().remove(0);

		// Act
		let chain: Vec<Option<String>> = paragraph
			.self_and_ancestors()
			.iter()
			.map(Element::tag_name)
			.collect();

		// Assert
		assert_eq!(
			chain,
			vec![Some("p".into()), Some("section".into()), Some("body".into()), None]
		);
	}

	#[rstest]
	fn test_invalid_selector_is_an_error() {
		let document = Document::new();

		assert!(document.body().find("[").is_err());
		assert!(document.body().on("click", Some(">"), |_| {}).is_err());
	}

	#[rstest]
	fn test_is_matches_element_itself() {
		let document = Document::new();
		let div = document.create("div");
		div.set_attribute("data-example", "");

		assert!(div.is("div[data-example]").unwrap());
		assert!(!div.is("span").unwrap());
	}
}
