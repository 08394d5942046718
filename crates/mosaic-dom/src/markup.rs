//! Markup fragments.
//!
//! Fragments are parsed with html5ever through `scraper`, in the context of a
//! `<body>` element, so implied end tags, attribute normalisation and
//! character references follow the HTML parsing algorithm. Comments and
//! doctypes are dropped.

use scraper::{ElementRef, Html, Node};

/// Parsed markup node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
	/// An element with attributes in source order.
	Element {
		/// Lower-case tag name.
		tag: String,
		/// Attributes in source order. Bare attributes have an empty value.
		attributes: Vec<(String, String)>,
		/// Child nodes.
		children: Vec<Fragment>,
	},
	/// Decoded text.
	Text(String),
}

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// Returns `true` for elements written without a closing tag.
pub fn is_void(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag)
}

/// Parses a markup fragment into a list of top-level nodes.
///
/// # Examples
///
/// ```
/// use mosaic_dom::markup::{Fragment, parse_fragment};
///
/// let nodes = parse_fragment(r#"<p class="lead">Hi<br></p>"#);
/// assert_eq!(
///     nodes,
///     vec![Fragment::Element {
///         tag: "p".into(),
///         attributes: vec![("class".into(), "lead".into())],
///         children: vec![
///             Fragment::Text("Hi".into()),
///             Fragment::Element { tag: "br".into(), attributes: vec![], children: vec![] },
///         ],
///     }]
/// );
/// ```
pub fn parse_fragment(markup: &str) -> Vec<Fragment> {
	let html = Html::parse_fragment(markup);
	convert_children(html.root_element())
}

fn convert_children(parent: ElementRef<'_>) -> Vec<Fragment> {
	parent
		.children()
		.filter_map(|child| match child.value() {
			Node::Text(text) => Some(Fragment::Text(text.to_string())),
			Node::Element(element) => ElementRef::wrap(child).map(|inner| Fragment::Element {
				tag: element.name().to_string(),
				attributes: element
					.attrs()
					.map(|(name, value)| (name.to_string(), value.to_string()))
					.collect(),
				children: convert_children(inner),
			}),
			_ => None,
		})
		.collect()
}

/// Escapes text content for serialization.
pub fn escape_text(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			_ => out.push(c),
		}
	}
	out
}

/// Escapes a double-quoted attribute value for serialization.
pub fn escape_attribute(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	for c in value.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			_ => out.push(c),
		}
	}
	out
}
