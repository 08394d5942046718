//! CSS selectors.
//!
//! Selectors are parsed with the `selectors` crate using scraper's HTML
//! selector grammar, so anything a browser accepts in `querySelectorAll`
//! short of pseudo-elements and state pseudo-classes (`:hover`, `:checked`)
//! works here. Matching runs against any tree whose elements implement
//! [`selectors::Element`] with scraper's [`Simple`] implementation.

use std::fmt;

use cssparser::ParserInput;
use mosaic_core::{Error, Result};
use scraper::selector::{Parser as HtmlSelectorParser, Simple};
use selectors::matching::{
	MatchingContext, MatchingForInvalidation, MatchingMode, NeedsSelectorFlags, QuirksMode,
	SelectorCaches, matches_selector,
};
use selectors::parser::{ParseRelative, Selector as ComplexSelector, SelectorList};

/// A parsed selector list.
#[derive(Clone)]
pub struct Selector {
	source: String,
	selectors: Vec<ComplexSelector<Simple>>,
}

impl Selector {
	/// Parses a selector list.
	///
	/// # Examples
	///
	/// ```
	/// use mosaic_dom::Selector;
	///
	/// assert!(Selector::parse("[data-dropdown] > button.primary").is_ok());
	/// assert!(Selector::parse("div[").is_err());
	/// ```
	pub fn parse(source: &str) -> Result<Self> {
		let mut input = ParserInput::new(source);
		let mut parser = cssparser::Parser::new(&mut input);
		let list = SelectorList::parse(&HtmlSelectorParser, &mut parser, ParseRelative::No)
			.map_err(|err| Error::invalid_selector(source, format!("{:?}", err.kind)))?;
		Ok(Self {
			source: source.trim().to_string(),
			selectors: list.slice().to_vec(),
		})
	}

	/// The selector text this was parsed from.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Returns `true` if `element` matches any selector in the list.
	pub fn matches<E>(&self, element: &E) -> bool
	where
		E: selectors::Element<Impl = Simple>,
	{
		let mut caches = SelectorCaches::default();
		let mut context = MatchingContext::new(
			MatchingMode::Normal,
			None,
			&mut caches,
			QuirksMode::NoQuirks,
			NeedsSelectorFlags::No,
			MatchingForInvalidation::No,
		);
		self.selectors
			.iter()
			.any(|selector| matches_selector(selector, 0, None, element, &mut context))
	}
}

impl PartialEq for Selector {
	fn eq(&self, other: &Self) -> bool {
		self.source == other.source
	}
}

impl Eq for Selector {}

impl fmt::Debug for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Selector").field(&self.source).finish()
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.source)
	}
}

impl std::str::FromStr for Selector {
	type Err = Error;

	fn from_str(source: &str) -> Result<Self> {
		Self::parse(source)
	}
}
