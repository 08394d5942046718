//! Module properties.
//!
//! A module class is a table of named [`Property`] values: methods,
//! plain values, and the declarative `events` map.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use mosaic_core::Arg;
use mosaic_dom::DomEvent;
use serde_json::Value;

use crate::module::Module;

/// Options passed to a module instance.
pub type Options = serde_json::Map<String, Value>;

/// A method callable on a module instance.
pub type MethodFn = Arc<dyn Fn(&Module, &[Arg]) + Send + Sync>;

/// A DOM event handler bound to a module instance.
pub type EventFn = Arc<dyn Fn(&Module, &DomEvent) + Send + Sync>;

/// Property key holding a class's declarative [`EventsMap`].
pub const EVENTS: &str = "events";

/// A named entry of a module class.
#[derive(Clone)]
pub enum Property {
	Method(MethodFn),
	Value(Value),
	Events(EventsMap),
}

impl Property {
	pub fn method<F>(f: F) -> Self
	where
		F: Fn(&Module, &[Arg]) + Send + Sync + 'static,
	{
		Self::Method(Arc::new(f))
	}

	pub fn value(value: impl Into<Value>) -> Self {
		Self::Value(value.into())
	}

	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Self::Value(value) => Some(value),
			_ => None,
		}
	}

	pub fn as_method(&self) -> Option<&MethodFn> {
		match self {
			Self::Method(method) => Some(method),
			_ => None,
		}
	}
}

/// Methods compare by identity, values by content.
impl PartialEq for Property {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Method(a), Self::Method(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
			(Self::Value(a), Self::Value(b)) => a == b,
			(Self::Events(a), Self::Events(b)) => a == b,
			_ => false,
		}
	}
}

impl fmt::Debug for Property {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Method(method) => write!(f, "Method({:p})", Arc::as_ptr(method)),
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Events(events) => f.debug_tuple("Events").field(events).finish(),
		}
	}
}

/// What runs when a bound DOM event fires.
#[derive(Clone)]
pub enum EventCallback {
	/// Name of a method on the module, called with the event as its only argument.
	Method(String),
	/// A handler receiving the module and the event.
	Handler(EventFn),
}

impl PartialEq for EventCallback {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Method(a), Self::Method(b)) => a == b,
			(Self::Handler(a), Self::Handler(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
			_ => false,
		}
	}
}

impl fmt::Debug for EventCallback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Method(name) => f.debug_tuple("Method").field(name).finish(),
			Self::Handler(handler) => write!(f, "Handler({:p})", Arc::as_ptr(handler)),
		}
	}
}

/// Declarative DOM bindings, keyed `"<event> [selector]"`.
///
/// A key without a selector binds on the module element itself; with one,
/// the binding is delegated to matching descendants.
///
/// # Examples
///
/// ```
/// use mosaic_modules::EventsMap;
///
/// let events = EventsMap::new()
///     .method("click", "_onClick")
///     .handler("submit form", |module, _event| {
///         module.set_option("submitted", true);
///     });
/// assert_eq!(events.len(), 2);
/// ```
#[derive(Clone, Default, PartialEq, Debug)]
pub struct EventsMap {
	bindings: IndexMap<String, EventCallback>,
}

impl EventsMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `key` to the module method `name`.
	pub fn method(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
		self.bindings.insert(key.into(), EventCallback::Method(name.into()));
		self
	}

	/// Binds `key` to a handler.
	pub fn handler<F>(mut self, key: impl Into<String>, f: F) -> Self
	where
		F: Fn(&Module, &DomEvent) + Send + Sync + 'static,
	{
		self.bindings
			.insert(key.into(), EventCallback::Handler(Arc::new(f)));
		self
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &EventCallback)> {
		self.bindings.iter().map(|(key, callback)| (key.as_str(), callback))
	}

	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}
}

/// An ordered set of properties to add to a class.
///
/// # Examples
///
/// ```
/// use mosaic_modules::Methods;
///
/// let methods = Methods::new()
///     .value("limit", 5)
///     .method("initialize", |module, _args| {
///         module.set_option("ready", true);
///     });
/// assert!(methods.contains("initialize"));
/// ```
#[derive(Clone, Default, Debug)]
pub struct Methods {
	entries: IndexMap<String, Property>,
}

impl Methods {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn method<F>(self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&Module, &[Arg]) + Send + Sync + 'static,
	{
		self.property(name, Property::method(f))
	}

	pub fn value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.property(name, Property::value(value))
	}

	/// Sets the declarative `events` map.
	pub fn events(self, events: EventsMap) -> Self {
		self.property(EVENTS, Property::Events(events))
	}

	pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
		self.entries.insert(name.into(), property);
		self
	}

	pub fn get(&self, name: &str) -> Option<&Property> {
		self.entries.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
		self.entries.iter().map(|(name, property)| (name.as_str(), property))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl IntoIterator for Methods {
	type Item = (String, Property);
	type IntoIter = indexmap::map::IntoIter<String, Property>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

impl Extend<(String, Property)> for Methods {
	fn extend<I: IntoIterator<Item = (String, Property)>>(&mut self, iter: I) {
		self.entries.extend(iter);
	}
}

impl FromIterator<(String, Property)> for Methods {
	fn from_iter<I: IntoIterator<Item = (String, Property)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}
