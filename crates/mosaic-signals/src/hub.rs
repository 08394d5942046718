//! The application event hub.

use std::fmt;
use std::sync::Arc;

use mosaic_core::{Arg, Args, Publish};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::handler::Handler;

/// Events whose name starts with this prefix bypass a paused hub.
pub const DEFAULT_BYPASS_PREFIX: &str = "module:";

#[derive(Clone)]
struct Listener {
	event: String,
	namespace: Option<String>,
	handler: Handler,
}

/// Splits `name` into event and namespace at the last `.`.
///
/// `"dropdown:open.hub3"` is event `dropdown:open` in namespace `hub3`;
/// `".hub3"` is every event in namespace `hub3`.
fn split_name(name: &str) -> (&str, Option<&str>) {
	match name.rfind('.') {
		Some(index) => (&name[..index], Some(&name[index + 1..])),
		None => (name, None),
	}
}

struct HubInner {
	listeners: RwLock<Vec<Listener>>,
	deferred: Mutex<Option<Vec<(String, Args)>>>,
	bypass_prefix: String,
}

/// A pausable publish/subscribe hub.
///
/// Cloning yields another handle to the same hub. Handlers run on the
/// publishing thread, after the hub's locks are released, so a handler may
/// freely subscribe, unsubscribe or publish.
///
/// Event names may carry a namespace suffix (`"name.namespace"`):
///
/// - subscribing to `"x.ns"` listens to `x` in namespace `ns`
/// - publishing `"x"` reaches every listener of `x`; publishing `"x.ns"`
///   reaches only the `ns` ones
/// - unsubscribing `".ns"` removes the whole namespace
#[derive(Clone)]
pub struct EventHub {
	inner: Arc<HubInner>,
}

impl EventHub {
	/// Creates a hub letting `module:*` events through while paused.
	pub fn new() -> Self {
		Self::with_bypass_prefix(DEFAULT_BYPASS_PREFIX)
	}

	/// Creates a hub with a custom pause bypass prefix.
	pub fn with_bypass_prefix(prefix: impl Into<String>) -> Self {
		Self {
			inner: Arc::new(HubInner {
				listeners: RwLock::new(Vec::new()),
				deferred: Mutex::new(None),
				bypass_prefix: prefix.into(),
			}),
		}
	}

	pub fn bypass_prefix(&self) -> &str {
		&self.inner.bypass_prefix
	}

	/// Adds `handler` for `name`.
	pub fn subscribe(&self, name: &str, handler: Handler) -> &Self {
		let (event, namespace) = split_name(name);
		trace!(event = %event, namespace = ?namespace, "Subscribed");
		self.inner.listeners.write().push(Listener {
			event: event.to_string(),
			namespace: namespace.map(String::from),
			handler,
		});
		self
	}

	/// Subscribes a closure and returns its handler for later removal.
	pub fn on<F>(&self, name: &str, f: F) -> Handler
	where
		F: Fn(&[Arg]) + Send + Sync + 'static,
	{
		let handler = Handler::new(f);
		self.subscribe(name, handler.clone());
		handler
	}

	/// Removes listeners.
	///
	/// `name` narrows by event and/or namespace, `handler` by identity.
	/// With neither, every listener is removed.
	pub fn unsubscribe(&self, name: Option<&str>, handler: Option<&Handler>) -> &Self {
		let (event, namespace) = match name {
			Some(name) => split_name(name),
			None => ("", None),
		};
		let mut listeners = self.inner.listeners.write();
		let before = listeners.len();
		listeners.retain(|listener| {
			let event_matches = event.is_empty() || listener.event == event;
			let namespace_matches = namespace.is_none_or(|ns| listener.namespace.as_deref() == Some(ns));
			let handler_matches = handler.is_none_or(|h| listener.handler.ptr_eq(h));
			!(event_matches && namespace_matches && handler_matches)
		});
		trace!(removed = before - listeners.len(), "Unsubscribed");
		self
	}

	/// Publishes `name` with `args`.
	///
	/// While paused, events not starting with the bypass prefix are queued
	/// instead and replayed by [`resume`](Self::resume).
	pub fn publish(&self, name: &str, args: Args) -> &Self {
		{
			let mut deferred = self.inner.deferred.lock();
			if let Some(queue) = deferred.as_mut() {
				if !name.starts_with(self.inner.bypass_prefix.as_str()) {
					trace!(event = %name, "Hub paused, deferring event");
					queue.push((name.to_string(), args));
					return self;
				}
			}
		}
		self.emit(name, &args);
		self
	}

	/// Delivers `name` to its listeners right away, ignoring pause.
	pub fn emit(&self, name: &str, args: &[Arg]) -> &Self {
		let (event, namespace) = split_name(name);
		let handlers: Vec<Handler> = self
			.inner
			.listeners
			.read()
			.iter()
			.filter(|listener| {
				listener.event == event
					&& namespace.is_none_or(|ns| listener.namespace.as_deref() == Some(ns))
			})
			.map(|listener| listener.handler.clone())
			.collect();
		trace!(event = %name, handlers = handlers.len(), "Publishing event");
		for handler in handlers {
			handler.call(args);
		}
		self
	}

	/// Starts queueing published events. Idempotent.
	pub fn pause(&self) {
		let mut deferred = self.inner.deferred.lock();
		if deferred.is_none() {
			debug!("Event hub paused");
			*deferred = Some(Vec::new());
		}
	}

	/// Stops queueing and republishes the queue in original order.
	pub fn resume(&self) {
		let queued = self.inner.deferred.lock().take().unwrap_or_default();
		debug!(queued = queued.len(), "Event hub resumed");
		for (name, args) in queued {
			self.publish(&name, args);
		}
	}

	pub fn is_paused(&self) -> bool {
		self.inner.deferred.lock().is_some()
	}

	/// Number of listeners `name` would currently reach, or of all
	/// listeners when `name` is `None`.
	pub fn listener_count(&self, name: Option<&str>) -> usize {
		let listeners = self.inner.listeners.read();
		match name.map(split_name) {
			None => listeners.len(),
			Some((event, namespace)) => listeners
				.iter()
				.filter(|listener| {
					(event.is_empty() || listener.event == event)
						&& namespace.is_none_or(|ns| listener.namespace.as_deref() == Some(ns))
				})
				.count(),
		}
	}
}

impl Default for EventHub {
	fn default() -> Self {
		Self::new()
	}
}

impl Publish for EventHub {
	fn publish(&self, name: &str, args: Args) {
		EventHub::publish(self, name, args);
	}
}

impl fmt::Debug for EventHub {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventHub")
			.field("listeners", &self.listener_count(None))
			.field("paused", &self.is_paused())
			.field("bypass_prefix", &self.inner.bypass_prefix)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	type Log = Arc<Mutex<Vec<(String, Args)>>>;

	struct Context {
		hub: EventHub,
		log: Log,
	}

	impl Context {
		fn record(&self, name: &str) -> Handler {
			let log = Arc::clone(&self.log);
			let label = name.to_string();
			self.hub.on(name, move |args| log.lock().push((label.clone(), args.to_vec())))
		}

		fn calls(&self) -> Vec<String> {
			self.log.lock().iter().map(|(name, _)| name.clone()).collect()
		}
	}

	#[fixture]
	fn context() -> Context {
		let context = Context {
			hub: EventHub::new(),
			log: Arc::new(Mutex::new(Vec::new())),
		};
		context.record("dropdown:open");
		context.record("dropdown:close");
		context.record("search:submit");
		context
	}

	#[rstest]
	fn test_publish_passes_arguments(context: Context) {
		// Act
		context
			.hub
			.publish("dropdown:open", vec![Arg::from(true), Arg::value(json!({"a": 1})), Arg::from(10_i64)]);

		// Assert
		let log = context.log.lock();
		assert_eq!(log.len(), 1);
		assert_eq!(log[0].1, vec![Arg::from(true), Arg::value(json!({"a": 1})), Arg::from(10_i64)]);
	}

	#[rstest]
	fn test_pause_prevents_events_being_published(context: Context) {
		// Act
		context.hub.pause();
		context.hub.publish("dropdown:open", vec![]);
		context.hub.publish("dropdown:close", vec![]);
		context.hub.publish("search:submit", vec![]);

		// Assert
		assert!(context.calls().is_empty());
	}

	#[rstest]
	fn test_pause_allows_module_events_through(context: Context) {
		// Arrange
		context.record("module:create");

		// Act
		context.hub.pause();
		context.hub.publish("module:create", vec![]);

		// Assert
		assert_eq!(context.calls(), vec!["module:create"]);
	}

	#[rstest]
	#[case("module:create", true)]
	#[case("module:", true)]
	#[case("modules:create", false)]
	#[case("my-module:create", false)]
	#[case("Module:create", false)]
	fn test_bypass_is_a_literal_prefix(#[case] name: &str, #[case] bypasses: bool) {
		// Arrange
		let hub = EventHub::new();
		let hits = Arc::new(Mutex::new(0));
		let counter = Arc::clone(&hits);
		hub.on(name, move |_| *counter.lock() += 1);

		// Act
		hub.pause();
		hub.publish(name, vec![]);

		// Assert
		assert_eq!(*hits.lock() == 1, bypasses);
	}

	#[rstest]
	fn test_resume_republishes_in_order(context: Context) {
		// Arrange
		context.hub.pause();
		context.hub.publish("search:submit", vec![Arg::from("q")]);
		context.hub.publish("dropdown:open", vec![]);
		context.hub.publish("dropdown:close", vec![]);

		// Act
		context.hub.resume();

		// Assert
		assert_eq!(context.calls(), vec!["search:submit", "dropdown:open", "dropdown:close"]);
		assert_eq!(context.log.lock()[0].1, vec![Arg::from("q")]);
		assert!(!context.hub.is_paused());
	}

	#[rstest]
	fn test_pause_is_idempotent(context: Context) {
		// Arrange
		context.hub.pause();
		context.hub.publish("dropdown:open", vec![]);

		// Act
		context.hub.pause();
		context.hub.resume();

		// Assert
		assert_eq!(context.calls(), vec!["dropdown:open"]);
	}

	#[rstest]
	fn test_resume_without_pause_is_noop(context: Context) {
		context.hub.resume();

		assert!(context.calls().is_empty());
	}

	#[rstest]
	fn test_handler_may_pause_during_replay(context: Context) {
		// Arrange
		let hub = context.hub.clone();
		context.hub.on("dropdown:open", move |_| hub.pause());
		context.hub.pause();
		context.hub.publish("dropdown:open", vec![]);
		context.hub.publish("dropdown:close", vec![]);

		// Act
		context.hub.resume();

		// Assert
		assert_eq!(context.calls(), vec!["dropdown:open"]);
		assert!(context.hub.is_paused());
		context.hub.resume();
		assert_eq!(context.calls(), vec!["dropdown:open", "dropdown:close"]);
	}

	#[rstest]
	fn test_unsubscribe_specific_handler(context: Context) {
		// Arrange
		let extra = context.record("dropdown:open");

		// Act
		context.hub.unsubscribe(Some("dropdown:open"), Some(&extra));
		context.hub.publish("dropdown:open", vec![]);

		// Assert
		assert_eq!(context.calls(), vec!["dropdown:open"]);
	}

	#[rstest]
	fn test_unsubscribe_everything(context: Context) {
		context.hub.unsubscribe(None, None);

		assert_eq!(context.hub.listener_count(None), 0);
	}

	#[rstest]
	fn test_namespaces(context: Context) {
		// Arrange
		context.record("dropdown:open.hub1");
		context.record("dropdown:close.hub1");
		context.record("dropdown:open.hub2");

		// Act
		context.hub.unsubscribe(Some(".hub1"), None);

		// Assert
		assert_eq!(context.hub.listener_count(Some("dropdown:open")), 2);
		assert_eq!(context.hub.listener_count(Some(".hub1")), 0);
		assert_eq!(context.hub.listener_count(Some(".hub2")), 1);
	}

	#[rstest]
	fn test_publish_with_namespace_targets_it(context: Context) {
		// Arrange
		context.record("dropdown:open.hub1");

		// Act
		context.hub.publish("dropdown:open.hub1", vec![]);

		// Assert
		assert_eq!(context.calls(), vec!["dropdown:open.hub1"]);
	}

	#[rstest]
	fn test_custom_bypass_prefix() {
		// Arrange
		let hub = EventHub::with_bypass_prefix("lifecycle:");
		let hits = Arc::new(Mutex::new(Vec::new()));
		for name in ["lifecycle:start", "module:create"] {
			let sink = Arc::clone(&hits);
			let label = name.to_string();
			hub.on(name, move |_| sink.lock().push(label.clone()));
		}

		// Act
		hub.pause();
		hub.publish("lifecycle:start", vec![]);
		hub.publish("module:create", vec![]);

		// Assert
		assert_eq!(*hits.lock(), vec!["lifecycle:start"]);
	}

	proptest::proptest! {
		#[test]
		fn test_resume_preserves_publish_order(names in proptest::collection::vec("[a-z]{1,3}(:[a-z]{1,3})?", 0..24)) {
			let hub = EventHub::new();
			let seen = Arc::new(Mutex::new(Vec::new()));
			let mut subscribed: Vec<&String> = Vec::new();
			for name in &names {
				if subscribed.contains(&name) {
					continue;
				}
				subscribed.push(name);
				let sink = Arc::clone(&seen);
				let label = name.clone();
				hub.on(name, move |args| {
					let index = args[0].as_value().and_then(|v| v.as_u64()).unwrap_or(u64::MAX);
					sink.lock().push((label.clone(), index))
				});
			}

			hub.pause();
			for (index, name) in names.iter().enumerate() {
				hub.publish(name, vec![Arg::value(index as u64)]);
			}
			proptest::prop_assert!(seen.lock().is_empty());
			hub.resume();

			let expected: Vec<(String, u64)> = names
				.iter()
				.enumerate()
				.map(|(index, name)| (name.clone(), index as u64))
				.collect();
			proptest::prop_assert_eq!(seen.lock().clone(), expected);
		}
	}
}
