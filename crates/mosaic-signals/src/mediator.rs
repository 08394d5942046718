//! Per-module hub access.

use std::sync::atomic::{AtomicU64, Ordering};

use mosaic_core::{Args, Error, Publish, Result, Teardown};
use tracing::debug;

use crate::handler::Handler;
use crate::hub::EventHub;

static NEXT_NAMESPACE: AtomicU64 = AtomicU64::new(1);

/// A module's view onto the [`EventHub`].
///
/// Publishing goes straight to the hub. Subscriptions are placed in a
/// namespace unique to this mediator (`.hub1`, `.hub2`, ...), so
/// [`teardown`](Teardown::teardown) removes every handler this module added
/// and nothing else.
///
/// # Examples
///
/// ```
/// use mosaic_core::Teardown;
/// use mosaic_signals::{EventHub, Handler, ModuleMediator};
///
/// let hub = EventHub::new();
/// let mediator = ModuleMediator::new(hub.clone());
/// mediator.subscribe("dropdown:open", Handler::new(|_| {})).unwrap();
/// hub.on("dropdown:open", |_| {});
///
/// mediator.teardown();
/// assert_eq!(hub.listener_count(Some("dropdown:open")), 1);
/// ```
#[derive(Debug)]
pub struct ModuleMediator {
	hub: EventHub,
	namespace: String,
}

impl ModuleMediator {
	pub fn new(hub: EventHub) -> Self {
		let namespace = format!(".hub{}", NEXT_NAMESPACE.fetch_add(1, Ordering::Relaxed));
		Self { hub, namespace }
	}

	/// The namespace suffix, including the leading `.`.
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// The hub this mediator forwards to.
	pub fn hub(&self) -> &EventHub {
		&self.hub
	}

	/// Publishes on the hub, honouring its pause state.
	pub fn publish(&self, name: &str, args: Args) -> &Self {
		self.hub.publish(name, args);
		self
	}

	/// Subscribes to `name` within this mediator's namespace.
	///
	/// Fails with [`Error::MissingEventName`] if `name` is empty.
	pub fn subscribe(&self, name: &str, handler: Handler) -> Result<&Self> {
		if name.is_empty() {
			return Err(Error::MissingEventName);
		}
		self.hub.subscribe(&format!("{name}{}", self.namespace), handler);
		Ok(self)
	}

	/// Removes this mediator's subscriptions.
	///
	/// `name` narrows to one event and `handler` to one handler. With
	/// neither, every subscription made through this mediator is removed.
	pub fn unsubscribe(&self, name: Option<&str>, handler: Option<&Handler>) -> &Self {
		let scoped = format!("{}{}", name.unwrap_or_default(), self.namespace);
		self.hub.unsubscribe(Some(&scoped), handler);
		self
	}
}

impl Publish for ModuleMediator {
	fn publish(&self, name: &str, args: Args) {
		ModuleMediator::publish(self, name, args);
	}
}

impl Teardown for ModuleMediator {
	fn teardown(&self) {
		debug!(namespace = %self.namespace, "Tearing down module mediator");
		self.unsubscribe(None, None);
	}
}
