//! # Mosaic Signals
//!
//! Application-wide publish/subscribe.
//!
//! - [`EventHub`]: the shared hub. It can be paused during start-up, in which
//!   case ordinary events are queued and replayed on resume, while lifecycle
//!   events (`module:*`) keep flowing.
//! - [`ModuleMediator`]: a per-module view onto the hub whose subscriptions
//!   live in a private namespace, so tearing the mediator down removes exactly
//!   what that module subscribed.
//! - [`register_hub`]: registers a mediator factory in a
//!   [`LibraryRegistry`](mosaic_di::LibraryRegistry) so every module gets its
//!   own mediator.
//!
//! ## Example
//!
//! ```
//! use mosaic_signals::{EventHub, Handler};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let hub = EventHub::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! hub.subscribe("app:ready", Handler::new(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! hub.pause();
//! hub.publish("app:ready", vec![]);
//! assert_eq!(seen.load(Ordering::SeqCst), 0);
//!
//! hub.resume();
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

pub mod handler;
pub mod hub;
pub mod mediator;

pub use handler::Handler;
pub use hub::{DEFAULT_BYPASS_PREFIX, EventHub};
pub use mediator::ModuleMediator;

use mosaic_core::Result;
use mosaic_di::{LibraryInstance, LibraryRegistry};

/// Library name modules use to reach the hub.
pub const HUB_LIBRARY: &str = "hub";

/// Registers a [`ModuleMediator`] factory for `hub` under [`HUB_LIBRARY`].
pub fn register_hub(libraries: &LibraryRegistry, hub: &EventHub) -> Result<()> {
	register_hub_as(libraries, HUB_LIBRARY, hub)
}

/// Registers a [`ModuleMediator`] factory for `hub` under `name`.
///
/// Each build of a dependency bundle gets a fresh mediator exposing both the
/// publish and teardown capabilities.
pub fn register_hub_as(libraries: &LibraryRegistry, name: &str, hub: &EventHub) -> Result<()> {
	let hub = hub.clone();
	libraries.add(name, move || {
		LibraryInstance::builder(ModuleMediator::new(hub.clone()))
			.publisher()
			.teardown()
			.build()
	})?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use mosaic_core::{Error, Publish};
	use parking_lot::Mutex;
	use rstest::rstest;
	use std::sync::Arc;

	#[rstest]
	fn test_register_hub_gives_each_bundle_its_own_mediator() {
		// Arrange
		let libraries = LibraryRegistry::new();
		let hub = EventHub::new();
		register_hub(&libraries, &hub).unwrap();

		// Act
		let first = libraries.require([HUB_LIBRARY]).build().unwrap();
		let second = libraries.require([HUB_LIBRARY]).build().unwrap();

		// Assert
		let first = first.get_as::<ModuleMediator>(HUB_LIBRARY).unwrap();
		let second = second.get_as::<ModuleMediator>(HUB_LIBRARY).unwrap();
		assert_ne!(first.namespace(), second.namespace());
	}

	#[rstest]
	fn test_bundle_teardown_unsubscribes_module_handlers() {
		// Arrange
		let libraries = LibraryRegistry::new();
		let hub = EventHub::new();
		register_hub(&libraries, &hub).unwrap();
		let bundle = libraries.require([HUB_LIBRARY]);
		let instances = bundle.build().unwrap();
		let mediator = instances.get_as::<ModuleMediator>(HUB_LIBRARY).unwrap();
		let calls = Arc::new(Mutex::new(0));
		let counter = Arc::clone(&calls);
		mediator
			.subscribe("search:submit", Handler::new(move |_| *counter.lock() += 1))
			.unwrap();

		// Act
		instances.publisher().unwrap().publish("search:submit", vec![]);
		bundle.teardown();
		hub.publish("search:submit", vec![]);

		// Assert
		assert_eq!(*calls.lock(), 1);
	}

	#[rstest]
	fn test_register_hub_twice_is_duplicate() {
		let libraries = LibraryRegistry::new();
		let hub = EventHub::new();
		register_hub(&libraries, &hub).unwrap();

		let result = register_hub(&libraries, &hub);

		assert_eq!(result, Err(Error::DuplicateName(HUB_LIBRARY.into())));
	}
}
