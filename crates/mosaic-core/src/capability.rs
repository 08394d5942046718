//! Capabilities a library instance can expose.
//!
//! A dependency bundle tears down every instance exposing [`Teardown`], and
//! modules announce their lifecycle through the first dependency exposing
//! [`Publish`].

use crate::payload::Args;

/// Releases whatever an instance registered on behalf of its owner.
pub trait Teardown: Send + Sync {
	/// Releases resources. Calling it more than once must be harmless.
	fn teardown(&self);
}

/// Publishes named events.
pub trait Publish: Send + Sync {
	/// Publishes `name` with `args` to every interested subscriber.
	fn publish(&self, name: &str, args: Args);
}
