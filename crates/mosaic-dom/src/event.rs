//! DOM events.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::NodeId;

/// Listener invoked for a dispatched event.
pub type EventListener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// Callback invoked once when a watched node leaves its tree.
pub type DetachListener = Arc<dyn Fn(NodeId) + Send + Sync>;

/// Handle for unbinding a listener or detach watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

#[derive(Debug, Default)]
struct EventFlags {
	default_prevented: AtomicBool,
	propagation_stopped: AtomicBool,
}

/// An event travelling through the tree.
///
/// Clones share their flags, so a listener calling
/// [`prevent_default`](Self::prevent_default) on its copy is visible to the
/// dispatcher and to every later listener.
#[derive(Clone)]
pub struct DomEvent {
	kind: String,
	target: Option<NodeId>,
	current_target: Option<NodeId>,
	meta_key: bool,
	flags: Arc<EventFlags>,
}

impl DomEvent {
	/// Creates an event of the given type, e.g. `"click"`.
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			target: None,
			current_target: None,
			meta_key: false,
			flags: Arc::new(EventFlags::default()),
		}
	}

	/// Marks the meta (command) key as held.
	pub fn with_meta_key(mut self, meta_key: bool) -> Self {
		self.meta_key = meta_key;
		self
	}

	/// Event type.
	pub fn kind(&self) -> &str {
		&self.kind
	}

	/// Node the event was dispatched on.
	pub fn target(&self) -> Option<NodeId> {
		self.target
	}

	/// Node whose listener (or delegated filter) is currently handling the event.
	pub fn current_target(&self) -> Option<NodeId> {
		self.current_target
	}

	/// Whether the meta (command) key was held.
	pub fn meta_key(&self) -> bool {
		self.meta_key
	}

	/// Suppresses the default browser action.
	pub fn prevent_default(&self) {
		self.flags.default_prevented.store(true, Ordering::SeqCst);
	}

	/// Whether [`prevent_default`](Self::prevent_default) was called.
	pub fn default_prevented(&self) -> bool {
		self.flags.default_prevented.load(Ordering::SeqCst)
	}

	/// Stops the event from bubbling past the current node.
	pub fn stop_propagation(&self) {
		self.flags.propagation_stopped.store(true, Ordering::SeqCst);
	}

	/// Whether [`stop_propagation`](Self::stop_propagation) was called.
	pub fn propagation_stopped(&self) -> bool {
		self.flags.propagation_stopped.load(Ordering::SeqCst)
	}

	pub(crate) fn retarget(&self, target: NodeId, current_target: NodeId) -> Self {
		let mut event = self.clone();
		event.target = Some(target);
		event.current_target = Some(current_target);
		event
	}
}

impl fmt::Debug for DomEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DomEvent")
			.field("kind", &self.kind)
			.field("target", &self.target)
			.field("current_target", &self.current_target)
			.field("meta_key", &self.meta_key)
			.field("default_prevented", &self.default_prevented())
			.finish()
	}
}
