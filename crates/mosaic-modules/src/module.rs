//! Module instances.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use mosaic_core::{Arg, Error, Publish, Result};
use mosaic_di::DependencyMap;
use mosaic_dom::{DomEvent, Element, EventListener, ListenerId, Selector};
use mosaic_signals::EventHub;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, warn};

use crate::class::ModuleClass;
use crate::property::{EVENTS, EventCallback, EventsMap, Options, Property};

static NEXT_CID: AtomicU64 = AtomicU64::new(1);

/// Hook run once after the instance is constructed.
pub const INITIALIZE: &str = "initialize";
/// Hook run on every activation, including cache hits.
pub const RUN: &str = "run";
/// Hook run when the instance is removed.
pub const TEARDOWN: &str = "teardown";

/// Construction arguments for a [`Module`].
#[derive(Debug, Clone)]
pub struct ModuleInit {
	pub el: Element,
	pub options: Options,
	pub dependencies: DependencyMap,
}

impl ModuleInit {
	pub fn new(el: Element) -> Self {
		Self {
			el,
			options: Options::new(),
			dependencies: DependencyMap::new(),
		}
	}

	pub fn with_options(mut self, options: Options) -> Self {
		self.options = options;
		self
	}

	pub fn with_dependencies(mut self, dependencies: DependencyMap) -> Self {
		self.dependencies = dependencies;
		self
	}
}

/// Lifecycle of a [`Module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
	Created,
	Running,
	Removed,
}

/// A live module bound to one element.
///
/// On construction the instance binds its class's `events` map, watches its
/// element for removal from the document, runs the `initialize` hook and
/// announces itself with `module:create` if one of its dependencies can
/// publish. Removing the element, directly or through an ancestor, removes
/// the module.
///
/// Each instance also owns a local [`EventHub`], never paused, on which it
/// emits `remove` as it goes away.
pub struct Module {
	class: Arc<ModuleClass>,
	el: Element,
	cid: String,
	options: RwLock<Options>,
	dependencies: DependencyMap,
	publisher: Option<Arc<dyn Publish>>,
	events: EventHub,
	delegated: Mutex<Vec<ListenerId>>,
	detach: Mutex<Option<ListenerId>>,
	state: Mutex<ModuleState>,
	this: Weak<Module>,
}

impl Module {
	/// Constructs and boots a module.
	pub fn new(class: Arc<ModuleClass>, init: ModuleInit) -> Arc<Self> {
		let module = Self::allocate(class, init);
		module.boot();
		module
	}

	/// Constructs a module without running any of its hooks.
	pub(crate) fn allocate(class: Arc<ModuleClass>, init: ModuleInit) -> Arc<Self> {
		let cid = format!(
			"{}:{}",
			class.module_type(),
			NEXT_CID.fetch_add(1, Ordering::Relaxed)
		);
		let publisher = init.dependencies.publisher();
		Arc::new_cyclic(|this| Self {
			class,
			el: init.el,
			cid,
			options: RwLock::new(init.options),
			dependencies: init.dependencies,
			publisher,
			events: EventHub::new(),
			delegated: Mutex::new(Vec::new()),
			detach: Mutex::new(None),
			state: Mutex::new(ModuleState::Created),
			this: this.clone(),
		})
	}

	pub(crate) fn boot(&self) {
		if let Err(error) = self.delegate_events(None) {
			warn!(cid = %self.cid, error = %error, "Failed to bind module events");
		}
		self.watch_detach();
		self.call(INITIALIZE, &[]);
		if let Some(publisher) = &self.publisher {
			publisher.publish(
				"module:create",
				vec![Arg::value(Value::Object(self.options())), self.as_arg()],
			);
		}
		debug!(cid = %self.cid, "Module created");
	}

	fn watch_detach(&self) {
		let weak = self.this.clone();
		let id = self.el.on_detach(move |_| {
			if let Some(module) = weak.upgrade() {
				debug!(cid = %module.cid, "Module element detached");
				module.remove();
			}
		});
		*self.detach.lock() = Some(id);
	}

	fn as_arg(&self) -> Arg {
		match self.this.upgrade() {
			Some(this) => Arg::shared(this),
			None => Arg::value(Value::Null),
		}
	}

	/// Unique id of the form `<type>:<n>`.
	pub fn cid(&self) -> &str {
		&self.cid
	}

	pub fn class(&self) -> &Arc<ModuleClass> {
		&self.class
	}

	pub fn module_type(&self) -> &str {
		self.class.module_type()
	}

	pub fn el(&self) -> &Element {
		&self.el
	}

	pub fn state(&self) -> ModuleState {
		*self.state.lock()
	}

	pub fn options(&self) -> Options {
		self.options.read().clone()
	}

	pub fn option(&self, key: &str) -> Option<Value> {
		self.options.read().get(key).cloned()
	}

	pub fn set_option(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
		self.options.write().insert(key.into(), value.into());
		self
	}

	pub fn dependencies(&self) -> &DependencyMap {
		&self.dependencies
	}

	/// Typed access to a dependency, e.g. `module.dependency::<ModuleMediator>("hub")`.
	pub fn dependency<T: std::any::Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
		self.dependencies.get_as(name)
	}

	/// The first dependency able to publish, if any.
	pub fn publisher(&self) -> Option<&Arc<dyn Publish>> {
		self.publisher.as_ref()
	}

	/// Local emitter for instance events such as `remove`.
	pub fn events(&self) -> &EventHub {
		&self.events
	}

	/// A plain value property of the class.
	pub fn value(&self, name: &str) -> Option<Value> {
		match self.class.lookup(name) {
			Some(Property::Value(value)) => Some(value),
			_ => None,
		}
	}

	/// Calls the method `name` if the class defines one.
	///
	/// Returns `false` when there is no such method.
	pub fn call(&self, name: &str, args: &[Arg]) -> bool {
		match self.class.lookup(name) {
			Some(Property::Method(method)) => {
				method(self, args);
				true
			}
			_ => false,
		}
	}

	/// Descendants of the module element matching `selector`.
	pub fn find(&self, selector: &str) -> Result<Vec<Element>> {
		self.el.find(selector)
	}

	/// Runs the `run` hook. Does nothing once removed.
	pub fn run(&self) -> &Self {
		{
			let mut state = self.state.lock();
			if *state == ModuleState::Removed {
				return self;
			}
			*state = ModuleState::Running;
		}
		self.call(RUN, &[]);
		self
	}

	/// Replaces the element's content and publishes `module:html`.
	pub fn html(&self, markup: &str) -> &Self {
		self.el.set_html(markup);
		if let Some(publisher) = &self.publisher {
			publisher.publish("module:html", vec![Arg::from(markup), self.as_arg()]);
		}
		self
	}

	/// Binds DOM events, replacing any earlier bindings.
	///
	/// With `None` the class's `events` map is used. Keys are
	/// `"<event> [selector]"`; without a selector the handler is bound on the
	/// module element, with one it is delegated to matching descendants.
	/// Nothing changes if any key fails to parse.
	pub fn delegate_events(&self, events: Option<&EventsMap>) -> Result<&Self> {
		let events = match events {
			Some(events) => events.clone(),
			None => match self.class.lookup(EVENTS) {
				Some(Property::Events(events)) => events,
				_ => EventsMap::new(),
			},
		};

		let mut bindings = Vec::with_capacity(events.len());
		for (key, callback) in events.iter() {
			let (kind, selector) = split_event_key(key);
			if kind.is_empty() {
				return Err(Error::invalid_selector(key, "missing event type"));
			}
			let filter = selector.map(Selector::parse).transpose()?;
			bindings.push((kind.to_string(), filter, callback.clone()));
		}

		self.undelegate_events();
		let dom = self.el.dom();
		let mut ids = Vec::with_capacity(bindings.len());
		for (kind, filter, callback) in bindings {
			let weak = self.this.clone();
			let listener: EventListener = Arc::new(move |event: &DomEvent| {
				let Some(module) = weak.upgrade() else {
					return;
				};
				match &callback {
					EventCallback::Handler(handler) => handler(&module, event),
					EventCallback::Method(name) => {
						if !module.call(name, &[Arg::object(event.clone())]) {
							warn!(cid = %module.cid, method = %name, "Event handler method not found");
						}
					}
				}
			});
			ids.push(dom.listen(self.el.node(), &kind, filter, listener));
		}
		*self.delegated.lock() = ids;
		Ok(self)
	}

	/// Unbinds every listener added by [`delegate_events`](Self::delegate_events).
	pub fn undelegate_events(&self) -> &Self {
		let ids = std::mem::take(&mut *self.delegated.lock());
		for id in ids {
			self.el.dom().unlisten(id);
		}
		self
	}

	/// Removes the module.
	///
	/// Runs `teardown`, emits `remove` locally, publishes `module:remove`
	/// and detaches the element. Later calls do nothing.
	pub fn remove(&self) -> &Self {
		{
			let mut state = self.state.lock();
			if *state == ModuleState::Removed {
				return self;
			}
			*state = ModuleState::Removed;
		}
		let watcher = self.detach.lock().take();
		if let Some(id) = watcher {
			self.el.dom().cancel_detach(id);
		}

		self.call(TEARDOWN, &[]);
		self.undelegate_events();
		let this = self.as_arg();
		self.events.publish("remove", vec![this.clone()]);
		if let Some(publisher) = &self.publisher {
			publisher.publish("module:remove", vec![this]);
		}
		self.el.remove();
		debug!(cid = %self.cid, "Module removed");
		self
	}
}

impl fmt::Debug for Module {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Module")
			.field("cid", &self.cid)
			.field("class", &self.class.name())
			.field("el", &self.el)
			.field("state", &self.state())
			.finish()
	}
}

fn split_event_key(key: &str) -> (&str, Option<&str>) {
	let key = key.trim();
	match key.split_once(char::is_whitespace) {
		Some((kind, selector)) => (kind, Some(selector.trim())),
		None => (key, None),
	}
}
