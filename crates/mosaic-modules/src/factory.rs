//! Module factories.
//!
//! A [`ModuleFactory`] collects the definition of one module type (parent,
//! properties, default options, dependencies, deferred activation events)
//! and builds it into a [`ModuleClass`] on demand.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use convert_case::{Case, Casing};
use mosaic_core::{Error, Result};
use mosaic_dom::{DomEvent, Element, Selector};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::class::ModuleClass;
use crate::module::Module;
use crate::property::{Methods, Options, Property};

/// Libraries every module requires unless configured otherwise.
pub const DEFAULT_DEPENDENCIES: &[&str] = &["hub"];

/// Looks up a registered factory by module type.
pub type FindModule = Arc<dyn Fn(&str) -> Option<Arc<ModuleFactory>> + Send + Sync>;

/// Runs after a deferred module has been activated by an event.
pub type DeferredCallback = Arc<dyn Fn(&Arc<Module>, &DomEvent) + Send + Sync>;

fn default_prevent_default() -> bool {
	true
}

/// An event that activates a deferred module.
///
/// Descriptors can be written by hand or deserialized, e.g. from settings:
///
/// ```
/// use mosaic_modules::DeferredEvent;
///
/// let event: DeferredEvent =
///     serde_json::from_str(r#"{"on": "click", "selector": "button"}"#).unwrap();
/// assert_eq!(event.on.as_deref(), Some("click"));
/// assert!(event.prevent_default);
/// ```
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredEvent {
	/// DOM event type. Required.
	#[serde(default)]
	pub on: Option<String>,
	/// Narrows activation to descendants of the module element.
	#[serde(default)]
	pub selector: Option<String>,
	#[serde(default = "default_prevent_default", alias = "prevent_default")]
	pub prevent_default: bool,
	#[serde(skip)]
	pub callback: Option<DeferredCallback>,
}

impl DeferredEvent {
	pub fn new(on: impl Into<String>) -> Self {
		Self {
			on: Some(on.into()),
			..Self::default()
		}
	}

	pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
		self.selector = Some(selector.into());
		self
	}

	pub fn with_prevent_default(mut self, prevent_default: bool) -> Self {
		self.prevent_default = prevent_default;
		self
	}

	pub fn with_callback<F>(mut self, callback: F) -> Self
	where
		F: Fn(&Arc<Module>, &DomEvent) + Send + Sync + 'static,
	{
		self.callback = Some(Arc::new(callback));
		self
	}
}

impl Default for DeferredEvent {
	fn default() -> Self {
		Self {
			on: None,
			selector: None,
			prevent_default: true,
			callback: None,
		}
	}
}

impl fmt::Debug for DeferredEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeferredEvent")
			.field("on", &self.on)
			.field("selector", &self.selector)
			.field("prevent_default", &self.prevent_default)
			.field("callback", &self.callback.is_some())
			.finish()
	}
}

/// A factory's parent.
#[derive(Clone, Debug)]
pub enum Parent {
	Class(Arc<ModuleClass>),
	Factory(Arc<ModuleFactory>),
}

/// Argument to [`ModuleFactory::extend`].
#[derive(Clone, Debug)]
pub enum Extends {
	Class(Arc<ModuleClass>),
	/// A module type resolved through the factory's registry.
	Name(String),
}

impl From<Arc<ModuleClass>> for Extends {
	fn from(class: Arc<ModuleClass>) -> Self {
		Self::Class(class)
	}
}

impl From<&Arc<ModuleClass>> for Extends {
	fn from(class: &Arc<ModuleClass>) -> Self {
		Self::Class(Arc::clone(class))
	}
}

impl From<&str> for Extends {
	fn from(name: &str) -> Self {
		Self::Name(name.to_string())
	}
}

impl From<String> for Extends {
	fn from(name: String) -> Self {
		Self::Name(name)
	}
}

/// Options for [`ModuleFactory::build_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
	/// Rebuild even if a class is already cached.
	pub force: bool,
}

struct FactoryState {
	dependencies: Vec<String>,
	parent: Option<Parent>,
	properties: Methods,
	defaults: Options,
	events: Vec<DeferredEvent>,
	built: Option<Arc<ModuleClass>>,
}

/// Definition of one module type.
///
/// # Examples
///
/// ```
/// use mosaic_modules::{Methods, ModuleClass, ModuleFactory};
///
/// let factory = ModuleFactory::new("long-example", ModuleClass::base()).unwrap();
/// factory.methods(Methods::new().value("limit", 3)).unwrap();
///
/// let class = factory.build().unwrap();
/// assert_eq!(class.name(), "LongExampleModule");
/// assert_eq!(factory.selector(), "[data-long-example]");
/// ```
pub struct ModuleFactory {
	module_type: String,
	namespace: String,
	selector: Selector,
	base: Arc<ModuleClass>,
	find_module: Option<FindModule>,
	state: RwLock<FactoryState>,
	has_delegated: AtomicBool,
}

impl ModuleFactory {
	/// Creates a factory for `module_type` deriving from `base`.
	///
	/// Fails with [`Error::MissingType`] if the type is empty and
	/// [`Error::InvalidSelector`] if it cannot appear in an attribute name.
	pub fn new(module_type: &str, base: Arc<ModuleClass>) -> Result<Self> {
		if module_type.is_empty() {
			return Err(Error::MissingType);
		}
		let namespace = format!("data-{module_type}");
		let selector = Selector::parse(&format!("[{namespace}]"))?;
		Ok(Self {
			module_type: module_type.to_string(),
			namespace,
			selector,
			base,
			find_module: None,
			state: RwLock::new(FactoryState {
				dependencies: DEFAULT_DEPENDENCIES.iter().map(ToString::to_string).collect(),
				parent: None,
				properties: Methods::new(),
				defaults: Options::new(),
				events: Vec::new(),
				built: None,
			}),
			has_delegated: AtomicBool::new(false),
		})
	}

	/// Allows [`extend`](Self::extend) to resolve parents by module type.
	pub fn with_resolver(mut self, find_module: FindModule) -> Self {
		self.find_module = Some(find_module);
		self
	}

	/// Replaces the initial dependency list.
	pub fn with_dependencies<I, S>(self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.state.write().dependencies.clear();
		self.requires(names);
		self
	}

	pub fn module_type(&self) -> &str {
		&self.module_type
	}

	/// Attribute prefix of this type, e.g. `data-dropdown`.
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Selector matching elements of this type, e.g. `[data-dropdown]`.
	pub fn selector(&self) -> &str {
		self.selector.as_str()
	}

	pub fn matcher(&self) -> &Selector {
		&self.selector
	}

	pub fn base(&self) -> &Arc<ModuleClass> {
		&self.base
	}

	/// Builds the class, reusing the cached one if present.
	pub fn build(&self) -> Result<Arc<ModuleClass>> {
		self.build_with(BuildOptions::default())
	}

	/// Builds the class.
	///
	/// A factory parent is built first (from its own cache unless it has
	/// never been built). Fails with [`Error::CircularInheritance`] if the
	/// parent chain loops back on itself.
	pub fn build_with(&self, options: BuildOptions) -> Result<Arc<ModuleClass>> {
		self.build_inner(options.force, &mut Vec::new())
	}

	fn build_inner(&self, force: bool, visiting: &mut Vec<String>) -> Result<Arc<ModuleClass>> {
		if !force {
			if let Some(built) = &self.state.read().built {
				return Ok(Arc::clone(built));
			}
		}
		if visiting.contains(&self.module_type) {
			let mut path = visiting.clone();
			path.push(self.module_type.clone());
			return Err(Error::CircularInheritance { path });
		}
		visiting.push(self.module_type.clone());
		let (parent, properties) = {
			let state = self.state.read();
			(state.parent.clone(), state.properties.clone())
		};
		let parent_class = match parent {
			None => Arc::clone(&self.base),
			Some(Parent::Class(class)) => class,
			Some(Parent::Factory(factory)) => factory.build_inner(false, visiting)?,
		};
		visiting.pop();

		let class = ModuleClass::derive(
			&parent_class,
			display_name(&self.module_type),
			self.module_type.clone(),
			properties,
		);
		debug!(module = %self.module_type, class = %class.name(), "Built module class");
		self.state.write().built = Some(Arc::clone(&class));
		Ok(class)
	}

	/// Sets the parent, either a class or another registered module type.
	///
	/// Fails with [`Error::InvalidParent`] if the class does not descend from
	/// this factory's base, or if the type name cannot be resolved.
	pub fn extend(&self, parent: impl Into<Extends>) -> Result<&Self> {
		let parent = match parent.into() {
			Extends::Class(class) => {
				if !class.descends_from(&self.base) {
					return Err(Error::invalid_parent(
						&self.module_type,
						format!("{} does not descend from the module base", class.name()),
					));
				}
				Parent::Class(class)
			}
			Extends::Name(name) => {
				let find = self.find_module.as_ref().ok_or_else(|| {
					Error::invalid_parent(&self.module_type, "no registry to resolve parents")
				})?;
				let factory = find(&name).ok_or_else(|| {
					Error::invalid_parent(&self.module_type, format!("{name} is not a module"))
				})?;
				Parent::Factory(factory)
			}
		};
		self.state.write().parent = Some(parent);
		Ok(self)
	}

	/// Adds properties to the class definition.
	///
	/// Fails with [`Error::DuplicateProperty`], adding nothing, if any name
	/// is already defined on this factory.
	pub fn methods(&self, methods: Methods) -> Result<&Self> {
		let mut state = self.state.write();
		if let Some(name) = methods.names().find(|name| state.properties.contains(name)) {
			return Err(Error::DuplicateProperty(name.to_string()));
		}
		state.properties.extend(methods);
		Ok(self)
	}

	/// Alias of [`methods`](Self::methods).
	pub fn mixin(&self, methods: Methods) -> Result<&Self> {
		self.methods(methods)
	}

	/// Merges default options; later keys replace earlier ones.
	pub fn options(&self, defaults: Options) -> &Self {
		self.state.write().defaults.extend(defaults);
		self
	}

	/// Adds library dependencies, ignoring ones already listed.
	pub fn requires<I, S>(&self, names: I) -> &Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut state = self.state.write();
		for name in names {
			let name = name.into();
			if !state.dependencies.contains(&name) {
				state.dependencies.push(name);
			}
		}
		self
	}

	/// Defers instantiation until `event` fires on a module element.
	///
	/// Fails with [`Error::MissingTrigger`] if the descriptor has no event type.
	pub fn defer(&self, event: DeferredEvent) -> Result<&Self> {
		if event.on.as_deref().is_none_or(|on| on.trim().is_empty()) {
			return Err(Error::MissingTrigger(self.module_type.clone()));
		}
		self.state.write().events.push(event);
		Ok(self)
	}

	pub fn is_deferred(&self) -> bool {
		!self.state.read().events.is_empty()
	}

	pub fn events(&self) -> Vec<DeferredEvent> {
		self.state.read().events.clone()
	}

	pub fn dependencies(&self) -> Vec<String> {
		self.state.read().dependencies.clone()
	}

	pub fn defaults(&self) -> Options {
		self.state.read().defaults.clone()
	}

	pub fn parent(&self) -> Option<Parent> {
		self.state.read().parent.clone()
	}

	pub fn property(&self, name: &str) -> Option<Property> {
		self.state.read().properties.get(name).cloned()
	}

	pub fn has_delegated(&self) -> bool {
		self.has_delegated.load(Ordering::Acquire)
	}

	/// Marks the factory delegated, returning whether it already was.
	pub(crate) fn mark_delegated(&self) -> bool {
		self.has_delegated.swap(true, Ordering::AcqRel)
	}

	/// Reads options from `data-<type>-*` attributes.
	///
	/// Keys are camel-cased (`data-tabs-active-index` becomes `activeIndex`).
	/// Values are parsed as JSON when possible and kept as strings otherwise;
	/// an empty value reads as `true`.
	pub fn extract(&self, element: &Element) -> Options {
		let prefix = format!("{}-", self.namespace);
		element
			.attributes()
			.into_iter()
			.filter_map(|(name, value)| {
				let key = name.strip_prefix(&prefix)?;
				if key.is_empty() {
					return None;
				}
				Some((key.from_case(Case::Kebab).to_case(Case::Camel), parse_option(&value)))
			})
			.collect()
	}
}

impl fmt::Debug for ModuleFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.read();
		let parent = state.parent.as_ref().map(|parent| match parent {
			Parent::Class(class) => class.name().to_string(),
			Parent::Factory(factory) => factory.module_type().to_string(),
		});
		f.debug_struct("ModuleFactory")
			.field("module_type", &self.module_type)
			.field("parent", &parent)
			.field("dependencies", &state.dependencies)
			.field("properties", &state.properties.names().collect::<Vec<_>>())
			.field("events", &state.events)
			.field("has_delegated", &self.has_delegated())
			.finish()
	}
}

fn display_name(module_type: &str) -> String {
	format!("{}Module", module_type.from_case(Case::Kebab).to_case(Case::Pascal))
}

fn parse_option(raw: &str) -> Value {
	if raw.is_empty() {
		return Value::Bool(true);
	}
	serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
