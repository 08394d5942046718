//! Module classes.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use mosaic_core::{Error, Result};
use parking_lot::RwLock;
use tracing::debug;

use crate::module::{INITIALIZE, Module, ModuleInit, RUN, TEARDOWN};
use crate::property::{EVENTS, Methods, Property};

/// Type of the root class every module descends from.
pub const BASE_TYPE: &str = "base";

/// Names every base class defines. Mixing them into a base fails.
pub const BASE_METHODS: &[&str] = &[
	INITIALIZE,
	RUN,
	TEARDOWN,
	EVENTS,
	"cid",
	"el",
	"options",
	"module_type",
	"find",
	"html",
	"remove",
	"delegate_events",
	"undelegate_events",
];

/// A built module type: a name, a type string and a property table.
///
/// Classes form a single-inheritance chain ending at a base class. Each
/// derived class stores the flattened table of everything it inherits from
/// the classes between itself and the base; lookups that miss that table
/// fall through to the base, so properties mixed into the base later are
/// visible to every existing class.
///
/// # Examples
///
/// ```
/// use mosaic_modules::{Methods, ModuleClass};
///
/// let base = ModuleClass::base();
/// let dropdown = base.extend(Methods::new().value("limit", 5));
///
/// assert!(dropdown.descends_from(&base));
/// assert_eq!(dropdown.lookup("limit").unwrap().as_value(), Some(&5.into()));
/// ```
pub struct ModuleClass {
	name: String,
	module_type: String,
	parent: Option<Arc<ModuleClass>>,
	properties: RwLock<IndexMap<String, Property>>,
	root: Option<Arc<ModuleClass>>,
}

impl ModuleClass {
	/// Creates a fresh base class named `Module` of type [`BASE_TYPE`].
	pub fn base() -> Arc<Self> {
		Arc::new(Self {
			name: "Module".to_string(),
			module_type: BASE_TYPE.to_string(),
			parent: None,
			properties: RwLock::new(IndexMap::new()),
			root: None,
		})
	}

	pub(crate) fn derive(
		parent: &Arc<ModuleClass>,
		name: String,
		module_type: String,
		own: Methods,
	) -> Arc<Self> {
		let mut properties = if parent.is_base() {
			IndexMap::new()
		} else {
			parent.properties.read().clone()
		};
		properties.extend(own);
		Arc::new(Self {
			name,
			module_type,
			parent: Some(Arc::clone(parent)),
			properties: RwLock::new(properties),
			root: Some(parent.root()),
		})
	}

	/// Creates an anonymous subclass with the same name and type.
	pub fn extend(self: &Arc<Self>, methods: Methods) -> Arc<Self> {
		Self::derive(self, self.name.clone(), self.module_type.clone(), methods)
	}

	/// Instantiates the class on an element without any registry involvement.
	pub fn create(self: &Arc<Self>, init: ModuleInit) -> Arc<Module> {
		Module::new(Arc::clone(self), init)
	}

	/// Display name, e.g. `DropdownModule`.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn module_type(&self) -> &str {
		&self.module_type
	}

	pub fn parent(&self) -> Option<&Arc<ModuleClass>> {
		self.parent.as_ref()
	}

	pub fn is_base(&self) -> bool {
		self.root.is_none()
	}

	/// The base class this class descends from, or itself for a base.
	pub fn root(self: &Arc<Self>) -> Arc<ModuleClass> {
		self.root.clone().unwrap_or_else(|| Arc::clone(self))
	}

	/// Whether `ancestor` is this class or appears in its parent chain.
	pub fn descends_from(self: &Arc<Self>, ancestor: &Arc<ModuleClass>) -> bool {
		let mut current = Some(self);
		while let Some(class) = current {
			if Arc::ptr_eq(class, ancestor) {
				return true;
			}
			current = class.parent.as_ref();
		}
		false
	}

	/// Resolves a property on this class, falling back to the base.
	pub fn lookup(&self, name: &str) -> Option<Property> {
		if let Some(property) = self.properties.read().get(name) {
			return Some(property.clone());
		}
		self.root
			.as_ref()
			.and_then(|root| root.properties.read().get(name).cloned())
	}

	/// Whether the class's own table defines `name`.
	///
	/// A base class also owns the names in [`BASE_METHODS`].
	pub fn has_own(&self, name: &str) -> bool {
		(self.is_base() && BASE_METHODS.contains(&name)) || self.properties.read().contains_key(name)
	}

	pub fn property_names(&self) -> Vec<String> {
		self.properties.read().keys().cloned().collect()
	}

	/// Adds properties to this class in place.
	///
	/// Nothing is added if any name already exists. On a base class that
	/// includes the built-in [`BASE_METHODS`].
	pub fn mixin(&self, methods: Methods) -> Result<()> {
		let mut properties = self.properties.write();
		let reserved = |name: &str| self.is_base() && BASE_METHODS.contains(&name);
		if let Some(name) = methods
			.names()
			.find(|name| reserved(*name) || properties.contains_key(*name))
		{
			return Err(Error::DuplicateProperty(name.to_string()));
		}
		debug!(class = %self.name, count = methods.len(), "Mixing properties into class");
		properties.extend(methods);
		Ok(())
	}
}

impl fmt::Debug for ModuleClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleClass")
			.field("name", &self.name)
			.field("module_type", &self.module_type)
			.field("properties", &self.property_names())
			.finish()
	}
}
