//! The module registry.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use mosaic_core::{Error, Result};
use mosaic_di::LibraryRegistry;
use mosaic_dom::{Dom, DomEvent, Element, EventListener, Selector};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error};

use crate::class::ModuleClass;
use crate::factory::{DEFAULT_DEPENDENCIES, DeferredEvent, FindModule, ModuleFactory};
use crate::module::{Module, ModuleInit};
use crate::property::{Methods, Options};

struct RegistryInner {
	dom: Arc<dyn Dom>,
	libraries: LibraryRegistry,
	base: Arc<ModuleClass>,
	default_dependencies: Vec<String>,
	registry: RwLock<IndexMap<String, Arc<ModuleFactory>>>,
	instances: RwLock<IndexMap<String, Vec<Arc<Module>>>>,
}

/// Defines module types and tracks their live instances on a document.
///
/// The registry owns the base class all of its modules descend from, so two
/// registries never share mixins. Clones share state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use mosaic_di::LibraryRegistry;
/// use mosaic_dom::Document;
/// use mosaic_modules::ModuleRegistry;
/// use mosaic_signals::{EventHub, register_hub};
///
/// let document = Document::new();
/// document.body().set_html(r#"<div data-tabs data-tabs-active="2"></div>"#);
///
/// let libraries = LibraryRegistry::new();
/// register_hub(&libraries, &EventHub::new()).unwrap();
/// let modules = ModuleRegistry::new(Arc::new(document.clone()), libraries);
/// modules.define("tabs", None).unwrap();
///
/// modules.initialize(None).unwrap();
///
/// let el = document.body().find("[data-tabs]").unwrap().remove(0);
/// let tabs = modules.lookup_type(&el, "tabs").unwrap();
/// assert_eq!(tabs.option("active"), Some(2.into()));
/// ```
#[derive(Clone)]
pub struct ModuleRegistry {
	inner: Arc<RegistryInner>,
}

/// A non-owning handle to a [`ModuleRegistry`].
#[derive(Clone)]
pub struct WeakModuleRegistry {
	inner: Weak<RegistryInner>,
}

impl WeakModuleRegistry {
	pub fn upgrade(&self) -> Option<ModuleRegistry> {
		self.inner.upgrade().map(|inner| ModuleRegistry { inner })
	}
}

impl ModuleRegistry {
	/// Creates a registry whose modules require the `hub` library.
	pub fn new(dom: Arc<dyn Dom>, libraries: LibraryRegistry) -> Self {
		Self::with_default_dependencies(dom, libraries, DEFAULT_DEPENDENCIES.iter().copied())
	}

	/// Creates a registry whose modules require `names` by default.
	pub fn with_default_dependencies<I, S>(dom: Arc<dyn Dom>, libraries: LibraryRegistry, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			inner: Arc::new(RegistryInner {
				dom,
				libraries,
				base: ModuleClass::base(),
				default_dependencies: names.into_iter().map(Into::into).collect(),
				registry: RwLock::new(IndexMap::new()),
				instances: RwLock::new(IndexMap::new()),
			}),
		}
	}

	pub fn downgrade(&self) -> WeakModuleRegistry {
		WeakModuleRegistry {
			inner: Arc::downgrade(&self.inner),
		}
	}

	pub fn dom(&self) -> &Arc<dyn Dom> {
		&self.inner.dom
	}

	pub fn libraries(&self) -> &LibraryRegistry {
		&self.inner.libraries
	}

	/// The base class shared by every module of this registry.
	pub fn base(&self) -> &Arc<ModuleClass> {
		&self.inner.base
	}

	/// Element handle for the document node.
	pub fn document_element(&self) -> Element {
		Element::new(Arc::clone(&self.inner.dom), self.inner.dom.root())
	}

	/// Registers a new module type.
	///
	/// Fails with [`Error::DuplicateDefinition`] if the type already exists.
	pub fn define(&self, module_type: &str, methods: Option<Methods>) -> Result<Arc<ModuleFactory>> {
		if self.inner.registry.read().contains_key(module_type) {
			return Err(Error::DuplicateDefinition(module_type.to_string()));
		}
		let weak = Arc::downgrade(&self.inner);
		let find: FindModule = Arc::new(move |name: &str| {
			weak.upgrade()
				.and_then(|inner| inner.registry.read().get(name).cloned())
		});
		let factory = ModuleFactory::new(module_type, Arc::clone(&self.inner.base))?
			.with_resolver(find)
			.with_dependencies(self.inner.default_dependencies.iter().cloned());
		if let Some(methods) = methods {
			factory.methods(methods)?;
		}
		let factory = Arc::new(factory);

		let mut registry = self.inner.registry.write();
		if registry.contains_key(module_type) {
			return Err(Error::DuplicateDefinition(module_type.to_string()));
		}
		registry.insert(module_type.to_string(), Arc::clone(&factory));
		debug!(module = %module_type, "Module defined");
		Ok(factory)
	}

	pub fn find(&self, module_type: &str) -> Option<Arc<ModuleFactory>> {
		self.inner.registry.read().get(module_type).cloned()
	}

	/// Registered factories in definition order.
	pub fn factories(&self) -> Vec<Arc<ModuleFactory>> {
		self.inner.registry.read().values().cloned().collect()
	}

	/// Instantiates a module directly.
	///
	/// Unlike [`instance`](Self::instance) this resolves no dependencies,
	/// ignores the factory's default options and does not cache the result.
	pub fn create(&self, module_type: &str, element: &Element, options: Options) -> Result<Arc<Module>> {
		let factory = self
			.find(module_type)
			.ok_or_else(|| Error::UnknownModule(module_type.to_string()))?;
		let class = factory.build()?;
		Ok(class.create(ModuleInit::new(element.clone()).with_options(options)))
	}

	/// Activates every registered module type found under `root`.
	///
	/// Deferred types get their activation events delegated instead of being
	/// instantiated. `root` defaults to the document.
	pub fn initialize(&self, root: Option<&Element>) -> Result<&Self> {
		let root = root.cloned().unwrap_or_else(|| self.document_element());
		for factory in self.factories() {
			for element in root.select(factory.matcher()) {
				if factory.is_deferred() {
					self.delegate(&factory)?;
				} else {
					self.instance(&factory, &element)?;
				}
			}
		}
		Ok(self)
	}

	/// Binds a deferred factory's activation events on the document.
	///
	/// Each listener fires for events bubbling through an element of the
	/// factory's type. A descriptor selector further requires the event to
	/// start inside a matching descendant. Runs at most once per factory.
	pub fn delegate(&self, factory: &Arc<ModuleFactory>) -> Result<()> {
		if factory.has_delegated() {
			return Ok(());
		}
		let mut bindings = Vec::new();
		for descriptor in factory.events() {
			let narrow = match descriptor.selector.as_deref().map(str::trim) {
				Some(sub) if !sub.is_empty() => Some(Selector::parse(sub)?),
				_ => None,
			};
			let kind = descriptor.on.clone().unwrap_or_default();
			bindings.push((kind, narrow, descriptor));
		}
		if factory.mark_delegated() {
			return Ok(());
		}

		let root = self.inner.dom.root();
		for (kind, narrow, descriptor) in bindings {
			let registry = self.downgrade();
			let target = Arc::clone(factory);
			let listener: EventListener = Arc::new(move |event: &DomEvent| {
				let Some(registry) = registry.upgrade() else {
					return;
				};
				if narrow
					.as_ref()
					.is_some_and(|selector| !registry.originates_within(event, selector))
				{
					return;
				}
				if let Err(err) = registry.delegate_handler(&target, &descriptor, event) {
					error!(module = %target.module_type(), error = %err, "Deferred module activation failed");
				}
			});
			self.inner
				.dom
				.listen(root, &kind, Some(factory.matcher().clone()), listener);
		}
		debug!(module = %factory.module_type(), "Deferred events delegated");
		Ok(())
	}

	/// Whether the event started on a node matching `selector`, between its
	/// target and its current target inclusive.
	fn originates_within(&self, event: &DomEvent, selector: &Selector) -> bool {
		let (Some(target), Some(boundary)) = (event.target(), event.current_target()) else {
			return false;
		};
		let dom = &self.inner.dom;
		let mut current = Some(target);
		while let Some(node) = current {
			if dom.matches(node, selector) {
				return true;
			}
			if node == boundary {
				return false;
			}
			current = dom.parent(node);
		}
		false
	}

	/// Handles an activation event for a deferred factory.
	///
	/// Events with the meta key held are ignored. Otherwise the module on the
	/// event's current target is instantiated (or re-run), the default action
	/// is prevented unless the descriptor opts out, and the descriptor's
	/// callback runs.
	pub fn delegate_handler(
		&self,
		factory: &Arc<ModuleFactory>,
		descriptor: &DeferredEvent,
		event: &DomEvent,
	) -> Result<()> {
		if event.meta_key() {
			return Ok(());
		}
		let Some(node) = event.current_target() else {
			return Ok(());
		};
		let element = Element::new(Arc::clone(&self.inner.dom), node);
		let module = self.instance(factory, &element)?;
		if descriptor.prevent_default {
			event.prevent_default();
		}
		if let Some(callback) = &descriptor.callback {
			callback(&module, event);
		}
		Ok(())
	}

	/// Returns the module of `factory`'s type on `element`, creating it if
	/// needed.
	///
	/// A cached instance is only re-run. A new one gets its dependencies
	/// resolved, options merged from the factory defaults and the element's
	/// `data-<type>-*` attributes, and is cached until removed; removal
	/// tears its dependencies down exactly once.
	pub fn instance(&self, factory: &Arc<ModuleFactory>, element: &Element) -> Result<Arc<Module>> {
		if let Some(existing) = self.find_instance(factory, element) {
			existing.run();
			return Ok(existing);
		}

		let extracted = factory.extract(element);
		let bundle = self.inner.libraries.require(factory.dependencies());
		let dependencies = bundle.build()?;
		let mut options = factory.defaults();
		options.extend(extracted);
		let class = factory.build()?;

		let module = Module::allocate(
			class,
			ModuleInit::new(element.clone())
				.with_options(options)
				.with_dependencies(dependencies),
		);
		let registry = self.downgrade();
		let owner = Arc::downgrade(&module);
		let bundle = Mutex::new(Some(bundle));
		module.events().on("remove", move |_| {
			if let (Some(registry), Some(module)) = (registry.upgrade(), owner.upgrade()) {
				registry.remove_instance(&module);
			}
			let taken = bundle.lock().take();
			if let Some(bundle) = taken {
				bundle.teardown();
			}
		});
		self.add_instance(Arc::clone(&module));
		module.boot();
		module.run();
		debug!(module = %factory.module_type(), cid = %module.cid(), "Module instantiated");
		Ok(module)
	}

	/// The cached instance of `factory`'s type on `element`.
	pub fn find_instance(&self, factory: &ModuleFactory, element: &Element) -> Option<Arc<Module>> {
		self.inner
			.instances
			.read()
			.get(factory.module_type())
			.and_then(|modules| modules.iter().find(|module| module.el() == element).cloned())
	}

	pub fn add_instance(&self, module: Arc<Module>) {
		self.inner
			.instances
			.write()
			.entry(module.module_type().to_string())
			.or_default()
			.push(module);
	}

	/// Drops `module` from the cache. Returns whether it was cached.
	pub fn remove_instance(&self, module: &Module) -> bool {
		let mut instances = self.inner.instances.write();
		let Some(modules) = instances.get_mut(module.module_type()) else {
			return false;
		};
		let before = modules.len();
		modules.retain(|cached| !std::ptr::eq(Arc::as_ptr(cached), module));
		before != modules.len()
	}

	/// Cached instances of a module type.
	pub fn instances(&self, module_type: &str) -> Vec<Arc<Module>> {
		self.inner
			.instances
			.read()
			.get(module_type)
			.cloned()
			.unwrap_or_default()
	}

	/// Cached instances on `element` or any of its ancestors, nearest first.
	pub fn lookup(&self, element: &Element) -> Vec<Arc<Module>> {
		let instances = self.inner.instances.read();
		element
			.self_and_ancestors()
			.iter()
			.flat_map(|el| {
				instances
					.values()
					.flatten()
					.filter(|module| module.el() == el)
					.cloned()
					.collect::<Vec<_>>()
			})
			.collect()
	}

	/// The nearest cached instance of `module_type` on `element` or an ancestor.
	pub fn lookup_type(&self, element: &Element, module_type: &str) -> Option<Arc<Module>> {
		self.lookup(element)
			.into_iter()
			.find(|module| module.module_type() == module_type)
	}

	/// Adds properties to the base class of every module in this registry.
	///
	/// Fails with [`Error::DuplicateProperty`], adding nothing, if a name is
	/// already defined on the base.
	pub fn mixin(&self, methods: Methods) -> Result<&Self> {
		self.inner.base.mixin(methods)?;
		Ok(self)
	}

	/// Forgets every definition and cached instance.
	///
	/// Listeners already bound on the document are left in place.
	pub fn reset(&self) {
		self.inner.registry.write().clear();
		self.inner.instances.write().clear();
	}
}

impl fmt::Debug for ModuleRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleRegistry")
			.field("modules", &self.inner.registry.read().keys().collect::<Vec<_>>())
			.field(
				"instances",
				&self.inner.instances.read().values().map(Vec::len).sum::<usize>(),
			)
			.finish()
	}
}
