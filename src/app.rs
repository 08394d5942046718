//! The application context.

use std::fmt;
use std::sync::Arc;

use mosaic_core::Result;
use mosaic_di::LibraryRegistry;
use mosaic_dom::{Dom, Element};
use mosaic_modules::{Methods, Module, ModuleFactory, ModuleRegistry, Options};
use mosaic_signals::{EventHub, register_hub_as};
use tracing::{debug, error};

use crate::settings::Settings;

/// Wires a library registry, an event hub and a module registry together
/// for one document.
///
/// The hub is registered as a library so every module gets its own
/// mediator. Unless disabled in [`Settings`], markup inserted through
/// [`Module::html`] is scanned for modules right away.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use mosaic::{App, Document, Methods};
///
/// let document = Document::new();
/// document.body().set_html(r#"<form data-search></form>"#);
///
/// let app = App::new(Arc::new(document.clone())).unwrap();
/// app.define("search", Some(Methods::new().value("endpoint", "/search"))).unwrap();
/// app.initialize().unwrap();
///
/// assert_eq!(app.modules().instances("search").len(), 1);
/// ```
#[derive(Clone)]
pub struct App {
	dom: Arc<dyn Dom>,
	libraries: LibraryRegistry,
	hub: EventHub,
	modules: ModuleRegistry,
	settings: Settings,
}

impl App {
	pub fn new(dom: Arc<dyn Dom>) -> Result<Self> {
		Self::with_settings(dom, Settings::default())
	}

	pub fn with_settings(dom: Arc<dyn Dom>, settings: Settings) -> Result<Self> {
		let libraries = LibraryRegistry::new();
		let hub = EventHub::with_bypass_prefix(settings.hub.bypass_prefix.clone());
		register_hub_as(&libraries, &settings.hub.library_name, &hub)?;
		let modules = ModuleRegistry::with_default_dependencies(
			Arc::clone(&dom),
			libraries.clone(),
			settings.modules.default_dependencies.iter().cloned(),
		);

		if settings.modules.reinitialize_on_html {
			let registry = modules.downgrade();
			hub.on("module:html", move |args| {
				let Some(registry) = registry.upgrade() else {
					return;
				};
				let Some(module) = args.get(1).and_then(|arg| arg.downcast::<Module>()) else {
					return;
				};
				debug!(cid = %module.cid(), "Scanning updated module markup");
				if let Err(err) = registry.initialize(Some(module.el())) {
					error!(cid = %module.cid(), error = %err, "Failed to initialize inserted markup");
				}
			});
		}

		Ok(Self {
			dom,
			libraries,
			hub,
			modules,
			settings,
		})
	}

	pub fn dom(&self) -> &Arc<dyn Dom> {
		&self.dom
	}

	pub fn libraries(&self) -> &LibraryRegistry {
		&self.libraries
	}

	pub fn hub(&self) -> &EventHub {
		&self.hub
	}

	pub fn modules(&self) -> &ModuleRegistry {
		&self.modules
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Defines a module type. See [`ModuleRegistry::define`].
	pub fn define(&self, module_type: &str, methods: Option<Methods>) -> Result<Arc<ModuleFactory>> {
		self.modules.define(module_type, methods)
	}

	/// Activates modules across the whole document.
	pub fn initialize(&self) -> Result<&Self> {
		self.modules.initialize(None)?;
		Ok(self)
	}

	/// Instantiates a module directly. See [`ModuleRegistry::create`].
	pub fn create(&self, module_type: &str, element: &Element, options: Options) -> Result<Arc<Module>> {
		self.modules.create(module_type, element, options)
	}
}

impl fmt::Debug for App {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("libraries", &self.libraries)
			.field("hub", &self.hub)
			.field("modules", &self.modules)
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}
