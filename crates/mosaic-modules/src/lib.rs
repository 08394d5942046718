//! # Mosaic Modules
//!
//! Component modules bound to document elements.
//!
//! - [`ModuleFactory`]: the definition of one module type, built into a
//!   [`ModuleClass`] on demand
//! - [`Module`]: a live instance bound to one element
//! - [`ModuleRegistry`]: defines types, scans the document for them, caches
//!   instances and delegates activation of deferred types
//!
//! An element opts into a module type with a `data-<type>` attribute; further
//! `data-<type>-<key>` attributes become instance options.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mosaic_di::LibraryRegistry;
//! use mosaic_dom::Document;
//! use mosaic_modules::{DeferredEvent, Methods, ModuleRegistry};
//! use mosaic_signals::{EventHub, register_hub};
//!
//! let document = Document::new();
//! document
//!     .body()
//!     .set_html(r#"<div data-dropdown data-dropdown-open="false"><button>Menu</button></div>"#);
//!
//! let libraries = LibraryRegistry::new();
//! register_hub(&libraries, &EventHub::new()).unwrap();
//! let modules = ModuleRegistry::new(Arc::new(document.clone()), libraries);
//!
//! let dropdown = modules
//!     .define(
//!         "dropdown",
//!         Some(Methods::new().method("run", |module, _| {
//!             module.set_option("open", true);
//!         })),
//!     )
//!     .unwrap();
//! dropdown.defer(DeferredEvent::new("click")).unwrap();
//!
//! modules.initialize(None).unwrap();
//! assert!(modules.instances("dropdown").is_empty());
//!
//! document.body().find("button").unwrap()[0].click();
//! let module = modules.instances("dropdown").remove(0);
//! assert_eq!(module.option("open"), Some(true.into()));
//! ```

pub mod class;
pub mod factory;
pub mod module;
pub mod property;
pub mod registry;

pub use class::{BASE_METHODS, BASE_TYPE, ModuleClass};
pub use factory::{
	BuildOptions, DEFAULT_DEPENDENCIES, DeferredCallback, DeferredEvent, Extends, FindModule,
	ModuleFactory, Parent,
};
pub use module::{INITIALIZE, Module, ModuleInit, ModuleState, RUN, TEARDOWN};
pub use property::{EVENTS, EventCallback, EventFn, EventsMap, MethodFn, Methods, Options, Property};
pub use registry::{ModuleRegistry, WeakModuleRegistry};
