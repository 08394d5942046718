//! # Mosaic
//!
//! A component runtime for server-rendered pages.
//!
//! Markup opts into behaviour with `data-*` attributes; mosaic finds those
//! elements, builds a module for each, and gives every module a private
//! mediator onto a shared, pausable event hub. The pieces live in their own
//! crates and are re-exported here:
//!
//! - [`mosaic_di`]: named library factories and per-module dependency bundles
//! - [`mosaic_signals`]: the event hub and module mediators
//! - [`mosaic_modules`]: module factories, instances and the registry
//! - [`mosaic_dom`]: the document seam and an in-memory document
//!
//! [`App`] wires them together.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mosaic::{App, DeferredEvent, Document, Methods, ModuleMediator};
//!
//! let document = Document::new();
//! document.body().set_html(concat!(
//!     r#"<div data-counter data-counter-start="3"><button>+1</button></div>"#,
//!     r#"<div data-dialog><a href="/help">Help</a></div>"#,
//! ));
//!
//! let app = App::new(Arc::new(document.clone())).unwrap();
//! app.define("counter", None).unwrap();
//! let dialog = app.define("dialog", None).unwrap();
//! dialog.defer(DeferredEvent::new("click").with_selector("a")).unwrap();
//!
//! app.initialize().unwrap();
//!
//! let counter = app.modules().instances("counter").remove(0);
//! assert_eq!(counter.option("start"), Some(3.into()));
//! assert!(counter.dependency::<ModuleMediator>("hub").is_some());
//!
//! // Deferred until first use.
//! assert!(app.modules().instances("dialog").is_empty());
//! let event = document.body().find("a").unwrap()[0].click();
//! assert!(event.default_prevented());
//! assert_eq!(app.modules().instances("dialog").len(), 1);
//! ```

pub mod app;
pub mod settings;

pub use app::App;
pub use settings::{HubSettings, ModuleSettings, Settings, SettingsError};

pub use mosaic_core::{Arg, Args, Error, Publish, Result, Teardown};
pub use mosaic_di::{Dependencies, DependencyMap, LibraryFactory, LibraryInstance, LibraryRegistry};
pub use mosaic_dom::{Document, Dom, DomEvent, Element, Selector};
pub use mosaic_modules::{
	DeferredEvent, EventsMap, Extends, Methods, Module, ModuleClass, ModuleFactory, ModuleInit,
	ModuleRegistry, ModuleState, Options, Property,
};
pub use mosaic_signals::{EventHub, Handler, ModuleMediator, register_hub};

pub use mosaic_core;
pub use mosaic_di;
pub use mosaic_dom;
pub use mosaic_modules;
pub use mosaic_signals;
