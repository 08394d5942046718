//! # Mosaic DI
//!
//! Named library factories and the per-module bundles built from them.
//!
//! A [`LibraryRegistry`] maps names to factories. Every module asks the
//! registry for the libraries it needs with [`LibraryRegistry::require`],
//! receiving a [`Dependencies`] bundle. Building the bundle calls each
//! factory once, so every module gets its own instances; tearing it down
//! lets each instance release whatever it registered for that module.
//!
//! ## Example
//!
//! ```
//! use mosaic_di::{LibraryInstance, LibraryRegistry};
//!
//! struct Template;
//!
//! let libraries = LibraryRegistry::new();
//! libraries
//!     .add("template", || LibraryInstance::new(Template))
//!     .unwrap();
//!
//! let bundle = libraries.require(["template"]);
//! let instances = bundle.build().unwrap();
//! assert!(instances.get_as::<Template>("template").is_some());
//! ```

pub mod bundle;
pub mod instance;
pub mod registry;

pub use bundle::{Dependencies, DependencyMap};
pub use instance::{LibraryInstance, LibraryInstanceBuilder};
pub use registry::{LibraryFactory, LibraryRegistry};
