//! Library registry.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use mosaic_core::{Error, Result};
use parking_lot::RwLock;
use tracing::debug;

use crate::bundle::Dependencies;
use crate::instance::LibraryInstance;

/// Produces a fresh library instance on every call.
pub type LibraryFactory = Arc<dyn Fn() -> LibraryInstance + Send + Sync>;

/// A thread-safe map from library names to factories.
///
/// Cloning the registry yields another handle to the same entries.
#[derive(Clone, Default)]
pub struct LibraryRegistry {
	registry: Arc<RwLock<IndexMap<String, LibraryFactory>>>,
}

impl LibraryRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `factory` under `name`.
	///
	/// Fails with [`Error::DuplicateName`] if the name is taken, leaving the
	/// existing factory in place.
	///
	/// # Examples
	///
	/// ```
	/// use mosaic_di::{LibraryInstance, LibraryRegistry};
	///
	/// let libraries = LibraryRegistry::new();
	/// libraries
	///     .add("dom", || LibraryInstance::new("dom"))
	///     .unwrap()
	///     .add("template", || LibraryInstance::new("template"))
	///     .unwrap();
	///
	/// assert!(libraries.add("dom", || LibraryInstance::new("other")).is_err());
	/// ```
	pub fn add<F>(&self, name: impl Into<String>, factory: F) -> Result<&Self>
	where
		F: Fn() -> LibraryInstance + Send + Sync + 'static,
	{
		let name = name.into();
		let mut registry = self.registry.write();
		if registry.contains_key(&name) {
			return Err(Error::DuplicateName(name));
		}
		debug!(library = %name, "Registered library");
		registry.insert(name, Arc::new(factory));
		Ok(self)
	}

	/// Whether `name` is registered.
	pub fn has(&self, name: &str) -> bool {
		self.registry.read().contains_key(name)
	}

	/// The factory registered under `name`.
	pub fn get(&self, name: &str) -> Result<LibraryFactory> {
		self.registry
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| Error::NotFound(name.to_string()))
	}

	/// Creates a dependency bundle for `names`.
	///
	/// Names are only resolved when the bundle is built.
	pub fn require<I, S>(&self, names: I) -> Dependencies
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Dependencies::new(self.clone(), names.into_iter().map(Into::into).collect())
	}

	/// Registered names in insertion order.
	pub fn names(&self) -> Vec<String> {
		self.registry.read().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.registry.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.registry.read().is_empty()
	}

	/// Removes every registered factory.
	pub fn reset(&self) {
		self.registry.write().clear();
	}
}

impl fmt::Debug for LibraryRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LibraryRegistry")
			.field("names", &self.names())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn libraries() -> LibraryRegistry {
		LibraryRegistry::new()
	}

	#[rstest]
	fn test_add_registers_factory(libraries: LibraryRegistry) {
		// Arrange
		let instance = LibraryInstance::new("fake dom");
		let produced = instance.clone();

		// Act
		libraries.add("dom", move || produced.clone()).unwrap();

		// Assert
		let factory = libraries.get("dom").unwrap();
		assert!(factory().ptr_eq(&instance));
	}

	#[rstest]
	fn test_add_rejects_duplicate_and_keeps_original(libraries: LibraryRegistry) {
		// Arrange
		libraries.add("dom", || LibraryInstance::new(1_u8)).unwrap();

		// Act
		let result = libraries.add("dom", || LibraryInstance::new(2_u8));

		// Assert
		assert_eq!(result.err(), Some(Error::DuplicateName("dom".into())));
		let factory = libraries.get("dom").unwrap();
		assert_eq!(factory().get::<u8>().as_deref(), Some(&1));
	}

	#[rstest]
	fn test_add_returns_itself(libraries: LibraryRegistry) {
		let returned = libraries.add("dom", || LibraryInstance::new(())).unwrap();

		assert!(std::ptr::eq(returned, &libraries));
	}

	#[rstest]
	fn test_has(libraries: LibraryRegistry) {
		assert!(!libraries.has("dom"));

		libraries.add("dom", || LibraryInstance::new(())).unwrap();

		assert!(libraries.has("dom"));
	}

	#[rstest]
	fn test_get_unregistered_is_not_found(libraries: LibraryRegistry) {
		let result = libraries.get("foo");

		assert_eq!(result.err().map(|e| e.to_string()), Some("foo was not found in the registry".into()));
	}

	#[rstest]
	fn test_require_defers_resolution(libraries: LibraryRegistry) {
		// Act
		let bundle = libraries.require(["later"]);
		libraries.add("later", || LibraryInstance::new("late")).unwrap();

		// Assert
		assert!(bundle.build().unwrap().contains("later"));
	}

	#[rstest]
	fn test_reset_clears_registry(libraries: LibraryRegistry) {
		libraries.add("a", || LibraryInstance::new(())).unwrap();
		libraries.add("b", || LibraryInstance::new(())).unwrap();

		libraries.reset();

		assert!(libraries.is_empty());
		assert!(libraries.add("a", || LibraryInstance::new(())).is_ok());
	}

	#[rstest]
	fn test_clones_share_entries(libraries: LibraryRegistry) {
		let handle = libraries.clone();

		handle.add("shared", || LibraryInstance::new(())).unwrap();

		assert_eq!(libraries.names(), vec!["shared"]);
	}
}
