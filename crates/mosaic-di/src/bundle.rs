//! Dependency bundles.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use mosaic_core::{Publish, Result};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::instance::LibraryInstance;
use crate::registry::LibraryRegistry;

/// Instances built for one module, keyed by library name in request order.
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
	instances: IndexMap<String, LibraryInstance>,
}

impl DependencyMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces an instance.
	pub fn insert(&mut self, name: impl Into<String>, instance: LibraryInstance) {
		self.instances.insert(name.into(), instance);
	}

	pub fn get(&self, name: &str) -> Option<&LibraryInstance> {
		self.instances.get(name)
	}

	/// The instance under `name`, if it has type `T`.
	pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
		self.get(name)?.get::<T>()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.instances.contains_key(name)
	}

	/// The first instance exposing a publish capability.
	pub fn publisher(&self) -> Option<Arc<dyn Publish>> {
		self.instances
			.values()
			.find_map(|instance| instance.as_publisher().cloned())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &LibraryInstance)> {
		self.instances.iter().map(|(name, instance)| (name.as_str(), instance))
	}

	pub fn len(&self) -> usize {
		self.instances.len()
	}

	pub fn is_empty(&self) -> bool {
		self.instances.is_empty()
	}
}

/// The libraries one module requires, and the instances built for it.
#[derive(Debug)]
pub struct Dependencies {
	library: LibraryRegistry,
	dependencies: Vec<String>,
	instances: RwLock<DependencyMap>,
}

impl Dependencies {
	/// Creates a bundle for `dependencies`, resolved against `library` on build.
	pub fn new(library: LibraryRegistry, dependencies: Vec<String>) -> Self {
		Self {
			library,
			dependencies,
			instances: RwLock::new(DependencyMap::new()),
		}
	}

	/// Names this bundle requires, in order.
	pub fn names(&self) -> &[String] {
		&self.dependencies
	}

	/// Calls every required factory and returns the fresh instances.
	///
	/// Fails with [`Error::NotFound`](mosaic_core::Error::NotFound) on the
	/// first unregistered name, in which case the previously built instances
	/// are kept. Building again replaces them.
	///
	/// # Examples
	///
	/// ```
	/// use mosaic_di::{LibraryInstance, LibraryRegistry};
	///
	/// let libraries = LibraryRegistry::new();
	/// libraries.add("dom", || LibraryInstance::new("dom")).unwrap();
	///
	/// assert!(libraries.require(["dom"]).build().is_ok());
	/// assert!(libraries.require(["dom", "missing"]).build().is_err());
	/// ```
	pub fn build(&self) -> Result<DependencyMap> {
		let mut built = DependencyMap::new();
		for name in &self.dependencies {
			let factory = self.library.get(name)?;
			trace!(library = %name, "Building library instance");
			built.insert(name.clone(), factory());
		}
		*self.instances.write() = built.clone();
		Ok(built)
	}

	/// The instances from the last successful build.
	pub fn instances(&self) -> DependencyMap {
		self.instances.read().clone()
	}

	/// Tears down every built instance exposing a teardown capability.
	pub fn teardown(&self) {
		let instances = self.instances();
		for (name, instance) in instances.iter() {
			if let Some(teardown) = instance.as_teardown() {
				debug!(library = %name, "Tearing down library instance");
				teardown.teardown();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mosaic_core::{Args, Error, Teardown};
	use parking_lot::Mutex;
	use rstest::{fixture, rstest};

	#[derive(Default)]
	struct FakeDom {
		teardowns: Mutex<usize>,
	}

	impl Teardown for FakeDom {
		fn teardown(&self) {
			*self.teardowns.lock() += 1;
		}
	}

	struct FakeHub;

	impl Publish for FakeHub {
		fn publish(&self, _name: &str, _args: Args) {}
	}

	struct Context {
		libraries: LibraryRegistry,
		dom: Arc<FakeDom>,
	}

	#[fixture]
	fn context() -> Context {
		let libraries = LibraryRegistry::new();
		let dom = Arc::new(FakeDom::default());
		let shared = Arc::clone(&dom);
		libraries
			.add("dom", move || {
				LibraryInstance::builder_from_arc(Arc::clone(&shared))
					.teardown()
					.build()
			})
			.unwrap();
		Context { libraries, dom }
	}

	#[rstest]
	fn test_build_returns_each_dependency(context: Context) {
		// Arrange
		let dependencies = context.libraries.require(["dom"]);

		// Act
		let built = dependencies.build().unwrap();

		// Assert
		let dom = built.get_as::<FakeDom>("dom").unwrap();
		assert!(Arc::ptr_eq(&dom, &context.dom));
	}

	#[rstest]
	fn test_build_calls_factory_each_time(context: Context) {
		// Arrange
		let calls = Arc::new(Mutex::new(0));
		let counter = Arc::clone(&calls);
		context
			.libraries
			.add("template", move || {
				*counter.lock() += 1;
				LibraryInstance::new("template")
			})
			.unwrap();
		let dependencies = context.libraries.require(["template", "dom"]);

		// Act
		dependencies.build().unwrap();
		let built = dependencies.build().unwrap();

		// Assert
		assert_eq!(*calls.lock(), 2);
		let names: Vec<&str> = built.iter().map(|(name, _)| name).collect();
		assert_eq!(names, vec!["template", "dom"]);
	}

	#[rstest]
	fn test_build_fails_on_unregistered_name(context: Context) {
		// Arrange
		let dependencies = context.libraries.require(["dom", "missing"]);

		// Act
		let result = dependencies.build();

		// Assert
		assert_eq!(result.err(), Some(Error::NotFound("missing".into())));
		assert!(dependencies.instances().is_empty());
	}

	#[rstest]
	fn test_teardown_calls_each_instance(context: Context) {
		// Arrange
		let dependencies = context.libraries.require(["dom"]);
		dependencies.build().unwrap();

		// Act
		dependencies.teardown();

		// Assert
		assert_eq!(*context.dom.teardowns.lock(), 1);
	}

	#[rstest]
	fn test_teardown_skips_instances_without_capability(context: Context) {
		// Arrange
		context
			.libraries
			.add("plain", || LibraryInstance::new("no teardown here"))
			.unwrap();
		let dependencies = context.libraries.require(["plain"]);
		dependencies.build().unwrap();

		// Act
		dependencies.teardown();

		// Assert
		assert_eq!(*context.dom.teardowns.lock(), 0);
	}

	#[rstest]
	fn test_teardown_before_build_is_noop(context: Context) {
		context.libraries.require(["dom"]).teardown();

		assert_eq!(*context.dom.teardowns.lock(), 0);
	}

	#[rstest]
	fn test_publisher_finds_publish_capability(context: Context) {
		// Arrange
		context
			.libraries
			.add("hub", || LibraryInstance::builder(FakeHub).publisher().build())
			.unwrap();

		// Act
		let with_hub = context.libraries.require(["dom", "hub"]).build().unwrap();
		let without_hub = context.libraries.require(["dom"]).build().unwrap();

		// Assert
		assert!(with_hub.publisher().is_some());
		assert!(without_hub.publisher().is_none());
	}
}
