//! Library instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use mosaic_core::{Publish, Teardown};

/// A value produced by a library factory, plus the capabilities it exposes.
///
/// Capabilities are declared when the instance is built, so a bundle can
/// tear down or publish through an instance without knowing its type.
#[derive(Clone)]
pub struct LibraryInstance {
	value: Arc<dyn Any + Send + Sync>,
	teardown: Option<Arc<dyn Teardown>>,
	publisher: Option<Arc<dyn Publish>>,
}

impl LibraryInstance {
	/// Wraps a value that exposes no capabilities.
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self::builder(value).build()
	}

	/// Starts building an instance around `value`.
	///
	/// # Examples
	///
	/// ```
	/// use mosaic_core::Teardown;
	/// use mosaic_di::LibraryInstance;
	///
	/// struct Poller;
	///
	/// impl Teardown for Poller {
	///     fn teardown(&self) {}
	/// }
	///
	/// let instance = LibraryInstance::builder(Poller).teardown().build();
	/// assert!(instance.as_teardown().is_some());
	/// assert!(instance.as_publisher().is_none());
	/// ```
	pub fn builder<T: Any + Send + Sync>(value: T) -> LibraryInstanceBuilder<T> {
		LibraryInstanceBuilder::from_arc(Arc::new(value))
	}

	/// Starts building an instance around an already shared value.
	pub fn builder_from_arc<T: Any + Send + Sync>(value: Arc<T>) -> LibraryInstanceBuilder<T> {
		LibraryInstanceBuilder::from_arc(value)
	}

	/// The value, if it has type `T`.
	pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		Arc::clone(&self.value).downcast::<T>().ok()
	}

	/// The type-erased value.
	pub fn value(&self) -> &Arc<dyn Any + Send + Sync> {
		&self.value
	}

	/// The teardown capability, if the instance declared one.
	pub fn as_teardown(&self) -> Option<&Arc<dyn Teardown>> {
		self.teardown.as_ref()
	}

	/// The publish capability, if the instance declared one.
	pub fn as_publisher(&self) -> Option<&Arc<dyn Publish>> {
		self.publisher.as_ref()
	}

	/// Whether both handles wrap the same value.
	pub fn ptr_eq(&self, other: &LibraryInstance) -> bool {
		std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
	}
}

impl fmt::Debug for LibraryInstance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LibraryInstance")
			.field("value", &Arc::as_ptr(&self.value))
			.field("teardown", &self.teardown.is_some())
			.field("publisher", &self.publisher.is_some())
			.finish()
	}
}

/// Builder for [`LibraryInstance`].
pub struct LibraryInstanceBuilder<T> {
	value: Arc<T>,
	teardown: Option<Arc<dyn Teardown>>,
	publisher: Option<Arc<dyn Publish>>,
}

impl<T: Any + Send + Sync> LibraryInstanceBuilder<T> {
	fn from_arc(value: Arc<T>) -> Self {
		Self {
			value,
			teardown: None,
			publisher: None,
		}
	}

	/// Exposes the value's [`Teardown`] implementation.
	pub fn teardown(mut self) -> Self
	where
		T: Teardown,
	{
		self.teardown = Some(Arc::clone(&self.value) as Arc<dyn Teardown>);
		self
	}

	/// Exposes the value's [`Publish`] implementation.
	pub fn publisher(mut self) -> Self
	where
		T: Publish,
	{
		self.publisher = Some(Arc::clone(&self.value) as Arc<dyn Publish>);
		self
	}

	pub fn build(self) -> LibraryInstance {
		LibraryInstance {
			value: self.value,
			teardown: self.teardown,
			publisher: self.publisher,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mosaic_core::Args;
	use parking_lot::Mutex;
	use rstest::rstest;

	#[derive(Default)]
	struct Recorder {
		events: Mutex<Vec<String>>,
	}

	impl Teardown for Recorder {
		fn teardown(&self) {
			self.events.lock().push("teardown".into());
		}
	}

	impl Publish for Recorder {
		fn publish(&self, name: &str, _args: Args) {
			self.events.lock().push(name.into());
		}
	}

	#[rstest]
	fn test_capabilities_share_the_value() {
		// Arrange
		let recorder = Arc::new(Recorder::default());
		let instance = LibraryInstance::builder_from_arc(Arc::clone(&recorder))
			.teardown()
			.publisher()
			.build();

		// Act
		instance.as_publisher().unwrap().publish("ping", Vec::new());
		instance.as_teardown().unwrap().teardown();

		// Assert
		assert_eq!(*recorder.events.lock(), vec!["ping", "teardown"]);
		assert!(Arc::ptr_eq(&instance.get::<Recorder>().unwrap(), &recorder));
	}

	#[rstest]
	fn test_plain_value_has_no_capabilities() {
		let instance = LibraryInstance::new(42_u32);

		assert_eq!(instance.get::<u32>().as_deref(), Some(&42));
		assert!(instance.get::<i64>().is_none());
		assert!(instance.as_teardown().is_none());
		assert!(instance.as_publisher().is_none());
	}

	#[rstest]
	fn test_clones_are_ptr_eq() {
		let instance = LibraryInstance::new("dom");

		assert!(instance.ptr_eq(&instance.clone()));
		assert!(!instance.ptr_eq(&LibraryInstance::new("dom")));
	}
}
