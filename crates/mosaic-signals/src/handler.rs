//! Event handlers.

use std::fmt;
use std::sync::Arc;

use mosaic_core::Arg;

/// A cloneable event handler.
///
/// Handlers compare by identity: a clone equals the original, two handlers
/// built from identical closures do not. Unsubscribing a specific handler
/// relies on this.
#[derive(Clone)]
pub struct Handler {
	inner: Arc<dyn Fn(&[Arg]) + Send + Sync + 'static>,
}

impl Handler {
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&[Arg]) + Send + Sync + 'static,
	{
		Self { inner: Arc::new(f) }
	}

	/// Invokes the handler.
	pub fn call(&self, args: &[Arg]) {
		(self.inner)(args)
	}

	/// Whether both handles wrap the same closure.
	pub fn ptr_eq(&self, other: &Handler) -> bool {
		std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
	}
}

impl PartialEq for Handler {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Handler({:p})", Arc::as_ptr(&self.inner))
	}
}

impl<F> From<F> for Handler
where
	F: Fn(&[Arg]) + Send + Sync + 'static,
{
	fn from(f: F) -> Self {
		Self::new(f)
	}
}
