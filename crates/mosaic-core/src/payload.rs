//! Event payloads.
//!
//! Hub events and module callbacks carry an ordered list of [`Arg`]s. An
//! argument is either plain data ([`serde_json::Value`]) or a shared object
//! such as a module instance, which receivers recover with [`Arg::downcast`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Argument list passed to event handlers.
pub type Args = Vec<Arg>;

/// A single event argument.
#[derive(Clone)]
pub enum Arg {
	/// Plain data.
	Value(Value),
	/// A shared, type-erased object.
	Object(Arc<dyn Any + Send + Sync>),
}

impl Arg {
	/// Wraps plain data.
	pub fn value(value: impl Into<Value>) -> Self {
		Self::Value(value.into())
	}

	/// Wraps an owned object.
	pub fn object<T: Any + Send + Sync>(object: T) -> Self {
		Self::Object(Arc::new(object))
	}

	/// Wraps an already shared object without re-allocating it.
	///
	/// Receivers downcasting this argument get back the same `Arc`.
	pub fn shared<T: Any + Send + Sync>(object: Arc<T>) -> Self {
		Self::Object(object)
	}

	/// Returns the plain data, if this argument carries any.
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Self::Value(value) => Some(value),
			Self::Object(_) => None,
		}
	}

	/// Returns the string content of a `Value::String` argument.
	pub fn as_str(&self) -> Option<&str> {
		self.as_value().and_then(Value::as_str)
	}

	/// Recovers a shared object of type `T`.
	pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		match self {
			Self::Object(object) => Arc::clone(object).downcast::<T>().ok(),
			Self::Value(_) => None,
		}
	}

	/// Borrows a shared object of type `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		match self {
			Self::Object(object) => object.downcast_ref::<T>(),
			Self::Value(_) => None,
		}
	}
}

impl fmt::Debug for Arg {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Object(object) => write!(f, "Object({:p})", Arc::as_ptr(object)),
		}
	}
}

/// Values compare by content, objects by identity.
impl PartialEq for Arg {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Value(a), Self::Value(b)) => a == b,
			(Self::Object(a), Self::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
			_ => false,
		}
	}
}

impl From<Value> for Arg {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

impl From<&str> for Arg {
	fn from(value: &str) -> Self {
		Self::Value(Value::String(value.to_string()))
	}
}

impl From<String> for Arg {
	fn from(value: String) -> Self {
		Self::Value(Value::String(value))
	}
}

impl From<bool> for Arg {
	fn from(value: bool) -> Self {
		Self::Value(Value::Bool(value))
	}
}

impl From<i64> for Arg {
	fn from(value: i64) -> Self {
		Self::Value(Value::from(value))
	}
}
