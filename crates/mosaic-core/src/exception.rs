//! Error types.
//!
//! Every fallible operation in the runtime reports one of these variants.
//! Operations that fail leave the state they were about to change untouched.

use thiserror::Error;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
	/// A library with this name is already registered.
	#[error("LibraryRegistry already contains an item with name: {0}")]
	DuplicateName(String),

	/// A module type with this name is already defined.
	#[error("module type already defined: {0}")]
	DuplicateDefinition(String),

	/// A property with this name already exists on the target.
	#[error("property already defined: {0}")]
	DuplicateProperty(String),

	/// The named library is not registered.
	#[error("{0} was not found in the registry")]
	NotFound(String),

	/// A module factory was created without a type.
	#[error("a module factory requires a non-empty type")]
	MissingType,

	/// A deferred event descriptor has no trigger.
	#[error("deferred event for module '{0}' has no \"on\" trigger")]
	MissingTrigger(String),

	/// The parent given to a factory is not a module class.
	#[error("invalid parent for module '{module_type}': {reason}")]
	InvalidParent {
		/// Module type being extended.
		module_type: String,
		/// Why the parent was rejected.
		reason: String,
	},

	/// A mediator subscription was attempted without an event name.
	#[error("a hub subscription requires an event name")]
	MissingEventName,

	/// No factory is defined for the requested module type.
	#[error("no module defined with type: {0}")]
	UnknownModule(String),

	/// A chain of parents loops back on itself.
	#[error("circular inheritance detected: {}", path.join(" -> "))]
	CircularInheritance {
		/// Module types visited, ending with the repeated one.
		path: Vec<String>,
	},

	/// A CSS selector could not be parsed.
	#[error("invalid selector '{selector}': {reason}")]
	InvalidSelector {
		/// The offending selector text.
		selector: String,
		/// Parse failure description.
		reason: String,
	},
}

impl Error {
	/// Shorthand for [`Error::InvalidParent`].
	pub fn invalid_parent(module_type: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidParent {
			module_type: module_type.into(),
			reason: reason.into(),
		}
	}

	/// Shorthand for [`Error::InvalidSelector`].
	pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidSelector {
			selector: selector.into(),
			reason: reason.into(),
		}
	}
}
