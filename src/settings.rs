//! Application settings.
//!
//! Settings are read from TOML. Every key is optional:
//!
//! ```toml
//! [hub]
//! bypass_prefix = "module:"
//! library_name = "hub"
//!
//! [modules]
//! default_dependencies = ["hub"]
//! reinitialize_on_html = true
//! ```

use std::path::Path;

use mosaic_modules::DEFAULT_DEPENDENCIES;
use mosaic_signals::{DEFAULT_BYPASS_PREFIX, HUB_LIBRARY};
use serde::Deserialize;
use thiserror::Error;

/// Failure to load [`Settings`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
	#[error("failed to read settings: {0}")]
	Io(#[from] std::io::Error),

	#[error("invalid settings: {0}")]
	Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HubSettings {
	/// Events whose names start with this prefix are never queued by a pause.
	pub bypass_prefix: String,
	/// Library name the hub mediator is registered under.
	pub library_name: String,
}

impl Default for HubSettings {
	fn default() -> Self {
		Self {
			bypass_prefix: DEFAULT_BYPASS_PREFIX.to_string(),
			library_name: HUB_LIBRARY.to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModuleSettings {
	/// Libraries every newly defined module requires.
	pub default_dependencies: Vec<String>,
	/// Scan content inserted through `Module::html` for new modules.
	pub reinitialize_on_html: bool,
}

impl Default for ModuleSettings {
	fn default() -> Self {
		Self {
			default_dependencies: DEFAULT_DEPENDENCIES.iter().map(ToString::to_string).collect(),
			reinitialize_on_html: true,
		}
	}
}

/// Runtime settings.
///
/// # Examples
///
/// ```
/// use mosaic::Settings;
///
/// let settings = Settings::from_toml_str(
///     r#"
///     [hub]
///     bypass_prefix = "app:"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(settings.hub.bypass_prefix, "app:");
/// assert_eq!(settings.hub.library_name, "hub");
/// assert!(settings.modules.reinitialize_on_html);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub hub: HubSettings,
	pub modules: ModuleSettings,
}

impl Settings {
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(source)?)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let source = std::fs::read_to_string(path)?;
		Self::from_toml_str(&source)
	}
}
