//! # Mosaic Core
//!
//! Building blocks shared by every mosaic crate:
//!
//! - [`Error`] / [`Result`]: the single error type raised by registries, factories and the hub
//! - [`Arg`]: a payload value carried by hub events and module callbacks
//! - [`Teardown`] / [`Publish`]: capabilities a library instance may expose
//!
//! ## Example
//!
//! ```
//! use mosaic_core::{Arg, Error};
//!
//! let arg = Arg::from("hello");
//! assert_eq!(arg.as_str(), Some("hello"));
//!
//! let err = Error::NotFound("hub".to_string());
//! assert_eq!(err.to_string(), "hub was not found in the registry");
//! ```

pub mod capability;
pub mod exception;
pub mod payload;

pub use capability::{Publish, Teardown};
pub use exception::{Error, Result};
pub use payload::{Arg, Args};
