//! # dirmgr-core
//!
//! Shared building blocks for the dirmgr directory administration tools.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy for directory operations and LDAP result code mapping
//! - [`credentials`] - Administrative bind credentials

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod credentials;
pub mod error;

pub use credentials::AdminCredentials;
pub use error::{Error, Result};
