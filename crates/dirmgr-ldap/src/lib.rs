//! LDAP administration client for employee and group entries.
//!
//! This crate provides a façade over an LDAP directory that binds with administrative
//! credentials and exposes employee and group lifecycle operations as typed methods.

#![deny(missing_docs)]

mod client;
mod config;
mod credential;
mod dn;
mod employee;
mod group;
mod session;

pub use client::DirectoryAdminClient;
pub use config::{
    DirectoryConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_GROUP_BASE_DN,
    DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_USER_BASE_DN,
};
pub use credential::{CredentialHasher, SaltedSha256, Sha256Hex};
pub use dn::{DistinguishedName, DistinguishedNameError, RelativeDistinguishedName};
pub use employee::{Employee, NewEmployee};
pub use group::Group;
pub use session::{DirectoryModification, LdapEntry, SearchScope};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = dirmgr_core::Result<T>;
