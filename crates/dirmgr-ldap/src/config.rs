//! Configuration for the directory administration client.

use crate::{
    dn::{DistinguishedName, RelativeDistinguishedName},
    Result,
};
use dirmgr_core::{AdminCredentials, Error};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;
/// Container holding employee entries.
pub const DEFAULT_USER_BASE_DN: &str = "ou=users,ou=system";
/// Container holding group entries.
pub const DEFAULT_GROUP_BASE_DN: &str = "ou=Groups,dc=example,dc=com";

/// RDN attribute keying employee entries.
pub(crate) const EMPLOYEE_RDN_ATTRIBUTE: &str = "employeeNumber";
/// RDN attribute keying group entries and moved users.
pub(crate) const CN_ATTRIBUTE: &str = "cn";

const USER_BASE_RDNS: &[(&str, &str)] = &[("ou", "users"), ("ou", "system")];
const GROUP_BASE_RDNS: &[(&str, &str)] = &[("ou", "Groups"), ("dc", "example"), ("dc", "com")];

const SUPPORTED_SCHEMES: &[&str] = &["ldap", "ldaps", "ldapi"];

/// Configuration for connecting to the directory server.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    url: String,
    credentials: AdminCredentials,
    user_base_dn: DistinguishedName,
    group_base_dn: DistinguishedName,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    starttls: bool,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
}

impl DirectoryConfig {
    /// Creates a new directory configuration.
    ///
    /// `server` may be a full `ldap://`, `ldaps://` or `ldapi://` URL or a bare `host:port`,
    /// which is treated as plain `ldap://`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the address cannot be parsed or uses an unsupported
    /// scheme.
    pub fn new(server: impl AsRef<str>, credentials: AdminCredentials) -> Result<Self> {
        let url = normalize_server_url(server.as_ref())?;

        Ok(Self {
            url,
            credentials,
            user_base_dn: default_dn(USER_BASE_RDNS),
            group_base_dn: default_dn(GROUP_BASE_RDNS),
            tls_verify: true,
            tls_ca_cert: None,
            starttls: false,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        })
    }

    /// Returns the directory server URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the admin credentials.
    #[must_use]
    pub const fn credentials(&self) -> &AdminCredentials {
        &self.credentials
    }

    /// Returns the container DN for employee entries.
    #[must_use]
    pub const fn user_base_dn(&self) -> &DistinguishedName {
        &self.user_base_dn
    }

    /// Returns the container DN for group entries.
    #[must_use]
    pub const fn group_base_dn(&self) -> &DistinguishedName {
        &self.group_base_dn
    }

    /// DN of the employee keyed by `employee_number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRequest`] for an empty identifier.
    pub fn employee_dn(&self, employee_number: &str) -> Result<DistinguishedName> {
        Ok(DistinguishedName::child_of(
            &self.user_base_dn,
            EMPLOYEE_RDN_ATTRIBUTE,
            employee_number,
        )?)
    }

    /// DN of the group named `group_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRequest`] for an empty name.
    pub fn group_dn(&self, group_name: &str) -> Result<DistinguishedName> {
        Ok(DistinguishedName::child_of(
            &self.group_base_dn,
            CN_ATTRIBUTE,
            group_name,
        )?)
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Returns whether StartTLS is negotiated on plain `ldap://` connections.
    #[must_use]
    pub const fn starttls(&self) -> bool {
        self.starttls
    }

    /// Overrides the employee container DN.
    #[must_use]
    pub fn with_user_base_dn(mut self, dn: DistinguishedName) -> Self {
        self.user_base_dn = dn;
        self
    }

    /// Overrides the group container DN.
    #[must_use]
    pub fn with_group_base_dn(mut self, dn: DistinguishedName) -> Self {
        self.group_base_dn = dn;
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Enables StartTLS.
    #[must_use]
    pub const fn with_starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}

fn normalize_server_url(server: &str) -> Result<String> {
    let server = server.trim();
    if server.is_empty() {
        return Err(Error::ConfigError(
            "directory server address cannot be empty".to_string(),
        ));
    }

    let candidate = if server.contains("://") {
        server.to_string()
    } else {
        format!("ldap://{server}")
    };

    let parsed = Url::parse(&candidate)?;
    if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(Error::ConfigError(format!(
            "unsupported directory URL scheme `{}`",
            parsed.scheme()
        )));
    }

    Ok(candidate)
}

fn default_dn(components: &[(&str, &str)]) -> DistinguishedName {
    DistinguishedName::from_rdns(
        components
            .iter()
            .map(|(attribute, value)| RelativeDistinguishedName::new(*attribute, *value)),
    )
}
