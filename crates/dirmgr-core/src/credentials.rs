//! Administrative bind credentials.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Identity the administration client binds as.
///
/// The password is held in a [`SecretString`] so it is redacted from `Debug` output and zeroed on
/// drop.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminCredentials {
    /// Bind DN of the administrative account (e.g. `uid=admin,ou=system`)
    pub bind_dn: String,

    /// Bind password
    pub bind_password: SecretString,
}

impl AdminCredentials {
    /// Create new administrative credentials.
    #[must_use]
    pub fn new(bind_dn: impl Into<String>, bind_password: impl Into<String>) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            bind_password: SecretString::from(bind_password.into()),
        }
    }

    /// Get the LDAP bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Get the LDAP bind password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.bind_password.expose_secret()
    }
}
