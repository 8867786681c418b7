//! LDAP session abstraction and its `ldap3` implementation.

use crate::{config::DirectoryConfig, Result};
use async_trait::async_trait;
use dirmgr_core::error::{Error, RC_INVALID_CREDENTIALS};
use ldap3::{LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use native_tls::{Certificate, TlsConnector};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// A directory entry returned by a search: DN plus attribute map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserve server order).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Returns the first value of the attribute if present.
    ///
    /// Attribute names are matched case-insensitively, as the server may return them in a
    /// different case than requested.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values.as_slice())
    }
}

/// LDAP modification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryModification {
    /// Add attribute values.
    Add {
        /// Attribute to modify.
        attribute: String,
        /// Values to add.
        values: Vec<String>,
    },
    /// Delete attribute values.
    Delete {
        /// Attribute to modify.
        attribute: String,
        /// Values to delete (empty removes attribute).
        values: Vec<String>,
    },
    /// Replace attribute values.
    Replace {
        /// Attribute to modify.
        attribute: String,
        /// Replacement values.
        values: Vec<String>,
    },
}

impl From<&DirectoryModification> for Mod<String> {
    fn from(modification: &DirectoryModification) -> Self {
        match modification {
            DirectoryModification::Add { attribute, values } => {
                Mod::Add(attribute.clone(), values.iter().cloned().collect())
            }
            DirectoryModification::Delete { attribute, values } => {
                Mod::Delete(attribute.clone(), values.iter().cloned().collect())
            }
            DirectoryModification::Replace { attribute, values } => {
                Mod::Replace(attribute.clone(), values.iter().cloned().collect())
            }
        }
    }
}

/// One bound (or bindable) connection to the directory server.
///
/// Each method is a single request/response exchange.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn add(&mut self, dn: &str, attributes: &[(String, Vec<String>)]) -> Result<()>;
    async fn delete(&mut self, dn: &str) -> Result<()>;
    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()>;
    async fn modify_dn(&mut self, dn: &str, new_rdn: &str, new_superior: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>>;
    async fn unbind(&mut self) -> Result<()>;
}

/// Opens transport connections; binding is left to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Real LDAP connector backed by `ldap3`.
pub(crate) struct RealLdapConnector {
    config: Arc<DirectoryConfig>,
}

impl RealLdapConnector {
    pub(crate) fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let settings = build_ldap_settings(&self.config)?;
        debug!(url = self.config.url(), "opening directory connection");

        let (conn, ldap) = LdapConnAsync::with_settings(settings, self.config.url())
            .await
            .map_err(|err| {
                Error::Connection(format!("cannot reach {}: {err}", self.config.url()))
            })?;
        ldap3::drive!(conn);

        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.config.operation_timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

async fn with_timeout<F, T>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = ldap3::result::Result<T>>,
{
    timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(format!("directory {operation} timed out")))?
        .map_err(|err| map_ldap_error(operation, &err))
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = with_timeout(
            self.operation_timeout,
            "bind",
            self.inner.simple_bind(dn, password),
        )
        .await?;

        // Every bind failure is a connection-level failure for the caller.
        ensure_success(&result, dn).map_err(|err| match result.rc {
            RC_INVALID_CREDENTIALS => Error::Connection(format!("invalid credentials for {dn}")),
            _ => Error::Connection(err.to_string()),
        })
    }

    async fn add(&mut self, dn: &str, attributes: &[(String, Vec<String>)]) -> Result<()> {
        let attrs = attributes
            .iter()
            .map(|(name, values)| {
                (
                    name.clone(),
                    values.iter().cloned().collect::<HashSet<String>>(),
                )
            })
            .collect::<Vec<_>>();

        let result =
            with_timeout(self.operation_timeout, "add", self.inner.add(dn, attrs)).await?;
        ensure_success(&result, dn)
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        let result =
            with_timeout(self.operation_timeout, "delete", self.inner.delete(dn)).await?;
        ensure_success(&result, dn)
    }

    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()> {
        let mods = modifications.iter().map(Mod::from).collect::<Vec<_>>();

        let result =
            with_timeout(self.operation_timeout, "modify", self.inner.modify(dn, mods)).await?;
        ensure_success(&result, dn)
    }

    async fn modify_dn(&mut self, dn: &str, new_rdn: &str, new_superior: &str) -> Result<()> {
        let result = with_timeout(
            self.operation_timeout,
            "modify-dn",
            self.inner.modifydn(dn, new_rdn, true, Some(new_superior)),
        )
        .await?;
        ensure_success(&result, dn)
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        let ldap3::SearchResult(entries, result) = with_timeout(
            self.operation_timeout,
            "search",
            self.inner
                .search(base_dn, scope.into(), filter, attributes.to_vec()),
        )
        .await?;
        ensure_success(&result, base_dn)?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| LdapEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        with_timeout(self.operation_timeout, "unbind", self.inner.unbind()).await
    }
}

fn build_ldap_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new()
        .set_conn_timeout(config.connection_timeout())
        .set_starttls(config.starttls());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::ConfigError(format!("failed to load CA certificate: {err}")))?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

/// Transport-level `ldap3` failures; server result codes are handled by [`ensure_success`].
fn map_ldap_error(operation: &str, err: &ldap3::LdapError) -> Error {
    match err {
        ldap3::LdapError::LdapResult { result } => {
            Error::from_result_code(result.rc, operation, &result.text)
        }
        ldap3::LdapError::FilterParsing => {
            Error::MalformedRequest(format!("invalid search filter in {operation}"))
        }
        other => Error::Connection(format!("directory {operation} failed: {other}")),
    }
}

fn ensure_success(result: &ldap3::LdapResult, target: &str) -> Result<()> {
    if result.rc == 0 {
        return Ok(());
    }
    Err(Error::from_result_code(result.rc, target, &result.text))
}
