//! Error types for directory administration.
//!
//! Every public directory operation returns [`Result`], so callers can branch on the failure
//! category instead of parsing diagnostic text. LDAP result codes reported by the server are
//! folded into the taxonomy by [`Error::from_result_code`].

use serde::Serialize;
use thiserror::Error;

/// `noSuchAttribute`: the value to delete is not present on the entry.
pub const RC_NO_SUCH_ATTRIBUTE: u32 = 16;
/// `attributeOrValueExists`: the value to add is already present on the entry.
pub const RC_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
/// `noSuchObject`: the target entry does not exist.
pub const RC_NO_SUCH_OBJECT: u32 = 32;
/// `invalidCredentials`: the bind identity or password was rejected.
pub const RC_INVALID_CREDENTIALS: u32 = 49;
/// `insufficientAccessRights`: the bound identity may not perform the operation.
pub const RC_INSUFFICIENT_ACCESS_RIGHTS: u32 = 50;
/// `entryAlreadyExists`: an add or rename targeted an existing DN.
pub const RC_ENTRY_ALREADY_EXISTS: u32 = 68;

/// Result codes the server uses to reject syntactically bad requests.
const MALFORMED_RESULT_CODES: &[u32] = &[
    17, // undefinedAttributeType
    18, // inappropriateMatching
    19, // constraintViolation
    21, // invalidAttributeSyntax
    34, // invalidDNSyntax
    64, // namingViolation
    65, // objectClassViolation
    67, // notAllowedOnRDN
    69, // objectClassModsProhibited
    87, // filterError
];

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bind failed or the directory server could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An operation was attempted without a bound session.
    #[error("Not connected: call connect() before issuing directory operations")]
    NotConnected,

    /// The entry, or the attribute value being added, already exists.
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// The entry or attribute value does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The bound identity lacks the rights for the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Attribute, filter or DN syntax was rejected.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Any other non-success result reported by the directory server.
    #[error("Directory error (result code {code}): {message}")]
    Directory {
        /// LDAP result code
        code: u32,
        /// Diagnostic message returned by the server
        message: String,
    },

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for machine-readable output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// LDAP result code, when the server produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<u32>,
}

impl Error {
    /// Maps a non-success LDAP result code onto the error taxonomy.
    ///
    /// `context` names the operation target and is combined with the server diagnostic.
    #[must_use]
    pub fn from_result_code(code: u32, context: &str, diagnostic: &str) -> Self {
        let message = if diagnostic.is_empty() {
            context.to_string()
        } else {
            format!("{context}: {diagnostic}")
        };

        match code {
            RC_ENTRY_ALREADY_EXISTS | RC_ATTRIBUTE_OR_VALUE_EXISTS => {
                Self::DuplicateEntry(message)
            }
            RC_NO_SUCH_OBJECT | RC_NO_SUCH_ATTRIBUTE => Self::NotFound(message),
            RC_INSUFFICIENT_ACCESS_RIGHTS | RC_INVALID_CREDENTIALS => {
                Self::PermissionDenied(message)
            }
            code if MALFORMED_RESULT_CODES.contains(&code) => Self::MalformedRequest(message),
            code => Self::Directory { code, message },
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::MalformedRequest(_) => "MALFORMED_REQUEST",
            Self::Directory { .. } => "DIRECTORY_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Converts the error into an [`ErrorResponse`].
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        let result_code = match &self {
            Self::Directory { code, .. } => Some(*code),
            _ => None,
        };

        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            result_code,
        }
    }

    /// Returns true for failures caused by the environment rather than the request.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConfigError(_) | Self::Timeout(_) | Self::Directory { .. }
        )
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory server address: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::MalformedRequest(err.to_string())
    }
}
