//! Employee (person) entries.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::dn::DistinguishedName;

/// Input for creating an `inetOrgPerson` employee entry.
///
/// The common name is always derived as `"<given name> <surname>"`. An empty password is
/// reported under the struct-level `__all__` key.
#[derive(Debug, Validate)]
#[validate(schema(function = "validate_password", skip_on_field_errors = false))]
pub struct NewEmployee {
    /// Unique employee identifier; keys the entry DN.
    #[validate(length(min = 1, message = "employee number cannot be empty"))]
    pub employee_number: String,
    /// Given (first) name.
    #[validate(length(min = 1, message = "given name cannot be empty"))]
    pub given_name: String,
    /// Surname (last name).
    #[validate(length(min = 1, message = "surname cannot be empty"))]
    pub surname: String,
    /// Primary mail address.
    #[validate(email(message = "mail must be a valid email address"))]
    pub mail: String,
    password: SecretString,
}

impl NewEmployee {
    /// Creates a new employee record.
    #[must_use]
    pub fn new(
        employee_number: impl Into<String>,
        given_name: impl Into<String>,
        surname: impl Into<String>,
        mail: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            employee_number: employee_number.into(),
            given_name: given_name.into(),
            surname: surname.into(),
            mail: mail.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Common name derived from the given name and surname.
    #[must_use]
    pub fn common_name(&self) -> String {
        format!("{} {}", self.given_name, self.surname)
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

fn validate_password(employee: &NewEmployee) -> Result<(), ValidationError> {
    if employee.password().is_empty() {
        return Err(ValidationError::new("empty_password")
            .with_message("password cannot be empty".into()));
    }
    Ok(())
}

/// Employee entry as read back from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Distinguished name of the entry.
    pub dn: DistinguishedName,
    /// Employee identifier.
    pub employee_number: String,
    /// Common name.
    #[serde(default)]
    pub cn: Option<String>,
    /// Surname.
    #[serde(default)]
    pub sn: Option<String>,
    /// Given name.
    #[serde(default)]
    pub given_name: Option<String>,
    /// Mail address.
    #[serde(default)]
    pub mail: Option<String>,
}

impl Employee {
    /// Returns the preferred display name (common name when available).
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(cn) = &self.cn {
            return Some(cn.clone());
        }

        match (&self.given_name, &self.sn) {
            (Some(given), Some(sn)) => Some(format!("{given} {sn}")),
            (Some(given), None) => Some(given.clone()),
            (None, Some(sn)) => Some(sn.clone()),
            _ => None,
        }
    }
}
