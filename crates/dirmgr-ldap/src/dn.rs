//! Distinguished Name parsing and construction.
//!
//! Entry DNs are derived from user-supplied values (employee numbers, common names, group names),
//! so every value is escaped per RFC 4514 before it becomes part of a DN string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use dirmgr_core::Error as CoreError;

/// Errors that can occur when parsing or manipulating distinguished names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the attribute name to the left of the `=`.
    #[error("distinguished name component missing attribute: {0}")]
    MissingAttribute(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
    /// An RDN value supplied for construction was empty.
    #[error("empty value for RDN attribute {0}")]
    EmptyValue(String),
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::MalformedRequest(err.to_string())
    }
}

/// Relative distinguished name (single attribute/value pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeDistinguishedName {
    attribute: String,
    value: String,
}

impl RelativeDistinguishedName {
    /// Create a new relative distinguished name from an unescaped value.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute portion of the RDN (e.g. `cn`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Unescaped attribute value portion of the RDN.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this RDN matches the provided attribute name (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }
}

impl fmt::Display for RelativeDistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape_value(&self.value))
    }
}

/// Strongly-typed distinguished name wrapper.
///
/// Keeps a canonical (escaped) string alongside the parsed RDN sequence. Two DNs compare equal
/// when their canonical forms match, so `ou=users, ou=system` and `ou=users,ou=system` are the
/// same DN. Serializes as the canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<Vec<RelativeDistinguishedName>>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the distinguished name is empty or contains invalid
    /// syntax.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DistinguishedNameError> {
        let raw = trim_unescaped(input.as_ref());
        if raw.is_empty() {
            return Err(DistinguishedNameError::Empty);
        }

        let mut rdns = Vec::new();
        for component in split_escaped(raw, ',')? {
            let mut rdn_components = Vec::new();
            for part in split_escaped(&component, '+')? {
                let (attribute, value) = split_attribute_value(&part)?;
                rdn_components.push(RelativeDistinguishedName::new(attribute, value));
            }
            rdns.push(rdn_components);
        }

        Ok(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Builds `<attribute>=<value>,<parent>`, escaping `value`.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError::EmptyValue`] when `value` is empty or only whitespace.
    pub fn child_of(
        parent: &DistinguishedName,
        attribute: &str,
        value: &str,
    ) -> std::result::Result<Self, DistinguishedNameError> {
        if value.trim().is_empty() {
            return Err(DistinguishedNameError::EmptyValue(attribute.to_string()));
        }

        Ok(parent
            .clone()
            .with_prefix(RelativeDistinguishedName::new(attribute, value)))
    }

    /// Builds a DN from single-valued RDNs, leftmost first.
    pub(crate) fn from_rdns(rdns: impl IntoIterator<Item = RelativeDistinguishedName>) -> Self {
        let rdns = rdns.into_iter().map(|rdn| vec![rdn]).collect::<Vec<_>>();
        Self {
            raw: rdns_to_string(&rdns),
            rdns,
        }
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns an iterator over all relative distinguished names in order.
    #[must_use]
    pub fn components(&self) -> impl Iterator<Item = &RelativeDistinguishedName> + '_ {
        self.rdns.iter().flat_map(|rdn| rdn.iter())
    }

    /// Leftmost RDN rendered as `attr=value` (multi-valued RDNs joined with `+`).
    #[must_use]
    pub fn rdn(&self) -> String {
        self.rdns
            .first()
            .map(|rdn| render_rdn(rdn))
            .unwrap_or_default()
    }

    /// DN of the containing entry, or `None` for a single-RDN name.
    #[must_use]
    pub fn parent(&self) -> Option<DistinguishedName> {
        if self.rdns.len() < 2 {
            return None;
        }

        let rdns = self.rdns[1..].to_vec();
        Some(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Looks up the value for the first attribute that matches `attribute` (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.components()
            .find(|rdn| rdn.matches_attribute(attribute))
            .map(RelativeDistinguishedName::value)
    }

    /// Prefixes the provided RDN, producing the DN of a child entry.
    #[must_use]
    pub fn with_prefix(mut self, rdn: RelativeDistinguishedName) -> Self {
        self.rdns.insert(0, vec![rdn]);
        self.raw = rdns_to_string(&self.rdns);
        self
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DistinguishedNameError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

impl TryFrom<&str> for DistinguishedName {
    type Error = DistinguishedNameError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for DistinguishedName {
    type Error = DistinguishedNameError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Escapes an attribute value for use inside a DN string (RFC 4514 section 2.4).
#[must_use]
pub(crate) fn escape_value(value: &str) -> String {
    let count = value.chars().count();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in value.chars().enumerate() {
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (idx == 0 && (ch == ' ' || ch == '#'))
            || (idx + 1 == count && ch == ' ');

        if ch == '\0' {
            escaped.push_str("\\00");
            continue;
        }
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn split_escaped(
    input: &str,
    delimiter: char,
) -> std::result::Result<Vec<String>, DistinguishedNameError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' {
            // Keep the escape so the value splitter and unescape see it.
            current.push(ch);
            escape = true;
            continue;
        }

        if ch == delimiter {
            parts.push(trim_unescaped(&current).to_string());
            current.clear();
            continue;
        }

        current.push(ch);
    }

    if escape {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }

    parts.push(trim_unescaped(&current).to_string());
    if parts.iter().any(String::is_empty) {
        return Err(DistinguishedNameError::InvalidComponent(input.to_string()));
    }
    Ok(parts)
}

/// Trims surrounding whitespace, keeping any space that is itself escaped (`\ `).
fn trim_unescaped(input: &str) -> &str {
    let mut escape = false;
    let mut protected_end = 0;

    for (i, ch) in input.char_indices() {
        if escape {
            escape = false;
            protected_end = i + ch.len_utf8();
        } else if ch == '\\' {
            escape = true;
        }
    }

    let end = input.trim_end().len().max(protected_end);
    input[..end].trim_start()
}

fn split_attribute_value(
    component: &str,
) -> std::result::Result<(String, String), DistinguishedNameError> {
    let mut escape = false;
    let mut index = None;

    for (i, ch) in component.char_indices() {
        if escape {
            escape = false;
            continue;
        }

        if ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '=' {
            index = Some(i);
            break;
        }
    }

    let idx =
        index.ok_or_else(|| DistinguishedNameError::InvalidComponent(component.to_string()))?;
    let attribute = component[..idx].trim();
    let value_part = component[idx + 1..].trim_start();

    if attribute.is_empty() {
        return Err(DistinguishedNameError::MissingAttribute(
            component.to_string(),
        ));
    }

    if value_part.is_empty() {
        return Err(DistinguishedNameError::MissingValue(attribute.to_string()));
    }

    Ok((attribute.to_string(), unescape(value_part)?))
}

fn unescape(value: &str) -> std::result::Result<String, DistinguishedNameError> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    let mut buf = [0u8; 4];

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let next = chars
            .next()
            .ok_or(DistinguishedNameError::UnterminatedEscape)?;

        // `\XX` hex pairs encode raw UTF-8 bytes.
        match (next.to_digit(16), chars.peek().and_then(|c| c.to_digit(16))) {
            (Some(high), Some(low)) => {
                chars.next();
                let byte = u8::try_from(high * 16 + low)
                    .map_err(|_| DistinguishedNameError::InvalidComponent(value.to_string()))?;
                bytes.push(byte);
            }
            _ => bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes()),
        }
    }

    String::from_utf8(bytes).map_err(|_| DistinguishedNameError::InvalidComponent(value.to_string()))
}

fn render_rdn(rdn: &[RelativeDistinguishedName]) -> String {
    rdn.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

fn rdns_to_string(rdns: &[Vec<RelativeDistinguishedName>]) -> String {
    rdns.iter()
        .map(|rdn| render_rdn(rdn))
        .collect::<Vec<_>>()
        .join(",")
}
