//! Group entry representation.

use serde::{Deserialize, Serialize};

use crate::dn::DistinguishedName;

/// Representation of a group entry and its `uniqueMember` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Distinguished name of the group.
    pub dn: DistinguishedName,
    /// Group name (the `cn` attribute).
    pub name: String,
    /// POSIX group id, when the server assigned one.
    #[serde(default)]
    pub gid_number: Option<u32>,
    /// Member distinguished names.
    #[serde(default)]
    pub members: Vec<DistinguishedName>,
}

impl Group {
    /// Creates a new builder with the required fields.
    #[must_use]
    pub fn builder(dn: DistinguishedName, name: impl Into<String>) -> GroupBuilder {
        GroupBuilder {
            dn,
            name: name.into(),
            gid_number: None,
            members: Vec::new(),
        }
    }

    /// Returns the number of members in the group.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Checks whether the given distinguished name is a member of this group.
    #[must_use]
    pub fn has_member(&self, member_dn: &DistinguishedName) -> bool {
        self.members.iter().any(|dn| dn == member_dn)
    }
}

/// Builder for [`Group`].
#[derive(Debug)]
pub struct GroupBuilder {
    dn: DistinguishedName,
    name: String,
    gid_number: Option<u32>,
    members: Vec<DistinguishedName>,
}

impl GroupBuilder {
    /// Sets the POSIX group id.
    #[must_use]
    pub fn gid_number(mut self, gid_number: u32) -> Self {
        self.gid_number = Some(gid_number);
        self
    }

    /// Appends a member distinguished name.
    #[must_use]
    pub fn add_member(mut self, dn: DistinguishedName) -> Self {
        self.members.push(dn);
        self
    }

    /// Appends multiple members.
    #[must_use]
    pub fn members<I>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = DistinguishedName>,
    {
        self.members.extend(members);
        self
    }

    /// Builds the [`Group`].
    #[must_use]
    pub fn build(self) -> Group {
        Group {
            dn: self.dn,
            name: self.name,
            gid_number: self.gid_number,
            members: self.members,
        }
    }
}
