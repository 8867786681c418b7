//! Directory administration façade.

use crate::{
    config::{DirectoryConfig, CN_ATTRIBUTE, EMPLOYEE_RDN_ATTRIBUTE},
    credential::{CredentialHasher, Sha256Hex},
    dn::{DistinguishedName, RelativeDistinguishedName},
    employee::{Employee, NewEmployee},
    group::Group,
    session::{
        DirectoryModification, LdapConnector, LdapEntry, LdapSession, RealLdapConnector,
        SearchScope,
    },
    Result,
};
use dirmgr_core::Error;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

const PERSON_OBJECT_CLASS: &str = "inetOrgPerson";
const GROUP_OBJECT_CLASS: &str = "posixGroup";
const MEMBER_ATTRIBUTE: &str = "uniqueMember";
const GID_ATTRIBUTE: &str = "gidNumber";

const USER_LIST_FILTER: &str = "(objectClass=inetOrgPerson)";
const ANY_ENTRY_FILTER: &str = "(objectClass=*)";

const USER_LIST_ATTRIBUTES: &[&str] = &["cn", "mail", "employeeNumber"];
const EMPLOYEE_ATTRIBUTES: &[&str] = &["employeeNumber", "cn", "sn", "givenName", "mail"];
const GROUP_ATTRIBUTES: &[&str] = &["cn", GID_ATTRIBUTE, MEMBER_ATTRIBUTE];

/// Administrative client for employee and group entries.
///
/// The client owns at most one session. It is inert until [`connect`](Self::connect) binds with
/// the configured admin identity; every other operation fails with [`Error::NotConnected`] until
/// then. Operations take `&mut self`, so a client carries one in-flight request at a time; share
/// it behind a mutex or create one client per task for concurrent use.
pub struct DirectoryAdminClient {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn LdapConnector>,
    hasher: Box<dyn CredentialHasher>,
    session: Option<Box<dyn LdapSession>>,
}

impl DirectoryAdminClient {
    /// Creates a client that uses the real LDAP connector. Does not contact the server.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self {
            config,
            connector,
            hasher: Box::new(Sha256Hex),
            session: None,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_connector(config: DirectoryConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            hasher: Box::new(Sha256Hex),
            session: None,
        }
    }

    /// Replaces the password hashing strategy used by [`add_employee`](Self::add_employee).
    #[must_use]
    pub fn with_hasher(mut self, hasher: impl CredentialHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Returns true while a bound session is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Binds with the configured admin identity.
    ///
    /// Re-binds on the existing session when already connected. On failure the session is
    /// released and the client is left disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the server is unreachable or rejects the credentials.
    pub async fn connect(&mut self) -> Result<()> {
        let mut session = match self.session.take() {
            Some(session) => session,
            None => report("connect", self.connector.connect().await)?,
        };

        let credentials = self.config.credentials();
        match session
            .simple_bind(credentials.bind_dn(), credentials.bind_password())
            .await
        {
            Ok(()) => {
                info!(
                    url = self.config.url(),
                    bind_dn = credentials.bind_dn(),
                    "directory connection established"
                );
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                if let Err(unbind_err) = session.unbind().await {
                    debug!("discarding session after failed bind: {unbind_err}");
                }
                report("connect", Err(err))
            }
        }
    }

    /// Unbinds and releases the session. Does nothing when not connected.
    pub async fn disconnect(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        match session.unbind().await {
            Ok(()) => info!("directory connection closed"),
            Err(err) => warn!("directory unbind failed: {err}"),
        }
    }

    /// Creates an `inetOrgPerson` entry at `employeeNumber=<id>,<user base>`.
    ///
    /// The password is stored only as the output of the configured [`CredentialHasher`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRequest`] for invalid input and [`Error::DuplicateEntry`] when an
    /// employee with the same number exists.
    pub async fn add_employee(&mut self, employee: &NewEmployee) -> Result<DistinguishedName> {
        let prepared = self.prepare_employee(employee);
        let (dn, attributes) = report("add employee", prepared)?;

        let session = active(&mut self.session)?;
        report("add employee", session.add(dn.as_str(), &attributes).await)?;

        info!(dn = %dn, scheme = self.hasher.scheme(), "employee {} added", employee.common_name());
        Ok(dn)
    }

    /// Deletes the employee entry keyed by `employee_number`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no such employee exists.
    pub async fn delete_employee(&mut self, employee_number: &str) -> Result<()> {
        let dn = report("delete employee", self.config.employee_dn(employee_number))?;

        let session = active(&mut self.session)?;
        report("delete employee", session.delete(dn.as_str()).await)?;

        info!(dn = %dn, "employee {employee_number} deleted");
        Ok(())
    }

    /// Moves `cn=<common_name>,<old_ou>` to `cn=<common_name>,<new_ou>` with one modify-DN
    /// request and returns the new DN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the source entry does not exist and
    /// [`Error::DuplicateEntry`] when the target DN is taken.
    pub async fn move_user(
        &mut self,
        common_name: &str,
        old_ou: &DistinguishedName,
        new_ou: &DistinguishedName,
    ) -> Result<DistinguishedName> {
        let old_dn = report(
            "move user",
            DistinguishedName::child_of(old_ou, CN_ATTRIBUTE, common_name).map_err(Error::from),
        )?;
        let rdn = RelativeDistinguishedName::new(CN_ATTRIBUTE, common_name);
        let new_dn = new_ou.clone().with_prefix(rdn.clone());

        let session = active(&mut self.session)?;
        report(
            "move user",
            session
                .modify_dn(old_dn.as_str(), &rdn.to_string(), new_ou.as_str())
                .await,
        )?;

        info!(from = %old_dn, to = %new_dn, "user '{common_name}' moved");
        Ok(new_dn)
    }

    /// Lists every `inetOrgPerson` under the user base with its `cn`, `mail` and
    /// `employeeNumber` attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    pub async fn show_all_users(&mut self) -> Result<Vec<LdapEntry>> {
        let session = active(&mut self.session)?;
        let entries = report(
            "show all users",
            session
                .search(
                    self.config.user_base_dn().as_str(),
                    SearchScope::Subtree,
                    USER_LIST_FILTER,
                    USER_LIST_ATTRIBUTES,
                )
                .await,
        )?;

        debug!(count = entries.len(), "listed users");
        Ok(entries)
    }

    /// Same search as [`show_all_users`](Self::show_all_users), parsed into [`Employee`] values.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails or an entry lacks an employee number.
    pub async fn list_employees(&mut self) -> Result<Vec<Employee>> {
        self.show_all_users()
            .await?
            .iter()
            .map(parse_employee_entry)
            .collect()
    }

    /// Reads a single employee entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the employee does not exist.
    pub async fn fetch_employee(&mut self, employee_number: &str) -> Result<Employee> {
        let dn = self.config.employee_dn(employee_number)?;
        let entry = self.read_entry(&dn, EMPLOYEE_ATTRIBUTES).await?;
        parse_employee_entry(&entry)
    }

    /// Creates a `posixGroup` entry at `cn=<group_name>,<group base>` with only `cn` set.
    ///
    /// The NIS schema (RFC 2307) lists `gidNumber` as mandatory for `posixGroup`; servers that
    /// enforce it reject this request with `objectClassViolation`. Use
    /// [`create_group_with_gid`](Self::create_group_with_gid) against such servers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEntry`] when the group already exists and
    /// [`Error::MalformedRequest`] when the server's schema rejects the entry.
    pub async fn create_group(&mut self, group_name: &str) -> Result<DistinguishedName> {
        self.add_group(group_name, None).await
    }

    /// Creates a `posixGroup` entry carrying the given `gidNumber`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEntry`] when the group already exists.
    pub async fn create_group_with_gid(
        &mut self,
        group_name: &str,
        gid_number: u32,
    ) -> Result<DistinguishedName> {
        self.add_group(group_name, Some(gid_number)).await
    }

    async fn add_group(
        &mut self,
        group_name: &str,
        gid_number: Option<u32>,
    ) -> Result<DistinguishedName> {
        let dn = report("create group", self.config.group_dn(group_name))?;
        let mut attributes = vec![
            ("objectClass".to_string(), vec![GROUP_OBJECT_CLASS.to_string()]),
            (CN_ATTRIBUTE.to_string(), vec![group_name.to_string()]),
        ];
        if let Some(gid) = gid_number {
            attributes.push((GID_ATTRIBUTE.to_string(), vec![gid.to_string()]));
        }

        let session = active(&mut self.session)?;
        report("create group", session.add(dn.as_str(), &attributes).await)?;

        info!(dn = %dn, "group {group_name} created");
        Ok(dn)
    }

    /// Reads a group and its members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the group does not exist.
    pub async fn fetch_group(&mut self, group_name: &str) -> Result<Group> {
        let dn = self.config.group_dn(group_name)?;
        let entry = self.read_entry(&dn, GROUP_ATTRIBUTES).await?;
        parse_group_entry(&entry)
    }

    /// Adds `user_dn` to the group's `uniqueMember` values.
    ///
    /// The referenced entry is not checked for existence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the group does not exist and [`Error::DuplicateEntry`] if
    /// `user_dn` is already a member (`attributeOrValueExists`).
    pub async fn add_user_to_group(
        &mut self,
        group_name: &str,
        user_dn: &DistinguishedName,
    ) -> Result<()> {
        let modification = DirectoryModification::Add {
            attribute: MEMBER_ATTRIBUTE.to_string(),
            values: vec![user_dn.as_str().to_string()],
        };
        self.modify_group("add user to group", group_name, modification)
            .await?;

        info!("user {user_dn} added to group {group_name}");
        Ok(())
    }

    /// Removes `user_dn` from the group's `uniqueMember` values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the group does not exist or `user_dn` is not a member.
    pub async fn remove_user_from_group(
        &mut self,
        group_name: &str,
        user_dn: &DistinguishedName,
    ) -> Result<()> {
        let modification = DirectoryModification::Delete {
            attribute: MEMBER_ATTRIBUTE.to_string(),
            values: vec![user_dn.as_str().to_string()],
        };
        self.modify_group("remove user from group", group_name, modification)
            .await?;

        info!("user {user_dn} removed from group {group_name}");
        Ok(())
    }

    fn prepare_employee(
        &self,
        employee: &NewEmployee,
    ) -> Result<(DistinguishedName, Vec<(String, Vec<String>)>)> {
        employee.validate()?;
        let dn = self.config.employee_dn(&employee.employee_number)?;

        let attributes = vec![
            ("objectClass".to_string(), vec![PERSON_OBJECT_CLASS.to_string()]),
            (
                EMPLOYEE_RDN_ATTRIBUTE.to_string(),
                vec![employee.employee_number.clone()],
            ),
            (CN_ATTRIBUTE.to_string(), vec![employee.common_name()]),
            ("sn".to_string(), vec![employee.surname.clone()]),
            ("givenName".to_string(), vec![employee.given_name.clone()]),
            ("mail".to_string(), vec![employee.mail.clone()]),
            (
                "userPassword".to_string(),
                vec![self.hasher.hash(employee.password())],
            ),
        ];

        Ok((dn, attributes))
    }

    async fn modify_group(
        &mut self,
        operation: &str,
        group_name: &str,
        modification: DirectoryModification,
    ) -> Result<()> {
        let group_dn = report(operation, self.config.group_dn(group_name))?;
        let session = active(&mut self.session)?;
        report(
            operation,
            session.modify(group_dn.as_str(), &[modification]).await,
        )
    }

    async fn read_entry(
        &mut self,
        dn: &DistinguishedName,
        attributes: &[&'static str],
    ) -> Result<LdapEntry> {
        let session = active(&mut self.session)?;
        let entries = report(
            "read entry",
            session
                .search(dn.as_str(), SearchScope::Base, ANY_ENTRY_FILTER, attributes)
                .await,
        )?;

        entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("entry `{dn}` not found")))
    }
}

fn active(session: &mut Option<Box<dyn LdapSession>>) -> Result<&mut (dyn LdapSession + 'static)> {
    match session.as_deref_mut() {
        Some(session) => Ok(session),
        None => {
            warn!("directory operation attempted without a bound session");
            Err(Error::NotConnected)
        }
    }
}

/// Logs a failed operation before handing the error back to the caller.
fn report<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        if err.should_log() {
            warn!(code = err.error_code(), "{operation} failed: {err}");
        } else {
            debug!(code = err.error_code(), "{operation} rejected: {err}");
        }
    }
    result
}

fn parse_employee_entry(entry: &LdapEntry) -> Result<Employee> {
    let dn = DistinguishedName::parse(&entry.dn)?;
    let employee_number = entry
        .first(EMPLOYEE_RDN_ATTRIBUTE)
        .or_else(|| dn.get(EMPLOYEE_RDN_ATTRIBUTE))
        .ok_or_else(|| missing_attribute(&entry.dn, EMPLOYEE_RDN_ATTRIBUTE))?
        .to_string();

    Ok(Employee {
        employee_number,
        cn: entry.first("cn").map(str::to_owned),
        sn: entry.first("sn").map(str::to_owned),
        given_name: entry.first("givenName").map(str::to_owned),
        mail: entry.first("mail").map(str::to_owned),
        dn,
    })
}

fn parse_group_entry(entry: &LdapEntry) -> Result<Group> {
    let dn = DistinguishedName::parse(&entry.dn)?;
    let name = entry
        .first(CN_ATTRIBUTE)
        .or_else(|| dn.get(CN_ATTRIBUTE))
        .ok_or_else(|| missing_attribute(&entry.dn, CN_ATTRIBUTE))?
        .to_string();

    let mut builder = Group::builder(dn.clone(), name);
    if let Some(gid) = entry.first(GID_ATTRIBUTE) {
        match gid.parse::<u32>() {
            Ok(gid) => builder = builder.gid_number(gid),
            Err(err) => warn!("ignoring gidNumber `{gid}` on {dn}: {err}"),
        }
    }

    if let Some(members) = entry.values(MEMBER_ATTRIBUTE) {
        let parsed_members = members
            .iter()
            .filter_map(|dn_str| match DistinguishedName::parse(dn_str) {
                Ok(member_dn) => Some(member_dn),
                Err(err) => {
                    warn!("Failed to parse member DN `{dn_str}`: {err}");
                    None
                }
            })
            .collect::<Vec<_>>();
        builder = builder.members(parsed_members);
    }

    Ok(builder.build())
}

fn missing_attribute(dn: &str, attribute: &str) -> Error {
    Error::MalformedRequest(format!("entry `{dn}` missing attribute `{attribute}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::SaltedSha256;
    use crate::session::{MockLdapConnector, MockLdapSession};
    use dirmgr_core::AdminCredentials;
    use std::collections::{BTreeMap, BTreeSet, HashMap};
    use std::sync::Mutex;

    const GROUP_DN: &str = "cn=OILC,ou=Groups,dc=example,dc=com";
    const MEMBER_DN: &str = "employeeNumber=12345,ou=users,ou=system";

    fn sample_config() -> DirectoryConfig {
        let credentials = AdminCredentials::new("uid=admin,ou=system", "secret");
        DirectoryConfig::new("localhost:10389", credentials).unwrap()
    }

    fn sample_employee() -> NewEmployee {
        NewEmployee::new(
            "12345",
            "John",
            "Doe",
            "john.doe@example.com",
            "Akash@1998",
        )
    }

    fn entry(dn: &str, attributes: &[(&str, &[&str])]) -> LdapEntry {
        LdapEntry {
            dn: dn.to_string(),
            attributes: attributes
                .iter()
                .map(|(name, values)| {
                    (
                        (*name).to_string(),
                        values.iter().map(|v| (*v).to_string()).collect(),
                    )
                })
                .collect::<HashMap<_, _>>(),
        }
    }

    fn bound_session() -> MockLdapSession {
        let mut session = MockLdapSession::new();
        session.expect_simple_bind().returning(|_, _| Ok(()));
        session
    }

    fn connector_for(session: MockLdapSession) -> MockLdapConnector {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move || Ok(Box::new(session)));
        connector
    }

    async fn connected_client(session: MockLdapSession) -> DirectoryAdminClient {
        let mut client =
            DirectoryAdminClient::with_connector(sample_config(), Box::new(connector_for(session)));
        client.connect().await.unwrap();
        client
    }

    #[tokio::test]
    async fn construction_does_not_contact_server() {
        let mut connector = MockLdapConnector::new();
        connector.expect_connect().never();

        let client = DirectoryAdminClient::with_connector(sample_config(), Box::new(connector));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn connect_binds_with_admin_identity() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .times(1)
            .returning(|dn, password| {
                assert_eq!(dn, "uid=admin,ou=system");
                assert_eq!(password, "secret");
                Ok(())
            });

        let client = connected_client(session).await;
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn connect_twice_rebinds_on_same_session() {
        let mut session = MockLdapSession::new();
        session.expect_simple_bind().times(2).returning(|_, _| Ok(()));

        let mut client = connected_client(session).await;
        client.connect().await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn connect_with_bad_credentials_reports_failure() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .returning(|dn, _| Err(Error::Connection(format!("invalid credentials for {dn}"))));
        session.expect_unbind().times(1).returning(|| Ok(()));
        session.expect_add().never();
        session.expect_delete().never();
        session.expect_modify().never();

        let mut client =
            DirectoryAdminClient::with_connector(sample_config(), Box::new(connector_for(session)));
        let result = client.connect().await;

        assert!(matches!(result, Err(Error::Connection(_))));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn connect_unreachable_server() {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .returning(|| Err(Error::Connection("cannot reach ldap://localhost:10389".into())));

        let mut client = DirectoryAdminClient::with_connector(sample_config(), Box::new(connector));
        assert!(matches!(client.connect().await, Err(Error::Connection(_))));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn disconnect_unbinds_once_and_is_safe_when_idle() {
        let mut session = bound_session();
        session.expect_unbind().times(1).returning(|| Ok(()));

        let mut client = connected_client(session).await;
        client.disconnect().await;
        assert!(!client.is_connected());

        // Second call has no session to release.
        client.disconnect().await;
    }

    #[tokio::test]
    async fn operations_require_connection() {
        let mut connector = MockLdapConnector::new();
        connector.expect_connect().never();
        let mut client = DirectoryAdminClient::with_connector(sample_config(), Box::new(connector));

        let ou = DistinguishedName::parse("ou=users,ou=system").unwrap();
        let member = DistinguishedName::parse(MEMBER_DN).unwrap();

        assert_eq!(
            client.add_employee(&sample_employee()).await,
            Err(Error::NotConnected)
        );
        assert_eq!(client.delete_employee("1").await, Err(Error::NotConnected));
        assert_eq!(
            client.move_user("Rakesh Kumar", &ou, &ou).await,
            Err(Error::NotConnected)
        );
        assert_eq!(client.show_all_users().await, Err(Error::NotConnected));
        assert_eq!(client.create_group("OILC").await, Err(Error::NotConnected));
        assert_eq!(
            client.add_user_to_group("OILC", &member).await,
            Err(Error::NotConnected)
        );
        assert_eq!(
            client.remove_user_from_group("OILC", &member).await,
            Err(Error::NotConnected)
        );
    }

    #[tokio::test]
    async fn add_employee_stores_hashed_password() {
        let mut session = bound_session();
        session.expect_add().times(1).returning(|dn, attributes| {
            assert_eq!(dn, MEMBER_DN);
            let attrs = attributes.iter().cloned().collect::<BTreeMap<_, _>>();
            assert_eq!(attrs["objectClass"], vec!["inetOrgPerson"]);
            assert_eq!(attrs["employeeNumber"], vec!["12345"]);
            assert_eq!(attrs["cn"], vec!["John Doe"]);
            assert_eq!(attrs["sn"], vec!["Doe"]);
            assert_eq!(attrs["givenName"], vec!["John"]);
            assert_eq!(attrs["mail"], vec!["john.doe@example.com"]);
            assert_eq!(attrs["userPassword"], vec![Sha256Hex.hash("Akash@1998")]);
            assert!(!attrs["userPassword"].contains(&"Akash@1998".to_string()));
            Ok(())
        });

        let mut client = connected_client(session).await;
        let dn = client.add_employee(&sample_employee()).await.unwrap();
        assert_eq!(dn.as_str(), MEMBER_DN);
    }

    #[tokio::test]
    async fn add_employee_with_salted_hasher() {
        let mut session = bound_session();
        session.expect_add().times(1).returning(|_, attributes| {
            let (_, values) = attributes
                .iter()
                .find(|(name, _)| name == "userPassword")
                .unwrap();
            assert!(SaltedSha256.verify("Akash@1998", &values[0]));
            Ok(())
        });

        let mut client = connected_client(session).await.with_hasher(SaltedSha256);
        client.add_employee(&sample_employee()).await.unwrap();
    }

    #[tokio::test]
    async fn add_employee_twice_reports_duplicate() {
        let stored = Arc::new(Mutex::new(BTreeSet::new()));
        let mut session = bound_session();
        let dns = stored.clone();
        session.expect_add().times(2).returning(move |dn, _| {
            if dns.lock().unwrap().insert(dn.to_string()) {
                Ok(())
            } else {
                Err(Error::from_result_code(68, dn, "Entry already exists"))
            }
        });

        let mut client = connected_client(session).await;
        client.add_employee(&sample_employee()).await.unwrap();
        let second = client.add_employee(&sample_employee()).await;

        assert!(matches!(second, Err(Error::DuplicateEntry(_))));
        assert_eq!(stored.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_employee_rejects_invalid_input_before_sending() {
        let mut session = bound_session();
        session.expect_add().never();

        let mut client = connected_client(session).await;
        let invalid = NewEmployee::new("12345", "John", "Doe", "not-an-email", "pw");
        assert!(matches!(
            client.add_employee(&invalid).await,
            Err(Error::MalformedRequest(_))
        ));
    }

    #[tokio::test]
    async fn add_employee_escapes_identifier() {
        let mut session = bound_session();
        session.expect_add().times(1).returning(|dn, _| {
            assert_eq!(dn, "employeeNumber=1\\,2,ou=users,ou=system");
            Ok(())
        });

        let mut client = connected_client(session).await;
        let employee = NewEmployee::new("1,2", "John", "Doe", "john@example.com", "pw");
        client.add_employee(&employee).await.unwrap();
    }

    #[tokio::test]
    async fn delete_employee_targets_computed_dn() {
        let mut session = bound_session();
        session.expect_delete().times(1).returning(|dn| {
            assert_eq!(dn, MEMBER_DN);
            Ok(())
        });

        let mut client = connected_client(session).await;
        client.delete_employee("12345").await.unwrap();
    }

    #[tokio::test]
    async fn delete_missing_employee_reports_not_found() {
        let mut session = bound_session();
        session
            .expect_delete()
            .returning(|dn| Err(Error::from_result_code(32, dn, "No such object")));

        let mut client = connected_client(session).await;
        assert!(matches!(
            client.delete_employee("99999").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn move_user_issues_single_modify_dn() {
        let mut session = bound_session();
        session
            .expect_modify_dn()
            .times(1)
            .returning(|dn, new_rdn, new_superior| {
                assert_eq!(dn, "cn=Rakesh Kumar,ou=users,ou=system");
                assert_eq!(new_rdn, "cn=Rakesh Kumar");
                assert_eq!(new_superior, "ou=transfers,ou=system");
                Ok(())
            });

        let mut client = connected_client(session).await;
        let old_ou = DistinguishedName::parse("ou=users,ou=system").unwrap();
        let new_ou = DistinguishedName::parse("ou=transfers,ou=system").unwrap();
        let new_dn = client
            .move_user("Rakesh Kumar", &old_ou, &new_ou)
            .await
            .unwrap();

        assert_eq!(new_dn.as_str(), "cn=Rakesh Kumar,ou=transfers,ou=system");
    }

    #[tokio::test]
    async fn show_all_users_searches_user_base() {
        let mut session = bound_session();
        session
            .expect_search()
            .times(1)
            .returning(|base, scope, filter, attributes| {
                assert_eq!(base, "ou=users,ou=system");
                assert_eq!(scope, SearchScope::Subtree);
                assert_eq!(filter, "(objectClass=inetOrgPerson)");
                assert_eq!(attributes, &["cn", "mail", "employeeNumber"]);
                Ok(vec![entry(
                    MEMBER_DN,
                    &[
                        ("cn", &["John Doe"]),
                        ("mail", &["john.doe@example.com"]),
                        ("employeeNumber", &["12345"]),
                    ],
                )])
            });

        let mut client = connected_client(session).await;
        let users = client.show_all_users().await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].dn, MEMBER_DN);
        assert_eq!(users[0].first("mail"), Some("john.doe@example.com"));
    }

    #[tokio::test]
    async fn list_employees_parses_entries() {
        let mut session = bound_session();
        session.expect_search().returning(|_, _, _, _| {
            Ok(vec![
                entry(MEMBER_DN, &[("cn", &["John Doe"]), ("employeeNumber", &["12345"])]),
                // Number recovered from the RDN when the attribute is not returned.
                entry("employeeNumber=7,ou=users,ou=system", &[("cn", &["Jane Roe"])]),
            ])
        });

        let mut client = connected_client(session).await;
        let employees = client.list_employees().await.unwrap();

        assert_eq!(employees[0].employee_number, "12345");
        assert_eq!(employees[0].display_name().as_deref(), Some("John Doe"));
        assert_eq!(employees[1].employee_number, "7");
    }

    #[tokio::test]
    async fn fetch_employee_reads_base_entry() {
        let mut session = bound_session();
        session
            .expect_search()
            .times(1)
            .returning(|base, scope, _, _| {
                assert_eq!(base, MEMBER_DN);
                assert_eq!(scope, SearchScope::Base);
                Ok(vec![entry(
                    MEMBER_DN,
                    &[
                        ("employeeNumber", &["12345"]),
                        ("givenName", &["John"]),
                        ("sn", &["Doe"]),
                    ],
                )])
            });

        let mut client = connected_client(session).await;
        let employee = client.fetch_employee("12345").await.unwrap();
        assert_eq!(employee.given_name.as_deref(), Some("John"));
        assert_eq!(employee.display_name().as_deref(), Some("John Doe"));
    }

    #[tokio::test]
    async fn create_group_adds_posix_group() {
        let mut session = bound_session();
        session.expect_add().times(1).returning(|dn, attributes| {
            assert_eq!(dn, GROUP_DN);
            let attrs = attributes.iter().cloned().collect::<BTreeMap<_, _>>();
            assert_eq!(attrs["objectClass"], vec!["posixGroup"]);
            assert_eq!(attrs["cn"], vec!["OILC"]);
            Ok(())
        });

        let mut client = connected_client(session).await;
        let dn = client.create_group("OILC").await.unwrap();
        assert_eq!(dn.as_str(), GROUP_DN);
    }

    #[tokio::test]
    async fn create_group_with_gid_sends_gid_number() {
        let mut session = bound_session();
        session.expect_add().times(1).returning(|dn, attributes| {
            assert_eq!(dn, GROUP_DN);
            let attrs = attributes.iter().cloned().collect::<BTreeMap<_, _>>();
            assert_eq!(attrs["objectClass"], vec!["posixGroup"]);
            assert_eq!(attrs["gidNumber"], vec!["5000"]);
            Ok(())
        });

        let mut client = connected_client(session).await;
        let dn = client.create_group_with_gid("OILC", 5000).await.unwrap();
        assert_eq!(dn.as_str(), GROUP_DN);
    }

    #[tokio::test]
    async fn create_group_without_gid_omits_gid_number() {
        let mut session = bound_session();
        session.expect_add().times(1).returning(|_, attributes| {
            assert!(attributes.iter().all(|(name, _)| name != "gidNumber"));
            Err(Error::from_result_code(65, "cn=OILC", "missing gidNumber"))
        });

        let mut client = connected_client(session).await;
        assert!(matches!(
            client.create_group("OILC").await,
            Err(Error::MalformedRequest(_))
        ));
    }

    #[tokio::test]
    async fn add_existing_member_reports_duplicate() {
        let mut session = bound_session();
        session
            .expect_modify()
            .times(1)
            .returning(|dn, _| Err(Error::from_result_code(20, dn, "value already exists")));

        let mut client = connected_client(session).await;
        let member = DistinguishedName::parse(MEMBER_DN).unwrap();
        assert!(matches!(
            client.add_user_to_group("OILC", &member).await,
            Err(Error::DuplicateEntry(_))
        ));
    }

    #[tokio::test]
    async fn group_membership_lifecycle() {
        let members = Arc::new(Mutex::new(BTreeSet::<String>::new()));
        let mut session = bound_session();

        session.expect_add().times(1).returning(|dn, _| {
            assert_eq!(dn, GROUP_DN);
            Ok(())
        });

        let state = members.clone();
        session
            .expect_modify()
            .times(3)
            .returning(move |dn, modifications| {
                assert_eq!(dn, GROUP_DN);
                let mut set = state.lock().unwrap();
                match &modifications[0] {
                    DirectoryModification::Add { attribute, values } => {
                        assert_eq!(attribute, "uniqueMember");
                        set.extend(values.iter().cloned());
                        Ok(())
                    }
                    DirectoryModification::Delete { attribute, values } => {
                        assert_eq!(attribute, "uniqueMember");
                        if values.iter().all(|value| set.contains(value)) {
                            values.iter().for_each(|value| {
                                set.remove(value);
                            });
                            Ok(())
                        } else {
                            Err(Error::from_result_code(16, dn, "no such value"))
                        }
                    }
                    DirectoryModification::Replace { .. } => panic!("unexpected replace"),
                }
            });

        let state = members.clone();
        session.expect_search().returning(move |base, _, _, _| {
            let values = state.lock().unwrap().iter().cloned().collect::<Vec<_>>();
            let mut found = entry(base, &[("cn", &["OILC"])]);
            found.attributes.insert("uniqueMember".to_string(), values);
            Ok(vec![found])
        });

        let mut client = connected_client(session).await;
        let member = DistinguishedName::parse(MEMBER_DN).unwrap();

        client.create_group("OILC").await.unwrap();
        client.add_user_to_group("OILC", &member).await.unwrap();
        assert!(client.fetch_group("OILC").await.unwrap().has_member(&member));

        client.remove_user_from_group("OILC", &member).await.unwrap();
        assert!(!client.fetch_group("OILC").await.unwrap().has_member(&member));

        let removed_again = client.remove_user_from_group("OILC", &member).await;
        assert!(matches!(removed_again, Err(Error::NotFound(_))));
        assert_eq!(client.fetch_group("OILC").await.unwrap().member_count(), 0);
    }

    type Directory = Arc<Mutex<BTreeMap<String, LdapEntry>>>;

    /// Session whose add/delete/search operate on a shared in-memory directory.
    fn stateful_session(directory: &Directory) -> MockLdapSession {
        let mut session = bound_session();

        let entries = directory.clone();
        session.expect_add().returning(move |dn, attributes| {
            let mut entries = entries.lock().unwrap();
            if entries.contains_key(dn) {
                return Err(Error::from_result_code(68, dn, "Entry already exists"));
            }
            let stored = LdapEntry {
                dn: dn.to_string(),
                attributes: attributes.iter().cloned().collect(),
            };
            entries.insert(dn.to_string(), stored);
            Ok(())
        });

        let entries = directory.clone();
        session.expect_delete().returning(move |dn| {
            match entries.lock().unwrap().remove(dn) {
                Some(_) => Ok(()),
                None => Err(Error::from_result_code(32, dn, "No such object")),
            }
        });

        let entries = directory.clone();
        session
            .expect_search()
            .returning(move |_, _, _, requested| {
                let listed = entries
                    .lock()
                    .unwrap()
                    .values()
                    .map(|stored| LdapEntry {
                        dn: stored.dn.clone(),
                        attributes: stored
                            .attributes
                            .iter()
                            .filter(|(name, _)| {
                                requested.iter().any(|attr| attr.eq_ignore_ascii_case(name))
                            })
                            .map(|(name, values)| (name.clone(), values.clone()))
                            .collect(),
                    })
                    .collect();
                Ok(listed)
            });

        session
    }

    fn listed_dns(entries: &[LdapEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.dn.as_str()).collect()
    }

    #[tokio::test]
    async fn added_employee_is_listed_with_hashed_password() {
        let directory = Directory::default();
        let mut client = connected_client(stateful_session(&directory)).await;

        client.add_employee(&sample_employee()).await.unwrap();
        let users = client.show_all_users().await.unwrap();

        assert_eq!(listed_dns(&users), vec![MEMBER_DN]);
        assert_eq!(users[0].first("employeeNumber"), Some("12345"));
        assert_eq!(users[0].first("mail"), Some("john.doe@example.com"));
        assert!(users[0].first("userPassword").is_none());

        let stored = directory.lock().unwrap()[MEMBER_DN].clone();
        assert_eq!(stored.first("userPassword"), Some(Sha256Hex.hash("Akash@1998").as_str()));
        assert_ne!(stored.first("userPassword"), Some("Akash@1998"));
    }

    #[tokio::test]
    async fn deleted_employee_disappears_from_listing() {
        let directory = Directory::default();
        let mut client = connected_client(stateful_session(&directory)).await;

        client.add_employee(&sample_employee()).await.unwrap();
        let other = NewEmployee::new("20731", "Rakesh", "Kumar", "rakesh@example.com", "pw");
        let other_dn = client.add_employee(&other).await.unwrap();

        client.delete_employee("12345").await.unwrap();
        let users = client.show_all_users().await.unwrap();
        assert_eq!(listed_dns(&users), vec![other_dn.as_str()]);

        let missing = client.delete_employee("99999").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
        let users = client.show_all_users().await.unwrap();
        assert_eq!(listed_dns(&users), vec![other_dn.as_str()]);
    }

    #[tokio::test]
    async fn employee_with_trailing_space_reads_back() {
        let directory = Directory::default();
        let mut client = connected_client(stateful_session(&directory)).await;

        let employee = NewEmployee::new("12345 ", "John", "Doe", "john.doe@example.com", "pw");
        let dn = client.add_employee(&employee).await.unwrap();
        assert_eq!(dn.as_str(), "employeeNumber=12345\\ ,ou=users,ou=system");

        let employees = client.list_employees().await.unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].dn, dn);
        assert_eq!(employees[0].employee_number, "12345 ");
    }

    #[tokio::test]
    async fn fetch_missing_group() {
        let mut session = bound_session();
        session
            .expect_search()
            .returning(|base, _, _, _| Err(Error::from_result_code(32, base, "")));

        let mut client = connected_client(session).await;
        assert!(matches!(
            client.fetch_group("nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn parse_group_entry_skips_bad_members() {
        let group = parse_group_entry(&entry(
            GROUP_DN,
            &[
                ("cn", &["OILC"]),
                ("gidNumber", &["5000"]),
                ("uniqueMember", &[MEMBER_DN, "not a dn"]),
            ],
        ))
        .unwrap();

        assert_eq!(group.name, "OILC");
        assert_eq!(group.gid_number, Some(5000));
        assert_eq!(group.member_count(), 1);
    }

    #[test]
    fn parse_employee_entry_requires_number() {
        let result = parse_employee_entry(&entry("cn=Jane Roe,ou=users,ou=system", &[]));
        assert!(matches!(result, Err(Error::MalformedRequest(_))));
    }
}
