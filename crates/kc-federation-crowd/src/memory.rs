//! In-memory Crowd directory.
//!
//! Implements [`CrowdClient`] over an embedded directory, for tests and for
//! running the provider without a Crowd server. Names are matched
//! case-insensitively, as Crowd does, while records keep their original case.
//!
//! Failures can be injected per call and target, and every call is
//! recorded so tests can assert on the exact directory traffic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::client::CrowdClient;
use crate::entity::{GroupRecord, UserRecord};
use crate::error::{CrowdError, CrowdResult};
use crate::restriction::{BooleanLogic, MatchMode, Restriction};

/// A directory operation, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Call {
    /// `get_user`.
    GetUser,
    /// `search_users`.
    SearchUsers,
    /// `search_user_names`.
    SearchUserNames,
    /// `get_groups_for_user`.
    GroupsForUser,
    /// `get_parent_groups_for_group`.
    ParentGroups,
    /// `get_child_groups_of_group`.
    ChildGroups,
    /// `get_users_of_group`.
    UsersOfGroup,
    /// `authenticate_user`.
    Authenticate,
    /// `test_connection`.
    TestConnection,
}

/// A failure to inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail with `UserNotFound`.
    UserNotFound,
    /// Fail with `GroupNotFound`.
    GroupNotFound,
    /// Fail with `InactiveAccount`.
    InactiveAccount,
    /// Fail with `ExpiredCredential`.
    ExpiredCredential,
    /// Fail with `ApplicationPermission`.
    PermissionDenied,
    /// Fail with `ApplicationAuthentication`.
    ApplicationAuthentication,
    /// Fail with `OperationFailed` carrying the message.
    OperationFailed(String),
}

impl Fault {
    fn to_error(&self, target: &str) -> CrowdError {
        match self {
            Self::UserNotFound => CrowdError::user_not_found(target),
            Self::GroupNotFound => CrowdError::group_not_found(target),
            Self::InactiveAccount => CrowdError::InactiveAccount(target.to_string()),
            Self::ExpiredCredential => CrowdError::ExpiredCredential(target.to_string()),
            Self::PermissionDenied => CrowdError::ApplicationPermission(target.to_string()),
            Self::ApplicationAuthentication => CrowdError::ApplicationAuthentication,
            Self::OperationFailed(message) => CrowdError::operation_failed("OPERATION_FAILED", message.clone()),
        }
    }
}

struct StoredUser {
    record: UserRecord,
    password: String,
}

/// Directory contents, keyed by lowercased name.
#[derive(Default)]
struct Directory {
    users: BTreeMap<String, StoredUser>,
    groups: BTreeMap<String, GroupRecord>,
    memberships: BTreeMap<String, Vec<String>>,
    parents: BTreeMap<String, Vec<String>>,
    children: BTreeMap<String, Vec<String>>,
}

impl Directory {
    fn user(&self, username: &str) -> CrowdResult<&StoredUser> {
        self.users
            .get(&key(username))
            .ok_or_else(|| CrowdError::user_not_found(username))
    }

    fn group(&self, group_name: &str) -> CrowdResult<&GroupRecord> {
        self.groups
            .get(&key(group_name))
            .ok_or_else(|| CrowdError::group_not_found(group_name))
    }

    fn groups_of(&self, links: &BTreeMap<String, Vec<String>>, name: &str) -> Vec<GroupRecord> {
        links
            .get(&key(name))
            .into_iter()
            .flatten()
            .filter_map(|k| self.groups.get(k).cloned())
            .collect()
    }
}

/// In-memory [`CrowdClient`].
#[derive(Default)]
pub struct InMemoryCrowdClient {
    directory: RwLock<Directory>,
    faults: Mutex<BTreeMap<(Call, Option<String>), Fault>>,
    calls: Mutex<Vec<(Call, String)>>,
}

impl InMemoryCrowdClient {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Directory Contents ===

    /// Adds or replaces a user.
    pub fn add_user(&self, record: UserRecord, password: impl Into<String>) {
        let password = password.into();
        self.directory
            .write()
            .users
            .insert(key(&record.name), StoredUser { record, password });
    }

    /// Adds or replaces a group.
    pub fn add_group(&self, record: GroupRecord) {
        self.directory.write().groups.insert(key(&record.name), record);
    }

    /// Makes a user a direct member of a group.
    ///
    /// ## Errors
    ///
    /// Returns `UserNotFound` or `GroupNotFound` if either side is missing.
    pub fn add_user_to_group(&self, username: &str, group_name: &str) -> CrowdResult<()> {
        let mut directory = self.directory.write();
        directory.user(username)?;
        directory.group(group_name)?;
        push_unique(directory.memberships.entry(key(username)).or_default(), key(group_name));
        Ok(())
    }

    /// Nests `child` directly under `parent`.
    ///
    /// ## Errors
    ///
    /// Returns `GroupNotFound` if either group is missing.
    pub fn add_group_to_group(&self, child: &str, parent: &str) -> CrowdResult<()> {
        let mut directory = self.directory.write();
        directory.group(child)?;
        directory.group(parent)?;
        push_unique(directory.parents.entry(key(child)).or_default(), key(parent));
        push_unique(directory.children.entry(key(parent)).or_default(), key(child));
        Ok(())
    }

    // === Fault Injection ===

    /// Makes every `call` on `target` fail.
    pub fn fail_on(&self, call: Call, target: &str, fault: Fault) {
        self.faults.lock().insert((call, Some(key(target))), fault);
    }

    /// Makes every `call` fail, whatever the target.
    pub fn fail_all(&self, call: Call, fault: Fault) {
        self.faults.lock().insert((call, None), fault);
    }

    /// Removes all injected faults.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    // === Call Log ===

    /// Returns all recorded calls with their targets.
    #[must_use]
    pub fn calls(&self) -> Vec<(Call, String)> {
        self.calls.lock().clone()
    }

    /// Counts recorded calls of one kind.
    #[must_use]
    pub fn call_count(&self, call: Call) -> usize {
        self.calls.lock().iter().filter(|(c, _)| *c == call).count()
    }

    /// Clears the call log.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Records a call and fails if a fault is injected for it.
    fn enter(&self, call: Call, target: &str) -> CrowdResult<()> {
        self.calls.lock().push((call, target.to_string()));

        let faults = self.faults.lock();
        let fault = faults
            .get(&(call, Some(key(target))))
            .or_else(|| faults.get(&(call, None)));
        match fault {
            Some(fault) => Err(fault.to_error(target)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CrowdClient for InMemoryCrowdClient {
    async fn get_user(&self, username: &str) -> CrowdResult<UserRecord> {
        self.enter(Call::GetUser, username)?;
        let directory = self.directory.read();
        directory.user(username).map(|u| u.record.clone())
    }

    async fn search_users(
        &self,
        restriction: &Restriction,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<UserRecord>> {
        self.enter(Call::SearchUsers, "")?;
        let directory = self.directory.read();
        Ok(directory
            .users
            .values()
            .filter(|u| matches(restriction, &u.record))
            .skip(start)
            .take(max)
            .map(|u| u.record.clone())
            .collect())
    }

    async fn search_user_names(
        &self,
        restriction: &Restriction,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<String>> {
        self.enter(Call::SearchUserNames, "")?;
        let directory = self.directory.read();
        Ok(directory
            .users
            .values()
            .filter(|u| matches(restriction, &u.record))
            .skip(start)
            .take(max)
            .map(|u| u.record.name.clone())
            .collect())
    }

    async fn get_groups_for_user(
        &self,
        username: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>> {
        self.enter(Call::GroupsForUser, username)?;
        let directory = self.directory.read();
        directory.user(username)?;
        let groups = directory.groups_of(&directory.memberships, username);
        Ok(groups.into_iter().skip(start).take(max).collect())
    }

    async fn get_parent_groups_for_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>> {
        self.enter(Call::ParentGroups, group_name)?;
        let directory = self.directory.read();
        directory.group(group_name)?;
        let groups = directory.groups_of(&directory.parents, group_name);
        Ok(groups.into_iter().skip(start).take(max).collect())
    }

    async fn get_child_groups_of_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>> {
        self.enter(Call::ChildGroups, group_name)?;
        let directory = self.directory.read();
        directory.group(group_name)?;
        let groups = directory.groups_of(&directory.children, group_name);
        Ok(groups.into_iter().skip(start).take(max).collect())
    }

    async fn get_users_of_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<UserRecord>> {
        self.enter(Call::UsersOfGroup, group_name)?;
        let directory = self.directory.read();
        let group = key(directory.group(group_name)?.name.as_str());
        Ok(directory
            .memberships
            .iter()
            .filter(|(_, groups)| groups.contains(&group))
            .filter_map(|(user, _)| directory.users.get(user))
            .skip(start)
            .take(max)
            .map(|u| u.record.clone())
            .collect())
    }

    async fn authenticate_user(&self, username: &str, password: &str) -> CrowdResult<UserRecord> {
        self.enter(Call::Authenticate, username)?;
        let directory = self.directory.read();
        let user = directory.user(username)?;
        if !user.record.active {
            return Err(CrowdError::InactiveAccount(user.record.name.clone()));
        }
        if user.password != password {
            return Err(CrowdError::InvalidUserAuthentication(user.record.name.clone()));
        }
        Ok(user.record.clone())
    }

    async fn test_connection(&self) -> CrowdResult<()> {
        self.enter(Call::TestConnection, "")
    }
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Evaluates a restriction the way Crowd does: case-insensitive, and a term
/// on a property the user lacks never matches.
fn matches(restriction: &Restriction, user: &UserRecord) -> bool {
    match restriction {
        Restriction::Term(term) => {
            let needle = term.value.to_lowercase();
            user.property(&term.property.name).into_iter().any(|value| {
                let value = value.to_lowercase();
                match term.match_mode {
                    MatchMode::ExactlyMatches => value == needle,
                    MatchMode::Contains => value.contains(&needle),
                    MatchMode::StartsWith => value.starts_with(&needle),
                }
            })
        }
        Restriction::Boolean(boolean) => match boolean.logic {
            BooleanLogic::And => boolean.restrictions.iter().all(|r| matches(r, user)),
            BooleanLogic::Or => boolean.restrictions.iter().any(|r| matches(r, user)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ALL_RESULTS;

    fn directory() -> InMemoryCrowdClient {
        let client = InMemoryCrowdClient::new();
        client.add_user(
            UserRecord::new("JDoe")
                .with_names("John", "Doe")
                .with_email("jdoe@example.com"),
            "secret",
        );
        client.add_user(UserRecord::new("asmith").with_names("Alice", "Smith"), "pw");
        client.add_group(GroupRecord::new("devs"));
        client.add_group(GroupRecord::new("staff"));
        client.add_user_to_group("jdoe", "devs").unwrap();
        client.add_group_to_group("devs", "staff").unwrap();
        client
    }

    #[tokio::test]
    async fn names_are_case_insensitive_but_preserved() {
        let client = directory();

        let user = client.get_user("jdoe").await.unwrap();
        assert_eq!(user.name, "JDoe");
    }

    #[tokio::test]
    async fn search_evaluates_restrictions() {
        let client = directory();

        let all = client
            .search_users(Restriction::match_all(), 0, ALL_RESULTS)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let smiths = client
            .search_users(
                &Restriction::any(vec![Restriction::term("lastName", MatchMode::Contains, "SMI")]),
                0,
                ALL_RESULTS,
            )
            .await
            .unwrap();
        assert_eq!(smiths.len(), 1);
        assert_eq!(smiths[0].name, "asmith");

        let nobody = client
            .search_user_names(
                &Restriction::term("email", MatchMode::Contains, "example"),
                1,
                ALL_RESULTS,
            )
            .await
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn navigates_group_links() {
        let client = directory();

        let groups = client.get_groups_for_user("jdoe", 0, ALL_RESULTS).await.unwrap();
        assert_eq!(groups, vec![GroupRecord::new("devs")]);

        let parents = client.get_parent_groups_for_group("devs", 0, 1).await.unwrap();
        assert_eq!(parents[0].name, "staff");

        let children = client.get_child_groups_of_group("staff", 0, ALL_RESULTS).await.unwrap();
        assert_eq!(children[0].name, "devs");

        let members = client.get_users_of_group("devs", 0, ALL_RESULTS).await.unwrap();
        assert_eq!(members[0].name, "JDoe");

        let err = client.get_child_groups_of_group("ghost", 0, 1).await.unwrap_err();
        assert!(err.is_group_not_found());
    }

    #[tokio::test]
    async fn authentication_outcomes() {
        let client = directory();
        client.add_user(UserRecord::new("gone").with_active(false), "pw");

        assert!(client.authenticate_user("jdoe", "secret").await.is_ok());
        assert!(matches!(
            client.authenticate_user("jdoe", "wrong").await,
            Err(CrowdError::InvalidUserAuthentication(_))
        ));
        assert!(matches!(
            client.authenticate_user("gone", "pw").await,
            Err(CrowdError::InactiveAccount(_))
        ));
        assert!(client.authenticate_user("nobody", "pw").await.unwrap_err().is_user_not_found());
    }

    #[tokio::test]
    async fn injected_faults_and_call_log() {
        let client = directory();
        client.fail_on(Call::ParentGroups, "DEVS", Fault::OperationFailed("boom".to_string()));

        let err = client.get_parent_groups_for_group("devs", 0, 1).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(client.get_parent_groups_for_group("staff", 0, 1).await.is_ok());

        client.fail_all(Call::TestConnection, Fault::ApplicationAuthentication);
        assert!(matches!(
            client.test_connection().await,
            Err(CrowdError::ApplicationAuthentication)
        ));

        assert_eq!(client.call_count(Call::ParentGroups), 2);
        assert_eq!(client.calls()[0], (Call::ParentGroups, "devs".to_string()));

        client.clear_faults();
        client.clear_calls();
        assert!(client.test_connection().await.is_ok());
        assert_eq!(client.calls().len(), 1);
    }
}
