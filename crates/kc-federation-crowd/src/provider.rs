//! Crowd storage provider implementation.
//!
//! ## Security Requirements
//!
//! - The provider is read-only; every write is rejected
//! - Passwords are verified by Crowd and never logged
//! - Rejected credentials are reported as `false`, directory failures as errors

use std::fmt;
use std::sync::Arc;

use kc_federation::provider::{
    PASSWORD_CREDENTIAL_TYPE, SEARCH_EMAIL, SEARCH_FIRST, SEARCH_LAST, SEARCH_USERNAME,
};
use kc_federation::storage_id;
use kc_federation::{
    CredentialInput, CredentialInputValidator, FederationConfig, FederationResult,
    SearchParams, UserLookupProvider, UserModel, UserQueryProvider, UserStorageProvider,
};
use tracing::debug;
use uuid::Uuid;

use crate::client::{CrowdClient, ALL_RESULTS};
use crate::config::HierarchyCyclePolicy;
use crate::entity::UserRecord;
use crate::error::directory_failure;
use crate::resolver::GroupResolver;
use crate::restriction::{self, Restriction};
use crate::user::CrowdUserAdapter;

/// Provider type identifier.
pub const PROVIDER_TYPE: &str = "crowd";

/// Crowd storage provider.
///
/// Exposes Crowd users to the host, each with its group hierarchy resolved
/// at load time. Nothing is cached between calls.
pub struct CrowdStorageProvider {
    federation_config: FederationConfig,
    client: Arc<dyn CrowdClient>,
    cycle_policy: HierarchyCyclePolicy,
}

impl fmt::Debug for CrowdStorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrowdStorageProvider")
            .field("id", &self.federation_config.id)
            .field("name", &self.federation_config.name)
            .field("cycle_policy", &self.cycle_policy)
            .finish_non_exhaustive()
    }
}

impl CrowdStorageProvider {
    /// Creates a provider over `client`.
    #[must_use]
    pub fn new(
        federation_config: FederationConfig,
        client: Arc<dyn CrowdClient>,
        cycle_policy: HierarchyCyclePolicy,
    ) -> Self {
        Self {
            federation_config,
            client,
            cycle_policy,
        }
    }

    /// Returns the provider ID.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.federation_config.id
    }

    /// Returns the hierarchy cycle policy.
    #[must_use]
    pub const fn cycle_policy(&self) -> HierarchyCyclePolicy {
        self.cycle_policy
    }

    /// Wraps a record after resolving its groups.
    async fn load(&self, record: UserRecord) -> FederationResult<CrowdUserAdapter> {
        let groups = GroupResolver::new(self.client.as_ref(), self.id(), self.cycle_policy)
            .resolve_for_user(&record.name)
            .await?;
        Ok(CrowdUserAdapter::new(self.id(), record, groups))
    }

    async fn load_all(&self, records: Vec<UserRecord>) -> FederationResult<Vec<CrowdUserAdapter>> {
        let mut users = Vec::with_capacity(records.len());
        for record in records {
            users.push(self.load(record).await?);
        }
        Ok(users)
    }

    async fn search(
        &self,
        restriction: &Restriction,
        first: usize,
        max: usize,
    ) -> FederationResult<Vec<CrowdUserAdapter>> {
        let records = self
            .client
            .search_users(restriction, first, max)
            .await
            .map_err(|e| directory_failure("search users", e))?;

        debug!(
            provider = %self.federation_config.name,
            found = records.len(),
            first,
            max,
            "Crowd user search"
        );

        self.load_all(records).await
    }
}

impl UserStorageProvider for CrowdStorageProvider {
    fn config(&self) -> &FederationConfig {
        &self.federation_config
    }

    fn provider_type(&self) -> &'static str {
        PROVIDER_TYPE
    }

    async fn test_connection(&self) -> FederationResult<()> {
        self.client
            .test_connection()
            .await
            .map_err(|e| directory_failure("test connection", e))
    }

    async fn close(&self) -> FederationResult<()> {
        debug!(provider = %self.federation_config.name, "Closing Crowd provider");
        Ok(())
    }
}

impl UserLookupProvider for CrowdStorageProvider {
    type User = CrowdUserAdapter;

    async fn get_user_by_id(&self, id: &str) -> FederationResult<Option<CrowdUserAdapter>> {
        self.get_user_by_username(storage_id::external_id_of(id)).await
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> FederationResult<Option<CrowdUserAdapter>> {
        match self.client.get_user(username).await {
            Ok(record) => self.load(record).await.map(Some),
            Err(e) if e.is_user_not_found() => {
                debug!(username = %username, "User not found in Crowd");
                Ok(None)
            }
            Err(e) => Err(directory_failure("load user", e)),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> FederationResult<Option<CrowdUserAdapter>> {
        let params = SearchParams::from([(SEARCH_EMAIL.to_string(), email.to_string())]);
        let users = self.search_for_user_by_params(&params, 0, 1).await?;
        Ok(users.into_iter().next())
    }
}

impl UserQueryProvider for CrowdStorageProvider {
    async fn users_count(&self) -> FederationResult<usize> {
        let names = self
            .client
            .search_user_names(Restriction::match_all(), 0, ALL_RESULTS)
            .await
            .map_err(|e| directory_failure("count users", e))?;
        Ok(names.len())
    }

    async fn get_users(&self, first: usize, max: usize) -> FederationResult<Vec<CrowdUserAdapter>> {
        self.search_for_user_by_params(&SearchParams::new(), first, max)
            .await
    }

    async fn search_for_user(
        &self,
        search: &str,
        first: usize,
        max: usize,
    ) -> FederationResult<Vec<CrowdUserAdapter>> {
        let params: SearchParams = [SEARCH_FIRST, SEARCH_LAST, SEARCH_EMAIL, SEARCH_USERNAME]
            .into_iter()
            .map(|key| (key.to_string(), search.to_string()))
            .collect();
        self.search_for_user_by_params(&params, first, max).await
    }

    async fn search_for_user_by_params(
        &self,
        params: &SearchParams,
        first: usize,
        max: usize,
    ) -> FederationResult<Vec<CrowdUserAdapter>> {
        let restriction = restriction::build(params);
        self.search(&restriction, first, max).await
    }

    async fn search_for_user_by_attribute(
        &self,
        name: &str,
        value: &str,
    ) -> FederationResult<Vec<CrowdUserAdapter>> {
        let params = SearchParams::from([(name.to_string(), value.to_string())]);
        self.search_for_user_by_params(&params, 0, ALL_RESULTS).await
    }

    async fn get_group_members(
        &self,
        group_name: &str,
        first: usize,
        max: usize,
    ) -> FederationResult<Vec<CrowdUserAdapter>> {
        match self.client.get_users_of_group(group_name, first, max).await {
            Ok(records) => self.load_all(records).await,
            Err(e) if e.is_group_not_found() => {
                debug!(group = %group_name, "Group not found in Crowd");
                Ok(Vec::new())
            }
            Err(e) => Err(directory_failure("load group members", e)),
        }
    }
}

impl CredentialInputValidator for CrowdStorageProvider {
    fn supports_credential_type(&self, credential_type: &str) -> bool {
        credential_type == PASSWORD_CREDENTIAL_TYPE
    }

    /// Validates a password against Crowd.
    ///
    /// ## Security
    ///
    /// - The password is NEVER logged
    /// - Inactive accounts, unknown users, expired and wrong passwords
    ///   all yield `false`
    async fn is_valid(&self, user: &dyn UserModel, input: &CredentialInput) -> FederationResult<bool> {
        if !self.supports_credential_type(input.credential_type()) {
            return Ok(false);
        }

        let username = user.username();
        match self
            .client
            .authenticate_user(username, input.challenge_response())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_user_not_found() || e.is_credential_rejected() => {
                debug!(username = %username, reason = %e, "Crowd rejected credential");
                Ok(false)
            }
            Err(e) => Err(directory_failure("authenticate user", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use kc_federation::{FederationError, UserChange};

    use super::*;
    use crate::entity::GroupRecord;
    use crate::memory::{Call, Fault, InMemoryCrowdClient};

    fn provider_over(client: Arc<InMemoryCrowdClient>) -> CrowdStorageProvider {
        let config = FederationConfig::builder()
            .realm_id(Uuid::now_v7())
            .provider_type(PROVIDER_TYPE)
            .name("Crowd")
            .build()
            .unwrap();
        CrowdStorageProvider::new(config, client, HierarchyCyclePolicy::Truncate)
    }

    fn directory() -> Arc<InMemoryCrowdClient> {
        let client = InMemoryCrowdClient::new();
        client.add_user(
            UserRecord::new("jdoe")
                .with_names("John", "Doe")
                .with_email("jdoe@example.com"),
            "secret",
        );
        client.add_user(
            UserRecord::new("asmith")
                .with_names("Alice", "Smith")
                .with_email("alice@corp.example"),
            "pw",
        );
        client.add_user(UserRecord::new("bob").with_attribute("department", "Sales"), "pw");
        client.add_group(GroupRecord::new("devs"));
        client.add_group(GroupRecord::new("staff"));
        client.add_user_to_group("jdoe", "devs").unwrap();
        client.add_group_to_group("devs", "staff").unwrap();
        Arc::new(client)
    }

    #[tokio::test]
    async fn lookup_by_username_resolves_groups() {
        let provider = provider_over(directory());

        let user = provider.get_user_by_username("jdoe").await.unwrap().unwrap();
        assert_eq!(user.username(), "jdoe");

        let devs = user.groups().roots().next().unwrap();
        assert_eq!(devs.parent().unwrap().record().name, "staff");
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let provider = provider_over(directory());

        assert!(provider.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_failure_is_directory_access() {
        let client = directory();
        client.fail_all(Call::GetUser, Fault::ApplicationAuthentication);
        let provider = provider_over(client);

        let err = provider.get_user_by_username("jdoe").await.unwrap_err();
        assert!(err.is_directory_access());
    }

    #[tokio::test]
    async fn lookup_by_id_round_trips() {
        let provider = provider_over(directory());

        let by_name = provider.get_user_by_username("jdoe").await.unwrap().unwrap();
        let by_id = provider.get_user_by_id(by_name.id()).await.unwrap().unwrap();

        assert_eq!(by_id, by_name);
        assert_eq!(by_id.id(), storage_id::keycloak_id(provider.id(), "jdoe"));
    }

    #[tokio::test]
    async fn lookup_by_email_takes_first_match() {
        let client = directory();
        let provider = provider_over(Arc::clone(&client));

        let user = provider.get_user_by_email("alice@corp").await.unwrap().unwrap();
        assert_eq!(user.username(), "asmith");
        assert!(provider.get_user_by_email("nobody@").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn counts_users() {
        let client = directory();
        let provider = provider_over(Arc::clone(&client));

        assert_eq!(provider.users_count().await.unwrap(), 3);
        assert_eq!(client.call_count(Call::SearchUserNames), 1);
    }

    #[tokio::test]
    async fn searches_across_profile_fields() {
        let provider = provider_over(directory());

        let found = provider.search_for_user("smi", 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username(), "asmith");

        let found = provider.search_for_user("example", 0, 10).await.unwrap();
        assert_eq!(found.len(), 2);

        let found = provider.search_for_user("example", 1, 10).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn searches_by_attribute() {
        let provider = provider_over(directory());

        let found = provider
            .search_for_user_by_attribute("department", "sal")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username(), "bob");
    }

    #[tokio::test]
    async fn empty_search_lists_everyone_with_groups() {
        let client = directory();
        let provider = provider_over(Arc::clone(&client));

        let users = provider.get_users(0, 10).await.unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(client.call_count(Call::GroupsForUser), 3);
    }

    #[tokio::test]
    async fn search_failure_is_directory_access() {
        let client = directory();
        client.fail_all(Call::SearchUsers, Fault::OperationFailed("boom".to_string()));
        let provider = provider_over(client);

        let err = provider
            .search_for_user_by_params(&SearchParams::new(), 0, 10)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Directory access failed during search users");
    }

    #[tokio::test]
    async fn group_members() {
        let provider = provider_over(directory());

        let members = provider.get_group_members("devs", 0, ALL_RESULTS).await.unwrap();
        assert_eq!(members.len(), 1);
        assert!(!members[0].groups().is_empty());

        assert!(provider
            .get_group_members("ghost", 0, ALL_RESULTS)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn group_members_failure_is_directory_access() {
        let client = directory();
        client.fail_all(Call::UsersOfGroup, Fault::PermissionDenied);
        let provider = provider_over(client);

        let err = provider.get_group_members("devs", 0, 10).await.unwrap_err();
        assert!(err.is_directory_access());
    }

    #[tokio::test]
    async fn unsupported_credential_skips_directory() {
        let client = directory();
        let provider = provider_over(Arc::clone(&client));
        let user = provider.get_user_by_username("jdoe").await.unwrap().unwrap();
        client.clear_calls();

        let valid = provider
            .is_valid(&user, &CredentialInput::new("otp", "123456"))
            .await
            .unwrap();

        assert!(!valid);
        assert!(client.calls().is_empty());
        assert!(!provider.is_configured_for(&user, "otp"));
        assert!(provider.is_configured_for(&user, PASSWORD_CREDENTIAL_TYPE));
    }

    #[tokio::test]
    async fn validates_passwords() {
        let provider = provider_over(directory());
        let user = provider.get_user_by_username("jdoe").await.unwrap().unwrap();

        assert!(provider.is_valid(&user, &CredentialInput::password("secret")).await.unwrap());
        assert!(!provider.is_valid(&user, &CredentialInput::password("wrong")).await.unwrap());
    }

    #[tokio::test]
    async fn rejected_credentials_are_false() {
        for fault in [Fault::InactiveAccount, Fault::UserNotFound, Fault::ExpiredCredential] {
            let client = directory();
            let provider = provider_over(Arc::clone(&client));
            let user = provider.get_user_by_username("jdoe").await.unwrap().unwrap();
            client.fail_all(Call::Authenticate, fault);

            let valid = provider
                .is_valid(&user, &CredentialInput::password("secret"))
                .await
                .unwrap();
            assert!(!valid);
        }
    }

    #[tokio::test]
    async fn other_authentication_failures_propagate() {
        for fault in [
            Fault::PermissionDenied,
            Fault::ApplicationAuthentication,
            Fault::OperationFailed("boom".to_string()),
        ] {
            let client = directory();
            let provider = provider_over(Arc::clone(&client));
            let user = provider.get_user_by_username("jdoe").await.unwrap().unwrap();
            client.fail_all(Call::Authenticate, fault);

            let err = provider
                .is_valid(&user, &CredentialInput::password("secret"))
                .await
                .unwrap_err();
            assert!(err.is_directory_access());
        }
    }

    #[tokio::test]
    async fn provider_is_read_only() {
        let provider = provider_over(directory());

        assert!(provider.create_user("new").await.unwrap_err().is_read_only());
        assert!(matches!(
            provider
                .update_user("f:x:jdoe", UserChange::Enabled(false))
                .await,
            Err(FederationError::ReadOnly(_))
        ));
        assert!(provider.delete_user("f:x:jdoe").await.unwrap_err().is_read_only());
    }

    #[tokio::test]
    async fn connection_check_uses_client() {
        let client = directory();
        let provider = provider_over(Arc::clone(&client));

        provider.test_connection().await.unwrap();
        client.fail_all(Call::TestConnection, Fault::ApplicationAuthentication);
        assert!(provider.test_connection().await.unwrap_err().is_directory_access());
        provider.close().await.unwrap();
    }
}
