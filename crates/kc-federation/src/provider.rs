//! User storage provider traits.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - IA-2: Identification and Authentication (Organizational Users)
//! - IA-5: Authenticator Management
//!
//! These traits enable integration with external identity stores while
//! maintaining security requirements for authentication.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{FederationConfig, ProviderConfigProperty};
use crate::error::{FederationError, FederationResult};
use crate::model::{UserChange, UserModel};

/// Search parameter key for the first name.
pub const SEARCH_FIRST: &str = "first";

/// Search parameter key for the last name.
pub const SEARCH_LAST: &str = "last";

/// Search parameter key for the email address.
pub const SEARCH_EMAIL: &str = "email";

/// Search parameter key for the username.
pub const SEARCH_USERNAME: &str = "username";

/// Attribute search parameters: host field name to substring.
pub type SearchParams = BTreeMap<String, String>;

// ============================================================================
// User Storage Provider
// ============================================================================

/// Trait for user storage federation providers.
///
/// This is the main trait that federation providers must implement.
///
/// ## Implementation Notes
///
/// - Providers should be thread-safe (Send + Sync)
/// - All operations are async to support network I/O
/// - Writes are rejected; the external store is the source of truth
#[allow(async_fn_in_trait)]
pub trait UserStorageProvider: Send + Sync {
    /// Returns the provider configuration.
    fn config(&self) -> &FederationConfig;

    /// Returns the provider type identifier.
    fn provider_type(&self) -> &'static str;

    /// Tests the connection to the external store.
    async fn test_connection(&self) -> FederationResult<()>;

    // === User Management ===

    /// Creates a user in the external store.
    ///
    /// Federated stores are read-only; this always fails with
    /// `FederationError::ReadOnly`.
    async fn create_user(&self, _username: &str) -> FederationResult<()> {
        Err(FederationError::read_only("create user"))
    }

    /// Updates a user in the external store.
    ///
    /// Always fails with `FederationError::ReadOnly` naming the change.
    async fn update_user(&self, _user_id: &str, change: UserChange) -> FederationResult<()> {
        Err(FederationError::read_only(change.to_string()))
    }

    /// Deletes a user from the external store.
    ///
    /// Always fails with `FederationError::ReadOnly`.
    async fn delete_user(&self, _user_id: &str) -> FederationResult<()> {
        Err(FederationError::read_only("delete user"))
    }

    /// Closes the provider, releasing any resources.
    async fn close(&self) -> FederationResult<()> {
        Ok(())
    }
}

// ============================================================================
// Lookup and Query
// ============================================================================

/// Single-user lookups.
///
/// Absence is `Ok(None)`; errors are reserved for failures of the store.
#[allow(async_fn_in_trait)]
pub trait UserLookupProvider: Send + Sync {
    /// User type handed to the host.
    type User: UserModel;

    /// Gets a user by host-side id.
    async fn get_user_by_id(&self, id: &str) -> FederationResult<Option<Self::User>>;

    /// Gets a user by username.
    async fn get_user_by_username(&self, username: &str) -> FederationResult<Option<Self::User>>;

    /// Gets a user by email.
    async fn get_user_by_email(&self, email: &str) -> FederationResult<Option<Self::User>>;
}

/// Paged queries over the user population.
#[allow(async_fn_in_trait)]
pub trait UserQueryProvider: UserLookupProvider {
    /// Counts all users.
    async fn users_count(&self) -> FederationResult<usize>;

    /// Lists users.
    async fn get_users(&self, first: usize, max: usize) -> FederationResult<Vec<Self::User>>;

    /// Searches for users whose username, email, first or last name
    /// contains `search`.
    async fn search_for_user(
        &self,
        search: &str,
        first: usize,
        max: usize,
    ) -> FederationResult<Vec<Self::User>>;

    /// Searches for users matching any of the given parameters.
    ///
    /// Valid keys are [`SEARCH_FIRST`], [`SEARCH_LAST`], [`SEARCH_EMAIL`],
    /// [`SEARCH_USERNAME`], or any attribute name. An empty map lists all users.
    async fn search_for_user_by_params(
        &self,
        params: &SearchParams,
        first: usize,
        max: usize,
    ) -> FederationResult<Vec<Self::User>>;

    /// Searches for users with an attribute containing a value.
    async fn search_for_user_by_attribute(
        &self,
        name: &str,
        value: &str,
    ) -> FederationResult<Vec<Self::User>>;

    /// Gets the direct members of a group. A missing group has no members.
    async fn get_group_members(
        &self,
        group_name: &str,
        first: usize,
        max: usize,
    ) -> FederationResult<Vec<Self::User>>;
}

// ============================================================================
// Credential Validator
// ============================================================================

/// Credential type for passwords.
pub const PASSWORD_CREDENTIAL_TYPE: &str = "password";

/// A credential presented for validation.
///
/// ## Security
///
/// The challenge response is never included in `Debug` output.
#[derive(Clone)]
pub struct CredentialInput {
    credential_type: String,
    challenge_response: String,
}

impl CredentialInput {
    /// Creates a credential input.
    #[must_use]
    pub fn new(credential_type: impl Into<String>, challenge_response: impl Into<String>) -> Self {
        Self {
            credential_type: credential_type.into(),
            challenge_response: challenge_response.into(),
        }
    }

    /// Creates a password credential input.
    #[must_use]
    pub fn password(secret: impl Into<String>) -> Self {
        Self::new(PASSWORD_CREDENTIAL_TYPE, secret)
    }

    /// Credential type.
    #[must_use]
    pub fn credential_type(&self) -> &str {
        &self.credential_type
    }

    /// Secret to verify.
    #[must_use]
    pub fn challenge_response(&self) -> &str {
        &self.challenge_response
    }
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("credential_type", &self.credential_type)
            .field("challenge_response", &"[REDACTED]")
            .finish()
    }
}

/// Trait for validating credentials against external systems.
///
/// ## NIST 800-53 Rev5: IA-5
///
/// Credential validators must:
/// - Not log or store plaintext passwords
/// - Use secure connections
/// - Report rejected credentials as `Ok(false)`, not as errors
#[allow(async_fn_in_trait)]
pub trait CredentialInputValidator: Send + Sync {
    /// Checks if the provider can validate this credential type.
    fn supports_credential_type(&self, credential_type: &str) -> bool;

    /// Checks if the user has a credential of this type in the provider.
    fn is_configured_for(&self, _user: &dyn UserModel, credential_type: &str) -> bool {
        self.supports_credential_type(credential_type)
    }

    /// Validates a credential for the given user.
    ///
    /// Returns `Ok(false)` for unsupported types and rejected credentials.
    async fn is_valid(&self, user: &dyn UserModel, input: &CredentialInput) -> FederationResult<bool>;
}

// ============================================================================
// Provider Factory
// ============================================================================

/// Creates provider instances from host configuration.
pub trait UserStorageProviderFactory: Send + Sync {
    /// Provider type created by this factory.
    type Provider: UserStorageProvider;

    /// Unique identifier of the provider type (e.g., "crowd").
    fn id(&self) -> &'static str;

    /// Help text for the admin console.
    fn help_text(&self) -> &'static str;

    /// Configuration properties the provider understands.
    fn config_properties(&self) -> &'static [ProviderConfigProperty];

    /// Validates a configuration before it is saved.
    ///
    /// ## Errors
    ///
    /// Returns `FederationError::Configuration` for missing or invalid settings.
    fn validate_configuration(&self, config: &FederationConfig) -> FederationResult<()>;

    /// Creates a provider instance.
    ///
    /// ## Errors
    ///
    /// Returns `FederationError::Configuration` if the configuration is invalid.
    fn create(&self, config: &FederationConfig) -> FederationResult<Self::Provider>;
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    struct MockProvider {
        config: FederationConfig,
    }

    impl MockProvider {
        fn new() -> Self {
            let config = FederationConfig::builder()
                .realm_id(Uuid::now_v7())
                .provider_type("mock")
                .name("Mock Provider")
                .build()
                .unwrap();
            Self { config }
        }
    }

    impl UserStorageProvider for MockProvider {
        fn config(&self) -> &FederationConfig {
            &self.config
        }

        fn provider_type(&self) -> &'static str {
            "mock"
        }

        async fn test_connection(&self) -> FederationResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn provider_rejects_writes() {
        let provider = MockProvider::new();

        let result = provider.create_user("test").await;
        match result {
            Err(FederationError::ReadOnly(op)) => assert_eq!(op, "create user"),
            other => panic!("Expected ReadOnly error, got {other:?}"),
        }

        let err = provider
            .update_user("f:p:test", UserChange::Email(Some("a@b.c".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Provider is read-only: cannot set email");

        assert!(provider.delete_user("f:p:test").await.unwrap_err().is_read_only());
        provider.close().await.unwrap();
    }

    #[test]
    fn credential_input_debug_redacts_secret() {
        let input = CredentialInput::password("hunter2");
        let debug = format!("{input:?}");

        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(input.credential_type(), PASSWORD_CREDENTIAL_TYPE);
        assert_eq!(input.challenge_response(), "hunter2");
    }
}
