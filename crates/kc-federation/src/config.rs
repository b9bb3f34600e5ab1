//! Federation provider configuration.
//!
//! Configuration types for user federation providers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FederationError, FederationResult};

/// Base configuration for all federation providers.
///
/// This is the host's component model: generic fields plus a flat map of
/// provider-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Unique identifier for this provider configuration.
    pub id: Uuid,

    /// Realm this provider belongs to.
    pub realm_id: Uuid,

    /// Provider type (e.g., "crowd", "ldap").
    pub provider_type: String,

    /// Display name.
    pub name: String,

    /// Priority for user lookup (lower = higher priority).
    pub priority: i32,

    /// Whether the provider is enabled.
    pub enabled: bool,

    /// Provider-specific configuration.
    pub config: HashMap<String, String>,
}

impl FederationConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> FederationConfigBuilder {
        FederationConfigBuilder::new()
    }

    /// Gets a config value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Gets a config value as bool.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(|v| v.parse().ok())
    }

    /// Gets a config value as u64.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| v.parse().ok())
    }
}

/// Builder for FederationConfig.
#[derive(Debug, Default)]
pub struct FederationConfigBuilder {
    id: Option<Uuid>,
    realm_id: Option<Uuid>,
    provider_type: Option<String>,
    name: Option<String>,
    priority: i32,
    enabled: bool,
    config: HashMap<String, String>,
}

impl FederationConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Sets the ID.
    #[must_use]
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the realm ID.
    #[must_use]
    pub fn realm_id(mut self, realm_id: Uuid) -> Self {
        self.realm_id = Some(realm_id);
        self
    }

    /// Sets the provider type.
    #[must_use]
    pub fn provider_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = Some(provider_type.into());
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets whether the provider is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Adds a config value.
    #[must_use]
    pub fn config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Builds the configuration.
    ///
    /// ## Errors
    ///
    /// Returns `FederationError::Configuration` if the realm, provider type
    /// or name is missing.
    pub fn build(self) -> FederationResult<FederationConfig> {
        Ok(FederationConfig {
            id: self.id.unwrap_or_else(Uuid::now_v7),
            realm_id: self
                .realm_id
                .ok_or_else(|| FederationError::config("realm_id is required"))?,
            provider_type: self
                .provider_type
                .ok_or_else(|| FederationError::config("provider_type is required"))?,
            name: self
                .name
                .ok_or_else(|| FederationError::config("name is required"))?,
            priority: self.priority,
            enabled: self.enabled,
            config: self.config,
        })
    }
}

// ============================================================================
// Configuration Metadata
// ============================================================================

/// Input type of a provider configuration property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigPropertyType {
    /// Plain text.
    String,
    /// Secret value, masked by the admin console.
    Password,
    /// Boolean switch.
    Boolean,
}

/// Describes one provider configuration property for the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderConfigProperty {
    /// Key in `FederationConfig::config`.
    pub name: &'static str,
    /// Input type.
    pub property_type: ConfigPropertyType,
    /// Short label.
    pub label: &'static str,
    /// Help text.
    pub help_text: &'static str,
}
