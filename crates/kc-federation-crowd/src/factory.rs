//! Crowd provider factory.

use std::sync::Arc;

use kc_federation::config::{ConfigPropertyType, ProviderConfigProperty};
use kc_federation::{FederationConfig, FederationError, FederationResult, UserStorageProviderFactory};
use tracing::info;

use crate::client::CrowdClient;
use crate::config::{
    CrowdConfig, HierarchyCyclePolicy, CONFIG_APPLICATION_NAME, CONFIG_APPLICATION_PASSWORD,
    CONFIG_CYCLE_POLICY, CONFIG_URL,
};
use crate::provider::{CrowdStorageProvider, PROVIDER_TYPE};
use crate::rest::RestCrowdClient;

/// Factory id registered with the host.
pub const PROVIDER_ID: &str = PROVIDER_TYPE;

const HELP_TEXT: &str = "Read-only user federation with Atlassian Crowd";

const CONFIG_PROPERTIES: &[ProviderConfigProperty] = &[
    ProviderConfigProperty {
        name: CONFIG_URL,
        property_type: ConfigPropertyType::String,
        label: "Crowd URL",
        help_text: "Base url for Crowd server",
    },
    ProviderConfigProperty {
        name: CONFIG_APPLICATION_NAME,
        property_type: ConfigPropertyType::String,
        label: "Crowd Application Name",
        help_text: "Application name registered in Crowd server",
    },
    ProviderConfigProperty {
        name: CONFIG_APPLICATION_PASSWORD,
        property_type: ConfigPropertyType::Password,
        label: "Crowd Application Password",
        help_text: "Application password registered in Crowd server",
    },
];

/// Creates [`CrowdStorageProvider`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrowdStorageProviderFactory;

impl CrowdStorageProviderFactory {
    /// Creates a provider over an existing client.
    ///
    /// Only the cycle policy is read from `config`; connection settings
    /// belong to the client.
    ///
    /// ## Errors
    ///
    /// Returns `FederationError::Configuration` for an unknown cycle policy.
    pub fn create_with_client(
        &self,
        config: &FederationConfig,
        client: Arc<dyn CrowdClient>,
    ) -> FederationResult<CrowdStorageProvider> {
        let cycle_policy = match config.get(CONFIG_CYCLE_POLICY) {
            Some(policy) => policy.parse::<HierarchyCyclePolicy>()?,
            None => HierarchyCyclePolicy::default(),
        };
        Ok(CrowdStorageProvider::new(config.clone(), client, cycle_policy))
    }
}

impl UserStorageProviderFactory for CrowdStorageProviderFactory {
    type Provider = CrowdStorageProvider;

    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn help_text(&self) -> &'static str {
        HELP_TEXT
    }

    fn config_properties(&self) -> &'static [ProviderConfigProperty] {
        CONFIG_PROPERTIES
    }

    fn validate_configuration(&self, config: &FederationConfig) -> FederationResult<()> {
        CrowdConfig::from_federation_config(config)
            .map(|_| ())
            .map_err(FederationError::from)
    }

    fn create(&self, config: &FederationConfig) -> FederationResult<CrowdStorageProvider> {
        let crowd_config = CrowdConfig::from_federation_config(config)?;
        let client = RestCrowdClient::new(&crowd_config)?;

        info!(
            provider = %config.name,
            url = %crowd_config.url,
            application = %crowd_config.application_name,
            "Created Crowd federation provider"
        );

        Ok(CrowdStorageProvider::new(
            config.clone(),
            Arc::new(client),
            crowd_config.cycle_policy,
        ))
    }
}
