//! Crowd provider configuration.
//!
//! ## Security Requirements
//!
//! - The server URL MUST use `https://`
//! - Plain `http://` is rejected unless `allow_insecure_http` is set, which
//!   is meant for local test servers only
//! - The application password is never serialized or printed

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use kc_federation::FederationConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CrowdError, CrowdResult};

/// Config key for the Crowd base URL.
pub const CONFIG_URL: &str = "url";

/// Config key for the application name registered in Crowd.
pub const CONFIG_APPLICATION_NAME: &str = "applicationName";

/// Config key for the application password registered in Crowd.
pub const CONFIG_APPLICATION_PASSWORD: &str = "applicationPassword";

/// Config key that permits `http://` URLs.
pub const CONFIG_ALLOW_INSECURE_HTTP: &str = "allowInsecureHttp";

/// Config key for the connection timeout in seconds.
pub const CONFIG_CONNECTION_TIMEOUT: &str = "connectionTimeout";

/// Config key for the read timeout in seconds.
pub const CONFIG_READ_TIMEOUT: &str = "readTimeout";

/// Config key for the hierarchy cycle policy.
pub const CONFIG_CYCLE_POLICY: &str = "hierarchyCyclePolicy";

const MISSING_URL: &str = "Please provide base URL to crowd server";
const MISSING_APPLICATION_NAME: &str = "Please provide Application name registered in crowd";
const MISSING_APPLICATION_PASSWORD: &str = "Please provide Application password registered in crowd";

const REST_API_PATH: &str = "rest/usermanagement/1/";

// ============================================================================
// Cycle Policy
// ============================================================================

/// What the group resolver does when the directory reports a cyclic hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HierarchyCyclePolicy {
    /// Drop the edge that closes the cycle and log a warning.
    #[default]
    Truncate,
    /// Abort resolution with `FederationError::HierarchyCycle`.
    Fail,
}

impl FromStr for HierarchyCyclePolicy {
    type Err = CrowdError;

    fn from_str(s: &str) -> CrowdResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRUNCATE" => Ok(Self::Truncate),
            "FAIL" => Ok(Self::Fail),
            other => Err(CrowdError::config(format!(
                "Unknown hierarchy cycle policy '{other}', expected TRUNCATE or FAIL"
            ))),
        }
    }
}

// ============================================================================
// Crowd Configuration
// ============================================================================

/// Crowd provider configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct CrowdConfig {
    /// Crowd base URL, e.g. `https://crowd.example.com/crowd`.
    pub url: Url,

    /// Application name registered in Crowd.
    pub application_name: String,

    /// Application password registered in Crowd.
    #[serde(skip_serializing)]
    pub application_password: String,

    /// Whether `http://` URLs are accepted.
    pub allow_insecure_http: bool,

    /// Connection timeout.
    pub connection_timeout: Duration,

    /// Read timeout for each request.
    pub read_timeout: Duration,

    /// Handling of cyclic group hierarchies.
    pub cycle_policy: HierarchyCyclePolicy,
}

impl fmt::Debug for CrowdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrowdConfig")
            .field("url", &self.url.as_str())
            .field("application_name", &self.application_name)
            .field("application_password", &"[REDACTED]")
            .field("allow_insecure_http", &self.allow_insecure_http)
            .field("connection_timeout", &self.connection_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("cycle_policy", &self.cycle_policy)
            .finish()
    }
}

impl CrowdConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> CrowdConfigBuilder {
        CrowdConfigBuilder::new()
    }

    /// Reads the configuration from the host component model.
    ///
    /// ## Errors
    ///
    /// Returns `CrowdError::Configuration` for missing or malformed values
    /// and `CrowdError::InsecureProtocol` for a disallowed `http://` URL.
    pub fn from_federation_config(config: &FederationConfig) -> CrowdResult<Self> {
        let mut builder = Self::builder()
            .allow_insecure_http(config.get_bool(CONFIG_ALLOW_INSECURE_HTTP).unwrap_or(false));

        if let Some(url) = config.get(CONFIG_URL) {
            builder = builder.url(url);
        }
        if let Some(name) = config.get(CONFIG_APPLICATION_NAME) {
            builder = builder.application_name(name);
        }
        if let Some(password) = config.get(CONFIG_APPLICATION_PASSWORD) {
            builder = builder.application_password(password);
        }
        if let Some(secs) = config.get_u64(CONFIG_CONNECTION_TIMEOUT) {
            builder = builder.connection_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.get_u64(CONFIG_READ_TIMEOUT) {
            builder = builder.read_timeout(Duration::from_secs(secs));
        }
        if let Some(policy) = config.get(CONFIG_CYCLE_POLICY) {
            builder = builder.cycle_policy(policy.parse()?);
        }

        builder.build()
    }

    /// Validates the configuration.
    ///
    /// ## Security
    ///
    /// This method enforces HTTPS unless insecure HTTP is explicitly allowed.
    pub fn validate(&self) -> CrowdResult<()> {
        if self.application_name.is_empty() {
            return Err(CrowdError::config(MISSING_APPLICATION_NAME));
        }
        if self.application_password.is_empty() {
            return Err(CrowdError::config(MISSING_APPLICATION_PASSWORD));
        }
        validate_scheme(&self.url, self.allow_insecure_http)
    }

    /// Returns the base URL of the usermanagement REST API.
    ///
    /// ## Errors
    ///
    /// Returns `CrowdError::Configuration` if the base URL cannot carry a path.
    pub fn rest_base_url(&self) -> CrowdResult<Url> {
        let mut base = self.url.clone();
        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(REST_API_PATH)
            .map_err(|e| CrowdError::config(format!("Invalid Crowd URL: {e}")))
    }
}

fn validate_scheme(url: &Url, allow_insecure_http: bool) -> CrowdResult<()> {
    match url.scheme() {
        "https" => {}
        "http" if allow_insecure_http => {}
        "http" => return Err(CrowdError::InsecureProtocol),
        other => {
            return Err(CrowdError::config(format!(
                "Unsupported URL scheme '{other}' for Crowd server"
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(CrowdError::config("Invalid Crowd URL: missing host"));
    }

    Ok(())
}

// ============================================================================
// Configuration Builder
// ============================================================================

/// Builder for Crowd configuration.
#[derive(Debug, Default)]
pub struct CrowdConfigBuilder {
    url: Option<String>,
    application_name: Option<String>,
    application_password: Option<String>,
    allow_insecure_http: bool,
    connection_timeout: Duration,
    read_timeout: Duration,
    cycle_policy: HierarchyCyclePolicy,
}

impl CrowdConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            ..Default::default()
        }
    }

    /// Sets the Crowd base URL (must be https:// by default).
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the application name.
    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the application password.
    #[must_use]
    pub fn application_password(mut self, password: impl Into<String>) -> Self {
        self.application_password = Some(password.into());
        self
    }

    /// Accepts `http://` URLs. Only for local test servers.
    #[must_use]
    pub const fn allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the hierarchy cycle policy.
    #[must_use]
    pub const fn cycle_policy(mut self, policy: HierarchyCyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The URL, application name or application password is missing
    /// - The URL does not parse
    /// - The URL does not use HTTPS and insecure HTTP is not allowed
    pub fn build(self) -> CrowdResult<CrowdConfig> {
        let raw_url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CrowdError::config(MISSING_URL))?;
        let application_name = self
            .application_name
            .ok_or_else(|| CrowdError::config(MISSING_APPLICATION_NAME))?;
        let application_password = self
            .application_password
            .ok_or_else(|| CrowdError::config(MISSING_APPLICATION_PASSWORD))?;

        let url = Url::parse(raw_url.trim())
            .map_err(|e| CrowdError::config(format!("Invalid Crowd URL: {e}")))?;

        let config = CrowdConfig {
            url,
            application_name,
            application_password,
            allow_insecure_http: self.allow_insecure_http,
            connection_timeout: self.connection_timeout,
            read_timeout: self.read_timeout,
            cycle_policy: self.cycle_policy,
        };

        config.validate()?;

        Ok(config)
    }
}
