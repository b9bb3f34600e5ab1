//! REST client for the Crowd usermanagement API.
//!
//! ## Security Requirements
//!
//! - Every request carries the application credentials as HTTP Basic auth
//! - The base URL is HTTPS unless insecure HTTP was explicitly allowed
//! - User passwords travel only in the authentication request body and are
//!   never logged

use std::fmt;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::CrowdClient;
use crate::config::CrowdConfig;
use crate::entity::{GroupRecord, UserRecord};
use crate::error::{CrowdError, CrowdResult};
use crate::restriction::Restriction;

const USER_AGENT: &str = concat!("kc-federation-crowd/", env!("CARGO_PKG_VERSION"));
const JSON: &str = "application/json";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Deserialize)]
struct UserNameList {
    #[serde(default)]
    users: Vec<NameEntity>,
}

#[derive(Deserialize)]
struct NameEntity {
    name: String,
}

#[derive(Deserialize)]
struct GroupList {
    #[serde(default)]
    groups: Vec<GroupRecord>,
}

#[derive(Deserialize)]
struct ErrorEntity {
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct PasswordEntity<'a> {
    value: &'a str,
}

// ============================================================================
// Client
// ============================================================================

/// [`CrowdClient`] over HTTP.
#[derive(Clone)]
pub struct RestCrowdClient {
    http: Client,
    base_url: Url,
    application_name: String,
    application_password: String,
}

impl fmt::Debug for RestCrowdClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestCrowdClient")
            .field("base_url", &self.base_url.as_str())
            .field("application_name", &self.application_name)
            .field("application_password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RestCrowdClient {
    /// Creates a client from a validated configuration.
    ///
    /// ## Errors
    ///
    /// Returns `CrowdError::Configuration` if the HTTP client cannot be built
    /// or the base URL cannot carry the API path.
    pub fn new(config: &CrowdConfig) -> CrowdResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(config.connection_timeout)
            .timeout(config.read_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CrowdError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.rest_base_url()?,
            application_name: config.application_name.clone(),
            application_password: config.application_password.clone(),
        })
    }

    /// Returns the usermanagement API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> CrowdResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| CrowdError::config(format!("Invalid Crowd endpoint '{path}': {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> CrowdResult<RequestBuilder> {
        let url = self.endpoint(path, query)?;
        debug!(method = %method, path = %url.path(), "Crowd request");

        Ok(self
            .http
            .request(method, url)
            .basic_auth(&self.application_name, Some(&self.application_password))
            .header(ACCEPT, JSON))
    }

    async fn execute(&self, request: RequestBuilder) -> CrowdResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> CrowdResult<T> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| CrowdError::Decode(e.to_string()))
    }

    /// Lists groups with their attributes expanded.
    async fn fetch_groups(
        &self,
        path: &str,
        name_param: &str,
        name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>> {
        let (start, max) = (start.to_string(), max.to_string());
        let request = self.request(
            Method::GET,
            path,
            &[
                (name_param, name),
                ("start-index", start.as_str()),
                ("max-results", max.as_str()),
                ("expand", "group,attributes"),
            ],
        )?;
        let list: GroupList = self.fetch(request).await?;
        Ok(list.groups)
    }

    async fn search(
        &self,
        restriction: &Restriction,
        start: usize,
        max: usize,
        expand: Option<&str>,
    ) -> CrowdResult<Response> {
        let (start, max) = (start.to_string(), max.to_string());
        let mut query = vec![
            ("entity-type", "user"),
            ("start-index", start.as_str()),
            ("max-results", max.as_str()),
        ];
        if let Some(expand) = expand {
            query.push(("expand", expand));
        }

        let request = self
            .request(Method::POST, "search", &query)?
            .json(restriction);
        self.execute(request).await
    }
}

/// Maps a non-success response to an error.
fn classify(status: StatusCode, body: &str) -> CrowdError {
    let entity = serde_json::from_str::<ErrorEntity>(body).ok();
    match (status, entity) {
        (StatusCode::UNAUTHORIZED, _) => CrowdError::ApplicationAuthentication,
        (StatusCode::FORBIDDEN, Some(entity)) => CrowdError::ApplicationPermission(entity.message),
        (StatusCode::FORBIDDEN, None) => CrowdError::ApplicationPermission(body.to_string()),
        (_, Some(entity)) => CrowdError::from_reason(&entity.reason, entity.message),
        (status, None) => CrowdError::operation_failed(status.as_str(), body),
    }
}

#[async_trait]
impl CrowdClient for RestCrowdClient {
    async fn get_user(&self, username: &str) -> CrowdResult<UserRecord> {
        let request = self.request(
            Method::GET,
            "user",
            &[("username", username), ("expand", "attributes")],
        )?;
        self.fetch(request).await
    }

    async fn search_users(
        &self,
        restriction: &Restriction,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<UserRecord>> {
        let response = self
            .search(restriction, start, max, Some("user,attributes"))
            .await?;
        let list: UserList = response
            .json()
            .await
            .map_err(|e| CrowdError::Decode(e.to_string()))?;
        Ok(list.users)
    }

    async fn search_user_names(
        &self,
        restriction: &Restriction,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<String>> {
        let response = self.search(restriction, start, max, None).await?;
        let list: UserNameList = response
            .json()
            .await
            .map_err(|e| CrowdError::Decode(e.to_string()))?;
        Ok(list.users.into_iter().map(|u| u.name).collect())
    }

    async fn get_groups_for_user(
        &self,
        username: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>> {
        self.fetch_groups("user/group/direct", "username", username, start, max)
            .await
    }

    async fn get_parent_groups_for_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>> {
        self.fetch_groups("group/parent-group/direct", "groupname", group_name, start, max)
            .await
    }

    async fn get_child_groups_of_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>> {
        self.fetch_groups("group/child-group/direct", "groupname", group_name, start, max)
            .await
    }

    async fn get_users_of_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<UserRecord>> {
        let (start, max) = (start.to_string(), max.to_string());
        let request = self.request(
            Method::GET,
            "group/user/direct",
            &[
                ("groupname", group_name),
                ("start-index", start.as_str()),
                ("max-results", max.as_str()),
                ("expand", "user,attributes"),
            ],
        )?;
        let list: UserList = self.fetch(request).await?;
        Ok(list.users)
    }

    async fn authenticate_user(&self, username: &str, password: &str) -> CrowdResult<UserRecord> {
        let request = self
            .request(Method::POST, "authentication", &[("username", username)])?
            .json(&PasswordEntity { value: password });
        self.fetch(request).await
    }

    async fn test_connection(&self) -> CrowdResult<()> {
        let request = self.request(Method::GET, "config/cookie", &[])?;
        self.execute(request).await.map(|_| ())
    }
}
