//! JupyterHub REST API client
//!
//! Everything the launcher knows about users and their servers comes from
//! here. Nothing is cached: callers re-fetch the user to observe the effect
//! of a create or delete.

use crate::config::HubConfig;
use crate::error::HubError;
use hyper::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// The authenticated hub user and their named servers
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Keyed by server name. Ordered so the catalog renders deterministically.
    #[serde(default, deserialize_with = "null_as_default")]
    pub servers: BTreeMap<String, ServerRecord>,
}

/// One named server as reported by the hub
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Path on the hub, e.g. `/user/alice/myapp/`
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ready: bool,
    /// "spawn", "stop" or absent
    #[serde(default)]
    pub pending: Option<String>,
    /// Options the server was spawned with. Kept untyped: servers started
    /// from the hub's own spawn form carry lists and nulls here.
    #[serde(default)]
    pub user_options: Option<Value>,
}

impl ServerRecord {
    /// Whether `user_options.jhub_app` is `true`
    pub fn is_app(&self) -> bool {
        self.user_options
            .as_ref()
            .and_then(|options| options.get("jhub_app"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Typed options for a server flagged as an app.
    ///
    /// `None` for non-app servers and for app options that do not decode.
    pub fn app_options(&self) -> Option<AppOptions> {
        if !self.is_app() {
            return None;
        }
        let options = self.user_options.clone()?;
        match serde_json::from_value(options) {
            Ok(options) => Some(options),
            Err(e) => {
                warn!(server = %self.name, error = %e, "Ignoring app with malformed options");
                None
            }
        }
    }
}

/// Options stored on a server at creation time. `jhub_app` marks it as an app.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppOptions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub jhub_app: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub framework: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filepath: String,
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The hub operations the launcher depends on
pub trait Platform: Send + Sync {
    /// Fetch the user the token belongs to, including their servers
    fn get_user(&self) -> impl Future<Output = Result<User, HubError>> + Send;

    /// Ask the hub to spawn a new named server with the given options
    fn create_server(
        &self,
        user: &str,
        server_name: &str,
        options: &AppOptions,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Spawn an existing, stopped named server again with its stored options
    fn start_server(
        &self,
        user: &str,
        server_name: &str,
        options: &AppOptions,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Stop a named server, keeping it so it can be started again
    fn stop_server(
        &self,
        user: &str,
        server_name: &str,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Ask the hub to stop and remove a named server
    fn delete_server(
        &self,
        user: &str,
        server_name: &str,
    ) -> impl Future<Output = Result<(), HubError>> + Send;
}

/// Hub error body: `{"status": 400, "message": "..."}`
#[derive(Debug, Deserialize)]
struct HubErrorBody {
    message: String,
}

/// `Platform` over HTTP
#[derive(Debug, Clone)]
pub struct HubClient {
    http_client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl HubClient {
    pub fn new(config: &HubConfig) -> anyhow::Result<Self> {
        Self::with_settings(config.api_url(), config.resolve_token(), config.request_timeout())
    }

    pub fn with_settings(
        api_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn auth_header(&self) -> Result<String, HubError> {
        self.token
            .as_ref()
            .map(|t| format!("token {}", t))
            .ok_or_else(|| HubError::Auth("no API token configured".to_string()))
    }

    fn server_url(&self, user: &str, server_name: &str) -> String {
        format!(
            "{}/users/{}/servers/{}",
            self.api_url,
            urlencoding::encode(user),
            urlencoding::encode(server_name)
        )
    }
}

/// Turn a non-success response into a `HubError`, keeping the hub's message when it sent one
async fn error_from_response(response: reqwest::Response) -> HubError {
    // reqwest and hyper carry different `http` versions
    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<HubErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);

    warn!(status = status.as_u16(), message = %message, "Hub request failed");
    HubError::from_status(status, message)
}

impl Platform for HubClient {
    async fn get_user(&self) -> Result<User, HubError> {
        let url = format!("{}/user", self.api_url);
        debug!(%url, "Fetching current user");

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", self.auth_header()?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let user: User = response
            .json()
            .await
            .map_err(|e| HubError::Transport(format!("invalid user document: {}", e)))?;
        debug!(user = %user.name, servers = user.servers.len(), "Fetched current user");
        Ok(user)
    }

    async fn create_server(
        &self,
        user: &str,
        server_name: &str,
        options: &AppOptions,
    ) -> Result<(), HubError> {
        debug!(user, server = %server_name, framework = %options.framework, "Requesting server creation");
        self.spawn(user, server_name, options).await
    }

    async fn start_server(
        &self,
        user: &str,
        server_name: &str,
        options: &AppOptions,
    ) -> Result<(), HubError> {
        debug!(user, server = %server_name, "Requesting server start");
        self.spawn(user, server_name, options).await
    }

    async fn stop_server(&self, user: &str, server_name: &str) -> Result<(), HubError> {
        debug!(user, server = %server_name, "Requesting server stop");
        self.teardown(user, server_name, false).await
    }

    async fn delete_server(&self, user: &str, server_name: &str) -> Result<(), HubError> {
        debug!(user, server = %server_name, "Requesting server removal");
        self.teardown(user, server_name, true).await
    }
}

impl HubClient {
    /// `POST /users/{user}/servers/{name}`; creates the server if it does not exist
    async fn spawn(
        &self,
        user: &str,
        server_name: &str,
        options: &AppOptions,
    ) -> Result<(), HubError> {
        let response = self
            .http_client
            .post(self.server_url(user, server_name))
            .header("Authorization", self.auth_header()?)
            .json(options)
            .send()
            .await?;

        // 201 when started, 202 when the spawn is still pending
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// `DELETE /users/{user}/servers/{name}`; `remove` also deletes the server record
    async fn teardown(&self, user: &str, server_name: &str, remove: bool) -> Result<(), HubError> {
        let response = self
            .http_client
            .delete(self.server_url(user, server_name))
            .header("Authorization", self.auth_header()?)
            .json(&serde_json::json!({ "remove": remove }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}
