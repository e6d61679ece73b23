use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment variable JupyterHub sets for services and spawned servers
pub const TOKEN_ENV_VAR: &str = "JUPYTERHUB_API_TOKEN";

/// Global configuration for the launcher
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Dashboard server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// JupyterHub connection settings
    #[serde(default)]
    pub hub: HubConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Bind address (default: 127.0.0.1)
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Port to serve the dashboard on (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the dashboard page is served under (default: /app)
    #[serde(default = "default_route")]
    pub route: String,

    /// Origins (host[:port]) allowed to send cross-origin requests
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Open the dashboard in a browser once listening
    #[serde(default)]
    pub show_browser: bool,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}:{}': {}", self.bind, self.port, e))
    }

    /// URL of the dashboard page as seen from this machine
    pub fn page_url(&self) -> String {
        format!("http://{}:{}{}", self.bind, self.port, self.route)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
            route: default_route(),
            allowed_origins: default_allowed_origins(),
            show_browser: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HubConfig {
    /// Public URL of the hub, used to build app links
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// REST API root (default: <base_url>/hub/api)
    pub api_url: Option<String>,

    /// API token; falls back to JUPYTERHUB_API_TOKEN
    pub api_token: Option<String>,

    /// Timeout for each hub request in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl HubConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn api_url(&self) -> String {
        match &self.api_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}/hub/api", self.base_url()),
        }
    }

    /// Configured token, or the one JupyterHub put in the environment
    pub fn resolve_token(&self) -> Option<String> {
        self.api_token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
            .filter(|t| !t.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_url: None,
            api_token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_route() -> String {
    "/app".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["localhost:8000".to_string()]
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be greater than 0".to_string());
        }
        if !self.server.route.starts_with('/') || self.server.route.len() < 2 {
            errors.push(format!(
                "server.route '{}' must start with '/' and name a path",
                self.server.route
            ));
        }
        if let Err(e) = self.server.bind_addr() {
            errors.push(e.to_string());
        }

        let base = self.hub.base_url();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            errors.push(format!(
                "hub.base_url '{}' must be an http:// or https:// URL",
                self.hub.base_url
            ));
        }
        if self.hub.request_timeout_secs == 0 {
            errors.push("hub.request_timeout_secs must be greater than 0".to_string());
        }

        if !errors.is_empty() {
            anyhow::bail!("Configuration errors:\n  - {}", errors.join("\n  - "));
        }

        Ok(())
    }
}
