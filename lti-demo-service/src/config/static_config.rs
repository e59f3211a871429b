//! Configuration structs and their defaults.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_lti")]
    pub lti: LtiConfig,

    #[serde(default = "default_state")]
    pub state: StateConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            lti: default_lti(),
            state: default_state(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix prepended to redirect targets when the tool is mounted below
    /// the root of its host (e.g. behind a reverse proxy).
    #[serde(default)]
    pub base_path: String,

    /// Per-request timeout. Zero disables the timeout layer.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("ltidemo.db")
    }
}

/// LTI endpoint paths and known platforms
#[derive(Debug, Clone, Deserialize)]
pub struct LtiConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_launch_path")]
    pub launch_path: String,

    #[serde(default)]
    pub platforms: Vec<PlatformRegistration>,
}

impl LtiConfig {
    /// Find the registration for an issuer, optionally narrowed by client id
    pub fn find_platform(
        &self,
        issuer: &str,
        client_id: Option<&str>,
    ) -> Option<&PlatformRegistration> {
        self.platforms.iter().find(|p| {
            p.issuer == issuer && client_id.is_none_or(|client_id| p.client_id == client_id)
        })
    }
}

/// A learning platform this tool has been registered with
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformRegistration {
    pub issuer: String,
    pub client_id: String,

    /// The platform's OIDC authorization endpoint
    pub auth_login_url: String,

    /// Deployment ids accepted from this platform. Empty accepts any.
    #[serde(default)]
    pub deployment_ids: Vec<String>,
}

impl PlatformRegistration {
    pub fn accepts_deployment(&self, deployment_id: Option<&str>) -> bool {
        if self.deployment_ids.is_empty() {
            return true;
        }
        deployment_id.is_some_and(|id| self.deployment_ids.iter().any(|d| d == id))
    }
}

/// Session state lifetime
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl StateConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

// ==================== Default Value Functions ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
        base_path: String::new(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
    }
}

pub(crate) fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

pub(crate) fn default_lti() -> LtiConfig {
    LtiConfig {
        login_path: default_login_path(),
        launch_path: default_launch_path(),
        platforms: Vec::new(),
    }
}

pub(crate) fn default_login_path() -> String {
    "/login".to_string()
}

pub(crate) fn default_launch_path() -> String {
    "/launch".to_string()
}

pub(crate) fn default_state() -> StateConfig {
    StateConfig {
        ttl_secs: default_state_ttl_secs(),
        cleanup_interval_secs: default_cleanup_interval_secs(),
    }
}

pub(crate) fn default_state_ttl_secs() -> u64 {
    3600
}

pub(crate) fn default_cleanup_interval_secs() -> u64 {
    300
}
