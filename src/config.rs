//! Configuration types.
//!
//! Only transport plumbing is configurable. The GCP project, secret name and
//! secret version always travel inside the request payload.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const DEFAULT_SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com/v1";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
pub const DEFAULT_SENDGRID_API_BASE: &str = "https://api.sendgrid.com/v3";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Relay configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Base URL of the Secret Manager REST API.
    pub secret_manager_endpoint: String,
    /// Host of the metadata server that vends the ambient identity's tokens.
    pub metadata_host: String,
    /// Static OAuth token used instead of the metadata server (local runs).
    pub static_access_token: Option<SecretString>,
    /// Base URL of the SendGrid v3 API.
    pub sendgrid_api_base: String,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            secret_manager_endpoint: DEFAULT_SECRET_MANAGER_ENDPOINT.to_string(),
            metadata_host: DEFAULT_METADATA_HOST.to_string(),
            static_access_token: None,
            sendgrid_api_base: DEFAULT_SENDGRID_API_BASE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RelayConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match non_empty("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".into(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let host = non_empty("RELAY_BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let ip: IpAddr = host.parse().map_err(|e| ConfigError::InvalidValue {
            key: "RELAY_BIND_ADDR".into(),
            message: format!("{host:?}: {e}"),
        })?;
        let bind_addr = SocketAddr::new(ip, port);

        let http_timeout = non_empty("RELAY_HTTP_TIMEOUT_SECS")
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Ok(Self {
            bind_addr,
            secret_manager_endpoint: non_empty("SECRET_MANAGER_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_SECRET_MANAGER_ENDPOINT.to_string()),
            metadata_host: non_empty("GCP_METADATA_HOST")
                .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string()),
            static_access_token: non_empty("GOOGLE_OAUTH_ACCESS_TOKEN").map(SecretString::from),
            sendgrid_api_base: non_empty("SENDGRID_API_BASE")
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_BASE.to_string()),
            http_timeout,
        })
    }

    /// Shared HTTP client for all upstream calls.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }
}
