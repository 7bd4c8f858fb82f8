//! Secret resolution against Google Secret Manager.
//!
//! Every call performs a fresh `versions/*:access` read authenticated as the
//! ambient identity of the process. Nothing is cached: a rotated or revoked key
//! takes effect on the very next request.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::SecretAccessError;
use crate::request::SecretReference;

/// Reads secret versions from a secret store.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Read and decode the payload of one secret version.
    async fn resolve(&self, reference: &SecretReference) -> Result<SecretString, SecretAccessError>;
}

/// Supplies OAuth access tokens for the caller's identity.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, SecretAccessError>;
}

// ── Token sources ───────────────────────────────────────────────────

/// Fetches tokens for the attached service account from the metadata server.
pub struct MetadataServerToken {
    client: reqwest::Client,
    host: String,
}

#[derive(Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
}

impl MetadataServerToken {
    pub fn new(client: reqwest::Client, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }

    fn token_url(&self) -> String {
        let base = if self.host.starts_with("http://") || self.host.starts_with("https://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.host)
        };
        format!("{base}/computeMetadata/v1/instance/service-account/default/token")
    }
}

#[async_trait]
impl AccessTokenSource for MetadataServerToken {
    async fn access_token(&self) -> Result<SecretString, SecretAccessError> {
        let resp = self
            .client
            .get(self.token_url())
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SecretAccessError::Unauthenticated {
                reason: format!("metadata server unreachable: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SecretAccessError::Unauthenticated {
                reason: format!("metadata server returned {status}: {body}"),
            });
        }

        let parsed: MetadataTokenResponse =
            resp.json().await.map_err(|e| SecretAccessError::Unauthenticated {
                reason: format!("invalid metadata token response: {e}"),
            })?;
        Ok(SecretString::from(parsed.access_token))
    }
}

/// A fixed token, for running outside GCP.
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<SecretString, SecretAccessError> {
        Ok(self.0.clone())
    }
}

// ── Secret Manager ──────────────────────────────────────────────────

/// Secret Manager REST client.
pub struct GcpSecretManager {
    client: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn AccessTokenSource>,
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: Option<SecretPayload>,
}

#[derive(Deserialize)]
struct SecretPayload {
    data: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    message: String,
}

impl GcpSecretManager {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            tokens,
        }
    }

    fn access_url(&self, reference: &SecretReference) -> String {
        format!(
            "{}/{}:access",
            self.endpoint.trim_end_matches('/'),
            reference.version_path()
        )
    }
}

#[async_trait]
impl SecretResolver for GcpSecretManager {
    async fn resolve(&self, reference: &SecretReference) -> Result<SecretString, SecretAccessError> {
        let name = reference.version_path();
        let token = self.tokens.access_token().await?;

        let resp = self
            .client
            .get(self.access_url(reference))
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| SecretAccessError::Unavailable {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| SecretAccessError::Unavailable {
            reason: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(classify_failure(&name, status, &body));
        }

        decode_payload(&name, &body)
    }
}

/// Map a non-success Secret Manager response onto a typed failure.
fn classify_failure(name: &str, status: StatusCode, body: &str) -> SecretAccessError {
    let reason = serde_json::from_str::<GoogleErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let name = name.to_string();

    match status {
        StatusCode::NOT_FOUND => SecretAccessError::NotFound { name, reason },
        StatusCode::FORBIDDEN => SecretAccessError::PermissionDenied { name, reason },
        StatusCode::UNAUTHORIZED => SecretAccessError::Unauthenticated { reason },
        status if status.is_server_error() => SecretAccessError::Unavailable {
            reason: format!("{status}: {reason}"),
        },
        status => SecretAccessError::Backend {
            name,
            status: status.as_u16(),
            reason,
        },
    }
}

fn decode_payload(name: &str, body: &str) -> Result<SecretString, SecretAccessError> {
    let invalid = |reason: String| SecretAccessError::InvalidPayload {
        name: name.to_string(),
        reason,
    };

    let parsed: AccessSecretVersionResponse = serde_json::from_str(body)
        .map_err(|e| invalid(format!("failed to decode access response: {e}")))?;
    let data = parsed
        .payload
        .and_then(|payload| payload.data)
        .ok_or_else(|| invalid("secret payload missing data".into()))?;
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| invalid(format!("base64 decode failed: {e}")))?;
    let value = String::from_utf8(bytes).map_err(|e| invalid(format!("not UTF-8: {e}")))?;
    Ok(SecretString::from(value))
}
