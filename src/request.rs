//! Inbound payload validation and defaulting.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Secret name used when the payload does not name one.
pub const DEFAULT_SECRET_NAME: &str = "SENDGRID_API_KEY";
/// Secret version used when the payload does not pin one.
pub const DEFAULT_SECRET_VERSION: &str = "latest";

/// Payload keys. The secret name travels under `secret`.
pub mod keys {
    pub const PROJECT_ID: &str = "project_id";
    pub const SECRET: &str = "secret";
    pub const SECRET_VERSION: &str = "secret_version";
    pub const FROM_ADDRESS: &str = "from_address";
    pub const TO_ADDRESS: &str = "to_address";
    pub const SUBJECT: &str = "subject";
    pub const PLAIN_TEXT_CONTENT: &str = "plain_text_content";
}

/// A fully defaulted, validated email-send intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailSendRequest {
    pub project_id: String,
    pub secret_name: String,
    pub secret_version: String,
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub plain_text_content: String,
}

impl EmailSendRequest {
    /// The secret holding the provider API key for this request.
    pub fn secret_reference(&self) -> SecretReference {
        SecretReference {
            project_id: self.project_id.clone(),
            secret_name: self.secret_name.clone(),
            secret_version: self.secret_version.clone(),
        }
    }
}

/// Address of one secret version in the secret store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretReference {
    pub project_id: String,
    pub secret_name: String,
    pub secret_version: String,
}

impl SecretReference {
    /// Fully qualified resource name of the secret version.
    pub fn version_path(&self) -> String {
        format!(
            "projects/{}/secrets/{}/versions/{}",
            self.project_id, self.secret_name, self.secret_version
        )
    }
}

/// Turn a raw decoded payload into an [`EmailSendRequest`].
///
/// Required keys are checked in the order `project_id`, `from_address`,
/// `to_address`. A JSON `null` is treated the same as an absent key.
///
/// `project_id`, `secret` and `secret_version` become segments of the secret
/// version path, so they are limited to `[A-Za-z0-9_-]`.
pub fn normalize(raw: &Map<String, Value>) -> Result<EmailSendRequest, ValidationError> {
    let project_id = resource_id(keys::PROJECT_ID, required(raw, keys::PROJECT_ID)?)?;
    let from_address = required(raw, keys::FROM_ADDRESS)?;
    let to_address = required(raw, keys::TO_ADDRESS)?;
    let secret_name = optional(raw, keys::SECRET, DEFAULT_SECRET_NAME)?;
    let secret_version = optional(raw, keys::SECRET_VERSION, DEFAULT_SECRET_VERSION)?;

    Ok(EmailSendRequest {
        project_id,
        secret_name: resource_id(keys::SECRET, secret_name)?,
        secret_version: resource_id(keys::SECRET_VERSION, secret_version)?,
        from_address,
        to_address,
        subject: optional(raw, keys::SUBJECT, "")?,
        plain_text_content: optional(raw, keys::PLAIN_TEXT_CONTENT, "")?,
    })
}

fn lookup<'a>(
    raw: &'a Map<String, Value>,
    key: &'static str,
) -> Result<Option<&'a str>, ValidationError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ValidationError::NotAString(key)),
    }
}

fn required(raw: &Map<String, Value>, key: &'static str) -> Result<String, ValidationError> {
    let value = lookup(raw, key)?.ok_or(ValidationError::Missing(key))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty(key));
    }
    Ok(value.to_string())
}

fn resource_id(key: &'static str, value: String) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty(key));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidResourceId(key));
    }
    Ok(value.to_string())
}

fn optional(
    raw: &Map<String, Value>,
    key: &'static str,
    default: &str,
) -> Result<String, ValidationError> {
    Ok(lookup(raw, key)?.unwrap_or(default).to_string())
}
