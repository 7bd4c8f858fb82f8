//! Error types for the relay.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// The inbound payload could not be turned into an [`EmailSendRequest`].
///
/// [`EmailSendRequest`]: crate::request::EmailSendRequest
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} not found in request payload")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be a string")]
    NotAString(&'static str),

    #[error("{0} may only contain letters, digits, '-' and '_'")]
    InvalidResourceId(&'static str),

    #[error("no arguments or request payload supplied")]
    EmptyPayload,
}

impl ValidationError {
    /// Payload key the error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Missing(field)
            | Self::Empty(field)
            | Self::NotAString(field)
            | Self::InvalidResourceId(field) => Some(field),
            Self::EmptyPayload => None,
        }
    }
}

/// Reading a secret version from the secret store failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretAccessError {
    #[error("Secret {name} not found: {reason}")]
    NotFound { name: String, reason: String },

    #[error("Permission denied on secret {name}: {reason}")]
    PermissionDenied { name: String, reason: String },

    #[error("Secret store rejected the caller identity: {reason}")]
    Unauthenticated { reason: String },

    #[error("Secret store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Secret store returned {status} for {name}: {reason}")]
    Backend {
        name: String,
        status: u16,
        reason: String,
    },

    #[error("Secret {name} has an unusable payload: {reason}")]
    InvalidPayload { name: String, reason: String },
}

impl SecretAccessError {
    /// Whether the failure is caused by the caller's identity lacking access.
    pub fn is_permission(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::Unauthenticated { .. }
        )
    }
}

/// The provider could not be reached, so the message was never evaluated.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Request to {provider} timed out: {reason}")]
    Timeout { provider: String, reason: String },

    #[error("Could not connect to {provider}: {reason}")]
    Connect { provider: String, reason: String },

    #[error("Request to {provider} failed: {reason}")]
    Transport { provider: String, reason: String },
}

impl DispatchError {
    pub(crate) fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        let provider = provider.to_string();
        let reason = err.to_string();
        if err.is_timeout() {
            Self::Timeout { provider, reason }
        } else if err.is_connect() {
            Self::Connect { provider, reason }
        } else {
            Self::Transport { provider, reason }
        }
    }
}

/// Stage of the relay pipeline that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Resolve,
    Dispatch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normalize => "normalize",
            Self::Resolve => "resolve",
            Self::Dispatch => "dispatch",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a pipeline run that did not send the email.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Secret access failed: {0}")]
    SecretAccess(#[from] SecretAccessError),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Provider rejected the message with status {status}: {body}")]
    ProviderRejected { status: u16, body: String },
}

impl PipelineError {
    /// The stage that aborted the run.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Validation(_) => Stage::Normalize,
            Self::SecretAccess(_) => Stage::Resolve,
            Self::Dispatch(_) | Self::ProviderRejected { .. } => Stage::Dispatch,
        }
    }

    /// Stable label used for the `outcome` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::SecretAccess(_) => "secret_access_error",
            Self::Dispatch(_) => "dispatch_error",
            Self::ProviderRejected { .. } => "provider_rejected",
        }
    }

    /// Provider HTTP status, when the provider evaluated the message.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            Self::ProviderRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Only transport failures may succeed unchanged on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}

/// Transport envelope errors raised by the entry adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Push envelope has no message data")]
    MissingData,

    #[error("Message data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Message data is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Message data does not contain a valid JSON object: {0}")]
    Json(String),
}
