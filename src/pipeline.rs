//! The relay pipeline shared by every entry adapter.
//!
//! Each run is strictly sequential:
//! 1. `request::normalize()` turns the raw payload into an `EmailSendRequest`
//! 2. `SecretResolver::resolve()` fetches the provider key named by the payload
//! 3. `Mailer::dispatch()` makes one send attempt
//!
//! The first failing stage ends the run with a typed `PipelineError`.
//! Translating that into a transport response is the adapter's job.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::mail::{DispatchResult, Mailer};
use crate::request::normalize;
use crate::secrets::SecretResolver;

/// A message the provider accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Provider HTTP status (2xx).
    pub status: u16,
}

/// Validator → secret resolver → dispatcher.
#[derive(Clone)]
pub struct Pipeline {
    secrets: Arc<dyn SecretResolver>,
    mailer: Arc<dyn Mailer>,
}

impl Pipeline {
    pub fn new(secrets: Arc<dyn SecretResolver>, mailer: Arc<dyn Mailer>) -> Self {
        Self { secrets, mailer }
    }

    /// Run one invocation over a decoded payload.
    pub async fn run(&self, raw: &Map<String, Value>) -> Result<Delivery, PipelineError> {
        let request = normalize(raw)?;
        let reference = request.secret_reference();
        debug!(
            project_id = %reference.project_id,
            secret = %reference.secret_name,
            version = %reference.secret_version,
            "Request normalized"
        );

        // The key is scoped to this run and dropped (zeroized) on return.
        let api_key = self.secrets.resolve(&reference).await?;
        debug!("Secret resolved");

        match self.mailer.dispatch(&request, &api_key).await? {
            DispatchResult::Sent { status } => {
                info!(status, to = %request.to_address, "Email accepted by provider");
                Ok(Delivery { status })
            }
            DispatchResult::ProviderRejected { status, body } => {
                Err(PipelineError::ProviderRejected { status, body })
            }
        }
    }
}
