//! Mail dispatch through the SendGrid v3 API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::DispatchError;
use crate::request::EmailSendRequest;

const PROVIDER: &str = "sendgrid";

/// Outcome of a provider call that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// Provider accepted the message.
    Sent { status: u16 },
    /// Provider evaluated and declined the message.
    ProviderRejected { status: u16, body: String },
}

/// Sends a normalized request to the email provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Make a single send attempt authenticated with `api_key`.
    async fn dispatch(
        &self,
        request: &EmailSendRequest,
        api_key: &SecretString,
    ) -> Result<DispatchResult, DispatchError>;
}

// ── Wire format ─────────────────────────────────────────────────────

/// Body of `POST /v3/mail/send`.
#[derive(Debug, Serialize)]
pub struct SendGridMessage<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    mime_type: &'static str,
    value: &'a str,
}

impl<'a> From<&'a EmailSendRequest> for SendGridMessage<'a> {
    fn from(request: &'a EmailSendRequest) -> Self {
        Self {
            personalizations: [Personalization {
                to: [Address {
                    email: &request.to_address,
                }],
            }],
            from: Address {
                email: &request.from_address,
            },
            subject: &request.subject,
            content: [Content {
                mime_type: "text/plain",
                value: &request.plain_text_content,
            }],
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// SendGrid HTTP client.
pub struct SendGridMailer {
    client: reqwest::Client,
    api_base: String,
}

impl SendGridMailer {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    fn send_url(&self) -> String {
        format!("{}/mail/send", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn dispatch(
        &self,
        request: &EmailSendRequest,
        api_key: &SecretString,
    ) -> Result<DispatchResult, DispatchError> {
        let resp = self
            .client
            .post(self.send_url())
            .bearer_auth(api_key.expose_secret())
            .json(&SendGridMessage::from(request))
            .send()
            .await
            .map_err(|e| DispatchError::from_reqwest(PROVIDER, e))?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "SendGrid accepted message");
            return Ok(DispatchResult::Sent {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| DispatchError::from_reqwest(PROVIDER, e))?;
        Ok(DispatchResult::ProviderRejected {
            status: status.as_u16(),
            body,
        })
    }
}
