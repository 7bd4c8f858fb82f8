//! Queue-triggered adapter for Pub/Sub push subscriptions.
//!
//! The push endpoint receives an envelope whose `message.data` is a base64
//! JSON object carrying the send payload. Every delivery is logged with a
//! distinct `outcome`. Only transport failures towards the provider are
//! nacked (503) so that the subscription's own redelivery policy applies;
//! everything else is acknowledged because resending the same message cannot
//! change the result.

use std::collections::HashMap;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{Instrument, warn};
use uuid::Uuid;

use super::{AppState, log_outcome};
use crate::error::AdapterError;
use crate::pipeline::Pipeline;

/// Push request body sent by the Pub/Sub service.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PubsubMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// A single Pub/Sub message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubMessage {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// What the push endpoint tells the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Message is done with, successfully or not.
    Ack,
    /// Leave the message for redelivery.
    Nack,
}

impl IntoResponse for Ack {
    fn into_response(self) -> Response {
        match self {
            Ack::Ack => StatusCode::NO_CONTENT.into_response(),
            Ack::Nack => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/pubsub", post(receive_push))
}

async fn receive_push(State(state): State<AppState>, body: Bytes) -> Ack {
    let invocation_id = Uuid::new_v4();
    let span = tracing::info_span!("pubsub_push", %invocation_id);

    async move {
        match serde_json::from_slice::<PushEnvelope>(&body) {
            Ok(envelope) => {
                tracing::debug!(
                    message_id = envelope.message.message_id.as_deref().unwrap_or("-"),
                    subscription = envelope.subscription.as_deref().unwrap_or("-"),
                    publish_time = ?envelope.message.publish_time,
                    "Push message received"
                );
                handle_message(&state.pipeline, &envelope.message).await
            }
            Err(e) => {
                warn!(adapter = "pubsub", outcome = "malformed_envelope", error = %e, "Unparseable push envelope");
                Ack::Ack
            }
        }
    }
    .instrument(span)
    .await
}

/// Decode one message and run it through the pipeline.
pub async fn handle_message(pipeline: &Pipeline, message: &PubsubMessage) -> Ack {
    let raw = match decode_message_data(message) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                adapter = "pubsub",
                outcome = "malformed_envelope",
                message_id = message.message_id.as_deref().unwrap_or("-"),
                error = %e,
                "Dropping undecodable message"
            );
            return Ack::Ack;
        }
    };

    let outcome = pipeline.run(&raw).await;
    log_outcome("pubsub", &outcome);
    match outcome {
        Err(err) if err.is_retryable() => Ack::Nack,
        _ => Ack::Ack,
    }
}

/// base64 → UTF-8 → JSON object.
pub fn decode_message_data(message: &PubsubMessage) -> Result<Map<String, Value>, AdapterError> {
    let data = message
        .data
        .as_deref()
        .filter(|data| !data.is_empty())
        .ok_or(AdapterError::MissingData)?;
    let bytes = STANDARD.decode(data)?;
    let text = String::from_utf8(bytes)?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AdapterError::Json(format!(
            "expected an object, got {}",
            json_type(&other)
        ))),
        Err(e) => Err(AdapterError::Json(e.to_string())),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
