//! HTTP-triggered adapter.
//!
//! Accepts the send payload as a JSON body, URL query parameters, or both.
//! Body values win over query values for the same key.

use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Map, Value, json};
use tracing::Instrument;
use uuid::Uuid;

use super::{AppState, log_outcome};
use crate::error::{PipelineError, ValidationError};
use crate::pipeline::Delivery;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(send_email))
        .route("/send", post(send_email))
}

async fn send_email(
    State(state): State<AppState>,
    Query(args): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let invocation_id = Uuid::new_v4();
    let span = tracing::info_span!("http_send", %invocation_id);

    async move {
        let outcome = match merge_payload(&body, args) {
            Some(raw) => state.pipeline.run(&raw).await,
            None => Err(PipelineError::Validation(ValidationError::EmptyPayload)),
        };
        log_outcome("http", &outcome);
        outcome_response(outcome)
    }
    .instrument(span)
    .await
}

/// Combine the JSON body and query parameters into one raw payload.
///
/// A body that is not a JSON object is ignored, and a `null` body value
/// yields to the query value for the same key. Returns `None` when neither
/// source carries anything.
fn merge_payload(body: &[u8], args: HashMap<String, String>) -> Option<Map<String, Value>> {
    let mut raw = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    if raw.is_empty() && args.is_empty() {
        return None;
    }
    for (key, value) in args {
        if matches!(raw.get(&key), None | Some(Value::Null)) {
            raw.insert(key, Value::String(value));
        }
    }
    Some(raw)
}

/// Translate a pipeline outcome into the HTTP response contract.
pub fn outcome_response(outcome: Result<Delivery, PipelineError>) -> Response {
    match outcome {
        Ok(delivery) => (
            StatusCode::OK,
            Json(json!({"status": "sent", "provider_status": delivery.status})),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &PipelineError) -> Response {
    let (status, body) = match err {
        PipelineError::Validation(e) => (
            StatusCode::BAD_REQUEST,
            json!({"error": e.to_string(), "field": e.field()}),
        ),
        // Never echo the backend reason: it names resource paths.
        PipelineError::SecretAccess(e) if e.is_permission() => (
            StatusCode::FORBIDDEN,
            json!({"error": "access to the provider API key was denied"}),
        ),
        PipelineError::SecretAccess(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "unable to retrieve the provider API key"}),
        ),
        PipelineError::Dispatch(_) => (
            StatusCode::BAD_GATEWAY,
            json!({"error": "email provider could not be reached"}),
        ),
        PipelineError::ProviderRejected { status, body } => (
            StatusCode::BAD_GATEWAY,
            json!({
                "error": "email provider rejected the message",
                "provider_status": status,
                "provider_body": body,
            }),
        ),
    };
    (status, Json(body)).into_response()
}
