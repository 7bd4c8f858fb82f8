//! Transport entry points.
//!
//! Both adapters decode their envelope into a raw JSON object, hand it to the
//! shared [`Pipeline`], and translate the typed outcome for their transport.

pub mod http;
pub mod pubsub;

use axum::{Json, Router, response::IntoResponse, routing::get};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::pipeline::{Delivery, Pipeline};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
}

/// Build the full relay router: HTTP send, Pub/Sub push, and health.
pub fn relay_routes(pipeline: Pipeline) -> Router {
    let state = AppState { pipeline };

    Router::new()
        .route("/health", get(health))
        .merge(http::routes())
        .merge(pubsub::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sendgrid-relay"
    }))
}

/// Emit one log record per invocation, keyed by a stable `outcome` label.
pub(crate) fn log_outcome(adapter: &'static str, outcome: &Result<Delivery, PipelineError>) {
    match outcome {
        Ok(delivery) => info!(
            adapter,
            outcome = "sent",
            status = delivery.status,
            "Email relayed"
        ),
        Err(err @ PipelineError::Validation(_)) => warn!(
            adapter,
            outcome = err.kind(),
            stage = %err.stage(),
            error = %err,
            "Rejected invalid request"
        ),
        Err(err) => error!(
            adapter,
            outcome = err.kind(),
            stage = %err.stage(),
            provider_status = ?err.provider_status(),
            retryable = err.is_retryable(),
            error = %err,
            "Email relay failed"
        ),
    }
}
