//! HTTP surface for Pub/Sub push delivery.
//!
//! The broker's durability model hangs on the status codes returned here:
//! 204 acknowledges the notification, anything else forces an at-least-once
//! redelivery.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::Config;
use crate::gmail_api::MailApi;
use crate::ingestion;
use crate::types::PushEnvelope;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn MailApi>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/v1/webhooks/gmail", post(handle_gmail_webhook))
        .with_state(state)
}

pub async fn serve(config: &Config, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// Health check endpoint for monitoring availability
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// Success acknowledges the delivery (204 No Content); any failure returns
// 500 so Pub/Sub redelivers the notification.
async fn handle_gmail_webhook(
    State(state): State<AppState>,
    Json(envelope): Json<PushEnvelope>,
) -> StatusCode {
    info!("gmail webhook received, starting ingestion");

    match ingestion::process_webhook(state.api.as_ref(), &envelope).await {
        Ok(messages) => {
            info!("successfully processed {} messages", messages.len());
            StatusCode::NO_CONTENT
        }
        Err(e) => {
            error!(
                retryable = e.is_retryable(),
                "error processing webhook: {}", e
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
