//! Payment provider webhook endpoint
//!
//! Signature verification runs over the raw body bytes before anything is
//! parsed. Once an event is verified and parsed it is always acknowledged,
//! even when reconciliation fails, so the provider does not retry it.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::{
    services::subscription_sync::{self, SyncOutcome, SIGNATURE_HEADER},
    services::SubscriptionSync,
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_stripe_webhook))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// POST /api/stripe/webhook
async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), AppError> {
    let Some(billing) = state
        .config
        .billing
        .as_ref()
        .filter(|b| !b.webhook_secret.is_empty())
    else {
        tracing::error!("Webhook received but no webhook secret is configured");
        return Err(AppError::config("Webhook secret is not configured"));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = subscription_sync::verify_signature(
        &body,
        signature,
        &billing.webhook_secret,
        billing.webhook_tolerance_secs,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!(error = %e, "Rejected webhook with invalid signature");
        return Err(AppError::bad_request("Invalid webhook signature"));
    }

    let (event_id, event) = subscription_sync::parse_event(&body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse webhook payload");
        AppError::bad_request("Invalid webhook payload")
    })?;

    match SubscriptionSync::new(&state.db, state.payments())
        .apply(event)
        .await
    {
        Ok(SyncOutcome::Applied(updated)) => {
            tracing::debug!(%event_id, updated, "Webhook event applied");
        }
        Ok(SyncOutcome::Skipped(reason)) => {
            tracing::warn!(%event_id, reason, "Webhook event skipped");
        }
        Ok(SyncOutcome::Ignored) => {
            tracing::info!(%event_id, "Webhook event ignored");
        }
        Err(e) => {
            tracing::error!(%event_id, error = %e, "Failed to apply webhook event");
        }
    }

    Ok((StatusCode::OK, Json(WebhookAck { received: true })))
}
