//! Billing settings endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::{
    models::BillingOverview,
    services::{billing::BILLING_PATH, BillingService, CheckoutOutcome},
    utils::{AppError, FlashRedirect},
    AppState, AuthUser,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(billing_overview))
        .route("/checkout", post(start_checkout))
        .route("/portal", post(open_portal))
}

/// GET /app/settings/billing
async fn billing_overview(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BillingOverview>, AppError> {
    let overview = BillingService::new(&state.db, &state.config, state.payments())
        .overview(&user.identity)
        .await?;
    Ok(Json(overview))
}

/// POST /app/settings/billing/checkout
async fn start_checkout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<FlashRedirect, FlashRedirect> {
    let outcome = BillingService::new(&state.db, &state.config, state.payments())
        .start_checkout(&user.identity)
        .await
        .map_err(|e| e.redirect_to(BILLING_PATH))?;

    Ok(match outcome {
        CheckoutOutcome::AlreadyPro => FlashRedirect::to(BILLING_PATH),
        CheckoutOutcome::Redirect(url) => FlashRedirect::to(url),
    })
}

/// POST /app/settings/billing/portal
async fn open_portal(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<FlashRedirect, FlashRedirect> {
    let url = BillingService::new(&state.db, &state.config, state.payments())
        .open_portal(&user.identity)
        .await
        .map_err(|e| e.redirect_to(BILLING_PATH))?;

    Ok(FlashRedirect::to(url))
}
