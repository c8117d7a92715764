//! Dashboard and onboarding endpoints

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;

use crate::{
    models::{CreateOrganizationRequest, Plan, Role},
    services::{access, OnboardingService},
    utils::{error::ONBOARDING_PATH, AppError, FlashRedirect},
    AppState, AuthUser,
};

const DASHBOARD_PATH: &str = "/app";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/onboarding", get(onboarding_status).post(create_organization))
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub org_id: uuid::Uuid,
    pub org_name: String,
    pub plan: Plan,
    pub role: Role,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct OnboardingView {
    pub email: String,
}

/// GET /app
async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardView>, AppError> {
    let ctx = access::resolve(&state.db, &user.identity).await?;

    Ok(Json(DashboardView {
        org_id: ctx.org_id,
        org_name: ctx.org_name,
        plan: ctx.plan,
        role: ctx.role,
        email: user.identity.email,
    }))
}

/// GET /app/onboarding
///
/// Identities that already belong to an organization go straight to the dashboard.
async fn onboarding_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    if access::try_resolve(&state.db, &user.identity).await?.is_some() {
        return Ok(FlashRedirect::to(DASHBOARD_PATH).into_response());
    }

    Ok(Json(OnboardingView {
        email: user.identity.email,
    })
    .into_response())
}

/// POST /app/onboarding
async fn create_organization(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<CreateOrganizationRequest>,
) -> Result<FlashRedirect, FlashRedirect> {
    OnboardingService::new(&state.db)
        .create_organization(&user.identity, &form.name)
        .await
        .map_err(|e| e.redirect_to(ONBOARDING_PATH))?;

    Ok(FlashRedirect::to(DASHBOARD_PATH))
}
