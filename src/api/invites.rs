//! Invite link endpoints
//!
//! Both viewing and accepting need a session. Anonymous visitors are sent
//! to sign-in with the invite as the return path, so an invite URL alone
//! never reveals which organization it belongs to.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};

use crate::{
    models::{AcceptInviteRequest, InviteState},
    services::InviteService,
    utils::{error::LOGIN_PATH, AppError, FlashRedirect},
    AppState, AuthUser,
};

const AFTER_ACCEPT: &str = "/app";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accept", post(accept_invite))
        .route("/{token}", get(view_invite))
}

fn invite_path(token: &str) -> String {
    format!("/invite/{}", urlencoding::encode(token))
}

/// Sign-in page that returns to the invite afterwards
fn sign_in_first(token: &str) -> FlashRedirect {
    FlashRedirect::with_param(LOGIN_PATH, "next", &invite_path(token))
}

/// GET /invite/{token}
async fn view_invite(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(sign_in_first(&token).into_response());
    };

    let invite_state = InviteService::new(&state.db, &state.config.plans)
        .view(&user.identity, &token)
        .await?;

    if invite_state == InviteState::AlreadyMember {
        return Ok(FlashRedirect::to(AFTER_ACCEPT).into_response());
    }

    Ok(Json(invite_state).into_response())
}

/// POST /invite/accept
async fn accept_invite(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Form(form): Form<AcceptInviteRequest>,
) -> Result<FlashRedirect, FlashRedirect> {
    let token = form.token.trim();
    let Some(user) = user else {
        return Err(sign_in_first(token));
    };

    InviteService::new(&state.db, &state.config.plans)
        .accept(&user.identity, token)
        .await
        .map_err(|e| e.redirect_to(&invite_path(token)))?;

    Ok(FlashRedirect::to(AFTER_ACCEPT))
}
