//! Sign-up, sign-in and sign-out form endpoints

use axum::{extract::State, http::HeaderMap, routing::post, Form, Router};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::{
    middleware::auth::{removal_cookie, session_cookie, session_token},
    models::CredentialsForm,
    utils::{error::LOGIN_PATH, validation::safe_next_path, AppError, FlashRedirect},
    AppState,
};

const REGISTER_PATH: &str = "/register";
const AFTER_REGISTER: &str = "/app/onboarding";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Page path that keeps the caller's `next` target across an error redirect
fn with_next(page: &str, next: Option<&str>) -> String {
    match next.map(str::trim).filter(|n| !n.is_empty()) {
        Some(next) => FlashRedirect::with_param(page, "next", next)
            .location()
            .to_string(),
        None => page.to_string(),
    }
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(CookieJar, FlashRedirect), FlashRedirect> {
    let back = with_next(LOGIN_PATH, form.next.as_deref());
    form.validate()
        .map_err(|e| AppError::from(e).redirect_to(&back))?;

    let session = state
        .identity
        .sign_in(&form.email, &form.password)
        .await
        .map_err(|e| e.redirect_to(&back))?;

    tracing::info!(user_id = %session.identity.id, "Signed in");
    let jar = jar.add(session_cookie(session.token, state.config.server.secure_cookies));
    Ok((jar, FlashRedirect::to(safe_next_path(form.next.as_deref()))))
}

/// POST /auth/register
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(CookieJar, FlashRedirect), FlashRedirect> {
    let back = with_next(REGISTER_PATH, form.next.as_deref());
    form.validate()
        .map_err(|e| AppError::from(e).redirect_to(&back))?;

    let session = state
        .identity
        .sign_up(&form.email, &form.password)
        .await
        .map_err(|e| e.redirect_to(&back))?;

    // An explicit next (e.g. an invite link) wins over onboarding.
    let target = match form.next.as_deref().map(str::trim) {
        Some(next) if !next.is_empty() => safe_next_path(Some(next)),
        _ => AFTER_REGISTER.to_string(),
    };

    let jar = jar.add(session_cookie(session.token, state.config.server.secure_cookies));
    Ok((jar, FlashRedirect::to(target)))
}

/// POST /auth/logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, FlashRedirect) {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.identity.sign_out(&token).await {
            tracing::warn!(error = %e, "Failed to revoke session on sign-out");
        }
    }

    (jar.remove(removal_cookie()), FlashRedirect::to(LOGIN_PATH))
}
