//! HTTP routes and handlers
//!
//! Public routes cover health checks, credential endpoints, invite links
//! and the payment webhook. Everything under `/app` needs a session.

use axum::{middleware, Router};

use crate::middleware::{
    rate_limit::{rate_limit_middleware, RateLimitState},
    require_auth_middleware,
    security_headers::{private_cache_control_middleware, security_headers_middleware},
    session_middleware,
};
use crate::AppState;

mod auth;
mod billing;
mod dashboard;
mod health;
mod invites;
mod projects;
mod team;
mod webhooks;

/// Public routes (no session required)
pub fn public_routes(rate_limit: Option<RateLimitState>) -> Router<AppState> {
    let mut auth_routes = auth::routes();
    if let Some(limiter) = rate_limit {
        auth_routes =
            auth_routes.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    Router::new()
        .merge(health::routes())
        .nest("/auth", auth_routes)
        .nest("/invite", invites::routes())
        // Signature verification instead of a session
        .nest("/api/stripe", webhooks::routes())
}

/// Routes scoped to the caller's organization
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .nest("/app", dashboard::routes())
        .nest("/app/projects", projects::routes())
        .nest("/app/settings/team", team::routes())
        .nest("/app/settings/billing", billing::routes())
        .layer(middleware::from_fn(private_cache_control_middleware))
        .layer(middleware::from_fn(require_auth_middleware))
}

/// The full application router with session resolution and security headers
pub fn router(state: AppState, rate_limit: Option<RateLimitState>) -> Router {
    Router::new()
        .merge(public_routes(rate_limit))
        .merge(protected_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state)
}
