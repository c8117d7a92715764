//! Session middleware
//!
//! The session token travels in an HttpOnly cookie (browser forms) or an
//! `Authorization: Bearer` header (scripted clients). [`session_middleware`]
//! resolves it through the identity provider on every request and stores
//! the result in request extensions; [`require_auth_middleware`] guards the
//! `/app` routes; [`AuthUser`] is the handler-side extractor.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::models::Identity;
use crate::utils::{error::LOGIN_PATH, FlashRedirect};
use crate::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "corppad_session";

/// Authenticated identity plus the token that proved it
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub session_token: String,
}

impl AuthUser {
    pub fn id(&self) -> uuid::Uuid {
        self.identity.id
    }
}

/// Redirect to the sign-in page, remembering where the visitor was going
#[derive(Debug)]
pub struct LoginRedirect {
    next: Option<String>,
}

impl LoginRedirect {
    fn for_request(method: &Method, path_and_query: Option<&str>) -> Self {
        // Only GETs can be replayed after signing in.
        let next = (method == Method::GET)
            .then(|| path_and_query.map(str::to_string))
            .flatten();
        Self { next }
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        match self.next {
            Some(next) => FlashRedirect::with_param(LOGIN_PATH, "next", &next).into_response(),
            None => FlashRedirect::to(LOGIN_PATH).into_response(),
        }
    }
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Session token from the cookie, falling back to a bearer header
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .map(str::to_string)
}

/// Cookie carrying a freshly issued session token
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie that clears the session on the client
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Resolve the session, if any, and attach the [`AuthUser`] to the request.
///
/// Never rejects: anonymous requests pass through without an identity.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers()) {
        match state.identity.current_identity(&token).await {
            Ok(Some(identity)) => {
                request.extensions_mut().insert(AuthUser {
                    identity,
                    session_token: token,
                });
            }
            Ok(None) => tracing::debug!("Ignoring invalid or revoked session token"),
            Err(e) => tracing::error!(error = %e, "Failed to resolve session"),
        }
    }

    next.run(request).await
}

/// Reject requests without a resolved identity by redirecting to sign-in
pub async fn require_auth_middleware(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthUser>().is_some() {
        return next.run(request).await;
    }

    LoginRedirect::for_request(
        request.method(),
        request.uri().path_and_query().map(|pq| pq.as_str()),
    )
    .into_response()
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            LoginRedirect::for_request(
                &parts.method,
                parts.uri.path_and_query().map(|pq| pq.as_str()),
            )
        })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}
