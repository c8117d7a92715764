//! Error types and handling
//!
//! JSON endpoints render an [`AppError`] as a consistent [`ErrorResponse`] body.
//! Form endpoints turn the same error into a 303 redirect that carries the
//! message back to the page the form came from (see [`AppError::redirect_to`]).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::redirect::FlashRedirect;

/// Path of the onboarding page
pub const ONBOARDING_PATH: &str = "/app/onboarding";

/// Path of the sign-in page
pub const LOGIN_PATH: &str = "/login";

const GENERIC_FAILURE: &str = "Something went wrong. Try again.";

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized - no signed-in identity (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden - role does not allow the action (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict - resource already exists or state conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unprocessable entity - validation failed (422)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Plan limit reached (402)
    #[error("Plan limit: {0}")]
    LimitExceeded(String),

    /// Resource existed but is no longer usable (410)
    #[error("Gone: {0}")]
    Gone(String),

    /// Signed in but not a member of any organization
    #[error("Onboarding required")]
    OnboardingRequired,

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),

    /// Payment provider communication error (502)
    #[error("Payment provider error: {0}")]
    Payment(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn limit_exceeded(msg: impl Into<String>) -> Self {
        Self::LimitExceeded(msg.into())
    }

    pub fn gone(msg: impl Into<String>) -> Self {
        Self::Gone(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn payment(msg: impl Into<String>) -> Self {
        Self::Payment(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Status code, error type identifier and whether the error is server-side
    fn classify(&self) -> (StatusCode, &'static str, bool) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", false),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", false),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized", false),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", false),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict", false),
            AppError::ValidationError(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", false)
            }
            AppError::LimitExceeded(_) => (StatusCode::PAYMENT_REQUIRED, "plan_limit", false),
            AppError::Gone(_) => (StatusCode::GONE, "gone", false),
            AppError::OnboardingRequired => (StatusCode::SEE_OTHER, "onboarding_required", false),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", true),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error", true),
            AppError::Payment(_) => (StatusCode::BAD_GATEWAY, "payment_error", true),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", true),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.classify().0
    }

    /// Message safe to show to the user. Server-side failures never leak
    /// their details.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(m)
            | AppError::BadRequest(m)
            | AppError::Unauthorized(m)
            | AppError::Forbidden(m)
            | AppError::Conflict(m)
            | AppError::ValidationError(m)
            | AppError::LimitExceeded(m)
            | AppError::Gone(m)
            | AppError::Payment(m)
            | AppError::Config(m) => m.clone(),
            AppError::OnboardingRequired => "Create an organization to continue.".to_string(),
            AppError::Internal(_) | AppError::Database(_) => GENERIC_FAILURE.to_string(),
        }
    }

    /// Convert into a redirect back to `path` carrying the message as `?error=`.
    ///
    /// Missing identity always lands on the sign-in page and missing
    /// membership on onboarding, whatever page the form came from.
    pub fn redirect_to(self, path: &str) -> FlashRedirect {
        let (_, error_type, should_log) = self.classify();
        if should_log {
            error!(error = %self, error_type = error_type, "Request error");
        }

        match self {
            AppError::Unauthorized(_) => FlashRedirect::to(LOGIN_PATH),
            AppError::OnboardingRequired => FlashRedirect::to(ONBOARDING_PATH),
            other => FlashRedirect::with_error(path, &other.user_message()),
        }
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, should_log) = self.classify();

        if should_log {
            error!(error = %self, error_type = error_type, "Request error");
        }

        if let AppError::OnboardingRequired = self {
            return Redirect::to(ONBOARDING_PATH).into_response();
        }

        let body = ErrorResponse::new(error_type, self.user_message());
        (status, Json(body)).into_response()
    }
}

/// True when the error chain contains a store uniqueness violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if is_unique_violation(&err) {
            return AppError::Conflict("Resource already exists".to_string());
        }
        AppError::Internal(format!("{:#}", err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Resource already exists".to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Payment("Payment provider request timed out".to_string())
        } else if err.is_connect() {
            AppError::Payment("Failed to connect to payment provider".to_string())
        } else {
            AppError::Payment(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let first = err
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()));
        AppError::ValidationError(first.unwrap_or_else(|| err.to_string()))
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
