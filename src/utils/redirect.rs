//! Post/redirect/get responses for form endpoints

use axum::response::{IntoResponse, Redirect, Response};

/// A 303 redirect, optionally carrying a query message for the target page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashRedirect {
    location: String,
}

impl FlashRedirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            location: path.into(),
        }
    }

    /// Redirect to `path` with `?error=<message>`
    pub fn with_error(path: &str, message: &str) -> Self {
        Self::with_param(path, "error", message)
    }

    /// Redirect to `path` with a single URL-encoded query parameter appended
    pub fn with_param(path: &str, key: &str, value: &str) -> Self {
        let separator = if path.contains('?') { '&' } else { '?' };
        Self {
            location: format!(
                "{}{}{}={}",
                path,
                separator,
                key,
                urlencoding::encode(value)
            ),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&self.location).into_response()
    }
}
