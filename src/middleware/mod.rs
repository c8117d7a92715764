//! Middleware components
//!
//! This module contains middleware for:
//! - Session resolution and the authenticated-user extractor
//! - Security and cache headers
//! - Rate limiting of the credential endpoints

pub mod auth;
pub mod rate_limit;
pub mod security_headers;

pub use auth::{require_auth_middleware, session_middleware, AuthUser};
