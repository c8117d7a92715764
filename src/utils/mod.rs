//! Shared utilities: errors, redirects and input validation

pub mod error;
pub mod redirect;
pub mod validation;

pub use error::{AppError, AppResult, ErrorResponse};
pub use redirect::FlashRedirect;
