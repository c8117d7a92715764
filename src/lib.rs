//! Corppad library
//!
//! Multi-tenant workspace service: organizations with single-organization
//! membership, owner/admin/member roles, projects, invite links and
//! Free/Pro subscription billing.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::AuthUser;
use services::{IdentityProvider, PaymentProvider};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Identity collaborator (sign-up, sign-in, sessions, emails)
    pub identity: Arc<dyn IdentityProvider>,
    /// Payment collaborator; `None` when billing is not configured
    pub payments: Option<Arc<dyn PaymentProvider>>,
}

impl AppState {
    pub fn payments(&self) -> Option<&dyn PaymentProvider> {
        self.payments.as_deref()
    }
}
