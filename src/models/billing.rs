//! Billing view and subscription mirror types

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Plan, PlanFeature};

/// Subscription state written onto an organization by the webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionMirror {
    pub plan: Plan,
    pub subscription_id: Option<String>,
    pub status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Billing settings page data
#[derive(Debug, Clone, Serialize)]
pub struct BillingOverview {
    pub plan: Plan,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub project_count: i64,
    pub project_limit: Option<i64>,
    pub has_billing_account: bool,
    pub can_manage: bool,
    pub payments_configured: bool,
    pub features: Vec<PlanFeature>,
}
