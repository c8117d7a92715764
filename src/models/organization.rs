//! Organization (tenant) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription tier of an organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    /// Plan implied by a provider subscription status. Only `active` and
    /// `trialing` keep Pro; everything else (past_due, canceled, ...) is Free.
    pub fn from_subscription_status(status: &str) -> Self {
        match status {
            "active" | "trialing" => Plan::Pro,
            _ => Plan::Free,
        }
    }

    /// Project limit for this plan, `None` meaning unlimited
    pub fn project_limit(&self, free_limit: i64) -> Option<i64> {
        match self {
            Plan::Free => Some(free_limit),
            Plan::Pro => None,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            _ => Err(format!("Invalid plan: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub plan: Plan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationRequest {
    #[serde(default)]
    pub name: String,
}

/// One row of the Free vs Pro comparison shown on the billing page
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlanFeature {
    pub feature: &'static str,
    pub free: String,
    pub pro: String,
}

pub fn plan_features(free_project_limit: i64) -> Vec<PlanFeature> {
    vec![
        PlanFeature {
            feature: "Projects",
            free: format!("Up to {}", free_project_limit),
            pro: "Unlimited".to_string(),
        },
        PlanFeature {
            feature: "Team members",
            free: "Unlimited".to_string(),
            pro: "Unlimited".to_string(),
        },
        PlanFeature {
            feature: "Invite links",
            free: "Yes".to_string(),
            pro: "Yes".to_string(),
        },
    ]
}
