//! Billing actions: overview, checkout and customer portal

use tracing::info;

use super::{
    access,
    payments::{CheckoutRequest, PaymentProvider},
};
use crate::config::AppConfig;
use crate::db::{DbPool, OrganizationRepository, ProjectRepository};
use crate::models::{plan_features, BillingOverview, Identity, Plan, WriteAction};
use crate::utils::{AppError, AppResult};

/// Path of the billing settings page
pub const BILLING_PATH: &str = "/app/settings/billing";

const NOT_CONFIGURED: &str = "Stripe is not configured.";

/// Where a checkout attempt should send the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Organization is already on Pro; back to the billing page
    AlreadyPro,
    /// Hosted checkout page
    Redirect(String),
}

pub struct BillingService<'a> {
    pool: &'a DbPool,
    config: &'a AppConfig,
    payments: Option<&'a dyn PaymentProvider>,
}

impl<'a> BillingService<'a> {
    pub fn new(
        pool: &'a DbPool,
        config: &'a AppConfig,
        payments: Option<&'a dyn PaymentProvider>,
    ) -> Self {
        Self {
            pool,
            config,
            payments,
        }
    }

    pub async fn overview(&self, identity: &Identity) -> AppResult<BillingOverview> {
        let ctx = access::resolve(self.pool, identity).await?;
        let org = OrganizationRepository::new(self.pool)
            .get_by_id(ctx.org_id)
            .await?
            .ok_or(AppError::OnboardingRequired)?;
        let project_count = ProjectRepository::new(self.pool).count(org.id).await?;
        let free_limit = self.config.plans.free_project_limit;

        Ok(BillingOverview {
            plan: org.plan,
            subscription_status: org.subscription_status,
            current_period_end: org.current_period_end,
            project_count,
            project_limit: org.plan.project_limit(free_limit),
            has_billing_account: org.stripe_customer_id.is_some(),
            can_manage: ctx.role.can_write(),
            payments_configured: self.payments.is_some(),
            features: plan_features(free_limit),
        })
    }

    /// Start a Pro subscription checkout for the caller's organization
    pub async fn start_checkout(&self, identity: &Identity) -> AppResult<CheckoutOutcome> {
        let ctx = access::resolve(self.pool, identity).await?;
        access::require_write(&ctx, WriteAction::UpgradePlan)?;

        if ctx.plan == Plan::Pro {
            return Ok(CheckoutOutcome::AlreadyPro);
        }

        let (Some(payments), Some(billing)) = (self.payments, self.config.billing.as_ref()) else {
            return Err(AppError::config(NOT_CONFIGURED));
        };

        let org = OrganizationRepository::new(self.pool)
            .get_by_id(ctx.org_id)
            .await?
            .ok_or(AppError::OnboardingRequired)?;

        let request = CheckoutRequest {
            org_id: org.id,
            price_id: billing.pro_price_id.clone(),
            customer_email: org
                .stripe_customer_id
                .is_none()
                .then(|| identity.email.clone()),
            customer_id: org.stripe_customer_id,
            success_url: self.config.app_link(&format!("{}?success=1", BILLING_PATH)),
            cancel_url: self.config.app_link(&format!("{}?canceled=1", BILLING_PATH)),
        };

        let session = payments.create_checkout_session(&request).await?;
        let url = session
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::payment("Could not start checkout. Try again."))?;

        info!(org_id = %org.id, session_id = %session.id, "Checkout session created");
        Ok(CheckoutOutcome::Redirect(url))
    }

    /// Open the provider's self-service portal for the caller's organization
    pub async fn open_portal(&self, identity: &Identity) -> AppResult<String> {
        let ctx = access::resolve(self.pool, identity).await?;
        access::require_write(&ctx, WriteAction::ManageBilling)?;

        let Some(payments) = self.payments else {
            return Err(AppError::config(NOT_CONFIGURED));
        };

        let org = OrganizationRepository::new(self.pool)
            .get_by_id(ctx.org_id)
            .await?
            .ok_or(AppError::OnboardingRequired)?;
        let Some(customer_id) = org.stripe_customer_id.as_deref() else {
            return Err(AppError::bad_request(
                "No billing account found. Please upgrade first.",
            ));
        };

        let session = payments
            .create_portal_session(customer_id, &self.config.app_link(BILLING_PATH))
            .await?;

        info!(org_id = %org.id, "Billing portal session created");
        Ok(session.url)
    }
}
