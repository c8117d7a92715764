//! Subscription sync
//!
//! Keeps the plan mirror on each organization consistent with the payment
//! provider. Events arrive as signed webhooks; the provider is the source
//! of truth and its events are applied idempotently (last write wins).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::payments::{Expandable, PaymentProvider, Subscription};
use crate::db::{DbPool, OrganizationRepository};
use crate::models::{Plan, SubscriptionMirror};
use crate::utils::AppResult;

type HmacSha256 = Hmac<Sha256>;

/// Name of the signature header sent with every webhook
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    OutsideTolerance,
    #[error("no matching signature")]
    Mismatch,
}

/// Verify a `t=<unix>,v1=<hex>[,v1=<hex>...]` signature over `"<t>.<payload>"`.
///
/// Any matching `v1` entry is accepted; comparison is constant-time.
pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::OutsideTolerance);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|expected| mac.clone().verify_slice(&expected).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Compute the header value a provider would send (used by tests and tooling)
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    #[serde(default)]
    client_reference_id: Option<String>,
    #[serde(default)]
    customer: Option<Expandable>,
    #[serde(default)]
    subscription: Option<Expandable>,
}

/// Events the service reacts to
#[derive(Debug, Clone)]
pub enum BillingEvent {
    CheckoutCompleted {
        org_id: Option<String>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },
    SubscriptionUpdated(Subscription),
    SubscriptionDeleted(Subscription),
    /// Any other event type; acknowledged and otherwise ignored
    Other(String),
}

/// Parse a verified webhook body. Returns the event id alongside the event.
pub fn parse_event(payload: &[u8]) -> Result<(String, BillingEvent), serde_json::Error> {
    let raw: RawEvent = serde_json::from_slice(payload)?;

    let event = match raw.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject = serde_json::from_value(raw.data.object)?;
            BillingEvent::CheckoutCompleted {
                org_id: session.client_reference_id,
                customer_id: session.customer.map(|c| c.id().to_string()),
                subscription_id: session.subscription.map(|s| s.id().to_string()),
            }
        }
        "customer.subscription.updated" => {
            BillingEvent::SubscriptionUpdated(serde_json::from_value(raw.data.object)?)
        }
        "customer.subscription.deleted" => {
            BillingEvent::SubscriptionDeleted(serde_json::from_value(raw.data.object)?)
        }
        _ => BillingEvent::Other(raw.event_type),
    };

    Ok((raw.id, event))
}

/// What reconciliation did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Number of organizations written
    Applied(u64),
    /// Recognized event that did not identify an organization
    Skipped(&'static str),
    Ignored,
}

fn timestamp_to_datetime(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| DateTime::from_timestamp(t, 0))
}

pub struct SubscriptionSync<'a> {
    pool: &'a DbPool,
    payments: Option<&'a dyn PaymentProvider>,
}

impl<'a> SubscriptionSync<'a> {
    pub fn new(pool: &'a DbPool, payments: Option<&'a dyn PaymentProvider>) -> Self {
        Self { pool, payments }
    }

    pub async fn apply(&self, event: BillingEvent) -> AppResult<SyncOutcome> {
        let orgs = OrganizationRepository::new(self.pool);

        match event {
            BillingEvent::CheckoutCompleted {
                org_id,
                customer_id,
                subscription_id,
            } => {
                let Some(org_id) = org_id.as_deref().and_then(|id| Uuid::parse_str(id).ok())
                else {
                    return Ok(SyncOutcome::Skipped("checkout without organization reference"));
                };

                let Some(sub_id) = subscription_id.as_deref() else {
                    warn!(%org_id, "Checkout completed without a subscription, plan unchanged");
                    return Ok(SyncOutcome::Skipped("checkout without subscription"));
                };
                let Some(subscription) = self.confirmed_subscription(sub_id).await else {
                    warn!(%org_id, subscription_id = %sub_id, "Checkout not confirmed by provider, plan unchanged");
                    return Ok(SyncOutcome::Skipped("subscription not retrievable"));
                };

                let status = subscription.status.clone().unwrap_or_default();
                let mirror = SubscriptionMirror {
                    plan: Plan::Pro,
                    current_period_end: timestamp_to_datetime(subscription.period_end()),
                    subscription_id: Some(subscription.id),
                    status: Some(status),
                };

                if !orgs
                    .record_checkout(org_id, customer_id.as_deref(), &mirror)
                    .await?
                {
                    warn!(%org_id, "Checkout completed for unknown organization");
                    return Ok(SyncOutcome::Applied(0));
                }

                info!(%org_id, customer_id = ?customer_id, "Organization upgraded to pro");
                Ok(SyncOutcome::Applied(1))
            }

            BillingEvent::SubscriptionUpdated(subscription) => {
                let Some(customer_id) = subscription.customer.as_ref().map(|c| c.id().to_string())
                else {
                    return Ok(SyncOutcome::Skipped("subscription without customer"));
                };

                let status = subscription.status.clone().unwrap_or_default();
                let mirror = SubscriptionMirror {
                    plan: Plan::from_subscription_status(&status),
                    current_period_end: timestamp_to_datetime(subscription.period_end()),
                    subscription_id: Some(subscription.id),
                    status: Some(status),
                };

                let updated = orgs
                    .update_subscription_by_customer(&customer_id, &mirror)
                    .await?;
                info!(
                    %customer_id,
                    status = ?mirror.status,
                    plan = %mirror.plan,
                    updated,
                    "Subscription updated"
                );
                Ok(SyncOutcome::Applied(updated))
            }

            BillingEvent::SubscriptionDeleted(subscription) => {
                let Some(customer_id) = subscription.customer.as_ref().map(|c| c.id().to_string())
                else {
                    return Ok(SyncOutcome::Skipped("subscription without customer"));
                };

                let mirror = SubscriptionMirror {
                    plan: Plan::Free,
                    subscription_id: None,
                    status: Some("canceled".to_string()),
                    current_period_end: None,
                };

                let updated = orgs
                    .update_subscription_by_customer(&customer_id, &mirror)
                    .await?;
                info!(%customer_id, updated, "Subscription canceled, organization reverted to free");
                Ok(SyncOutcome::Applied(updated))
            }

            BillingEvent::Other(event_type) => {
                info!(%event_type, "Ignoring webhook event");
                Ok(SyncOutcome::Ignored)
            }
        }
    }

    /// The subscription behind a completed checkout, if the provider confirms it
    async fn confirmed_subscription(&self, subscription_id: &str) -> Option<Subscription> {
        let Some(payments) = self.payments else {
            warn!(%subscription_id, "Payments not configured, cannot confirm subscription");
            return None;
        };

        match payments.retrieve_subscription(subscription_id).await {
            Ok(sub) => Some(sub),
            Err(e) => {
                warn!(%subscription_id, error = %e, "Could not retrieve subscription");
                None
            }
        }
    }
}
