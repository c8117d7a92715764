//! Test fixtures for common test data
//!
//! Fixed credentials and payment provider event payloads.

use serde_json::json;
use uuid::Uuid;

/// Password used for every test account
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Webhook event payloads shaped like the provider's
pub struct EventFixtures;

impl EventFixtures {
    pub fn checkout_completed(org_id: Uuid, customer_id: &str, subscription_id: &str) -> String {
        Self::checkout_event(json!(org_id.to_string()), customer_id, subscription_id)
    }

    /// Checkout session that carries no organization reference
    pub fn checkout_without_org(customer_id: &str, subscription_id: &str) -> String {
        Self::checkout_event(serde_json::Value::Null, customer_id, subscription_id)
    }

    pub fn subscription_updated(
        subscription_id: &str,
        customer_id: &str,
        status: &str,
        current_period_end: i64,
    ) -> String {
        Self::subscription_event(
            "customer.subscription.updated",
            subscription_id,
            customer_id,
            status,
            current_period_end,
        )
    }

    pub fn subscription_deleted(subscription_id: &str, customer_id: &str) -> String {
        Self::subscription_event(
            "customer.subscription.deleted",
            subscription_id,
            customer_id,
            "canceled",
            0,
        )
    }

    pub fn unrelated(event_type: &str) -> String {
        json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "type": event_type,
            "data": { "object": { "id": "in_123", "object": "invoice" } }
        })
        .to_string()
    }

    fn checkout_event(
        client_reference_id: serde_json::Value,
        customer_id: &str,
        subscription_id: &str,
    ) -> String {
        json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "object": "checkout.session",
                    "client_reference_id": client_reference_id,
                    "customer": customer_id,
                    "subscription": subscription_id
                }
            }
        })
        .to_string()
    }

    fn subscription_event(
        event_type: &str,
        subscription_id: &str,
        customer_id: &str,
        status: &str,
        current_period_end: i64,
    ) -> String {
        json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "type": event_type,
            "data": {
                "object": {
                    "id": subscription_id,
                    "object": "subscription",
                    "customer": customer_id,
                    "status": status,
                    "items": {
                        "data": [ { "current_period_end": current_period_end } ]
                    }
                }
            }
        })
        .to_string()
    }
}
