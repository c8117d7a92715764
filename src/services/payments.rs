//! Payment provider collaborator
//!
//! [`PaymentProvider`] is the seam the billing actions and the webhook
//! reconciliation talk to. [`StripeClient`] implements it against the
//! Stripe REST API; tests substitute a recording mock.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::utils::{AppError, AppResult};

/// Parameters for a Pro subscription checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub org_id: Uuid,
    pub price_id: String,
    /// Reused when the organization already has a provider customer
    pub customer_id: Option<String>,
    /// Prefilled when there is no customer yet
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalSession {
    pub id: String,
    pub url: String,
}

/// A field the provider returns either as a bare id or as an expanded object
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// Subscription as returned by the provider and carried in webhook events
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Expandable>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

impl Subscription {
    /// Period end of the first item, falling back to the subscription-level field
    pub fn period_end(&self) -> Option<i64> {
        self.items
            .data
            .first()
            .and_then(|item| item.current_period_end)
            .or(self.current_period_end)
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest)
        -> AppResult<CheckoutSession>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<PortalSession>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> AppResult<Subscription>;
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Stripe REST client
pub struct StripeClient {
    http: Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &BillingConfig) -> AppResult<Self> {
        if config.secret_key.trim().is_empty() {
            return Err(AppError::config("Stripe secret key is not set"));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encode_form(params))
            .send()
            .await?;

        Self::parse_response(path, response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse_response(path, response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                AppError::payment(format!("Unexpected payment provider response: {}", e))
            });
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<StripeErrorBody>(&body).ok();
        let message = detail
            .as_ref()
            .and_then(|d| d.error.message.clone())
            .unwrap_or_else(|| format!("Payment provider returned {}", status));
        tracing::warn!(
            %status,
            path,
            kind = detail.as_ref().and_then(|d| d.error.kind.as_deref()).unwrap_or("unknown"),
            "Payment provider request failed"
        );

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::not_found(message));
        }
        Err(AppError::payment(message))
    }
}

/// `application/x-www-form-urlencoded` body with bracketed keys left readable
fn encode_form(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            let key = urlencoding::encode(key)
                .replace("%5B", "[")
                .replace("%5D", "]");
            format!("{}={}", key, urlencoding::encode(value))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn checkout_params(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", request.price_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("client_reference_id", request.org_id.to_string()),
        ("metadata[org_id]", request.org_id.to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
    ];
    match (&request.customer_id, &request.customer_email) {
        (Some(customer), _) => params.push(("customer", customer.clone())),
        (None, Some(email)) => params.push(("customer_email", email.clone())),
        (None, None) => {}
    }
    params
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> AppResult<CheckoutSession> {
        self.post_form("/v1/checkout/sessions", &checkout_params(request))
            .await
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<PortalSession> {
        self.post_form(
            "/v1/billing_portal/sessions",
            &[
                ("customer", customer_id.to_string()),
                ("return_url", return_url.to_string()),
            ],
        )
        .await
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> AppResult<Subscription> {
        self.get(&format!(
            "/v1/subscriptions/{}",
            urlencoding::encode(subscription_id)
        ))
        .await
    }
}
