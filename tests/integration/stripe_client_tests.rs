//! Stripe REST client against a local mock server

use corppad::{
    config::BillingConfig,
    services::{payments::CheckoutRequest, PaymentProvider, StripeClient},
    utils::AppError,
};
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::{test_billing_config, TEST_APP_URL, TEST_PRICE_ID};

fn client(server: &MockServer) -> StripeClient {
    let config = BillingConfig {
        api_base: format!("{}/", server.uri()),
        ..test_billing_config()
    };
    StripeClient::new(&config).unwrap()
}

fn checkout_request(customer_id: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        org_id: Uuid::new_v4(),
        price_id: TEST_PRICE_ID.to_string(),
        customer_id: customer_id.map(str::to_string),
        customer_email: Some("owner@corppad.test".to_string()),
        success_url: format!("{}/app/settings/billing?success=1", TEST_APP_URL),
        cancel_url: format!("{}/app/settings/billing?canceled=1", TEST_APP_URL),
    }
}

#[tokio::test]
async fn test_checkout_session_request() {
    let server = MockServer::start().await;
    let request = checkout_request(None);

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("mode=subscription"))
        .and(body_string_contains("line_items[0][price]=price_pro_monthly"))
        .and(body_string_contains("line_items[0][quantity]=1"))
        .and(body_string_contains(format!(
            "client_reference_id={}",
            request.org_id
        )))
        .and(body_string_contains("customer_email=owner%40corppad.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client(&server)
        .create_checkout_session(&request)
        .await
        .unwrap();
    assert_eq!(session.id, "cs_test_1");
    assert_eq!(
        session.url.as_deref(),
        Some("https://checkout.stripe.com/c/pay/cs_test_1")
    );
}

#[tokio::test]
async fn test_checkout_session_reuses_customer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(body_string_contains("customer=cus_existing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_2",
            "url": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client(&server)
        .create_checkout_session(&checkout_request(Some("cus_existing")))
        .await
        .unwrap();
    assert!(session.url.is_none());
}

#[tokio::test]
async fn test_portal_session_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/billing_portal/sessions"))
        .and(body_string_contains("customer=cus_42"))
        .and(body_string_contains(
            "return_url=http%3A%2F%2Fcorppad.test%2Fapp%2Fsettings%2Fbilling",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "bps_1",
            "object": "billing_portal.session",
            "url": "https://billing.stripe.com/p/session/bps_1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client(&server)
        .create_portal_session("cus_42", &format!("{}/app/settings/billing", TEST_APP_URL))
        .await
        .unwrap();
    assert_eq!(session.url, "https://billing.stripe.com/p/session/bps_1");
}

#[tokio::test]
async fn test_retrieve_subscription() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/subscriptions/sub_77"))
        .and(header("authorization", "Bearer sk_test_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sub_77",
            "object": "subscription",
            "customer": { "id": "cus_77", "object": "customer" },
            "status": "trialing",
            "items": { "data": [ { "current_period_end": 1_900_000_000 } ] }
        })))
        .mount(&server)
        .await;

    let subscription = client(&server)
        .retrieve_subscription("sub_77")
        .await
        .unwrap();
    assert_eq!(subscription.status.as_deref(), Some("trialing"));
    assert_eq!(subscription.customer.as_ref().unwrap().id(), "cus_77");
    assert_eq!(subscription.period_end(), Some(1_900_000_000));
}

#[tokio::test]
async fn test_provider_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "message": "No such price: 'price_pro_monthly'"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_checkout_session(&checkout_request(None))
        .await
        .unwrap_err();
    match err {
        AppError::Payment(message) => {
            assert_eq!(message, "No such price: 'price_pro_monthly'")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_subscription_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/subscriptions/sub_gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "type": "invalid_request_error", "message": "No such subscription" }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .retrieve_subscription("sub_gone")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_unexpected_body_is_payment_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/billing_portal/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_portal_session("cus_1", TEST_APP_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Payment(_)));
}
