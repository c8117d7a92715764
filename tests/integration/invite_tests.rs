//! Invite lifecycle: view, accept, expiry, single use

use chrono::{Duration, Utc};

use crate::common::{TeamFactory, TestApp};

async fn expire_invite(app: &TestApp, token: &str) {
    let past = (Utc::now() - Duration::days(1))
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
    sqlx::query("UPDATE invites SET expires_at = ? WHERE token = ?")
        .bind(past)
        .bind(token)
        .execute(&app.state.db)
        .await
        .unwrap();
}

/// Invite state as seen by a signed-in account outside the organization
async fn view_as_outsider(app: &TestApp, token: &str) -> serde_json::Value {
    let viewer = TeamFactory::new(app).outsider().await;
    app.get(&format!("/invite/{}", token), Some(&viewer))
        .await
        .assert_ok()
        .json()
}

#[tokio::test]
async fn test_anonymous_view_goes_to_login() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "admin").await;

    let response = app.get(&format!("/invite/{}", token), None).await;
    response.assert_status(axum::http::StatusCode::SEE_OTHER);
    assert!(response.location().starts_with("/login?next="));
    assert_eq!(
        response.location_param("next"),
        Some(format!("/invite/{}", token))
    );
    assert!(!response.text().contains("admin"));

    assert_eq!(view_as_outsider(&app, &token).await["state"], "ready");
}

#[tokio::test]
async fn test_signed_in_view_shows_org_and_role() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "admin").await;

    let view = view_as_outsider(&app, &token).await;
    assert_eq!(view["state"], "ready");
    assert_eq!(view["role"], "admin");
    assert!(view["org_name"].as_str().is_some());
}

#[tokio::test]
async fn test_unknown_token_is_invalid() {
    let app = TestApp::new().await;

    assert_eq!(view_as_outsider(&app, "nope").await["state"], "invalid");
}

#[tokio::test]
async fn test_viewing_does_not_consume_invite() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "member").await;
    let viewer = factory.outsider().await;
    let path = format!("/invite/{}", token);

    for _ in 0..3 {
        let view: serde_json::Value = app.get(&path, Some(&viewer)).await.assert_ok().json();
        assert_eq!(view["state"], "ready");
    }

    app.post_form("/invite/accept", Some(&viewer), &[("token", &token)])
        .await
        .assert_redirect_to("/app");
}

#[tokio::test]
async fn test_accept_joins_with_invited_role() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "admin").await;
    let joiner = factory.outsider().await;

    app.post_form("/invite/accept", Some(&joiner), &[("token", &token)])
        .await
        .assert_redirect_to("/app");

    let dashboard: serde_json::Value = app.get("/app", Some(&joiner)).await.assert_ok().json();
    assert_eq!(dashboard["role"], "admin");
    assert_eq!(dashboard["org_id"], app.org_id_of(&owner).await.to_string().as_str());

    assert_eq!(view_as_outsider(&app, &token).await["state"], "already_used");
}

#[tokio::test]
async fn test_used_invite_cannot_be_reused() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "member").await;

    let first = factory.outsider().await;
    app.post_form("/invite/accept", Some(&first), &[("token", &token)])
        .await
        .assert_redirect_to("/app");

    let second = factory.outsider().await;
    app.post_form("/invite/accept", Some(&second), &[("token", &token)])
        .await
        .assert_flash_error(
            &format!("/invite/{}", token),
            "This invite has already been used.",
        );
    app.get("/app", Some(&second))
        .await
        .assert_redirect_to("/app/onboarding");
}

#[tokio::test]
async fn test_expired_invite_is_rejected() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "member").await;
    expire_invite(&app, &token).await;

    assert_eq!(view_as_outsider(&app, &token).await["state"], "expired");

    let joiner = factory.outsider().await;
    app.post_form("/invite/accept", Some(&joiner), &[("token", &token)])
        .await
        .assert_flash_error(&format!("/invite/{}", token), "This invite link has expired.");
}

#[tokio::test]
async fn test_accept_without_session_goes_to_login() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "member").await;

    let response = app
        .post_form("/invite/accept", None, &[("token", &token)])
        .await;
    response.assert_status(axum::http::StatusCode::SEE_OTHER);
    assert!(response.location().starts_with("/login?next="));
    assert_eq!(
        response.location_param("next"),
        Some(format!("/invite/{}", token))
    );
}

#[tokio::test]
async fn test_existing_member_is_redirected_and_token_consumed() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "member").await;
    let path = format!("/invite/{}", token);

    app.get(&path, Some(&owner)).await.assert_redirect_to("/app");

    app.post_form("/invite/accept", Some(&owner), &[("token", &token)])
        .await
        .assert_redirect_to("/app");

    assert_eq!(view_as_outsider(&app, &token).await["state"], "already_used");

    // Role unchanged
    let dashboard: serde_json::Value = app.get("/app", Some(&owner)).await.json();
    assert_eq!(dashboard["role"], "owner");
}

#[tokio::test]
async fn test_member_of_another_org_cannot_accept() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let alice = factory.owner().await;
    let bob = factory.owner().await;
    let token = factory.invite_token(&alice, "member").await;

    app.post_form("/invite/accept", Some(&bob), &[("token", &token)])
        .await
        .assert_flash_error(
            &format!("/invite/{}", token),
            "You already belong to another organization.",
        );

    assert_eq!(view_as_outsider(&app, &token).await["state"], "ready");
}

#[tokio::test]
async fn test_concurrent_accepts_admit_exactly_one() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "member").await;

    let first = factory.outsider().await;
    let second = factory.outsider().await;

    let form = [("token", token.as_str())];
    let (a, b) = tokio::join!(
        app.post_form("/invite/accept", Some(&first), &form),
        app.post_form("/invite/accept", Some(&second), &form),
    );

    let joined = [&a, &b]
        .iter()
        .filter(|r| r.location() == "/app")
        .count();
    assert_eq!(joined, 1);

    let loser = if a.location() == "/app" { &b } else { &a };
    assert_eq!(
        loser.flash_error().as_deref(),
        Some("This invite has already been used.")
    );

    let team: serde_json::Value = app.get("/app/settings/team", Some(&owner)).await.json();
    assert_eq!(team["members"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_accepts_by_same_account_are_idempotent() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let token = factory.invite_token(&owner, "admin").await;
    let joiner = factory.outsider().await;

    let form = [("token", token.as_str())];
    let (a, b) = tokio::join!(
        app.post_form("/invite/accept", Some(&joiner), &form),
        app.post_form("/invite/accept", Some(&joiner), &form),
    );

    for response in [&a, &b] {
        assert_ne!(
            response.flash_error().as_deref(),
            Some("You already belong to another organization.")
        );
        assert!(
            response.location() == "/app"
                || response.flash_error().as_deref()
                    == Some("This invite has already been used."),
            "unexpected outcome: {}",
            response.location()
        );
    }
    assert!(a.location() == "/app" || b.location() == "/app");

    let dashboard: serde_json::Value = app.get("/app", Some(&joiner)).await.assert_ok().json();
    assert_eq!(dashboard["role"], "admin");
    let team: serde_json::Value = app.get("/app/settings/team", Some(&owner)).await.json();
    assert_eq!(team["members"].as_array().unwrap().len(), 2);
}
