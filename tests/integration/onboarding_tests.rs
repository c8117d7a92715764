//! Organization creation

use corppad::{db::OrganizationRepository, models::Plan};

use crate::common::{unique_org_name, TeamFactory, TestApp};

#[tokio::test]
async fn test_create_org_makes_caller_owner_on_free_plan() {
    let app = TestApp::new().await;
    let user = TeamFactory::new(&app).outsider().await;

    app.post_form("/app/onboarding", Some(&user), &[("name", "  Acme Rockets  ")])
        .await
        .assert_redirect_to("/app");

    let org_id = app.org_id_of(&user).await;
    let org = OrganizationRepository::new(&app.state.db)
        .get_by_id(org_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(org.name, "Acme Rockets");
    assert_eq!(org.slug, "acme-rockets");
    assert_eq!(org.plan, Plan::Free);

    let team: serde_json::Value = app
        .get("/app/settings/team", Some(&user))
        .await
        .assert_ok()
        .json();
    assert_eq!(team["members"][0]["role"], "owner");
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let app = TestApp::new().await;
    let user = TeamFactory::new(&app).outsider().await;

    app.post_form("/app/onboarding", Some(&user), &[("name", "   ")])
        .await
        .assert_flash_error("/app/onboarding", "Organization name is required");
}

#[tokio::test]
async fn test_duplicate_slug_is_rejected() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let name = unique_org_name();

    let first = factory.outsider().await;
    app.post_form("/app/onboarding", Some(&first), &[("name", &name)])
        .await
        .assert_redirect_to("/app");

    // Same slug after normalization
    let second = factory.outsider().await;
    let shouted = format!("  {}!!", name.to_uppercase());
    app.post_form("/app/onboarding", Some(&second), &[("name", &shouted)])
        .await
        .assert_flash_error(
            "/app/onboarding",
            "An organization with that name already exists. Try a different name.",
        );
}

#[tokio::test]
async fn test_member_cannot_create_second_org() {
    let app = TestApp::new().await;
    let owner = TeamFactory::new(&app).owner().await;

    app.post_form("/app/onboarding", Some(&owner), &[("name", &unique_org_name())])
        .await
        .assert_flash_error("/app/onboarding", "You already belong to an organization.");
}

#[tokio::test]
async fn test_concurrent_onboarding_by_same_account_creates_one_org() {
    let app = TestApp::new().await;
    let user = TeamFactory::new(&app).outsider().await;
    let first_name = unique_org_name();
    let second_name = unique_org_name();

    let first_form = [("name", first_name.as_str())];
    let second_form = [("name", second_name.as_str())];
    let (a, b) = tokio::join!(
        app.post_form("/app/onboarding", Some(&user), &first_form),
        app.post_form("/app/onboarding", Some(&user), &second_form),
    );

    let created = [&a, &b].iter().filter(|r| r.location() == "/app").count();
    assert_eq!(created, 1);
    let loser = if a.location() == "/app" { &b } else { &a };
    loser.assert_flash_error("/app/onboarding", "You already belong to an organization.");

    let (orgs,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations")
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_eq!(orgs, 1);
}

#[tokio::test]
async fn test_onboarding_page_redirects_members_to_dashboard() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);

    let owner = factory.owner().await;
    app.get("/app/onboarding", Some(&owner))
        .await
        .assert_redirect_to("/app");

    let outsider = factory.outsider().await;
    app.get("/app/onboarding", Some(&outsider)).await.assert_ok();
}
