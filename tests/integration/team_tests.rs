//! Team listing, invite generation and member removal

use rstest::rstest;

use crate::common::{TeamFactory, TestApp, TEST_APP_URL};

#[tokio::test]
async fn test_team_lists_members_oldest_first_with_emails() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let admin = factory.member(&owner, "admin").await;
    let member = factory.member(&owner, "member").await;

    let team: serde_json::Value = app
        .get("/app/settings/team", Some(&owner))
        .await
        .assert_ok()
        .json();

    let members = team["members"].as_array().unwrap();
    assert_eq!(members.len(), 3);
    assert_eq!(members[0]["email"], owner.identity.email.as_str());
    assert_eq!(members[0]["role"], "owner");
    assert_eq!(members[1]["email"], admin.identity.email.as_str());
    assert_eq!(members[1]["role"], "admin");
    assert_eq!(members[2]["email"], member.identity.email.as_str());
    assert_eq!(members[2]["role"], "member");
    assert_eq!(team["can_write"], true);
}

#[tokio::test]
async fn test_generated_invite_is_echoed_as_link() {
    let app = TestApp::new().await;
    let owner = TeamFactory::new(&app).owner().await;

    let response = app
        .post_form("/app/settings/team/invites", Some(&owner), &[("role", "member")])
        .await;
    assert!(response.location().starts_with("/app/settings/team?invite="));
    let token = response.location_param("invite").unwrap();
    assert_eq!(token.len(), 43);

    let team: serde_json::Value = app
        .get(response.location(), Some(&owner))
        .await
        .assert_ok()
        .json();
    assert_eq!(
        team["invite_link"],
        format!("{}/invite/{}", TEST_APP_URL, token).as_str()
    );
}

#[rstest]
#[case("owner")]
#[case("superuser")]
#[case("")]
#[tokio::test]
async fn test_invalid_invite_roles_are_rejected(#[case] role: &str) {
    let app = TestApp::new().await;
    let owner = TeamFactory::new(&app).owner().await;

    app.post_form("/app/settings/team/invites", Some(&owner), &[("role", role)])
        .await
        .assert_flash_error("/app/settings/team", "Invalid role");
}

#[tokio::test]
async fn test_member_cannot_generate_invites() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let member = factory.member(&owner, "member").await;

    app.post_form("/app/settings/team/invites", Some(&member), &[("role", "member")])
        .await
        .assert_flash_error(
            "/app/settings/team",
            "Only owners and admins can generate invite links.",
        );
}

#[tokio::test]
async fn test_admin_removes_member() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let admin = factory.member(&owner, "admin").await;
    let member = factory.member(&owner, "member").await;

    let member_id = member.id().to_string();
    app.post_form(
        "/app/settings/team/members/remove",
        Some(&admin),
        &[("user_id", &member_id)],
    )
    .await
    .assert_redirect_to("/app/settings/team");

    // The removed identity no longer belongs anywhere
    app.get("/app", Some(&member))
        .await
        .assert_redirect_to("/app/onboarding");
}

#[tokio::test]
async fn test_owner_cannot_be_removed() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let admin = factory.member(&owner, "admin").await;

    let owner_id = owner.id().to_string();
    app.post_form(
        "/app/settings/team/members/remove",
        Some(&admin),
        &[("user_id", &owner_id)],
    )
    .await
    .assert_flash_error("/app/settings/team", "Cannot remove the org owner.");
}

#[tokio::test]
async fn test_cannot_remove_yourself() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let admin = factory.member(&owner, "admin").await;

    let admin_id = admin.id().to_string();
    app.post_form(
        "/app/settings/team/members/remove",
        Some(&admin),
        &[("user_id", &admin_id)],
    )
    .await
    .assert_flash_error("/app/settings/team", "You cannot remove yourself.");
}

#[tokio::test]
async fn test_cannot_remove_member_of_another_org() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let alice = factory.owner().await;
    let bob = factory.owner().await;
    let bobs_member = factory.member(&bob, "member").await;

    let target = bobs_member.id().to_string();
    app.post_form(
        "/app/settings/team/members/remove",
        Some(&alice),
        &[("user_id", &target)],
    )
    .await
    .assert_flash_error("/app/settings/team", "Member not found.");

    app.get("/app", Some(&bobs_member)).await.assert_ok();
}

#[tokio::test]
async fn test_member_cannot_remove_members() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let first = factory.member(&owner, "member").await;
    let second = factory.member(&owner, "member").await;

    let target = second.id().to_string();
    app.post_form(
        "/app/settings/team/members/remove",
        Some(&first),
        &[("user_id", &target)],
    )
    .await
    .assert_flash_error(
        "/app/settings/team",
        "Only owners and admins can remove members.",
    );
}
