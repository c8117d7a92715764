//! Project CRUD, role gate and Free plan limit

use corppad::db::ProjectRepository;
use uuid::Uuid;

use crate::common::{TeamFactory, TestApp};

const LIMIT_MESSAGE: &str = "Free plan is limited to 3 projects. Upgrade to Pro to create more.";

#[tokio::test]
async fn test_owner_creates_and_lists_projects_newest_first() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;

    factory.projects(&owner, 2).await;

    let list: serde_json::Value = app.get("/app/projects", Some(&owner)).await.assert_ok().json();
    assert_eq!(list["count"], 2);
    assert_eq!(list["limit"], 3);
    assert_eq!(list["at_limit"], false);
    assert_eq!(list["can_write"], true);
    assert_eq!(list["projects"][0]["name"], "Project 2");
    assert_eq!(list["projects"][1]["name"], "Project 1");
}

#[tokio::test]
async fn test_create_redirects_to_project_page() {
    let app = TestApp::new().await;
    let owner = TeamFactory::new(&app).owner().await;

    let response = app
        .post_form(
            "/app/projects",
            Some(&owner),
            &[("name", "  Launch  "), ("description", "  ")],
        )
        .await;
    assert_eq!(response.status, axum::http::StatusCode::SEE_OTHER);
    let location = response.location().to_string();
    assert!(location.starts_with("/app/projects/"));

    let project: serde_json::Value = app.get(&location, Some(&owner)).await.assert_ok().json();
    assert_eq!(project["name"], "Launch");
    assert!(project["description"].is_null());
}

#[tokio::test]
async fn test_project_records_its_creator() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let admin = factory.member(&owner, "admin").await;

    let location = app
        .post_form("/app/projects", Some(&admin), &[("name", "Roadmap")])
        .await
        .location()
        .to_string();

    let project: serde_json::Value = app.get(&location, Some(&owner)).await.assert_ok().json();
    assert_eq!(project["created_by"], admin.id().to_string().as_str());

    let (stored,): (String,) = sqlx::query_as("SELECT created_by FROM projects WHERE name = ?")
        .bind("Roadmap")
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_eq!(stored, admin.id().to_string());
}

#[tokio::test]
async fn test_blank_project_name_is_rejected() {
    let app = TestApp::new().await;
    let owner = TeamFactory::new(&app).owner().await;

    app.post_form("/app/projects", Some(&owner), &[("name", "   ")])
        .await
        .assert_flash_error("/app/projects", "Project name is required.");
}

#[tokio::test]
async fn test_free_plan_blocks_fourth_project() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;

    factory.projects(&owner, 3).await;

    app.post_form("/app/projects", Some(&owner), &[("name", "Fourth")])
        .await
        .assert_flash_error("/app/projects", LIMIT_MESSAGE);

    let list: serde_json::Value = app.get("/app/projects", Some(&owner)).await.json();
    assert_eq!(list["count"], 3);
    assert_eq!(list["at_limit"], true);
}

#[tokio::test]
async fn test_concurrent_creates_never_exceed_free_limit() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    factory.projects(&owner, 2).await;

    let (a, b, c) = tokio::join!(
        app.post_form("/app/projects", Some(&owner), &[("name", "Race A")]),
        app.post_form("/app/projects", Some(&owner), &[("name", "Race B")]),
        app.post_form("/app/projects", Some(&owner), &[("name", "Race C")]),
    );

    let succeeded = [&a, &b, &c]
        .iter()
        .filter(|r| r.flash_error().is_none())
        .count();
    assert_eq!(succeeded, 1);

    let org_id = app.org_id_of(&owner).await;
    let count = ProjectRepository::new(&app.state.db).count(org_id).await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_member_cannot_modify_projects() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let member = factory.member(&owner, "member").await;

    let response = app
        .post_form("/app/projects", Some(&owner), &[("name", "Owned")])
        .await;
    let project_path = response.location().to_string();

    let denied = "Only owners and admins can modify projects.";
    app.post_form("/app/projects", Some(&member), &[("name", "Nope")])
        .await
        .assert_flash_error("/app/projects", denied);
    app.post_form(&project_path, Some(&member), &[("name", "Renamed")])
        .await
        .assert_flash_error(&project_path, denied);
    app.post_form(&format!("{}/delete", project_path), Some(&member), &[])
        .await
        .assert_flash_error(&project_path, denied);

    // Members can still read
    let list: serde_json::Value = app.get("/app/projects", Some(&member)).await.assert_ok().json();
    assert_eq!(list["count"], 1);
    assert_eq!(list["can_write"], false);
}

#[tokio::test]
async fn test_admin_can_update_and_delete() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let owner = factory.owner().await;
    let admin = factory.member(&owner, "admin").await;

    let project_path = app
        .post_form("/app/projects", Some(&admin), &[("name", "Draft")])
        .await
        .location()
        .to_string();

    app.post_form(
        &project_path,
        Some(&admin),
        &[("name", "Final"), ("description", "Shipped")],
    )
    .await
    .assert_redirect_to(&project_path);

    let project: serde_json::Value = app.get(&project_path, Some(&owner)).await.assert_ok().json();
    assert_eq!(project["name"], "Final");
    assert_eq!(project["description"], "Shipped");

    app.post_form(&format!("{}/delete", project_path), Some(&admin), &[])
        .await
        .assert_redirect_to("/app/projects");
    app.get(&project_path, Some(&owner)).await.assert_not_found();
}

#[tokio::test]
async fn test_projects_are_isolated_between_orgs() {
    let app = TestApp::new().await;
    let factory = TeamFactory::new(&app);
    let alice = factory.owner().await;
    let bob = factory.owner().await;

    let alice_project = app
        .post_form("/app/projects", Some(&alice), &[("name", "Secret")])
        .await
        .location()
        .to_string();

    app.get(&alice_project, Some(&bob)).await.assert_not_found();

    app.post_form(&alice_project, Some(&bob), &[("name", "Hijacked")])
        .await
        .assert_flash_error("/app/projects", "Project not found.");

    // Deleting someone else's project is a no-op
    app.post_form(&format!("{}/delete", alice_project), Some(&bob), &[])
        .await
        .assert_redirect_to("/app/projects");

    let project: serde_json::Value = app.get(&alice_project, Some(&alice)).await.assert_ok().json();
    assert_eq!(project["name"], "Secret");
}

#[tokio::test]
async fn test_malformed_project_id_is_not_found() {
    let app = TestApp::new().await;
    let owner = TeamFactory::new(&app).owner().await;

    app.get("/app/projects/not-a-uuid", Some(&owner))
        .await
        .assert_not_found();
    app.get(&format!("/app/projects/{}", Uuid::new_v4()), Some(&owner))
        .await
        .assert_not_found();
}
