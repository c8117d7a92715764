//! Onboarding and team step definitions

use cucumber::{then, when};
use corppad::db::OrganizationRepository;

use crate::features::support::TestWorld;

#[when(expr = "{word} creates an organization named {string}")]
async fn create_organization(world: &mut TestWorld, name: String, org_name: String) {
    let user = world.user(&name);
    let response = world
        .app()
        .post_form("/app/onboarding", Some(&user), &[("name", &org_name)])
        .await;
    world.last_response = Some(response);
}

#[then(expr = "{word}'s organization has the slug {string}")]
async fn organization_slug(world: &mut TestWorld, name: String, slug: String) {
    let org_id = world.org_id(&name).await;
    let org = OrganizationRepository::new(&world.app().state.db)
        .get_by_id(org_id)
        .await
        .expect("Failed to load organization")
        .expect("Organization not found");
    assert_eq!(org.slug, slug);
}

#[when(expr = "{word} removes {word} from the team")]
async fn remove_member(world: &mut TestWorld, actor: String, target: String) {
    let actor = world.user(&actor);
    let target_id = world.user(&target).id().to_string();
    let response = world
        .app()
        .post_form(
            "/app/settings/team/members/remove",
            Some(&actor),
            &[("user_id", &target_id)],
        )
        .await;
    world.last_response = Some(response);
}

#[then(expr = "{word}'s team has exactly one owner")]
async fn exactly_one_owner(world: &mut TestWorld, name: String) {
    let user = world.user(&name);
    let team: serde_json::Value = world
        .app()
        .get("/app/settings/team", Some(&user))
        .await
        .assert_ok()
        .json();
    let owners = team["members"]
        .as_array()
        .expect("members list")
        .iter()
        .filter(|m| m["role"] == "owner")
        .count();
    assert_eq!(owners, 1);
}

#[then(expr = "{word}'s team has {int} members")]
async fn team_size(world: &mut TestWorld, name: String, count: usize) {
    let user = world.user(&name);
    let team: serde_json::Value = world
        .app()
        .get("/app/settings/team", Some(&user))
        .await
        .assert_ok()
        .json();
    assert_eq!(team["members"].as_array().map(Vec::len), Some(count));
}
