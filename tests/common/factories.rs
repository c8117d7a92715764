//! Test factories for generating test data
//!
//! Factories create unique accounts and organizations per test, and grow
//! teams through the real invite flow.

use fake::{
    faker::{company::en::CompanyName, internet::en::SafeEmail},
    Fake,
};
use uuid::Uuid;

use super::test_app::{TestApp, TestUser};

/// Unique email address
pub fn unique_email() -> String {
    let email: String = SafeEmail().fake();
    format!("{}.{}", &Uuid::new_v4().simple().to_string()[..8], email)
}

/// Unique organization name
pub fn unique_org_name() -> String {
    let company: String = CompanyName().fake();
    format!("{} {}", company, &Uuid::new_v4().simple().to_string()[..6])
}

/// Builds organizations and their teams
pub struct TeamFactory<'a> {
    app: &'a TestApp,
}

impl<'a> TeamFactory<'a> {
    pub fn new(app: &'a TestApp) -> Self {
        Self { app }
    }

    /// Owner of a freshly created organization
    pub async fn owner(&self) -> TestUser {
        self.app
            .sign_up_with_org(&unique_email(), &unique_org_name())
            .await
    }

    /// Account without an organization
    pub async fn outsider(&self) -> TestUser {
        self.app.sign_up(&unique_email()).await
    }

    /// Generate an invite as `inviter` and return its token
    pub async fn invite_token(&self, inviter: &TestUser, role: &str) -> String {
        let response = self
            .app
            .post_form("/app/settings/team/invites", Some(inviter), &[("role", role)])
            .await;
        response
            .location_param("invite")
            .unwrap_or_else(|| panic!("invite was not generated: {}", response.location()))
    }

    /// New account that joined `owner`'s organization with `role`
    pub async fn member(&self, owner: &TestUser, role: &str) -> TestUser {
        let token = self.invite_token(owner, role).await;
        let user = self.outsider().await;
        self.app
            .post_form("/invite/accept", Some(&user), &[("token", &token)])
            .await
            .assert_redirect_to("/app");
        user
    }

    /// Create `count` projects as `user`
    pub async fn projects(&self, user: &TestUser, count: usize) {
        for i in 0..count {
            let name = format!("Project {}", i + 1);
            let response = self
                .app
                .post_form("/app/projects", Some(user), &[("name", &name)])
                .await;
            assert!(
                response.flash_error().is_none(),
                "project creation failed: {}",
                response.location()
            );
        }
    }
}
