//! Test world for Cucumber scenarios

use std::collections::HashMap;
use std::fmt;

use cucumber::World;
use uuid::Uuid;

use crate::common::{TestApp, TestResponse, TestUser};

/// Test world that maintains state across scenario steps
#[derive(Default, World)]
pub struct TestWorld {
    /// Application under test, started by the background step
    pub app: Option<TestApp>,

    /// Signed-in accounts by scenario name
    pub users: HashMap<String, TestUser>,

    /// Token of the most recently generated invite
    pub invite_token: Option<String>,

    /// Response from the last request
    pub last_response: Option<TestResponse>,
}

impl fmt::Debug for TestWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestWorld")
            .field("started", &self.app.is_some())
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .field("invite_token", &self.invite_token)
            .field("last_response", &self.last_response)
            .finish()
    }
}

impl TestWorld {
    pub fn app(&self) -> &TestApp {
        self.app
            .as_ref()
            .expect("Service not started; add 'Given a running corppad service'")
    }

    pub fn user(&self, name: &str) -> TestUser {
        self.users
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("Unknown user {}", name))
    }

    pub fn response(&self) -> &TestResponse {
        self.last_response.as_ref().expect("No response available")
    }

    pub fn invite_token(&self) -> String {
        self.invite_token.clone().expect("No invite generated")
    }

    /// Organization of a named user
    pub async fn org_id(&self, name: &str) -> Uuid {
        let user = self.user(name);
        self.app().org_id_of(&user).await
    }

    /// Provider customer id used for a named user's organization
    pub fn customer_id(name: &str) -> String {
        format!("cus_{}", name.to_lowercase())
    }

    pub fn subscription_id(name: &str) -> String {
        format!("sub_{}", name.to_lowercase())
    }
}
