//! Project model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Identity that created the project
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update form payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Project list view with plan usage
#[derive(Debug, Clone, Serialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub count: i64,
    /// `None` when the plan is unlimited
    pub limit: Option<i64>,
    /// True when no further project may be created (also when over the limit)
    pub at_limit: bool,
    pub can_write: bool,
}
