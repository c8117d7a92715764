//! Project repository. Every statement is scoped by organization id.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_db_timestamp, parse_db_timestamp, parse_db_uuid};
use crate::models::Project;

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: String,
    org_id: String,
    name: String,
    description: Option<String>,
    created_by: String,
    created_at: String,
    updated_at: String,
}

pub struct ProjectRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProjectRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Projects of an organization, newest first
    pub async fn list(&self, org_id: Uuid) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, org_id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE org_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(org_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list projects")?;

        Ok(rows.into_iter().map(row_to_project).collect())
    }

    pub async fn count(&self, org_id: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects WHERE org_id = ?")
            .bind(org_id.to_string())
            .fetch_one(self.pool)
            .await
            .context("Failed to count projects")?;

        Ok(count)
    }

    pub async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, org_id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE id = ? AND org_id = ?
            "#,
        )
        .bind(id.to_string())
        .bind(org_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get project")?;

        Ok(row.map(row_to_project))
    }

    /// Insert a project unless the organization already holds `limit` or more.
    ///
    /// The count and the insert are one statement, so concurrent creations
    /// cannot overshoot the limit. Returns `None` when the limit was reached.
    pub async fn create_within_limit(
        &self,
        org_id: Uuid,
        name: &str,
        description: Option<&str>,
        created_by: Uuid,
        limit: Option<i64>,
    ) -> Result<Option<Project>> {
        let id = Uuid::new_v4();
        let now = format_db_timestamp(Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO projects (id, org_id, name, description, created_by, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?
            WHERE ? IS NULL OR (SELECT COUNT(*) FROM projects WHERE org_id = ?) < ?
            "#,
        )
        .bind(id.to_string())
        .bind(org_id.to_string())
        .bind(name)
        .bind(description)
        .bind(created_by.to_string())
        .bind(&now)
        .bind(&now)
        .bind(limit)
        .bind(org_id.to_string())
        .bind(limit)
        .execute(self.pool)
        .await
        .context("Failed to create project")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(org_id, id)
            .await?
            .context("Failed to retrieve created project")
            .map(Some)
    }

    /// Update name and description; refreshes `updated_at`.
    /// Returns `None` when the project is not in this organization.
    pub async fn update(
        &self,
        org_id: Uuid,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Project>> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET name = ?, description = ?, updated_at = ?
            WHERE id = ? AND org_id = ?
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(format_db_timestamp(Utc::now()))
        .bind(id.to_string())
        .bind(org_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update project")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(org_id, id).await
    }

    pub async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND org_id = ?")
            .bind(id.to_string())
            .bind(org_id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to delete project")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_project(row: ProjectRow) -> Project {
    Project {
        id: parse_db_uuid(&row.id),
        org_id: parse_db_uuid(&row.org_id),
        name: row.name,
        description: row.description,
        created_by: parse_db_uuid(&row.created_by),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
