//! Organization membership repository

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_db_timestamp, parse_db_uuid};
use crate::models::{OrgContext, Role};

#[derive(Debug, sqlx::FromRow)]
struct ContextRow {
    org_id: String,
    org_name: String,
    role: String,
    plan: String,
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    user_id: String,
    role: String,
    created_at: String,
}

/// Membership row without the email, which lives with the identity provider
#[derive(Debug, Clone)]
pub struct MembershipRecord {
    pub user_id: Uuid,
    pub role: Role,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

pub struct MembershipRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MembershipRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// The organization, role and plan of a user, if they belong anywhere
    pub async fn context_for_user(&self, user_id: Uuid) -> Result<Option<OrgContext>> {
        let row = sqlx::query_as::<_, ContextRow>(
            r#"
            SELECT m.org_id AS org_id, o.name AS org_name, m.role AS role, o.plan AS plan
            FROM org_members m
            JOIN organizations o ON o.id = m.org_id
            WHERE m.user_id = ?
            ORDER BY m.created_at
            LIMIT 1
            "#,
        )
        .bind(user_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to resolve membership")?;

        row.map(|row| {
            Ok(OrgContext {
                org_id: parse_db_uuid(&row.org_id),
                org_name: row.org_name,
                role: row
                    .role
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .context("Corrupt membership role")?,
                plan: row.plan.parse().unwrap_or_default(),
            })
        })
        .transpose()
    }

    pub async fn get(&self, org_id: Uuid, user_id: Uuid) -> Result<Option<MembershipRecord>> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT user_id, role, created_at FROM org_members WHERE org_id = ? AND user_id = ?",
        )
        .bind(org_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get membership")?;

        row.map(row_to_record).transpose()
    }

    /// Members of an organization, oldest first
    pub async fn list(&self, org_id: Uuid) -> Result<Vec<MembershipRecord>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT user_id, role, created_at
            FROM org_members
            WHERE org_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(org_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list members")?;

        rows.into_iter().map(row_to_record).collect()
    }

    /// Delete a non-owner membership. Owner rows are never matched.
    pub async fn remove_non_owner(&self, org_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM org_members WHERE org_id = ? AND user_id = ? AND role != 'owner'",
        )
        .bind(org_id.to_string())
        .bind(user_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to remove member")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_record(row: MemberRow) -> Result<MembershipRecord> {
    Ok(MembershipRecord {
        user_id: parse_db_uuid(&row.user_id),
        role: row
            .role
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Corrupt membership role")?,
        joined_at: parse_db_timestamp(&row.created_at),
    })
}
