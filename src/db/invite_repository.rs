//! Invite link repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_db_timestamp, parse_db_timestamp, parse_db_uuid};
use crate::models::{Invite, Role};

#[derive(Debug, sqlx::FromRow)]
struct InviteRow {
    id: String,
    org_id: String,
    token: String,
    role: String,
    created_by: String,
    expires_at: String,
    used_at: Option<String>,
    used_by: Option<String>,
    created_at: String,
}

/// Result of the membership-insert-plus-mark-used transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    Redeemed,
    /// Another request marked the invite used first; nothing was written
    AlreadyUsed,
}

pub struct InviteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InviteRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        org_id: Uuid,
        token: &str,
        role: Role,
        created_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Invite> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO invites (id, org_id, token, role, created_by, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(org_id.to_string())
        .bind(token)
        .bind(role.as_str())
        .bind(created_by.to_string())
        .bind(format_db_timestamp(expires_at))
        .bind(format_db_timestamp(Utc::now()))
        .execute(self.pool)
        .await
        .context("Failed to create invite")?;

        self.get_by_token(token)
            .await?
            .context("Failed to retrieve created invite")
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<Invite>> {
        let row = sqlx::query_as::<_, InviteRow>(
            r#"
            SELECT id, org_id, token, role, created_by, expires_at, used_at, used_by, created_at
            FROM invites
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await
        .context("Failed to get invite")?;

        row.map(row_to_invite).transpose()
    }

    /// Insert the membership and mark the invite used in one transaction.
    ///
    /// The mark is a compare-and-set on `used_at IS NULL`; if another
    /// request got there first the membership insert is rolled back.
    pub async fn redeem(&self, invite: &Invite, user_id: Uuid) -> Result<Redemption> {
        let now = format_db_timestamp(Utc::now());

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query(
            "INSERT INTO org_members (org_id, user_id, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(invite.org_id.to_string())
        .bind(user_id.to_string())
        .bind(invite.role.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to add member")?;

        let marked = sqlx::query(
            "UPDATE invites SET used_at = ?, used_by = ? WHERE id = ? AND used_at IS NULL",
        )
        .bind(&now)
        .bind(user_id.to_string())
        .bind(invite.id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to mark invite used")?;

        if marked.rows_affected() == 0 {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(Redemption::AlreadyUsed);
        }

        tx.commit().await.context("Failed to commit invite acceptance")?;
        Ok(Redemption::Redeemed)
    }

    /// Mark an invite used without adding a member. Returns false if it
    /// was already used.
    pub async fn mark_used(&self, invite_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE invites SET used_at = ?, used_by = ? WHERE id = ? AND used_at IS NULL",
        )
        .bind(format_db_timestamp(Utc::now()))
        .bind(user_id.to_string())
        .bind(invite_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to mark invite used")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_invite(row: InviteRow) -> Result<Invite> {
    Ok(Invite {
        id: parse_db_uuid(&row.id),
        org_id: parse_db_uuid(&row.org_id),
        token: row.token,
        role: row
            .role
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Corrupt invite role")?,
        created_by: parse_db_uuid(&row.created_by),
        expires_at: parse_db_timestamp(&row.expires_at),
        used_at: row.used_at.as_deref().map(parse_db_timestamp),
        used_by: row.used_by.as_deref().map(parse_db_uuid),
        created_at: parse_db_timestamp(&row.created_at),
    })
}
