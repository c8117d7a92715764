//! User account and session repository

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_db_timestamp, parse_db_timestamp, parse_db_uuid};
use crate::models::User;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    created_at: String,
}

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        let id = Uuid::new_v4();
        let now = format_db_timestamp(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create user")?;

        self.get_by_id(id)
            .await?
            .context("Failed to retrieve created user")
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get user")?;

        Ok(row.map(row_to_user))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .context("Failed to get user by email")?;

        Ok(row.map(row_to_user))
    }

    /// Emails for a set of user ids; unknown ids are simply absent
    pub async fn emails_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, email FROM users WHERE id IN ({})",
            placeholders
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }

        let rows = query
            .fetch_all(self.pool)
            .await
            .context("Failed to look up user emails")?;

        Ok(rows
            .into_iter()
            .map(|(id, email)| (parse_db_uuid(&id), email))
            .collect())
    }

    pub async fn create_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id.to_string())
        .bind(user_id.to_string())
        .bind(format_db_timestamp(Utc::now()))
        .bind(format_db_timestamp(expires_at))
        .execute(self.pool)
        .await
        .context("Failed to record session")?;

        Ok(())
    }

    /// True when the session exists, belongs to the user and has not expired
    pub async fn session_is_active(&self, session_id: Uuid, user_id: Uuid) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT expires_at FROM sessions WHERE id = ? AND user_id = ?")
                .bind(session_id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(self.pool)
                .await
                .context("Failed to look up session")?;

        Ok(row
            .map(|(expires_at,)| parse_db_timestamp(&expires_at) > Utc::now())
            .unwrap_or(false))
    }

    pub async fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to delete session")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(format_db_timestamp(Utc::now()))
            .execute(self.pool)
            .await
            .context("Failed to prune expired sessions")?;

        Ok(result.rows_affected())
    }
}

fn row_to_user(row: UserRow) -> User {
    User {
        id: parse_db_uuid(&row.id),
        email: row.email,
        password_hash: row.password_hash,
        created_at: parse_db_timestamp(&row.created_at),
    }
}
