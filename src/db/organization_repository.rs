//! Organization (tenant) repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_db_timestamp, parse_db_timestamp, parse_db_uuid};
use crate::models::{Organization, Plan, Role, SubscriptionMirror};

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    slug: String,
    plan: String,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    subscription_status: Option<String>,
    current_period_end: Option<String>,
    created_at: String,
    updated_at: String,
}

const SELECT_ORG: &str = r#"
    SELECT id, name, slug, plan, stripe_customer_id, stripe_subscription_id,
           subscription_status, current_period_end, created_at, updated_at
    FROM organizations
"#;

pub struct OrganizationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrganizationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!("{} WHERE id = ?", SELECT_ORG))
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to get organization")?;

        Ok(row.map(row_to_org))
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM organizations WHERE slug = ?")
            .bind(slug)
            .fetch_optional(self.pool)
            .await
            .context("Failed to check organization slug")?;

        Ok(row.is_some())
    }

    /// Create an organization and its owner membership in one transaction.
    ///
    /// Fails with a unique violation when the slug is taken or the owner
    /// already belongs to an organization; nothing is written in that case.
    pub async fn create_with_owner(
        &self,
        name: &str,
        slug: &str,
        owner_id: Uuid,
    ) -> Result<Organization> {
        let id = Uuid::new_v4();
        let now = format_db_timestamp(Utc::now());

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, slug, plan, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(slug)
        .bind(Plan::Free.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to create organization")?;

        sqlx::query(
            "INSERT INTO org_members (org_id, user_id, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(owner_id.to_string())
        .bind(Role::Owner.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to create owner membership")?;

        tx.commit().await.context("Failed to commit organization")?;

        self.get_by_id(id)
            .await?
            .context("Failed to retrieve created organization")
    }

    /// Record a completed checkout: Pro plan plus provider identifiers.
    /// Returns false when no organization has that id.
    pub async fn record_checkout(
        &self,
        id: Uuid,
        customer_id: Option<&str>,
        mirror: &SubscriptionMirror,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET plan = ?,
                stripe_customer_id = COALESCE(?, stripe_customer_id),
                stripe_subscription_id = ?,
                subscription_status = ?,
                current_period_end = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(mirror.plan.as_str())
        .bind(customer_id)
        .bind(mirror.subscription_id.as_deref())
        .bind(mirror.status.as_deref())
        .bind(mirror.current_period_end.map(format_db_timestamp))
        .bind(format_db_timestamp(Utc::now()))
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to record checkout")?;

        Ok(result.rows_affected() > 0)
    }

    /// Mirror a subscription change onto every organization with this
    /// provider customer id. Returns the number of organizations updated.
    pub async fn update_subscription_by_customer(
        &self,
        customer_id: &str,
        mirror: &SubscriptionMirror,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET plan = ?,
                stripe_subscription_id = ?,
                subscription_status = ?,
                current_period_end = ?,
                updated_at = ?
            WHERE stripe_customer_id = ?
            "#,
        )
        .bind(mirror.plan.as_str())
        .bind(mirror.subscription_id.as_deref())
        .bind(mirror.status.as_deref())
        .bind(mirror.current_period_end.map(format_db_timestamp))
        .bind(format_db_timestamp(Utc::now()))
        .bind(customer_id)
        .execute(self.pool)
        .await
        .context("Failed to update subscription")?;

        Ok(result.rows_affected())
    }
}

fn parse_optional_timestamp(ts: Option<String>) -> Option<DateTime<Utc>> {
    ts.as_deref().map(parse_db_timestamp)
}

fn row_to_org(row: OrganizationRow) -> Organization {
    Organization {
        id: parse_db_uuid(&row.id),
        name: row.name,
        slug: row.slug,
        plan: row.plan.parse().unwrap_or_default(),
        stripe_customer_id: row.stripe_customer_id,
        stripe_subscription_id: row.stripe_subscription_id,
        subscription_status: row.subscription_status,
        current_period_end: parse_optional_timestamp(row.current_period_end),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
