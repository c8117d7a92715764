//! Membership resolution, role gate and plan gate
//!
//! Every mutating operation runs: resolve membership, then the role gate,
//! then (for project creation) the plan gate, then input validation.
//! Nothing here is cached between requests.

use crate::db::{DbPool, MembershipRepository, ProjectRepository};
use crate::models::{Identity, OrgContext, Plan, WriteAction};
use crate::utils::{AppError, AppResult};

/// Resolve the caller's organization, role and plan.
///
/// Identities without a membership get [`AppError::OnboardingRequired`].
pub async fn resolve(pool: &DbPool, identity: &Identity) -> AppResult<OrgContext> {
    MembershipRepository::new(pool)
        .context_for_user(identity.id)
        .await?
        .ok_or(AppError::OnboardingRequired)
}

/// Like [`resolve`], but `None` instead of an error for non-members
pub async fn try_resolve(pool: &DbPool, identity: &Identity) -> AppResult<Option<OrgContext>> {
    Ok(MembershipRepository::new(pool)
        .context_for_user(identity.id)
        .await?)
}

/// Role gate: owners and admins only
pub fn require_write(ctx: &OrgContext, action: WriteAction) -> AppResult<()> {
    if ctx.role.can_write() {
        Ok(())
    } else {
        tracing::debug!(org_id = %ctx.org_id, role = %ctx.role, ?action, "Write denied");
        Err(AppError::forbidden(action.denial_message()))
    }
}

pub fn project_limit_message(limit: i64) -> String {
    format!(
        "Free plan is limited to {} projects. Upgrade to Pro to create more.",
        limit
    )
}

/// Plan gate for project creation. Pro is unlimited; Free is rejected once
/// the organization holds `free_limit` or more projects.
pub async fn ensure_project_capacity(
    pool: &DbPool,
    ctx: &OrgContext,
    free_limit: i64,
) -> AppResult<()> {
    let Some(limit) = ctx.plan.project_limit(free_limit) else {
        return Ok(());
    };

    let count = ProjectRepository::new(pool).count(ctx.org_id).await?;
    if count >= limit {
        return Err(AppError::limit_exceeded(project_limit_message(limit)));
    }
    Ok(())
}

/// True when another project could be created right now
pub fn has_capacity(plan: Plan, count: i64, free_limit: i64) -> bool {
    plan.project_limit(free_limit)
        .map(|limit| count < limit)
        .unwrap_or(true)
}
