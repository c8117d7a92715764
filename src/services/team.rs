//! Team listing and member removal

use tracing::info;
use uuid::Uuid;

use super::{access, identity::IdentityProvider};
use crate::db::{DbPool, MembershipRepository};
use crate::models::{Identity, Member, Role, TeamOverview, WriteAction};
use crate::utils::{AppError, AppResult};

const MEMBER_NOT_FOUND: &str = "Member not found.";

pub struct TeamService<'a> {
    pool: &'a DbPool,
    identity: &'a dyn IdentityProvider,
}

impl<'a> TeamService<'a> {
    pub fn new(pool: &'a DbPool, identity: &'a dyn IdentityProvider) -> Self {
        Self { pool, identity }
    }

    /// Members of the caller's organization, oldest first, with emails
    pub async fn overview(&self, caller: &Identity) -> AppResult<TeamOverview> {
        let ctx = access::resolve(self.pool, caller).await?;
        let records = MembershipRepository::new(self.pool).list(ctx.org_id).await?;

        let ids: Vec<Uuid> = records.iter().map(|r| r.user_id).collect();
        let mut emails = self.identity.emails(&ids).await?;

        let members = records
            .into_iter()
            .map(|r| Member {
                email: emails.remove(&r.user_id),
                user_id: r.user_id,
                role: r.role,
                joined_at: r.joined_at,
            })
            .collect();

        Ok(TeamOverview {
            org_name: ctx.org_name,
            members,
            can_write: ctx.role.can_write(),
            invite_link: None,
        })
    }

    /// Remove a member from the caller's organization.
    ///
    /// The owner can never be removed and nobody can remove themselves.
    pub async fn remove_member(&self, caller: &Identity, target_user_id: &str) -> AppResult<()> {
        let ctx = access::resolve(self.pool, caller).await?;
        access::require_write(&ctx, WriteAction::RemoveMembers)?;

        let Ok(target) = Uuid::parse_str(target_user_id.trim()) else {
            return Err(AppError::not_found(MEMBER_NOT_FOUND));
        };
        if target == caller.id {
            return Err(AppError::bad_request("You cannot remove yourself."));
        }

        let members = MembershipRepository::new(self.pool);
        let Some(record) = members.get(ctx.org_id, target).await? else {
            return Err(AppError::not_found(MEMBER_NOT_FOUND));
        };
        if record.role == Role::Owner {
            return Err(AppError::forbidden("Cannot remove the org owner."));
        }

        if !members.remove_non_owner(ctx.org_id, target).await? {
            return Err(AppError::not_found(MEMBER_NOT_FOUND));
        }

        info!(org_id = %ctx.org_id, removed = %target, by = %caller.id, "Member removed");
        Ok(())
    }
}
