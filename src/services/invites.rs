//! Invite links: generation, validate-on-view and acceptance
//!
//! Viewing never consumes an invite. Acceptance re-validates everything
//! server-side, then inserts the membership and marks the invite used in
//! one transaction; the mark is a compare-and-set, so when two requests
//! race on the same token exactly one joins and the other is told the
//! invite has already been used.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, info, warn};

use super::access;
use crate::config::PlansConfig;
use crate::db::{
    invite_repository::Redemption, DbPool, InviteRepository, MembershipRepository,
    OrganizationRepository,
};
use crate::models::{AcceptOutcome, Identity, Invite, InviteState, Role, WriteAction};
use crate::utils::{error::is_unique_violation, AppError, AppResult};

const TOKEN_BYTES: usize = 32;
const INVALID: &str = "Invalid invite link.";
const ALREADY_USED: &str = "This invite has already been used.";
const EXPIRED: &str = "This invite link has expired.";
const OTHER_ORG: &str = "You already belong to another organization.";

/// Unguessable URL-safe invite token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct InviteService<'a> {
    pool: &'a DbPool,
    plans: &'a PlansConfig,
}

impl<'a> InviteService<'a> {
    pub fn new(pool: &'a DbPool, plans: &'a PlansConfig) -> Self {
        Self { pool, plans }
    }

    /// Create an invite for the caller's organization
    pub async fn generate(&self, identity: &Identity, role: &str) -> AppResult<Invite> {
        let ctx = access::resolve(self.pool, identity).await?;
        access::require_write(&ctx, WriteAction::GenerateInvites)?;

        let role = Role::parse_invitable(role).ok_or_else(|| AppError::validation("Invalid role"))?;
        let expires_at = Utc::now() + Duration::days(self.plans.invite_expiry_days);

        let invite = InviteRepository::new(self.pool)
            .create(ctx.org_id, &generate_token(), role, identity.id, expires_at)
            .await?;

        info!(org_id = %ctx.org_id, invite_id = %invite.id, role = %role, "Invite generated");
        Ok(invite)
    }

    /// Describe an invite to a signed-in viewer without consuming it
    pub async fn view(&self, viewer: &Identity, token: &str) -> AppResult<InviteState> {
        let Some(invite) = InviteRepository::new(self.pool).get_by_token(token).await? else {
            return Ok(InviteState::Invalid);
        };
        if invite.is_used() {
            return Ok(InviteState::AlreadyUsed);
        }
        if invite.is_expired(Utc::now()) {
            return Ok(InviteState::Expired {
                expires_at: invite.expires_at,
            });
        }

        if let Some(ctx) = access::try_resolve(self.pool, viewer).await? {
            if ctx.org_id == invite.org_id {
                return Ok(InviteState::AlreadyMember);
            }
        }

        let Some(org) = OrganizationRepository::new(self.pool)
            .get_by_id(invite.org_id)
            .await?
        else {
            return Ok(InviteState::Invalid);
        };

        Ok(InviteState::Ready {
            org_name: org.name,
            role: invite.role,
        })
    }

    /// Redeem an invite for `identity`
    pub async fn accept(&self, identity: &Identity, token: &str) -> AppResult<AcceptOutcome> {
        let invites = InviteRepository::new(self.pool);
        let token = token.trim();

        let Some(invite) = invites.get_by_token(token).await? else {
            return Err(AppError::not_found(INVALID));
        };
        if invite.is_used() {
            return Err(AppError::conflict(ALREADY_USED));
        }
        if invite.is_expired(Utc::now()) {
            return Err(AppError::gone(EXPIRED));
        }

        if let Some(ctx) = MembershipRepository::new(self.pool)
            .context_for_user(identity.id)
            .await?
        {
            if ctx.org_id != invite.org_id {
                return Err(AppError::conflict(OTHER_ORG));
            }
            // Consume the token so it cannot be redeemed by someone else later.
            if !invites.mark_used(invite.id, identity.id).await? {
                warn!(invite_id = %invite.id, "Invite consumed concurrently");
            }
            return Ok(AcceptOutcome::AlreadyMember {
                org_id: invite.org_id,
            });
        }

        match invites.redeem(&invite, identity.id).await {
            Ok(Redemption::Redeemed) => {
                info!(
                    org_id = %invite.org_id,
                    invite_id = %invite.id,
                    user_id = %identity.id,
                    role = %invite.role,
                    "Invite accepted"
                );
                Ok(AcceptOutcome::Joined {
                    org_id: invite.org_id,
                    role: invite.role,
                })
            }
            Ok(Redemption::AlreadyUsed) => Err(AppError::conflict(ALREADY_USED)),
            // Joined some organization between the check and the insert
            Err(e) if is_unique_violation(&e) => self.settle_lost_race(&invite, identity).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Outcome for an identity whose membership insert lost to a concurrent join
    async fn settle_lost_race(
        &self,
        invite: &Invite,
        identity: &Identity,
    ) -> AppResult<AcceptOutcome> {
        match access::try_resolve(self.pool, identity).await? {
            Some(ctx) if ctx.org_id == invite.org_id => {
                debug!(
                    invite_id = %invite.id,
                    user_id = %identity.id,
                    "Concurrent accept already joined this organization"
                );
                Ok(AcceptOutcome::AlreadyMember {
                    org_id: invite.org_id,
                })
            }
            _ => Err(AppError::conflict(OTHER_ORG)),
        }
    }
}
