//! Organization creation for identities without a membership

use tracing::info;

use crate::db::{DbPool, MembershipRepository, OrganizationRepository};
use crate::models::{Identity, Organization};
use crate::utils::{
    error::is_unique_violation,
    validation::{required_name, slugify},
    AppError, AppResult,
};

const DUPLICATE_NAME: &str = "An organization with that name already exists. Try a different name.";
const ALREADY_MEMBER: &str = "You already belong to an organization.";

pub struct OnboardingService<'a> {
    pool: &'a DbPool,
}

impl<'a> OnboardingService<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create an organization owned by `identity`.
    ///
    /// The slug lookup only improves the message; the unique constraints
    /// decide races. A loser on slug gets the duplicate-name message, a
    /// loser on membership (same identity onboarding twice at once) is
    /// told it already belongs to an organization.
    pub async fn create_organization(
        &self,
        identity: &Identity,
        name: &str,
    ) -> AppResult<Organization> {
        let Some(name) = required_name(name) else {
            return Err(AppError::validation("Organization name is required"));
        };

        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(AppError::validation(
                "Organization name must contain at least one letter or number",
            ));
        }

        if MembershipRepository::new(self.pool)
            .context_for_user(identity.id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(ALREADY_MEMBER));
        }

        let orgs = OrganizationRepository::new(self.pool);
        if orgs.slug_exists(&slug).await? {
            return Err(AppError::conflict(DUPLICATE_NAME));
        }

        let org = match orgs.create_with_owner(&name, &slug, identity.id).await {
            Ok(org) => org,
            Err(e) if is_unique_violation(&e) => return Err(self.lost_race(identity).await?),
            Err(e) => return Err(e.into()),
        };

        info!(org_id = %org.id, slug = %org.slug, owner = %identity.id, "Organization created");
        Ok(org)
    }

    /// Tell apart which unique constraint a concurrent creation hit
    async fn lost_race(&self, identity: &Identity) -> AppResult<AppError> {
        let joined = MembershipRepository::new(self.pool)
            .context_for_user(identity.id)
            .await?
            .is_some();
        Ok(if joined {
            AppError::conflict(ALREADY_MEMBER)
        } else {
            AppError::conflict(DUPLICATE_NAME)
        })
    }
}
