//! Project CRUD within the caller's organization

use tracing::info;
use uuid::Uuid;

use super::access;
use crate::config::PlansConfig;
use crate::db::{DbPool, ProjectRepository};
use crate::models::{Identity, Project, ProjectForm, ProjectList, WriteAction};
use crate::utils::{
    validation::{optional_text, required_name},
    AppError, AppResult,
};

const NAME_REQUIRED: &str = "Project name is required.";
const NOT_FOUND: &str = "Project not found.";

pub struct ProjectService<'a> {
    pool: &'a DbPool,
    plans: &'a PlansConfig,
}

impl<'a> ProjectService<'a> {
    pub fn new(pool: &'a DbPool, plans: &'a PlansConfig) -> Self {
        Self { pool, plans }
    }

    pub async fn list(&self, identity: &Identity) -> AppResult<ProjectList> {
        let ctx = access::resolve(self.pool, identity).await?;
        let projects = ProjectRepository::new(self.pool).list(ctx.org_id).await?;
        let count = projects.len() as i64;

        Ok(ProjectList {
            count,
            limit: ctx.plan.project_limit(self.plans.free_project_limit),
            at_limit: !access::has_capacity(ctx.plan, count, self.plans.free_project_limit),
            can_write: ctx.role.can_write(),
            projects,
        })
    }

    pub async fn get(&self, identity: &Identity, project_id: &str) -> AppResult<Project> {
        let ctx = access::resolve(self.pool, identity).await?;
        let Ok(id) = Uuid::parse_str(project_id) else {
            return Err(AppError::not_found(NOT_FOUND));
        };

        ProjectRepository::new(self.pool)
            .get(ctx.org_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(NOT_FOUND))
    }

    pub async fn create(&self, identity: &Identity, form: &ProjectForm) -> AppResult<Project> {
        let ctx = access::resolve(self.pool, identity).await?;
        access::require_write(&ctx, WriteAction::ModifyProjects)?;
        access::ensure_project_capacity(self.pool, &ctx, self.plans.free_project_limit).await?;

        let name = required_name(&form.name).ok_or_else(|| AppError::validation(NAME_REQUIRED))?;
        let description = optional_text(form.description.as_deref());

        let limit = ctx.plan.project_limit(self.plans.free_project_limit);
        let project = ProjectRepository::new(self.pool)
            .create_within_limit(
                ctx.org_id,
                &name,
                description.as_deref(),
                identity.id,
                limit,
            )
            .await?
            .ok_or_else(|| {
                AppError::limit_exceeded(access::project_limit_message(
                    self.plans.free_project_limit,
                ))
            })?;

        info!(
            org_id = %ctx.org_id,
            project_id = %project.id,
            created_by = %identity.id,
            "Project created"
        );
        Ok(project)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        project_id: &str,
        form: &ProjectForm,
    ) -> AppResult<Project> {
        let ctx = access::resolve(self.pool, identity).await?;
        access::require_write(&ctx, WriteAction::ModifyProjects)?;

        let name = required_name(&form.name).ok_or_else(|| AppError::validation(NAME_REQUIRED))?;
        let description = optional_text(form.description.as_deref());

        let Ok(id) = Uuid::parse_str(project_id) else {
            return Err(AppError::not_found(NOT_FOUND));
        };

        ProjectRepository::new(self.pool)
            .update(ctx.org_id, id, &name, description.as_deref())
            .await?
            .ok_or_else(|| AppError::not_found(NOT_FOUND))
    }

    /// Delete a project. A missing or foreign id is not an error; nothing
    /// outside the caller's organization is touched.
    pub async fn delete(&self, identity: &Identity, project_id: &str) -> AppResult<bool> {
        let ctx = access::resolve(self.pool, identity).await?;
        access::require_write(&ctx, WriteAction::ModifyProjects)?;

        let Ok(id) = Uuid::parse_str(project_id) else {
            return Ok(false);
        };

        let deleted = ProjectRepository::new(self.pool)
            .delete(ctx.org_id, id)
            .await?;
        if deleted {
            info!(org_id = %ctx.org_id, project_id = %id, "Project deleted");
        }
        Ok(deleted)
    }
}
