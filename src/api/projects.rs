//! Project endpoints
//!
//! Reads return JSON; mutations are form posts answered with a 303 back to
//! the page they came from, carrying `?error=` when refused.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Form, Json, Router,
};

use crate::{
    models::{Project, ProjectForm, ProjectList},
    services::ProjectService,
    utils::{AppError, FlashRedirect},
    AppState, AuthUser,
};

const PROJECTS_PATH: &str = "/app/projects";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/{id}", get(get_project).post(update_project))
        .route("/{id}/delete", post(delete_project))
}

fn project_path(id: &str) -> String {
    format!("{}/{}", PROJECTS_PATH, id)
}

/// GET /app/projects
async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProjectList>, AppError> {
    let list = ProjectService::new(&state.db, &state.config.plans)
        .list(&user.identity)
        .await?;
    Ok(Json(list))
}

/// POST /app/projects
async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<ProjectForm>,
) -> Result<FlashRedirect, FlashRedirect> {
    let project = ProjectService::new(&state.db, &state.config.plans)
        .create(&user.identity, &form)
        .await
        .map_err(|e| e.redirect_to(PROJECTS_PATH))?;

    Ok(FlashRedirect::to(project_path(&project.id.to_string())))
}

/// GET /app/projects/{id}
async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Project>, AppError> {
    let project = ProjectService::new(&state.db, &state.config.plans)
        .get(&user.identity, &id)
        .await?;
    Ok(Json(project))
}

/// POST /app/projects/{id}
async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Form(form): Form<ProjectForm>,
) -> Result<FlashRedirect, FlashRedirect> {
    let back = project_path(&id);
    ProjectService::new(&state.db, &state.config.plans)
        .update(&user.identity, &id, &form)
        .await
        .map_err(|e| match e {
            // No project page to return to.
            e @ AppError::NotFound(_) => e.redirect_to(PROJECTS_PATH),
            other => other.redirect_to(&back),
        })?;

    Ok(FlashRedirect::to(back))
}

/// POST /app/projects/{id}/delete
async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<FlashRedirect, FlashRedirect> {
    ProjectService::new(&state.db, &state.config.plans)
        .delete(&user.identity, &id)
        .await
        .map_err(|e| e.redirect_to(&project_path(&id)))?;

    Ok(FlashRedirect::to(PROJECTS_PATH))
}
