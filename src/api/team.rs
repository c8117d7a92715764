//! Team settings endpoints: member list, invite generation, member removal

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;

use crate::{
    models::{GenerateInviteRequest, RemoveMemberRequest, TeamOverview},
    services::{InviteService, TeamService},
    utils::{AppError, FlashRedirect},
    AppState, AuthUser,
};

const TEAM_PATH: &str = "/app/settings/team";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(team_overview))
        .route("/invites", post(generate_invite))
        .route("/members/remove", post(remove_member))
}

#[derive(Debug, Default, Deserialize)]
pub struct TeamQuery {
    /// Token of an invite generated by the previous request
    pub invite: Option<String>,
}

/// GET /app/settings/team
async fn team_overview(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TeamQuery>,
) -> Result<Json<TeamOverview>, AppError> {
    let mut overview = TeamService::new(&state.db, state.identity.as_ref())
        .overview(&user.identity)
        .await?;

    overview.invite_link = query
        .invite
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| {
            state
                .config
                .app_link(&format!("/invite/{}", urlencoding::encode(token)))
        });

    Ok(Json(overview))
}

/// POST /app/settings/team/invites
async fn generate_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<GenerateInviteRequest>,
) -> Result<FlashRedirect, FlashRedirect> {
    let invite = InviteService::new(&state.db, &state.config.plans)
        .generate(&user.identity, &form.role)
        .await
        .map_err(|e| e.redirect_to(TEAM_PATH))?;

    Ok(FlashRedirect::with_param(TEAM_PATH, "invite", &invite.token))
}

/// POST /app/settings/team/members/remove
async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Form(form): Form<RemoveMemberRequest>,
) -> Result<FlashRedirect, FlashRedirect> {
    TeamService::new(&state.db, state.identity.as_ref())
        .remove_member(&user.identity, &form.user_id)
        .await
        .map_err(|e| e.redirect_to(TEAM_PATH))?;

    Ok(FlashRedirect::to(TEAM_PATH))
}
