//! Invite link model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

#[derive(Debug, Clone, Serialize)]
pub struct Invite {
    pub id: Uuid,
    pub org_id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    pub role: Role,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Outcome of looking at an invite link without consuming it
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InviteState {
    Invalid,
    AlreadyUsed,
    Expired { expires_at: DateTime<Utc> },
    /// The viewer already belongs to the invite's organization
    AlreadyMember,
    Ready { org_name: String, role: Role },
}

impl InviteState {
    /// Message shown for the non-ready states
    pub fn message(&self) -> Option<&'static str> {
        match self {
            InviteState::Invalid => Some("Invalid invite link."),
            InviteState::AlreadyUsed => Some("This invite has already been used."),
            InviteState::Expired { .. } => Some("This invite link has expired."),
            InviteState::AlreadyMember | InviteState::Ready { .. } => None,
        }
    }
}

/// Result of a successful acceptance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Joined { org_id: Uuid, role: Role },
    AlreadyMember { org_id: Uuid },
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateInviteRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptInviteRequest {
    #[serde(default)]
    pub token: String,
}
