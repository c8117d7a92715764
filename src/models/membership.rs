//! Membership roles and the resolved per-request organization context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Plan;

/// Role of an identity inside its organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Owners and admins may mutate projects, invites, members and billing
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Parse a role that may be granted through an invite link.
    /// `owner` is never invitable.
    pub fn parse_invitable(s: &str) -> Option<Self> {
        match s.trim() {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Mutating actions guarded by the role gate, each with its denial message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    ModifyProjects,
    GenerateInvites,
    RemoveMembers,
    UpgradePlan,
    ManageBilling,
}

impl WriteAction {
    pub fn denial_message(&self) -> &'static str {
        match self {
            WriteAction::ModifyProjects => "Only owners and admins can modify projects.",
            WriteAction::GenerateInvites => "Only owners and admins can generate invite links.",
            WriteAction::RemoveMembers => "Only owners and admins can remove members.",
            WriteAction::UpgradePlan => "Only owners and admins can upgrade the plan.",
            WriteAction::ManageBilling => "Only owners and admins can manage billing.",
        }
    }
}

/// The caller's organization, role and plan, resolved once per request.
#[derive(Debug, Clone, Serialize)]
pub struct OrgContext {
    pub org_id: Uuid,
    pub org_name: String,
    pub role: Role,
    pub plan: Plan,
}

/// Membership row joined with the member's email
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// Team settings page data
#[derive(Debug, Clone, Serialize)]
pub struct TeamOverview {
    pub org_name: String,
    pub members: Vec<Member>,
    pub can_write: bool,
    /// Shareable link for a just-generated invite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveMemberRequest {
    pub user_id: String,
}
