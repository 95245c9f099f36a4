use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{OrganizationId, RoleId, UserId};

/// Uniqueness key of an assignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignmentKey {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub organization_id: Option<OrganizationId>,
}

/// Binds a user to a role, globally (`organization_id == None`) or within
/// one organization, optionally until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleAssignment {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub organization_id: Option<OrganizationId>,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserRoleAssignment {
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            user_id: self.user_id,
            role_id: self.role_id,
            organization_id: self.organization_id,
        }
    }

    pub fn is_global(&self) -> bool {
        self.organization_id.is_none()
    }

    /// An assignment is inert from `expires_at` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Global assignments apply in every scope; scoped ones only in their own.
    pub fn applies_to(&self, organization_id: Option<OrganizationId>) -> bool {
        match self.organization_id {
            None => true,
            Some(own) => organization_id == Some(own),
        }
    }

    pub fn is_effective(&self, organization_id: Option<OrganizationId>, now: DateTime<Utc>) -> bool {
        self.applies_to(organization_id) && !self.is_expired_at(now)
    }
}
