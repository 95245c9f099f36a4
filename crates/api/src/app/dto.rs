use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use warden_auth::{AccessOutcome, Action, PermissionCode};
use warden_core::{OrganizationId, RoleId, UserId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    pub resource: String,
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    pub operation_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolesRequest {
    pub role_ids: Vec<RoleId>,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// `?organizationId=` on user-scoped routes. Absent or empty means global
/// scope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    #[serde(default, deserialize_with = "blank_as_global")]
    pub organization_id: Option<OrganizationId>,
}

fn blank_as_global<'de, D>(deserializer: D) -> Result<Option<OrganizationId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionRequest {
    pub code: String,
    pub resource: String,
    pub action: Action,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PermissionQuery {
    pub resource: Option<String>,
    pub action: Option<Action>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<PermissionCode>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRoleQuery {
    #[serde(default)]
    pub force: bool,
}

fn default_true() -> bool {
    true
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub authorized: bool,
}

#[derive(Debug, Serialize)]
pub struct GuardResponse {
    pub outcome: AccessOutcome,
}
