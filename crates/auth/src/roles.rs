use std::borrow::Cow;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::RoleId;

use crate::error::{RbacError, RbacResult};
use crate::permissions::PermissionCode;

/// Role code: unique, upper-snake-case (e.g. `ORG_ADMIN`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleCode(Cow<'static, str>);

impl RoleCode {
    /// Parse and validate a role code.
    pub fn parse(code: impl Into<Cow<'static, str>>) -> RbacResult<Self> {
        let code = code.into();
        let mut chars = code.chars();
        let valid_head = chars.next().is_some_and(|c| c.is_ascii_uppercase());
        let valid_tail = chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !valid_head || !valid_tail {
            return Err(RbacError::validation(format!(
                "role code '{code}' must be upper-snake-case"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoleCode {
    type Error = RbacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RoleCode> for String {
    fn from(value: RoleCode) -> Self {
        value.0.into_owned()
    }
}

/// Built-in roles. These cannot be deleted and their identity fields are frozen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SystemRole {
    SystemAdmin,
    OrgAdmin,
    User,
    Guest,
}

impl SystemRole {
    pub const ALL: [SystemRole; 4] = [
        SystemRole::SystemAdmin,
        SystemRole::OrgAdmin,
        SystemRole::User,
        SystemRole::Guest,
    ];

    pub fn code(&self) -> RoleCode {
        let code = match self {
            SystemRole::SystemAdmin => "SYSTEM_ADMIN",
            SystemRole::OrgAdmin => "ORG_ADMIN",
            SystemRole::User => "USER",
            SystemRole::Guest => "GUEST",
        };
        RoleCode(Cow::Borrowed(code))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SystemRole::SystemAdmin => "System Administrator",
            SystemRole::OrgAdmin => "Organization Administrator",
            SystemRole::User => "User",
            SystemRole::Guest => "Guest",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SystemRole::SystemAdmin => "Full control over every resource",
            SystemRole::OrgAdmin => "Manages every resource inside an organization",
            SystemRole::User => "Day-to-day access to business modules",
            SystemRole::Guest => "Read-only access to the dashboard",
        }
    }

    pub fn new_role(&self) -> NewRole {
        NewRole {
            code: self.code(),
            name: self.name().to_string(),
            description: Some(self.description().to_string()),
            is_system_role: true,
            is_active: true,
        }
    }
}

/// Input for creating a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    pub code: RoleCode,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_system_role: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewRole {
    pub fn custom(code: RoleCode, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            description: None,
            is_system_role: false,
            is_active: true,
        }
    }
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub code: RoleCode,
    pub name: String,
    pub description: Option<String>,
    pub is_system_role: bool,
    pub is_active: bool,
    pub permissions: BTreeSet<PermissionCode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn from_new(
        id: RoleId,
        new: NewRole,
        permissions: BTreeSet<PermissionCode>,
        now: DateTime<Utc>,
    ) -> RbacResult<Self> {
        if new.name.trim().is_empty() {
            return Err(RbacError::validation("role name cannot be empty"));
        }
        Ok(Self {
            id,
            code: new.code,
            name: new.name.trim().to_string(),
            description: new.description,
            is_system_role: new.is_system_role,
            is_active: new.is_active,
            permissions,
            created_at: now,
            updated_at: now,
        })
    }

    /// Deletion guard: system roles are never deleted.
    pub fn ensure_deletable(&self) -> RbacResult<()> {
        if self.is_system_role {
            return Err(RbacError::SystemRoleImmutable(self.code.to_string()));
        }
        Ok(())
    }

    /// Produce the patched role, enforcing identity immutability.
    ///
    /// Permission codes in the patch are *not* checked against the catalog
    /// here; the store does that before calling this.
    pub fn apply_patch(&self, patch: RolePatch, now: DateTime<Utc>) -> RbacResult<Role> {
        let code_changes = patch.code.as_ref().is_some_and(|c| c != &self.code);
        let flag_changes = patch.is_system_role.is_some_and(|f| f != self.is_system_role);

        if self.is_system_role && (code_changes || flag_changes) {
            return Err(RbacError::SystemRoleImmutable(self.code.to_string()));
        }
        if flag_changes {
            return Err(RbacError::validation(
                "isSystemRole cannot be set on an existing role",
            ));
        }

        let mut next = self.clone();
        if let Some(code) = patch.code {
            next.code = code;
        }
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(RbacError::validation("role name cannot be empty"));
            }
            next.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            next.description = Some(description);
        }
        if let Some(is_active) = patch.is_active {
            next.is_active = is_active;
        }
        if let Some(permissions) = patch.permissions {
            next.permissions = permissions;
        }
        next.updated_at = now;
        Ok(next)
    }
}

/// Partial update of a role. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePatch {
    #[serde(default)]
    pub code: Option<RoleCode>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_system_role: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub permissions: Option<BTreeSet<PermissionCode>>,
}

impl RolePatch {
    pub fn permissions(codes: impl IntoIterator<Item = PermissionCode>) -> Self {
        Self {
            permissions: Some(codes.into_iter().collect()),
            ..Default::default()
        }
    }
}
