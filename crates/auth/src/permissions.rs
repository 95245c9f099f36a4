use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, RbacResult};

/// Permission code (globally unique identity of a permission definition).
///
/// Codes are opaque strings; the default catalog uses `"resource:action"`
/// (e.g. `"users:manage"`), but nothing relies on that shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for PermissionCode {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PermissionCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Closed verb set a permission may grant on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
    View,
    Configure,
    Export,
    Admin,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Manage,
        Action::View,
        Action::Configure,
        Action::Export,
        Action::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
            Action::View => "view",
            Action::Configure => "configure",
            Action::Export => "export",
            Action::Admin => "admin",
        }
    }

    /// How a request for this action is checked against granted permissions.
    pub fn check_mode(&self) -> CheckMode {
        match self {
            Action::Manage | Action::Admin => CheckMode::Manage,
            _ => CheckMode::View,
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| RbacError::validation(format!("unknown action '{s}'")))
    }
}

/// The two ways a requested action is matched.
///
/// `Manage` is a superset of `View` on the same resource. No other
/// transitivity exists (in particular nothing cascades across resources).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    View,
    Manage,
}

impl CheckMode {
    /// Granted actions that satisfy a request checked in this mode.
    pub fn satisfying_actions(&self) -> &'static [Action] {
        match self {
            CheckMode::View => &[Action::View, Action::Read, Action::Manage, Action::Admin],
            CheckMode::Manage => &[Action::Manage, Action::Admin],
        }
    }

    pub fn is_satisfied_by(&self, granted: Action) -> bool {
        self.satisfying_actions().contains(&granted)
    }
}

/// A permission definition: grants `action` on `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub code: PermissionCode,
    pub resource: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Permission {
    /// New active permission.
    pub fn new(code: impl Into<PermissionCode>, resource: impl Into<String>, action: Action) -> Self {
        Self {
            code: code.into(),
            resource: resource.into(),
            action,
            description: None,
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reject definitions that could never be matched.
    pub fn validate(&self) -> RbacResult<()> {
        if self.code.as_str().trim().is_empty() {
            return Err(RbacError::validation("permission code cannot be empty"));
        }
        if self.resource.trim().is_empty() {
            return Err(RbacError::validation("permission resource cannot be empty"));
        }
        Ok(())
    }

    /// Exact, case-sensitive match on the (resource, action) pair.
    pub fn matches(&self, resource: &str, action: Action) -> bool {
        self.resource == resource && self.action == action
    }
}
