use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use warden_core::{OrganizationId, UserId};

use crate::permissions::{Action, CheckMode, Permission, PermissionCode};
use crate::roles::RoleCode;

/// Outcome of a (resource, action) check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed { Decision::Allow } else { Decision::Deny }
    }
}

/// Outcome of an operation-level check (route guard).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessOutcome {
    Allow,
    Deny,
    /// No requirement is registered for the operation.
    Public,
}

impl From<Decision> for AccessOutcome {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Allow => AccessOutcome::Allow,
            Decision::Deny => AccessOutcome::Deny,
        }
    }
}

/// Resolved union of the active permissions a user holds in one scope.
///
/// Pure derived state: it can always be recomputed from the stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePermissionSet {
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub roles: Vec<RoleCode>,
    pub permissions: Vec<Permission>,
    pub computed_at: DateTime<Utc>,
    /// Earliest expiry among the contributing assignments.
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(skip)]
    by_resource: HashMap<String, Vec<(Action, PermissionCode)>>,
}

impl EffectivePermissionSet {
    pub fn new(
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        roles: Vec<RoleCode>,
        permissions: Vec<Permission>,
        computed_at: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        let mut by_resource: HashMap<String, Vec<(Action, PermissionCode)>> = HashMap::new();
        for p in permissions.iter().filter(|p| p.is_active) {
            by_resource
                .entry(p.resource.clone())
                .or_default()
                .push((p.action, p.code.clone()));
        }

        Self {
            user_id,
            organization_id,
            roles,
            permissions,
            computed_at,
            valid_until,
            by_resource,
        }
    }

    pub fn empty(user_id: UserId, organization_id: Option<OrganizationId>, now: DateTime<Utc>) -> Self {
        Self::new(user_id, organization_id, Vec::new(), Vec::new(), now, None)
    }

    pub fn is_empty(&self) -> bool {
        self.by_resource.is_empty()
    }

    /// True while no contributing assignment has expired.
    pub fn is_current_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_none_or(|until| now < until)
    }

    /// Codes of the granted permissions that satisfy `action` on `resource`.
    pub fn matching(&self, resource: &str, action: Action) -> Vec<&PermissionCode> {
        let mode = action.check_mode();
        self.by_resource
            .get(resource)
            .map(|grants| {
                grants
                    .iter()
                    .filter(|(granted, _)| mode.is_satisfied_by(*granted))
                    .map(|(_, code)| code)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn permits(&self, resource: &str, action: Action) -> bool {
        let mode = action.check_mode();
        self.by_resource
            .get(resource)
            .is_some_and(|grants| grants.iter().any(|(granted, _)| mode.is_satisfied_by(*granted)))
    }
}

/// Decide a (resource, action) request against a resolved permission set.
///
/// - No IO
/// - No panics
/// - Exact, case-sensitive resource comparison; no cross-resource cascade
pub fn authorize(effective: &EffectivePermissionSet, resource: &str, action: Action) -> Decision {
    effective.permits(resource, action).into()
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationExplanation {
    pub resource: String,
    pub action: Action,
    pub check_mode: CheckMode,
    pub decision: Decision,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Granted permissions that satisfied the request.
    pub matched_permissions: Vec<PermissionCode>,
    pub roles_in_scope: Vec<RoleCode>,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoRolesInScope,
    MissingPermission,
    /// The resource is granted, but only with actions too weak for the mode.
    InsufficientAction,
}

/// Explain why a request was (or would be) allowed or denied.
pub fn explain(effective: &EffectivePermissionSet, resource: &str, action: Action) -> AuthorizationExplanation {
    let check_mode = action.check_mode();
    let matched: Vec<PermissionCode> = effective
        .matching(resource, action)
        .into_iter()
        .cloned()
        .collect();

    let roles_in_scope = effective.roles.clone();

    if !matched.is_empty() {
        return AuthorizationExplanation {
            resource: resource.to_string(),
            action,
            check_mode,
            decision: Decision::Allow,
            reason: format!(
                "granted by {}",
                matched.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
            ),
            matched_permissions: matched,
            roles_in_scope,
            denial_reason: None,
        };
    }

    let required = check_mode
        .satisfying_actions()
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join("|");

    let denial = if roles_in_scope.is_empty() {
        DenialReason {
            kind: DenialKind::NoRolesInScope,
            message: "no active role assignment applies in this scope".to_string(),
            suggestions: vec![
                "Assign a role globally or within this organization".to_string(),
                "Check whether the user's assignments have expired".to_string(),
            ],
        }
    } else if let Some(grants) = effective.by_resource.get(resource) {
        let held = grants.iter().map(|(a, _)| a.as_str()).collect::<Vec<_>>().join(", ");
        DenialReason {
            kind: DenialKind::InsufficientAction,
            message: format!("'{resource}' is granted only with [{held}], request needs one of [{required}]"),
            suggestions: vec![format!("Grant '{resource}' with one of [{required}] to a role in scope")],
        }
    } else {
        DenialReason {
            kind: DenialKind::MissingPermission,
            message: format!("no permission on '{resource}' is granted in this scope"),
            suggestions: vec![format!("Grant '{resource}' with one of [{required}] to a role in scope")],
        }
    };

    AuthorizationExplanation {
        resource: resource.to_string(),
        action,
        check_mode,
        decision: Decision::Deny,
        reason: denial.message.clone(),
        matched_permissions: Vec::new(),
        roles_in_scope,
        denial_reason: Some(denial),
    }
}
