//! Default permission catalog, system roles and route table.
//!
//! Seeding is idempotent: permissions and roles that already exist are left
//! untouched, so a restart never overwrites an operator's edits.

use chrono::{DateTime, Utc};
use serde::Serialize;

use warden_auth::{
    Action, Permission, PermissionCode, RbacError, RbacResult, RegistryError, RequirementRegistry,
    SystemRole,
};

use crate::access_control::AccessControl;

/// Resources known to the default catalog.
pub const RESOURCES: [&str; 11] = [
    "dashboard",
    "users",
    "roles",
    "permissions",
    "organizations",
    "departments",
    "accounting",
    "inventory",
    "manufacturing",
    "crm",
    "system",
];

/// Business modules a plain `USER` may view.
const BUSINESS_MODULES: [&str; 7] = [
    "dashboard",
    "organizations",
    "departments",
    "accounting",
    "inventory",
    "manufacturing",
    "crm",
];

// Path prefix → resource for the route table.
const ROUTES: [(&str, &str); 10] = [
    ("/dashboard", "dashboard"),
    ("/users", "users"),
    ("/roles", "roles"),
    ("/permissions", "permissions"),
    ("/organizations", "organizations"),
    ("/departments", "departments"),
    ("/accounting", "accounting"),
    ("/inventory", "inventory"),
    ("/manufacturing", "manufacturing"),
    ("/crm", "crm"),
];

fn code(resource: &str, action: Action) -> PermissionCode {
    PermissionCode::new(format!("{resource}:{action}"))
}

/// Default catalog: the CRUD verbs plus `view` and `manage` on every
/// resource, and a few resource-specific verbs.
pub fn default_permissions() -> Vec<Permission> {
    let mut permissions = Vec::new();
    for resource in RESOURCES {
        for action in [
            Action::View,
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Manage,
        ] {
            permissions.push(
                Permission::new(code(resource, action), resource, action)
                    .with_description(format!("{} {resource}", capitalize(action.as_str()))),
            );
        }
    }
    for (resource, action) in [
        ("accounting", Action::Export),
        ("crm", Action::Export),
        ("system", Action::Configure),
        ("system", Action::Admin),
    ] {
        permissions.push(
            Permission::new(code(resource, action), resource, action)
                .with_description(format!("{} {resource}", capitalize(action.as_str()))),
        );
    }
    permissions
}

/// Permissions granted to a system role at seed time.
pub fn default_role_permissions(role: SystemRole) -> Vec<PermissionCode> {
    match role {
        SystemRole::SystemAdmin => default_permissions().into_iter().map(|p| p.code).collect(),
        SystemRole::OrgAdmin => RESOURCES
            .iter()
            .filter(|r| **r != "system" && **r != "permissions")
            .map(|r| code(r, Action::Manage))
            .chain([code("system", Action::View)])
            .collect(),
        SystemRole::User => BUSINESS_MODULES
            .iter()
            .map(|r| code(r, Action::View))
            .chain([code("system", Action::View)])
            .collect(),
        SystemRole::Guest => vec![code("dashboard", Action::View)],
    }
}

/// Default route table.
///
/// `/new` and `/{id}/edit` under each module require `manage` and are
/// registered ahead of the module prefix. `/settings` and `/profile` map to
/// `system:view`. Anything else (`/`, `/login`, `/register`) is public.
pub fn default_route_registry() -> Result<RequirementRegistry, RegistryError> {
    let mut builder = RequirementRegistry::builder();
    for (path, resource) in ROUTES {
        builder = builder
            .prefix(format!("{path}/new"), resource, Action::Manage)
            .pattern(format!("{}/[^/]+/edit", regex::escape(path)), resource, Action::Manage)
            .prefix(path, resource, Action::View);
    }
    builder
        .prefix("/settings", "system", Action::View)
        .prefix("/profile", "system", Action::View)
        .build()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub permissions_registered: usize,
    pub roles_created: usize,
}

/// Register the default catalog and the system roles.
pub fn seed_defaults(access: &AccessControl, now: DateTime<Utc>) -> RbacResult<SeedReport> {
    let mut report = SeedReport::default();

    for permission in default_permissions() {
        match access.register_permission(permission) {
            Ok(_) => report.permissions_registered += 1,
            Err(RbacError::DuplicateCode(_)) => {}
            Err(e) => return Err(e),
        }
    }

    for role in SystemRole::ALL {
        match access.role_by_code(&role.code()) {
            Ok(_) => continue,
            Err(RbacError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        let grants = default_role_permissions(role);
        access.create_role(role.new_role(), &grants, now)?;
        report.roles_created += 1;
    }

    tracing::info!(
        permissions = report.permissions_registered,
        roles = report.roles_created,
        "default catalog seeded"
    );
    Ok(report)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
