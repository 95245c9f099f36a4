//! Storage ports.
//!
//! Each store owns the lifecycle of its records and enforces the uniqueness
//! constraints itself. Implementations are synchronous; a backend failure is
//! reported as [`RbacError::Storage`].
//!
//! [`RbacError::Storage`]: crate::RbacError::Storage

use chrono::{DateTime, Utc};

use warden_core::{OrganizationId, RoleId, UserId};

use crate::assignment::UserRoleAssignment;
use crate::error::RbacResult;
use crate::permissions::{Action, Permission, PermissionCode};
use crate::roles::{NewRole, Role, RoleCode, RolePatch};

/// Canonical registry of permission definitions.
pub trait PermissionCatalog: Send + Sync {
    /// Fails with `DuplicateCode` if the code is taken.
    fn register(&self, permission: Permission) -> RbacResult<Permission>;

    /// Soft-disable a permission. Fails with `NotFound` if absent.
    fn deactivate(&self, code: &PermissionCode) -> RbacResult<Permission>;

    fn get(&self, code: &PermissionCode) -> RbacResult<Option<Permission>>;

    /// Active permissions matching exactly this (resource, action) pair.
    fn find(&self, resource: &str, action: Action) -> RbacResult<Vec<Permission>>;

    fn list(&self) -> RbacResult<Vec<Permission>>;
}

/// Named bundles of permissions.
pub trait RoleStore: Send + Sync {
    /// Fails with `InvalidPermission` for unknown or inactive codes and with
    /// `DuplicateCode` if the role code is taken.
    fn create(&self, role: NewRole, permission_codes: &[PermissionCode], now: DateTime<Utc>) -> RbacResult<Role>;

    /// Fails with `SystemRoleImmutable` when the patch touches a system
    /// role's identity fields.
    fn update(&self, role_id: RoleId, patch: RolePatch, now: DateTime<Utc>) -> RbacResult<Role>;

    /// Fails with `SystemRoleImmutable` for system roles. Assignment checks
    /// are the caller's concern.
    fn delete(&self, role_id: RoleId) -> RbacResult<Role>;

    fn get(&self, role_id: RoleId) -> RbacResult<Option<Role>>;

    fn get_by_code(&self, code: &RoleCode) -> RbacResult<Option<Role>>;

    fn list(&self) -> RbacResult<Vec<Role>>;
}

/// User ↔ role bindings.
pub trait AssignmentStore: Send + Sync {
    /// Fails with `NotFound` / `RoleInactive`. Re-assigning an existing
    /// `(user, role, organization)` tuple overwrites `expires_at`.
    fn assign(
        &self,
        user_id: UserId,
        role_id: RoleId,
        organization_id: Option<OrganizationId>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> RbacResult<UserRoleAssignment>;

    /// Returns whether an assignment was removed; a missing one is not an error.
    fn revoke(&self, user_id: UserId, role_id: RoleId, organization_id: Option<OrganizationId>) -> RbacResult<bool>;

    /// Non-expired assignments that apply in the given scope (global ∪ scoped).
    fn list_assignments(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<Vec<UserRoleAssignment>>;

    /// Roles reachable by the user in the given scope, deduplicated.
    fn list_roles(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<Vec<Role>>;

    /// Every user holding the role in any scope, expired or not.
    fn list_users_by_role(&self, role_id: RoleId) -> RbacResult<Vec<UserId>>;

    fn count_active_by_role(&self, role_id: RoleId, now: DateTime<Utc>) -> RbacResult<usize>;

    /// Drop every assignment of the role and return what was removed.
    fn remove_role(&self, role_id: RoleId) -> RbacResult<Vec<UserRoleAssignment>>;
}
