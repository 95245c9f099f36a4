//! RBAC facade: every mutation goes through here so that the cache is
//! invalidated before the mutation reports success.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use warden_auth::{
    AccessOutcome, Action, AssignmentStore, AuthorizationExplanation, Decision,
    EffectivePermissionSet, NewRole, Permission, PermissionCatalog, PermissionCode, RbacError,
    RbacResult, RequirementRegistry, Role, RoleCode, RolePatch, RoleStore, UserRoleAssignment,
};
use warden_core::{OrganizationId, RoleId, UserId};

use crate::cache::{CacheConfig, CacheStats, EffectivePermissionCache};
use crate::guard::RouteGuard;
use crate::resolver::AuthorizationResolver;
use crate::store::{InMemoryAssignmentStore, InMemoryPermissionCatalog, InMemoryRoleStore, poisoned};

pub struct AccessControl {
    catalog: Arc<dyn PermissionCatalog>,
    roles: Arc<dyn RoleStore>,
    assignments: Arc<dyn AssignmentStore>,
    cache: Arc<EffectivePermissionCache>,
    resolver: Arc<AuthorizationResolver>,
    guard: RouteGuard,
    // Assignments hold it shared, role deletion exclusively, so a deletion's
    // in-use check and its removal see the same set of assignments.
    role_lifecycle: RwLock<()>,
}

impl AccessControl {
    pub fn new(
        catalog: Arc<dyn PermissionCatalog>,
        roles: Arc<dyn RoleStore>,
        assignments: Arc<dyn AssignmentStore>,
        registry: RequirementRegistry,
        cache_config: CacheConfig,
    ) -> Self {
        let cache = Arc::new(EffectivePermissionCache::new(cache_config));
        let resolver = Arc::new(AuthorizationResolver::new(
            catalog.clone(),
            roles.clone(),
            assignments.clone(),
            cache.clone(),
        ));
        let guard = RouteGuard::new(Arc::new(registry), resolver.clone());

        Self {
            catalog,
            roles,
            assignments,
            cache,
            resolver,
            guard,
            role_lifecycle: RwLock::new(()),
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(registry: RequirementRegistry, cache_config: CacheConfig) -> Self {
        let catalog: Arc<InMemoryPermissionCatalog> = Arc::new(InMemoryPermissionCatalog::new());
        let roles: Arc<InMemoryRoleStore> = Arc::new(InMemoryRoleStore::new(catalog.clone()));
        let assignments: Arc<InMemoryAssignmentStore> =
            Arc::new(InMemoryAssignmentStore::new(roles.clone()));
        Self::new(catalog, roles, assignments, registry, cache_config)
    }

    pub fn resolver(&self) -> &Arc<AuthorizationResolver> {
        &self.resolver
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission catalog
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_permission(&self, permission: Permission) -> RbacResult<Permission> {
        let permission = self.catalog.register(permission)?;
        tracing::info!(code = %permission.code, resource = %permission.resource, action = %permission.action, "permission registered");
        Ok(permission)
    }

    /// Soft-disable a permission. Invalidates every cached set, since any of
    /// them may include it.
    pub fn deactivate_permission(&self, code: &PermissionCode) -> RbacResult<Permission> {
        let permission = self.catalog.deactivate(code)?;
        self.cache.invalidate_all();
        tracing::info!(%code, "permission deactivated");
        Ok(permission)
    }

    pub fn permission(&self, code: &PermissionCode) -> RbacResult<Permission> {
        self.catalog
            .get(code)?
            .ok_or_else(|| RbacError::not_found("permission", code))
    }

    pub fn permissions(&self) -> RbacResult<Vec<Permission>> {
        self.catalog.list()
    }

    pub fn find_permissions(&self, resource: &str, action: Action) -> RbacResult<Vec<Permission>> {
        self.catalog.find(resource, action)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_role(
        &self,
        role: NewRole,
        permission_codes: &[PermissionCode],
        now: DateTime<Utc>,
    ) -> RbacResult<Role> {
        let role = self.roles.create(role, permission_codes, now)?;
        tracing::info!(role = %role.code, permissions = role.permissions.len(), "role created");
        Ok(role)
    }

    pub fn update_role(&self, role_id: RoleId, patch: RolePatch, now: DateTime<Utc>) -> RbacResult<Role> {
        let role = self.roles.update(role_id, patch, now)?;
        let assignees = match self.assignments.list_users_by_role(role_id) {
            Ok(assignees) => assignees,
            Err(err) => {
                // The new permission set is already stored; without the
                // assignee list only a full flush keeps the cache honest.
                self.cache.invalidate_all();
                tracing::warn!(role = %role.code, error = %err, "assignee lookup failed after role update; flushed cache");
                return Err(err);
            }
        };
        self.cache.invalidate_users(&assignees);
        tracing::info!(role = %role.code, assignees = assignees.len(), "role updated");
        Ok(role)
    }

    /// Delete a custom role.
    ///
    /// With live assignments the call fails with `RoleInUse` unless `force`
    /// is set, in which case the assignments are removed as well. Concurrent
    /// assignments wait for the deletion to finish and then see `NotFound`.
    pub fn delete_role(&self, role_id: RoleId, force: bool, now: DateTime<Utc>) -> RbacResult<Role> {
        let _exclusive = self.role_lifecycle.write().map_err(poisoned)?;

        let role = self.role(role_id)?;
        role.ensure_deletable()?;

        let active = self.assignments.count_active_by_role(role_id, now)?;
        if active > 0 && !force {
            return Err(RbacError::RoleInUse {
                role: role.code.to_string(),
                assignees: active,
            });
        }

        let deleted = self.roles.delete(role_id)?;
        let removed = match self.assignments.remove_role(role_id) {
            Ok(removed) => removed,
            Err(err) => {
                self.cache.invalidate_all();
                tracing::warn!(role = %deleted.code, error = %err, "assignment removal failed after role delete; flushed cache");
                return Err(err);
            }
        };
        for assignment in &removed {
            self.cache.invalidate_user(assignment.user_id);
        }

        tracing::info!(
            role = %deleted.code,
            removed_assignments = removed.len(),
            forced = force,
            "role deleted"
        );
        Ok(deleted)
    }

    pub fn role(&self, role_id: RoleId) -> RbacResult<Role> {
        self.roles
            .get(role_id)?
            .ok_or_else(|| RbacError::not_found("role", role_id))
    }

    pub fn role_by_code(&self, code: &RoleCode) -> RbacResult<Role> {
        self.roles
            .get_by_code(code)?
            .ok_or_else(|| RbacError::not_found("role", code))
    }

    pub fn roles(&self) -> RbacResult<Vec<Role>> {
        self.roles.list()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assignments
    // ─────────────────────────────────────────────────────────────────────────

    pub fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        organization_id: Option<OrganizationId>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> RbacResult<UserRoleAssignment> {
        let _shared = self.role_lifecycle.read().map_err(poisoned)?;
        let assignment = self
            .assignments
            .assign(user_id, role_id, organization_id, expires_at, now)?;
        self.invalidate_scope(user_id, organization_id);
        tracing::info!(%user_id, %role_id, ?organization_id, ?expires_at, "role assigned");
        Ok(assignment)
    }

    /// Assign several roles in one scope.
    ///
    /// Every role is checked before any is assigned, so an unknown or
    /// inactive role leaves the user's assignments untouched.
    pub fn assign_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
        organization_id: Option<OrganizationId>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> RbacResult<Vec<Role>> {
        let mut roles = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            let role = self.role(*role_id)?;
            if !role.is_active {
                return Err(RbacError::RoleInactive(role.code.to_string()));
            }
            if !roles.iter().any(|r: &Role| r.id == role.id) {
                roles.push(role);
            }
        }

        for role in &roles {
            self.assign_role(user_id, role.id, organization_id, expires_at, now)?;
        }
        Ok(roles)
    }

    /// Revoking a missing assignment is a successful no-op.
    pub fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        organization_id: Option<OrganizationId>,
    ) -> RbacResult<bool> {
        let removed = self.assignments.revoke(user_id, role_id, organization_id)?;
        if removed {
            self.invalidate_scope(user_id, organization_id);
            tracing::info!(%user_id, %role_id, ?organization_id, "role revoked");
        }
        Ok(removed)
    }

    pub fn user_roles(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<Vec<Role>> {
        self.assignments.list_roles(user_id, organization_id, now)
    }

    pub fn user_assignments(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<Vec<UserRoleAssignment>> {
        self.assignments
            .list_assignments(user_id, organization_id, now)
    }

    // A global assignment reaches every organization, so it invalidates
    // every cached scope of the user.
    fn invalidate_scope(&self, user_id: UserId, organization_id: Option<OrganizationId>) {
        match organization_id {
            None => self.cache.invalidate_user(user_id),
            Some(_) => self.cache.invalidate(user_id, organization_id),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn effective_permissions(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<Arc<EffectivePermissionSet>> {
        self.resolver
            .effective_permissions(user_id, organization_id, now)
    }

    /// `Err(ResolutionFailed)` must be treated as DENY by the caller.
    pub fn authorize(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        resource: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> RbacResult<Decision> {
        self.resolver
            .authorize(user_id, organization_id, resource, action, now)
    }

    /// Fail-closed decision.
    pub fn decide(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        resource: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> Decision {
        self.resolver
            .decide(user_id, organization_id, resource, action, now)
    }

    pub fn explain(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        resource: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> RbacResult<AuthorizationExplanation> {
        self.resolver
            .explain(user_id, organization_id, resource, action, now)
    }

    pub fn check_access(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        operation_id: &str,
        now: DateTime<Utc>,
    ) -> AccessOutcome {
        self.guard
            .check_access(user_id, organization_id, operation_id, now)
    }
}
