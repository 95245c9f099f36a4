//! Authorization resolver: the decision engine.
//!
//! Cache-or-compute the principal's effective permission set, then apply
//! the check-mode rules from `warden-auth`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use warden_auth::{
    Action, AssignmentStore, AuthorizationExplanation, Decision, EffectivePermissionSet,
    PermissionCatalog, RbacError, RbacResult, RoleStore, authorize, explain,
};
use warden_core::{OrganizationId, RoleId, UserId};

use crate::cache::{CacheKey, EffectivePermissionCache};

pub struct AuthorizationResolver {
    catalog: Arc<dyn PermissionCatalog>,
    roles: Arc<dyn RoleStore>,
    assignments: Arc<dyn AssignmentStore>,
    cache: Arc<EffectivePermissionCache>,
}

impl AuthorizationResolver {
    pub fn new(
        catalog: Arc<dyn PermissionCatalog>,
        roles: Arc<dyn RoleStore>,
        assignments: Arc<dyn AssignmentStore>,
        cache: Arc<EffectivePermissionCache>,
    ) -> Self {
        Self {
            catalog,
            roles,
            assignments,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<EffectivePermissionCache> {
        &self.cache
    }

    /// Effective permissions for `(user, organization)` at `now`.
    ///
    /// Any store failure surfaces as `ResolutionFailed`.
    pub fn effective_permissions(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<Arc<EffectivePermissionSet>> {
        let key = CacheKey::new(user_id, organization_id);
        if let Some(set) = self.cache.get(&key, now) {
            return Ok(set);
        }

        let epoch = self.cache.epoch();
        let set = Arc::new(
            self.compute(user_id, organization_id, now)
                .map_err(resolution_failed)?,
        );
        self.cache.insert(key, set.clone(), epoch);
        Ok(set)
    }

    pub fn authorize(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        resource: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> RbacResult<Decision> {
        let effective = self.effective_permissions(user_id, organization_id, now)?;
        Ok(authorize(&effective, resource, action))
    }

    /// Fail-closed variant of [`AuthorizationResolver::authorize`]: a
    /// resolution error is logged and answered with DENY.
    pub fn decide(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        resource: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> Decision {
        match self.authorize(user_id, organization_id, resource, action, now) {
            Ok(decision) => decision,
            Err(err) => {
                tracing::error!(
                    %user_id,
                    ?organization_id,
                    resource,
                    %action,
                    error = %err,
                    "authorization resolution failed; denying"
                );
                Decision::Deny
            }
        }
    }

    pub fn explain(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        resource: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> RbacResult<AuthorizationExplanation> {
        let effective = self.effective_permissions(user_id, organization_id, now)?;
        Ok(explain(&effective, resource, action))
    }

    fn compute(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<EffectivePermissionSet> {
        let assignments = self
            .assignments
            .list_assignments(user_id, organization_id, now)?;

        let valid_until = assignments.iter().filter_map(|a| a.expires_at).min();
        let role_ids: BTreeSet<RoleId> = assignments.iter().map(|a| a.role_id).collect();

        let mut role_codes = Vec::with_capacity(role_ids.len());
        let mut permissions = BTreeMap::new();

        for role_id in role_ids {
            let Some(role) = self.roles.get(role_id)? else {
                continue;
            };
            if !role.is_active {
                continue;
            }
            for code in &role.permissions {
                if permissions.contains_key(code) {
                    continue;
                }
                if let Some(permission) = self.catalog.get(code)? {
                    if permission.is_active {
                        permissions.insert(code.clone(), permission);
                    }
                }
            }
            role_codes.push(role.code);
        }

        tracing::debug!(
            %user_id,
            ?organization_id,
            roles = role_codes.len(),
            permissions = permissions.len(),
            "resolved effective permissions"
        );

        Ok(EffectivePermissionSet::new(
            user_id,
            organization_id,
            role_codes,
            permissions.into_values().collect(),
            now,
            valid_until,
        ))
    }
}

fn resolution_failed(err: RbacError) -> RbacError {
    match err {
        RbacError::ResolutionFailed(_) => err,
        other => RbacError::ResolutionFailed(other.to_string()),
    }
}
