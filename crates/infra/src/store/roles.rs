use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use warden_auth::{
    NewRole, PermissionCatalog, PermissionCode, RbacError, RbacResult, Role, RoleCode, RolePatch,
    RoleStore,
};
use warden_core::RoleId;

use super::poisoned;

/// In-memory role store.
///
/// Permission references are validated against the catalog on every write.
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<RoleId, Role>>,
    catalog: Arc<dyn PermissionCatalog>,
}

impl InMemoryRoleStore {
    pub fn new(catalog: Arc<dyn PermissionCatalog>) -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
            catalog,
        }
    }

    fn resolve_codes<'a>(
        &self,
        codes: impl IntoIterator<Item = &'a PermissionCode>,
    ) -> RbacResult<BTreeSet<PermissionCode>> {
        let mut resolved = BTreeSet::new();
        for code in codes {
            match self.catalog.get(code)? {
                Some(p) if p.is_active => {
                    resolved.insert(p.code);
                }
                Some(_) => {
                    return Err(RbacError::InvalidPermission(format!("'{code}' is inactive")));
                }
                None => {
                    return Err(RbacError::InvalidPermission(format!("'{code}' is unknown")));
                }
            }
        }
        Ok(resolved)
    }

    fn code_taken(roles: &HashMap<RoleId, Role>, code: &RoleCode, except: Option<RoleId>) -> bool {
        roles
            .values()
            .any(|r| &r.code == code && Some(r.id) != except)
    }
}

impl RoleStore for InMemoryRoleStore {
    fn create(&self, role: NewRole, permission_codes: &[PermissionCode], now: DateTime<Utc>) -> RbacResult<Role> {
        let permissions = self.resolve_codes(permission_codes)?;
        let role = Role::from_new(RoleId::new(), role, permissions, now)?;

        let mut roles = self.roles.write().map_err(poisoned)?;
        if Self::code_taken(&roles, &role.code, None) {
            return Err(RbacError::DuplicateCode(role.code.to_string()));
        }
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    fn update(&self, role_id: RoleId, mut patch: RolePatch, now: DateTime<Utc>) -> RbacResult<Role> {
        if let Some(codes) = patch.permissions.take() {
            patch.permissions = Some(self.resolve_codes(&codes)?);
        }

        let mut roles = self.roles.write().map_err(poisoned)?;
        let current = roles
            .get(&role_id)
            .ok_or_else(|| RbacError::not_found("role", role_id))?;

        let next = current.apply_patch(patch, now)?;
        if next.code != current.code && Self::code_taken(&roles, &next.code, Some(role_id)) {
            return Err(RbacError::DuplicateCode(next.code.to_string()));
        }

        roles.insert(role_id, next.clone());
        Ok(next)
    }

    fn delete(&self, role_id: RoleId) -> RbacResult<Role> {
        let mut roles = self.roles.write().map_err(poisoned)?;
        let role = roles
            .get(&role_id)
            .ok_or_else(|| RbacError::not_found("role", role_id))?;
        role.ensure_deletable()?;
        roles
            .remove(&role_id)
            .ok_or_else(|| RbacError::not_found("role", role_id))
    }

    fn get(&self, role_id: RoleId) -> RbacResult<Option<Role>> {
        let roles = self.roles.read().map_err(poisoned)?;
        Ok(roles.get(&role_id).cloned())
    }

    fn get_by_code(&self, code: &RoleCode) -> RbacResult<Option<Role>> {
        let roles = self.roles.read().map_err(poisoned)?;
        Ok(roles.values().find(|r| &r.code == code).cloned())
    }

    fn list(&self) -> RbacResult<Vec<Role>> {
        let roles = self.roles.read().map_err(poisoned)?;
        let mut all: Vec<Role> = roles.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(all)
    }
}
