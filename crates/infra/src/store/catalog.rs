use std::collections::BTreeMap;
use std::sync::RwLock;

use warden_auth::{Action, Permission, PermissionCatalog, PermissionCode, RbacError, RbacResult};

use super::poisoned;

/// In-memory permission catalog keyed by code.
#[derive(Debug, Default)]
pub struct InMemoryPermissionCatalog {
    permissions: RwLock<BTreeMap<PermissionCode, Permission>>,
}

impl InMemoryPermissionCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermissionCatalog for InMemoryPermissionCatalog {
    fn register(&self, permission: Permission) -> RbacResult<Permission> {
        permission.validate()?;

        let mut map = self.permissions.write().map_err(poisoned)?;
        if map.contains_key(&permission.code) {
            return Err(RbacError::DuplicateCode(permission.code.to_string()));
        }
        map.insert(permission.code.clone(), permission.clone());
        Ok(permission)
    }

    fn deactivate(&self, code: &PermissionCode) -> RbacResult<Permission> {
        let mut map = self.permissions.write().map_err(poisoned)?;
        let permission = map
            .get_mut(code)
            .ok_or_else(|| RbacError::not_found("permission", code))?;
        permission.is_active = false;
        Ok(permission.clone())
    }

    fn get(&self, code: &PermissionCode) -> RbacResult<Option<Permission>> {
        let map = self.permissions.read().map_err(poisoned)?;
        Ok(map.get(code).cloned())
    }

    fn find(&self, resource: &str, action: Action) -> RbacResult<Vec<Permission>> {
        let map = self.permissions.read().map_err(poisoned)?;
        Ok(map
            .values()
            .filter(|p| p.is_active && p.matches(resource, action))
            .cloned()
            .collect())
    }

    fn list(&self) -> RbacResult<Vec<Permission>> {
        let map = self.permissions.read().map_err(poisoned)?;
        Ok(map.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_code_rejected() {
        let catalog = InMemoryPermissionCatalog::new();
        catalog.register(Permission::new("users:view", "users", Action::View)).unwrap();

        let err = catalog
            .register(Permission::new("users:view", "people", Action::Read))
            .unwrap_err();
        assert_eq!(err, RbacError::DuplicateCode("users:view".to_string()));
    }

    #[test]
    fn find_is_exact_and_skips_inactive() {
        let catalog = InMemoryPermissionCatalog::new();
        catalog.register(Permission::new("users:view", "users", Action::View)).unwrap();
        catalog.register(Permission::new("users:view:legacy", "users", Action::View)).unwrap();
        catalog.register(Permission::new("Users:view", "Users", Action::View)).unwrap();

        assert_eq!(catalog.find("users", Action::View).unwrap().len(), 2);

        catalog.deactivate(&PermissionCode::from("users:view:legacy")).unwrap();
        let found = catalog.find("users", Action::View).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code.as_str(), "users:view");
        assert!(catalog.find("users", Action::Read).unwrap().is_empty());
    }

    #[test]
    fn deactivate_unknown_is_not_found() {
        let catalog = InMemoryPermissionCatalog::new();
        let err = catalog.deactivate(&PermissionCode::from("nope")).unwrap_err();
        assert!(matches!(err, RbacError::NotFound { entity: "permission", .. }));
    }

    #[test]
    fn deactivated_permission_stays_listed() {
        let catalog = InMemoryPermissionCatalog::new();
        catalog.register(Permission::new("crm:export", "crm", Action::Export)).unwrap();
        catalog.deactivate(&PermissionCode::from("crm:export")).unwrap();

        let all = catalog.list().unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_active);
    }

    #[test]
    fn empty_resource_rejected() {
        let catalog = InMemoryPermissionCatalog::new();
        let err = catalog.register(Permission::new("x", " ", Action::View)).unwrap_err();
        assert!(matches!(err, RbacError::Validation(_)));
    }
}
