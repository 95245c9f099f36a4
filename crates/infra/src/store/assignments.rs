use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use warden_auth::{
    AssignmentKey, AssignmentStore, RbacError, RbacResult, Role, RoleStore, UserRoleAssignment,
};
use warden_core::{OrganizationId, RoleId, UserId};

use super::poisoned;

/// In-memory assignment store keyed by `(user, role, organization)`.
///
/// The key makes duplicate assignments unrepresentable: two concurrent
/// identical `assign` calls both succeed and leave a single record.
pub struct InMemoryAssignmentStore {
    assignments: RwLock<HashMap<AssignmentKey, UserRoleAssignment>>,
    roles: Arc<dyn RoleStore>,
}

impl InMemoryAssignmentStore {
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self {
            assignments: RwLock::new(HashMap::new()),
            roles,
        }
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn assign(
        &self,
        user_id: UserId,
        role_id: RoleId,
        organization_id: Option<OrganizationId>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> RbacResult<UserRoleAssignment> {
        let key = AssignmentKey {
            user_id,
            role_id,
            organization_id,
        };

        // The role is checked under the write lock so that a concurrent
        // `remove_role` either sees this assignment or makes it fail.
        let mut map = self.assignments.write().map_err(poisoned)?;
        let role = self
            .roles
            .get(role_id)?
            .ok_or_else(|| RbacError::not_found("role", role_id))?;
        if !role.is_active {
            return Err(RbacError::RoleInactive(role.code.to_string()));
        }

        let assignment = map
            .entry(key)
            .and_modify(|existing| existing.expires_at = expires_at)
            .or_insert_with(|| UserRoleAssignment {
                user_id,
                role_id,
                organization_id,
                assigned_at: now,
                expires_at,
            });
        Ok(assignment.clone())
    }

    fn revoke(&self, user_id: UserId, role_id: RoleId, organization_id: Option<OrganizationId>) -> RbacResult<bool> {
        let key = AssignmentKey {
            user_id,
            role_id,
            organization_id,
        };
        let mut map = self.assignments.write().map_err(poisoned)?;
        Ok(map.remove(&key).is_some())
    }

    fn list_assignments(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<Vec<UserRoleAssignment>> {
        let map = self.assignments.read().map_err(poisoned)?;
        let mut found: Vec<UserRoleAssignment> = map
            .values()
            .filter(|a| a.user_id == user_id && a.is_effective(organization_id, now))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.key());
        Ok(found)
    }

    fn list_roles(
        &self,
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> RbacResult<Vec<Role>> {
        let role_ids: BTreeSet<RoleId> = self
            .list_assignments(user_id, organization_id, now)?
            .into_iter()
            .map(|a| a.role_id)
            .collect();

        let mut roles = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            // A role deleted after the read above simply drops out.
            if let Some(role) = self.roles.get(role_id)? {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    fn list_users_by_role(&self, role_id: RoleId) -> RbacResult<Vec<UserId>> {
        let map = self.assignments.read().map_err(poisoned)?;
        let users: BTreeSet<UserId> = map
            .keys()
            .filter(|k| k.role_id == role_id)
            .map(|k| k.user_id)
            .collect();
        Ok(users.into_iter().collect())
    }

    fn count_active_by_role(&self, role_id: RoleId, now: DateTime<Utc>) -> RbacResult<usize> {
        let map = self.assignments.read().map_err(poisoned)?;
        Ok(map
            .values()
            .filter(|a| a.role_id == role_id && !a.is_expired_at(now))
            .count())
    }

    fn remove_role(&self, role_id: RoleId) -> RbacResult<Vec<UserRoleAssignment>> {
        let mut map = self.assignments.write().map_err(poisoned)?;
        let mut removed = Vec::new();
        map.retain(|key, assignment| {
            if key.role_id == role_id {
                removed.push(assignment.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use warden_auth::{NewRole, RoleCode, RolePatch};

    use super::*;
    use crate::store::{InMemoryPermissionCatalog, InMemoryRoleStore};

    fn setup() -> (Arc<InMemoryRoleStore>, InMemoryAssignmentStore) {
        let catalog = Arc::new(InMemoryPermissionCatalog::new());
        let roles = Arc::new(InMemoryRoleStore::new(catalog));
        let store = InMemoryAssignmentStore::new(roles.clone());
        (roles, store)
    }

    fn role(roles: &InMemoryRoleStore, code: &'static str) -> Role {
        roles
            .create(NewRole::custom(RoleCode::parse(code).unwrap(), code), &[], Utc::now())
            .unwrap()
    }

    #[test]
    fn assign_is_idempotent() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        let user = UserId::new();
        let org = Some(OrganizationId::new());

        store.assign(user, clerk.id, org, None, Utc::now()).unwrap();
        store.assign(user, clerk.id, org, None, Utc::now()).unwrap();

        assert_eq!(store.list_roles(user, org, Utc::now()).unwrap().len(), 1);
        assert_eq!(store.list_assignments(user, org, Utc::now()).unwrap().len(), 1);
    }

    #[test]
    fn reassign_overwrites_expiry_and_keeps_assigned_at() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        let user = UserId::new();
        let now = Utc::now();

        let first = store
            .assign(user, clerk.id, None, Some(now + Duration::hours(1)), now)
            .unwrap();
        let second = store
            .assign(user, clerk.id, None, None, now + Duration::minutes(5))
            .unwrap();

        assert_eq!(second.assigned_at, first.assigned_at);
        assert_eq!(second.expires_at, None);
    }

    #[test]
    fn assign_unknown_role_fails() {
        let (_, store) = setup();
        let err = store
            .assign(UserId::new(), RoleId::new(), None, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { entity: "role", .. }));
    }

    #[test]
    fn assign_inactive_role_fails() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        roles
            .update(
                clerk.id,
                RolePatch {
                    is_active: Some(false),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        let err = store
            .assign(UserId::new(), clerk.id, None, None, Utc::now())
            .unwrap_err();
        assert_eq!(err, RbacError::RoleInactive("CLERK".to_string()));
    }

    #[test]
    fn revoke_missing_assignment_is_ok() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        let removed = store.revoke(UserId::new(), clerk.id, None).unwrap();
        assert!(!removed);
    }

    #[test]
    fn list_roles_unions_global_and_matching_scope() {
        let (roles, store) = setup();
        let guest = role(&roles, "GUEST_X");
        let admin = role(&roles, "ORG_ADMIN_X");
        let user = UserId::new();
        let org_a = OrganizationId::new();
        let org_b = OrganizationId::new();

        store.assign(user, guest.id, None, None, Utc::now()).unwrap();
        store.assign(user, admin.id, Some(org_a), None, Utc::now()).unwrap();

        let in_a: Vec<_> = store
            .list_roles(user, Some(org_a), Utc::now())
            .unwrap()
            .into_iter()
            .map(|r| r.code.to_string())
            .collect();
        let in_b: Vec<_> = store
            .list_roles(user, Some(org_b), Utc::now())
            .unwrap()
            .into_iter()
            .map(|r| r.code.to_string())
            .collect();

        assert_eq!(in_a.len(), 2);
        assert_eq!(in_b, vec!["GUEST_X".to_string()]);
    }

    #[test]
    fn same_role_global_and_scoped_is_deduplicated() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        let user = UserId::new();
        let org = Some(OrganizationId::new());

        store.assign(user, clerk.id, None, None, Utc::now()).unwrap();
        store.assign(user, clerk.id, org, None, Utc::now()).unwrap();

        assert_eq!(store.list_assignments(user, org, Utc::now()).unwrap().len(), 2);
        assert_eq!(store.list_roles(user, org, Utc::now()).unwrap().len(), 1);
    }

    #[test]
    fn expired_assignments_are_excluded() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        let user = UserId::new();
        let now = Utc::now();

        store
            .assign(user, clerk.id, None, Some(now - Duration::seconds(1)), now - Duration::hours(1))
            .unwrap();

        assert!(store.list_roles(user, None, now).unwrap().is_empty());
        assert_eq!(store.count_active_by_role(clerk.id, now).unwrap(), 0);
        assert_eq!(store.list_users_by_role(clerk.id).unwrap(), vec![user]);
    }

    #[test]
    fn remove_role_drops_every_assignment() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        let (u1, u2) = (UserId::new(), UserId::new());
        store.assign(u1, clerk.id, None, None, Utc::now()).unwrap();
        store.assign(u2, clerk.id, Some(OrganizationId::new()), None, Utc::now()).unwrap();

        let removed = store.remove_role(clerk.id).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.list_users_by_role(clerk.id).unwrap().is_empty());
    }

    #[test]
    fn assign_to_a_deleted_role_leaves_no_record() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        roles.delete(clerk.id).unwrap();
        store.remove_role(clerk.id).unwrap();

        let err = store
            .assign(UserId::new(), clerk.id, None, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { entity: "role", .. }));
        assert!(store.list_users_by_role(clerk.id).unwrap().is_empty());
    }

    #[test]
    fn concurrent_identical_assigns_leave_one_record() {
        let (roles, store) = setup();
        let clerk = role(&roles, "CLERK");
        let store = Arc::new(store);
        let user = UserId::new();
        let org = Some(OrganizationId::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.assign(user, clerk.id, org, None, Utc::now()))
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }

        assert_eq!(store.list_assignments(user, org, Utc::now()).unwrap().len(), 1);
    }
}
