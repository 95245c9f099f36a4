//! End-to-end tests over the in-memory wiring.
//!
//! Tests: mutation → store → cache invalidation → resolver → guard
//!
//! Verifies:
//! - Scope isolation between organizations
//! - No stale ALLOW after revocation or role edits
//! - Expiry is honoured on cached sets
//! - Concurrent assignment and authorization

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{Duration, Utc};

    use warden_auth::{
        AccessOutcome, Action, Decision, NewRole, PermissionCode, RbacError, RoleCode, RolePatch,
        SystemRole,
    };
    use warden_core::{OrganizationId, UserId};

    use crate::access_control::AccessControl;
    use crate::cache::CacheConfig;
    use crate::seed::{default_route_registry, seed_defaults};

    fn seeded(config: CacheConfig) -> AccessControl {
        let access = AccessControl::in_memory(default_route_registry().unwrap(), config);
        seed_defaults(&access, Utc::now()).unwrap();
        access
    }

    #[test]
    fn org_scoped_roles_do_not_leak_across_organizations() {
        let access = seeded(CacheConfig::default());
        let now = Utc::now();
        let guest = access.role_by_code(&SystemRole::Guest.code()).unwrap();
        let org_admin = access.role_by_code(&SystemRole::OrgAdmin.code()).unwrap();

        let user = UserId::new();
        let (org_a, org_b) = (Some(OrganizationId::new()), Some(OrganizationId::new()));
        access.assign_role(user, guest.id, None, None, now).unwrap();
        access.assign_role(user, org_admin.id, org_a, None, now).unwrap();

        // Warm both scopes before asserting so the cached path is exercised.
        for _ in 0..2 {
            assert_eq!(access.decide(user, org_b, "users", Action::Manage, now), Decision::Deny);
            assert_eq!(access.decide(user, org_a, "users", Action::Manage, now), Decision::Allow);
            assert_eq!(access.decide(user, org_b, "dashboard", Action::View, now), Decision::Allow);
        }

        let global = access.effective_permissions(user, None, now).unwrap();
        assert_eq!(global.permissions.len(), 1);
        assert!(access.cache_stats().hits > 0);
    }

    #[test]
    fn removing_a_permission_from_a_role_denies_on_next_call() {
        let access = seeded(CacheConfig::default());
        let now = Utc::now();
        let user = UserId::new();
        let org_admin = access.role_by_code(&SystemRole::OrgAdmin.code()).unwrap();
        access.assign_role(user, org_admin.id, None, None, now).unwrap();
        assert_eq!(access.decide(user, None, "crm", Action::Manage, now), Decision::Allow);

        let kept = org_admin
            .permissions
            .iter()
            .filter(|c| c.as_str() != "crm:manage")
            .cloned();
        access
            .update_role(org_admin.id, RolePatch::permissions(kept), now)
            .unwrap();

        assert_eq!(access.decide(user, None, "crm", Action::Manage, now), Decision::Deny);
        assert_eq!(access.decide(user, None, "users", Action::Manage, now), Decision::Allow);
    }

    #[test]
    fn role_update_reaches_org_scoped_assignees() {
        let access = seeded(CacheConfig::default());
        let now = Utc::now();
        let user = UserId::new();
        let (org_a, org_b) = (Some(OrganizationId::new()), Some(OrganizationId::new()));
        let analyst = access
            .create_role(
                NewRole::custom(RoleCode::parse("CRM_ANALYST").unwrap(), "CRM analyst"),
                &[PermissionCode::from("crm:view")],
                now,
            )
            .unwrap();
        access.assign_role(user, analyst.id, org_a, None, now).unwrap();

        for _ in 0..2 {
            assert_eq!(access.decide(user, org_a, "crm", Action::View, now), Decision::Allow);
            assert_eq!(access.decide(user, org_a, "crm", Action::Manage, now), Decision::Deny);
        }

        access
            .update_role(
                analyst.id,
                RolePatch::permissions([PermissionCode::from("crm:manage")]),
                now,
            )
            .unwrap();
        assert_eq!(access.decide(user, org_a, "crm", Action::Manage, now), Decision::Allow);
        assert_eq!(access.decide(user, org_b, "crm", Action::Manage, now), Decision::Deny);

        access
            .update_role(analyst.id, RolePatch::permissions(Vec::new()), now)
            .unwrap();
        assert_eq!(access.decide(user, org_a, "crm", Action::View, now), Decision::Deny);
        assert_eq!(access.decide(user, org_a, "crm", Action::Manage, now), Decision::Deny);
    }

    #[test]
    fn expired_assignment_stops_granting_without_invalidation() {
        let access = seeded(CacheConfig::default());
        let start = Utc::now();
        let user = UserId::new();
        let role = access.role_by_code(&SystemRole::User.code()).unwrap();
        access
            .assign_role(user, role.id, None, Some(start + Duration::minutes(5)), start)
            .unwrap();

        assert_eq!(access.decide(user, None, "inventory", Action::View, start), Decision::Allow);
        let later = start + Duration::minutes(5);
        assert_eq!(access.decide(user, None, "inventory", Action::View, later), Decision::Deny);
        assert!(access.user_roles(user, None, later).unwrap().is_empty());
    }

    #[test]
    fn reassigning_overwrites_expiry() {
        let access = seeded(CacheConfig::default());
        let start = Utc::now();
        let user = UserId::new();
        let role = access.role_by_code(&SystemRole::User.code()).unwrap();

        let first = access
            .assign_role(user, role.id, None, Some(start + Duration::minutes(1)), start)
            .unwrap();
        let second = access
            .assign_role(user, role.id, None, None, start + Duration::seconds(30))
            .unwrap();
        assert_eq!(second.assigned_at, first.assigned_at);
        assert_eq!(second.expires_at, None);

        let later = start + Duration::hours(1);
        assert_eq!(access.decide(user, None, "inventory", Action::View, later), Decision::Allow);
    }

    #[test]
    fn force_delete_removes_assignments_and_denies() {
        let access = seeded(CacheConfig::default());
        let now = Utc::now();
        let user = UserId::new();
        let auditor = access
            .create_role(
                NewRole::custom(RoleCode::parse("AUDITOR").unwrap(), "Auditor"),
                &[PermissionCode::from("accounting:view")],
                now,
            )
            .unwrap();
        access.assign_role(user, auditor.id, None, None, now).unwrap();
        assert_eq!(access.check_access(user, None, "/accounting", now), AccessOutcome::Allow);

        assert!(matches!(
            access.delete_role(auditor.id, false, now),
            Err(RbacError::RoleInUse { .. })
        ));
        access.delete_role(auditor.id, true, now).unwrap();
        assert_eq!(access.check_access(user, None, "/accounting", now), AccessOutcome::Deny);
    }

    #[test]
    fn concurrent_assign_and_authorize() {
        let access = Arc::new(seeded(CacheConfig::default()));
        let role = access.role_by_code(&SystemRole::User.code()).unwrap();
        let user = UserId::new();
        let org = Some(OrganizationId::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let access = access.clone();
                thread::spawn(move || {
                    access.assign_role(user, role.id, org, None, Utc::now()).unwrap();
                    access.decide(user, org, "crm", Action::View, Utc::now())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Decision::Allow);
        }
        assert_eq!(access.user_assignments(user, org, Utc::now()).unwrap().len(), 1);
    }

    #[test]
    fn revocation_racing_readers_never_leaves_a_stale_allow() {
        let access = Arc::new(seeded(CacheConfig::default()));
        let role = access.role_by_code(&SystemRole::User.code()).unwrap();
        let user = UserId::new();
        access.assign_role(user, role.id, None, None, Utc::now()).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let access = access.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        access.decide(user, None, "crm", Action::View, Utc::now());
                    }
                })
            })
            .collect();

        access.revoke_role(user, role.id, None).unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(access.decide(user, None, "crm", Action::View, Utc::now()), Decision::Deny);
    }

    #[test]
    fn ttl_bounded_cache_still_sees_mutations() {
        let access = seeded(CacheConfig {
            ttl: Some(std::time::Duration::from_secs(60)),
            capacity: 2,
        });
        let now = Utc::now();
        let role = access.role_by_code(&SystemRole::Guest.code()).unwrap();

        let users: Vec<UserId> = (0..5).map(|_| UserId::new()).collect();
        for user in &users {
            access.assign_role(*user, role.id, None, None, now).unwrap();
            assert_eq!(access.decide(*user, None, "dashboard", Action::View, now), Decision::Allow);
        }
        assert!(access.cache_stats().entries <= 2);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cached decisions against a plain model of the assignments
    // ─────────────────────────────────────────────────────────────────────────

    mod model {
        use std::collections::HashSet;

        use proptest::prelude::*;

        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Assign(usize, usize),
            Revoke(usize, usize),
            Check(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..4usize, 0..3usize).prop_map(|(r, s)| Op::Assign(r, s)),
                (0..4usize, 0..3usize).prop_map(|(r, s)| Op::Revoke(r, s)),
                (0..3usize).prop_map(Op::Check),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn cached_decisions_match_the_model(ops in proptest::collection::vec(op(), 1..40)) {
                let access = seeded(CacheConfig::default());
                let now = Utc::now();
                let user = UserId::new();
                let scopes = [None, Some(OrganizationId::new()), Some(OrganizationId::new())];
                let roles: Vec<_> = SystemRole::ALL
                    .iter()
                    .map(|r| access.role_by_code(&r.code()).unwrap())
                    .collect();
                // GUEST is the only system role without crm:view.
                let grants_crm = |r: usize| SystemRole::ALL[r] != SystemRole::Guest;

                let mut held: HashSet<(usize, usize)> = HashSet::new();
                for op in ops {
                    match op {
                        Op::Assign(r, s) => {
                            access.assign_role(user, roles[r].id, scopes[s], None, now).unwrap();
                            held.insert((r, s));
                        }
                        Op::Revoke(r, s) => {
                            let removed = access.revoke_role(user, roles[r].id, scopes[s]).unwrap();
                            prop_assert_eq!(removed, held.remove(&(r, s)));
                        }
                        Op::Check(s) => {
                            let expected = held
                                .iter()
                                .any(|&(r, scope)| grants_crm(r) && (scope == 0 || scope == s));
                            let decision = access.decide(user, scopes[s], "crm", Action::View, now);
                            prop_assert_eq!(decision, Decision::from(expected));
                        }
                    }
                }
            }
        }
    }
}
