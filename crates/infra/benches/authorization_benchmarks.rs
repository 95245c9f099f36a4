use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use warden_auth::{Action, SystemRole};
use warden_core::{OrganizationId, UserId};
use warden_infra::seed::{default_route_registry, seed_defaults};
use warden_infra::{AccessControl, CacheConfig};

fn seeded(config: CacheConfig) -> AccessControl {
    let access = AccessControl::in_memory(default_route_registry().unwrap(), config);
    seed_defaults(&access, Utc::now()).unwrap();
    access
}

/// A cache with zero TTL recomputes on every call.
fn uncached() -> CacheConfig {
    CacheConfig {
        ttl: Some(std::time::Duration::ZERO),
        ..CacheConfig::default()
    }
}

fn bench_authorize_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("authorize_latency");
    group.sample_size(1000);

    for (label, config) in [("cached", CacheConfig::default()), ("uncached", uncached())] {
        let access = seeded(config);
        let user = UserId::new();
        let org = Some(OrganizationId::new());
        for role in SystemRole::ALL {
            let role = access.role_by_code(&role.code()).unwrap();
            access.assign_role(user, role.id, org, None, Utc::now()).unwrap();
        }

        group.bench_function(label, |b| {
            b.iter(|| {
                let now = Utc::now();
                black_box(access.decide(user, org, black_box("inventory"), Action::Manage, now))
            });
        });
    }

    group.finish();
}

fn bench_route_guard(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_guard");
    let access = seeded(CacheConfig::default());
    let user = UserId::new();
    let role = access.role_by_code(&SystemRole::User.code()).unwrap();
    access.assign_role(user, role.id, None, None, Utc::now()).unwrap();

    for path in ["/login", "/dashboard", "/crm/42/edit", "/settings"] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(path), &path, |b, path| {
            b.iter(|| black_box(access.check_access(user, None, path, Utc::now())));
        });
    }

    group.finish();
}

fn bench_invalidation_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_update_invalidation");

    for assignees in [10usize, 100, 1000] {
        let access = seeded(CacheConfig::default());
        let role = access.role_by_code(&SystemRole::User.code()).unwrap();
        for _ in 0..assignees {
            let user = UserId::new();
            access.assign_role(user, role.id, None, None, Utc::now()).unwrap();
            access.decide(user, None, "crm", Action::View, Utc::now());
        }

        group.throughput(Throughput::Elements(assignees as u64));
        group.bench_with_input(BenchmarkId::from_parameter(assignees), &assignees, |b, _| {
            b.iter(|| {
                let patch = warden_auth::RolePatch {
                    name: Some("User".to_string()),
                    ..Default::default()
                };
                black_box(access.update_role(role.id, patch, Utc::now()).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_authorize_latency,
    bench_route_guard,
    bench_invalidation_fanout
);
criterion_main!(benches);
