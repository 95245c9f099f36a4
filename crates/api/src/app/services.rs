use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use warden_infra::seed::{default_route_registry, seed_defaults};
use warden_infra::AccessControl;

use crate::config::ApiConfig;

/// In-memory wiring: stores, cache, resolver and the default route table.
pub fn build_services(config: &ApiConfig) -> anyhow::Result<Arc<AccessControl>> {
    let registry = default_route_registry().context("default route table is invalid")?;
    let access = AccessControl::in_memory(registry, config.cache.clone());

    if config.seed_defaults {
        seed_defaults(&access, Utc::now()).context("failed to seed defaults")?;
    }

    tracing::info!(
        cache_ttl = ?config.cache.ttl,
        cache_capacity = config.cache.capacity,
        seeded = config.seed_defaults,
        "access control ready"
    );
    Ok(Arc::new(access))
}
