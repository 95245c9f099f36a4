//! Effective-permission cache.
//!
//! Keyed by `(user, organization)`. There is no expiry by default:
//! correctness relies on explicit invalidation by every mutation path. An
//! optional TTL can be configured as a second line of defence.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use warden_auth::EffectivePermissionSet;
use warden_core::{OrganizationId, UserId};

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Optional time-to-live for an entry.
    pub ttl: Option<Duration>,

    /// Soft upper bound on the number of entries.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            capacity: 100_000,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
}

impl CacheKey {
    pub fn new(user_id: UserId, organization_id: Option<OrganizationId>) -> Self {
        Self {
            user_id,
            organization_id,
        }
    }
}

#[derive(Clone)]
struct CachedEntry {
    set: Arc<EffectivePermissionSet>,
    cached_at: Instant,
}

impl CachedEntry {
    fn is_stale(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        let ttl_elapsed = ttl.is_some_and(|ttl| self.cached_at.elapsed() >= ttl);
        ttl_elapsed || !self.set.is_current_at(now)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// Concurrent per-principal cache of resolved permission sets.
///
/// Every invalidation bumps an epoch. A writer records the epoch before it
/// computes a set and hands it to [`EffectivePermissionCache::insert`]; if
/// an invalidation happened meanwhile the freshly computed set is dropped
/// instead of being served.
pub struct EffectivePermissionCache {
    entries: DashMap<CacheKey, CachedEntry>,
    config: CacheConfig,
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl EffectivePermissionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            epoch: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Arc<EffectivePermissionSet>> {
        let cached = self.entries.get(key).map(|entry| entry.value().clone());

        match cached {
            Some(entry) if !entry.is_stale(self.config.ttl, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.set)
            }
            Some(entry) => {
                self.entries
                    .remove_if(key, |_, current| current.cached_at == entry.cached_at);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a set computed while the cache was at `observed_epoch`.
    ///
    /// Returns `false` (and leaves nothing behind) if an invalidation raced
    /// with the computation.
    pub fn insert(&self, key: CacheKey, set: Arc<EffectivePermissionSet>, observed_epoch: u64) -> bool {
        if self.epoch() != observed_epoch {
            return false;
        }

        // Replacing an existing key does not grow the map.
        if self.entries.len() >= self.config.capacity && !self.entries.contains_key(&key) {
            self.evict(set.computed_at);
        }

        let cached_at = Instant::now();
        self.entries.insert(key, CachedEntry { set, cached_at });

        // Re-check after publishing: an invalidation that bumped the epoch
        // between the first check and the insert may have missed this entry.
        if self.epoch() != observed_epoch {
            self.entries
                .remove_if(&key, |_, current| current.cached_at == cached_at);
            return false;
        }
        true
    }

    pub fn invalidate(&self, user_id: UserId, organization_id: Option<OrganizationId>) {
        self.bump();
        self.entries.remove(&CacheKey::new(user_id, organization_id));
        tracing::debug!(%user_id, ?organization_id, "invalidated effective permissions");
    }

    /// Drop every scope cached for the user.
    pub fn invalidate_user(&self, user_id: UserId) {
        self.bump();
        self.entries.retain(|key, _| key.user_id != user_id);
        tracing::debug!(%user_id, "invalidated effective permissions for all scopes");
    }

    pub fn invalidate_users<'a>(&self, user_ids: impl IntoIterator<Item = &'a UserId>) {
        for user_id in user_ids {
            self.invalidate_user(*user_id);
        }
    }

    pub fn invalidate_all(&self) {
        self.bump();
        self.entries.clear();
        tracing::debug!("invalidated all effective permissions");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn bump(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop stale entries; if still at capacity, drop the oldest tenth so
    /// that the next inserts do not each pay for a full scan.
    fn evict(&self, now: DateTime<Utc>) {
        let ttl = self.config.ttl;
        self.entries.retain(|_, entry| !entry.is_stale(ttl, now));
        if self.entries.len() < self.config.capacity {
            return;
        }

        let mut by_age: Vec<(Instant, CacheKey)> = self
            .entries
            .iter()
            .map(|entry| (entry.value().cached_at, *entry.key()))
            .collect();
        if by_age.is_empty() {
            return;
        }
        let batch = (self.config.capacity / 10).clamp(1, by_age.len());
        by_age.select_nth_unstable_by_key(batch - 1, |(cached_at, _)| *cached_at);
        for (_, key) in &by_age[..batch] {
            self.entries.remove(key);
        }
        tracing::debug!(evicted = batch, "cache at capacity; evicted oldest entries");
    }
}

impl Default for EffectivePermissionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
