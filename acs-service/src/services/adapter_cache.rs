//! Bounded cache of session-holding adapters.
//!
//! Entries are keyed by tenant and configuration id and checked against the
//! configuration fingerprint on every lookup. The cache is capped at
//! `max_entries` (least recently used entry goes first) and entries idle for
//! longer than `idle_ttl` are purged whenever a new adapter is inserted.

use crate::models::AcsConfiguration;
use crate::services::adapters::AcsAdapter;
use crate::services::error::AcsError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterCacheSettings {
    pub max_entries: usize,
    pub idle_ttl: Duration,
}

impl AdapterCacheSettings {
    /// Idle expiry of twice the vendor session window: an adapter unused for
    /// that long holds an expired session anyway.
    pub fn for_session_ttl(max_entries: usize, session_ttl: chrono::Duration) -> Self {
        let idle_ttl = session_ttl
            .checked_mul(2)
            .and_then(|ttl| ttl.to_std().ok())
            .unwrap_or(Duration::from_secs(3600));

        Self {
            max_entries,
            idle_ttl,
        }
    }
}

impl Default for AdapterCacheSettings {
    fn default() -> Self {
        Self::for_session_ttl(DEFAULT_MAX_ENTRIES, chrono::Duration::minutes(30))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    tenant_id: String,
    config_id: String,
}

impl CacheKey {
    fn new(tenant_id: &str, config_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            config_id: config_id.to_string(),
        }
    }
}

struct CachedAdapter {
    fingerprint: String,
    adapter: Arc<dyn AcsAdapter>,
    last_used: Instant,
    // Monotonic use counter; orders entries for LRU even when two
    // `Instant`s compare equal.
    recency: u64,
}

pub struct AdapterCache {
    settings: AdapterCacheSettings,
    entries: DashMap<CacheKey, CachedAdapter>,
    uses: AtomicU64,
}

impl AdapterCache {
    pub fn new(settings: AdapterCacheSettings) -> Self {
        Self {
            settings,
            entries: DashMap::new(),
            uses: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached adapter for `config`, building it with `build` when
    /// absent or when the configuration changed since it was cached.
    pub fn get_or_build<F>(
        &self,
        config: &AcsConfiguration,
        build: F,
    ) -> Result<Arc<dyn AcsAdapter>, AcsError>
    where
        F: FnOnce() -> Result<Arc<dyn AcsAdapter>, AcsError>,
    {
        let key = CacheKey::new(&config.tenant_id, &config.id);
        let fingerprint = config.fingerprint();

        if let Some(mut cached) = self.entries.get_mut(&key) {
            if cached.fingerprint == fingerprint {
                cached.last_used = Instant::now();
                cached.recency = self.tick();
                return Ok(cached.adapter.clone());
            }
        }

        // Runs without any shard lock held; `entry` below must not overlap it.
        self.make_room(&key);

        let entry = CachedAdapter {
            fingerprint: fingerprint.clone(),
            adapter: build()?,
            last_used: Instant::now(),
            recency: self.tick(),
        };

        match self.entries.entry(key) {
            // A concurrent caller cached the same configuration first; share it.
            Entry::Occupied(existing) if existing.get().fingerprint == fingerprint => {
                Ok(existing.get().adapter.clone())
            }
            Entry::Occupied(mut existing) => {
                tracing::info!("ACS configuration changed; replacing cached adapter");
                let adapter = entry.adapter.clone();
                existing.insert(entry);
                Ok(adapter)
            }
            Entry::Vacant(vacant) => {
                let adapter = entry.adapter.clone();
                vacant.insert(entry);
                Ok(adapter)
            }
        }
    }

    pub fn remove(&self, tenant_id: &str, config_id: &str) -> bool {
        self.entries
            .remove(&CacheKey::new(tenant_id, config_id))
            .is_some()
    }

    fn tick(&self) -> u64 {
        self.uses.fetch_add(1, Ordering::Relaxed)
    }

    fn make_room(&self, incoming: &CacheKey) {
        let idle_ttl = self.settings.idle_ttl;
        self.entries
            .retain(|_, cached| cached.last_used.elapsed() < idle_ttl);

        while self.entries.len() >= self.settings.max_entries
            && !self.entries.contains_key(incoming)
        {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|cached| cached.recency)
                .map(|cached| cached.key().clone());

            match oldest {
                Some(key) => {
                    tracing::debug!(
                        tenant_id = %key.tenant_id,
                        config_id = %key.config_id,
                        "Evicting least recently used ACS adapter"
                    );
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
