use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use common_errors::errors::CommonError;
use common_in_memory_cache::{Entry, Freshness, InMemoryCache};
use common_persistent_cache::PersistentCache;
use domain_schedule_models::{CacheKey, WeekSnapshot};
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::config::CacheConfig;

use super::compat::{writing, ReadingPersistentEntry, WritingPersistentEntry};

/// Where the cached snapshot came from during this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Fetched from the upstream by this process
    Network,
    /// Restored from the durable tier and not yet revalidated
    Durable,
}

/// Value of the memory tier.
#[derive(Debug, Clone)]
pub struct CachedWeek {
    pub snapshot: Arc<WeekSnapshot>,
    /// Revision of the fetch that produced the snapshot, `0` for durable records
    pub revision: u64,
    pub origin: Origin,
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub week: CachedWeek,
    pub saved_at: DateTime<Utc>,
    pub freshness: Freshness,
}

/// Two-tier week storage: LRU memory tier in front of the JSON file tier.
///
/// Expired records of either tier are treated as absent, but never purged from disk.
pub struct CacheMediator {
    in_memory_cache: Mutex<InMemoryCache<CacheKey, CachedWeek>>,
    persistent_cache: Mutex<PersistentCache>,
}

impl CacheMediator {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            in_memory_cache: Mutex::new(
                InMemoryCache::with_capacity(config.memory_capacity)
                    .stale_after_creation(config.soft_ttl)
                    .expires_after_creation(config.hard_ttl),
            ),
            persistent_cache: Mutex::new(PersistentCache::new(config.cache_dir.clone())),
        }
    }

    /// Get a usable (not expired) week, hydrating the memory tier from disk if needed.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheLookup> {
        if let Some(lookup) = self.peek_in_memory(key).await {
            return Some(lookup);
        }
        self.restore_from_persistent(key).await
    }

    /// `true` if neither tier holds a usable entry for `key`.
    pub async fn is_absent(&self, key: &CacheKey) -> bool {
        self.get(key).await.is_none()
    }

    async fn peek_in_memory(&self, key: &CacheKey) -> Option<CacheLookup> {
        let mut in_memory_cache = self.in_memory_cache.lock().await;
        match in_memory_cache.peek_entry(key) {
            Some((entry, freshness)) if freshness.is_usable() => Some(CacheLookup {
                week: entry.value().clone(),
                saved_at: entry.saved_at(),
                freshness,
            }),
            _ => None,
        }
    }

    async fn restore_from_persistent(&self, key: &CacheKey) -> Option<CacheLookup> {
        let record = self
            .persistent_cache
            .lock()
            .await
            .get::<String, ReadingPersistentEntry>(persistent_key(key))
            .await;
        let entry: Entry<WeekSnapshot> = match record {
            Ok(Some(record)) => record.into(),
            Ok(None) => return None,
            Err(e) => {
                warn!("Ignoring unreadable durable record for {key}: {e}");
                return None;
            }
        };

        let mut in_memory_cache = self.in_memory_cache.lock().await;
        let saved_at = entry.saved_at();
        let freshness = in_memory_cache.freshness_of(saved_at);
        if !freshness.is_usable() {
            debug!("Durable record for {key} is expired");
            return None;
        }
        let week = CachedWeek {
            snapshot: Arc::new(entry.into_value()),
            revision: 0,
            origin: Origin::Durable,
        };
        in_memory_cache.insert_entry(key.to_owned(), Entry::with_saved_at(week.clone(), saved_at));
        debug!("Hydrated {key} from the durable tier");
        Some(CacheLookup {
            week,
            saved_at,
            freshness,
        })
    }

    /// Put the week into the memory tier with a new `saved_at`.
    pub async fn insert_in_memory(&self, key: CacheKey, week: CachedWeek) {
        if let Some((evicted_key, _)) = self.in_memory_cache.lock().await.insert(key.to_owned(), week) {
            // entry update returns the same key, only log actual evictions
            if evicted_key != key {
                debug!("Evicted {evicted_key} from the memory tier");
            }
        }
    }

    /// Write the snapshot into the durable tier.
    pub async fn persist(
        &self,
        key: &CacheKey,
        snapshot: &WeekSnapshot,
        saved_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.persistent_cache
            .lock()
            .await
            .insert::<String, WritingPersistentEntry>(persistent_key(key), &writing(snapshot, saved_at))
            .await
            .map_err(|e| anyhow!(CommonError::internal(e)))
            .with_context(|| format!("Error while writing {key} to the durable tier"))
    }
}

/// `<group id>/<week start>.cache`, the group id percent-encoded outside `[A-Za-z0-9_-]`.
fn persistent_key(key: &CacheKey) -> String {
    let mut group_id = String::with_capacity(key.group_id.len());
    for byte in key.group_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            group_id.push(char::from(byte));
        } else {
            group_id.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("{}/{}.cache", group_id, key.week_start.format("%Y-%m-%d"))
}
