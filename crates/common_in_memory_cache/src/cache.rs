use std::hash::Hash;
use std::num::NonZeroUsize;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};

/// # InMemoryCache
///
/// In-Memory Cache implementation based on LRU (last recent used) cache.
///
/// Every entry remembers when it was saved. Its age is classified against two
/// thresholds, see [Freshness]:
/// - Soft threshold, after which the value is still usable but should be refreshed:
///   ```ignore
///   let mut cache = InMemoryCache::with_capacity(256)
///       .stale_after_creation(Duration::minutes(5));
///   ```
/// - Hard threshold, after which the value must not be used at all:
///   ```ignore
///   let mut cache = InMemoryCache::with_capacity(256)
///       .expires_after_creation(Duration::hours(10));
///   ```
///
/// ### Example:
/// ```rust
/// use common_in_memory_cache::InMemoryCache;
///
/// let mut cache = InMemoryCache::with_capacity(3);
/// cache.insert(1, "Lorem");
/// cache.insert(2, "Ipsum");
/// cache.insert(3, "Dolor");
/// cache.insert(4, "Sit");
/// assert!(cache.peek_entry(&1).is_none());
/// assert_eq!(cache.peek_entry(&4).map(|(entry, _)| *entry.value()), Some("Sit"));
/// ```
pub struct InMemoryCache<K: Eq + Hash, V> {
    entries: LruCache<K, Entry<V>>,
    stale_after_creation: Option<Duration>,
    expires_after_creation: Option<Duration>,
}

/// # InMemoryCache.Entry
///
/// The `Entry` wraps stored value and holds the moment it was saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<V> {
    value: V,
    saved_at: DateTime<Utc>,
}

/// Age class of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Age is within the soft threshold.
    Fresh,
    /// Soft threshold exceeded, hard threshold not.
    Stale,
    /// Hard threshold exceeded.
    Expired,
}

impl Freshness {
    /// Both `Fresh` and `Stale` values may be served.
    pub fn is_usable(&self) -> bool {
        !matches!(self, Freshness::Expired)
    }
}

impl<V> Entry<V> {
    pub fn new(value: V) -> Self {
        Self::with_saved_at(value, Utc::now())
    }

    /// Restore an entry whose age is known, e.g. one read back from the disk.
    pub fn with_saved_at(value: V, saved_at: DateTime<Utc>) -> Self {
        Self { value, saved_at }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn saved_at(&self) -> DateTime<Utc> {
        self.saved_at
    }
}

impl<K: Eq + Hash, V> InMemoryCache<K, V> {
    /// Create in-memory cache instance with specified capacity.
    ///
    /// Zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            stale_after_creation: None,
            expires_after_creation: None,
        }
    }

    /// Set soft expiration policy by creation time.
    ///
    /// Value will be considered as [Freshness::Stale]
    /// if sum of its creation time and `duration` is less than current time.
    pub fn stale_after_creation(mut self, duration: Duration) -> Self {
        self.stale_after_creation = Some(duration);
        self
    }

    /// Set hard expiration policy by creation time.
    ///
    /// Value will be considered as [Freshness::Expired]
    /// if sum of its creation time and `duration` is less than current time.
    pub fn expires_after_creation(mut self, duration: Duration) -> Self {
        self.expires_after_creation = Some(duration);
        self
    }

    /// Insert value into the cache
    ///
    /// If an entry with key `k` already exists in the cache or another cache entry is removed
    /// (due to the lru's capacity), then it returns the old entry's key-value pair.
    /// Otherwise, returns `None`.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, Entry<V>)> {
        self.insert_entry(key, Entry::new(value))
    }

    /// Insert complete cache entry into the cache, keeping its original `saved_at`.
    pub fn insert_entry(&mut self, key: K, entry: Entry<V>) -> Option<(K, Entry<V>)> {
        self.entries.push(key, entry)
    }

    /// Get cache entry together with its [Freshness].
    ///
    /// Does not remove expired entries from cache.
    pub fn peek_entry(&mut self, key: &K) -> Option<(&'_ Entry<V>, Freshness)> {
        let now = Utc::now();
        let stale_after = self.stale_after_creation;
        let expires_after = self.expires_after_creation;
        self.entries
            .get(key)
            .map(|entry| (entry, classify(entry.saved_at, now, stale_after, expires_after)))
    }

    /// Classify an entry that lives outside of this cache with this cache's thresholds.
    pub fn freshness_of(&self, saved_at: DateTime<Utc>) -> Freshness {
        classify(
            saved_at,
            Utc::now(),
            self.stale_after_creation,
            self.expires_after_creation,
        )
    }
}

fn classify(
    saved_at: DateTime<Utc>,
    now: DateTime<Utc>,
    stale_after: Option<Duration>,
    expires_after: Option<Duration>,
) -> Freshness {
    let age = now.signed_duration_since(saved_at);
    if expires_after.filter(|&limit| age > limit).is_some() {
        Freshness::Expired
    } else if stale_after.filter(|&limit| age > limit).is_some() {
        Freshness::Stale
    } else {
        Freshness::Fresh
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{classify, Entry, Freshness, InMemoryCache};

    fn swr_cache() -> InMemoryCache<&'static str, i32> {
        InMemoryCache::with_capacity(10)
            .stale_after_creation(Duration::minutes(5))
            .expires_after_creation(Duration::hours(10))
    }

    fn aged(value: i32, age: Duration) -> Entry<i32> {
        Entry::with_saved_at(value, Utc::now() - age)
    }

    fn peek<V: Copy>(cache: &mut InMemoryCache<&'static str, V>, key: &'static str) -> Option<(V, Freshness)> {
        cache
            .peek_entry(&key)
            .map(|(entry, freshness)| (*entry.value(), freshness))
    }

    #[test]
    fn test_insert_then_peek() {
        let mut cache = InMemoryCache::with_capacity(10);
        cache.insert("Hello", 1);
        cache.insert("World", 2);
        assert_eq!(peek(&mut cache, "Hello"), Some((1, Freshness::Fresh)));
        assert_eq!(peek(&mut cache, "World"), Some((2, Freshness::Fresh)));
    }

    #[test]
    fn test_peek_classifies_by_age() {
        let mut cache = swr_cache();
        cache.insert_entry("fresh", aged(1, Duration::minutes(4)));
        cache.insert_entry("stale", aged(2, Duration::minutes(6)));
        cache.insert_entry("expired", aged(3, Duration::hours(11)));

        assert_eq!(peek(&mut cache, "fresh"), Some((1, Freshness::Fresh)));
        assert_eq!(peek(&mut cache, "stale"), Some((2, Freshness::Stale)));
        assert_eq!(peek(&mut cache, "expired"), Some((3, Freshness::Expired)));
        // expired entries stay until replaced or evicted
        assert_eq!(peek(&mut cache, "expired"), Some((3, Freshness::Expired)));
    }

    #[test]
    fn test_freshness_of_outside_entry() {
        let cache = swr_cache();
        assert_eq!(cache.freshness_of(Utc::now() - Duration::minutes(6)), Freshness::Stale);
        assert_eq!(cache.freshness_of(Utc::now() - Duration::hours(11)), Freshness::Expired);
    }

    #[test]
    fn test_reinsert_refreshes_saved_at() {
        let mut cache = swr_cache();
        cache.insert_entry("key", aged(1, Duration::minutes(30)));
        assert_eq!(peek(&mut cache, "key").map(|it| it.1), Some(Freshness::Stale));

        let replaced = cache.insert("key", 1);
        assert!(matches!(replaced, Some(("key", _))));
        assert_eq!(peek(&mut cache, "key").map(|it| it.1), Some(Freshness::Fresh));
    }

    #[test]
    fn test_classify_boundaries() {
        let now = Utc::now();
        let soft = Some(Duration::minutes(5));
        let hard = Some(Duration::hours(10));
        assert_eq!(
            classify(now - Duration::minutes(5), now, soft, hard),
            Freshness::Fresh
        );
        assert_eq!(
            classify(now - Duration::hours(10), now, soft, hard),
            Freshness::Stale
        );
        assert_eq!(
            classify(now - Duration::hours(10) - Duration::seconds(1), now, soft, hard),
            Freshness::Expired
        );
        assert_eq!(
            classify(now - Duration::days(365), now, None, None),
            Freshness::Fresh
        );
    }

    #[test]
    fn test_maximum_capacity() {
        let mut cache = InMemoryCache::with_capacity(3);
        cache.insert("1", "Lorem");
        cache.insert("2", "Ipsum");
        cache.insert("3", "Dolor");
        let evicted = cache.insert("4", "Sit");
        assert!(matches!(evicted, Some(("1", _))));
        cache.insert("5", "Amet");
        assert_eq!(peek(&mut cache, "1"), None);
        assert_eq!(peek(&mut cache, "2"), None);
        assert_eq!(peek(&mut cache, "3").map(|it| it.0), Some("Dolor"));
        assert_eq!(peek(&mut cache, "4").map(|it| it.0), Some("Sit"));
        assert_eq!(peek(&mut cache, "5").map(|it| it.0), Some("Amet"));
    }
}
