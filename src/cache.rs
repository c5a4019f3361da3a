//! # Query Cache
//!
//! This module implements a type-erased cache for query results, supporting:
//! - **Staleness**: Entries can be marked stale (invalidated) or age past a stale time;
//!   stale entries are still served while a refetch runs.
//! - **Invalidation by prefix**: Every entry of a resource can be marked stale at once.
//! - **Expiration**: Entries older than a configurable TTL are dropped on lookup.
//! - **LRU Eviction**: Least-recently-used entries are evicted to maintain a size limit.
//! - **Access/Usage Stats**: Provides statistics for cache introspection and tuning.
//!
//! ## Example
//! ```rust,no_run
//! use scout_data::cache::QueryCache;
//! use scout_data::key::{CacheKey, Resource};
//!
//! let cache = QueryCache::new();
//! cache.set(CacheKey::new(Resource::Schools), vec!["Lincoln High".to_string()]);
//! let value: Option<Vec<String>> = cache.get(&CacheKey::new(Resource::Schools));
//! ```

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use crate::{
    key::{CacheKey, Resource},
    platform::Instant,
};

/// Options for cache retrieval operations
#[derive(Debug, Clone, Default)]
pub struct CacheGetOptions {
    /// Optional expiration duration - entries older than this will be removed
    pub expiration: Option<Duration>,
    /// Optional stale time - entries older than this are reported as stale
    pub stale_time: Option<Duration>,
}

impl CacheGetOptions {
    /// Create new cache get options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiration duration
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Set the stale time
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }
}

/// Result type for cache get operations with staleness information
#[derive(Debug, Clone)]
pub struct CacheGetResult<T> {
    /// The cached data
    pub data: T,
    /// Whether the data should be refetched before it is trusted
    pub is_stale: bool,
}

/// A type-erased cache entry for storing query results with timestamp and access tracking
#[derive(Clone)]
pub struct CacheEntry {
    data: Arc<dyn Any + Send + Sync>,
    cached_at: Arc<Mutex<Instant>>,
    last_accessed: Arc<Mutex<Instant>>,
    access_count: Arc<AtomicU32>,
    invalidated: Arc<AtomicBool>,
}

impl CacheEntry {
    /// Creates a new, fresh cache entry with the given data.
    pub fn new<T: Clone + Send + Sync + 'static>(data: T) -> Self {
        let now = Instant::now();
        Self {
            data: Arc::new(data),
            cached_at: Arc::new(Mutex::new(now)),
            last_accessed: Arc::new(Mutex::new(now)),
            access_count: Arc::new(AtomicU32::new(0)),
            invalidated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Retrieves the cached data of type `T`.
    ///
    /// # Returns
    ///
    /// `None` if the stored value is not a `T`.
    ///
    /// # Side Effects
    ///
    /// Updates the `last_accessed` timestamp and increments the `access_count`.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        if let Ok(mut last_accessed) = self.last_accessed.lock() {
            *last_accessed = Instant::now();
        }
        self.access_count.fetch_add(1, Ordering::SeqCst);
        self.data.downcast_ref::<T>().cloned()
    }

    /// Refreshes the cached_at timestamp and clears any invalidation mark.
    pub fn refresh_timestamp(&self) {
        if let Ok(mut cached_at) = self.cached_at.lock() {
            *cached_at = Instant::now();
        }
        self.invalidated.store(false, Ordering::SeqCst);
    }

    /// Marks the entry as needing a refetch. The data stays readable.
    pub fn mark_invalidated(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }

    /// Whether the entry was explicitly invalidated since it was last stored.
    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::SeqCst)
    }

    /// Checks if the cache entry has expired based on the given expiration duration.
    pub fn is_expired(&self, expiration: Duration) -> bool {
        if let Ok(cached_at) = self.cached_at.lock() {
            cached_at.elapsed() > expiration
        } else {
            false
        }
    }

    /// Checks if the cache entry is stale, either because it was invalidated
    /// or because it is older than `stale_time`.
    pub fn is_stale(&self, stale_time: Option<Duration>) -> bool {
        if self.is_invalidated() {
            return true;
        }
        match (stale_time, self.cached_at.lock()) {
            (Some(stale_time), Ok(cached_at)) => cached_at.elapsed() > stale_time,
            _ => false,
        }
    }

    /// Gets the current access count for the cache entry.
    pub fn access_count(&self) -> u32 {
        self.access_count.load(Ordering::SeqCst)
    }

    /// Checks if the cache entry hasn't been accessed for the given duration.
    pub fn is_unused_for(&self, duration: Duration) -> bool {
        if let Ok(last_accessed) = self.last_accessed.lock() {
            last_accessed.elapsed() > duration
        } else {
            false
        }
    }

    /// Gets the time since this entry was last accessed.
    pub fn time_since_last_access(&self) -> Duration {
        if let Ok(last_accessed) = self.last_accessed.lock() {
            last_accessed.elapsed()
        } else {
            Duration::from_secs(0)
        }
    }

    /// Gets the age of this cache entry.
    pub fn age(&self) -> Duration {
        if let Ok(cached_at) = self.cached_at.lock() {
            cached_at.elapsed()
        } else {
            Duration::from_secs(0)
        }
    }
}

/// Process-wide store of query results, shared by every reader of a [`QueryClient`](crate::client::QueryClient)
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
}

impl QueryCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a cached result by key, ignoring staleness.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &CacheKey) -> Option<T> {
        self.entries.lock().ok()?.get(key)?.get::<T>()
    }

    /// Retrieves a cached result with configurable options
    ///
    /// Handles expiration and staleness checking in one pass.
    ///
    /// # Returns
    ///
    /// `None` when the key is missing, holds another type, or has expired (expired
    /// entries are removed). Otherwise the data and whether it is stale.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use scout_data::cache::{QueryCache, CacheGetOptions};
    /// use scout_data::key::{CacheKey, Resource};
    /// use std::time::Duration;
    ///
    /// let cache = QueryCache::new();
    /// let options = CacheGetOptions::new()
    ///     .with_expiration(Duration::from_secs(300))
    ///     .with_stale_time(Duration::from_secs(60));
    ///
    /// let key = CacheKey::new(Resource::Stats);
    /// if let Some(result) = cache.get_with_options::<u64>(&key, &options) {
    ///     println!("Data: {}, Stale: {}", result.data, result.is_stale);
    /// }
    /// ```
    pub fn get_with_options<T: Clone + Send + Sync + 'static>(
        &self,
        key: &CacheKey,
        options: &CacheGetOptions,
    ) -> Option<CacheGetResult<T>> {
        let mut entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;

        if let Some(expiration) = options.expiration
            && entry.is_expired(expiration)
        {
            entries.remove(key);
            crate::debug_log!(
                "🗑️ [CACHE-EXPIRATION] Removing expired cache entry for key: {}",
                key
            );
            return None;
        }

        let data = entry.get::<T>()?;
        let is_stale = entry.is_stale(options.stale_time);

        Some(CacheGetResult { data, is_stale })
    }

    /// Stores a value for a given key.
    ///
    /// # Returns
    ///
    /// `true` if the value was inserted or changed, `false` if an equal value was
    /// already cached. Either way the entry ends up fresh.
    pub fn set<T: Clone + Send + Sync + PartialEq + 'static>(&self, key: CacheKey, value: T) -> bool {
        if let Ok(mut entries) = self.entries.lock() {
            if let Some(existing_entry) = entries.get_mut(&key)
                && let Some(existing_value) = existing_entry.get::<T>()
                && existing_value == value
            {
                existing_entry.refresh_timestamp();
                crate::debug_log!(
                    "⏸️ [CACHE-STORE] Value unchanged for key: {}, refreshing timestamp",
                    key
                );
                return false;
            }
            crate::log_cache_store!("Stored data for key: {}", key);
            entries.insert(key, CacheEntry::new(value));
            return true;
        }
        false
    }

    /// Whether any entry exists for `key`, stale or not.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .is_ok_and(|entries| entries.contains_key(key))
    }

    /// Marks a single entry stale.
    ///
    /// # Returns
    ///
    /// Whether an entry existed for the key.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let found = self.invalidate_where(|candidate| candidate == key);
        if found > 0 {
            crate::log_cache_invalidate!("Invalidated cache entry for key: {}", key);
        }
        found > 0
    }

    /// Marks every entry whose key starts with `prefix` stale.
    pub fn invalidate_prefix(&self, prefix: &CacheKey) -> usize {
        let count = self.invalidate_where(|key| key.starts_with(prefix));
        crate::log_cache_invalidate!("Invalidated {} entries under {}", count, prefix);
        count
    }

    /// Marks every entry belonging to `resource` stale, whatever its filters.
    pub fn invalidate_resource(&self, resource: Resource) -> usize {
        let count = self.invalidate_where(|key| key.belongs_to(resource));
        crate::log_cache_invalidate!("Invalidated {} entries of {}", count, resource);
        count
    }

    fn invalidate_where(&self, matches: impl Fn(&CacheKey) -> bool) -> usize {
        let Ok(entries) = self.entries.lock() else {
            return 0;
        };
        let mut count = 0;
        for (key, entry) in entries.iter() {
            if matches(key) {
                entry.mark_invalidated();
                count += 1;
            }
        }
        count
    }

    /// Keys currently cached for `resource`.
    pub fn keys_of(&self, resource: Resource) -> Vec<CacheKey> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .keys()
                    .filter(|key| key.belongs_to(resource))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the entry for `key` is marked stale. `None` if there is no entry.
    pub fn is_invalidated(&self, key: &CacheKey) -> Option<bool> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).map(CacheEntry::is_invalidated)
    }

    /// Clears all cached results.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            #[cfg(feature = "tracing")]
            let count = entries.len();
            entries.clear();
            #[cfg(feature = "tracing")]
            crate::debug_log!("🗑️ [CACHE-CLEAR] Cleared {} cache entries", count);
        }
    }

    /// Gets the number of cached entries.
    pub fn size(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Cleans up unused entries based on access time.
    ///
    /// # Returns
    ///
    /// The number of unused entries removed.
    pub fn cleanup_unused_entries(&self, unused_threshold: Duration) -> usize {
        if let Ok(mut entries) = self.entries.lock() {
            let initial_size = entries.len();
            entries.retain(|_key, entry| {
                let should_keep = !entry.is_unused_for(unused_threshold);
                #[cfg(feature = "tracing")]
                if !should_keep {
                    crate::debug_log!("🧹 [CACHE-CLEANUP] Removing unused entry: {}", _key);
                }
                should_keep
            });
            let removed = initial_size - entries.len();
            if removed > 0 {
                crate::debug_log!("🧹 [CACHE-CLEANUP] Removed {} unused entries", removed);
            }
            removed
        } else {
            0
        }
    }

    /// Evicts least recently used entries to maintain cache size limit.
    ///
    /// # Returns
    ///
    /// The number of entries evicted.
    pub fn evict_lru_entries(&self, max_size: usize) -> usize {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() <= max_size {
                return 0;
            }

            let mut drained: Vec<_> = entries.drain().collect();

            // Most recently used first
            drained.sort_by_key(|(_, entry)| entry.time_since_last_access());

            let evicted = drained.split_off(max_size.min(drained.len()));
            entries.extend(drained);

            if !evicted.is_empty() {
                crate::debug_log!(
                    "🗑️ [LRU-EVICT] Evicted {} entries due to cache size limit",
                    evicted.len()
                );
            }
            evicted.len()
        } else {
            0
        }
    }

    /// Performs comprehensive cache maintenance: unused cleanup, then LRU eviction.
    pub fn maintain(&self, unused_threshold: Duration, max_size: usize) -> CacheMaintenanceStats {
        CacheMaintenanceStats {
            unused_removed: self.cleanup_unused_entries(unused_threshold),
            lru_evicted: self.evict_lru_entries(max_size),
            final_size: self.size(),
            subscriptions_pruned: 0,
        }
    }

    /// Gets cache statistics.
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.lock() {
            let mut total_age = Duration::ZERO;
            let mut total_accesses = 0;
            let mut stale_count = 0;

            for entry in entries.values() {
                total_age += entry.age();
                total_accesses += entry.access_count();
                if entry.is_invalidated() {
                    stale_count += 1;
                }
            }

            let entry_count = entries.len();
            let avg_age = if entry_count > 0 {
                total_age / entry_count as u32
            } else {
                Duration::ZERO
            };

            CacheStats {
                entry_count,
                stale_count,
                total_accesses,
                avg_age,
            }
        } else {
            CacheStats::default()
        }
    }
}

/// Statistics for cache maintenance operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMaintenanceStats {
    pub unused_removed: usize,
    pub lru_evicted: usize,
    pub final_size: usize,
    /// Refresh subscriptions dropped alongside; filled in by [`QueryClient::maintain`](crate::client::QueryClient::maintain).
    pub subscriptions_pruned: usize,
}

/// General cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entry_count: usize,
    pub stale_count: usize,
    pub total_accesses: u32,
    pub avg_age: Duration,
}

impl CacheStats {
    pub fn avg_accesses_per_entry(&self) -> f64 {
        if self.entry_count > 0 {
            self.total_accesses as f64 / self.entry_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schools() -> CacheKey {
        CacheKey::new(Resource::Schools)
    }

    #[test]
    fn set_reports_whether_value_changed() {
        let cache = QueryCache::new();
        assert!(cache.set(schools(), vec![1u32, 2]));
        assert!(!cache.set(schools(), vec![1u32, 2]));
        assert!(cache.set(schools(), vec![3u32]));
        assert_eq!(cache.get::<Vec<u32>>(&schools()), Some(vec![3]));
    }

    #[test]
    fn wrong_type_is_a_miss() {
        let cache = QueryCache::new();
        cache.set(schools(), 7u32);
        assert_eq!(cache.get::<String>(&schools()), None);
    }

    #[test]
    fn invalidate_resource_marks_every_filtered_view() {
        let cache = QueryCache::new();
        cache.set(CacheKey::new(Resource::Reports).filter(None), 1u32);
        cache.set(CacheKey::new(Resource::Reports).filter(Some("safety")), 2u32);
        cache.set(CacheKey::new(Resource::Reports).id("r1"), 3u32);
        cache.set(CacheKey::new(Resource::Units), 4u32);

        assert_eq!(cache.invalidate_resource(Resource::Reports), 3);

        let options = CacheGetOptions::new();
        for key in cache.keys_of(Resource::Reports) {
            let hit = cache.get_with_options::<u32>(&key, &options).unwrap();
            assert!(hit.is_stale, "{key} should be stale");
        }
        let units = cache
            .get_with_options::<u32>(&CacheKey::new(Resource::Units), &options)
            .unwrap();
        assert!(!units.is_stale);
        // invalidation keeps the data around
        assert_eq!(cache.size(), 4);
    }

    #[test]
    fn storing_again_clears_the_stale_mark() {
        let cache = QueryCache::new();
        cache.set(schools(), 1u32);
        assert!(cache.invalidate(&schools()));
        assert_eq!(cache.is_invalidated(&schools()), Some(true));

        // unchanged value still counts as a refresh
        assert!(!cache.set(schools(), 1u32));
        assert_eq!(cache.is_invalidated(&schools()), Some(false));
    }

    #[test]
    fn invalidate_prefix_only_touches_matching_keys() {
        let cache = QueryCache::new();
        let audit = |user: Option<&str>| {
            CacheKey::new(Resource::Audit)
                .optional_id(user)
                .filter(None)
                .limit(None)
        };
        cache.set(audit(Some("u1")), 1u32);
        cache.set(audit(Some("u2")), 2u32);

        let prefix = CacheKey::new(Resource::Audit).optional_id(Some("u1"));
        assert_eq!(cache.invalidate_prefix(&prefix), 1);
        assert_eq!(cache.is_invalidated(&audit(Some("u1"))), Some(true));
        assert_eq!(cache.is_invalidated(&audit(Some("u2"))), Some(false));
    }

    #[test]
    fn stale_time_ages_entries() {
        let cache = QueryCache::new();
        cache.set(schools(), 1u32);
        std::thread::sleep(Duration::from_millis(5));

        let aged = CacheGetOptions::new().with_stale_time(Duration::from_millis(1));
        assert!(cache.get_with_options::<u32>(&schools(), &aged).unwrap().is_stale);

        let lenient = CacheGetOptions::new().with_stale_time(Duration::from_secs(60));
        assert!(!cache.get_with_options::<u32>(&schools(), &lenient).unwrap().is_stale);
    }

    #[test]
    fn expired_entries_are_removed_on_lookup() {
        let cache = QueryCache::new();
        cache.set(schools(), 1u32);
        std::thread::sleep(Duration::from_millis(5));

        let options = CacheGetOptions::new().with_expiration(Duration::from_millis(1));
        assert!(cache.get_with_options::<u32>(&schools(), &options).is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn lru_eviction_keeps_recent_entries() {
        let cache = QueryCache::new();
        cache.set(CacheKey::new(Resource::Schools), 1u32);
        cache.set(CacheKey::new(Resource::Units), 2u32);
        std::thread::sleep(Duration::from_millis(5));
        cache.set(CacheKey::new(Resource::Stats), 3u32);
        let _ = cache.get::<u32>(&CacheKey::new(Resource::Schools));

        assert_eq!(cache.evict_lru_entries(2), 1);
        assert_eq!(cache.size(), 2);
        assert!(cache.get::<u32>(&CacheKey::new(Resource::Units)).is_none());
        assert_eq!(cache.evict_lru_entries(2), 0);
    }

    #[test]
    fn maintain_drops_unused_then_evicts() {
        let cache = QueryCache::new();
        cache.set(CacheKey::new(Resource::Schools), 1u32);
        std::thread::sleep(Duration::from_millis(5));

        let stats = cache.maintain(Duration::from_millis(1), 10);
        assert_eq!(
            stats,
            CacheMaintenanceStats {
                unused_removed: 1,
                lru_evicted: 0,
                final_size: 0,
                subscriptions_pruned: 0,
            }
        );
    }

    #[test]
    fn stats_count_stale_entries() {
        let cache = QueryCache::new();
        cache.set(CacheKey::new(Resource::Units), 1u32);
        cache.set(CacheKey::new(Resource::Units).id("u1"), 2u32);
        cache.invalidate(&CacheKey::new(Resource::Units).id("u1"));
        let _ = cache.get::<u32>(&CacheKey::new(Resource::Units));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.stale_count, 1);
        assert!(stats.avg_accesses_per_entry() > 0.0);
    }
}
