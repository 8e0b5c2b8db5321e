// Process-local TTL cache used for embed configs and dashboard summaries.
// Entries expire lazily on read and are swept periodically by a background
// task (see background_tasks.rs). Capacity overflow evicts the entry that
// was inserted first.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::app_config::config;

struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
    expires_at: Instant,
}

/// A bounded in-memory cache with per-entry TTL.
///
/// Clones of the stored value are handed out, so `T` is typically an `Arc`
/// or a small serializable struct.
pub struct SimpleCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    capacity: usize,
    default_ttl: Duration,
}

impl<T: Clone> SimpleCache<T> {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            default_ttl,
        }
    }

    /// Build a cache from the values in application config.
    pub fn from_config() -> Self {
        let cfg = &config().cache;
        Self::new(
            cfg.capacity,
            Duration::from_secs(cfg.default_ttl_seconds),
        )
    }

    /// Fetch a value if present and not expired. Expired entries are
    /// removed on the spot.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL, evicting the oldest entry when full.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            // Evict the entry inserted longest ago
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                debug!(evicted_key = %oldest, "cache at capacity, evicting oldest entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Drop a single key, e.g. after the underlying row changed.
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    /// Drop every key with the given prefix. Used when a mutation affects a
    /// family of cached views (all summaries of one page, for instance).
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|k, _| !k.starts_with(prefix));
    }

    /// Remove all expired entries. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_set_and_get() {
        let cache: SimpleCache<String> = SimpleCache::new(10, Duration::from_secs(60));
        cache.set("a", "alpha".to_string());
        assert_eq!(cache.get("a"), Some("alpha".to_string()));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_expired_entry_removed_on_get() {
        let cache: SimpleCache<u32> = SimpleCache::new(10, Duration::from_millis(10));
        cache.set("k", 1);
        sleep(Duration::from_millis(25));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_insertion() {
        let cache: SimpleCache<u32> = SimpleCache::new(2, Duration::from_secs(60));
        cache.set("first", 1);
        sleep(Duration::from_millis(2));
        cache.set("second", 2);
        sleep(Duration::from_millis(2));
        cache.set("third", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("first"), None);
        assert_eq!(cache.get("second"), Some(2));
        assert_eq!(cache.get("third"), Some(3));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache: SimpleCache<u32> = SimpleCache::new(2, Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_invalidate_prefix() {
        let cache: SimpleCache<u32> = SimpleCache::new(10, Duration::from_secs(60));
        cache.set("summary:p1:7", 1);
        cache.set("summary:p1:30", 2);
        cache.set("summary:p2:7", 3);
        cache.invalidate_prefix("summary:p1:");
        assert_eq!(cache.get("summary:p1:7"), None);
        assert_eq!(cache.get("summary:p1:30"), None);
        assert_eq!(cache.get("summary:p2:7"), Some(3));
    }

    #[test]
    fn test_sweep_drops_only_expired() {
        let cache: SimpleCache<u32> = SimpleCache::new(10, Duration::from_secs(60));
        cache.set_with_ttl("short", 1, Duration::from_millis(5));
        cache.set_with_ttl("long", 2, Duration::from_secs(60));
        sleep(Duration::from_millis(20));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }
}
