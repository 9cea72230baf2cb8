//! gridpilot-cache — generic expiring key→value store.
//!
//! Backs the Director's list-match and failing-CE caches. Entries are
//! visible to readers only while unexpired: `get` on an expired entry is a
//! miss even before `purge_expired` has run. All state is in-memory and
//! rebuilt from live queries after a restart.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// An in-memory key→value cache where every entry carries its own
/// time-to-live.
///
/// Safe to call from concurrent tasks; same-key races are last-writer-wins
/// and there is no cross-key ordering guarantee. Each cache instance is
/// owned by a single Director and never shared between them.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or overwrite an entry, expiring `ttl` from now.
    ///
    /// Overwriting is silent: the previous value (and its remaining
    /// lifetime) is discarded.
    pub fn add(&self, key: K, ttl: Duration, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key, entry);
    }

    /// Look up a live entry.
    ///
    /// Expired entries are misses even if `purge_expired` has not removed
    /// them yet.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Remove every entry whose expiry has passed. Live entries are never
    /// touched.
    pub fn purge_expired(&self) {
        let mut entries = self.lock();
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, remaining = entries.len(), "purged expired cache entries");
        }
    }

    /// Snapshot of the stored keys, expired entries included.
    ///
    /// Callers that need live-only keys should call `purge_expired` first.
    pub fn keys(&self) -> Vec<K> {
        self.lock().keys().cloned().collect()
    }

    /// Number of stored entries, expired entries included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, Entry<V>>> {
        // A panicked writer cannot leave an entry half-updated (inserts are
        // whole-value moves), so a poisoned lock is still safe to reuse.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const LONG: Duration = Duration::from_secs(60);
    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn get_returns_live_value() {
        let cache = TtlCache::new();
        cache.add("k", LONG, 42);
        assert_eq!(cache.get(&"k"), Some(42));
    }

    #[test]
    fn expired_entry_is_a_miss_without_purge() {
        let cache = TtlCache::new();
        cache.add("k", SHORT, 42);
        thread::sleep(SHORT * 2);
        assert_eq!(cache.get(&"k"), None);
        // Still physically present until purged.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn add_overwrites_silently() {
        let cache = TtlCache::new();
        cache.add("k", LONG, 1);
        cache.add("k", LONG, 2);
        assert_eq!(cache.get(&"k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn purge_removes_exactly_expired_entries() {
        let cache = TtlCache::new();
        cache.add("gone", SHORT, 1);
        cache.add("kept", LONG, 2);
        thread::sleep(SHORT * 2);

        cache.purge_expired();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"kept"), Some(2));
        assert_eq!(cache.get(&"gone"), None);
    }

    #[test]
    fn keys_snapshot_includes_expired_until_purged() {
        let cache = TtlCache::new();
        cache.add("a", SHORT, 1);
        cache.add("b", LONG, 2);
        thread::sleep(SHORT * 2);

        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);

        cache.purge_expired();
        assert_eq!(cache.keys(), vec!["b"]);
    }

    #[test]
    fn concurrent_add_get_purge() {
        use std::sync::Arc;

        let cache = Arc::new(TtlCache::new());
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..200u64 {
                    cache.add(i % 10, Duration::from_millis(i % 7), t);
                    cache.get(&(i % 10));
                    cache.purge_expired();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // Last writers win; nothing corrupted.
        assert!(cache.len() <= 10);
    }
}
