//! Bounded TTL cache for rendered context strings.
//!
//! Expensive per-entity context lookups (a denormalized call transcript, a
//! company profile with its recent calls) are cached here under
//! source-qualified keys such as `call:<id>` and `company:<id>`.
//!
//! Eviction is by **insertion order**, not LRU: when the cache is full, the
//! earliest-inserted entry still present is dropped to make room. Re-setting
//! an existing key refreshes its value and TTL but keeps its original
//! position in the eviction queue. Expired entries are removed lazily on
//! read; a read never extends an entry's lifetime.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default capacity bound.
pub const DEFAULT_CAPACITY: usize = 100;

/// Injectable cache contract for context call sites.
///
/// The pipeline never depends on the concrete store, so tests can substitute
/// a fixture and multi-instance deployments can swap in a shared cache
/// without touching the fetchers.
pub trait ContextCache: Send + Sync {
    /// Look up a key. Returns `None` for absent or expired entries; an
    /// expired entry is removed as a side effect.
    fn get(&self, key: &str) -> Option<String>;

    /// Insert or refresh a key with the configured TTL from now.
    fn set(&self, key: &str, value: String);
}

struct Slot {
    value: String,
    expires_at: Instant,
}

struct CacheInner {
    slots: HashMap<String, Slot>,
    /// Keys in insertion order; the front is next in line for eviction.
    order: VecDeque<String>,
}

impl CacheInner {
    fn remove(&mut self, key: &str) {
        self.slots.remove(key);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}

/// In-process TTL cache with a fixed capacity bound.
pub struct TtlCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    capacity: usize,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl TtlCache {
    /// Create a cache with an explicit TTL and capacity.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                slots: HashMap::new(),
                order: VecDeque::new(),
            }),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Current number of entries, including any not yet lazily expired.
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// True when no entries are held.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().slots.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.slots.clear();
        inner.order.clear();
    }
}

impl ContextCache for TtlCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock();

        let expired = match inner.slots.get(key) {
            Some(slot) => Instant::now() > slot.expires_at,
            None => return None,
        };

        if expired {
            debug!(key = %key, "cache entry expired, removing");
            inner.remove(key);
            return None;
        }

        trace!(key = %key, "cache hit");
        inner.slots.get(key).map(|slot| slot.value.clone())
    }

    fn set(&self, key: &str, value: String) {
        let mut inner = self.inner.lock();
        let expires_at = Instant::now() + self.ttl;

        if let Some(slot) = inner.slots.get_mut(key) {
            // Refresh in place; the key keeps its eviction-queue position.
            slot.value = value;
            slot.expires_at = expires_at;
            return;
        }

        if inner.slots.len() >= self.capacity
            && let Some(oldest) = inner.order.pop_front()
        {
            debug!(key = %oldest, "cache full, evicting earliest-inserted entry");
            inner.slots.remove(&oldest);
        }

        inner.order.push_back(key.to_string());
        inner.slots.insert(key.to_string(), Slot { value, expires_at });
        trace!(key = %key, size = inner.slots.len(), "cache entry inserted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let cache = TtlCache::default();
        cache.set("call:1", "transcript text".to_string());

        assert_eq!(cache.get("call:1").as_deref(), Some("transcript text"));
        assert_eq!(cache.get("call:2"), None);
    }

    #[test]
    fn test_expired_entry_removed_on_read() {
        let cache = TtlCache::new(Duration::from_millis(10), 10);
        cache.set("company:7", "profile".to_string());

        thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get("company:7"), None);
        // Removed, not just hidden.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_does_not_extend_ttl() {
        let cache = TtlCache::new(Duration::from_millis(50), 10);
        cache.set("call:1", "v".to_string());

        thread::sleep(Duration::from_millis(30));
        assert!(cache.get("call:1").is_some());

        // A second read past the original deadline must miss even though the
        // first read happened recently.
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("call:1"), None);
    }

    #[test]
    fn test_overflow_evicts_earliest_inserted() {
        let cache = TtlCache::new(Duration::from_secs(60), 3);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("c", "3".to_string());

        cache.set("d", "4".to_string());

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn test_reads_do_not_change_eviction_order() {
        let cache = TtlCache::new(Duration::from_secs(60), 3);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("c", "3".to_string());

        // Touch "a" repeatedly; insertion order decides eviction, so "a" is
        // still the first to go.
        assert!(cache.get("a").is_some());
        assert!(cache.get("a").is_some());

        cache.set("d", "4".to_string());
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_reset_keeps_queue_position() {
        let cache = TtlCache::new(Duration::from_secs(60), 3);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("c", "3".to_string());

        // Refresh "a" — value changes, position in the eviction queue does not.
        cache.set("a", "1-updated".to_string());
        cache.set("d", "4".to_string());

        assert_eq!(cache.get("a"), None);
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn test_capacity_bound_at_one_hundred() {
        let cache = TtlCache::default();
        for i in 0..101 {
            cache.set(&format!("call:{i}"), format!("v{i}"));
        }

        assert_eq!(cache.len(), 100);
        assert_eq!(cache.get("call:0"), None);
        assert!(cache.get("call:1").is_some());
        assert!(cache.get("call:100").is_some());
    }

    #[test]
    fn test_concurrent_writers_last_write_wins() {
        use std::sync::Arc;

        let cache = Arc::new(TtlCache::default());
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                cache.set("company:7", format!("writer-{i}"));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Some writer's value survives intact; no torn or missing entry.
        let value = cache.get("company:7").unwrap();
        assert!(value.starts_with("writer-"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = TtlCache::default();
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}
