//! Fixed-capacity cache with strict least-recently-used eviction.
//!
//! Wraps `lru::LruCache`. Strict LRU ordering matters here: the fragment
//! and index caches must evict exactly the least recently accessed entry,
//! so admission-policy caches (TinyLFU and friends) are not a substitute.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

use super::CacheError;

/// Bounded key-value store evicting the least recently used entry on
/// overflow.
///
/// `get` and `put` refresh recency; `peek` and `contains` do not.
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// Create a cache holding at most `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ZeroCapacity`] when `limit` is zero.
    pub fn new(limit: usize) -> Result<Self, CacheError> {
        let limit = NonZeroUsize::new(limit).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self::with_limit(limit))
    }

    /// Create a cache with a limit known to be non-zero.
    pub fn with_limit(limit: NonZeroUsize) -> Self {
        Self {
            inner: LruCache::new(limit),
        }
    }

    /// Maximum number of resident entries.
    pub fn limit(&self) -> usize {
        self.inner.cap().get()
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Look up a value and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Mutable lookup; marks the entry most recently used.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    /// Look up a value without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.inner.peek(key)
    }

    /// Check residency without touching recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    /// Insert or replace a value, marking it most recently used.
    ///
    /// Returns the entry evicted to make room, if any. Replacing an existing
    /// key never evicts.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.inner.contains(&key) {
            self.inner.put(key, value);
            return None;
        }
        self.inner.push(key, value)
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    /// The entry that would be evicted next.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.inner.peek_lru()
    }

    /// Iterate keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.iter().map(|(key, _)| key)
    }

    /// Iterate entries from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.len())
            .field("limit", &self.limit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_limit_rejected() {
        let result: Result<BoundedCache<u32, u32>, _> = BoundedCache::new(0);
        assert!(matches!(result, Err(CacheError::ZeroCapacity)));
    }

    #[test]
    fn test_put_and_get() {
        let mut cache = BoundedCache::new(4).unwrap();
        assert_eq!(cache.put("a", 1), None);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.limit(), 4);
    }

    #[test]
    fn test_overflow_after_access_evicts_oldest_untouched() {
        // limit 2: a, b, c evicts a; the access to a misses; d evicts b.
        let mut cache = BoundedCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.put("c", 3), Some(("a", 1)));

        assert_eq!(cache.get(&"a"), None);

        assert_eq!(cache.put("d", 4), Some(("b", 2)));
        assert!(cache.contains(&"c"));
        assert!(cache.contains(&"d"));
    }

    #[test]
    fn test_access_refreshes_recency() {
        let mut cache = BoundedCache::new(3).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);

        cache.get(&"a");

        assert_eq!(cache.put("d", 4), Some(("b", 2)));
        assert!(cache.contains(&"a"));
    }

    #[test]
    fn test_peek_does_not_refresh() {
        let mut cache = BoundedCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);

        assert_eq!(cache.peek(&"a"), Some(&1));
        assert!(cache.contains(&"a"));

        assert_eq!(cache.put("c", 3), Some(("a", 1)));
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut cache = BoundedCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);

        assert_eq!(cache.put("a", 10), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&"a"), Some(&10));
        assert_eq!(cache.peek_lru(), Some((&"b", &2)));
    }

    #[test]
    fn test_remove() {
        let mut cache = BoundedCache::new(2).unwrap();
        cache.put("a", 1);
        assert_eq!(cache.remove(&"a"), Some(1));
        assert_eq!(cache.remove(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_most_recent_first() {
        let mut cache = BoundedCache::new(3).unwrap();
        cache.put(1, ());
        cache.put(2, ());
        cache.put(3, ());
        cache.get(&1);
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec![1, 3, 2]);
    }

    proptest! {
        #[test]
        fn prop_resident_count_never_exceeds_limit(
            limit in 1usize..16,
            ops in proptest::collection::vec((any::<bool>(), 0u8..32), 0..200),
        ) {
            let mut cache = BoundedCache::new(limit).unwrap();
            for (is_get, key) in ops {
                if is_get {
                    cache.get(&key);
                } else {
                    cache.put(key, ());
                }
                prop_assert!(cache.len() <= limit);
            }
        }

        #[test]
        fn prop_evicted_entry_is_least_recently_used(
            limit in 1usize..8,
            ops in proptest::collection::vec((any::<bool>(), 0u8..16), 0..100),
        ) {
            // Reference model: most recently used at the back.
            let mut model: Vec<u8> = Vec::new();
            let mut cache = BoundedCache::new(limit).unwrap();

            for (is_get, key) in ops {
                if is_get {
                    if cache.get(&key).is_some() {
                        model.retain(|k| *k != key);
                        model.push(key);
                    }
                } else {
                    let evicted = cache.put(key, ()).map(|(k, _)| k);
                    let expected = if model.contains(&key) {
                        None
                    } else if model.len() == limit {
                        Some(model.remove(0))
                    } else {
                        None
                    };
                    model.retain(|k| *k != key);
                    model.push(key);
                    prop_assert_eq!(evicted, expected);
                }
            }
        }
    }
}
