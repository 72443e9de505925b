//! Cache capability surface
//!
//! [`Cache`] is the uniform polymorphic surface the engine programs
//! against; it is implemented by the LRU and 2Q engines and by the
//! disabled [`NoCache`] pass-through, so call sites can turn caching off
//! without code changes.
//!
//! Every non-locked operation is self-contained: the provided methods
//! acquire the instance lock, apply one operation, and release. For
//! multi-step compound sequences (check-then-add, whole-partition purge)
//! callers take the guard once via [`Cache::lock`] and run the same
//! operations on it; the guard holds the instance mutex for its lifetime
//! and releases it on every exit path when dropped.

use std::marker::PhantomData;

/// Operations available while holding a cache's lock.
///
/// One guard serializes the whole cache instance; operations called on it
/// compose atomically with respect to all other callers.
pub trait CacheGuard<K, V> {
    /// Remove every entry and reset counters.
    fn purge(&mut self);

    /// Insert or replace `key`. Returns `(updated, evicted)`: whether an
    /// existing entry was replaced, and whether the admission evicted
    /// anything to make room.
    ///
    /// The cache takes one reference share of `value`. Replacing an entry
    /// releases the share held on the previous value.
    fn add(&mut self, key: K, value: V) -> (bool, bool);

    /// Look up `key`, refreshing recency. A found value is returned with
    /// one extra reference share the caller must release.
    fn get(&mut self, key: &K) -> Option<V>;

    /// Presence check; never alters recency, frequency, or counters.
    fn contains(&mut self, key: &K) -> bool;

    /// Look up `key` without altering recency, frequency, or counters.
    /// A found value carries one extra reference share, as with `get`.
    fn peek(&mut self, key: &K) -> Option<V>;

    /// Atomic check-or-insert. Returns `(existed, evicted)`. A present key
    /// is left untouched: no recency change, no reference taken.
    fn contains_or_add(&mut self, key: K, value: V) -> (bool, bool);

    /// Remove `key`, releasing the cache's reference share. `true` only if
    /// the key held a resident value.
    fn remove(&mut self, key: &K) -> bool;

    /// Remove the oldest evictable-position entry. The cache's reference
    /// share transfers to the caller along with the returned value; the
    /// caller performs the final release.
    fn remove_oldest(&mut self) -> Option<(K, V)>;

    /// All resident keys. Within a recency list, order is oldest to newest.
    fn keys(&self) -> Vec<K>;

    /// Number of resident entries.
    fn len(&self) -> usize;
}

/// Uniform cache surface, generic over key and value type.
///
/// Implementors provide [`lock`]; every other operation has a provided
/// implementation that acquires the lock for exactly one operation.
///
/// [`lock`]: Cache::lock
pub trait Cache<K, V> {
    /// Lock token giving exclusive access for a compound sequence.
    type Guard<'a>: CacheGuard<K, V>
    where
        Self: 'a;

    /// Acquire this cache's mutex for a multi-step sequence.
    fn lock(&self) -> Self::Guard<'_>;

    /// See [`CacheGuard::purge`].
    fn purge(&self) {
        self.lock().purge()
    }

    /// See [`CacheGuard::add`].
    fn add(&self, key: K, value: V) -> (bool, bool) {
        self.lock().add(key, value)
    }

    /// See [`CacheGuard::get`].
    fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key)
    }

    /// See [`CacheGuard::contains`].
    fn contains(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    /// See [`CacheGuard::peek`].
    fn peek(&self, key: &K) -> Option<V> {
        self.lock().peek(key)
    }

    /// See [`CacheGuard::contains_or_add`].
    fn contains_or_add(&self, key: K, value: V) -> (bool, bool) {
        self.lock().contains_or_add(key, value)
    }

    /// See [`CacheGuard::remove`].
    fn remove(&self, key: &K) -> bool {
        self.lock().remove(key)
    }

    /// See [`CacheGuard::remove_oldest`].
    fn remove_oldest(&self) -> Option<(K, V)> {
        self.lock().remove_oldest()
    }

    /// See [`CacheGuard::keys`].
    fn keys(&self) -> Vec<K> {
        self.lock().keys()
    }

    /// See [`CacheGuard::len`].
    fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` if no entries are resident.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Disabled cache: satisfies the full [`Cache`] surface as a pure
/// pass-through. Nothing is retained, no references are taken, and no
/// value capability is required.
#[derive(Debug, Default)]
pub struct NoCache<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> NoCache<K, V> {
    /// Create a disabled cache.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

/// Lock token of [`NoCache`]; there is no state to protect.
#[derive(Debug)]
pub struct NoCacheGuard<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Cache<K, V> for NoCache<K, V> {
    type Guard<'a>
        = NoCacheGuard<K, V>
    where
        Self: 'a;

    fn lock(&self) -> NoCacheGuard<K, V> {
        NoCacheGuard {
            _marker: PhantomData,
        }
    }
}

impl<K, V> CacheGuard<K, V> for NoCacheGuard<K, V> {
    fn purge(&mut self) {}

    fn add(&mut self, _key: K, _value: V) -> (bool, bool) {
        (false, false)
    }

    fn get(&mut self, _key: &K) -> Option<V> {
        None
    }

    fn contains(&mut self, _key: &K) -> bool {
        false
    }

    fn peek(&mut self, _key: &K) -> Option<V> {
        None
    }

    fn contains_or_add(&mut self, _key: K, _value: V) -> (bool, bool) {
        (false, false)
    }

    fn remove(&mut self, _key: &K) -> bool {
        false
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        None
    }

    fn keys(&self) -> Vec<K> {
        Vec::new()
    }

    fn len(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nocache_pass_through() {
        let cache: NoCache<u64, u64> = NoCache::new();

        assert_eq!(cache.add(1, 100), (false, false));
        assert_eq!(cache.get(&1), None);
        assert!(!cache.contains(&1));
        assert_eq!(cache.peek(&1), None);
        assert_eq!(cache.contains_or_add(1, 100), (false, false));
        assert!(!cache.remove(&1));
        assert_eq!(cache.remove_oldest(), None);
        assert!(cache.keys().is_empty());
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        cache.purge();
    }

    #[test]
    fn test_nocache_locked_sequence() {
        let cache: NoCache<u64, u64> = NoCache::new();

        let mut guard = cache.lock();
        assert!(!guard.contains(&7));
        assert_eq!(guard.add(7, 700), (false, false));
        assert_eq!(guard.get(&7), None);
    }
}
