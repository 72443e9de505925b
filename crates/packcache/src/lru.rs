//! Strict-recency LRU cache engine
//!
//! Single recency list over the arena core, a byte budget instead of an
//! entry count, and the reference-counting contract: the cache holds one
//! share per resident value and never evicts a pinned entry.

use std::hash::Hash;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::cache::{Cache, CacheGuard};
use crate::elem::RefCountedElem;
use crate::error::{Error, Result};
use crate::list::LruList;
use crate::stats::CacheStats;

/// Thread-safe LRU cache with byte-size accounting.
///
/// One internal mutex serializes every operation; counters and the
/// resident byte total are readable without the lock via [`stats`].
///
/// [`stats`]: LruCache::stats
pub struct LruCache<K, V> {
    max_bytes: usize,
    stats: CacheStats,
    list: Mutex<LruList<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: RefCountedElem + Clone,
{
    /// Create an LRU cache with a byte budget of `max_bytes`.
    pub fn new(max_bytes: usize) -> Result<Self> {
        if max_bytes == 0 {
            return Err(Error::InvalidCapacity);
        }
        Ok(Self {
            max_bytes,
            stats: CacheStats::new(),
            list: Mutex::new(LruList::new()),
        })
    }

    /// Configured byte budget.
    pub fn capacity(&self) -> usize {
        self.max_bytes
    }

    /// Diagnostics counters, readable without taking the lock.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Borrow the oldest entry without removing it. The returned value
    /// carries one extra reference share, as with `get`.
    pub fn get_oldest(&self) -> Option<(K, V)> {
        self.lock().get_oldest()
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: RefCountedElem + Clone,
{
    type Guard<'a>
        = LruCacheGuard<'a, K, V>
    where
        Self: 'a;

    fn lock(&self) -> LruCacheGuard<'_, K, V> {
        LruCacheGuard {
            max_bytes: self.max_bytes,
            stats: &self.stats,
            list: self.list.lock(),
        }
    }
}

/// Lock token of [`LruCache`]; see [`Cache::lock`].
pub struct LruCacheGuard<'a, K, V> {
    max_bytes: usize,
    stats: &'a CacheStats,
    list: MutexGuard<'a, LruList<K, V>>,
}

impl<K, V> LruCacheGuard<'_, K, V>
where
    K: Hash + Eq + Clone,
    V: RefCountedElem + Clone,
{
    /// Locked variant of [`LruCache::get_oldest`].
    pub fn get_oldest(&mut self) -> Option<(K, V)> {
        let (key, value) = self.list.oldest()?;
        let (key, value) = (key.clone(), value.clone());
        value.inc_ref();
        Some((key, value))
    }

    /// Evict least-recently-used entries until the byte total fits the
    /// budget, skipping pinned candidates. When every candidate is pinned
    /// the admission stands over budget.
    fn ensure_space(&mut self) -> bool {
        let mut evicted = false;
        while self.stats.bytes() > self.max_bytes as u64 {
            let victim = self.list.oldest_where(|v| v.ref_count() <= 1);
            let Some(key) = victim else {
                self.stats.record_overflow();
                warn!(
                    bytes = self.stats.bytes(),
                    capacity = self.max_bytes,
                    "over budget, every candidate pinned"
                );
                break;
            };
            if let Some(value) = self.list.remove(&key) {
                let freed = value.heap_size();
                self.stats.sub_bytes(freed);
                value.dec_ref();
                self.stats.record_eviction();
                trace!(freed, "evicted oldest entry");
                evicted = true;
            }
        }
        evicted
    }
}

impl<K, V> CacheGuard<K, V> for LruCacheGuard<'_, K, V>
where
    K: Hash + Eq + Clone,
    V: RefCountedElem + Clone,
{
    fn purge(&mut self) {
        while let Some((_, value)) = self.list.pop_oldest() {
            self.stats.sub_bytes(value.heap_size());
            value.dec_ref();
        }
        self.list.clear();
        self.stats.reset();
        debug!("cache purged");
    }

    fn add(&mut self, key: K, value: V) -> (bool, bool) {
        // Take the cache's share up front; on a same-handle update the
        // matching dec_ref below nets out.
        value.inc_ref();
        let size = value.heap_size();

        if self.list.contains(&key) {
            if let Some(old) = self.list.update(&key, value) {
                self.stats.sub_bytes(old.heap_size());
                old.dec_ref();
            }
            self.stats.add_bytes(size);
            self.stats.record_insert();
            let evicted = self.ensure_space();
            return (true, evicted);
        }

        self.list.push_front(key, value);
        self.stats.add_bytes(size);
        self.stats.record_insert();
        (false, self.ensure_space())
    }

    fn get(&mut self, key: &K) -> Option<V> {
        if let Some(value) = self.list.get(key) {
            let value = value.clone();
            value.inc_ref();
            self.stats.record_hit();
            Some(value)
        } else {
            self.stats.record_miss();
            None
        }
    }

    fn contains(&mut self, key: &K) -> bool {
        self.list.contains(key)
    }

    fn peek(&mut self, key: &K) -> Option<V> {
        let value = self.list.peek(key)?.clone();
        value.inc_ref();
        Some(value)
    }

    fn contains_or_add(&mut self, key: K, value: V) -> (bool, bool) {
        if self.list.contains(&key) {
            return (true, false);
        }
        let (_, evicted) = self.add(key, value);
        (false, evicted)
    }

    fn remove(&mut self, key: &K) -> bool {
        if let Some(value) = self.list.remove(key) {
            self.stats.sub_bytes(value.heap_size());
            value.dec_ref();
            true
        } else {
            false
        }
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        let (key, value) = self.list.pop_oldest()?;
        self.stats.sub_bytes(value.heap_size());
        self.stats.record_eviction();
        // The cache's reference share transfers to the caller.
        Some((key, value))
    }

    fn keys(&self) -> Vec<K> {
        self.list.keys()
    }

    fn len(&self) -> usize {
        self.list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elem::testing::TestPage;

    fn new_cache(max_bytes: usize) -> LruCache<u64, TestPage> {
        LruCache::new(max_bytes).unwrap()
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(matches!(
            LruCache::<u64, TestPage>::new(0).err(),
            Some(Error::InvalidCapacity)
        ));
    }

    #[test]
    fn test_add_get() {
        let cache = new_cache(16);

        let page = TestPage::new(1, 0);
        assert_eq!(cache.add(1, page.clone()), (false, false));
        assert_eq!(page.ref_count(), 1);

        let hit = cache.get(&1).unwrap();
        assert_eq!(hit.key(), 1);
        assert_eq!(hit.ref_count(), 2);
        hit.dec_ref();

        assert!(cache.get(&2).is_none());
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().bytes(), 1);
    }

    #[test]
    fn test_capacity_eviction() {
        let cache = new_cache(4);

        let pages: Vec<_> = (0..5).map(|i| TestPage::new(i, 0)).collect();
        for (i, page) in pages.iter().enumerate() {
            cache.add(i as u64, page.clone());
        }

        // 5 unit-size pages against a 4-byte budget: oldest key evicted
        assert_eq!(cache.len(), 4);
        assert!(!cache.contains(&0));
        assert_eq!(pages[0].ref_count(), 0);
        assert_eq!(cache.stats().evictions(), 1);
        assert_eq!(cache.keys(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_peek_contains_do_not_refresh() {
        let cache = new_cache(2);

        cache.add(1, TestPage::new(1, 0));
        cache.add(2, TestPage::new(2, 0));

        assert!(cache.contains(&1));
        cache.peek(&1).unwrap().dec_ref();

        // 1 is still the oldest: neither peek nor contains refreshed it
        cache.add(3, TestPage::new(3, 0));
        assert!(!cache.contains(&1));

        // get refreshes: 2 survives the next eviction instead of 3
        cache.get(&2).unwrap().dec_ref();
        cache.add(4, TestPage::new(4, 0));
        assert!(cache.contains(&2));
        assert!(!cache.contains(&3));
    }

    #[test]
    fn test_get_oldest_remove_oldest_agree() {
        let cache = new_cache(8);

        for i in 0..4 {
            cache.add(i, TestPage::new(i, 0));
        }

        let (peeked_key, peeked) = cache.get_oldest().unwrap();
        peeked.dec_ref();
        let (removed_key, removed) = cache.remove_oldest().unwrap();

        assert_eq!(peeked_key, removed_key);
        assert_eq!(peeked.key(), removed.key());
        removed.dec_ref(); // release the transferred share
        assert_eq!(removed.ref_count(), 0);
    }

    #[test]
    fn test_recency_scenario_256() {
        let cache = new_cache(256);

        for i in 0..256u64 {
            cache.add(i, TestPage::new(i, 0));
        }
        assert_eq!(cache.len(), 256);
        assert_eq!(cache.stats().evictions(), 0);

        for _ in 0..128 {
            let (_, page) = cache.remove_oldest().unwrap();
            page.dec_ref();
        }

        assert_eq!(cache.len(), 128);
        assert_eq!(cache.stats().evictions(), 128);
        let expect: Vec<u64> = (128..256).collect();
        assert_eq!(cache.keys(), expect);

        // a hit moves 192 to the most-recent slot
        cache.get(&192).unwrap().dec_ref();
        let keys = cache.keys();
        assert_eq!(*keys.last().unwrap(), 192);
        let expect: Vec<u64> = (128..256).filter(|&k| k != 192).chain([192]).collect();
        assert_eq!(keys, expect);
    }

    #[test]
    fn test_remove_twice() {
        let cache = new_cache(8);

        let page = TestPage::new(1, 0);
        cache.add(1, page.clone());

        assert!(cache.remove(&1));
        assert_eq!(page.ref_count(), 0);
        assert!(!cache.remove(&1));
    }

    #[test]
    fn test_purge() {
        let cache = new_cache(8);

        let pages: Vec<_> = (0..4).map(|i| TestPage::new(i, 0)).collect();
        for (i, page) in pages.iter().enumerate() {
            cache.add(i as u64, page.clone());
        }
        if let Some(page) = cache.get(&0) {
            page.dec_ref();
        }

        cache.purge();

        assert_eq!(cache.len(), 0);
        assert!(cache.get(&0).is_none());
        assert_eq!(cache.stats().bytes(), 0);
        assert_eq!(cache.stats().hits(), 0);
        for page in &pages {
            assert_eq!(page.ref_count(), 0);
        }
    }

    #[test]
    fn test_update_existing() {
        let cache = new_cache(4);

        let old = TestPage::new(1, 0);
        let new = TestPage::new(2, 0);
        cache.add(1, old.clone());
        let (updated, evicted) = cache.add(1, new.clone());

        assert!(updated);
        assert!(!evicted);
        assert_eq!(cache.len(), 1);
        assert_eq!(old.ref_count(), 0);
        assert_eq!(new.ref_count(), 1);
        assert_eq!(cache.stats().evictions(), 0);

        // same handle re-added: share is not double counted
        let (updated, _) = cache.add(1, new.clone());
        assert!(updated);
        assert_eq!(new.ref_count(), 1);

        // growing an entry past the budget evicts
        cache.add(2, TestPage::new(3, 0));
        cache.add(3, TestPage::new(4, 0));
        let (updated, evicted) = cache.add(3, TestPage::new(5, 2));
        assert!(updated);
        assert!(evicted);
        assert!(cache.stats().evictions() > 0);
    }

    #[test]
    fn test_add_insert_then_update() {
        let cache = new_cache(8);

        let first = TestPage::new(1, 0);
        cache.add(1, first.clone());
        assert_eq!(first.ref_count(), 1);

        // absent key takes the insert path: value retained with its share
        let second = TestPage::new(2, 0);
        cache.add(2, second.clone());
        assert_eq!(second.ref_count(), 1);
        let hit = cache.get(&2).unwrap();
        assert_eq!(hit.key(), 2);
        hit.dec_ref();

        // present key takes the update path: old share released
        let replacement = TestPage::new(3, 0);
        cache.add(1, replacement.clone());
        assert_eq!(first.ref_count(), 0);
        assert_eq!(replacement.ref_count(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_contains_or_add() {
        let cache = new_cache(4);

        let page = TestPage::new(1, 0);
        assert_eq!(cache.contains_or_add(1, page.clone()), (false, false));
        assert_eq!(page.ref_count(), 1);

        // present: untouched, no extra reference
        let again = TestPage::new(1, 0);
        assert_eq!(cache.contains_or_add(1, again.clone()), (true, false));
        assert_eq!(again.ref_count(), 0);
        assert_eq!(page.ref_count(), 1);
    }

    #[test]
    fn test_pinned_entries_skip_eviction() {
        let cache = new_cache(2);

        cache.add(1, TestPage::new(1, 0));
        cache.add(2, TestPage::new(2, 0));

        // hold 1: pinned and most recent
        let held = cache.get(&1).unwrap();

        // pressure evicts 2 even though 1 is older in arrival order
        cache.add(3, TestPage::new(3, 0));
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));

        // released, 1 is the oldest evictable again
        held.dec_ref();
        cache.add(4, TestPage::new(4, 0));
        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_all_pinned_soft_overflow() {
        let cache = new_cache(1);

        cache.add(1, TestPage::new(1, 0));
        let held1 = cache.get(&1).unwrap();

        // holder pins the new value before admission
        let page2 = TestPage::new(2, 0);
        page2.inc_ref();
        cache.add(2, page2.clone());

        // nothing evictable: admission stands over budget
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().bytes(), 2);
        assert_eq!(cache.stats().overflows(), 1);

        held1.dec_ref();
        page2.dec_ref();
    }

    #[test]
    fn test_empty_cache_ops() {
        let cache = new_cache(4);

        assert!(cache.get(&1).is_none());
        assert!(cache.peek(&1).is_none());
        assert!(!cache.contains(&1));
        assert!(!cache.remove(&1));
        assert!(cache.remove_oldest().is_none());
        assert!(cache.get_oldest().is_none());
        assert!(cache.keys().is_empty());
        assert_eq!(cache.len(), 0);
        cache.purge();
    }

    #[test]
    fn test_locked_check_then_add() {
        let cache = new_cache(4);

        let mut guard = cache.lock();
        if !guard.contains(&9) {
            guard.add(9, TestPage::new(9, 0));
        }
        assert!(guard.contains(&9));
        drop(guard);

        assert_eq!(cache.len(), 1);
    }
}
