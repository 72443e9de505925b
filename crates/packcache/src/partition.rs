//! Partitioned cache façade
//!
//! Multiplexes independent logical key spaces over one shared,
//! capacity-bounded cache so unrelated workloads (separate tables,
//! separate stores) compete for one global eviction budget instead of
//! each owning a private cache. The façade composes a composite key
//! (partition id, sub-key) and scopes enumeration, purge, and compound
//! locked sequences to its partition.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::{Cache, CacheGuard};

/// Composite key of the shared cache: partition id plus an opaque
/// per-partition sub-key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Logical namespace, e.g. a table or store id.
    pub partition: u64,
    /// Sub-key within the partition; no semantic interpretation.
    pub key: u64,
}

impl CacheKey {
    /// Compose a composite key.
    pub fn new(partition: u64, key: u64) -> Self {
        Self { partition, key }
    }
}

/// Handle to one partition of a shared cache.
///
/// All handles cloned from the same shared cache compete for its single
/// byte budget; operations through a handle only ever see keys of its own
/// partition. Enumeration filters the shared cache's full key set, a cost
/// proportional to the total cache size.
pub struct CachePartition<C, V> {
    id: u64,
    cache: Arc<C>,
    _marker: PhantomData<fn() -> V>,
}

impl<C, V> Clone for CachePartition<C, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cache: Arc::clone(&self.cache),
            _marker: PhantomData,
        }
    }
}

impl<C, V> CachePartition<C, V>
where
    C: Cache<CacheKey, V>,
{
    /// View partition `id` of `cache`.
    pub fn new(cache: Arc<C>, id: u64) -> Self {
        Self {
            id,
            cache,
            _marker: PhantomData,
        }
    }

    /// Partition id this handle is scoped to.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// See [`CacheGuard::add`].
    pub fn add(&self, key: u64, value: V) -> (bool, bool) {
        self.cache.add(CacheKey::new(self.id, key), value)
    }

    /// See [`CacheGuard::get`].
    pub fn get(&self, key: u64) -> Option<V> {
        self.cache.get(&CacheKey::new(self.id, key))
    }

    /// See [`CacheGuard::contains`].
    pub fn contains(&self, key: u64) -> bool {
        self.cache.contains(&CacheKey::new(self.id, key))
    }

    /// See [`CacheGuard::peek`].
    pub fn peek(&self, key: u64) -> Option<V> {
        self.cache.peek(&CacheKey::new(self.id, key))
    }

    /// See [`CacheGuard::contains_or_add`].
    pub fn contains_or_add(&self, key: u64, value: V) -> (bool, bool) {
        self.cache.contains_or_add(CacheKey::new(self.id, key), value)
    }

    /// See [`CacheGuard::remove`].
    pub fn remove(&self, key: u64) -> bool {
        self.cache.remove(&CacheKey::new(self.id, key))
    }

    /// Sub-keys resident under this partition.
    pub fn keys(&self) -> Vec<u64> {
        self.lock().keys()
    }

    /// Number of entries resident under this partition.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` if this partition holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry of this partition in one critical section, atomic
    /// with respect to concurrent operations from other partitions.
    pub fn purge(&self) {
        self.lock().purge()
    }

    /// Acquire the shared cache's mutex for a multi-step sequence scoped
    /// to this partition.
    pub fn lock(&self) -> PartitionGuard<C::Guard<'_>, V> {
        PartitionGuard {
            id: self.id,
            inner: self.cache.lock(),
            _marker: PhantomData,
        }
    }
}

/// Lock token of [`CachePartition`]: the shared cache's guard, scoped to
/// one partition. Operations from other partitions are blocked until it
/// drops.
pub struct PartitionGuard<G, V> {
    id: u64,
    inner: G,
    _marker: PhantomData<fn() -> V>,
}

impl<G, V> PartitionGuard<G, V>
where
    G: CacheGuard<CacheKey, V>,
{
    /// Locked variant of [`CachePartition::add`].
    pub fn add(&mut self, key: u64, value: V) -> (bool, bool) {
        self.inner.add(CacheKey::new(self.id, key), value)
    }

    /// Locked variant of [`CachePartition::get`].
    pub fn get(&mut self, key: u64) -> Option<V> {
        self.inner.get(&CacheKey::new(self.id, key))
    }

    /// Locked variant of [`CachePartition::contains`].
    pub fn contains(&mut self, key: u64) -> bool {
        self.inner.contains(&CacheKey::new(self.id, key))
    }

    /// Locked variant of [`CachePartition::peek`].
    pub fn peek(&mut self, key: u64) -> Option<V> {
        self.inner.peek(&CacheKey::new(self.id, key))
    }

    /// Locked variant of [`CachePartition::contains_or_add`].
    pub fn contains_or_add(&mut self, key: u64, value: V) -> (bool, bool) {
        self.inner.contains_or_add(CacheKey::new(self.id, key), value)
    }

    /// Locked variant of [`CachePartition::remove`].
    pub fn remove(&mut self, key: u64) -> bool {
        self.inner.remove(&CacheKey::new(self.id, key))
    }

    /// Locked variant of [`CachePartition::keys`].
    pub fn keys(&self) -> Vec<u64> {
        self.inner
            .keys()
            .into_iter()
            .filter(|k| k.partition == self.id)
            .map(|k| k.key)
            .collect()
    }

    /// Locked variant of [`CachePartition::len`].
    pub fn len(&self) -> usize {
        self.inner
            .keys()
            .iter()
            .filter(|k| k.partition == self.id)
            .count()
    }

    /// `true` if this partition holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locked variant of [`CachePartition::purge`]: iterates a
    /// materialized key snapshot and removes the matching ones under the
    /// held lock.
    pub fn purge(&mut self) {
        let keys = self.inner.keys();
        for key in keys.iter().filter(|k| k.partition == self.id) {
            self.inner.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoCache;
    use crate::elem::testing::TestPage;
    use crate::elem::RefCountedElem;
    use crate::two_queue::TwoQueueCache;

    fn shared(max_bytes: usize) -> Arc<TwoQueueCache<CacheKey, TestPage>> {
        Arc::new(TwoQueueCache::new(max_bytes).unwrap())
    }

    #[test]
    fn test_partition_isolation() {
        let cache = shared(64);
        let tables = CachePartition::new(Arc::clone(&cache), 1);
        let stores = CachePartition::new(Arc::clone(&cache), 2);

        for i in 0..8u64 {
            tables.add(i, TestPage::new(i, 0));
            stores.add(i, TestPage::new(100 + i, 0));
        }

        // same sub-keys, distinct values per partition
        assert_eq!(tables.get(3).map(|p| {
            let k = p.key();
            p.dec_ref();
            k
        }), Some(3));
        assert_eq!(stores.get(3).map(|p| {
            let k = p.key();
            p.dec_ref();
            k
        }), Some(103));

        assert_eq!(tables.len(), 8);
        assert_eq!(stores.len(), 8);
        assert_eq!(cache.len(), 16);

        let mut keys = tables.keys();
        keys.sort_unstable();
        assert_eq!(keys, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_partition_scoped_enumeration_over_capacity() {
        let cache = shared(16);
        let a = CachePartition::new(Arc::clone(&cache), 10);
        let b = CachePartition::new(Arc::clone(&cache), 20);

        // collectively exceed the shared budget
        for i in 0..16u64 {
            a.add(i, TestPage::new(i, 0));
            b.add(i, TestPage::new(i, 0));
        }
        assert!(cache.len() <= 16);

        // every enumerated sub-key belongs to its own partition and is
        // resident in the shared cache under the composite key
        for key in a.keys() {
            assert!(cache.contains(&CacheKey::new(10, key)));
        }
        assert_eq!(a.len() + b.len(), cache.len());
    }

    #[test]
    fn test_partition_purge_leaves_others() {
        let cache = shared(64);
        let a = CachePartition::new(Arc::clone(&cache), 1);
        let b = CachePartition::new(Arc::clone(&cache), 2);

        let mine: Vec<_> = (0..4).map(|i| TestPage::new(i, 0)).collect();
        for (i, page) in mine.iter().enumerate() {
            a.add(i as u64, page.clone());
        }
        for i in 0..4u64 {
            b.add(i, TestPage::new(50 + i, 0));
        }

        a.purge();

        assert_eq!(a.len(), 0);
        assert_eq!(b.len(), 4);
        for page in &mine {
            assert_eq!(page.ref_count(), 0);
        }
        assert!(b.get(2).map(|p| p.dec_ref()).is_some());
    }

    #[test]
    fn test_locked_check_then_add() {
        let cache = shared(64);
        let part = CachePartition::new(cache, 7);

        let mut guard = part.lock();
        if !guard.contains(42) {
            guard.add(42, TestPage::new(42, 0));
        }
        assert!(guard.contains(42));
        assert_eq!(guard.keys(), vec![42]);
        drop(guard);

        assert_eq!(part.len(), 1);
        assert!(part.remove(42));
        assert!(!part.remove(42));
    }

    #[test]
    fn test_partition_over_nocache() {
        let cache: Arc<NoCache<CacheKey, TestPage>> = Arc::new(NoCache::new());
        let part = CachePartition::new(cache, 1);

        let page = TestPage::new(1, 0);
        assert_eq!(part.add(1, page.clone()), (false, false));
        assert_eq!(page.ref_count(), 0);
        assert!(part.get(1).is_none());
        assert!(part.is_empty());
        part.purge();
    }

    #[test]
    fn test_shared_budget_across_partitions() {
        let cache = shared(8);
        let hot = CachePartition::new(Arc::clone(&cache), 1);
        let scan = CachePartition::new(Arc::clone(&cache), 2);

        // hot partition's pages are protected by a second touch
        for i in 0..3u64 {
            hot.add(i, TestPage::new(i, 0));
            hot.get(i).unwrap().dec_ref();
        }

        // another partition's one-time scan pressures the shared budget
        for i in 0..32u64 {
            scan.add(i, TestPage::new(i, 0));
        }

        for i in 0..3u64 {
            assert!(hot.contains(i), "hot key {} lost to foreign scan", i);
        }
        assert!(cache.stats().evictions() > 0);
    }
}
