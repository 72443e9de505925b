//! Two-queue (2Q) adaptive cache engine
//!
//! Adds frequency awareness and scan resistance on top of the recency
//! list: entries seen once sit in a probationary segment (A1in), entries
//! touched at least twice live in the protected segment (Am), and keys
//! recently evicted from probation are remembered in a key-only ghost
//! list (A1out) so a returning key skips probation entirely. A burst of
//! one-time accesses can only churn the probationary share of the budget.

use std::hash::Hash;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::cache::{Cache, CacheGuard};
use crate::elem::RefCountedElem;
use crate::error::{Error, Result};
use crate::ghost::GhostList;
use crate::list::LruList;
use crate::stats::CacheStats;

/// Default share of the byte budget held by the probationary (A1in)
/// segment: entries accessed only once so far.
pub const DEFAULT_RECENT_RATIO: f64 = 0.25;

/// Default bound on the ghost (A1out) list, as a fraction of the resident
/// entry count.
pub const DEFAULT_GHOST_RATIO: f64 = 0.50;

/// Configured capacity and segment fractions, readable at any time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoQueueParams {
    /// Total byte budget shared by A1in and Am.
    pub capacity: usize,
    /// Probationary share of the budget.
    pub recent_ratio: f64,
    /// Ghost bound as a fraction of resident entries.
    pub ghost_ratio: f64,
}

struct TwoQueueCore<K, V> {
    recent: LruList<K, V>,
    frequent: LruList<K, V>,
    ghost: GhostList<K>,
}

/// Thread-safe 2Q cache with byte-size accounting.
///
/// One internal mutex serializes every operation; counters are readable
/// without the lock via [`stats`].
///
/// [`stats`]: TwoQueueCache::stats
pub struct TwoQueueCache<K, V> {
    params: TwoQueueParams,
    stats: CacheStats,
    core: Mutex<TwoQueueCore<K, V>>,
}

impl<K, V> TwoQueueCache<K, V>
where
    K: Hash + Eq + Clone,
    V: RefCountedElem + Clone,
{
    /// Create a 2Q cache with the default segment fractions.
    pub fn new(max_bytes: usize) -> Result<Self> {
        Self::with_params(max_bytes, DEFAULT_RECENT_RATIO, DEFAULT_GHOST_RATIO)
    }

    /// Create a 2Q cache with explicit segment fractions.
    pub fn with_params(max_bytes: usize, recent_ratio: f64, ghost_ratio: f64) -> Result<Self> {
        if max_bytes == 0 {
            return Err(Error::InvalidCapacity);
        }
        if !(0.0..=1.0).contains(&recent_ratio) {
            return Err(Error::InvalidRecentRatio(recent_ratio));
        }
        if !(0.0..=1.0).contains(&ghost_ratio) {
            return Err(Error::InvalidGhostRatio(ghost_ratio));
        }
        Ok(Self {
            params: TwoQueueParams {
                capacity: max_bytes,
                recent_ratio,
                ghost_ratio,
            },
            stats: CacheStats::new(),
            core: Mutex::new(TwoQueueCore {
                recent: LruList::new(),
                frequent: LruList::new(),
                ghost: GhostList::new(),
            }),
        })
    }

    /// Configured capacity and fractions.
    pub fn params(&self) -> TwoQueueParams {
        self.params
    }

    /// Configured byte budget.
    pub fn capacity(&self) -> usize {
        self.params.capacity
    }

    /// Diagnostics counters, readable without taking the lock.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Current segment lengths `(a1in, a1out, am)`.
    pub fn queue_len(&self) -> (usize, usize, usize) {
        let core = self.core.lock();
        (core.recent.len(), core.ghost.len(), core.frequent.len())
    }
}

impl<K, V> Cache<K, V> for TwoQueueCache<K, V>
where
    K: Hash + Eq + Clone,
    V: RefCountedElem + Clone,
{
    type Guard<'a>
        = TwoQueueGuard<'a, K, V>
    where
        Self: 'a;

    fn lock(&self) -> TwoQueueGuard<'_, K, V> {
        TwoQueueGuard {
            params: self.params,
            stats: &self.stats,
            core: self.core.lock(),
        }
    }
}

/// Lock token of [`TwoQueueCache`]; see [`Cache::lock`].
pub struct TwoQueueGuard<'a, K, V> {
    params: TwoQueueParams,
    stats: &'a CacheStats,
    core: MutexGuard<'a, TwoQueueCore<K, V>>,
}

#[derive(Clone, Copy)]
enum Segment {
    Recent,
    Frequent,
}

impl<K, V> TwoQueueGuard<'_, K, V>
where
    K: Hash + Eq + Clone,
    V: RefCountedElem + Clone,
{
    /// Locked variant of [`TwoQueueCache::queue_len`].
    pub fn queue_len(&self) -> (usize, usize, usize) {
        (
            self.core.recent.len(),
            self.core.ghost.len(),
            self.core.frequent.len(),
        )
    }

    /// Pick the next eviction victim, or `None` when every resident entry
    /// is pinned.
    ///
    /// Probation is drained first while it exceeds its configured share of
    /// the resident entries, otherwise the protected segment gives up its
    /// least-recently-used entry. Pinned candidates are skipped within a
    /// segment; an exhausted segment falls back to the other.
    fn find_victim(&self) -> Option<(Segment, K)> {
        let recent_len = self.core.recent.len();
        let resident = recent_len + self.core.frequent.len();
        let recent_target = (resident as f64 * self.params.recent_ratio) as usize;

        let order = if recent_len > 0 && recent_len > recent_target {
            [Segment::Recent, Segment::Frequent]
        } else {
            [Segment::Frequent, Segment::Recent]
        };

        for segment in order {
            let list = match segment {
                Segment::Recent => &self.core.recent,
                Segment::Frequent => &self.core.frequent,
            };
            if let Some(key) = list.oldest_where(|v| v.ref_count() <= 1) {
                return Some((segment, key));
            }
        }
        None
    }

    /// Evict until the byte total fits the budget, then trim the ghost
    /// list to its bound. Probationary evictions leave a ghost behind;
    /// protected evictions do not. When every candidate is pinned the
    /// admission stands over budget.
    fn ensure_space(&mut self) -> bool {
        let mut evicted = false;
        while self.stats.bytes() > self.params.capacity as u64 {
            let Some((segment, key)) = self.find_victim() else {
                self.stats.record_overflow();
                warn!(
                    bytes = self.stats.bytes(),
                    capacity = self.params.capacity,
                    "over budget, every candidate pinned"
                );
                break;
            };
            match segment {
                Segment::Recent => {
                    if let Some(value) = self.core.recent.remove(&key) {
                        let freed = value.heap_size();
                        self.stats.sub_bytes(freed);
                        value.dec_ref();
                        self.stats.record_eviction();
                        trace!(segment = "a1in", freed, "evicted probationary entry");
                        self.core.ghost.record(key);
                        evicted = true;
                    }
                }
                Segment::Frequent => {
                    if let Some(value) = self.core.frequent.remove(&key) {
                        let freed = value.heap_size();
                        self.stats.sub_bytes(freed);
                        value.dec_ref();
                        self.stats.record_eviction();
                        trace!(segment = "am", freed, "evicted protected entry");
                        evicted = true;
                    }
                }
            }
        }

        let resident = self.core.recent.len() + self.core.frequent.len();
        let bound = (resident as f64 * self.params.ghost_ratio) as usize;
        let dropped = self.core.ghost.trim_to(bound);
        if dropped > 0 {
            debug!(dropped, "trimmed ghost list");
        }

        evicted
    }
}

impl<K, V> CacheGuard<K, V> for TwoQueueGuard<'_, K, V>
where
    K: Hash + Eq + Clone,
    V: RefCountedElem + Clone,
{
    fn purge(&mut self) {
        while let Some((_, value)) = self.core.recent.pop_oldest() {
            self.stats.sub_bytes(value.heap_size());
            value.dec_ref();
        }
        while let Some((_, value)) = self.core.frequent.pop_oldest() {
            self.stats.sub_bytes(value.heap_size());
            value.dec_ref();
        }
        self.core.recent.clear();
        self.core.frequent.clear();
        self.core.ghost.clear();
        self.stats.reset();
        debug!("cache purged");
    }

    fn add(&mut self, key: K, value: V) -> (bool, bool) {
        // Take the cache's share up front; replacing an entry releases the
        // share held on the old value, so a same-handle re-add nets out.
        value.inc_ref();
        let size = value.heap_size();
        self.stats.record_insert();

        // Already protected: replace in place
        if self.core.frequent.contains(&key) {
            if let Some(old) = self.core.frequent.update(&key, value) {
                self.stats.sub_bytes(old.heap_size());
                old.dec_ref();
            }
            self.stats.add_bytes(size);
            return (true, self.ensure_space());
        }

        // Second touch: promote out of probation
        if let Some(old) = self.core.recent.remove(&key) {
            self.stats.sub_bytes(old.heap_size());
            old.dec_ref();
            self.core.frequent.push_front(key, value);
            self.stats.add_bytes(size);
            return (true, self.ensure_space());
        }

        // Recently evicted from probation: returning key skips probation
        if self.core.ghost.remove(&key) {
            self.core.frequent.push_front(key, value);
            self.stats.add_bytes(size);
            return (false, self.ensure_space());
        }

        // Cold key: probationary admission
        self.core.recent.push_front(key, value);
        self.stats.add_bytes(size);
        (false, self.ensure_space())
    }

    fn get(&mut self, key: &K) -> Option<V> {
        if let Some(value) = self.core.frequent.get(key) {
            let value = value.clone();
            value.inc_ref();
            self.stats.record_hit();
            return Some(value);
        }

        // Second touch: promote to the protected segment
        if let Some(value) = self.core.recent.remove(key) {
            self.core.frequent.push_front(key.clone(), value.clone());
            value.inc_ref();
            self.stats.record_hit();
            return Some(value);
        }

        self.stats.record_miss();
        None
    }

    fn contains(&mut self, key: &K) -> bool {
        self.core.frequent.contains(key) || self.core.recent.contains(key)
    }

    fn peek(&mut self, key: &K) -> Option<V> {
        let value = self
            .core
            .frequent
            .peek(key)
            .or_else(|| self.core.recent.peek(key))?
            .clone();
        value.inc_ref();
        Some(value)
    }

    fn contains_or_add(&mut self, key: K, value: V) -> (bool, bool) {
        if self.contains(&key) {
            return (true, false);
        }
        let (_, evicted) = self.add(key, value);
        (false, evicted)
    }

    fn remove(&mut self, key: &K) -> bool {
        if let Some(value) = self.core.frequent.remove(key) {
            self.stats.sub_bytes(value.heap_size());
            value.dec_ref();
            return true;
        }
        if let Some(value) = self.core.recent.remove(key) {
            self.stats.sub_bytes(value.heap_size());
            value.dec_ref();
            return true;
        }
        // A ghost holds no value; dropping it is not a resident removal.
        self.core.ghost.remove(key);
        false
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        // Only probation is drained explicitly; the protected segment
        // shrinks through pressure, remove, or purge. No ghost is left
        // behind for an explicit removal.
        let (key, value) = self.core.recent.pop_oldest()?;
        self.stats.sub_bytes(value.heap_size());
        self.stats.record_eviction();
        // The cache's reference share transfers to the caller.
        Some((key, value))
    }

    fn keys(&self) -> Vec<K> {
        let mut keys = self.core.frequent.keys();
        keys.extend(self.core.recent.keys());
        keys
    }

    fn len(&self) -> usize {
        self.core.recent.len() + self.core.frequent.len()
    }
}
