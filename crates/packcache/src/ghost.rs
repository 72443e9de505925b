//! Key-only ghost list (A1out)
//!
//! Records keys recently evicted from the probationary segment so a
//! returning key can be admitted straight into the protected segment.
//! Bounded by entry count, independent of byte accounting; values are
//! never stored.

use ahash::RandomState;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Bounded recency list of keys. Front is oldest, back is newest.
pub(crate) struct GhostList<K> {
    queue: VecDeque<K>,
    index: HashSet<K, RandomState>,
}

impl<K> GhostList<K>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            index: HashSet::with_hasher(RandomState::new()),
        }
    }

    /// Record a key as most recently evicted. A key already tracked is
    /// repositioned to the newest slot.
    pub(crate) fn record(&mut self, key: K) {
        if self.index.contains(&key) {
            if let Some(pos) = self.queue.iter().position(|k| k == &key) {
                self.queue.remove(pos);
            }
        } else {
            self.index.insert(key.clone());
        }
        self.queue.push_back(key);
    }

    /// Forget a key; returns `true` if it was tracked.
    pub(crate) fn remove(&mut self, key: &K) -> bool {
        if !self.index.remove(key) {
            return false;
        }
        if let Some(pos) = self.queue.iter().position(|k| k == key) {
            self.queue.remove(pos);
        }
        true
    }

    /// Drop oldest ghosts until at most `bound` remain. Returns the number
    /// dropped.
    pub(crate) fn trim_to(&mut self, bound: usize) -> usize {
        let mut dropped = 0;
        while self.queue.len() > bound {
            if let Some(key) = self.queue.pop_front() {
                self.index.remove(&key);
                dropped += 1;
            }
        }
        dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.index.clear();
    }
}
