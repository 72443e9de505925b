//! Arena-backed recency list
//!
//! Doubly-linked list stored as an arena of entries addressed by integer
//! handle with explicit prev/next indices, plus a hash index mapping
//! key -> handle. Avoids pointer cycles and keeps every operation O(1).
//!
//! This is the refcount-oblivious structural core shared by the LRU and 2Q
//! engines; reference counting, byte budgets, and locking live in the
//! engines.

use ahash::RandomState;
use std::collections::HashMap;
use std::hash::Hash;

/// Node in the recency list
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency-ordered key/value list. Head is most recent, tail is oldest.
pub(crate) struct LruList<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
}

impl<K, V> LruList<K, V>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
            nodes: Vec::new(),
            head: None,
            tail: None,
            free_list: Vec::new(),
        }
    }

    /// Insert a new entry at the most-recent position.
    ///
    /// The key must not be present; use [`update`] for existing keys.
    ///
    /// [`update`]: LruList::update
    pub(crate) fn push_front(&mut self, key: K, value: V) {
        debug_assert!(!self.map.contains_key(&key));

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            prev: None,
            next: self.head,
        });

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }

        self.map.insert(key, idx);
    }

    /// Look up a value and refresh its recency.
    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(&idx) = self.map.get(key) {
            self.move_to_front(idx);
            self.nodes[idx].as_ref().map(|node| &node.value)
        } else {
            None
        }
    }

    /// Look up a value without refreshing recency.
    pub(crate) fn peek(&self, key: &K) -> Option<&V> {
        let &idx = self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Check presence without refreshing recency.
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Replace the value of an existing key, refresh its recency, and
    /// return the previous value. `None` if the key is absent.
    pub(crate) fn update(&mut self, key: &K, value: V) -> Option<V> {
        let &idx = self.map.get(key)?;
        self.move_to_front(idx);
        self.nodes[idx]
            .as_mut()
            .map(|node| std::mem::replace(&mut node.value, value))
    }

    /// Remove a key, returning its value.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        let node = self.nodes[idx].take();
        self.free_node(idx);
        node.map(|node| node.value)
    }

    /// Remove and return the oldest entry.
    pub(crate) fn pop_oldest(&mut self) -> Option<(K, V)> {
        let idx = self.tail?;
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.map.remove(&node.key);
        self.free_node(idx);
        Some((node.key, node.value))
    }

    /// Borrow the oldest entry without removing it.
    pub(crate) fn oldest(&self) -> Option<(&K, &V)> {
        let idx = self.tail?;
        self.nodes[idx].as_ref().map(|node| (&node.key, &node.value))
    }

    /// Walk from oldest to newest and return the key of the first entry
    /// whose value satisfies `pred`. Used by the pinned-aware eviction scan.
    pub(crate) fn oldest_where(&self, mut pred: impl FnMut(&V) -> bool) -> Option<K> {
        let mut cursor = self.tail;
        while let Some(idx) = cursor {
            let node = self.nodes[idx].as_ref()?;
            if pred(&node.value) {
                return Some(node.key.clone());
            }
            cursor = node.prev;
        }
        None
    }

    /// Keys in recency order, oldest first.
    pub(crate) fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.map.len());
        let mut cursor = self.tail;
        while let Some(idx) = cursor {
            if let Some(node) = &self.nodes[idx] {
                keys.push(node.key.clone());
                cursor = node.prev;
            } else {
                break;
            }
        }
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return; // Already at front
        }

        self.unlink(idx);

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = if let Some(node) = &mut self.nodes[idx] {
            let links = (node.prev, node.next);
            node.prev = None;
            node.next = None;
            links
        } else {
            return;
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => {
                self.head = next;
            }
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => {
                self.tail = prev;
            }
        }
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }

    fn free_node(&mut self, idx: usize) {
        self.free_list.push(idx);
    }
}
