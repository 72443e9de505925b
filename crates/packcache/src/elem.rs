//! Reference-counting contract for cacheable values

/// Capability every cacheable value must expose.
///
/// The cache shares values with external holders instead of owning them:
/// it takes one reference share per resident entry and releases that share
/// when the entry is evicted, removed, or purged. Every admission and every
/// successful found-lookup (`get`, `peek`, `get_oldest`) increments the
/// count exactly once; the holder performs the matching [`dec_ref`].
///
/// Counts must be atomic on the value itself: holders increment and
/// decrement from their own threads while the cache mutates its lists under
/// its internal mutex. An unbalanced pairing is a caller bug the cache
/// cannot detect.
///
/// [`dec_ref`]: RefCountedElem::dec_ref
pub trait RefCountedElem {
    /// Increment the reference count and return the new count.
    fn inc_ref(&self) -> i64;

    /// Decrement the reference count and return the new count.
    fn dec_ref(&self) -> i64;

    /// Read the current reference count without changing it.
    ///
    /// Used by the eviction scan: a resident entry is pinned while its
    /// count exceeds the cache's own single share.
    fn ref_count(&self) -> i64;

    /// Current byte footprint of the value, charged against the cache's
    /// byte budget.
    fn heap_size(&self) -> usize;
}
