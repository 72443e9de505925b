//! # packcache
//!
//! In-memory object cache for the PackStore engine: buffers hot,
//! size-accounted, reference-counted resources (decoded pages, segments)
//! and decides under concurrent access what stays resident.
//!
//! ## Architecture
//! - **Recency core**: arena-backed doubly-linked list, integer handles,
//!   O(1) operations
//! - **LRU engine**: strict recency over a byte budget
//! - **2Q engine**: probationary/protected segments plus a key-only ghost
//!   list for scan resistance
//! - **Partitioned façade**: independent key spaces over one shared budget
//!
//! ## Contract
//! Values are shared, not owned: the cache takes one reference share per
//! resident entry, every found-lookup hands the caller another share, and
//! a pinned entry (any external share outstanding) is never evicted. A
//! disabled [`NoCache`] satisfies the same surface as a pass-through.

#![warn(missing_docs)]

mod cache;
mod elem;
mod error;
mod ghost;
mod list;
mod lru;
mod partition;
mod stats;
mod two_queue;

pub use cache::{Cache, CacheGuard, NoCache, NoCacheGuard};
pub use elem::RefCountedElem;
pub use error::{Error, Result};
pub use lru::{LruCache, LruCacheGuard};
pub use partition::{CacheKey, CachePartition, PartitionGuard};
pub use stats::CacheStats;
pub use two_queue::{
    TwoQueueCache, TwoQueueGuard, TwoQueueParams, DEFAULT_GHOST_RATIO, DEFAULT_RECENT_RATIO,
};
