//! Cache layer: durable and in-memory storage for heads, indexes and
//! namespace snapshots, plus the bounded request priority queue.
//!
//! Two backends share the same trait contracts. [`ResidentCache`] keeps
//! everything in memory behind locks with LRU eviction; [`DurableCache`]
//! persists to a single redb file, one write transaction per operation.
//! Content addressing means an evicted entry can always be recovered from
//! the peer store; a cache never returns a value that does not match its
//! key.

pub mod durable;
pub mod error;
pub mod queue;
pub mod resident;
pub mod traits;

pub use durable::{DurableCache, DurableCacheOptions};
pub use error::{CacheError, CacheResult};
pub use queue::ResidentPriorityQueue;
pub use resident::{ResidentCache, ResidentMemoryImage};
pub use traits::{Cache, HeadCache, IndexCache, MemoryImage, NamespaceCache};

/// Default bound on the index and namespace caches, in entries.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 4096;
