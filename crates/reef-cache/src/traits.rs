use reef_crdt::{Address, Index, Namespace};

use crate::error::CacheResult;

/// Persists the peer's current head across restarts.
///
/// `set_head` is atomic: concurrent readers observe either the prior or the
/// new value, never a torn write.
pub trait HeadCache: Send + Sync {
    fn get_head(&self) -> CacheResult<Option<Address>>;
    fn set_head(&self, head: &Address) -> CacheResult<()>;
}

/// Content-addressed read-through cache of index snapshots.
///
/// `get_index` returns `Ok(None)` on a miss; the engine then falls back to
/// the peer store.
pub trait IndexCache: Send + Sync {
    fn get_index(&self, address: &Address) -> CacheResult<Option<Index>>;
    fn set_index(&self, address: &Address, index: &Index) -> CacheResult<()>;
}

/// Content-addressed read-through cache of namespace snapshots.
pub trait NamespaceCache: Send + Sync {
    fn get_namespace(&self, address: &Address) -> CacheResult<Option<Namespace>>;
    fn set_namespace(&self, address: &Address, namespace: &Namespace) -> CacheResult<()>;
}

/// A single-slot persistent cell holding the last-written index, used to
/// bootstrap the head on restart. `join_index` is atomic and monotonic: the
/// stored value only grows under join.
pub trait MemoryImage: Send + Sync {
    fn get_index(&self) -> CacheResult<Index>;
    fn join_index(&self, index: &Index) -> CacheResult<()>;
}

/// The full cache contract a backend provides.
pub trait Cache: HeadCache + IndexCache + NamespaceCache {}

impl<T: HeadCache + IndexCache + NamespaceCache> Cache for T {}
