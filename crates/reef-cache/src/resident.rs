use std::num::NonZeroUsize;
use std::sync::{Mutex, RwLock};

use lru::LruCache;

use reef_crdt::{Address, Index, Namespace};

use crate::error::CacheResult;
use crate::traits::{HeadCache, IndexCache, MemoryImage, NamespaceCache};
use crate::DEFAULT_MAX_CACHE_SIZE;

/// In-memory cache backend.
///
/// The index and namespace maps are LRU-bounded; the head is a single cell
/// behind a reader-writer lock. Everything is lost when the value drops, so
/// this backend suits tests and ephemeral peers.
pub struct ResidentCache {
    head: RwLock<Option<Address>>,
    indexes: Mutex<LruCache<Address, Index>>,
    namespaces: Mutex<LruCache<Address, Namespace>>,
}

impl ResidentCache {
    pub fn new(max_cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_cache_size.max(1)).expect("non-zero capacity");
        Self {
            head: RwLock::new(None),
            indexes: Mutex::new(LruCache::new(capacity)),
            namespaces: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Default for ResidentCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_SIZE)
    }
}

impl HeadCache for ResidentCache {
    fn get_head(&self) -> CacheResult<Option<Address>> {
        Ok(self.head.read().expect("lock poisoned").clone())
    }

    fn set_head(&self, head: &Address) -> CacheResult<()> {
        *self.head.write().expect("lock poisoned") = Some(head.clone());
        Ok(())
    }
}

impl IndexCache for ResidentCache {
    fn get_index(&self, address: &Address) -> CacheResult<Option<Index>> {
        Ok(self
            .indexes
            .lock()
            .expect("lock poisoned")
            .get(address)
            .cloned())
    }

    fn set_index(&self, address: &Address, index: &Index) -> CacheResult<()> {
        self.indexes
            .lock()
            .expect("lock poisoned")
            .put(address.clone(), index.clone());
        Ok(())
    }
}

impl NamespaceCache for ResidentCache {
    fn get_namespace(&self, address: &Address) -> CacheResult<Option<Namespace>> {
        Ok(self
            .namespaces
            .lock()
            .expect("lock poisoned")
            .get(address)
            .cloned())
    }

    fn set_namespace(&self, address: &Address, namespace: &Namespace) -> CacheResult<()> {
        self.namespaces
            .lock()
            .expect("lock poisoned")
            .put(address.clone(), namespace.clone());
        Ok(())
    }
}

/// In-memory memory image: a join-only cell.
#[derive(Default)]
pub struct ResidentMemoryImage {
    index: RwLock<Index>,
}

impl ResidentMemoryImage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryImage for ResidentMemoryImage {
    fn get_index(&self) -> CacheResult<Index> {
        Ok(self.index.read().expect("lock poisoned").clone())
    }

    fn join_index(&self, index: &Index) -> CacheResult<()> {
        let mut current = self.index.write().expect("lock poisoned");
        *current = current.join(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use reef_crdt::{Entry, Link, Row, Table};

    fn namespace(tag: &str) -> Namespace {
        Namespace::empty().join_table(
            "t",
            Table::empty().join_row("r", Row::empty().join_entry("e", Entry::from_texts([tag]))),
        )
    }

    #[test]
    fn head_get_set() {
        let cache = ResidentCache::default();
        assert_eq!(cache.get_head().unwrap(), None);

        cache.set_head(&Address::new("h1")).unwrap();
        assert_eq!(cache.get_head().unwrap(), Some(Address::new("h1")));

        cache.set_head(&Address::new("h2")).unwrap();
        assert_eq!(cache.get_head().unwrap(), Some(Address::new("h2")));
    }

    #[test]
    fn get_after_set_returns_same_value() {
        let cache = ResidentCache::default();
        let ns = namespace("v");
        cache.set_namespace(&Address::new("a1"), &ns).unwrap();
        assert_eq!(cache.get_namespace(&Address::new("a1")).unwrap(), Some(ns));

        let index = Index::empty().join_table("t", Link::new(Address::new("a1")));
        cache.set_index(&Address::new("i1"), &index).unwrap();
        assert_eq!(cache.get_index(&Address::new("i1")).unwrap(), Some(index));
    }

    #[test]
    fn miss_returns_none() {
        let cache = ResidentCache::default();
        assert_eq!(cache.get_index(&Address::new("nope")).unwrap(), None);
        assert_eq!(cache.get_namespace(&Address::new("nope")).unwrap(), None);
    }

    #[test]
    fn lru_eviction_at_capacity() {
        let cache = ResidentCache::new(2);
        for tag in ["n1", "n2", "n3"] {
            cache.set_namespace(&Address::new(tag), &namespace(tag)).unwrap();
        }

        // Oldest entry evicted; the rest intact.
        assert_eq!(cache.get_namespace(&Address::new("n1")).unwrap(), None);
        assert_eq!(
            cache.get_namespace(&Address::new("n2")).unwrap(),
            Some(namespace("n2"))
        );
        assert_eq!(
            cache.get_namespace(&Address::new("n3")).unwrap(),
            Some(namespace("n3"))
        );
    }

    #[test]
    fn get_refreshes_recency() {
        let cache = ResidentCache::new(2);
        cache.set_namespace(&Address::new("n1"), &namespace("n1")).unwrap();
        cache.set_namespace(&Address::new("n2"), &namespace("n2")).unwrap();

        // Touch n1 so n2 becomes the eviction candidate.
        cache.get_namespace(&Address::new("n1")).unwrap();
        cache.set_namespace(&Address::new("n3"), &namespace("n3")).unwrap();

        assert!(cache.get_namespace(&Address::new("n1")).unwrap().is_some());
        assert_eq!(cache.get_namespace(&Address::new("n2")).unwrap(), None);
    }

    #[test]
    fn memory_image_joins_monotonically() {
        let image = ResidentMemoryImage::new();
        assert!(image.get_index().unwrap().is_empty());

        let a = Index::empty().join_table("t", Link::new(Address::new("a1")));
        let b = Index::empty().join_table("u", Link::new(Address::new("a2")));

        image.join_index(&a).unwrap();
        image.join_index(&b).unwrap();

        let stored = image.get_index().unwrap();
        assert_eq!(stored, a.join(&b));

        // Rejoining is a no-op.
        image.join_index(&a).unwrap();
        assert_eq!(image.get_index().unwrap(), stored);
    }

    #[test]
    fn concurrent_access_is_safe() {
        let cache = Arc::new(ResidentCache::new(64));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let addr = Address::new(format!("a{i}"));
                    let ns = namespace(&format!("v{i}"));
                    cache.set_namespace(&addr, &ns).unwrap();
                    assert_eq!(cache.get_namespace(&addr).unwrap(), Some(ns));
                    cache.set_head(&addr).unwrap();
                    assert!(cache.get_head().unwrap().is_some());
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread should not panic");
        }
    }
}
