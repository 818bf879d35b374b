use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use reef_crdt::{Address, Index, Namespace};
use reef_proto::{binary, CodecOptions};

use crate::error::{codec, storage, CacheResult};
use crate::traits::{HeadCache, IndexCache, MemoryImage, NamespaceCache};
use crate::DEFAULT_MAX_CACHE_SIZE;

const HEAD_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("head");
const INDEX_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("index");
const INDEX_RECENCY: TableDefinition<&str, u64> = TableDefinition::new("index-recency");
const NAMESPACE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("namespace");
const NAMESPACE_RECENCY: TableDefinition<&str, u64> = TableDefinition::new("namespace-recency");
const IMAGE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("memory-image");

const HEAD_KEY: &str = "head";
const IMAGE_KEY: &str = "index";

#[derive(Clone, Copy, Debug)]
pub struct DurableCacheOptions {
    /// Bound on the index and namespace tables, in entries.
    pub max_cache_size: usize,
    pub codec: CodecOptions,
}

impl Default for DurableCacheOptions {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            codec: CodecOptions::default(),
        }
    }
}

/// Durable cache backend over a single redb file.
///
/// Every operation is one write transaction, so writes are serialized and
/// `set_head` is atomic. Values are canonical binary encodings keyed by
/// content address. The index and namespace tables are LRU-bounded via
/// recency stamps; eviction is safe because evicted snapshots remain
/// recoverable from the peer store.
pub struct DurableCache {
    db: Database,
    options: DurableCacheOptions,
    clock: AtomicU64,
}

impl DurableCache {
    pub fn open(path: impl AsRef<Path>, options: DurableCacheOptions) -> CacheResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(storage)?;
        }
        let db = Database::create(path).map_err(storage)?;
        let cache = Self {
            db,
            options,
            clock: AtomicU64::new(0),
        };
        cache.restore_clock()?;
        Ok(cache)
    }

    // The recency clock must keep counting across restarts or old stamps
    // would outrank new ones.
    fn restore_clock(&self) -> CacheResult<()> {
        let txn = self.db.begin_write().map_err(storage)?;
        let mut max = 0u64;
        for def in [INDEX_RECENCY, NAMESPACE_RECENCY] {
            let table = txn.open_table(def).map_err(storage)?;
            for row in table.iter().map_err(storage)? {
                let (_, stamp) = row.map_err(storage)?;
                max = max.max(stamp.value() + 1);
            }
        }
        txn.commit().map_err(storage)?;
        self.clock.store(max, Ordering::SeqCst);
        Ok(())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    fn get_blob(
        &self,
        table_def: TableDefinition<&str, &[u8]>,
        recency_def: TableDefinition<&str, u64>,
        key: &str,
    ) -> CacheResult<Option<Vec<u8>>> {
        // A hit bumps the recency stamp, so reads go through the writer.
        let txn = self.db.begin_write().map_err(storage)?;
        let found = {
            let table = txn.open_table(table_def).map_err(storage)?;
            let value = table.get(key).map_err(storage)?;
            value.map(|guard| guard.value().to_vec())
        };
        if found.is_some() {
            let stamp = self.tick();
            let mut recency = txn.open_table(recency_def).map_err(storage)?;
            recency.insert(key, stamp).map_err(storage)?;
        }
        txn.commit().map_err(storage)?;
        Ok(found)
    }

    fn set_blob(
        &self,
        table_def: TableDefinition<&str, &[u8]>,
        recency_def: TableDefinition<&str, u64>,
        key: &str,
        value: &[u8],
    ) -> CacheResult<()> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(table_def).map_err(storage)?;
            let mut recency = txn.open_table(recency_def).map_err(storage)?;
            table.insert(key, value).map_err(storage)?;
            let stamp = self.tick();
            recency.insert(key, stamp).map_err(storage)?;
            evict_lru(&mut table, &mut recency, self.options.max_cache_size)?;
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }
}

// Remove least-recently-stamped entries until the table fits the bound.
fn evict_lru(
    table: &mut redb::Table<&str, &[u8]>,
    recency: &mut redb::Table<&str, u64>,
    max_entries: usize,
) -> CacheResult<()> {
    while table.len().map_err(storage)? as usize > max_entries {
        let mut oldest: Option<(String, u64)> = None;
        for row in recency.iter().map_err(storage)? {
            let (key, stamp) = row.map_err(storage)?;
            let stamp = stamp.value();
            if oldest.as_ref().map_or(true, |(_, s)| stamp < *s) {
                oldest = Some((key.value().to_string(), stamp));
            }
        }
        match oldest {
            Some((key, _)) => {
                tracing::debug!(%key, "evicting cache entry");
                table.remove(key.as_str()).map_err(storage)?;
                recency.remove(key.as_str()).map_err(storage)?;
            }
            None => break,
        }
    }
    Ok(())
}

impl HeadCache for DurableCache {
    fn get_head(&self) -> CacheResult<Option<Address>> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = match txn.open_table(HEAD_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(storage(e)),
        };
        let value = table.get(HEAD_KEY).map_err(storage)?;
        Ok(value.map(|guard| {
            Address::new(String::from_utf8_lossy(guard.value()).into_owned())
        }))
    }

    fn set_head(&self, head: &Address) -> CacheResult<()> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(HEAD_TABLE).map_err(storage)?;
            table
                .insert(HEAD_KEY, head.as_str().as_bytes())
                .map_err(storage)?;
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }
}

impl IndexCache for DurableCache {
    fn get_index(&self, address: &Address) -> CacheResult<Option<Index>> {
        let blob = self.get_blob(INDEX_TABLE, INDEX_RECENCY, address.as_str())?;
        blob.map(|bytes| binary::decode_index(&bytes).map_err(codec))
            .transpose()
    }

    fn set_index(&self, address: &Address, index: &Index) -> CacheResult<()> {
        let bytes = binary::encode_index(index).map_err(codec)?;
        self.set_blob(INDEX_TABLE, INDEX_RECENCY, address.as_str(), &bytes)
    }
}

impl NamespaceCache for DurableCache {
    fn get_namespace(&self, address: &Address) -> CacheResult<Option<Namespace>> {
        let blob = self.get_blob(NAMESPACE_TABLE, NAMESPACE_RECENCY, address.as_str())?;
        blob.map(|bytes| binary::decode_namespace(&bytes).map_err(codec))
            .transpose()
    }

    fn set_namespace(&self, address: &Address, namespace: &Namespace) -> CacheResult<()> {
        let (bytes, invalid) = binary::encode_namespace(namespace, &self.options.codec)
            .map_err(codec)?;
        if !invalid.is_empty() {
            tracing::warn!(
                count = invalid.len(),
                "namespace snapshot had oversized points, separated from cache encoding"
            );
        }
        self.set_blob(NAMESPACE_TABLE, NAMESPACE_RECENCY, address.as_str(), &bytes)
    }
}

impl MemoryImage for DurableCache {
    fn get_index(&self) -> CacheResult<Index> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = match txn.open_table(IMAGE_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Index::empty()),
            Err(e) => return Err(storage(e)),
        };
        match table.get(IMAGE_KEY).map_err(storage)? {
            Some(guard) => binary::decode_index(guard.value()).map_err(codec),
            None => Ok(Index::empty()),
        }
    }

    // Read-join-write inside one transaction: atomic and monotonic under
    // redb's single-writer discipline.
    fn join_index(&self, index: &Index) -> CacheResult<()> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(IMAGE_TABLE).map_err(storage)?;
            let current = match table.get(IMAGE_KEY).map_err(storage)? {
                Some(guard) => binary::decode_index(guard.value()).map_err(codec)?,
                None => Index::empty(),
            };
            let joined = current.join(index);
            let bytes = binary::encode_index(&joined).map_err(codec)?;
            table
                .insert(IMAGE_KEY, bytes.as_slice())
                .map_err(storage)?;
        }
        txn.commit().map_err(storage)?;
        Ok(())
    }
}

impl std::fmt::Debug for DurableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableCache")
            .field("max_cache_size", &self.options.max_cache_size)
            .finish()
    }
}
