use std::sync::Arc;

use reef_api::{ApiError, ApiResult, ReflectionType, RequestType, Response};
use reef_cache::{CacheError, HeadCache, IndexCache, MemoryImage, NamespaceCache};
use reef_crdt::{Address, Index, Link, Namespace};
use reef_proto::binary;
use reef_query::{evaluate_select, table_from_join, Query, QueryOp};
use reef_store::ContentPeer;

use crate::options::EngineOptions;
use crate::retry::with_retries;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EngineState {
    Fresh,
    Loaded,
    Dirty,
    Closed,
}

/// The single logical mutator of this peer's replicated state.
///
/// The engine owns the head, a lazily loaded index, and a lazily loaded
/// merged namespace. All mutating operations are invoked serially by the
/// request pipeline; the engine itself is never shared across tasks.
///
/// On a write, a new namespace snapshot and index are persisted and the
/// head advances only after both are durable. A failure before the head
/// advance leaves the head unchanged; a snapshot leaked into the store by
/// such a failure is tolerated and collected out of band.
pub struct RemoteNamespace {
    peer: Arc<dyn ContentPeer>,
    head_cache: Arc<dyn HeadCache>,
    index_cache: Arc<dyn IndexCache>,
    namespace_cache: Arc<dyn NamespaceCache>,
    memory_image: Arc<dyn MemoryImage>,
    options: EngineOptions,
    state: EngineState,
    head: Option<Address>,
    index: Option<Index>,
    namespace: Option<Namespace>,
}

impl RemoteNamespace {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        peer: Arc<dyn ContentPeer>,
        head_cache: Arc<dyn HeadCache>,
        index_cache: Arc<dyn IndexCache>,
        namespace_cache: Arc<dyn NamespaceCache>,
        memory_image: Arc<dyn MemoryImage>,
        options: EngineOptions,
    ) -> Self {
        Self {
            peer,
            head_cache,
            index_cache,
            namespace_cache,
            memory_image,
            options,
            state: EngineState::Fresh,
            head: None,
            index: None,
            namespace: None,
        }
    }

    /// Execute a query. SELECT is read-only; JOIN persists a new snapshot,
    /// advances the head and publishes it.
    pub async fn run_query(&mut self, query: &Query) -> Response {
        match self.try_run_query(query).await {
            Ok(response) => response,
            Err(err) => Response::error(RequestType::Query, &err),
        }
    }

    /// Read-only introspection.
    pub async fn reflect(&mut self, reflection: ReflectionType) -> Response {
        match self.try_reflect(reflection).await {
            Ok(response) => response,
            Err(err) => Response::error(RequestType::Reflect, &err),
        }
    }

    /// Merge peer-published links into local state.
    ///
    /// Failed links are collected and reported in aggregate; the head
    /// advances iff at least one link merged.
    pub async fn replicate(&mut self, links: &[Link]) -> Response {
        match self.try_replicate(links).await {
            Ok(response) => response,
            Err(err) => Response::error(RequestType::Replicate, &err),
        }
    }

    /// Flush the current index into the memory image for recovery.
    pub async fn write_memory_image(&mut self) -> ApiResult<()> {
        self.ensure_open()?;
        let index = self.current_index().await?;
        self.memory_image.join_index(&index).map_err(cache_err)
    }

    /// Flush state and refuse further operations.
    pub async fn close(&mut self) {
        if self.state == EngineState::Closed {
            return;
        }
        if let Err(err) = self.write_memory_image().await {
            tracing::warn!(%err, "failed to flush memory image on close");
        }
        self.state = EngineState::Closed;
        tracing::info!("engine closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state == EngineState::Closed
    }

    fn ensure_open(&self) -> ApiResult<()> {
        if self.state == EngineState::Closed {
            Err(ApiError::AlreadyClosed)
        } else {
            Ok(())
        }
    }

    async fn try_run_query(&mut self, query: &Query) -> ApiResult<Response> {
        self.ensure_open()?;
        match &query.op {
            QueryOp::Select(select) => {
                let namespace = self.current_namespace().await?;
                let result = evaluate_select(&namespace, &query.table, select)?;
                Ok(Response::ok(RequestType::Query).with_namespace(result))
            }
            QueryOp::Join(join) => {
                if query.table.is_empty() {
                    return Err(ApiError::Validation("expected table key".into()));
                }
                let addition = table_from_join(join);
                let current = self.current_namespace().await?;
                let joined = current.join_table(query.table.clone(), addition);

                self.state = EngineState::Dirty;
                match self.persist_namespace(&joined).await {
                    Ok(head) => {
                        self.state = EngineState::Loaded;
                        Ok(Response::ok(RequestType::Query).with_path(head))
                    }
                    Err(err) => {
                        // Head unchanged on failure: drop the working state
                        // so the next access reloads from the durable head.
                        self.namespace = None;
                        self.index = None;
                        self.state = EngineState::Loaded;
                        Err(err)
                    }
                }
            }
        }
    }

    async fn try_reflect(&mut self, reflection: ReflectionType) -> ApiResult<Response> {
        self.ensure_open()?;
        match reflection {
            ReflectionType::Noop => Ok(Response::ok(RequestType::Reflect)),
            ReflectionType::HeadPath => {
                self.load().await?;
                let head = self
                    .head
                    .clone()
                    .ok_or_else(|| ApiError::NotFound("head not set".into()))?;
                Ok(Response::ok(RequestType::Reflect).with_path(head))
            }
            ReflectionType::DumpNamespace => {
                let namespace = self.current_namespace().await?;
                Ok(Response::ok(RequestType::Reflect).with_namespace(namespace))
            }
            ReflectionType::Index => {
                let index = self.current_index().await?;
                Ok(Response::ok(RequestType::Reflect).with_index(index))
            }
        }
    }

    async fn try_replicate(&mut self, links: &[Link]) -> ApiResult<Response> {
        self.ensure_open()?;
        let mut work_index = self.current_index().await?;
        let mut work_namespace = self.current_namespace().await?;
        let mut merged_any = false;
        let mut failed: Vec<String> = Vec::new();

        for link in links {
            match self
                .merge_remote_link(link, &mut work_index, &mut work_namespace)
                .await
            {
                Ok(changed) => merged_any |= changed,
                Err(err) => {
                    tracing::warn!(address = %link.address(), %err, "replication of link failed");
                    failed.push(link.address().to_string());
                }
            }
        }

        if merged_any {
            self.state = EngineState::Dirty;
            match self.advance_head(&work_index).await {
                Ok(_) => {
                    self.index = Some(work_index);
                    self.namespace = Some(work_namespace);
                    self.state = EngineState::Loaded;
                }
                Err(err) => {
                    self.namespace = None;
                    self.index = None;
                    self.state = EngineState::Loaded;
                    return Err(err);
                }
            }
        }

        if failed.is_empty() {
            Ok(Response::ok(RequestType::Replicate))
        } else {
            let err = ApiError::Store(format!(
                "replication failed for links: {}",
                failed.join(", ")
            ));
            Ok(Response::error(RequestType::Replicate, &err))
        }
    }

    /// Join one remote index into the working state. Returns `false` when
    /// the link added nothing (idempotent replay).
    async fn merge_remote_link(
        &self,
        link: &Link,
        work_index: &mut Index,
        work_namespace: &mut Namespace,
    ) -> ApiResult<bool> {
        let remote = self.load_index(link.address()).await?;
        let joined = work_index.join(&remote);
        if joined == *work_index {
            tracing::debug!(address = %link.address(), "link already merged");
            return Ok(false);
        }

        for address in remote.all_addresses() {
            let snapshot = self.load_namespace(&address).await?;
            *work_namespace = work_namespace.join(&snapshot);
        }
        *work_index = joined;
        Ok(true)
    }

    // Fresh -> Loaded: fetch the head from the cache, falling back to the
    // memory image when the head cell is missing (fresh database after a
    // crash that flushed the image but lost the head, or a warm bootstrap).
    async fn load(&mut self) -> ApiResult<()> {
        if self.state != EngineState::Fresh {
            return Ok(());
        }
        match self.head_cache.get_head().map_err(cache_err)? {
            Some(head) => {
                tracing::debug!(%head, "loaded head from cache");
                self.head = Some(head);
            }
            None => {
                let image = self.memory_image.get_index().map_err(cache_err)?;
                if !image.is_empty() {
                    let head = self.persist_index(&image).await?;
                    self.head_cache.set_head(&head).map_err(cache_err)?;
                    tracing::info!(%head, "bootstrapped head from memory image");
                    self.head = Some(head);
                    self.index = Some(image);
                }
            }
        }
        self.state = EngineState::Loaded;
        Ok(())
    }

    async fn current_index(&mut self) -> ApiResult<Index> {
        self.load().await?;
        if let Some(index) = &self.index {
            return Ok(index.clone());
        }
        let index = match self.head.clone() {
            None => Index::empty(),
            Some(head) => self.load_index(&head).await?,
        };
        self.index = Some(index.clone());
        Ok(index)
    }

    async fn current_namespace(&mut self) -> ApiResult<Namespace> {
        self.load().await?;
        if let Some(namespace) = &self.namespace {
            return Ok(namespace.clone());
        }
        let index = self.current_index().await?;
        let mut merged = Namespace::empty();
        for address in index.all_addresses() {
            let snapshot = self.load_namespace(&address).await?;
            merged = merged.join(&snapshot);
        }
        self.namespace = Some(merged.clone());
        Ok(merged)
    }

    // Read-through: cache first, then the peer store, back-filling the
    // cache on a miss.
    async fn load_index(&self, address: &Address) -> ApiResult<Index> {
        if let Some(index) = self.index_cache.get_index(address).map_err(cache_err)? {
            return Ok(index);
        }
        let bytes = self.cat_with_retry(address).await?;
        let index = binary::decode_index(&bytes).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.index_cache
            .set_index(address, &index)
            .map_err(cache_err)?;
        Ok(index)
    }

    async fn load_namespace(&self, address: &Address) -> ApiResult<Namespace> {
        if let Some(namespace) = self
            .namespace_cache
            .get_namespace(address)
            .map_err(cache_err)?
        {
            return Ok(namespace);
        }
        let bytes = self.cat_with_retry(address).await?;
        let namespace =
            binary::decode_namespace(&bytes).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.namespace_cache
            .set_namespace(address, &namespace)
            .map_err(cache_err)?;
        Ok(namespace)
    }

    // Persist the joined namespace, fold it into the index, advance the
    // head, publish. The head cell is the commit point.
    async fn persist_namespace(&mut self, namespace: &Namespace) -> ApiResult<Address> {
        let (bytes, invalid) = binary::encode_namespace(namespace, &self.options.codec)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if !invalid.is_empty() {
            tracing::warn!(
                count = invalid.len(),
                "oversized points separated from persisted snapshot"
            );
        }
        let snapshot_addr = self.add_with_retry(bytes).await?;
        self.namespace_cache
            .set_namespace(&snapshot_addr, namespace)
            .map_err(cache_err)?;

        let link = self.make_link(snapshot_addr);
        let addition = Index::from_namespace(namespace, link);
        let new_index = self.current_index().await?.join(&addition);

        let head = self.advance_head(&new_index).await?;
        self.index = Some(new_index);
        self.namespace = Some(namespace.clone());
        Ok(head)
    }

    async fn advance_head(&mut self, index: &Index) -> ApiResult<Address> {
        let head = self.persist_index(index).await?;
        self.head_cache.set_head(&head).map_err(cache_err)?;
        self.head = Some(head.clone());
        tracing::info!(%head, "head advanced");
        self.publish_head(&head).await;
        Ok(head)
    }

    async fn persist_index(&self, index: &Index) -> ApiResult<Address> {
        let bytes =
            binary::encode_index(index).map_err(|e| ApiError::Internal(e.to_string()))?;
        let address = self.add_with_retry(bytes).await?;
        self.index_cache
            .set_index(&address, index)
            .map_err(cache_err)?;
        Ok(address)
    }

    // Publishing is best-effort once the head is durable; a missed gossip
    // round is recovered by the next one.
    async fn publish_head(&self, head: &Address) {
        let link = self.make_link(head.clone());
        let bytes = match binary::encode_link(&link) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(%err, "failed to encode head link for gossip");
                return;
            }
        };
        for topic in &self.options.replicate_topics {
            let result = with_retries(self.options.retry, "publish", || {
                self.peer.publish(topic, bytes.clone())
            })
            .await;
            if let Err(err) = result {
                tracing::warn!(%topic, %err, "failed to publish head");
            }
        }
    }

    fn make_link(&self, address: Address) -> Link {
        match &self.options.signing_key {
            Some(key) => {
                let signature = key.sign(address.as_str().as_bytes());
                Link::signed(address, vec![signature])
            }
            None => Link::new(address),
        }
    }

    async fn cat_with_retry(&self, address: &Address) -> ApiResult<Vec<u8>> {
        with_retries(self.options.retry, "cat", || self.peer.cat(address))
            .await
            .map_err(|e| ApiError::Store(e.to_string()))
    }

    async fn add_with_retry(&self, bytes: Vec<u8>) -> ApiResult<Address> {
        with_retries(self.options.retry, "add", || self.peer.add(bytes.clone()))
            .await
            .map_err(|e| ApiError::Store(e.to_string()))
    }
}

fn cache_err(err: CacheError) -> ApiError {
    match err {
        CacheError::Codec(msg) => ApiError::Decode(msg),
        other => ApiError::Internal(other.to_string()),
    }
}
