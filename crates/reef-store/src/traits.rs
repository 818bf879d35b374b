use async_trait::async_trait;
use tokio::sync::broadcast;

use reef_crdt::Address;

use crate::error::{StoreError, StoreResult};

/// One gossiped record received from a topic.
#[derive(Clone, Debug)]
pub struct PubSubRecord {
    /// Identifier of the publishing peer.
    pub from: String,
    pub data: Vec<u8>,
    pub seq_no: u64,
    pub topics: Vec<String>,
}

/// A live subscription. `next` blocks until a record arrives.
///
/// A slow consumer may miss records (gossip is lossy by nature); the stream
/// skips over the gap rather than erroring. The stream ends only when the
/// peer drops the topic, at which point `next` returns an error.
pub struct PubSubStream {
    receiver: broadcast::Receiver<PubSubRecord>,
}

impl PubSubStream {
    pub fn new(receiver: broadcast::Receiver<PubSubRecord>) -> Self {
        Self { receiver }
    }

    pub async fn next(&mut self) -> StoreResult<PubSubRecord> {
        loop {
            match self.receiver.recv().await {
                Ok(record) => return Ok(record),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "pub/sub stream lagged, skipping");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::PubSub("subscription closed".into()));
                }
            }
        }
    }
}

/// Capability contract the engine requires from its peer network.
///
/// Implementations must satisfy:
/// - `add` is content-addressed: equal bytes yield equal addresses, and
///   re-adding existing content is an idempotent no-op.
/// - `cat(add(data)) == data` while the blob is available.
/// - The store is eventually available: transient `cat`/`publish` failures
///   are retryable and the engine will retry them.
/// - All methods are safe to call from any task concurrently.
#[async_trait]
pub trait ContentPeer: Send + Sync {
    async fn connect(&self) -> StoreResult<()>;

    async fn disconnect(&self) -> StoreResult<()>;

    async fn is_up(&self) -> bool;

    /// Store a blob, returning its content address.
    async fn add(&self, data: Vec<u8>) -> StoreResult<Address>;

    /// Fetch the blob at `address`.
    async fn cat(&self, address: &Address) -> StoreResult<Vec<u8>>;

    /// Publish bytes to every subscriber of `topic`.
    async fn publish(&self, topic: &str, data: Vec<u8>) -> StoreResult<()>;

    /// Subscribe to a topic.
    async fn subscribe(&self, topic: &str) -> StoreResult<PubSubStream>;
}
