use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use reef_api::{ApiError, Request};
use reef_proto::binary;
use reef_store::{ContentPeer, PubSubRecord};

use crate::service::ServiceHandle;

const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

#[derive(Clone, Debug)]
pub struct ReplicatorOptions {
    /// Topics to pull peer heads from.
    pub topics: Vec<String>,
    /// Reject gossiped links that carry no valid signature.
    pub require_signed_links: bool,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for ReplicatorOptions {
    fn default() -> Self {
        Self {
            topics: vec!["reef/heads".to_string()],
            require_signed_links: false,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_secs(30),
        }
    }
}

/// Pub/sub subscriber feeding gossiped links into the request pipeline as
/// replicate requests.
///
/// Subscription errors drive bounded-exponential-backoff reconnection;
/// undecodable records are logged and skipped. The loops end when the
/// service closes.
pub struct Replicator {
    peer: Arc<dyn ContentPeer>,
    handle: ServiceHandle,
    options: ReplicatorOptions,
}

impl Replicator {
    pub fn new(
        peer: Arc<dyn ContentPeer>,
        handle: ServiceHandle,
        options: ReplicatorOptions,
    ) -> Self {
        Self {
            peer,
            handle,
            options,
        }
    }

    /// Spawn one subscriber task per topic.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut loops = Vec::new();
            for topic in self.options.topics.clone() {
                let peer = Arc::clone(&self.peer);
                let handle = self.handle.clone();
                let options = self.options.clone();
                loops.push(tokio::spawn(subscribe_loop(peer, handle, options, topic)));
            }
            for task in loops {
                let _ = task.await;
            }
        })
    }
}

async fn subscribe_loop(
    peer: Arc<dyn ContentPeer>,
    handle: ServiceHandle,
    options: ReplicatorOptions,
    topic: String,
) {
    let mut backoff = options.backoff_base;
    loop {
        if handle.is_closed() {
            tracing::debug!(%topic, "service closed, subscriber stopping");
            return;
        }
        match peer.subscribe(&topic).await {
            Ok(mut stream) => {
                tracing::info!(%topic, "subscribed to replication topic");
                backoff = options.backoff_base;
                loop {
                    if handle.is_closed() {
                        return;
                    }
                    // Bound the wait so shutdown is observed even on a
                    // quiet topic.
                    match tokio::time::timeout(SHUTDOWN_POLL, stream.next()).await {
                        Err(_) => continue,
                        Ok(Ok(record)) => deliver_record(&handle, &options, record),
                        Ok(Err(err)) => {
                            tracing::warn!(%topic, %err, "subscription lost");
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%topic, %err, "subscribe failed");
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(options.backoff_max);
    }
}

fn deliver_record(handle: &ServiceHandle, options: &ReplicatorOptions, record: PubSubRecord) {
    let link = match binary::decode_link(&record.data) {
        Ok(link) => link,
        Err(err) => {
            tracing::debug!(from = %record.from, %err, "skipping undecodable gossip record");
            return;
        }
    };
    if options.require_signed_links && !link.has_valid_signature() {
        tracing::warn!(
            from = %record.from,
            address = %link.address(),
            "rejecting unsigned gossip link"
        );
        return;
    }

    match handle.call(Request::replicate(vec![link])) {
        Ok(receiver) => {
            // Surface replication failures in the log without blocking the
            // subscriber on the engine.
            tokio::spawn(async move {
                if let Ok(response) = receiver.await {
                    if response.is_error() {
                        tracing::warn!(err = ?response.err, "replication request failed");
                    }
                }
            });
        }
        Err(ApiError::QueueFull) => {
            tracing::debug!("queue full, dropping gossip record");
        }
        Err(err) => {
            tracing::debug!(%err, "replicate call rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use reef_api::{PriorityTable, ReflectionType};
    use reef_cache::{ResidentCache, ResidentMemoryImage, ResidentPriorityQueue};
    use reef_crdt::{Address, Link, Namespace};
    use reef_crypto::SigningKey;
    use reef_query::{Query, RowJoin};
    use reef_store::MemoryPeer;

    use crate::options::EngineOptions;
    use crate::remote::RemoteNamespace;
    use crate::retry::RetryPolicy;
    use crate::service::Service;

    fn engine_on(peer: Arc<MemoryPeer>) -> RemoteNamespace {
        let cache = Arc::new(ResidentCache::new(64));
        RemoteNamespace::new(
            peer,
            Arc::clone(&cache) as _,
            Arc::clone(&cache) as _,
            cache as _,
            Arc::new(ResidentMemoryImage::new()) as _,
            EngineOptions {
                retry: RetryPolicy::none(),
                ..EngineOptions::default()
            },
        )
    }

    fn join_query(table: &str, row: &str, entry: &str, value: &str) -> Query {
        let mut entries = BTreeMap::new();
        entries.insert(entry.to_string(), value.to_string());
        Query::join(
            table,
            vec![RowJoin {
                row_key: row.to_string(),
                entries,
            }],
        )
    }

    async fn dump(handle: &ServiceHandle) -> Namespace {
        let rx = handle
            .call(Request::reflect(ReflectionType::DumpNamespace))
            .unwrap();
        rx.await.unwrap().namespace.unwrap()
    }

    #[tokio::test]
    async fn peers_converge_through_gossip() {
        let peer = Arc::new(MemoryPeer::new("mesh"));

        // Peer B: full pipeline with a replicator pulling gossip.
        let queue_b = Arc::new(ResidentPriorityQueue::new(64, PriorityTable::default()));
        let (handle_b, dispatcher_b) =
            Service::launch(engine_on(Arc::clone(&peer)), Arc::clone(&queue_b), 1);
        let replicator = Replicator::new(
            Arc::clone(&peer) as Arc<dyn ContentPeer>,
            handle_b.clone(),
            ReplicatorOptions::default(),
        );
        let replicator_task = replicator.spawn();

        // Give the subscriber a moment to attach to the topic.
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Peer A writes and publishes.
        let mut engine_a = engine_on(Arc::clone(&peer));
        let joined = engine_a.run_query(&join_query("t", "r", "e", "v")).await;
        assert!(!joined.is_error());
        let dump_a = engine_a
            .reflect(ReflectionType::DumpNamespace)
            .await
            .namespace
            .unwrap();

        // B converges to A's view.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let dump_b = dump(&handle_b).await;
            if dump_b == dump_a {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "peer B did not converge; have {dump_b:?}, want {dump_a:?}"
            );
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        handle_b.close_api();
        dispatcher_b.await.unwrap();
        replicator_task.await.unwrap();
    }

    #[tokio::test]
    async fn undecodable_records_are_skipped() {
        let queue = Arc::new(ResidentPriorityQueue::new(8, PriorityTable::default()));
        let handle = Service::handle_only(Arc::clone(&queue));
        let options = ReplicatorOptions::default();

        let record = PubSubRecord {
            from: "peer-x".into(),
            data: b"not a link".to_vec(),
            seq_no: 1,
            topics: vec!["reef/heads".into()],
        };
        deliver_record(&handle, &options, record);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn unsigned_links_rejected_when_policy_requires() {
        let queue = Arc::new(ResidentPriorityQueue::new(8, PriorityTable::default()));
        let handle = Service::handle_only(Arc::clone(&queue));
        let options = ReplicatorOptions {
            require_signed_links: true,
            ..ReplicatorOptions::default()
        };

        let unsigned = Link::new(Address::new("a1"));
        let record = PubSubRecord {
            from: "peer-x".into(),
            data: binary::encode_link(&unsigned).unwrap(),
            seq_no: 1,
            topics: vec!["reef/heads".into()],
        };
        deliver_record(&handle, &options, record);
        assert_eq!(queue.len(), 0, "unsigned link dropped");

        let key = SigningKey::from_bytes([2u8; 32]);
        let signed = Link::signed(Address::new("a2"), vec![key.sign(b"a2")]);
        let record = PubSubRecord {
            from: "peer-x".into(),
            data: binary::encode_link(&signed).unwrap(),
            seq_no: 2,
            topics: vec!["reef/heads".into()],
        };
        deliver_record(&handle, &options, record);
        assert_eq!(queue.len(), 1, "signed link admitted");
    }

    #[tokio::test]
    async fn unsigned_links_accepted_by_default() {
        let queue = Arc::new(ResidentPriorityQueue::new(8, PriorityTable::default()));
        let handle = Service::handle_only(Arc::clone(&queue));

        let record = PubSubRecord {
            from: "peer-x".into(),
            data: binary::encode_link(&Link::new(Address::new("a1"))).unwrap(),
            seq_no: 1,
            topics: vec!["reef/heads".into()],
        };
        deliver_record(&handle, &ReplicatorOptions::default(), record);
        assert_eq!(queue.len(), 1);
    }
}
