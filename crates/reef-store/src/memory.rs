use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;

use reef_crdt::Address;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ContentPeer, PubSubRecord, PubSubStream};

const TOPIC_CHANNEL_CAPACITY: usize = 256;

/// In-process peer: blake3-addressed blob map plus broadcast topics.
///
/// Multiple engines sharing one `MemoryPeer` behave like peers on one
/// network: they see the same blob space and the same gossip topics. Faults
/// can be injected per address to exercise partial-failure paths.
pub struct MemoryPeer {
    peer_id: String,
    connected: AtomicBool,
    blobs: RwLock<HashMap<Address, Vec<u8>>>,
    topics: Mutex<HashMap<String, broadcast::Sender<PubSubRecord>>>,
    failing: RwLock<HashSet<Address>>,
    seq: AtomicU64,
}

impl MemoryPeer {
    pub fn new(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            connected: AtomicBool::new(true),
            blobs: RwLock::new(HashMap::new()),
            topics: Mutex::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Number of blobs currently stored.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Make every subsequent `cat` of `address` fail until cleared.
    pub fn fail_cat_on(&self, address: Address) {
        self.failing.write().expect("lock poisoned").insert(address);
    }

    pub fn clear_cat_failures(&self) {
        self.failing.write().expect("lock poisoned").clear();
    }

    fn check_up(&self) -> StoreResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "peer {} is disconnected",
                self.peer_id
            )))
        }
    }

    fn topic_sender(&self, topic: &str) -> broadcast::Sender<PubSubRecord> {
        let mut topics = self.topics.lock().expect("lock poisoned");
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CHANNEL_CAPACITY).0)
            .clone()
    }
}

fn content_address(data: &[u8]) -> Address {
    Address::new(hex::encode(blake3::hash(data).as_bytes()))
}

#[async_trait]
impl ContentPeer for MemoryPeer {
    async fn connect(&self) -> StoreResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> StoreResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_up(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn add(&self, data: Vec<u8>) -> StoreResult<Address> {
        self.check_up()?;
        let address = content_address(&data);
        let mut blobs = self.blobs.write().expect("lock poisoned");
        blobs.entry(address.clone()).or_insert(data);
        Ok(address)
    }

    async fn cat(&self, address: &Address) -> StoreResult<Vec<u8>> {
        self.check_up()?;
        if self.failing.read().expect("lock poisoned").contains(address) {
            return Err(StoreError::Io(format!("injected cat failure: {address}")));
        }
        let blobs = self.blobs.read().expect("lock poisoned");
        blobs
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(address.clone()))
    }

    async fn publish(&self, topic: &str, data: Vec<u8>) -> StoreResult<()> {
        self.check_up()?;
        let record = PubSubRecord {
            from: self.peer_id.clone(),
            data,
            seq_no: self.seq.fetch_add(1, Ordering::SeqCst),
            topics: vec![topic.to_string()],
        };
        // No subscribers is fine; gossip into the void.
        let _ = self.topic_sender(topic).send(record);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> StoreResult<PubSubStream> {
        self.check_up()?;
        Ok(PubSubStream::new(self.topic_sender(topic).subscribe()))
    }
}
