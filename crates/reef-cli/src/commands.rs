use std::sync::Arc;

use anyhow::Context;

use reef_api::PriorityTable;
use reef_cache::{
    DurableCache, DurableCacheOptions, HeadCache, IndexCache, MemoryImage, NamespaceCache,
    ResidentCache, ResidentMemoryImage, ResidentPriorityQueue,
};
use reef_crypto::SigningKey;
use reef_engine::{
    EngineOptions, RemoteNamespace, Replicator, ReplicatorOptions, RetryPolicy, Service,
};
use reef_proto::CodecOptions;
use reef_server::{ReefServer, ServerConfig};
use reef_store::{ContentPeer, MemoryPeer};

use crate::cli::ServeArgs;

struct CacheStack {
    head: Arc<dyn HeadCache>,
    index: Arc<dyn IndexCache>,
    namespace: Arc<dyn NamespaceCache>,
    image: Arc<dyn MemoryImage>,
}

/// Run a reef peer until interrupted.
///
/// The standalone peer runs against an in-process content store; a
/// networked deployment substitutes any `ContentPeer` implementation
/// backed by an IPFS-like daemon.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let codec = CodecOptions::default();
    let caches = build_caches(&args, codec)?;
    let signing_key = parse_signing_key(args.signing_key.as_deref())?;

    let peer: Arc<dyn ContentPeer> = Arc::new(MemoryPeer::new("local"));

    let engine = RemoteNamespace::new(
        Arc::clone(&peer),
        caches.head,
        caches.index,
        caches.namespace,
        caches.image,
        EngineOptions {
            replicate_topics: args.topics.clone(),
            signing_key,
            codec,
            retry: RetryPolicy::default(),
        },
    );

    let queue = Arc::new(ResidentPriorityQueue::new(
        args.queue_capacity,
        PriorityTable::default(),
    ));
    let (handle, dispatcher) = Service::launch(engine, queue, args.query_limit);

    let replicator = Replicator::new(
        Arc::clone(&peer),
        handle.clone(),
        ReplicatorOptions {
            topics: args.topics.clone(),
            require_signed_links: args.require_signed_links,
            ..ReplicatorOptions::default()
        },
    );
    let replicator_task = replicator.spawn();

    let server = ReefServer::new(
        ServerConfig {
            bind_addr: args.bind,
        },
        handle.clone(),
        codec,
    );
    let server_task = tokio::spawn(server.serve());

    tracing::info!("reef peer up; ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    tracing::info!("shutting down");
    handle.close_api();
    dispatcher.await.ok();
    replicator_task.await.ok();
    server_task.abort();
    Ok(())
}

fn build_caches(args: &ServeArgs, codec: CodecOptions) -> anyhow::Result<CacheStack> {
    match &args.data_dir {
        Some(dir) => {
            let cache = Arc::new(
                DurableCache::open(
                    dir.join("reef.redb"),
                    DurableCacheOptions {
                        max_cache_size: args.cache_size,
                        codec,
                    },
                )
                .with_context(|| format!("opening durable cache in {}", dir.display()))?,
            );
            tracing::info!(dir = %dir.display(), "using durable cache");
            Ok(CacheStack {
                head: Arc::clone(&cache) as _,
                index: Arc::clone(&cache) as _,
                namespace: Arc::clone(&cache) as _,
                image: cache as _,
            })
        }
        None => {
            let cache = Arc::new(ResidentCache::new(args.cache_size));
            tracing::info!("using in-memory caches");
            Ok(CacheStack {
                head: Arc::clone(&cache) as _,
                index: Arc::clone(&cache) as _,
                namespace: cache as _,
                image: Arc::new(ResidentMemoryImage::new()) as _,
            })
        }
    }
}

fn parse_signing_key(hex_key: Option<&str>) -> anyhow::Result<Option<Arc<SigningKey>>> {
    match hex_key {
        None => Ok(None),
        Some(text) => {
            let bytes = hex::decode(text).context("signing key is not valid hex")?;
            let bytes: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("signing key must be exactly 32 bytes"))?;
            Ok(Some(Arc::new(SigningKey::from_bytes(bytes))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_signing_key_accepts_32_byte_hex() {
        let hex_key = "11".repeat(32);
        let key = parse_signing_key(Some(&hex_key)).unwrap();
        assert!(key.is_some());
    }

    #[test]
    fn parse_signing_key_rejects_bad_input() {
        assert!(parse_signing_key(Some("zz")).is_err());
        assert!(parse_signing_key(Some("1234")).is_err());
        assert!(parse_signing_key(None).unwrap().is_none());
    }
}
