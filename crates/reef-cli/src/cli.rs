use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "reef",
    version,
    about = "Decentralized key-value database over content-addressed gossip"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a reef peer: engine, request pipeline, replicator and HTTP API.
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address the HTTP API binds to.
    #[arg(long, default_value = "127.0.0.1:8085")]
    pub bind: SocketAddr,

    /// Directory for the durable cache. Uses in-memory caches when omitted.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Bound on the index and namespace caches, in entries.
    #[arg(long, default_value_t = reef_cache::DEFAULT_MAX_CACHE_SIZE)]
    pub cache_size: usize,

    /// Replication topics to publish to and subscribe on. Repeatable.
    #[arg(long = "topic", default_value = "reef/heads")]
    pub topics: Vec<String>,

    /// Capacity of the request queue.
    #[arg(long, default_value_t = 256)]
    pub queue_capacity: usize,

    /// Commands in flight against the engine concurrently.
    #[arg(long, default_value_t = 1)]
    pub query_limit: usize,

    /// Reject gossiped links without a valid signature.
    #[arg(long)]
    pub require_signed_links: bool,

    /// Hex-encoded 32-byte key for signing published links.
    #[arg(long)]
    pub signing_key: Option<String>,
}
