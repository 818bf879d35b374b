//! The reef engine: the single logical mutator of remote state.
//!
//! [`RemoteNamespace`] owns the peer's head, its loaded index and its merged
//! working namespace. Writes produce new immutable snapshots in the content
//! store, advance the head, and gossip the new head address. The
//! [`service`] pipeline serializes arbitrary client requests onto the
//! engine through a bounded priority queue; the [`replicator`] feeds
//! gossiped links back into the pipeline as replicate requests.

pub mod options;
pub mod remote;
pub mod replicator;
pub mod retry;
pub mod service;

pub use options::EngineOptions;
pub use remote::RemoteNamespace;
pub use replicator::{Replicator, ReplicatorOptions};
pub use retry::RetryPolicy;
pub use service::{Service, ServiceHandle};
