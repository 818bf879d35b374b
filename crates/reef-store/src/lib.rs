//! Content-addressed store and pub/sub contract.
//!
//! The engine talks to its peer network through [`ContentPeer`]: add/cat of
//! immutable blobs plus topic-based publish/subscribe. The reference
//! deployment backs this with an IPFS-like daemon; [`MemoryPeer`] provides
//! the same capability set in-process for tests and embedding. Any number of
//! peers sharing one `MemoryPeer` see one blob space and one gossip mesh.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryPeer;
pub use traits::{ContentPeer, PubSubRecord, PubSubStream};
