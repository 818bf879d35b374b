//! Canonical codecs for every transportable reef type.
//!
//! Two encodings exist for each type: a compact binary form (bincode) used
//! for storage and the wire, and a human-readable text form (JSON) used for
//! debugging and the text content-type path. Both are canonical: encoding
//! is a function of the value alone. Namespaces and indexes go through
//! their sorted stream forms, so structurally equal values produce
//! byte-identical blobs, which content addressing depends on.
//!
//! Namespace encoding separates points that violate the configured maximum
//! size and reports them alongside the bytes; encoding itself fails only on
//! serializer errors.

pub mod binary;
pub mod error;
pub mod text;

pub use error::{ProtoError, ProtoResult};

/// Content type selecting the binary codec on the wire.
pub const MIME_BINARY: &str = "application/octet-stream";
/// Content type selecting the text codec on the wire.
pub const MIME_TEXT: &str = "text/plain";

pub const DEFAULT_MAX_POINT_SIZE: usize = 64 * 1024;

/// Tunables shared by both codecs.
#[derive(Clone, Copy, Debug)]
pub struct CodecOptions {
    /// Points larger than this are separated out of namespace encodings.
    pub max_point_size: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_point_size: DEFAULT_MAX_POINT_SIZE,
        }
    }
}
