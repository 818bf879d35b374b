//! Signature support for the reef database.
//!
//! Points and links may carry Ed25519 signatures. A [`Signature`] is
//! self-contained: it embeds the signer's public key, so a gossip receiver
//! can check it without out-of-band key distribution. Whether to *trust* a
//! given key is a policy question left to the caller.

pub mod error;
pub mod signer;

pub use error::{CryptoError, CryptoResult};
pub use signer::{Signature, SigningKey, VerifyingKey};
