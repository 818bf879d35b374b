use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CryptoError, CryptoResult};

/// Ed25519 signing key (private).
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 verifying key (public).
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// A detached Ed25519 signature bundled with the signer's public key.
///
/// Equality and ordering are over the raw bytes, which lets containers treat
/// signature collections as sets.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature {
    key: [u8; 32],
    sig: [u8; 64],
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from a raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// The corresponding public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Sign a message, producing a self-contained signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature {
            key: self.0.verifying_key().to_bytes(),
            sig: self.0.sign(message).to_bytes(),
        }
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl VerifyingKey {
    /// Raw public key bytes.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl Signature {
    /// Public key bytes of the signer.
    pub fn key_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Check this signature against a message, using the embedded key.
    pub fn verify(&self, message: &[u8]) -> CryptoResult<()> {
        use ed25519_dalek::Verifier;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&self.key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let sig = ed25519_dalek::Signature::from_bytes(&self.sig);
        key.verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// Returns `true` if the signature checks out for `message`.
    pub fn is_valid_for(&self, message: &[u8]) -> bool {
        self.verify(message).is_ok()
    }

    /// Hex rendering: `<key hex>:<sig hex>`.
    pub fn to_hex(&self) -> String {
        format!("{}:{}", hex::encode(self.key), hex::encode(self.sig))
    }

    /// Parse the `<key hex>:<sig hex>` rendering.
    pub fn from_hex(text: &str) -> CryptoResult<Self> {
        let (key_part, sig_part) = text
            .split_once(':')
            .ok_or_else(|| CryptoError::InvalidHex("missing ':' separator".into()))?;
        let key_bytes =
            hex::decode(key_part).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let sig_bytes =
            hex::decode(sig_part).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let key: [u8; 32] = key_bytes.try_into().map_err(|v: Vec<u8>| {
            CryptoError::InvalidLength {
                expected: 32,
                actual: v.len(),
            }
        })?;
        let sig: [u8; 64] = sig_bytes.try_into().map_err(|v: Vec<u8>| {
            CryptoError::InvalidLength {
                expected: 64,
                actual: v.len(),
            }
        })?;
        Ok(Self { key, sig })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &hex::encode(self.key)[..8])
    }
}

// Serialized as the hex rendering so the same form is canonical in both the
// binary and text codecs.
impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Signature::from_hex(&text).map_err(D::Error::custom)
    }
}
