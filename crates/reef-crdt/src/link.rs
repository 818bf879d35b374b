use std::fmt;

use serde::{Deserialize, Serialize};

use reef_crypto::Signature;

/// Opaque content address of an immutable blob in the peer store.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(text: &str) -> Self {
        Address::new(text)
    }
}

/// A content address optionally bearing signatures over the address text.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    address: Address,
    #[serde(default)]
    signatures: Vec<Signature>,
}

impl Link {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            signatures: Vec::new(),
        }
    }

    pub fn signed(address: Address, mut signatures: Vec<Signature>) -> Self {
        signatures.sort();
        signatures.dedup();
        Self {
            address,
            signatures,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Returns `true` if at least one signature verifies over the address.
    pub fn has_valid_signature(&self) -> bool {
        self.signatures
            .iter()
            .any(|sig| sig.is_valid_for(self.address.as_str().as_bytes()))
    }

    /// Merge the signature sets of two links to the same address.
    pub fn merge(&self, other: &Link) -> Link {
        debug_assert_eq!(self.address, other.address);
        let mut signatures = self.signatures.clone();
        signatures.extend(other.signatures.iter().cloned());
        signatures.sort();
        signatures.dedup();
        Link {
            address: self.address.clone(),
            signatures,
        }
    }
}
