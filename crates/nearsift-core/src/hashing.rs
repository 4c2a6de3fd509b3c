//! Hashing functions.
//!
//! Fingerprints are 256-bit digests over the UTF-8 bytes of normalized text.
//! Byte-identical inputs always produce identical fingerprints.

use crate::error::{NearsiftError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 chars).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-char hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| NearsiftError::InvalidFormat(format!("bad fingerprint hex: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            NearsiftError::InvalidFormat(format!("fingerprint must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Trait for content hash functions producing 256-bit fingerprints.
pub trait HashFunction: Send + Sync {
    /// Hash data into a fingerprint.
    fn fingerprint(&self, data: &[u8]) -> Fingerprint;

    /// Hash data and return hex string.
    fn hash_hex(&self, data: &[u8]) -> String {
        self.fingerprint(data).to_hex()
    }

    /// Short identifier, recorded in reports.
    fn name(&self) -> &'static str;
}

/// SHA-256 hasher. The default fingerprint function.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    /// Create a new SHA-256 hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HashFunction for Sha256Hasher {
    fn fingerprint(&self, data: &[u8]) -> Fingerprint {
        Fingerprint(Sha256::digest(data).into())
    }

    fn name(&self) -> &'static str {
        "sha256"
    }
}

/// Blake3 hasher - cryptographically secure, faster than SHA-256.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Hasher;

impl Blake3Hasher {
    /// Create a new Blake3 hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HashFunction for Blake3Hasher {
    fn fingerprint(&self, data: &[u8]) -> Fingerprint {
        Fingerprint(*blake3::hash(data).as_bytes())
    }

    fn name(&self) -> &'static str {
        "blake3"
    }
}

/// Fingerprint text with the default (SHA-256) hasher.
#[inline]
#[must_use]
pub fn fingerprint(text: &str) -> Fingerprint {
    Sha256Hasher.fingerprint(text.as_bytes())
}

/// Hash with seed, used for feature hashing.
#[inline]
pub fn hash_with_seed(data: &[u8], seed: u64) -> u64 {
    xxhash_rust::xxh3::xxh3_64_with_seed(data, seed)
}
