//! # nearsift-core
//!
//! Core building blocks shared by the nearsift crates.
//!
//! Provides:
//! - Content fingerprinting (SHA-256, BLAKE3) and seeded xxh3 hashing
//! - Record and partition types carried through the dedup stages
//! - The shared error type

pub mod error;
pub mod hashing;
pub mod types;

pub use error::{NearsiftError, Result};
pub use hashing::{fingerprint, Blake3Hasher, Fingerprint, HashFunction, Sha256Hasher};
pub use types::{Partition, Record};
