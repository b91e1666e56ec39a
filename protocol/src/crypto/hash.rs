//! # Hashing Utilities
//!
//! Two hash functions, two jobs:
//!
//! - **SHA-256** hashes blocks. Block hashes are what chain linkage compares,
//!   so this is the function every node must agree on.
//! - **BLAKE3** derives transaction IDs. IDs are labels for logs and APIs;
//!   nothing in consensus depends on them.
//!
//! Hashes travel as lowercase hex in every text encoding. The [`hex_hash`]
//! serde adapter handles that for `[u8; 32]` fields.

use sha2::{Digest, Sha256};

/// A 32-byte digest.
pub type Hash = [u8; 32];

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use longchain_protocol::crypto::sha256_array;
///
/// let hash = sha256_array(b"longchain");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256_array(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Parse a 64-character hex string into a [`Hash`].
pub fn hash_from_hex(s: &str) -> Result<Hash, hex::FromHexError> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(s, &mut out)?;
    Ok(out)
}

/// Serde adapter: serialize a `[u8; 32]` as a lowercase hex string.
///
/// Use with `#[serde(with = "crate::crypto::hash::hex_hash")]`.
pub mod hex_hash {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{hash_from_hex, Hash};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        hash_from_hex(&s).map_err(serde::de::Error::custom)
    }
}
