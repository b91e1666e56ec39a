//! # Cryptographic Primitives
//!
//! Everything security-related flows through here: Ed25519 identities and
//! signatures, and the two hash functions the ledger uses.
//!
//! - **Ed25519** for transaction signatures. A sender's public key *is* its
//!   identity on the ledger.
//! - **SHA-256** for block hashes, the value that chain linkage is built on.
//! - **BLAKE3** for transaction IDs, which only ever label things.
//!
//! All of it is a thin wrapper around audited crates. No hand-rolled math.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, sha256_array, Hash};
pub use keys::{Keypair, PublicKey, Signature};
pub use signatures::{sign, verify};
