//! # Block Structure
//!
//! A block is an ordered batch of transactions plus a link to its
//! predecessor.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  timestamp: u64          (Unix ms)          │
//! │  transactions: Vec<Transaction>             │
//! │  previous_hash: [u8; 32] (hex on the wire)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! `hash = SHA-256(canonical JSON of the three fields above)`, in that field
//! order, compact, hashes as lowercase hex. The hash is derived on demand and
//! never stored, so it cannot go stale. There are no mutators either: once a
//! block exists its hash is fixed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::config::{GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP_MS};
use crate::crypto::hash::{sha256_array, Hash};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A batch of transactions linked to the block before it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Creation time, Unix milliseconds.
    timestamp: u64,
    transactions: Vec<Transaction>,
    /// Hash of the predecessor. [`GENESIS_PREVIOUS_HASH`] for genesis.
    #[serde(with = "crate::crypto::hash::hex_hash")]
    previous_hash: Hash,
}

impl Block {
    /// The network-wide genesis block. Identical on every call and every node.
    pub fn genesis() -> Self {
        Self::with_timestamp(GENESIS_TIMESTAMP_MS, Vec::new(), GENESIS_PREVIOUS_HASH)
    }

    /// A block timestamped now.
    pub fn new(previous_hash: Hash, transactions: Vec<Transaction>) -> Self {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        Self::with_timestamp(now, transactions, previous_hash)
    }

    /// A block with an explicit timestamp. Tests and replays use this to get
    /// reproducible hashes.
    pub fn with_timestamp(
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: Hash,
    ) -> Self {
        Self {
            timestamp,
            transactions,
            previous_hash,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> &Hash {
        &self.previous_hash
    }

    pub fn previous_hash_hex(&self) -> String {
        hex::encode(self.previous_hash)
    }

    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// SHA-256 over the canonical encoding.
    pub fn hash(&self) -> Hash {
        sha256_array(self.to_canonical_json().as_bytes())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    /// Whether this block extends `parent`, i.e. records its hash.
    pub fn links_to(&self, parent: &Block) -> bool {
        self.previous_hash == parent.hash()
    }

    /// Canonical text encoding, byte-identical to `serde_json::to_string`.
    pub fn to_canonical_json(&self) -> String {
        let mut out = String::with_capacity(96 + self.transactions.len() * 300);
        let _ = write!(out, "{{\"timestamp\":{},\"transactions\":[", self.timestamp);
        for (i, tx) in self.transactions.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            tx.write_canonical(&mut out);
        }
        let _ = write!(
            out,
            "],\"previous_hash\":\"{}\"}}",
            hex::encode(self.previous_hash)
        );
        out
    }

    pub fn from_canonical_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;
    use crate::transaction::{sign_transaction, Value};

    fn sample_txs() -> Vec<Transaction> {
        let kp = Keypair::from_seed(&[1u8; 32]);
        vec![
            sign_transaction(
                Transaction::new(kp.public_key().to_hex(), "bob", Value::Amount(10)),
                &kp,
            ),
            Transaction::new("carol", "dave", Value::memo("reservation")),
        ]
    }

    #[test]
    fn genesis_is_fixed() {
        let g = Block::genesis();
        assert_eq!(g, Block::genesis());
        assert_eq!(g.hash(), Block::genesis().hash());
        assert_eq!(g.timestamp(), 0);
        assert!(g.transactions().is_empty());
        assert_eq!(g.previous_hash(), &[0u8; 32]);
    }

    #[test]
    fn genesis_canonical_form() {
        assert_eq!(
            Block::genesis().to_canonical_json(),
            format!(
                r#"{{"timestamp":0,"transactions":[],"previous_hash":"{}"}}"#,
                "0".repeat(64)
            )
        );
    }

    #[test]
    fn canonical_json_matches_serde() {
        let b = Block::with_timestamp(1_700_000_000_000, sample_txs(), [7u8; 32]);
        assert_eq!(b.to_canonical_json(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn canonical_roundtrip_keeps_hash() {
        let b = Block::with_timestamp(42, sample_txs(), Block::genesis().hash());
        let back = Block::from_canonical_json(&b.to_canonical_json()).unwrap();
        assert_eq!(back, b);
        assert_eq!(back.hash(), b.hash());
    }

    #[test]
    fn hash_covers_every_field() {
        let base = Block::with_timestamp(5, sample_txs(), [1u8; 32]);
        let other_time = Block::with_timestamp(6, sample_txs(), [1u8; 32]);
        let other_prev = Block::with_timestamp(5, sample_txs(), [2u8; 32]);
        let mut fewer = sample_txs();
        fewer.pop();
        let other_txs = Block::with_timestamp(5, fewer, [1u8; 32]);

        assert_ne!(base.hash(), other_time.hash());
        assert_ne!(base.hash(), other_prev.hash());
        assert_ne!(base.hash(), other_txs.hash());
    }

    #[test]
    fn links_to_parent() {
        let g = Block::genesis();
        let child = Block::new(g.hash(), vec![]);
        assert!(child.links_to(&g));
        assert!(!g.links_to(&child));
    }

    #[test]
    fn malformed_previous_hash_is_rejected() {
        let json = r#"{"timestamp":1,"transactions":[],"previous_hash":"abc"}"#;
        assert!(Block::from_canonical_json(json).is_err());
    }
}
