//! # Chain
//!
//! A non-empty, ordered sequence of blocks rooted at genesis, and the linkage
//! validator that decides whether such a sequence is a chain at all.
//!
//! ## Linkage
//!
//! For every height `i > 0`: `hash(blocks[i - 1]) == blocks[i].previous_hash`.
//! A genesis-only chain is trivially valid. Linkage says nothing about
//! transaction signatures; admission policy checks those separately.
//!
//! ## Values, not places
//!
//! A [`Chain`] is immutable. "Appending" builds a new chain that shares
//! every existing block with the old one through `Arc`, so cloning is a
//! vector of pointer copies and a rejected extension leaves the original
//! untouched by construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::block::Block;
use crate::crypto::hash::Hash;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// A chain needs at least one block.
    #[error("chain has no blocks")]
    Empty,

    /// `blocks[height].previous_hash` does not match the hash of the block
    /// below it.
    #[error("broken link at height {height}: expected previous hash {expected}, found {found}")]
    Linkage {
        height: usize,
        expected: String,
        found: String,
    },
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Block>", try_from = "Vec<Block>")]
pub struct Chain {
    /// Never empty.
    blocks: Vec<Arc<Block>>,
}

impl Chain {
    /// `[genesis]`.
    pub fn genesis() -> Self {
        Self {
            blocks: vec![Arc::new(Block::genesis())],
        }
    }

    /// Wrap a block list. Only emptiness is rejected: a chain with broken
    /// linkage is still a value (peers send them) and [`Chain::validate`]
    /// is what rules on it.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        if blocks.is_empty() {
            return Err(ChainError::Empty);
        }
        Ok(Self {
            blocks: blocks.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false`. Present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Height of the tip. Genesis is height 0.
    pub fn height(&self) -> usize {
        self.blocks.len() - 1
    }

    /// The last block.
    pub fn tip(&self) -> &Block {
        // Non-empty by construction.
        &self.blocks[self.blocks.len() - 1]
    }

    /// The first block. Genesis on any chain this node would accept.
    pub fn root(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn tip_hash(&self) -> Hash {
        self.tip().hash()
    }

    pub fn get(&self, height: usize) -> Option<&Block> {
        self.blocks.get(height).map(Arc::as_ref)
    }

    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &Block> + ExactSizeIterator {
        self.blocks.iter().map(Arc::as_ref)
    }

    /// Every transaction, oldest block first, in block order.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.blocks().flat_map(|b| b.transactions().iter())
    }

    /// Content equality. Shared blocks compare by pointer, so two chains that
    /// grew from the same value compare in O(len) without hashing.
    pub fn same_content(&self, other: &Chain) -> bool {
        self.blocks.len() == other.blocks.len()
            && self
                .blocks
                .iter()
                .zip(&other.blocks)
                .all(|(a, b)| Arc::ptr_eq(a, b) || a == b)
    }

    /// Whether both chains start from the same root block.
    pub fn shares_root(&self, other: &Chain) -> bool {
        Arc::ptr_eq(&self.blocks[0], &other.blocks[0]) || self.root() == other.root()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check linkage from the tip down to genesis. Reports the broken link
    /// nearest the tip.
    pub fn validate(&self) -> Result<(), ChainError> {
        for height in (1..self.blocks.len()).rev() {
            let expected = self.blocks[height - 1].hash();
            let found = self.blocks[height].previous_hash();
            if &expected != found {
                return Err(ChainError::Linkage {
                    height,
                    expected: hex::encode(expected),
                    found: hex::encode(found),
                });
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    // -----------------------------------------------------------------------
    // Extension
    // -----------------------------------------------------------------------

    /// `self` plus `block`, unchecked.
    pub fn extended(&self, block: Block) -> Chain {
        let mut blocks = Vec::with_capacity(self.blocks.len() + 1);
        blocks.extend(self.blocks.iter().cloned());
        blocks.push(Arc::new(block));
        Chain { blocks }
    }

    /// Trial-extend with `candidate` and validate the whole extension.
    pub fn try_extend(&self, candidate: &Block) -> Result<Chain, ChainError> {
        let trial = self.extended(candidate.clone());
        trial.validate()?;
        Ok(trial)
    }

    /// [`Chain::try_extend`] without the reason.
    pub fn try_admit(&self, candidate: &Block) -> Option<Chain> {
        self.try_extend(candidate).ok()
    }

    pub fn to_canonical_json(&self) -> String {
        let mut out = String::from("[");
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&block.to_canonical_json());
        }
        out.push(']');
        out
    }

    pub fn from_canonical_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::genesis()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tip = self.tip().hash_hex();
        write!(f, "Chain(len={}, tip={})", self.len(), &tip[..12])
    }
}

impl From<Chain> for Vec<Block> {
    fn from(chain: Chain) -> Self {
        chain
            .blocks
            .into_iter()
            .map(|b| Arc::try_unwrap(b).unwrap_or_else(|shared| (*shared).clone()))
            .collect()
    }
}

impl TryFrom<Vec<Block>> for Chain {
    type Error = ChainError;

    fn try_from(blocks: Vec<Block>) -> Result<Self, Self::Error> {
        Chain::from_blocks(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Transaction, Value};

    fn tx(n: u64) -> Transaction {
        Transaction::new("s", "r", Value::Amount(n))
    }

    /// Genesis plus `n` correctly linked blocks with fixed timestamps.
    fn linked(n: u64) -> Chain {
        (1..=n).fold(Chain::genesis(), |chain, i| {
            let block = Block::with_timestamp(i, vec![tx(i)], chain.tip_hash());
            chain.extended(block)
        })
    }

    #[test]
    fn genesis_only_is_valid() {
        let c = Chain::genesis();
        assert_eq!(c.len(), 1);
        assert_eq!(c.height(), 0);
        assert!(c.is_valid());
        assert!(!c.is_empty());
    }

    #[test]
    fn empty_block_list_is_rejected() {
        assert_eq!(Chain::from_blocks(vec![]).unwrap_err(), ChainError::Empty);
        assert!(serde_json::from_str::<Chain>("[]").is_err());
    }

    #[test]
    fn linked_chain_is_valid() {
        let c = linked(5);
        assert_eq!(c.len(), 6);
        assert!(c.is_valid());
        assert_eq!(c.transactions().count(), 5);
    }

    #[test]
    fn broken_link_reports_height() {
        let good = linked(3);
        let mut blocks: Vec<Block> = good.into();
        blocks[2] = Block::with_timestamp(99, vec![], [9u8; 32]);
        let bad = Chain::from_blocks(blocks).unwrap();

        // Height 3 links to the original block 2, which has been swapped out,
        // and height 2 links to nothing. The walk from the tip hits 3 first.
        match bad.validate() {
            Err(ChainError::Linkage { height, .. }) => assert_eq!(height, 3),
            other => panic!("expected linkage error, got {:?}", other),
        }
    }

    #[test]
    fn try_admit_matching_link() {
        let c = linked(2);
        let candidate = Block::with_timestamp(10, vec![tx(10)], c.tip_hash());
        let next = c.try_admit(&candidate).unwrap();
        assert_eq!(next.len(), c.len() + 1);
        assert_eq!(next.tip(), &candidate);
        // Original untouched.
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn try_admit_mismatched_link() {
        let c = linked(2);
        let before = c.clone();
        let candidate = Block::with_timestamp(10, vec![], [0xEE; 32]);
        assert!(c.try_admit(&candidate).is_none());
        assert!(matches!(
            c.try_extend(&candidate),
            Err(ChainError::Linkage { height: 3, .. })
        ));
        assert!(c.same_content(&before));
    }

    #[test]
    fn tampered_predecessor_scenario() {
        // A block whose previous_hash names a block that differs from the tip
        // by a single transaction is rejected.
        let c = linked(1);
        let forged_tip = Block::with_timestamp(1, vec![tx(2)], Chain::genesis().tip_hash());
        let candidate = Block::with_timestamp(2, vec![], forged_tip.hash());
        assert!(c.try_admit(&candidate).is_none());
    }

    #[test]
    fn same_content_is_not_identity() {
        let a = linked(3);
        let b = linked(3);
        assert!(a.same_content(&b));
        assert_eq!(a, b);
        assert!(!a.same_content(&linked(2)));
    }

    #[test]
    fn extension_shares_blocks() {
        let a = linked(2);
        let b = a.extended(Block::with_timestamp(7, vec![], a.tip_hash()));
        assert!(Arc::ptr_eq(&a.blocks[1], &b.blocks[1]));
    }

    #[test]
    fn serde_roundtrip() {
        let c = linked(3);
        let json = c.to_canonical_json();
        assert_eq!(json, serde_json::to_string(&c).unwrap());
        let back = Chain::from_canonical_json(&json).unwrap();
        assert!(back.same_content(&c));
        assert_eq!(back.tip_hash(), c.tip_hash());
    }

    #[test]
    fn shares_root() {
        let foreign = Chain::from_blocks(vec![Block::with_timestamp(1, vec![], [0u8; 32])])
            .unwrap();
        assert!(linked(2).shares_root(&Chain::genesis()));
        assert!(!foreign.shares_root(&Chain::genesis()));
    }
}
