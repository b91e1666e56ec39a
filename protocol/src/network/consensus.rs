//! # Longest-Valid-Chain Consensus
//!
//! Each node holds one chain and three ways to change it: adopt a block it
//! proposed, admit a block a peer broadcast, or swap to a longer valid chain
//! a peer published. All three funnel into [`ConsensusEngine::replace_chain`],
//! the only write to engine state.
//!
//! ## Rules
//!
//! 1. **Proposal**: every pending transaction goes into one block linked to
//!    the tip. No pending transactions, no block.
//! 2. **Admission**: a block is admitted when the chain extended by it
//!    validates end to end. Under a strict [`AdmissionPolicy`] every
//!    transaction in it must also be authorized by its sender.
//! 3. **Fork choice**: among the local chain and every peer chain that
//!    validates and shares the local genesis, the longest wins. Ties keep
//!    what is already held.
//!
//! ```text
//!          pending txs ──propose──▶ candidate ──admit──┐
//!          peer blocks ───────────────────────admit──┤
//!          peer chains ──────────────────resolve────┤
//!                                                   ▼
//!                                           replace_chain
//! ```
//!
//! There is no proof-of-work or stake gate. Anyone can propose, and the
//! length rule alone arbitrates.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::transport::NodeId;
use crate::storage::{Block, Chain, ChainError};
use crate::transaction::{verify_transaction, Transaction, TransactionError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What a block must satisfy beyond linkage to be admitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionPolicy {
    /// Reject blocks containing any transaction its sender did not sign.
    /// Off by default: linkage is the only admission rule unless asked.
    pub require_signed_transactions: bool,
}

impl AdmissionPolicy {
    pub fn strict() -> Self {
        Self {
            require_signed_transactions: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes & errors
// ---------------------------------------------------------------------------

/// Why a candidate block was not admitted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("candidate does not extend the chain: {0}")]
    Linkage(#[from] ChainError),

    #[error("transaction {index} ({tx_id}) is not authorized: {source}")]
    Signature {
        index: usize,
        tx_id: String,
        #[source]
        source: TransactionError,
    },
}

/// Result of one proposal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// Nothing pending. Not an error.
    Empty,
    /// A candidate was built but failed admission. Its transactions are gone.
    Dropped(AdmissionError),
    /// Admitted and now the local tip. Broadcast it.
    Adopted(Block),
}

/// Result of fork resolution, by content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForkChoice {
    Kept,
    Replaced { from_len: usize, to_len: usize },
}

impl ForkChoice {
    pub fn replaced(&self) -> bool {
        matches!(self, ForkChoice::Replaced { .. })
    }
}

// ---------------------------------------------------------------------------
// Pure rules
// ---------------------------------------------------------------------------

/// Assemble a candidate block holding all of `pending`, linked to the tip of
/// `chain` and timestamped now. `None` when nothing is pending.
pub fn propose(pending: Vec<Transaction>, chain: &Chain) -> Option<Block> {
    if pending.is_empty() {
        return None;
    }
    Some(Block::new(chain.tip_hash(), pending))
}

/// Admission under `policy`: trial extension, full validation, then (if the
/// policy asks) sender authorization for every transaction.
pub fn admit(
    policy: &AdmissionPolicy,
    chain: &Chain,
    candidate: &Block,
) -> Result<Chain, AdmissionError> {
    let extended = chain.try_extend(candidate)?;

    if policy.require_signed_transactions {
        for (index, tx) in candidate.transactions().iter().enumerate() {
            verify_transaction(tx).map_err(|source| AdmissionError::Signature {
                index,
                tx_id: tx.short_id(),
                source,
            })?;
        }
    }

    Ok(extended)
}

/// Longest valid chain among `local` and `peers`.
///
/// Peers that fail validation or are rooted at a different genesis are
/// skipped. A peer must be strictly longer than the best so far to win, so
/// ties keep `local` and, among equally long peers, the first one seen.
/// `local` itself is trusted: it only ever grew through admission.
pub fn resolve(local: &Chain, peers: &[Chain]) -> Chain {
    let mut best = local;
    for peer in peers {
        if peer.len() <= best.len() {
            continue;
        }
        if !peer.shares_root(local) {
            debug!(len = peer.len(), "ignoring peer chain with foreign genesis");
            continue;
        }
        if let Err(e) = peer.validate() {
            debug!(len = peer.len(), error = %e, "ignoring invalid peer chain");
            continue;
        }
        best = peer;
    }
    best.clone()
}

// ---------------------------------------------------------------------------
// ConsensusEngine
// ---------------------------------------------------------------------------

/// One node's view of the ledger.
///
/// Owned exclusively by the node's runtime loop; every mutation takes
/// `&mut self`.
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    node_id: NodeId,
    chain: Chain,
    policy: AdmissionPolicy,
}

impl ConsensusEngine {
    /// A fresh node holding `[genesis]`.
    pub fn new(node_id: NodeId, policy: AdmissionPolicy) -> Self {
        Self::with_chain(node_id, Chain::genesis(), policy)
    }

    /// Start from an existing chain. It is taken as-is.
    pub fn with_chain(node_id: NodeId, chain: Chain, policy: AdmissionPolicy) -> Self {
        Self {
            node_id,
            chain,
            policy,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Cheap owned copy of the current chain (blocks are shared).
    pub fn snapshot(&self) -> Chain {
        self.chain.clone()
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn height(&self) -> usize {
        self.chain.height()
    }

    /// Admission of `candidate` against `chain` under this engine's policy.
    /// Pure: the engine's own chain is not touched.
    pub fn admit(&self, chain: &Chain, candidate: &Block) -> Result<Chain, AdmissionError> {
        admit(&self.policy, chain, candidate)
    }

    /// Propose a block from `pending` and adopt it if it is admissible.
    pub fn propose_and_admit(&mut self, pending: Vec<Transaction>) -> ProposalOutcome {
        let Some(candidate) = propose(pending, &self.chain) else {
            return ProposalOutcome::Empty;
        };

        match self.admit(&self.chain, &candidate) {
            Ok(next) => {
                self.replace_chain(next);
                let hash = candidate.hash_hex();
                info!(
                    node = %self.node_id.short(),
                    height = self.chain.height(),
                    txs = candidate.tx_count(),
                    hash = %&hash[..12],
                    "proposed block adopted"
                );
                ProposalOutcome::Adopted(candidate)
            }
            Err(e) => {
                warn!(
                    node = %self.node_id.short(),
                    txs = candidate.tx_count(),
                    error = %e,
                    "proposed block dropped"
                );
                ProposalOutcome::Dropped(e)
            }
        }
    }

    /// Admit one peer block. On success the local chain advances by one.
    pub fn ingest_block(&mut self, block: &Block) -> Result<(), AdmissionError> {
        let next = self.admit(&self.chain, block)?;
        self.replace_chain(next);
        debug!(
            node = %self.node_id.short(),
            height = self.chain.height(),
            "peer block admitted"
        );
        Ok(())
    }

    /// Apply the fork-choice rule against `peers`.
    pub fn resolve(&mut self, peers: &[Chain]) -> ForkChoice {
        let from_len = self.chain.len();
        let winner = resolve(&self.chain, peers);
        if self.replace_chain(winner) {
            info!(
                node = %self.node_id.short(),
                from_len,
                to_len = self.chain.len(),
                "switched to longer peer chain"
            );
            ForkChoice::Replaced {
                from_len,
                to_len: self.chain.len(),
            }
        } else {
            ForkChoice::Kept
        }
    }

    /// The single write path. Returns whether the held chain's content
    /// changed.
    fn replace_chain(&mut self, next: Chain) -> bool {
        if self.chain.same_content(&next) {
            return false;
        }
        self.chain = next;
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
