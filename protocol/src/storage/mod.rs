//! # Storage Module
//!
//! The ledger's data structures: blocks and the chains built from them.
//! Everything here lives in memory. There is no persistence layer; a node
//! that restarts resyncs from its peers' published chains.
//!
//! ## Architecture
//!
//! ```text
//! block.rs  - Block structure, genesis block, canonical encoding, hashing
//! chain.rs  - Immutable chain value, linkage validation, trial extension
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! Transaction → Block → Chain ──validate──▶ accepted / ignored
//! ```
//!
//! ## Design Decisions
//!
//! 1. **SHA-256 for block hashes.** Linkage is the one thing every node must
//!    compute identically, so it gets the most boring hash available.
//!
//! 2. **JSON is the canonical encoding.** Compact, fixed field order, hashes
//!    as hex. Hashing and the wire share one definition of "the bytes of a
//!    block".
//!
//! 3. **Chains are values.** Blocks are shared behind `Arc`; extending a
//!    chain never touches the one it came from.

pub mod block;
pub mod chain;

pub use block::Block;
pub use chain::{Chain, ChainError};
