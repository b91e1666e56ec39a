//! # Network Module
//!
//! Consensus and the node runtime, plus the transport seam that connects
//! nodes to each other.
//!
//! ## Architecture
//!
//! ```text
//! consensus.rs       - Proposal, admission and longest-valid-chain fork choice
//! consensus_loop.rs  - Per-node runtime loop: propose, ingest, publish, back off
//! transport.rs       - NodeId and the Transport trait
//! memory.rs          - InMemoryNetwork, the in-process Transport
//! ```
//!
//! ## Design Decisions
//!
//! - Each node is one sequential loop that exclusively owns its engine. No
//!   locks around consensus state; nodes only share the transport.
//! - The transport is a trait so the core never depends on sockets. The
//!   in-memory implementation is what tests and the simulator run on.
//! - `InMemoryNetwork` keeps mailboxes in a `DashMap` and published chains
//!   behind a `parking_lot::RwLock`. Both are touched briefly and never across
//!   an `.await`.

pub mod consensus;
pub mod consensus_loop;
pub mod memory;
pub mod transport;

pub use consensus::{
    admit, propose, resolve, AdmissionError, AdmissionPolicy, ConsensusEngine, ForkChoice,
    ProposalOutcome,
};
pub use consensus_loop::{
    ConsensusLoop, ConsensusLoopConfig, CycleReport, LoopSummary, NodeEvent, NodeState,
};
pub use memory::InMemoryNetwork;
pub use transport::{NodeId, Transport};
