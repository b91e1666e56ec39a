//! # Node Runtime Loop
//!
//! The `ConsensusLoop` is the heartbeat of a node. It owns the node's
//! [`ConsensusEngine`] and drives it against a [`Transport`].
//!
//! ## How it works
//!
//! Each cycle:
//!
//! 1. **Proposing**: pull pending transactions. If there are any, propose a
//!    block from all of them; if it is admitted, adopt it and broadcast it.
//! 2. **Ingesting**: admit every block peers broadcast since last cycle, in
//!    arrival order, then run fork choice against every peer's published
//!    chain.
//! 3. **Publishing**: advertise the (possibly new) local chain.
//!
//! A cycle with no pending transactions is **idle**. Ingestion and
//! publishing still run, then the loop sleeps for `idle_backoff_ms`.
//!
//! ```text
//! Idle ──pending──▶ Proposing ──▶ Ingesting ──▶ Publishing ──▶ Idle
//!   └──────────────── nothing pending ──────▶ Ingesting ...
//! ```
//!
//! ## Shutdown
//!
//! The loop monitors a `tokio::sync::watch` channel. When the sender drops or
//! sends `true`, the loop exits after finishing its current cycle and returns
//! a [`LoopSummary`]. The backoff sleep is the only suspension point and it
//! wakes early on shutdown.
//!
//! ## Events
//!
//! Hand the loop a `tokio::sync::broadcast::Sender<NodeEvent>` and it reports
//! what it does. Lagging or absent receivers never slow the loop down.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use super::consensus::{AdmissionError, ConsensusEngine, ForkChoice, ProposalOutcome};
use super::transport::{NodeId, Transport};
use crate::config::DEFAULT_IDLE_BACKOFF_MS;
use crate::storage::{Block, Chain};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for the runtime loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusLoopConfig {
    /// Sleep after an idle cycle, in milliseconds. Too low spins on an empty
    /// mempool; too high delays fork resolution on a quiet network.
    pub idle_backoff_ms: u64,
}

impl Default for ConsensusLoopConfig {
    fn default() -> Self {
        Self {
            idle_backoff_ms: DEFAULT_IDLE_BACKOFF_MS,
        }
    }
}

impl ConsensusLoopConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

// ---------------------------------------------------------------------------
// State, events, reports
// ---------------------------------------------------------------------------

/// Where the loop is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Idle,
    Proposing,
    Ingesting,
    Publishing,
}

/// Something a node did, for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NodeEvent {
    BlockProposed {
        node: NodeId,
        height: usize,
        hash: String,
        txs: usize,
    },
    BlockAdmitted {
        node: NodeId,
        height: usize,
    },
    ProposalDropped {
        node: NodeId,
        reason: String,
    },
    ChainReplaced {
        node: NodeId,
        from_len: usize,
        to_len: usize,
    },
    ChainPublished {
        node: NodeId,
        len: usize,
    },
    CycleCompleted {
        node: NodeId,
        idle: bool,
    },
}

impl NodeEvent {
    pub fn node(&self) -> NodeId {
        match self {
            NodeEvent::BlockProposed { node, .. }
            | NodeEvent::BlockAdmitted { node, .. }
            | NodeEvent::ProposalDropped { node, .. }
            | NodeEvent::ChainReplaced { node, .. }
            | NodeEvent::ChainPublished { node, .. }
            | NodeEvent::CycleCompleted { node, .. } => *node,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// No pending transactions this cycle.
    pub idle: bool,
    /// Block proposed, admitted and broadcast.
    pub adopted: Option<Block>,
    /// Why a proposed block was dropped.
    pub dropped: Option<AdmissionError>,
    pub blocks_admitted: usize,
    pub blocks_rejected: usize,
    pub fork_choice: ForkChoice,
    /// Length of the chain published at the end of the cycle.
    pub chain_len: usize,
}

/// Totals over a loop's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSummary {
    pub cycles: u64,
    pub idle_cycles: u64,
    pub blocks_proposed: u64,
    pub proposals_dropped: u64,
    pub blocks_admitted: u64,
    pub blocks_rejected: u64,
    pub chain_replacements: u64,
    pub final_len: usize,
}

impl LoopSummary {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.idle_cycles += report.idle as u64;
        self.blocks_proposed += report.adopted.is_some() as u64;
        self.proposals_dropped += report.dropped.is_some() as u64;
        self.blocks_admitted += report.blocks_admitted as u64;
        self.blocks_rejected += report.blocks_rejected as u64;
        self.chain_replacements += report.fork_choice.replaced() as u64;
        self.final_len = report.chain_len;
    }
}

// ---------------------------------------------------------------------------
// ConsensusLoop
// ---------------------------------------------------------------------------

/// Drives one node's engine against a shared transport.
pub struct ConsensusLoop<T: Transport + ?Sized> {
    engine: ConsensusEngine,
    transport: Arc<T>,
    config: ConsensusLoopConfig,
    state: NodeState,
    events: Option<broadcast::Sender<NodeEvent>>,
    summary: LoopSummary,
}

impl<T: Transport + ?Sized> ConsensusLoop<T> {
    /// Does not start the loop. Call [`run`](Self::run) or drive it by hand
    /// with [`run_cycle`](Self::run_cycle).
    pub fn new(engine: ConsensusEngine, transport: Arc<T>, config: ConsensusLoopConfig) -> Self {
        Self {
            engine,
            transport,
            config,
            state: NodeState::Idle,
            events: None,
            summary: LoopSummary::default(),
        }
    }

    /// Report [`NodeEvent`]s on `sender`.
    pub fn with_events(mut self, sender: broadcast::Sender<NodeEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn node_id(&self) -> NodeId {
        self.engine.node_id()
    }

    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    pub fn chain(&self) -> &Chain {
        self.engine.chain()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn config(&self) -> &ConsensusLoopConfig {
        &self.config
    }

    pub fn summary(&self) -> &LoopSummary {
        &self.summary
    }

    /// Run cycles until shutdown. See the module docs for the signal
    /// semantics.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> LoopSummary {
        let node = self.node_id();
        info!(node = %node.short(), backoff_ms = self.config.idle_backoff_ms, "runtime loop starting");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_cycle();

            if report.idle {
                // Sleep with shutdown awareness; wake up early if shutdown fires.
                tokio::select! {
                    _ = tokio::time::sleep(self.config.idle_backoff()) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            } else {
                // Busy cycles still let sibling node tasks run.
                tokio::task::yield_now().await;
            }
        }

        info!(
            node = %node.short(),
            cycles = self.summary.cycles,
            len = self.summary.final_len,
            "runtime loop stopped"
        );
        self.summary.clone()
    }

    /// One full cycle: propose, ingest, resolve, publish. Never blocks.
    pub fn run_cycle(&mut self) -> CycleReport {
        let node = self.node_id();

        // Step 1: propose from whatever is pending.
        let pending = self.transport.get_pending_transactions(node);
        let idle = pending.is_empty();
        let mut adopted = None;
        let mut dropped = None;

        if !idle {
            self.state = NodeState::Proposing;
            match self.engine.propose_and_admit(pending) {
                ProposalOutcome::Adopted(block) => {
                    self.transport.broadcast_block(&block, node);
                    self.emit(NodeEvent::BlockProposed {
                        node,
                        height: self.engine.height(),
                        hash: block.hash_hex(),
                        txs: block.tx_count(),
                    });
                    adopted = Some(block);
                }
                ProposalOutcome::Dropped(e) => {
                    self.emit(NodeEvent::ProposalDropped {
                        node,
                        reason: e.to_string(),
                    });
                    dropped = Some(e);
                }
                ProposalOutcome::Empty => {}
            }
        }

        // Step 2: ingest peer blocks, then peer chains.
        self.state = NodeState::Ingesting;
        let mut blocks_admitted = 0;
        let mut blocks_rejected = 0;
        for block in self.transport.get_incoming_blocks(node) {
            match self.engine.ingest_block(&block) {
                Ok(()) => {
                    blocks_admitted += 1;
                    self.emit(NodeEvent::BlockAdmitted {
                        node,
                        height: self.engine.height(),
                    });
                }
                Err(e) => {
                    blocks_rejected += 1;
                    debug!(node = %node.short(), error = %e, "peer block rejected");
                }
            }
        }

        let peers = self.transport.get_peer_chains(node);
        let fork_choice = self.engine.resolve(&peers);
        if let ForkChoice::Replaced { from_len, to_len } = fork_choice {
            self.emit(NodeEvent::ChainReplaced {
                node,
                from_len,
                to_len,
            });
        }

        // Step 3: advertise.
        self.state = NodeState::Publishing;
        let chain_len = self.engine.chain().len();
        self.transport.publish_chain(self.engine.chain(), node);
        self.emit(NodeEvent::ChainPublished {
            node,
            len: chain_len,
        });

        self.state = NodeState::Idle;
        self.emit(NodeEvent::CycleCompleted { node, idle });

        let report = CycleReport {
            idle,
            adopted,
            dropped,
            blocks_admitted,
            blocks_rejected,
            fork_choice,
            chain_len,
        };
        self.summary.record(&report);
        report
    }

    fn emit(&self, event: NodeEvent) {
        if let Some(sender) = &self.events {
            // No receivers is fine.
            let _ = sender.send(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::consensus::AdmissionPolicy;
    use crate::network::memory::InMemoryNetwork;
    use crate::transaction::{Transaction, Value, Wallet};

    // -----------------------------------------------------------------------
    // Test Helpers
    // -----------------------------------------------------------------------

    fn spawn_node(net: &Arc<InMemoryNetwork>) -> ConsensusLoop<InMemoryNetwork> {
        spawn_node_with(net, AdmissionPolicy::default())
    }

    fn spawn_node_with(
        net: &Arc<InMemoryNetwork>,
        policy: AdmissionPolicy,
    ) -> ConsensusLoop<InMemoryNetwork> {
        let id = NodeId::new();
        net.register(id);
        ConsensusLoop::new(
            ConsensusEngine::new(id, policy),
            Arc::clone(net),
            ConsensusLoopConfig::default(),
        )
    }

    fn tx(n: u64) -> Transaction {
        Transaction::new("s", "r", Value::Amount(n))
    }

    // -----------------------------------------------------------------------
    // 1. Single cycles
    // -----------------------------------------------------------------------

    #[test]
    fn idle_cycle_still_publishes() {
        let net = Arc::new(InMemoryNetwork::new());
        let mut node = spawn_node(&net);

        let report = node.run_cycle();
        assert!(report.idle);
        assert!(report.adopted.is_none());
        assert_eq!(report.chain_len, 1);
        assert_eq!(node.state(), NodeState::Idle);
        assert_eq!(net.published_chain(node.node_id()).map(|c| c.len()), Some(1));
    }

    #[test]
    fn proposal_is_broadcast_and_ingested_by_peer() {
        let net = Arc::new(InMemoryNetwork::new());
        let mut a = spawn_node(&net);
        let mut b = spawn_node(&net);

        net.submit_transaction_to(a.node_id(), tx(1));
        let report = a.run_cycle();
        assert!(!report.idle);
        assert!(report.adopted.is_some());
        assert_eq!(a.chain().len(), 2);

        let report = b.run_cycle();
        assert!(report.idle);
        assert_eq!(report.blocks_admitted, 1);
        assert!(b.chain().same_content(a.chain()));
    }

    #[test]
    fn concurrent_proposals_converge_on_longest() {
        let net = Arc::new(InMemoryNetwork::new());
        let mut a = spawn_node(&net);
        let mut b = spawn_node(&net);

        // Both propose before hearing from each other.
        net.submit_transaction_to(a.node_id(), tx(1));
        net.submit_transaction_to(b.node_id(), tx(2));
        a.run_cycle();
        let report = b.run_cycle();
        // A's block no longer links onto B's fresh tip.
        assert_eq!(report.blocks_rejected, 1);
        assert_eq!(a.chain().len(), 2);
        assert_eq!(b.chain().len(), 2);
        assert!(!a.chain().same_content(b.chain()));

        // A pulls ahead; B's block fails on A, then B adopts A's longer chain.
        net.submit_transaction_to(a.node_id(), tx(3));
        let report = a.run_cycle();
        assert_eq!(report.blocks_rejected, 1);
        assert_eq!(a.chain().len(), 3);

        let report = b.run_cycle();
        assert!(report.fork_choice.replaced());
        assert!(b.chain().same_content(a.chain()));
        assert_eq!(b.summary().chain_replacements, 1);
    }

    #[test]
    fn incoming_blocks_are_admitted_in_order() {
        let net = Arc::new(InMemoryNetwork::new());
        let (events, mut rx) = broadcast::channel(32);
        let mut node = spawn_node(&net).with_events(events);
        let stranger = NodeId::new();

        let mut chain = Chain::genesis();
        let mut blocks = Vec::new();
        for n in 1..=3 {
            let block = Block::with_timestamp(n, vec![tx(n)], chain.tip_hash());
            chain = chain.extended(block.clone());
            blocks.push(block);
        }
        // The second copy of the first block no longer links once the first
        // is in.
        blocks.insert(1, blocks[0].clone());
        for block in &blocks {
            net.broadcast_block(block, stranger);
        }

        let report = node.run_cycle();
        assert_eq!(report.blocks_admitted, 3);
        assert_eq!(report.blocks_rejected, 1);
        assert!(node.chain().same_content(&chain));
        assert_eq!(net.queue_depth(node.node_id()), (0, 0));

        let mut admitted_heights = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let NodeEvent::BlockAdmitted { height, .. } = event {
                admitted_heights.push(height);
            }
        }
        assert_eq!(admitted_heights, vec![1, 2, 3]);
    }

    #[test]
    fn dropped_proposal_is_never_broadcast() {
        let net = Arc::new(InMemoryNetwork::new());
        let mut strict = spawn_node_with(&net, AdmissionPolicy::strict());
        let peer = spawn_node(&net);

        net.submit_transaction_to(strict.node_id(), tx(1));
        let report = strict.run_cycle();
        assert!(report.dropped.is_some());
        assert!(report.adopted.is_none());
        assert_eq!(strict.chain().len(), 1);
        assert_eq!(net.queue_depth(peer.node_id()).1, 0);
    }

    #[test]
    fn strict_node_drops_unsigned_and_accepts_signed() {
        let net = Arc::new(InMemoryNetwork::new());
        let mut node = spawn_node_with(&net, AdmissionPolicy::strict());

        net.submit_transaction(tx(1));
        let report = node.run_cycle();
        assert!(report.dropped.is_some());
        assert_eq!(node.chain().len(), 1);

        Wallet::generate().send(net.as_ref(), "bob", Value::Amount(2));
        let report = node.run_cycle();
        assert!(report.adopted.is_some());
        assert_eq!(node.summary().proposals_dropped, 1);
        assert_eq!(node.summary().blocks_proposed, 1);
    }

    #[test]
    fn events_are_reported() {
        let net = Arc::new(InMemoryNetwork::new());
        let (sender, mut rx) = broadcast::channel(16);
        let mut node = spawn_node(&net).with_events(sender);

        net.submit_transaction(tx(1));
        node.run_cycle();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.node(), node.node_id());
            seen.push(event);
        }
        assert!(matches!(seen[0], NodeEvent::BlockProposed { height: 1, txs: 1, .. }));
        assert!(matches!(seen[1], NodeEvent::ChainPublished { len: 2, .. }));
        assert!(matches!(seen[2], NodeEvent::CycleCompleted { idle: false, .. }));
    }

    #[test]
    fn event_json_is_tagged() {
        let node = NodeId::new();
        let json = serde_json::to_value(NodeEvent::ChainPublished { node, len: 3 }).unwrap();
        assert_eq!(json["event"], "chain_published");
        assert_eq!(json["len"], 3);
    }

    // -----------------------------------------------------------------------
    // 2. Async loop
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn run_backs_off_when_idle_and_stops_on_signal() {
        let net = Arc::new(InMemoryNetwork::new());
        let mut node = spawn_node(&net);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { node.run(stop_rx).await });

        // Cycles at t = 0, 1s, 2s, 3s with a paused clock.
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        stop_tx.send(true).unwrap();

        let summary = handle.await.unwrap();
        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.idle_cycles, 4);
        assert_eq!(summary.final_len, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_exits_when_sender_dropped() {
        let net = Arc::new(InMemoryNetwork::new());
        let mut node = spawn_node(&net);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { node.run(stop_rx).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(stop_tx);

        let summary = handle.await.unwrap();
        assert_eq!(summary.cycles, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn nodes_on_tasks_converge() {
        let net = Arc::new(InMemoryNetwork::new());
        let nodes: Vec<_> = (0..3).map(|_| spawn_node(&net)).collect();
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.node_id()).collect();
        let (stop_tx, stop_rx) = watch::channel(false);

        let handles: Vec<_> = nodes
            .into_iter()
            .map(|mut n| {
                let rx = stop_rx.clone();
                tokio::spawn(async move { n.run(rx).await })
            })
            .collect();

        // Loops wake on whole seconds. Submitting on the half second, two
        // seconds apart, lets every node hear each block before the next
        // proposer runs.
        tokio::time::sleep(Duration::from_millis(500)).await;
        for i in 0..5 {
            net.submit_transaction_to(ids[i % ids.len()], tx(i as u64));
            tokio::time::sleep(Duration::from_millis(2_000)).await;
        }
        // Quiet period: everyone idles, ingests and resolves.
        tokio::time::sleep(Duration::from_secs(5)).await;
        stop_tx.send(true).unwrap();

        for h in handles {
            h.await.unwrap();
        }

        let chains: Vec<Chain> = ids
            .iter()
            .map(|id| net.published_chain(*id).unwrap())
            .collect();
        assert_eq!(chains[0].len(), 6);
        assert!(chains.iter().all(|c| c.same_content(&chains[0])));
        assert!(chains.iter().all(Chain::is_valid));
    }
}
