//! In-process transport.
//!
//! Every registered node gets a mailbox of pending transactions and incoming
//! blocks. Published chains live in one shared map. Delivery is instant and
//! lossless, which makes multi-node scenarios deterministic enough to test.
//!
//! Thread safety: mailboxes sit in a `DashMap` so nodes on different tasks
//! drain their own queues without contending; the published-chain map is
//! read far more than written and sits behind a `parking_lot::RwLock`.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::transport::{NodeId, Transport};
use crate::storage::{Block, Chain};
use crate::transaction::Transaction;

#[derive(Debug, Default)]
struct Mailbox {
    transactions: Vec<Transaction>,
    blocks: Vec<Block>,
}

/// Shared in-memory transport. Wrap it in an `Arc` and hand a clone to each
/// node's loop.
#[derive(Debug, Default)]
pub struct InMemoryNetwork {
    mailboxes: DashMap<NodeId, Mailbox>,
    /// Ordered by id so peer chains come back in a stable order.
    published: RwLock<BTreeMap<NodeId, Chain>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `node` a mailbox. Idempotent.
    pub fn register(&self, node: NodeId) {
        self.mailboxes.entry(node).or_default();
        debug!(node = %node.short(), "node registered on in-memory network");
    }

    /// Every registered node, in id order.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.mailboxes.iter().map(|e| *e.key()).collect();
        nodes.sort();
        nodes
    }

    /// Queue `tx` for one node only. `false` if the node is not registered.
    pub fn submit_transaction_to(&self, node: NodeId, tx: Transaction) -> bool {
        match self.mailboxes.get_mut(&node) {
            Some(mut mailbox) => {
                mailbox.transactions.push(tx);
                true
            }
            None => false,
        }
    }

    /// The chain `node` last published, if any.
    pub fn published_chain(&self, node: NodeId) -> Option<Chain> {
        self.published.read().get(&node).cloned()
    }

    /// Queued transactions and blocks for `node`, without draining.
    pub fn queue_depth(&self, node: NodeId) -> (usize, usize) {
        self.mailboxes
            .get(&node)
            .map(|m| (m.transactions.len(), m.blocks.len()))
            .unwrap_or((0, 0))
    }
}

impl Transport for InMemoryNetwork {
    fn submit_transaction(&self, tx: Transaction) {
        for mut mailbox in self.mailboxes.iter_mut() {
            mailbox.transactions.push(tx.clone());
        }
        trace!(tx = %tx.short_id(), "transaction queued for all nodes");
    }

    fn get_pending_transactions(&self, node: NodeId) -> Vec<Transaction> {
        self.mailboxes
            .get_mut(&node)
            .map(|mut m| std::mem::take(&mut m.transactions))
            .unwrap_or_default()
    }

    fn get_incoming_blocks(&self, node: NodeId) -> Vec<Block> {
        self.mailboxes
            .get_mut(&node)
            .map(|mut m| std::mem::take(&mut m.blocks))
            .unwrap_or_default()
    }

    fn get_peer_chains(&self, node: NodeId) -> Vec<Chain> {
        self.published
            .read()
            .iter()
            .filter(|(id, _)| **id != node)
            .map(|(_, chain)| chain.clone())
            .collect()
    }

    fn broadcast_block(&self, block: &Block, from: NodeId) {
        let mut delivered = 0usize;
        for mut entry in self.mailboxes.iter_mut() {
            if *entry.key() != from {
                entry.value_mut().blocks.push(block.clone());
                delivered += 1;
            }
        }
        trace!(from = %from.short(), peers = delivered, "block broadcast");
    }

    fn publish_chain(&self, chain: &Chain, node: NodeId) {
        self.published.write().insert(node, chain.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Value;

    fn net_with(n: usize) -> (InMemoryNetwork, Vec<NodeId>) {
        let net = InMemoryNetwork::new();
        let ids: Vec<NodeId> = (0..n).map(|_| NodeId::new()).collect();
        for id in &ids {
            net.register(*id);
        }
        (net, ids)
    }

    #[test]
    fn pending_transactions_drain() {
        let (net, ids) = net_with(2);
        net.submit_transaction(Transaction::new("a", "b", Value::Amount(1)));
        assert_eq!(net.get_pending_transactions(ids[0]).len(), 1);
        assert!(net.get_pending_transactions(ids[0]).is_empty());
        // The other node still has its copy.
        assert_eq!(net.get_pending_transactions(ids[1]).len(), 1);
    }

    #[test]
    fn submit_to_single_node() {
        let (net, ids) = net_with(2);
        assert!(net.submit_transaction_to(ids[1], Transaction::new("a", "b", Value::Amount(1))));
        assert!(!net.submit_transaction_to(NodeId::new(), Transaction::new("a", "b", Value::Amount(1))));
        assert!(net.get_pending_transactions(ids[0]).is_empty());
        assert_eq!(net.queue_depth(ids[1]), (1, 0));
    }

    #[test]
    fn broadcast_skips_sender() {
        let (net, ids) = net_with(3);
        let block = Block::new(Block::genesis().hash(), vec![]);
        net.broadcast_block(&block, ids[0]);
        assert!(net.get_incoming_blocks(ids[0]).is_empty());
        assert_eq!(net.get_incoming_blocks(ids[1]), vec![block.clone()]);
        assert_eq!(net.get_incoming_blocks(ids[2]), vec![block]);
        assert!(net.get_incoming_blocks(ids[2]).is_empty());
    }

    #[test]
    fn peer_chains_exclude_own_and_overwrite() {
        let (net, ids) = net_with(2);
        let g = Chain::genesis();
        let longer = g.extended(Block::new(g.tip_hash(), vec![]));

        net.publish_chain(&g, ids[0]);
        net.publish_chain(&g, ids[1]);
        net.publish_chain(&longer, ids[1]);

        let seen_by_0 = net.get_peer_chains(ids[0]);
        assert_eq!(seen_by_0.len(), 1);
        assert_eq!(seen_by_0[0].len(), 2);
        assert_eq!(net.published_chain(ids[0]).map(|c| c.len()), Some(1));
    }

    #[test]
    fn unknown_node_gets_nothing() {
        let (net, _) = net_with(1);
        let stranger = NodeId::new();
        assert!(net.get_pending_transactions(stranger).is_empty());
        assert!(net.get_incoming_blocks(stranger).is_empty());
    }

    #[test]
    fn register_is_idempotent() {
        let (net, ids) = net_with(1);
        net.submit_transaction(Transaction::new("a", "b", Value::Amount(1)));
        net.register(ids[0]);
        assert_eq!(net.nodes(), ids);
        assert_eq!(net.queue_depth(ids[0]), (1, 0));
    }
}
