//! The transport seam between a node and its peers.
//!
//! The consensus core never talks to sockets. Everything it needs from the
//! outside world goes through [`Transport`]: queues of pending transactions
//! and incoming blocks, the chains other nodes advertise, and a way to
//! broadcast and advertise in return. [`super::memory::InMemoryNetwork`] is
//! the in-process implementation used by tests and the simulator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::storage::{Block, Chain};
use crate::transaction::Transaction;

/// Opaque node address. Only meaningful to the transport.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// A fresh random id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First 8 hex characters, for log lines.
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.short())
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Peer transport as seen by one node.
///
/// Every method is infallible from the caller's side. A transport that cannot
/// deliver drops the message; the next published chain still carries the
/// history.
pub trait Transport: Send + Sync {
    /// Wallet side: queue `tx` into every node's pending pool.
    fn submit_transaction(&self, tx: Transaction);

    /// Take everything pending for `node`. Drains.
    fn get_pending_transactions(&self, node: NodeId) -> Vec<Transaction>;

    /// Take every block peers broadcast to `node`. Drains.
    fn get_incoming_blocks(&self, node: NodeId) -> Vec<Block>;

    /// The latest chain published by every node other than `node`.
    fn get_peer_chains(&self, node: NodeId) -> Vec<Chain>;

    /// Queue `block` for every node other than `from`.
    fn broadcast_block(&self, block: &Block, from: NodeId);

    /// Replace `node`'s advertised chain.
    fn publish_chain(&self, chain: &Chain, node: NodeId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_parses_its_display() {
        let id = NodeId::new();
        assert_eq!(id.to_string().parse::<NodeId>().unwrap(), id);
        assert!("not-a-uuid".parse::<NodeId>().is_err());
    }

    #[test]
    fn node_id_serializes_as_plain_string() {
        let id = NodeId::new();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            format!("\"{}\"", id)
        );
    }

    #[test]
    fn short_is_eight_chars() {
        assert_eq!(NodeId::new().short().len(), 8);
    }
}
