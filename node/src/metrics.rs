//! # Prometheus Metrics
//!
//! Per-node counters for the simulation, labeled by short node id and
//! scraped at `/metrics`. Nothing in the protocol crate knows about
//! Prometheus: a background task subscribes to the [`NodeEvent`] broadcast
//! and calls [`NodeMetrics::observe`] for each event.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] with the
//! `longchain` prefix.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use longchain_protocol::network::NodeEvent;

const NODE_LABEL: &str = "node";

/// Metric handles for every simulated node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Loop iterations, idle or not.
    pub cycles_total: IntCounterVec,
    /// Cycles that found nothing to propose.
    pub idle_cycles_total: IntCounterVec,
    pub blocks_proposed_total: IntCounterVec,
    /// Peer blocks appended to the local chain.
    pub blocks_admitted_total: IntCounterVec,
    /// Own candidates that failed admission.
    pub proposals_dropped_total: IntCounterVec,
    /// Fork-choice switches to a longer peer chain.
    pub chain_replacements_total: IntCounterVec,
    /// Current chain length, genesis included.
    pub chain_height: IntGaugeVec,
    /// Transactions per proposed block.
    pub block_transactions: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("longchain".into()), None)?;

        let counter = |name: &str, help: &str| -> Result<IntCounterVec, prometheus::Error> {
            let c = IntCounterVec::new(Opts::new(name, help), &[NODE_LABEL])?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let cycles_total = counter("cycles_total", "Node loop cycles run")?;
        let idle_cycles_total = counter("idle_cycles_total", "Cycles with nothing to propose")?;
        let blocks_proposed_total = counter(
            "blocks_proposed_total",
            "Blocks proposed and admitted to the proposer's own chain",
        )?;
        let blocks_admitted_total = counter(
            "blocks_admitted_total",
            "Peer blocks admitted to the local chain",
        )?;
        let proposals_dropped_total = counter(
            "proposals_dropped_total",
            "Own candidate blocks that failed admission",
        )?;
        let chain_replacements_total = counter(
            "chain_replacements_total",
            "Times the local chain was replaced by a longer valid peer chain",
        )?;

        let chain_height = IntGaugeVec::new(
            Opts::new("chain_height", "Local chain length including genesis"),
            &[NODE_LABEL],
        )?;
        registry.register(Box::new(chain_height.clone()))?;

        let block_transactions = Histogram::with_opts(
            HistogramOpts::new("block_transactions", "Transactions per proposed block")
                .buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]),
        )?;
        registry.register(Box::new(block_transactions.clone()))?;

        Ok(Self {
            registry,
            cycles_total,
            idle_cycles_total,
            blocks_proposed_total,
            blocks_admitted_total,
            proposals_dropped_total,
            chain_replacements_total,
            chain_height,
            block_transactions,
        })
    }

    /// Update the metrics for one loop event.
    pub fn observe(&self, event: &NodeEvent) {
        let node = event.node().short();
        let labels = [node.as_str()];
        match event {
            NodeEvent::BlockProposed { height, txs, .. } => {
                self.blocks_proposed_total.with_label_values(&labels).inc();
                self.block_transactions.observe(*txs as f64);
                self.set_height(&labels, *height);
            }
            NodeEvent::BlockAdmitted { height, .. } => {
                self.blocks_admitted_total.with_label_values(&labels).inc();
                self.set_height(&labels, *height);
            }
            NodeEvent::ProposalDropped { .. } => {
                self.proposals_dropped_total.with_label_values(&labels).inc();
            }
            NodeEvent::ChainReplaced { to_len, .. } => {
                self.chain_replacements_total
                    .with_label_values(&labels)
                    .inc();
                self.set_height(&labels, *to_len);
            }
            NodeEvent::ChainPublished { len, .. } => self.set_height(&labels, *len),
            NodeEvent::CycleCompleted { idle, .. } => {
                self.cycles_total.with_label_values(&labels).inc();
                if *idle {
                    self.idle_cycles_total.with_label_values(&labels).inc();
                }
            }
        }
    }

    fn set_height(&self, labels: &[&str], height: usize) {
        self.chain_height
            .with_label_values(labels)
            .set(i64::try_from(height).unwrap_or(i64::MAX));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics handle, extracted from the router state.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longchain_protocol::network::NodeId;

    fn count(vec: &IntCounterVec, node: NodeId) -> u64 {
        vec.with_label_values(&[node.short().as_str()]).get()
    }

    #[test]
    fn events_drive_counters() {
        let m = NodeMetrics::new().unwrap();
        let node = NodeId::new();

        m.observe(&NodeEvent::BlockProposed {
            node,
            height: 2,
            hash: "ab".into(),
            txs: 3,
        });
        m.observe(&NodeEvent::CycleCompleted { node, idle: false });
        m.observe(&NodeEvent::CycleCompleted { node, idle: true });
        m.observe(&NodeEvent::ChainReplaced {
            node,
            from_len: 2,
            to_len: 5,
        });

        assert_eq!(count(&m.blocks_proposed_total, node), 1);
        assert_eq!(count(&m.cycles_total, node), 2);
        assert_eq!(count(&m.idle_cycles_total, node), 1);
        assert_eq!(count(&m.chain_replacements_total, node), 1);
        assert_eq!(
            m.chain_height
                .with_label_values(&[node.short().as_str()])
                .get(),
            5
        );
        assert_eq!(m.block_transactions.get_sample_count(), 1);
    }

    #[test]
    fn nodes_are_labeled_separately() {
        let m = NodeMetrics::new().unwrap();
        let (a, b) = (NodeId::new(), NodeId::new());
        m.observe(&NodeEvent::BlockAdmitted { node: a, height: 2 });

        assert_eq!(count(&m.blocks_admitted_total, a), 1);
        assert_eq!(count(&m.blocks_admitted_total, b), 0);
    }

    #[test]
    fn encode_uses_prefix() {
        let m = NodeMetrics::new().unwrap();
        m.observe(&NodeEvent::ProposalDropped {
            node: NodeId::new(),
            reason: "stale".into(),
        });
        let text = m.encode().unwrap();
        assert!(text.contains("longchain_proposals_dropped_total"));
    }
}
