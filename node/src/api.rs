//! # Inspection API
//!
//! Read-only axum router over a running simulation. Handlers never touch a
//! node's loop directly: everything comes from what nodes have published to
//! the [`InMemoryNetwork`], so a request can never stall consensus.
//!
//! ## Endpoints
//!
//! | Method | Path               | Description                                 |
//! |--------|--------------------|---------------------------------------------|
//! | GET    | `/health`          | Liveness probe                              |
//! | GET    | `/status`          | Per-node chain length, tip and queue depth  |
//! | GET    | `/nodes/:id/chain` | The chain a node last published             |
//! | GET    | `/contract`        | Reservation state on the longest chain      |
//! | GET    | `/metrics`         | Prometheus text exposition                  |

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use longchain_contracts::{ReservationContract, ReservationState};
use longchain_protocol::network::{AdmissionPolicy, InMemoryNetwork, NodeId};
use longchain_protocol::storage::{Block, Chain};
use longchain_protocol::transaction::Transaction;

use crate::metrics::{metrics_handler, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub network: Arc<InMemoryNetwork>,
    pub policy: AdmissionPolicy,
    pub contract: Arc<ReservationContract>,
    pub metrics: SharedMetrics,
}

impl FromRef<AppState> for SharedMetrics {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.metrics)
    }
}

/// The longest chain published on `network`. Ties go to the lowest node id.
pub fn longest_published(network: &InMemoryNetwork) -> Option<(NodeId, Chain)> {
    let mut best: Option<(NodeId, Chain)> = None;
    for node in network.nodes() {
        let Some(chain) = network.published_chain(node) else {
            continue;
        };
        if best.as_ref().map_or(true, |(_, b)| chain.len() > b.len()) {
            best = Some((node, chain));
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/nodes/:id/chain", get(chain_handler))
        .route("/contract", get(contract_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: i64,
    pub require_signed_transactions: bool,
    /// Longest published chain length across the network.
    pub longest: usize,
    /// Every node has published, and all published chains are identical.
    pub converged: bool,
    pub nodes: Vec<NodeStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatus {
    pub id: NodeId,
    /// `None` until the node has run its first cycle.
    pub chain_len: Option<usize>,
    pub tip_hash: Option<String>,
    pub pending_transactions: usize,
    pub pending_blocks: usize,
}

/// One block as served by `GET /nodes/:id/chain`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockView {
    pub height: usize,
    pub hash: String,
    pub previous_hash: String,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
}

impl BlockView {
    fn new(height: usize, block: &Block) -> Self {
        Self {
            height,
            hash: block.hash_hex(),
            previous_hash: block.previous_hash_hex(),
            timestamp: block.timestamp(),
            transactions: block.transactions().to_vec(),
        }
    }
}

/// Response payload for `GET /nodes/:id/chain`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChainResponse {
    pub node: NodeId,
    pub len: usize,
    pub valid: bool,
    pub blocks: Vec<BlockView>,
}

/// Response payload for `GET /contract`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContractResponse {
    pub resource: String,
    /// Node whose chain was replayed. `None` before anything is published.
    pub source: Option<NodeId>,
    pub chain_len: usize,
    pub state: ReservationState,
    pub applied: usize,
    pub unauthorized: usize,
    pub ignored: usize,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut nodes = Vec::new();
    let mut chains: Vec<Chain> = Vec::new();

    for id in state.network.nodes() {
        let published = state.network.published_chain(id);
        let (pending_transactions, pending_blocks) = state.network.queue_depth(id);
        nodes.push(NodeStatus {
            id,
            chain_len: published.as_ref().map(Chain::len),
            tip_hash: published.as_ref().map(|c| c.tip().hash_hex()),
            pending_transactions,
            pending_blocks,
        });
        chains.extend(published);
    }

    let converged = !nodes.is_empty()
        && chains.len() == nodes.len()
        && chains.windows(2).all(|w| w[0].same_content(&w[1]));

    Json(StatusResponse {
        version: state.version.clone(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        require_signed_transactions: state.policy.require_signed_transactions,
        longest: chains.iter().map(Chain::len).max().unwrap_or(0),
        converged,
        nodes,
    })
}

/// `GET /nodes/:id/chain`
///
/// 400 for a malformed id, 404 for an unknown node or one that has not
/// published yet.
async fn chain_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let node: NodeId = match id.parse() {
        Ok(node) => node,
        Err(e) => return error(StatusCode::BAD_REQUEST, format!("invalid node id: {e}")),
    };
    let Some(chain) = state.network.published_chain(node) else {
        return error(
            StatusCode::NOT_FOUND,
            format!("no chain published by node {node}"),
        );
    };

    Json(ChainResponse {
        node,
        len: chain.len(),
        valid: chain.is_valid(),
        blocks: chain
            .blocks()
            .enumerate()
            .map(|(h, b)| BlockView::new(h, b))
            .collect(),
    })
    .into_response()
}

/// `GET /contract`
async fn contract_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (source, chain) = match longest_published(&state.network) {
        Some((node, chain)) => (Some(node), chain),
        None => (None, Chain::genesis()),
    };
    let replay = state.contract.replay(&chain);

    Json(ContractResponse {
        resource: state.contract.resource().to_string(),
        source,
        chain_len: chain.len(),
        state: replay.state,
        applied: replay.applied,
        unauthorized: replay.unauthorized,
        ignored: replay.ignored,
    })
}
