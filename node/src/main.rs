// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # longchain Simulation Node
//!
//! Entry point for the `longchain-node` binary.
//!
//! - `simulate` - registers N nodes on one in-memory network, runs a
//!   consensus loop per node, drives them with wallet traffic, and serves
//!   the inspection API until Ctrl+C, SIGTERM, or `--duration-secs`.
//! - `version`  - print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod traffic;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use longchain_contracts::ReservationContract;
use longchain_protocol::network::{
    AdmissionPolicy, ConsensusEngine, ConsensusLoop, ConsensusLoopConfig, InMemoryNetwork,
    NodeEvent, NodeId,
};

use cli::{Commands, LongchainCli, SimulateArgs};
use metrics::{NodeMetrics, SharedMetrics};
use traffic::{TrafficConfig, TrafficGenerator};

/// Capacity of the node event broadcast feeding the metrics observer.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LongchainCli::parse();

    match cli.command {
        Commands::Simulate(args) => simulate(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

async fn simulate(args: SimulateArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_DIRECTIVES, args.log_format.into());

    let metrics: SharedMetrics =
        Arc::new(NodeMetrics::new().context("failed to create metrics registry")?);
    let network = Arc::new(InMemoryNetwork::new());
    let contract = Arc::new(ReservationContract::new(args.resource.clone()));
    let policy = AdmissionPolicy {
        require_signed_transactions: args.require_signed,
    };
    let loop_config = ConsensusLoopConfig {
        idle_backoff_ms: args.backoff_ms,
    };

    let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!(
        nodes = args.nodes,
        wallets = args.wallets,
        require_signed = args.require_signed,
        backoff_ms = args.backoff_ms,
        "starting simulation"
    );

    // --- Nodes ---
    let mut node_tasks = Vec::with_capacity(usize::from(args.nodes));
    for _ in 0..args.nodes {
        let id = NodeId::new();
        network.register(id);
        let mut node = ConsensusLoop::new(
            ConsensusEngine::new(id, policy),
            Arc::clone(&network),
            loop_config.clone(),
        )
        .with_events(event_tx.clone());
        let shutdown = shutdown_rx.clone();
        node_tasks.push(tokio::spawn(async move {
            let summary = node.run(shutdown).await;
            (id, summary)
        }));
    }
    // Loops hold the remaining senders; the observer ends once they finish.
    drop(event_tx);

    // --- Metrics observer ---
    let observer = tokio::spawn(observe_events(event_rx, Arc::clone(&metrics)));

    // --- Traffic ---
    let generator = TrafficGenerator::new(
        usize::from(args.wallets),
        Arc::clone(&network),
        Arc::clone(&contract),
        TrafficConfig {
            interval: Duration::from_millis(args.tx_interval_ms),
            ..TrafficConfig::default()
        },
    );
    let traffic = tokio::spawn(generator.run(shutdown_rx.clone()));

    // --- API ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: Utc::now(),
        network: Arc::clone(&network),
        policy,
        contract,
        metrics,
    };
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {api_addr}"))?;
    info!(addr = %api_addr, "API server listening");
    let server = axum::serve(listener, api::create_router(app_state))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let server = tokio::spawn(async move { server.await });

    // --- Run until told to stop ---
    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = shutdown_signal() => info!("shutdown signal received"),
        _ = deadline => info!("simulation duration elapsed"),
    }
    let _ = shutdown_tx.send(true);

    // --- Drain ---
    for joined in futures::future::join_all(node_tasks).await {
        match joined {
            Ok((id, s)) => info!(
                node = %id.short(),
                cycles = s.cycles,
                proposed = s.blocks_proposed,
                dropped = s.proposals_dropped,
                admitted = s.blocks_admitted,
                rejected = s.blocks_rejected,
                replacements = s.chain_replacements,
                final_len = s.final_len,
                "node stopped"
            ),
            Err(e) => error!(error = %e, "node task failed"),
        }
    }
    match traffic.await {
        Ok(ticks) => info!(ticks, "traffic stopped"),
        Err(e) => error!(error = %e, "traffic task failed"),
    }
    if let Err(e) = observer.await {
        error!(error = %e, "metrics observer failed");
    }
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "API server error"),
        Err(e) => error!(error = %e, "API server task failed"),
    }

    match api::longest_published(&network) {
        Some((node, chain)) => info!(
            node = %node.short(),
            len = chain.len(),
            tip = %chain.tip().hash_hex(),
            "simulation finished"
        ),
        None => info!("simulation finished before any chain was published"),
    }
    Ok(())
}

/// Feed every loop event into the Prometheus metrics until all loops drop
/// their senders.
async fn observe_events(mut events: broadcast::Receiver<NodeEvent>, metrics: SharedMetrics) {
    loop {
        match events.recv().await {
            Ok(event) => metrics.observe(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "metrics observer lagged behind node events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Resolves once `shutdown` flips to `true` or its sender drops.
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

fn print_version() {
    println!("longchain-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", longchain_protocol::config::PROTOCOL_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed the error is logged and that signal is
/// never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
