//! Interactive CLI demo of the longchain fork-resolution lifecycle.
//!
//! Walks through wallets, block proposal and propagation, a network
//! partition that forks the chain, the partition healing, and a forged chain
//! that nobody adopts. The output uses ANSI escape codes for colored,
//! storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::sync::Arc;
use std::time::Instant;

use longchain_protocol::network::{
    AdmissionPolicy, ConsensusEngine, ConsensusLoop, ConsensusLoopConfig, InMemoryNetwork, NodeId,
    Transport,
};
use longchain_protocol::storage::{Block, Chain};
use longchain_protocol::transaction::{verify_transaction, Transaction, Value, Wallet};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    LONGCHAIN  --  Fork Resolution Demo                             {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    Version 0.1.0  |  Ed25519 + SHA-256 + longest valid chain      {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!(
        "{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]=============================================================={RESET}"
    );
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!("{CYAN}------------------------------------------------------------------------{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn rejected(text: &str) {
    println!("{RED}  [NO] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.2} ms]{RESET}");
}

fn chain_row(name: &str, chain: &Chain) {
    let tip = chain.tip().hash_hex();
    println!(
        "  {BOLD}{name:<8}{RESET} len {WHITE}{:>2}{RESET}  tip {DIM}{}..{RESET}",
        chain.len(),
        &tip[..16]
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_node(net: &Arc<InMemoryNetwork>) -> ConsensusLoop<InMemoryNetwork> {
    let id = NodeId::new();
    net.register(id);
    ConsensusLoop::new(
        ConsensusEngine::new(id, AdmissionPolicy::default()),
        Arc::clone(net),
        ConsensusLoopConfig::default(),
    )
}

fn main() {
    banner();

    // -----------------------------------------------------------------------
    // Step 1: Network and wallets
    // -----------------------------------------------------------------------
    section(1, "Three nodes, two wallets");

    let net = Arc::new(InMemoryNetwork::new());
    let mut alpha = new_node(&net);
    let mut beta = new_node(&net);
    let alice = Wallet::generate();
    let bob = Wallet::generate();

    info("alpha", &alpha.node_id().to_string());
    info("beta", &beta.node_id().to_string());
    info("alice", &alice.address());
    info("bob", &bob.address());
    success("every node starts from the same genesis block");
    info("genesis hash", &Block::genesis().hash_hex());

    // -----------------------------------------------------------------------
    // Step 2: A signed transfer becomes a block
    // -----------------------------------------------------------------------
    section(2, "Alice pays Bob; alpha proposes, beta ingests");

    let start = Instant::now();
    let tx = alice.build(&bob.address(), Value::Amount(250));
    net.submit_transaction_to(alpha.node_id(), tx.clone());
    timing("sign + submit", start.elapsed());
    info("tx id", &tx.id());

    let start = Instant::now();
    alpha.run_cycle();
    beta.run_cycle();
    timing("propose + ingest", start.elapsed());
    chain_row("alpha", alpha.chain());
    chain_row("beta", beta.chain());
    if alpha.chain().same_content(beta.chain()) {
        success("both nodes hold the same chain");
    }

    // -----------------------------------------------------------------------
    // Step 3: Partition
    // -----------------------------------------------------------------------
    section(3, "A partition: gamma builds on its own");

    let island = Arc::new(InMemoryNetwork::new());
    let gamma_id = NodeId::new();
    island.register(gamma_id);
    let mut gamma = ConsensusLoop::new(
        ConsensusEngine::with_chain(gamma_id, alpha.chain().clone(), AdmissionPolicy::default()),
        Arc::clone(&island),
        ConsensusLoopConfig::default(),
    );
    for amount in [10, 20, 30] {
        island.submit_transaction(bob.build(&alice.address(), Value::Amount(amount)));
        gamma.run_cycle();
    }
    net.submit_transaction_to(alpha.node_id(), alice.build(&bob.address(), Value::memo("reservation")));
    alpha.run_cycle();
    beta.run_cycle();

    chain_row("alpha", alpha.chain());
    chain_row("beta", beta.chain());
    chain_row("gamma", gamma.chain());

    // -----------------------------------------------------------------------
    // Step 4: Healing
    // -----------------------------------------------------------------------
    section(4, "The partition heals; the longest valid chain wins");

    net.publish_chain(gamma.chain(), gamma.node_id());
    let start = Instant::now();
    let a = alpha.run_cycle();
    let b = beta.run_cycle();
    timing("fork resolution", start.elapsed());
    info("alpha", &format!("{:?}", a.fork_choice));
    info("beta", &format!("{:?}", b.fork_choice));
    chain_row("alpha", alpha.chain());
    chain_row("beta", beta.chain());
    if alpha.chain().same_content(gamma.chain()) {
        success("alpha and beta switched to gamma's history");
    }

    // -----------------------------------------------------------------------
    // Step 5: A forged chain
    // -----------------------------------------------------------------------
    section(5, "Mallory publishes a long chain with rewritten history");

    let mut blocks: Vec<Block> = alpha.chain().clone().into();
    for i in 0..10u64 {
        let prev = blocks.last().map(Block::hash).unwrap_or_default();
        blocks.push(Block::with_timestamp(i, vec![], prev));
    }
    blocks[1] = Block::with_timestamp(
        1,
        vec![Transaction::new(alice.address(), "mallory", Value::Amount(1_000_000))],
        Block::genesis().hash(),
    );
    let forged = Chain::from_blocks(blocks).unwrap_or_default();
    let mallory = NodeId::new();
    net.publish_chain(&forged, mallory);
    info("forged length", &forged.len().to_string());
    if let Err(e) = forged.validate() {
        rejected(&format!("validator: {e}"));
    }

    let a = alpha.run_cycle();
    info("alpha", &format!("{:?}", a.fork_choice));
    chain_row("alpha", alpha.chain());

    // -----------------------------------------------------------------------
    // Step 6: Tampered transaction
    // -----------------------------------------------------------------------
    section(6, "Changing a signed amount breaks the signature");

    let honest = alice.build(&bob.address(), Value::Amount(5));
    let mut json: serde_json::Value =
        serde_json::from_str(&honest.to_canonical_json()).unwrap_or_default();
    json["value"] = serde_json::json!(5_000);
    match serde_json::from_value::<Transaction>(json) {
        Ok(forged_tx) => match verify_transaction(&forged_tx) {
            Ok(()) => success("unexpectedly verified"),
            Err(e) => rejected(&e.to_string()),
        },
        Err(e) => rejected(&format!("could not decode: {e}")),
    }
    if verify_transaction(&honest).is_ok() {
        success("the original still verifies");
    }

    println!();
}
