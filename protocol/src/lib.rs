// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # longchain - Core Library
//!
//! A small peer-to-peer ledger where every participant keeps its own chain of
//! blocks, proposes blocks from whatever transactions it has pending, and
//! settles disagreements with the oldest rule in the book: the longest valid
//! chain wins.
//!
//! There is no proof-of-work and no stake. Any node with pending transactions
//! may propose a block every cycle. What keeps the network honest is that
//! every node checks hash linkage before it accepts anything, and never adopts
//! a chain it cannot validate end to end.
//!
//! ## Architecture
//!
//! - **crypto** - Ed25519 keys and signatures, SHA-256/BLAKE3 hashing.
//! - **transaction** - Signed transfer records, their canonical encoding,
//!   verification, and the wallet that produces them.
//! - **storage** - Blocks, the genesis block, and immutable chains with the
//!   linkage validator.
//! - **network** - The consensus engine (proposal, admission, fork
//!   resolution), the per-node runtime loop, and the transport seam.
//! - **config** - Protocol constants.
//!
//! ## Design Philosophy
//!
//! 1. Chains are values. Nobody patches a chain in place; a node swaps its
//!    whole chain reference in one step, so every snapshot is consistent.
//! 2. Linkage validity and transaction authorization are separate checks.
//!    Policy decides whether admission requires both.
//! 3. Nothing a peer sends can crash a node. Bad input is logged and dropped.

pub mod config;
pub mod crypto;
pub mod network;
pub mod storage;
pub mod transaction;
