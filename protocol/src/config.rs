//! # Protocol Configuration & Constants
//!
//! Network-wide constants. Every node must agree on these byte for byte,
//! otherwise the genesis hashes diverge and no chain validates anywhere.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Hash output length in bytes. SHA-256 and BLAKE3 both produce 32 bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// Timestamp of the genesis block (Unix milliseconds).
pub const GENESIS_TIMESTAMP_MS: u64 = 0;

/// Predecessor hash recorded in the genesis block. Nothing hashes to all
/// zeros, so no real block can ever claim genesis as its successor by accident.
pub const GENESIS_PREVIOUS_HASH: [u8; HASH_OUTPUT_LENGTH] = [0u8; HASH_OUTPUT_LENGTH];

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long an idle node waits before polling for transactions again.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(1_000);

/// [`DEFAULT_IDLE_BACKOFF`] in milliseconds, for config structs and CLI flags.
pub const DEFAULT_IDLE_BACKOFF_MS: u64 = 1_000;
