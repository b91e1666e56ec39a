//! # Transaction Module
//!
//! Construction, signing and verification of ledger transactions.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        - Value (amount or memo) and well-known memos
//! builder.rs      - Transaction, its canonical encoding, TransactionBuilder
//! signing.rs      - Ed25519 signing over the canonical unsigned payload
//! verification.rs - The authorization check
//! wallet.rs       - Keypair holder that builds, signs and submits
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] or [`Transaction::new`].
//! 2. **Sign**: [`sign_transaction`] consumes the unsigned value.
//! 3. **Submit**: the transport queues it into every node's pending pool.
//! 4. **Include**: a node proposes a block carrying every pending transaction.
//! 5. **Verify**: [`verify_transaction`], at admission (when the policy asks
//!    for it) and when contracts replay the chain.
//!
//! ## Design Decisions
//!
//! - Signing covers compact JSON of `sender`, `receiver`, `value` in that
//!   order. The signature field is never part of its own payload.
//! - Transaction ids are BLAKE3 over the full canonical encoding. They label
//!   things; consensus never compares them.
//! - No nonces, fees or timestamps. Replay protection is out of scope.

pub mod builder;
pub mod signing;
pub mod types;
pub mod verification;
pub mod wallet;

pub use builder::{Transaction, TransactionBuilder};
pub use signing::sign_transaction;
pub use types::{Value, MEMO_CANCEL, MEMO_RESERVATION};
pub use verification::{is_authorized, verify_transaction, TransactionError};
pub use wallet::Wallet;
