//! Transaction verification: is this transaction authorized by its sender?
//!
//! A transaction is authorized when its signature verifies over
//! [`Transaction::signable_bytes`] against the public key in `sender`. That
//! is the whole rule. Checks run cheapest first: presence, then decoding,
//! then the Ed25519 verification itself.
//!
//! Verification is pure. It never looks at a chain, a balance or a clock.

use thiserror::Error;

use super::builder::Transaction;
use crate::crypto::keys::{PublicKey, Signature};
use crate::crypto::signatures::verify;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a transaction is not authorized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    /// The signature field is absent.
    #[error("transaction is unsigned")]
    MissingSignature,

    /// The signature is not 64 bytes of hex.
    #[error("malformed signature: {reason}")]
    MalformedSignature { reason: String },

    /// The sender is not a hex-encoded Ed25519 public key.
    #[error("invalid sender: {sender} is not an Ed25519 public key")]
    InvalidSender { sender: String },

    /// Well-formed, but does not verify against the sender's key.
    #[error("invalid signature: does not verify against sender {sender}")]
    InvalidSignature { sender: String },
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Check that `tx` is authorized by its sender.
pub fn verify_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    let sig_hex = tx.signature().ok_or(TransactionError::MissingSignature)?;

    let signature =
        Signature::from_hex(sig_hex).map_err(|e| TransactionError::MalformedSignature {
            reason: e.to_string(),
        })?;

    let public_key =
        PublicKey::from_hex(tx.sender()).map_err(|_| TransactionError::InvalidSender {
            sender: tx.sender().to_string(),
        })?;

    if !verify(&public_key, &tx.signable_bytes(), &signature) {
        return Err(TransactionError::InvalidSignature {
            sender: tx.sender().to_string(),
        });
    }

    Ok(())
}

/// Boolean form of [`verify_transaction`].
pub fn is_authorized(tx: &Transaction) -> bool {
    verify_transaction(tx).is_ok()
}
