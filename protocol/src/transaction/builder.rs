//! Transaction structure and the fluent builder used to assemble it.
//!
//! A [`Transaction`] has four fields and no mutators. Signing consumes an
//! unsigned transaction and hands back a signed copy (see
//! [`super::signing::sign_transaction`]), so a transaction that made it into
//! a block can never change underneath the block hash.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::types::Value;
use crate::crypto::hash::blake3_hash;

/// A transfer of `value` from `sender` to `receiver`.
///
/// `sender` is the hex-encoded Ed25519 public key of the party that signs.
/// `receiver` is an opaque identity string; it is usually another public key
/// but nothing here requires that.
///
/// Field order is part of the wire format. Do not reorder.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    receiver: String,
    value: Value,
    /// Hex-encoded Ed25519 signature over [`Transaction::signable_bytes`].
    /// Encodes as `null` when unsigned.
    #[serde(default)]
    signature: Option<String>,
}

impl Transaction {
    /// An unsigned transaction.
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, value: Value) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            value,
            signature: None,
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Hex signature, if any.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The bytes a signature covers: compact JSON with the fixed field order
    /// `sender`, `receiver`, `value`. The signature itself is excluded.
    ///
    /// ```
    /// use longchain_protocol::transaction::{Transaction, Value};
    ///
    /// let tx = Transaction::new("alice", "bob", Value::Amount(5));
    /// assert_eq!(
    ///     tx.signable_bytes(),
    ///     br#"{"sender":"alice","receiver":"bob","value":5}"#.to_vec()
    /// );
    /// ```
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut out = String::with_capacity(160);
        out.push_str("{\"sender\":");
        push_json_str(&mut out, &self.sender);
        out.push_str(",\"receiver\":");
        push_json_str(&mut out, &self.receiver);
        out.push_str(",\"value\":");
        push_json_value(&mut out, &self.value);
        out.push('}');
        out.into_bytes()
    }

    /// Canonical text encoding. Byte-identical to `serde_json::to_string`
    /// of this struct, but infallible, which lets block hashing build on it.
    pub fn to_canonical_json(&self) -> String {
        let mut out = String::with_capacity(300);
        self.write_canonical(&mut out);
        out
    }

    /// Parse the canonical encoding produced by [`Self::to_canonical_json`].
    pub fn from_canonical_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub(crate) fn write_canonical(&self, out: &mut String) {
        out.push_str("{\"sender\":");
        push_json_str(out, &self.sender);
        out.push_str(",\"receiver\":");
        push_json_str(out, &self.receiver);
        out.push_str(",\"value\":");
        push_json_value(out, &self.value);
        out.push_str(",\"signature\":");
        match &self.signature {
            Some(sig) => push_json_str(out, sig),
            None => out.push_str("null"),
        }
        out.push('}');
    }

    /// Content identifier: BLAKE3 of the canonical encoding, hex.
    ///
    /// Covers the signature, so signing changes the id. Only used to label
    /// transactions in logs and API responses.
    pub fn id(&self) -> String {
        hex::encode(blake3_hash(self.to_canonical_json().as_bytes()))
    }

    /// First 8 hex chars of [`Self::id`], for log lines.
    pub fn short_id(&self) -> String {
        let mut id = self.id();
        id.truncate(8);
        id
    }

    pub(crate) fn with_signature(mut self, signature_hex: String) -> Self {
        self.signature = Some(signature_hex);
        self
    }
}

/// Append `s` as a JSON string literal, escaped exactly as `serde_json` does.
pub(crate) fn push_json_str(out: &mut String, s: &str) {
    // Display on serde_json::Value cannot fail.
    let _ = write!(out, "{}", serde_json::Value::String(s.to_owned()));
}

fn push_json_value(out: &mut String, value: &Value) {
    match value {
        Value::Amount(a) => {
            let _ = write!(out, "{}", a);
        }
        Value::Memo(m) => push_json_str(out, m),
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned transactions.
///
/// ```
/// use longchain_protocol::transaction::{TransactionBuilder, Value};
///
/// let tx = TransactionBuilder::new()
///     .sender("ab12")
///     .receiver("cd34")
///     .amount(100)
///     .build();
/// assert_eq!(tx.value(), &Value::Amount(100));
/// assert!(!tx.is_signed());
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    sender: String,
    receiver: String,
    value: Value,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    /// Starts with empty parties and a zero amount.
    pub fn new() -> Self {
        Self {
            sender: String::new(),
            receiver: String::new(),
            value: Value::Amount(0),
        }
    }

    pub fn sender(mut self, sender: &str) -> Self {
        self.sender = sender.to_string();
        self
    }

    pub fn receiver(mut self, receiver: &str) -> Self {
        self.receiver = receiver.to_string();
        self
    }

    pub fn value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    pub fn amount(self, amount: u64) -> Self {
        self.value(Value::Amount(amount))
    }

    pub fn memo(self, memo: &str) -> Self {
        self.value(Value::memo(memo))
    }

    pub fn build(self) -> Transaction {
        Transaction::new(self.sender, self.receiver, self.value)
    }
}
