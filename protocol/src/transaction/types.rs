//! Core value types for transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memo that opens a reservation on the reservation contract.
pub const MEMO_RESERVATION: &str = "reservation";

/// Memo that releases a reservation held by the sender.
pub const MEMO_CANCEL: &str = "cancel";

/// What a transaction carries.
///
/// Encodes untagged, so an amount is a bare JSON number and a memo a bare
/// JSON string:
///
/// ```text
/// {"sender":"ab12..","receiver":"cd34..","value":250,"signature":null}
/// {"sender":"ab12..","receiver":"cd34..","value":"reservation","signature":null}
/// ```
///
/// Amounts are `u64` in the smallest unit. No floating point.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A numeric transfer.
    Amount(u64),
    /// A textual operation interpreted by contracts.
    Memo(String),
}

impl Value {
    /// Shorthand for `Value::Memo(s.into())`.
    pub fn memo(s: impl Into<String>) -> Self {
        Value::Memo(s.into())
    }

    pub fn as_amount(&self) -> Option<u64> {
        match self {
            Value::Amount(a) => Some(*a),
            Value::Memo(_) => None,
        }
    }

    pub fn as_memo(&self) -> Option<&str> {
        match self {
            Value::Memo(m) => Some(m),
            Value::Amount(_) => None,
        }
    }
}

impl From<u64> for Value {
    fn from(amount: u64) -> Self {
        Value::Amount(amount)
    }
}

impl From<&str> for Value {
    fn from(memo: &str) -> Self {
        Value::Memo(memo.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Amount(a) => write!(f, "{}", a),
            Value::Memo(m) => write!(f, "{:?}", m),
        }
    }
}
