//! # Reservation Contract
//!
//! One resource, at most one holder.
//!
//! ```text
//!              "reservation" (anyone)
//!  Available ─────────────────────────▶ Reserved { sender, receiver }
//!      ▲                                     │
//!      └──────── "cancel" (holder only) ─────┘
//! ```
//!
//! Every other transaction is ignored: amounts, unknown memos, a
//! `"reservation"` while reserved, a `"cancel"` from anyone but the holder.
//! Transactions are not filtered by receiver, so every operation on the chain
//! counts toward the one resource.
//!
//! With signature checks on (the default), unauthorized transactions are
//! skipped before they can change state. Without that, anyone could cancel
//! someone else's reservation by writing their address in `sender`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use longchain_protocol::network::Transport;
use longchain_protocol::storage::Chain;
use longchain_protocol::transaction::{
    is_authorized, Transaction, Value, Wallet, MEMO_CANCEL, MEMO_RESERVATION,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an operation was not submitted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("already reserved by {holder}")]
    AlreadyReserved { holder: String },

    #[error("nothing is reserved")]
    NotReserved,

    #[error("reservation is held by {holder}, not {caller}")]
    NotHolder { holder: String, caller: String },
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReservationState {
    #[default]
    Available,
    Reserved {
        sender: String,
        receiver: String,
    },
}

impl ReservationState {
    /// The holder, when reserved.
    pub fn sender(&self) -> Option<&str> {
        match self {
            ReservationState::Reserved { sender, .. } => Some(sender),
            ReservationState::Available => None,
        }
    }

    pub fn receiver(&self) -> Option<&str> {
        match self {
            ReservationState::Reserved { receiver, .. } => Some(receiver),
            ReservationState::Available => None,
        }
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, ReservationState::Reserved { .. })
    }

    /// The transition for one transaction. `None` when `tx` does not apply.
    fn transition(&self, tx: &Transaction) -> Option<ReservationState> {
        match (self, tx.value().as_memo()?) {
            (ReservationState::Available, MEMO_RESERVATION) => Some(ReservationState::Reserved {
                sender: tx.sender().to_string(),
                receiver: tx.receiver().to_string(),
            }),
            (ReservationState::Reserved { sender, .. }, MEMO_CANCEL) if sender == tx.sender() => {
                Some(ReservationState::Available)
            }
            _ => None,
        }
    }
}

/// Result of replaying a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    pub state: ReservationState,
    /// Transactions that changed state.
    pub applied: usize,
    /// Transactions skipped because their signature did not check out.
    pub unauthorized: usize,
    /// Everything else.
    pub ignored: usize,
}

// ---------------------------------------------------------------------------
// ReservationContract
// ---------------------------------------------------------------------------

/// The contract for one resource. `resource` is the receiver every operation
/// this contract submits is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationContract {
    resource: String,
    verify_signatures: bool,
}

impl ReservationContract {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            verify_signatures: true,
        }
    }

    /// Toggle signature checks during replay.
    pub fn with_signature_checks(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn verifies_signatures(&self) -> bool {
        self.verify_signatures
    }

    /// Fold every transaction in `chain`, oldest first, from `Available`.
    pub fn replay(&self, chain: &Chain) -> Replay {
        let mut replay = Replay::default();
        for tx in chain.transactions() {
            if tx.value().as_memo().is_none() {
                replay.ignored += 1;
                continue;
            }
            if self.verify_signatures && !is_authorized(tx) {
                replay.unauthorized += 1;
                continue;
            }
            match replay.state.transition(tx) {
                Some(next) => {
                    replay.state = next;
                    replay.applied += 1;
                }
                None => replay.ignored += 1,
            }
        }
        replay
    }

    /// Current state according to `chain`.
    pub fn current_state(&self, chain: &Chain) -> ReservationState {
        self.replay(chain).state
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Submit a `"reservation"` from `wallet` if `chain` says the resource is
    /// free.
    pub fn try_reserve<T>(
        &self,
        wallet: &Wallet,
        transport: &T,
        chain: &Chain,
    ) -> Result<Transaction, ReservationError>
    where
        T: Transport + ?Sized,
    {
        if let Some(holder) = self.current_state(chain).sender() {
            return Err(ReservationError::AlreadyReserved {
                holder: holder.to_string(),
            });
        }
        let tx = wallet.send(transport, &self.resource, Value::memo(MEMO_RESERVATION));
        info!(holder = %short(&wallet.address()), resource = %self.resource, "reservation submitted");
        Ok(tx)
    }

    /// Submit exactly one `"cancel"` from `wallet` if `chain` says it holds
    /// the reservation.
    pub fn try_cancel<T>(
        &self,
        wallet: &Wallet,
        transport: &T,
        chain: &Chain,
    ) -> Result<Transaction, ReservationError>
    where
        T: Transport + ?Sized,
    {
        let state = self.current_state(chain);
        let holder = state.sender().ok_or(ReservationError::NotReserved)?;
        let caller = wallet.address();
        if holder != caller {
            return Err(ReservationError::NotHolder {
                holder: holder.to_string(),
                caller,
            });
        }
        let tx = wallet.send(transport, &self.resource, Value::memo(MEMO_CANCEL));
        info!(holder = %short(&caller), resource = %self.resource, "cancellation submitted");
        Ok(tx)
    }

    /// [`Self::try_reserve`], reporting only whether anything was submitted.
    pub fn make_a_reservation<T>(&self, wallet: &Wallet, transport: &T, chain: &Chain) -> bool
    where
        T: Transport + ?Sized,
    {
        self.try_reserve(wallet, transport, chain)
            .map_err(|e| debug!(error = %e, "reservation not submitted"))
            .is_ok()
    }

    /// [`Self::try_cancel`], reporting only whether anything was submitted.
    pub fn cancel_reservation<T>(&self, wallet: &Wallet, transport: &T, chain: &Chain) -> bool
    where
        T: Transport + ?Sized,
    {
        self.try_cancel(wallet, transport, chain)
            .map_err(|e| debug!(error = %e, "cancellation not submitted"))
            .is_ok()
    }
}

fn short(address: &str) -> &str {
    &address[..address.len().min(12)]
}
