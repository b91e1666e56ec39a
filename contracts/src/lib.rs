//! # longchain Contracts
//!
//! Application state that lives *on* the ledger rather than beside it. A
//! contract never stores anything: its state is whatever you get by replaying
//! a chain's transactions in order. Two nodes holding the same chain always
//! agree on contract state, and a fork switch changes it as a matter of
//! course.
//!
//! - **Reservation** - a single bookable resource. A `"reservation"` memo
//!   takes it when free; a `"cancel"` memo from the holder frees it.
//!
//! ## Design Principles
//!
//! 1. State is a pure fold over a validated chain. No caching, no mutation.
//! 2. State transitions are explicit: enum variants, not boolean flags.
//! 3. Signature verification gates every transition unless turned off.
//! 4. Every public type is serializable (serde) for the inspection API.

pub mod reservation;

pub use reservation::{ReservationContract, ReservationError, ReservationState, Replay};
