//! Trustline Ledger - balance and transfer log for a bilateral credit line
//!
//! The ledger is:
//! - Single-balance (one signed decimal tracks the whole trustline)
//! - Credit-limited (`min <= balance <= max` after every mutation)
//! - Replay-safe (one log entry per transfer id, ever)
//! - Store-backed (all state lives behind the `Store` contract)
//!
//! # Invariants
//!
//! 1. Every balance delta is the last step of a serialized critical section
//! 2. A completed log entry never reopens
//! 3. Limit checks apply to the post-mutation balance

mod balance;
mod transfer_log;

pub use balance::Balance;
pub use transfer_log::{LogEntry, TransferLog};
