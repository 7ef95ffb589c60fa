//! Trustline Types - Canonical domain types for the bilateral virtual ledger
//!
//! This crate contains the foundational types for a trustline peer with zero
//! dependencies on other trustline crates:
//!
//! - Transfer identity and the `Transfer` value object
//! - Wire-safe `Amount` with decimal validation
//! - The tagged wire `Message` enum exchanged between peers
//! - Transfer direction and lifecycle state
//! - The error taxonomy shared by every layer
//!
//! # Canonical serialization
//!
//! Acknowledge validation compares the *serialized* form of transfers, so the
//! serialization must be deterministic: object keys sorted, absent optional
//! fields omitted. [`Transfer::canonical_value`] produces that form.

pub mod amount;
pub mod error;
pub mod id;
pub mod message;
pub mod transfer;

pub use amount::*;
pub use error::*;
pub use id::*;
pub use message::*;
pub use transfer::*;
