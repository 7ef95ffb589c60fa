//! Trustline Plugin - bilateral virtual ledger over a signalling channel
//!
//! Two peers maintain a shared credit line by exchanging `transfer` /
//! `acknowledge` / `reject` / `reply` / `fulfillment` messages over an
//! opaque connection. Each peer tracks its own view of the running balance;
//! the state machine here guarantees both sides converge on the same value
//! provided messages are delivered and neither party is malicious.
//!
//! # Architecture
//!
//! ```text
//! Plugin ──> Connection (send)          peer messages ──> receive loop
//!   │                                                        │
//!   ├─ Balance      (store key "balance")  <── one handler at a time
//!   ├─ TransferLog  (store keys "t:*")
//!   └─ events: broadcast<PluginEvent>
//! ```
//!
//! There is only one balance: money is not actually held in escrow for
//! conditional transfers, although it behaves as though it were. Nothing
//! moves at prepare/acknowledge time; execute moves the balance exactly
//! once, cancel moves nothing.

mod condition;
mod config;
mod connection;
mod events;
mod plugin;

pub use condition::{ConditionValidator, PreimageValidator};
pub use config::{LedgerInfo, PluginConfig};
pub use connection::{Connection, PairedConnection};
pub use events::PluginEvent;
pub use plugin::Plugin;
