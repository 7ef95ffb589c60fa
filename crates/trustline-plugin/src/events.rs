//! Observable plugin events
//!
//! Events are broadcast to all subscribers; emitting with no receivers is
//! not an error. The repeat-transfer, false-acknowledge, and
//! balance-changed variants are debug hooks for tests and diagnostics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use trustline_types::{Transfer, TransferId};

/// Events emitted by the trustline state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PluginEvent {
    /// The signalling connection is up
    Connected,

    /// The signalling connection is down
    Disconnected,

    /// A new incoming transfer was recorded, before any accept/reject decision
    Incoming { transfer: Transfer },

    /// The peer acknowledged one of our outgoing transfers
    Accept { transfer: Transfer, message: String },

    /// A transfer was refused; ours by the peer or theirs by us
    Reject { transfer: Transfer, message: String },

    /// Informational reply referencing a transfer
    Reply { transfer: Transfer, message: String },

    /// A fulfillment arrived from the peer for a known transfer
    Fulfillment { transfer: Transfer, fulfillment: String },

    /// A conditional transfer executed; the balance moved
    FulfillExecutionCondition { transfer: Transfer, fulfillment: String },

    /// A conditional transfer was cancelled; the balance did not move
    FulfillCancellationCondition { transfer: Transfer, fulfillment: String },

    /// A handler failed; never swallowed silently
    Error { code: String, message: String },

    /// Debug hook: a transfer id was presented twice
    RepeatTransfer { transfer_id: TransferId },

    /// Debug hook: an acknowledge failed validation
    FalseAcknowledge { transfer_id: TransferId },

    /// Debug hook: the balance moved
    BalanceChanged { balance: Decimal },
}

impl PluginEvent {
    /// Short description for logging
    pub fn summary(&self) -> String {
        match self {
            Self::Connected => "connected".to_string(),
            Self::Disconnected => "disconnected".to_string(),
            Self::Incoming { transfer } => {
                format!("incoming {} ({})", transfer.id, transfer.amount)
            }
            Self::Accept { transfer, .. } => format!("accepted {}", transfer.id),
            Self::Reject { transfer, message } => {
                format!("rejected {}: {}", transfer.id, message)
            }
            Self::Reply { transfer, .. } => format!("reply for {}", transfer.id),
            Self::Fulfillment { transfer, .. } => format!("fulfillment for {}", transfer.id),
            Self::FulfillExecutionCondition { transfer, .. } => {
                format!("executed {}", transfer.id)
            }
            Self::FulfillCancellationCondition { transfer, .. } => {
                format!("cancelled {}", transfer.id)
            }
            Self::Error { code, message } => format!("error {code}: {message}"),
            Self::RepeatTransfer { transfer_id } => format!("repeat transfer {transfer_id}"),
            Self::FalseAcknowledge { transfer_id } => {
                format!("false acknowledge {transfer_id}")
            }
            Self::BalanceChanged { balance } => format!("balance {balance}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = PluginEvent::Reject {
            transfer: Transfer::new("t2", "peer.alice", "5"),
            message: "credit limit exceeded".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"reject\""));
        assert!(json.contains("credit limit exceeded"));

        let back: PluginEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary(), event.summary());
    }

    #[test]
    fn test_summaries_name_the_transfer() {
        let event = PluginEvent::RepeatTransfer {
            transfer_id: "t1".into(),
        };
        assert!(event.summary().contains("t1"));
    }
}
