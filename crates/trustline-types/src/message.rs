//! Wire messages exchanged over the signalling connection
//!
//! Every payload is a JSON object tagged by `type`. Protocol responses
//! (`acknowledge`, `reject`, `reply`) echo the transfer they answer so the
//! receiving side can validate against its own log.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, Transfer, TrustlineError};

/// A message on the wire between the two peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// A new transfer proposed by the sending peer
    Transfer { transfer: Transfer },
    /// The receiving peer accepted the transfer
    Acknowledge { transfer: Transfer, message: String },
    /// The receiving peer refused the transfer; `message` carries the reason
    Reject { transfer: Transfer, message: String },
    /// Informational response referencing a transfer; no state change
    Reply { transfer: Transfer, message: String },
    /// A condition preimage for a conditional transfer
    Fulfillment { transfer: Transfer, fulfillment: String },
}

impl Message {
    /// Parse an opaque payload from the connection.
    ///
    /// Unknown `type` tags and malformed bodies both map to `InvalidMessage`;
    /// the receive loop emits an error event and keeps running.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| TrustlineError::InvalidMessage {
            reason: e.to_string(),
        })
    }

    /// Encode for the connection
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| TrustlineError::InvalidMessage {
            reason: e.to_string(),
        })
    }

    /// The transfer this message is about
    pub fn transfer(&self) -> &Transfer {
        match self {
            Self::Transfer { transfer }
            | Self::Acknowledge { transfer, .. }
            | Self::Reject { transfer, .. }
            | Self::Reply { transfer, .. }
            | Self::Fulfillment { transfer, .. } => transfer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_round_trip() {
        let msg = Message::Acknowledge {
            transfer: Transfer::new("t1", "peer.alice", "5"),
            message: "transfer accepted".to_string(),
        };

        let value = msg.to_value().unwrap();
        assert_eq!(value["type"], "acknowledge");
        assert_eq!(value["message"], "transfer accepted");

        let back = Message::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_unknown_type_is_invalid_message() {
        let err = Message::from_value(serde_json::json!({
            "type": "settle",
            "transfer": {"id": "t1", "account": "a", "amount": "1"}
        }))
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_MESSAGE");
    }

    #[test]
    fn test_untagged_payload_is_invalid_message() {
        let err = Message::from_value(serde_json::json!({"hello": "world"})).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_MESSAGE");
    }

    #[test]
    fn test_fulfillment_carries_preimage() {
        let value = serde_json::json!({
            "type": "fulfillment",
            "transfer": {"id": "t4", "account": "peer.bob", "amount": "4"},
            "fulfillment": "secret"
        });
        match Message::from_value(value).unwrap() {
            Message::Fulfillment { transfer, fulfillment } => {
                assert_eq!(transfer.id.as_str(), "t4");
                assert_eq!(fulfillment, "secret");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
