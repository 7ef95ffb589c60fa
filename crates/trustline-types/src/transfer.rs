//! The transfer value object and its local lifecycle
//!
//! A `Transfer` is immutable once created. Its wire form uses camelCase
//! field names and omits absent optionals; direction is assigned by the
//! local node and never transmitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Amount, Result, TransferId, TrustlineError};

/// A unit of value movement between the two peers.
///
/// May be unconditional (one-phase) or conditional (two-phase hash-lock
/// style, with `execution_condition` and optionally `cancellation_condition`
/// as opaque cryptographic commitments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// Globally unique id, assigned by the originating peer
    pub id: TransferId,
    /// Destination account identifier (opaque)
    pub account: String,
    /// Amount as a decimal string; validated at the protocol boundary
    pub amount: Amount,
    /// Opaque payload forwarded to the counterparty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Opaque payload kept on the sending side only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_to_self: Option<Value>,
    /// Commitment whose preimage executes the transfer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_condition: Option<String>,
    /// Commitment whose preimage cancels the transfer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_condition: Option<String>,
    /// Advisory expiry; surfaced to the caller, not enforced by the core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Transfer {
    /// Create an unconditional transfer
    pub fn new(id: impl Into<TransferId>, account: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Self {
            id: id.into(),
            account: account.into(),
            amount: amount.into(),
            data: None,
            note_to_self: None,
            execution_condition: None,
            cancellation_condition: None,
            expires_at: None,
        }
    }

    /// Attach an execution condition, making the transfer conditional
    pub fn with_execution_condition(mut self, condition: impl Into<String>) -> Self {
        self.execution_condition = Some(condition.into());
        self
    }

    /// Attach a cancellation condition
    pub fn with_cancellation_condition(mut self, condition: impl Into<String>) -> Self {
        self.cancellation_condition = Some(condition.into());
        self
    }

    /// Attach an opaque data payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Whether this transfer requires a fulfillment before funds move
    pub fn is_conditional(&self) -> bool {
        self.execution_condition.is_some()
    }

    /// Canonical serialized form: sorted keys, absent optionals omitted.
    ///
    /// Acknowledge validation compares this form byte-for-byte, so it must be
    /// deterministic across both peers.
    pub fn canonical_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| TrustlineError::InvalidMessage {
            reason: e.to_string(),
        })
    }

    /// Canonical form rendered to a string
    pub fn canonical_json(&self) -> Result<String> {
        let value = self.canonical_value()?;
        serde_json::to_string(&value).map_err(|e| TrustlineError::InvalidMessage {
            reason: e.to_string(),
        })
    }
}

/// Direction of a transfer relative to the local node.
///
/// Assigned locally when the transfer is first recorded; never on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// We originated the transfer (a debit once acknowledged/executed)
    Outgoing,
    /// The peer originated the transfer (a credit once accepted/executed)
    Incoming,
}

/// Lifecycle state of a logged transfer.
///
/// `Completed` covers every terminal outcome: accept-finalized, rejected,
/// executed, and cancelled. A completed entry never reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Prepared,
    Completed,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepared => "prepared",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "prepared" => Some(Self::Prepared),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}
