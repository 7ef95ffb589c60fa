//! Error types for trustline
//!
//! Handler failures are never swallowed: every error surfaces through the
//! plugin's event stream, and a rejected incoming transfer is a normal
//! protocol outcome rather than an error.

use thiserror::Error;

use crate::TransferId;

/// Result type for trustline operations
pub type Result<T> = std::result::Result<T, TrustlineError>;

/// Trustline error taxonomy
#[derive(Debug, Clone, Error)]
pub enum TrustlineError {
    /// A transfer id was seen before with different content or direction
    #[error("duplicate transfer id: {id}")]
    DuplicateTransfer { id: TransferId },

    /// A fulfillment or reply referenced an id never recorded locally
    #[error("unknown transfer: {id}")]
    UnknownTransfer { id: TransferId },

    /// Fulfillment attempted on a transfer that carries no execution condition
    #[error("transfer {id} has no execution condition")]
    NotConditional { id: TransferId },

    /// Fulfillment satisfied neither the execution nor the cancellation condition
    #[error("fulfillment does not match any condition of transfer {id}")]
    InvalidFulfillment { id: TransferId },

    /// Amount was NaN, zero, negative, or not parseable as a decimal
    #[error("invalid amount: {raw:?}")]
    InvalidAmount { raw: String },

    /// A credit would push the balance above the configured maximum
    #[error("balance {balance} exceeds maximum {max}")]
    OverLimit { balance: String, max: String },

    /// A debit would push the balance below the configured minimum
    #[error("balance {balance} falls below minimum {min}")]
    UnderLimit { balance: String, min: String },

    /// Acknowledge for an unknown, mismatched, or already-completed transfer
    #[error("false acknowledge for transfer {id}")]
    FalseAcknowledge { id: TransferId },

    /// Wire payload was not a recognized message
    #[error("invalid message: {reason}")]
    InvalidMessage { reason: String },

    /// The signalling connection failed to deliver
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The backing store failed
    #[error("store error: {message}")]
    Store { message: String },
}

impl TrustlineError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Get a stable code for events and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateTransfer { .. } => "DUPLICATE_TRANSFER",
            Self::UnknownTransfer { .. } => "UNKNOWN_TRANSFER",
            Self::NotConditional { .. } => "NOT_CONDITIONAL",
            Self::InvalidFulfillment { .. } => "INVALID_FULFILLMENT",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::OverLimit { .. } => "OVER_LIMIT",
            Self::UnderLimit { .. } => "UNDER_LIMIT",
            Self::FalseAcknowledge { .. } => "FALSE_ACKNOWLEDGE",
            Self::InvalidMessage { .. } => "INVALID_MESSAGE",
            Self::Transport { .. } => "TRANSPORT",
            Self::Store { .. } => "STORE",
        }
    }
}
