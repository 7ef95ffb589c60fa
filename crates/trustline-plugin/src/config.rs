//! Plugin configuration and the ledger info surface

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for one trustline endpoint.
///
/// `limit` is the credit we extend to the peer; the effective balance bounds
/// are `[-limit, limit]` unless overridden by `min`/`max`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Local account label (opaque)
    pub account: String,
    /// Signalling rendezvous identifier
    pub room: String,
    /// Signalling server endpoint
    pub host: String,
    /// Credit we extend to the peer
    pub limit: Decimal,
    /// Absolute upper bound on the balance; defaults to `limit`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Decimal>,
    /// Lower bound on the balance; defaults to `-limit`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Decimal>,
    /// Currency metadata surfaced by `get_info`
    #[serde(default)]
    pub info: LedgerInfo,
}

impl PluginConfig {
    pub fn new(
        account: impl Into<String>,
        room: impl Into<String>,
        host: impl Into<String>,
        limit: Decimal,
    ) -> Self {
        Self {
            account: account.into(),
            room: room.into(),
            host: host.into(),
            limit,
            max: None,
            min: None,
            info: LedgerInfo::default(),
        }
    }

    /// Effective upper bound applied by the balance
    pub fn max_balance(&self) -> Decimal {
        self.max.unwrap_or(self.limit)
    }

    /// Effective lower bound applied by the balance
    pub fn min_balance(&self) -> Decimal {
        self.min.unwrap_or(-self.limit)
    }
}

/// Currency metadata; opaque to the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub precision: u32,
    pub scale: u32,
    pub currency_code: String,
    pub currency_symbol: String,
}

impl Default for LedgerInfo {
    fn default() -> Self {
        Self {
            precision: 15,
            scale: 15,
            currency_code: String::new(),
            currency_symbol: String::new(),
        }
    }
}
