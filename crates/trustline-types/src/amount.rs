//! Transfer amounts
//!
//! Amounts travel on the wire as decimal strings and are validated at the
//! protocol boundary rather than at parse time: a transfer carrying `"NaN"`
//! or `"abc"` must still be recorded in the transfer log so the handler can
//! answer it with a reject, so the raw text is representable here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TrustlineError;

/// Wire representation of a transfer amount.
///
/// Holds the raw decimal string as received; [`Amount::value`] parses it and
/// [`Amount::positive_value`] additionally enforces the protocol rule that
/// transfer amounts are strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub String);

impl Amount {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the raw string into a decimal.
    ///
    /// Rejects anything `rust_decimal` cannot represent, which covers NaN,
    /// infinities, and non-numeric text.
    pub fn value(&self) -> Result<Decimal, TrustlineError> {
        Decimal::from_str(self.0.trim()).map_err(|_| TrustlineError::InvalidAmount {
            raw: self.0.clone(),
        })
    }

    /// Parse and require a strictly positive decimal.
    pub fn positive_value(&self) -> Result<Decimal, TrustlineError> {
        let value = self.value()?;
        if value <= Decimal::ZERO {
            return Err(TrustlineError::InvalidAmount {
                raw: self.0.clone(),
            });
        }
        Ok(value)
    }

    /// Check whether this is a well-formed, strictly positive amount.
    pub fn is_valid(&self) -> bool {
        self.positive_value().is_ok()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for Amount {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for Amount {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}
