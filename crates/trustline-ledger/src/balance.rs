//! The single signed balance of the trustline

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use trustline_store::Store;
use trustline_types::{Result, TrustlineError};

const BALANCE_KEY: &str = "balance";

/// Signed decimal balance guarded by `[min, max]` credit limits.
///
/// Positive balance means the peer owes us; negative means we owe the peer.
/// Every read-modify-write runs under one lock so concurrent handlers can
/// never interleave a stale read with a write.
pub struct Balance {
    store: Arc<dyn Store>,
    min: Decimal,
    max: Decimal,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<Decimal>,
}

impl Balance {
    pub fn new(store: Arc<dyn Store>, min: Decimal, max: Decimal) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            store,
            min,
            max,
            write_lock: Mutex::new(()),
            changes,
        }
    }

    pub fn min(&self) -> Decimal {
        self.min
    }

    pub fn max(&self) -> Decimal {
        self.max
    }

    /// Subscribe to balance change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Decimal> {
        self.changes.subscribe()
    }

    /// Current balance, lazily initialized to zero on first access
    pub async fn get(&self) -> Result<Decimal> {
        match self.store.get(BALANCE_KEY).await? {
            Some(raw) => raw.trim().parse::<Decimal>().map_err(|_| {
                TrustlineError::store(format!("unreadable balance value {raw:?}"))
            }),
            None => {
                self.store.put(BALANCE_KEY, "0").await?;
                Ok(Decimal::ZERO)
            }
        }
    }

    /// Credit the trustline; fails `OverLimit` if the result exceeds `max`.
    ///
    /// Returns the new balance.
    pub async fn add(&self, amount: Decimal) -> Result<Decimal> {
        let _guard = self.write_lock.lock().await;
        let current = self.get().await?;
        let next = current + amount;
        if next > self.max {
            return Err(TrustlineError::OverLimit {
                balance: next.to_string(),
                max: self.max.to_string(),
            });
        }
        self.store.put(BALANCE_KEY, &next.to_string()).await?;
        debug!(%current, %next, "balance credited");
        let _ = self.changes.send(next);
        Ok(next)
    }

    /// Debit the trustline; fails `UnderLimit` if the result drops below `min`.
    ///
    /// Returns the new balance.
    pub async fn sub(&self, amount: Decimal) -> Result<Decimal> {
        let _guard = self.write_lock.lock().await;
        let current = self.get().await?;
        let next = current - amount;
        if next < self.min {
            return Err(TrustlineError::UnderLimit {
                balance: next.to_string(),
                min: self.min.to_string(),
            });
        }
        self.store.put(BALANCE_KEY, &next.to_string()).await?;
        debug!(%current, %next, "balance debited");
        let _ = self.changes.send(next);
        Ok(next)
    }

    /// Whether an incoming credit of `amount` would keep the balance within
    /// limits. Pure predicate: does not mutate.
    pub async fn is_valid_incoming(&self, amount: Decimal) -> Result<bool> {
        if amount <= Decimal::ZERO {
            return Ok(false);
        }
        let current = self.get().await?;
        Ok(current + amount <= self.max)
    }
}
