//! Durable record of every transfer seen on the trustline

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use trustline_store::Store;
use trustline_types::{Direction, Result, Transfer, TransferId, TransferState, TrustlineError};

/// A logged transfer with the direction assigned at first observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub transfer: Transfer,
    pub direction: Direction,
}

/// Append-once log keyed by transfer id.
///
/// Owns the `t:*` keyspace: `t:{id}` holds the entry, `t:{id}:state` holds
/// the lifecycle state. At most one entry ever exists per id; storing the
/// same transfer again with identical content and direction is a no-op,
/// anything else is a replay.
pub struct TransferLog {
    store: Arc<dyn Store>,
    write_lock: Mutex<()>,
}

fn entry_key(id: &TransferId) -> String {
    format!("t:{id}")
}

fn state_key(id: &TransferId) -> String {
    format!("t:{id}:state")
}

impl TransferLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Fetch the logged entry for `id`, if any
    pub async fn get(&self, id: &TransferId) -> Result<Option<LogEntry>> {
        match self.store.get(&entry_key(id)).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| TrustlineError::store(format!("unreadable log entry for {id}: {e}"))),
            None => Ok(None),
        }
    }

    /// Record a transfer the peer originated
    pub async fn store_incoming(&self, transfer: Transfer) -> Result<()> {
        self.store_entry(transfer, Direction::Incoming).await
    }

    /// Record a transfer we originated
    pub async fn store_outgoing(&self, transfer: Transfer) -> Result<()> {
        self.store_entry(transfer, Direction::Outgoing).await
    }

    async fn store_entry(&self, transfer: Transfer, direction: Direction) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(existing) = self.get(&transfer.id).await? {
            let identical = existing.direction == direction
                && existing.transfer.canonical_value()? == transfer.canonical_value()?;
            if identical {
                debug!(id = %transfer.id, "identical re-store ignored");
                return Ok(());
            }
            return Err(TrustlineError::DuplicateTransfer {
                id: transfer.id.clone(),
            });
        }

        let entry = LogEntry {
            transfer,
            direction,
        };
        let encoded = serde_json::to_string(&entry)
            .map_err(|e| TrustlineError::store(format!("unencodable log entry: {e}")))?;
        self.store.put(&entry_key(&entry.transfer.id), &encoded).await?;
        self.store
            .put(&state_key(&entry.transfer.id), TransferState::Prepared.as_str())
            .await?;
        Ok(())
    }

    /// Mark the entry completed. Idempotent; a no-op for unknown ids.
    pub async fn complete(&self, id: &TransferId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.store.get(&entry_key(id)).await?.is_none() {
            debug!(%id, "complete called for unknown transfer");
            return Ok(());
        }
        self.store
            .put(&state_key(id), TransferState::Completed.as_str())
            .await?;
        Ok(())
    }

    /// Whether the entry for `id` has reached a terminal state
    pub async fn is_complete(&self, id: &TransferId) -> Result<bool> {
        Ok(self.state(id).await? == Some(TransferState::Completed))
    }

    /// Lifecycle state of the entry for `id`, if logged
    pub async fn state(&self, id: &TransferId) -> Result<Option<TransferState>> {
        match self.store.get(&state_key(id)).await? {
            Some(raw) => TransferState::parse(&raw)
                .map(Some)
                .ok_or_else(|| TrustlineError::store(format!("unreadable state {raw:?} for {id}"))),
            None => Ok(None),
        }
    }

    /// Direction assigned when the transfer was first logged
    pub async fn get_direction(&self, id: &TransferId) -> Result<Option<Direction>> {
        Ok(self.get(id).await?.map(|entry| entry.direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustline_store::MemoryStore;
    use trustline_types::Amount;

    fn log() -> TransferLog {
        TransferLog::new(Arc::new(MemoryStore::new()))
    }

    fn transfer(id: &str, amount: &str) -> Transfer {
        Transfer::new(id, "peer.alice", amount)
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let log = log();
        log.store_incoming(transfer("t1", "5")).await.unwrap();

        let entry = log.get(&"t1".into()).await.unwrap().unwrap();
        assert_eq!(entry.direction, Direction::Incoming);
        assert_eq!(entry.transfer.amount, Amount::from("5"));
        assert_eq!(log.state(&"t1".into()).await.unwrap(), Some(TransferState::Prepared));
        assert_eq!(
            log.get_direction(&"t1".into()).await.unwrap(),
            Some(Direction::Incoming)
        );
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let log = log();
        assert!(log.get(&"missing".into()).await.unwrap().is_none());
        assert!(!log.is_complete(&"missing".into()).await.unwrap());
        assert_eq!(log.get_direction(&"missing".into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_identical_restore_is_idempotent() {
        let log = log();
        log.store_outgoing(transfer("t2", "3")).await.unwrap();
        log.store_outgoing(transfer("t2", "3")).await.unwrap();
        assert_eq!(log.state(&"t2".into()).await.unwrap(), Some(TransferState::Prepared));
    }

    #[tokio::test]
    async fn test_divergent_content_is_duplicate() {
        let log = log();
        log.store_outgoing(transfer("t3", "3")).await.unwrap();

        let err = log.store_outgoing(transfer("t3", "4")).await.unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_TRANSFER");
    }

    #[tokio::test]
    async fn test_divergent_direction_is_duplicate() {
        let log = log();
        log.store_outgoing(transfer("t4", "3")).await.unwrap();

        let err = log.store_incoming(transfer("t4", "3")).await.unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_TRANSFER");
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let log = log();
        log.store_incoming(transfer("t5", "1")).await.unwrap();

        log.complete(&"t5".into()).await.unwrap();
        assert!(log.is_complete(&"t5".into()).await.unwrap());

        // Second completion is a no-op
        log.complete(&"t5".into()).await.unwrap();
        assert!(log.is_complete(&"t5".into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_complete_unknown_id_is_noop() {
        let log = log();
        log.complete(&"ghost".into()).await.unwrap();
        assert!(log.get(&"ghost".into()).await.unwrap().is_none());
        assert_eq!(log.state(&"ghost".into()).await.unwrap(), None);
    }
}
