//! The trustline ledger state machine
//!
//! Consumes inbound wire messages, drives the balance and the transfer log,
//! and answers the peer over the connection. One inbound handler runs at a
//! time; balance and per-id log mutations are serialized critical sections,
//! so partial state is never observable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use trustline_ledger::{Balance, LogEntry, TransferLog};
use trustline_store::Store;
use trustline_types::{Direction, Message, Result, Transfer, TransferId, TrustlineError};

use crate::{ConditionValidator, Connection, LedgerInfo, PluginConfig, PluginEvent};

const ACCEPT_MESSAGE: &str = "transfer accepted";

/// A bilateral virtual ledger endpoint.
///
/// Cheap to clone; all state is shared. Call [`Plugin::connect`] to start
/// consuming peer messages, [`Plugin::subscribe`] to observe events.
#[derive(Clone)]
pub struct Plugin {
    inner: Arc<Inner>,
}

struct Inner {
    config: PluginConfig,
    balance: Balance,
    transfers: TransferLog,
    connection: Arc<dyn Connection>,
    validator: Arc<dyn ConditionValidator>,
    events: broadcast::Sender<PluginEvent>,
    connected: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Plugin {
    pub fn new(
        config: PluginConfig,
        store: Arc<dyn Store>,
        connection: Arc<dyn Connection>,
        validator: Arc<dyn ConditionValidator>,
    ) -> Self {
        let balance = Balance::new(store.clone(), config.min_balance(), config.max_balance());
        let transfers = TransferLog::new(store);
        let (events, _) = broadcast::channel(256);

        Self {
            inner: Arc::new(Inner {
                config,
                balance,
                transfers,
                connection,
                validator,
                events,
                connected: AtomicBool::new(false),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Bring the transport up and start the receive loop
    pub async fn connect(&self) -> Result<()> {
        self.inner.connection.connect().await?;

        let mut inbound = self.inner.connection.subscribe();
        let receiver = self.inner.clone();
        let receive_task = tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok(value) => receiver.handle_receive(value).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "receive loop lagged behind the connection");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut changes = self.inner.balance.subscribe();
        let forwarder = self.inner.clone();
        let balance_task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(balance) => forwarder.emit(PluginEvent::BalanceChanged { balance }),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut tasks = self.inner.tasks.lock().await;
        tasks.push(receive_task);
        tasks.push(balance_task);
        drop(tasks);

        self.inner.connected.store(true, Ordering::SeqCst);
        self.inner.emit(PluginEvent::Connected);
        Ok(())
    }

    /// Stop the receive loop and bring the transport down
    pub async fn disconnect(&self) -> Result<()> {
        for task in self.inner.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.inner.connection.disconnect().await?;
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.emit(PluginEvent::Disconnected);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Current trustline balance
    pub async fn get_balance(&self) -> Result<Decimal> {
        self.inner.balance.get().await
    }

    /// Currency metadata; pass-through from configuration
    pub fn get_info(&self) -> LedgerInfo {
        self.inner.config.info.clone()
    }

    pub fn config(&self) -> &PluginConfig {
        &self.inner.config
    }

    /// Subscribe to plugin events
    pub fn subscribe(&self) -> broadcast::Receiver<PluginEvent> {
        self.inner.events.subscribe()
    }

    /// Propose an outgoing transfer to the peer.
    ///
    /// The balance is not touched here: for unconditional transfers the
    /// peer's acknowledge is authoritative, and conditional transfers debit
    /// only on execute.
    pub async fn send_transfer(&self, transfer: Transfer) -> Result<()> {
        self.inner.transfers.store_outgoing(transfer.clone()).await?;
        self.inner.send_message(&Message::Transfer { transfer }).await
    }

    /// Present a fulfillment for a conditional transfer, apply it locally,
    /// and forward it to the peer.
    pub async fn fulfill_condition(&self, id: &TransferId, fulfillment: &str) -> Result<()> {
        let entry = self.inner.require_entry(id).await?;
        self.inner.resolve_condition(entry, fulfillment, true).await
    }

    /// Send an informational reply referencing a known transfer
    pub async fn reply_to_transfer(&self, id: &TransferId, message: &str) -> Result<()> {
        let entry = self.inner.require_entry(id).await?;
        self.inner
            .send_message(&Message::Reply {
                transfer: entry.transfer,
                message: message.to_string(),
            })
            .await
    }
}

impl Inner {
    fn emit(&self, event: PluginEvent) {
        debug!(event = %event.summary(), "plugin event");
        // Ignore send errors (no receivers)
        let _ = self.events.send(event);
    }

    fn emit_error(&self, error: &TrustlineError) {
        self.emit(PluginEvent::Error {
            code: error.error_code().to_string(),
            message: error.to_string(),
        });
    }

    async fn require_entry(&self, id: &TransferId) -> Result<LogEntry> {
        self.transfers
            .get(id)
            .await?
            .ok_or_else(|| TrustlineError::UnknownTransfer { id: id.clone() })
    }

    async fn send_message(&self, message: &Message) -> Result<()> {
        self.connection.send(message.to_value()?).await
    }

    async fn handle_receive(&self, value: Value) {
        let message = match Message::from_value(value) {
            Ok(message) => message,
            Err(error) => {
                self.emit_error(&error);
                return;
            }
        };

        let result = match message {
            Message::Transfer { transfer } => self.handle_transfer(transfer).await,
            Message::Acknowledge { transfer, message } => {
                self.handle_acknowledge(transfer, message).await
            }
            Message::Reject { transfer, message } => self.handle_reject(transfer, message).await,
            Message::Reply { transfer, message } => {
                self.emit(PluginEvent::Reply { transfer, message });
                Ok(())
            }
            Message::Fulfillment { transfer, fulfillment } => {
                self.handle_fulfillment(transfer, fulfillment).await
            }
        };

        if let Err(error) = result {
            self.emit_error(&error);
        }
    }

    /// Incoming `transfer`: record, validate, then accept or reject.
    async fn handle_transfer(&self, transfer: Transfer) -> Result<()> {
        if self.transfers.get(&transfer.id).await?.is_some() {
            self.emit(PluginEvent::RepeatTransfer {
                transfer_id: transfer.id.clone(),
            });
            self.send_reject(&transfer, "repeat transfer id").await?;
            return Err(TrustlineError::DuplicateTransfer { id: transfer.id });
        }

        self.transfers.store_incoming(transfer.clone()).await?;
        self.emit(PluginEvent::Incoming {
            transfer: transfer.clone(),
        });

        let amount = match transfer.amount.positive_value() {
            Ok(amount) => amount,
            Err(_) => return self.reject_incoming(&transfer, "invalid amount").await,
        };
        if !self.balance.is_valid_incoming(amount).await? {
            return self.reject_incoming(&transfer, "credit limit exceeded").await;
        }

        if transfer.is_conditional() {
            // Acknowledge without moving the balance; funds move on execute
            self.send_acknowledge(&transfer).await
        } else {
            match self.balance.add(amount).await {
                Ok(_) => {}
                Err(TrustlineError::OverLimit { .. }) => {
                    return self.reject_incoming(&transfer, "credit limit exceeded").await;
                }
                Err(error) => return Err(error),
            }
            self.transfers.complete(&transfer.id).await?;
            self.send_acknowledge(&transfer).await
        }
    }

    /// Incoming `acknowledge`: the peer accepted one of our transfers.
    ///
    /// The acknowledge is false unless it matches a known, still-open
    /// outgoing transfer byte-for-byte in canonical form.
    async fn handle_acknowledge(&self, transfer: Transfer, message: String) -> Result<()> {
        let stored = self.transfers.get(&transfer.id).await?;
        let completed = self.transfers.is_complete(&transfer.id).await?;
        let valid = match &stored {
            Some(entry) => {
                entry.direction == Direction::Outgoing
                    && !completed
                    && entry.transfer.canonical_value()? == transfer.canonical_value()?
            }
            None => false,
        };
        let entry = match (valid, stored) {
            (true, Some(entry)) => entry,
            _ => {
                self.emit(PluginEvent::FalseAcknowledge {
                    transfer_id: transfer.id.clone(),
                });
                return Err(TrustlineError::FalseAcknowledge { id: transfer.id });
            }
        };

        if !entry.transfer.is_conditional() {
            let amount = entry.transfer.amount.positive_value()?;
            self.balance.sub(amount).await?;
            self.transfers.complete(&entry.transfer.id).await?;
        }

        self.emit(PluginEvent::Accept {
            transfer: entry.transfer,
            message,
        });
        Ok(())
    }

    /// Incoming `reject`: the peer refused one of our transfers.
    async fn handle_reject(&self, transfer: Transfer, message: String) -> Result<()> {
        if self.transfers.get(&transfer.id).await?.is_some() {
            if self.transfers.is_complete(&transfer.id).await? {
                debug!(id = %transfer.id, "reject for completed transfer ignored");
            } else {
                self.transfers.complete(&transfer.id).await?;
            }
        }
        self.emit(PluginEvent::Reject { transfer, message });
        Ok(())
    }

    /// Incoming `fulfillment`: resolve locally, never echo back.
    async fn handle_fulfillment(&self, transfer: Transfer, fulfillment: String) -> Result<()> {
        let entry = self.require_entry(&transfer.id).await?;
        self.emit(PluginEvent::Fulfillment {
            transfer: entry.transfer.clone(),
            fulfillment: fulfillment.clone(),
        });
        self.resolve_condition(entry, &fulfillment, false).await
    }

    /// Execute or cancel a conditional transfer.
    ///
    /// Only the execute branch moves the balance (credit incoming, debit
    /// outgoing); cancel completes the entry with no balance change. A
    /// fulfillment for an already-completed transfer is a no-op: completed
    /// entries never reopen and the balance moves at most once per id.
    async fn resolve_condition(
        &self,
        entry: LogEntry,
        fulfillment: &str,
        forward: bool,
    ) -> Result<()> {
        let transfer = entry.transfer;
        let execution = transfer
            .execution_condition
            .clone()
            .ok_or_else(|| TrustlineError::NotConditional {
                id: transfer.id.clone(),
            })?;

        if self.transfers.is_complete(&transfer.id).await? {
            debug!(id = %transfer.id, "fulfillment for completed transfer ignored");
            return Ok(());
        }

        if self.validator.validate(fulfillment, &execution) {
            let amount = transfer.amount.positive_value()?;
            match entry.direction {
                Direction::Incoming => self.balance.add(amount).await?,
                Direction::Outgoing => self.balance.sub(amount).await?,
            };
            self.transfers.complete(&transfer.id).await?;
            self.emit(PluginEvent::FulfillExecutionCondition {
                transfer: transfer.clone(),
                fulfillment: fulfillment.to_string(),
            });
            if forward {
                self.send_message(&Message::Fulfillment {
                    transfer,
                    fulfillment: fulfillment.to_string(),
                })
                .await?;
            }
            return Ok(());
        }

        let cancels = transfer
            .cancellation_condition
            .as_deref()
            .map_or(false, |condition| self.validator.validate(fulfillment, condition));
        if cancels {
            self.transfers.complete(&transfer.id).await?;
            self.emit(PluginEvent::FulfillCancellationCondition {
                transfer: transfer.clone(),
                fulfillment: fulfillment.to_string(),
            });
            if forward {
                self.send_message(&Message::Fulfillment {
                    transfer,
                    fulfillment: fulfillment.to_string(),
                })
                .await?;
            }
            return Ok(());
        }

        Err(TrustlineError::InvalidFulfillment { id: transfer.id })
    }

    /// Completion must succeed before the reject leaves this node
    async fn reject_incoming(&self, transfer: &Transfer, reason: &str) -> Result<()> {
        self.transfers.complete(&transfer.id).await?;
        self.send_reject(transfer, reason).await
    }

    async fn send_acknowledge(&self, transfer: &Transfer) -> Result<()> {
        self.send_message(&Message::Acknowledge {
            transfer: transfer.clone(),
            message: ACCEPT_MESSAGE.to_string(),
        })
        .await
    }

    async fn send_reject(&self, transfer: &Transfer, reason: &str) -> Result<()> {
        self.send_message(&Message::Reject {
            transfer: transfer.clone(),
            message: reason.to_string(),
        })
        .await
    }
}
