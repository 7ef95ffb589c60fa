//! Opaque message conduit between the two peers
//!
//! The plugin never interprets the transport: it sends JSON-shaped values
//! and subscribes to whatever arrives. Real deployments put a signalling
//! relay behind this trait; tests and the demo use an in-process pair.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use trustline_types::{Result, TrustlineError};

/// Message conduit contract.
///
/// `subscribe` hands out an independent receiver of inbound payloads;
/// delivery failures map to `TrustlineError::Transport`.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    async fn send(&self, message: Value) -> Result<()>;
    fn subscribe(&self) -> broadcast::Receiver<Value>;
}

/// In-process connection pair: what one endpoint sends, the other receives.
pub struct PairedConnection {
    outbound: broadcast::Sender<Value>,
    inbound: broadcast::Sender<Value>,
}

impl PairedConnection {
    /// Create two linked endpoints
    pub fn pair() -> (Self, Self) {
        let (a, _) = broadcast::channel(256);
        let (b, _) = broadcast::channel(256);
        (
            Self {
                outbound: a.clone(),
                inbound: b.clone(),
            },
            Self {
                outbound: b,
                inbound: a,
            },
        )
    }
}

#[async_trait]
impl Connection for PairedConnection {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, message: Value) -> Result<()> {
        self.outbound
            .send(message)
            .map(|_| ())
            .map_err(|_| TrustlineError::transport("peer is not listening"))
    }

    fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.inbound.subscribe()
    }
}
