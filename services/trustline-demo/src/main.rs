//! Trustline Demo - two peers sharing a credit line in one process
//!
//! Wires two plugins back-to-back over an in-process connection pair and
//! walks through the protocol: an unconditional payment, an over-limit
//! rejection, and a conditional payment settled with a preimage.
//!
//! ```bash
//! # Run with defaults (limit 10)
//! trustline-demo
//!
//! # Custom credit limit and payment size
//! trustline-demo --limit 50 --amount 12
//! ```

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trustline_plugin::{PairedConnection, Plugin, PluginConfig, PreimageValidator};
use trustline_store::MemoryStore;
use trustline_types::Transfer;

/// Trustline Demo - bilateral virtual ledger walkthrough
#[derive(Parser, Debug)]
#[command(
    name = "trustline-demo",
    about = "Run two trustline peers against each other in one process",
    version
)]
struct Args {
    /// Credit each peer extends to the other
    #[arg(long, default_value = "10", env = "TRUSTLINE_LIMIT")]
    limit: String,

    /// Amount of the unconditional payment
    #[arg(long, default_value = "5", env = "TRUSTLINE_AMOUNT")]
    amount: String,

    /// Signalling room label (cosmetic in the in-process demo)
    #[arg(long, default_value = "demo-room")]
    room: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let limit = Decimal::from_str(&args.limit).context("limit is not a decimal")?;
    let amount = Decimal::from_str(&args.amount).context("amount is not a decimal")?;

    let (left, right) = PairedConnection::pair();
    let alice = Plugin::new(
        PluginConfig::new("alice", &args.room, "in-process", limit),
        Arc::new(MemoryStore::new()),
        Arc::new(left),
        Arc::new(PreimageValidator),
    );
    let bob = Plugin::new(
        PluginConfig::new("bob", &args.room, "in-process", limit),
        Arc::new(MemoryStore::new()),
        Arc::new(right),
        Arc::new(PreimageValidator),
    );

    spawn_event_logger("alice", &alice);
    spawn_event_logger("bob", &bob);

    alice.connect().await?;
    bob.connect().await?;
    info!("both peers connected, limit {limit}");

    // 1. Unconditional payment from alice to bob
    alice
        .send_transfer(Transfer::new("demo-pay", "bob", amount.to_string()))
        .await?;
    settle().await;
    report(&alice, &bob).await?;

    // 2. A payment past the credit limit gets rejected by the receiver
    alice
        .send_transfer(Transfer::new(
            "demo-too-big",
            "bob",
            (limit + limit).to_string(),
        ))
        .await?;
    settle().await;
    report(&alice, &bob).await?;

    // 3. Conditional payment settled when bob reveals the preimage
    let condition = PreimageValidator::condition_for("demo-preimage");
    alice
        .send_transfer(Transfer::new("demo-cond", "bob", "1").with_execution_condition(condition))
        .await?;
    settle().await;
    bob.fulfill_condition(&"demo-cond".into(), "demo-preimage")
        .await?;
    settle().await;
    report(&alice, &bob).await?;

    alice.disconnect().await?;
    bob.disconnect().await?;
    info!("demo complete");
    Ok(())
}

fn spawn_event_logger(name: &'static str, plugin: &Plugin) {
    let mut events = plugin.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(peer = name, "{}", event.summary());
        }
    });
}

/// Give the in-process message loops a moment to drain
async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}

async fn report(alice: &Plugin, bob: &Plugin) -> anyhow::Result<()> {
    info!(
        alice = %alice.get_balance().await?,
        bob = %bob.get_balance().await?,
        "balances"
    );
    Ok(())
}
