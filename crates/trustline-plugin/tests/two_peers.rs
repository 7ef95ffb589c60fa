//! End-to-end tests: two plugins over one connection pair.
//!
//! Each side keeps its own store and its own view of the balance; these
//! tests check that both views converge after the protocol settles.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;
use tokio::time::timeout;

use trustline_plugin::{
    PairedConnection, Plugin, PluginConfig, PluginEvent, PreimageValidator,
};
use trustline_store::MemoryStore;
use trustline_types::Transfer;

async fn peers(limit: Decimal) -> (Plugin, Plugin) {
    let (left, right) = PairedConnection::pair();

    let alice = Plugin::new(
        PluginConfig::new("alice", "room-1", "wss://relay.example", limit),
        Arc::new(MemoryStore::new()),
        Arc::new(left),
        Arc::new(PreimageValidator),
    );
    let bob = Plugin::new(
        PluginConfig::new("bob", "room-1", "wss://relay.example", limit),
        Arc::new(MemoryStore::new()),
        Arc::new(right),
        Arc::new(PreimageValidator),
    );

    alice.connect().await.unwrap();
    bob.connect().await.unwrap();
    (alice, bob)
}

async fn wait_for(
    events: &mut broadcast::Receiver<PluginEvent>,
    matcher: impl Fn(&PluginEvent) -> bool,
) -> PluginEvent {
    loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed");
        if matcher(&event) {
            return event;
        }
    }
}

#[tokio::test]
async fn unconditional_transfer_converges_on_both_sides() {
    let (alice, bob) = peers(dec!(10)).await;
    let mut alice_events = alice.subscribe();
    let mut bob_events = bob.subscribe();

    alice
        .send_transfer(Transfer::new("pay-1", "bob", "5"))
        .await
        .unwrap();

    wait_for(&mut bob_events, |e| matches!(e, PluginEvent::Incoming { .. })).await;
    wait_for(&mut alice_events, |e| matches!(e, PluginEvent::Accept { .. })).await;

    // Mirror views of the same trustline
    assert_eq!(alice.get_balance().await.unwrap(), dec!(-5));
    assert_eq!(bob.get_balance().await.unwrap(), dec!(5));
}

#[tokio::test]
async fn over_limit_transfer_is_rejected_by_the_receiver() {
    let (alice, bob) = peers(dec!(10)).await;
    let mut alice_events = alice.subscribe();

    alice
        .send_transfer(Transfer::new("pay-big", "bob", "12"))
        .await
        .unwrap();

    let event = wait_for(&mut alice_events, |e| matches!(e, PluginEvent::Reject { .. })).await;
    match event {
        PluginEvent::Reject { message, .. } => assert_eq!(message, "credit limit exceeded"),
        _ => unreachable!(),
    }

    assert_eq!(alice.get_balance().await.unwrap(), Decimal::ZERO);
    assert_eq!(bob.get_balance().await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn conditional_transfer_settles_when_the_receiver_fulfills() {
    let (alice, bob) = peers(dec!(10)).await;
    let mut alice_events = alice.subscribe();
    let mut bob_events = bob.subscribe();

    let condition = PreimageValidator::condition_for("invoice-42");
    alice
        .send_transfer(Transfer::new("cond-1", "bob", "4").with_execution_condition(condition))
        .await
        .unwrap();

    wait_for(&mut bob_events, |e| matches!(e, PluginEvent::Incoming { .. })).await;
    wait_for(&mut alice_events, |e| matches!(e, PluginEvent::Accept { .. })).await;

    // Acknowledged, not yet settled
    assert_eq!(alice.get_balance().await.unwrap(), Decimal::ZERO);
    assert_eq!(bob.get_balance().await.unwrap(), Decimal::ZERO);

    // Bob presents the preimage: credits himself and forwards to Alice
    bob.fulfill_condition(&"cond-1".into(), "invoice-42")
        .await
        .unwrap();

    wait_for(&mut alice_events, |e| {
        matches!(e, PluginEvent::FulfillExecutionCondition { .. })
    })
    .await;

    assert_eq!(alice.get_balance().await.unwrap(), dec!(-4));
    assert_eq!(bob.get_balance().await.unwrap(), dec!(4));
}

#[tokio::test]
async fn cancelled_conditional_transfer_moves_no_funds() {
    let (alice, bob) = peers(dec!(10)).await;
    let mut alice_events = alice.subscribe();
    let mut bob_events = bob.subscribe();

    let execution = PreimageValidator::condition_for("never-revealed");
    let cancellation = PreimageValidator::condition_for("call-it-off");
    alice
        .send_transfer(
            Transfer::new("cond-2", "bob", "4")
                .with_execution_condition(execution)
                .with_cancellation_condition(cancellation),
        )
        .await
        .unwrap();

    wait_for(&mut bob_events, |e| matches!(e, PluginEvent::Incoming { .. })).await;
    wait_for(&mut alice_events, |e| matches!(e, PluginEvent::Accept { .. })).await;

    bob.fulfill_condition(&"cond-2".into(), "call-it-off")
        .await
        .unwrap();

    wait_for(&mut alice_events, |e| {
        matches!(e, PluginEvent::FulfillCancellationCondition { .. })
    })
    .await;

    assert_eq!(alice.get_balance().await.unwrap(), Decimal::ZERO);
    assert_eq!(bob.get_balance().await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn balances_stay_within_limits_over_a_message_burst() {
    let (alice, bob) = peers(dec!(10)).await;
    let mut alice_events = alice.subscribe();

    let limit = dec!(10);
    for i in 0..6 {
        alice
            .send_transfer(Transfer::new(format!("burst-{i}"), "bob", "3"))
            .await
            .unwrap();
    }

    // 3 transfers fit under the limit, the rest are rejected
    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..6 {
        let event = wait_for(&mut alice_events, |e| {
            matches!(e, PluginEvent::Accept { .. } | PluginEvent::Reject { .. })
        })
        .await;
        match event {
            PluginEvent::Accept { .. } => accepted += 1,
            PluginEvent::Reject { .. } => rejected += 1,
            _ => unreachable!(),
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(rejected, 3);

    let bob_balance = bob.get_balance().await.unwrap();
    assert_eq!(bob_balance, dec!(9));
    assert!(bob_balance <= limit);
    assert_eq!(alice.get_balance().await.unwrap(), dec!(-9));
}
