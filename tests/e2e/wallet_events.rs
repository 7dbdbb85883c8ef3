//! Network switching and wallet notifications.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::harness::{TestHarness, BOB_ETH};
use cupid_client::config::AMOY_CHAIN_ID;
use cupid_client::devnet::{DevnetConfig, DevnetOp};
use cupid_client::payment::PaymentIntent;
use cupid_client::wallet::Address;
use cupid_client::{Error, PaymentRequest, WalletEvent};

/// A wallet that has never seen the chain gets it added on connect.
#[tokio::test]
async fn test_connect_adds_unknown_chain() {
    let harness = TestHarness::setup_with(DevnetConfig::unknown_chain());
    let client = harness.client();

    client.connect().await.expect("connect");

    let calls = harness.devnet().calls();
    assert!(calls.contains(&DevnetOp::SwitchChain));
    assert!(calls.contains(&DevnetOp::AddChain));
    assert!(client.session().is_connected());
    assert_eq!(client.session().chain_id(), Some(AMOY_CHAIN_ID));
}

/// Read-only views refuse the wrong chain; payments switch back.
#[tokio::test]
async fn test_user_leaves_required_chain() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    let client = harness.client();
    client.connect().await.expect("connect");

    harness.devnet().user_switch_chain(1);

    let err = client.my_identifiers().await.expect_err("wrong chain");
    assert!(matches!(err, Error::NetworkMismatch(_)));

    client
        .send(&PaymentIntent::manual("@alice@cupid", "1"))
        .await
        .expect("send switches back");
    assert!(client.my_identifiers().await.is_ok());
}

/// An account change clears a selected request and rebuilds the index.
#[tokio::test]
async fn test_account_change_clears_selected_request() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    let client = harness.client();
    client.connect().await.expect("connect");
    let mut events = client.wallet_events().expect("devnet notifies");

    let request = PaymentRequest::new(
        "@bob@cupid".into(),
        "@alice@cupid".into(),
        "1",
        1_700_000_000_000,
    );
    client.select_request(request);
    harness.devnet().clear_calls();

    harness.devnet().user_set_accounts(vec![Address::from(BOB_ETH)]);
    let event = events.recv().await.expect("event");
    assert_eq!(event, WalletEvent::AccountsChanged(vec![Address::from(BOB_ETH)]));

    let outcome = client.apply_wallet_event(&event).await;
    assert!(outcome.reload_index);
    assert!(!client.form().is_locked());
    assert_eq!(harness.devnet().call_count(DevnetOp::RegisteredEvents), 1);
}

/// A disconnect drops the session and the form.
#[tokio::test]
async fn test_disconnect() {
    let harness = TestHarness::setup();
    let client = harness.client();
    client.connect().await.expect("connect");
    let mut events = client.wallet_events().expect("devnet notifies");
    client.set_destination("@alice@cupid").expect("destination");

    harness.devnet().user_disconnect();
    let event = events.recv().await.expect("event");
    let outcome = client.apply_wallet_event(&event).await;

    assert!(!outcome.connected);
    assert!(!client.session().is_connected());
    assert_eq!(client.form().destination(), "");
}
