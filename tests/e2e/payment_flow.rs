//! Paying an identifier end to end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::harness::{native, TestHarness, ALICE_POLY};
use cupid_client::config::ClientConfig;
use cupid_client::devnet::{DevnetConfig, DevnetOp, DEVNET_SIGNER};
use cupid_client::payment::PaymentIntent;
use cupid_client::wallet::{Address, WalletError, WalletErrorCode};
use cupid_client::Error;
use primitive_types::U256;

/// A payment reaches the secondary address with a 20% gas margin.
#[tokio::test]
async fn test_send_pays_registered_identifier() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    let client = harness.client();
    client.connect().await.expect("connect");

    let receipt = client
        .send(&PaymentIntent::manual("@alice@cupid", "1.5"))
        .await
        .expect("send");

    let transfers = harness.devnet().transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].hash, receipt.transaction_hash);
    assert_eq!(transfers[0].recipient, Address::from(ALICE_POLY));
    assert_eq!(transfers[0].gas_limit, U256::from(63_278u64));
    assert_eq!(receipt.block_number, Some(transfers[0].block_number));
    assert_eq!(harness.balance(ALICE_POLY), native("1.5"));
    assert!(!client.is_busy());
}

/// Surrounding whitespace in the form is ignored.
#[tokio::test]
async fn test_submit_form_trims_and_resets() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    let client = harness.client();
    client.connect().await.expect("connect");

    client.set_destination("  @alice@cupid ").expect("destination");
    client.set_amount(" 0.01 ").expect("amount");
    client.submit_form().await.expect("submit");

    assert_eq!(harness.balance(ALICE_POLY), native("0.01"));
    assert_eq!(client.form().destination(), "");
    assert_eq!(client.form().amount(), "");
}

/// An empty destination is rejected without reading any contract.
#[tokio::test]
async fn test_empty_destination_touches_no_contract() {
    let harness = TestHarness::setup();
    let client = harness.client();
    client.connect().await.expect("connect");
    harness.devnet().clear_calls();

    let err = client
        .send(&PaymentIntent::manual("   ", "1"))
        .await
        .expect_err("empty destination");

    assert!(matches!(err, Error::Unregistered(_)));
    assert!(harness
        .devnet()
        .calls()
        .iter()
        .all(|op| !op.touches_contracts()));
}

/// An unknown identifier never reaches the relay.
#[tokio::test]
async fn test_unregistered_destination() {
    let harness = TestHarness::setup();
    let client = harness.client();
    client.connect().await.expect("connect");

    let err = client
        .send(&PaymentIntent::manual("@nobody@cupid", "1"))
        .await
        .expect_err("unregistered");

    assert!(matches!(err, Error::Unregistered(_)));
    assert_eq!(harness.devnet().call_count(DevnetOp::EstimateGas), 0);
    assert!(harness.devnet().transfers().is_empty());
}

/// A reverting estimate surfaces the revert reason and submits nothing.
#[tokio::test]
async fn test_gas_estimation_failure_surfaces_reason() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    let client = harness.client();
    client.connect().await.expect("connect");
    harness.devnet().fail(
        DevnetOp::EstimateGas,
        WalletError::new(
            WalletErrorCode::CallException,
            "execution reverted: Pausable: paused",
        )
        .with_reason("Pausable: paused"),
    );

    let err = client
        .send(&PaymentIntent::manual("@alice@cupid", "1"))
        .await
        .expect_err("estimate reverts");

    assert!(matches!(err, Error::GasEstimationFailed(ref reason) if reason == "Pausable: paused"));
    assert_eq!(harness.devnet().call_count(DevnetOp::Transfer), 0);
}

/// A signer that cannot cover value plus gas gets the funds message.
#[tokio::test]
async fn test_insufficient_funds() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    harness
        .devnet()
        .set_balance(&Address::from(DEVNET_SIGNER), U256::from(1_000u64));
    let client = harness.client();
    client.connect().await.expect("connect");

    let err = client
        .send(&PaymentIntent::manual("@alice@cupid", "1"))
        .await
        .expect_err("insufficient funds");

    assert!(matches!(err, Error::InsufficientFunds(_)));
    assert_eq!(
        err.user_message(),
        "Insufficient funds to complete the transaction"
    );
}

/// Rejecting in the wallet is reported as a cancellation.
#[tokio::test]
async fn test_user_rejects_transfer() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    let client = harness.client();
    client.connect().await.expect("connect");
    harness.devnet().fail(
        DevnetOp::Transfer,
        WalletError::new(WalletErrorCode::ActionRejected, "user rejected transaction"),
    );

    let err = client
        .send(&PaymentIntent::manual("@alice@cupid", "1"))
        .await
        .expect_err("rejected");

    assert!(matches!(err, Error::UserRejected));
    assert_eq!(err.user_message(), "Transaction was cancelled in the wallet");
    assert!(!client.is_busy());
}

/// A payment with no confirmation in time fails with the hash attached.
#[tokio::test(start_paused = true)]
async fn test_confirmation_timeout() {
    let mut config = ClientConfig::default();
    config.payment.confirmation_timeout_secs = Some(30);
    let harness = TestHarness::setup_with_configs(DevnetConfig::default(), config);
    harness.seed_alice();
    harness.devnet().stall_confirmations(true);
    let client = harness.client();
    client.connect().await.expect("connect");

    let err = client
        .send(&PaymentIntent::manual("@alice@cupid", "1"))
        .await
        .expect_err("timeout");

    let hash = harness.devnet().transfers()[0].hash.clone();
    assert!(matches!(err, Error::TransportError(ref msg) if msg.contains(&hash)));
}

/// A second payment is refused while the first awaits confirmation.
#[tokio::test]
async fn test_second_payment_is_busy() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    harness.devnet().stall_confirmations(true);
    let client = harness.client();
    client.connect().await.expect("connect");

    let intent = PaymentIntent::manual("@alice@cupid", "1");
    let first = client.send(&intent);
    tokio::pin!(first);

    let second = tokio::select! {
        biased;
        _ = &mut first => panic!("confirmation is stalled"),
        second = async {
            tokio::task::yield_now().await;
            assert!(client.is_busy());
            client.send(&intent).await
        } => second,
    };

    assert!(matches!(second, Err(Error::Busy)));
    assert_eq!(harness.devnet().call_count(DevnetOp::Transfer), 1);
}
