//! Requesting payment and paying a request across two accounts.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::harness::{native, TestHarness, ALICE_POLY, BOB_ETH};
use cupid_client::devnet::DevnetOp;
use cupid_client::identity::Identifier;
use cupid_client::wallet::{WalletError, WalletErrorCode};
use cupid_client::{Error, RequestStatus};

fn alice() -> Identifier {
    Identifier::parse("@alice@cupid").expect("identifier")
}

fn bob() -> Identifier {
    Identifier::parse("@bob@cupid").expect("identifier")
}

/// Alice asks Bob for 0.25; Bob sees it, pays it, and it is completed.
#[tokio::test]
async fn test_request_then_pay() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    harness.seed_bob();
    let client = harness.client();
    client.connect().await.expect("connect");

    let request = client
        .request_payment("@bob@cupid", &alice(), "0.25")
        .await
        .expect("request");
    assert_eq!(request.status, RequestStatus::Pending);
    assert!(harness.requests_path().exists());

    harness.act_as(BOB_ETH);
    let pending = client.my_pending_requests().await.expect("pending");
    assert_eq!(pending, vec![request.clone()]);

    let receipt = client.pay_request(request).await.expect("pay");
    assert_eq!(harness.devnet().transfers()[0].hash, receipt.transaction_hash);
    assert_eq!(harness.balance(ALICE_POLY), native("0.25"));

    let stored = client.all_requests().await.expect("requests");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, RequestStatus::Completed);
    assert!(client.pending_requests_for(&bob()).await.expect("pending").is_empty());
    assert!(!client.form().is_locked());
}

/// Requests survive a restart of the client.
#[tokio::test]
async fn test_requests_persist_across_clients() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    let client = harness.client();
    client.connect().await.expect("connect");

    client
        .request_payment("@bob@cupid", &alice(), "3")
        .await
        .expect("request");

    let reopened = harness.reopen();
    let pending = reopened.pending_requests_for(&bob()).await.expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].amount, "3");
    assert_eq!(pending[0].to_id, alice());
}

/// A failed payment leaves the request pending and the form bound to it.
#[tokio::test]
async fn test_failed_payment_keeps_request_pending() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    harness.seed_bob();
    let client = harness.client();
    client.connect().await.expect("connect");
    let request = client
        .request_payment("@bob@cupid", &alice(), "1")
        .await
        .expect("request");

    harness.act_as(BOB_ETH);
    harness.devnet().fail(
        DevnetOp::EstimateGas,
        WalletError::new(WalletErrorCode::CallException, "execution reverted")
            .with_reason("Payment amount must be greater than 0"),
    );

    let err = client.pay_request(request).await.expect_err("estimate fails");
    assert!(matches!(err, Error::GasEstimationFailed(_)));

    let stored = client.all_requests().await.expect("requests");
    assert_eq!(stored[0].status, RequestStatus::Pending);
    assert!(client.form().is_locked());
    assert!(matches!(
        client.set_amount("5"),
        Err(Error::IntentLocked(_))
    ));

    client.cancel_request();
    assert!(!client.form().is_locked());
}

/// Only identifiers held by the connected account can be paid into.
#[tokio::test]
async fn test_request_into_foreign_identifier_rejected() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    harness.seed_bob();
    let client = harness.client();
    client.connect().await.expect("connect");

    let err = client
        .request_payment("@alice@cupid", &bob(), "1")
        .await
        .expect_err("not owned");
    assert!(matches!(err, Error::InvalidRequest(_)));

    let err = client
        .request_payment("bob", &alice(), "1")
        .await
        .expect_err("malformed payer");
    assert!(matches!(err, Error::InvalidIdentifier(_)));

    assert!(client.all_requests().await.expect("requests").is_empty());
}
