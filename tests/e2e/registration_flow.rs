//! Registering and updating identifiers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::harness::{TestHarness, ALICE_ETH, BOB_ETH};
use cupid_client::identity::Identifier;
use cupid_client::wallet::Address;
use cupid_client::Error;

const CAROL_POLY: &str = "0x00000000000000000000000000000000000000c2";
const CAROL_POLY_NEW: &str = "0x00000000000000000000000000000000000000c3";

fn carol() -> Identifier {
    Identifier::parse("@carol@cupid").expect("identifier")
}

/// A new identifier resolves and is listed as the signer's.
#[tokio::test]
async fn test_register_then_resolve() {
    let harness = TestHarness::setup();
    let client = harness.client();
    client.connect().await.expect("connect");

    let receipt = client
        .register_identifier("@carol@cupid", ALICE_ETH, CAROL_POLY)
        .await
        .expect("register");
    assert!(receipt.block_number.is_some());

    assert_eq!(
        client.resolve(&carol()).await.expect("resolve"),
        Address::from(CAROL_POLY)
    );
    let mine = client.my_identifiers().await.expect("mine");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, carol());
    assert!(client.resolve_cached(&carol()).is_some());
}

/// An identifier already in the window cannot be registered again.
#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    let client = harness.client();
    client.connect().await.expect("connect");

    let err = client
        .register_identifier("@alice@cupid", ALICE_ETH, CAROL_POLY)
        .await
        .expect_err("duplicate");
    assert!(matches!(err, Error::AlreadyRegistered(_)));

    let err = client
        .register_identifier("carol", ALICE_ETH, CAROL_POLY)
        .await
        .expect_err("malformed");
    assert!(matches!(err, Error::InvalidIdentifier(_)));

    let err = client
        .register_identifier("@carol@cupid", "0x1234", CAROL_POLY)
        .await
        .expect_err("bad address");
    assert!(matches!(err, Error::InvalidAddress(_)));
}

/// The holder can repoint an identifier; anyone else cannot.
#[tokio::test]
async fn test_update_addresses_requires_ownership() {
    let harness = TestHarness::setup();
    let client = harness.client();
    client.connect().await.expect("connect");
    client
        .register_identifier("@carol@cupid", ALICE_ETH, CAROL_POLY)
        .await
        .expect("register");

    client
        .update_addresses(&carol(), ALICE_ETH, CAROL_POLY_NEW)
        .await
        .expect("update");
    assert_eq!(
        client.resolve(&carol()).await.expect("resolve"),
        Address::from(CAROL_POLY_NEW)
    );

    harness.act_as(BOB_ETH);
    let err = client
        .update_addresses(&carol(), BOB_ETH, BOB_ETH)
        .await
        .expect_err("not owner");
    assert!(matches!(err, Error::NotOwner(_)));
}

/// Registrations list newest first.
#[tokio::test]
async fn test_registered_identifiers_newest_first() {
    let harness = TestHarness::setup();
    harness.seed_alice();
    harness.seed_bob();

    let ids: Vec<String> = harness
        .client()
        .registered_identifiers()
        .await
        .into_iter()
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(ids, vec!["@bob@cupid", "@alice@cupid"]);
}
