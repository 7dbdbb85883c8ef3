//! Test harness: a client wired to an in-process devnet with a file-backed
//! request store in a temporary directory.

#![allow(clippy::expect_used)]

use cupid_client::config::ClientConfig;
use cupid_client::devnet::{Devnet, DevnetConfig};
use cupid_client::requests::JsonFileStore;
use cupid_client::wallet::Address;
use cupid_client::CupidClient;
use primitive_types::U256;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Primary address of the first test account (the devnet signer).
pub const ALICE_ETH: &str = "0x00000000000000000000000000000000000000a1";

/// Secondary address registered for `@alice@cupid`.
pub const ALICE_POLY: &str = "0x00000000000000000000000000000000000000a2";

/// Second test account.
pub const BOB_ETH: &str = "0x00000000000000000000000000000000000000b1";

/// Secondary address registered for `@bob@cupid`.
pub const BOB_POLY: &str = "0x00000000000000000000000000000000000000b2";

/// A devnet, a client on it, and the directory holding its request store.
pub struct TestHarness {
    devnet: Devnet,
    client: CupidClient,
    config: ClientConfig,
    _temp_dir: TempDir,
}

impl TestHarness {
    /// Devnet with default settings; the wallet starts on the right chain.
    pub fn setup() -> Self {
        Self::setup_with(DevnetConfig::default())
    }

    /// Devnet with custom settings.
    pub fn setup_with(devnet_config: DevnetConfig) -> Self {
        Self::setup_with_configs(devnet_config, ClientConfig::default())
    }

    /// Devnet and client with custom settings.
    pub fn setup_with_configs(devnet_config: DevnetConfig, mut config: ClientConfig) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        config.data_dir = temp_dir.path().to_path_buf();

        let devnet = Devnet::new(devnet_config).expect("start devnet");
        let client = Self::client_for(&devnet, config.clone());
        Self {
            devnet,
            client,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// A fresh client over the same chain and request store, as if the app
    /// were reopened.
    pub fn reopen(&self) -> CupidClient {
        Self::client_for(&self.devnet, self.config.clone())
    }

    fn client_for(devnet: &Devnet, config: ClientConfig) -> CupidClient {
        let store = Arc::new(JsonFileStore::new(config.requests_path()));
        CupidClient::new(
            config,
            devnet.provider(),
            devnet.registry(),
            devnet.relay(),
            store,
        )
        .expect("create client")
    }

    /// The simulated chain.
    pub fn devnet(&self) -> &Devnet {
        &self.devnet
    }

    /// The client under test.
    pub fn client(&self) -> &CupidClient {
        &self.client
    }

    /// Path of the request store file.
    pub fn requests_path(&self) -> PathBuf {
        self.config.requests_path()
    }

    /// Register `@alice@cupid` to the signer without going through the client.
    pub fn seed_alice(&self) {
        self.devnet
            .seed_registration("@alice@cupid", ALICE_ETH, ALICE_POLY);
    }

    /// Register `@bob@cupid` to the second account.
    pub fn seed_bob(&self) {
        self.devnet.seed_registration("@bob@cupid", BOB_ETH, BOB_POLY);
    }

    /// Switch the wallet to `account`, funding it with 10 native units.
    pub fn act_as(&self, account: &str) {
        let address = Address::from(account);
        self.devnet.set_balance(&address, U256::exp10(19));
        self.devnet.user_set_accounts(vec![address]);
    }

    /// Native balance of `address` in base units.
    pub fn balance(&self, address: &str) -> U256 {
        self.devnet.balance_of(&Address::from(address))
    }
}

/// `amount` native units in base units.
pub fn native(amount: &str) -> U256 {
    cupid_client::payment::parse_native_amount(amount).expect("amount")
}
