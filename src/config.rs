//! Configuration for cupid-client.

use crate::wallet::{ChainDescriptor, NativeCurrency};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Polygon Amoy testnet chain id.
pub const AMOY_CHAIN_ID: u64 = 80_002;

/// Default identity registry deployment on Amoy.
pub const DEFAULT_REGISTRY_ADDRESS: &str = "0x28ae9184FE0dB8043c46BABA7B0F5537Ef006936";

/// Default payment relay deployment on Amoy.
pub const DEFAULT_PAYMENT_ADDRESS: &str = "0xFFCdb0585811ac285611e78B3b4448EFf30077ab";

/// File name of the payment request store inside the data directory.
const REQUESTS_FILE_NAME: &str = "payment_requests.json";

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Directory for local client data (the request store).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Required network.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Contract deployments.
    #[serde(default)]
    pub contracts: ContractsConfig,

    /// Registration event scanning.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Payment submission.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// The single network the client operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Required chain id.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Display name used when asking a wallet to add the chain.
    #[serde(default = "default_chain_name")]
    pub chain_name: String,

    /// Native currency display name.
    #[serde(default = "default_currency")]
    pub currency_name: String,

    /// Native currency symbol.
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Native currency decimals.
    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u8,

    /// JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Block explorer base URL.
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,

    /// Network tag passed to the registry and payment contracts.
    #[serde(default = "default_network_tag")]
    pub network_tag: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            chain_name: default_chain_name(),
            currency_name: default_currency(),
            currency_symbol: default_currency(),
            currency_decimals: default_currency_decimals(),
            rpc_url: default_rpc_url(),
            explorer_url: default_explorer_url(),
            network_tag: default_network_tag(),
        }
    }
}

impl NetworkConfig {
    /// Chain id as `0x`-prefixed hex, the form wallets expect.
    #[must_use]
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// Descriptor for `wallet_addEthereumChain`.
    #[must_use]
    pub fn descriptor(&self) -> ChainDescriptor {
        ChainDescriptor {
            chain_id: self.chain_id_hex(),
            chain_name: self.chain_name.clone(),
            native_currency: NativeCurrency {
                name: self.currency_name.clone(),
                symbol: self.currency_symbol.clone(),
                decimals: self.currency_decimals,
            },
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.explorer_url.clone()],
        }
    }

    /// Explorer link for a transaction hash.
    #[must_use]
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }
}

/// Contract deployment addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Identity registry address.
    #[serde(default = "default_registry_address")]
    pub registry: String,

    /// Payment relay address.
    #[serde(default = "default_payment_address")]
    pub payment: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            registry: default_registry_address(),
            payment: default_payment_address(),
        }
    }
}

/// Registration event scanning configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// How many blocks back from the head to scan for registrations.
    /// Registrations older than this are invisible to the client.
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback_blocks: default_lookback_blocks(),
        }
    }
}

/// Payment submission configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Gas limit as a percentage of the estimate (120 = +20%).
    #[serde(default = "default_gas_margin_percent")]
    pub gas_margin_percent: u64,

    /// Confirmations to wait for after submission.
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,

    /// Upper bound on the confirmation wait. `None` waits indefinitely.
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gas_margin_percent: default_gas_margin_percent(),
            confirmations: default_confirmations(),
            confirmation_timeout_secs: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            network: NetworkConfig::default(),
            contracts: ContractsConfig::default(),
            scan: ScanConfig::default(),
            payment: PaymentConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path of the JSON payment request store.
    #[must_use]
    pub fn requests_path(&self) -> PathBuf {
        self.data_dir.join(REQUESTS_FILE_NAME)
    }

    /// Check values that would make every operation fail.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> crate::Result<()> {
        if self.payment.gas_margin_percent < 100 {
            return Err(crate::Error::Config(format!(
                "gas_margin_percent must be at least 100, got {}",
                self.payment.gas_margin_percent
            )));
        }
        if self.payment.confirmations == 0 {
            return Err(crate::Error::Config(
                "confirmations must be at least 1".to_string(),
            ));
        }
        if self.network.network_tag.is_empty() {
            return Err(crate::Error::Config("network_tag must not be empty".to_string()));
        }
        crate::wallet::parse_address(&self.contracts.registry)
            .map_err(|e| crate::Error::Config(format!("registry address: {e}")))?;
        crate::wallet::parse_address(&self.contracts.payment)
            .map_err(|e| crate::Error::Config(format!("payment address: {e}")))?;
        Ok(())
    }
}

const fn default_chain_id() -> u64 {
    AMOY_CHAIN_ID
}

fn default_chain_name() -> String {
    "Amoy Testnet".to_string()
}

fn default_currency() -> String {
    "POL".to_string()
}

const fn default_currency_decimals() -> u8 {
    18
}

fn default_rpc_url() -> String {
    "https://rpc-amoy.polygon.technology".to_string()
}

fn default_explorer_url() -> String {
    "https://amoy.polygonscan.com/".to_string()
}

fn default_network_tag() -> String {
    "polygon".to_string()
}

fn default_registry_address() -> String {
    DEFAULT_REGISTRY_ADDRESS.to_string()
}

fn default_payment_address() -> String {
    DEFAULT_PAYMENT_ADDRESS.to_string()
}

const fn default_lookback_blocks() -> u64 {
    crate::identity::DEFAULT_LOOKBACK_BLOCKS
}

const fn default_gas_margin_percent() -> u64 {
    120
}

const fn default_confirmations() -> usize {
    1
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "cupid").map_or_else(
        || PathBuf::from(".cupid"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn default_log_level() -> String {
    "info".to_string()
}
