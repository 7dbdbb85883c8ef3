//! The wallet/provider seam.
//!
//! Everything the client needs from a signing wallet goes through
//! [`WalletProvider`]: account access, chain identity and switching, block
//! height and contract code lookups.

use super::Address;
use crate::session::WalletEvent;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

/// EIP-1193 code for "unrecognized chain id" on `wallet_switchEthereumChain`.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// EIP-1193 code for "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// Failure class reported by a wallet or RPC transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorCode {
    /// Numeric JSON-RPC / EIP-1193 error code.
    Rpc(i64),
    /// The user declined in the wallet UI.
    ActionRejected,
    /// Balance does not cover value and gas.
    InsufficientFunds,
    /// Connection-level failure.
    NetworkError,
    /// The request timed out.
    Timeout,
    /// The node answered with a server error.
    ServerError,
    /// The call reverted.
    CallException,
    /// Anything else.
    Unknown,
}

/// An error reported by the wallet or the chain behind it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct WalletError {
    /// Failure class.
    pub code: WalletErrorCode,
    /// Raw message.
    pub message: String,
    /// Decoded revert reason, when the failure was a revert.
    pub reason: Option<String>,
}

impl WalletError {
    /// Create a wallet error.
    #[must_use]
    pub fn new(code: WalletErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            reason: None,
        }
    }

    /// Attach a decoded revert reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The chain passed to a switch request is not known to the wallet.
    #[must_use]
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == WalletErrorCode::Rpc(UNRECOGNIZED_CHAIN_CODE)
    }

    /// Connectivity failure rather than a chain-level answer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self.code,
            WalletErrorCode::NetworkError | WalletErrorCode::Timeout | WalletErrorCode::ServerError
        )
    }

    /// Revert reason if present, otherwise the raw message.
    #[must_use]
    pub fn detail(&self) -> &str {
        self.reason.as_deref().unwrap_or(&self.message)
    }
}

/// Native currency metadata for `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal places of the smallest unit.
    pub decimals: u8,
}

/// Chain descriptor supplied when asking a wallet to add a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    /// Chain id as `0x`-prefixed hex.
    pub chain_id: String,
    /// Display name.
    pub chain_name: String,
    /// Native currency.
    pub native_currency: NativeCurrency,
    /// RPC endpoints.
    pub rpc_urls: Vec<String>,
    /// Block explorer URLs.
    pub block_explorer_urls: Vec<String>,
}

/// Wallet and chain access used by every component.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for account access.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Chain id the wallet is currently connected to.
    async fn active_chain_id(&self) -> Result<u64, WalletError>;

    /// Ask the wallet to switch to `chain_id`.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Ask the wallet to add (and switch to) a chain.
    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), WalletError>;

    /// Address of the account that signs transactions.
    async fn signer_address(&self) -> Result<Address, WalletError>;

    /// Current block height.
    async fn block_height(&self) -> Result<u64, WalletError>;

    /// Deployed bytecode at `address`; empty when nothing is deployed.
    async fn code_at(&self, address: &Address) -> Result<Vec<u8>, WalletError>;

    /// Subscribe to account and chain change notifications.
    ///
    /// Providers that cannot observe out-of-band changes return `None`.
    fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_chain_detection() {
        let err = WalletError::new(
            WalletErrorCode::Rpc(UNRECOGNIZED_CHAIN_CODE),
            "Unrecognized chain ID",
        );
        assert!(err.is_unrecognized_chain());
        let err = WalletError::new(WalletErrorCode::Rpc(4001), "rejected");
        assert!(!err.is_unrecognized_chain());
    }

    #[test]
    fn test_descriptor_serializes_like_eip3085() {
        let descriptor = ChainDescriptor {
            chain_id: "0x13882".to_string(),
            chain_name: "Amoy Testnet".to_string(),
            native_currency: NativeCurrency {
                name: "POL".to_string(),
                symbol: "POL".to_string(),
                decimals: 18,
            },
            rpc_urls: vec!["https://rpc-amoy.polygon.technology".to_string()],
            block_explorer_urls: vec!["https://amoy.polygonscan.com/".to_string()],
        };
        let json = serde_json::to_value(&descriptor).unwrap_or_default();
        assert_eq!(json["chainId"], "0x13882");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
        assert_eq!(json["blockExplorerUrls"][0], "https://amoy.polygonscan.com/");
    }

    #[test]
    fn test_detail_prefers_reason() {
        let err = WalletError::new(WalletErrorCode::CallException, "reverted")
            .with_reason("ID not registered");
        assert_eq!(err.detail(), "ID not registered");
    }
}
