//! Network guard: keeps the wallet on the required chain.
//!
//! Wallets let the user change networks at any time, so the guard runs
//! before every operation whose result depends on chain identity.

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::wallet::WalletProvider;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ensures the active chain is the configured one.
pub struct NetworkGuard {
    provider: Arc<dyn WalletProvider>,
    network: NetworkConfig,
}

impl NetworkGuard {
    /// Create a guard for `network`.
    #[must_use]
    pub fn new(provider: Arc<dyn WalletProvider>, network: NetworkConfig) -> Self {
        Self { provider, network }
    }

    /// The required network.
    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Switch the wallet to the required chain if it is elsewhere.
    ///
    /// If the wallet does not know the chain (code 4902) it is asked to add
    /// it with the configured descriptor, which also switches to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WalletUnavailable`] if the active chain cannot be
    /// read, and [`Error::NetworkMismatch`] if switching or adding fails.
    pub async fn ensure_network(&self) -> Result<()> {
        let current = self.active_chain().await?;
        let required = self.network.chain_id;
        if current == required {
            debug!("Wallet already on chain {required}");
            return Ok(());
        }

        info!(
            "Wallet on chain {current}, requesting switch to {} ({required})",
            self.network.chain_name
        );

        match self.provider.switch_chain(required).await {
            Ok(()) => {
                info!("Switched wallet to {}", self.network.chain_name);
                Ok(())
            }
            Err(e) if e.is_unrecognized_chain() => {
                info!(
                    "Wallet does not know chain {required}; requesting addition of {}",
                    self.network.chain_name
                );
                self.provider
                    .add_chain(&self.network.descriptor())
                    .await
                    .map_err(|add_err| {
                        warn!("Adding {} failed: {add_err}", self.network.chain_name);
                        Error::NetworkMismatch(format!(
                            "Please add {} to your wallet manually ({add_err})",
                            self.network.chain_name
                        ))
                    })
            }
            Err(e) => {
                warn!("Switching to chain {required} failed: {e}");
                Err(Error::NetworkMismatch(format!(
                    "could not switch to {}: {e}",
                    self.network.chain_name
                )))
            }
        }
    }

    /// Verify the active chain without asking the wallet to switch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NetworkMismatch`] if the wallet is elsewhere.
    pub async fn check_network(&self) -> Result<()> {
        let current = self.active_chain().await?;
        if current == self.network.chain_id {
            Ok(())
        } else {
            Err(Error::NetworkMismatch(format!(
                "Please switch to {}",
                self.network.chain_name
            )))
        }
    }

    async fn active_chain(&self) -> Result<u64> {
        self.provider
            .active_chain_id()
            .await
            .map_err(|e| Error::WalletUnavailable(format!("failed to read active chain: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::devnet::{Devnet, DevnetConfig, DevnetOp};
    use crate::wallet::{WalletError, WalletErrorCode};

    fn guard_for(devnet: &Devnet) -> NetworkGuard {
        NetworkGuard::new(devnet.provider(), NetworkConfig::default())
    }

    #[tokio::test]
    async fn test_already_on_chain_makes_no_switch() {
        let devnet = Devnet::new(DevnetConfig::default()).expect("devnet");
        guard_for(&devnet).ensure_network().await.expect("ensure");
        assert_eq!(devnet.calls(), vec![DevnetOp::ActiveChainId]);
    }

    #[tokio::test]
    async fn test_switches_known_chain() {
        let config = DevnetConfig {
            initial_chain_id: 1,
            ..DevnetConfig::default()
        };
        let devnet = Devnet::new(config).expect("devnet");
        let guard = guard_for(&devnet);
        guard.ensure_network().await.expect("ensure");
        assert_eq!(devnet.call_count(DevnetOp::SwitchChain), 1);
        assert_eq!(devnet.call_count(DevnetOp::AddChain), 0);
        guard.check_network().await.expect("on chain");
    }

    #[tokio::test]
    async fn test_unknown_chain_is_added() {
        let devnet = Devnet::new(DevnetConfig::unknown_chain()).expect("devnet");
        let guard = guard_for(&devnet);
        guard.ensure_network().await.expect("ensure");
        assert_eq!(devnet.call_count(DevnetOp::AddChain), 1);
        assert_eq!(
            devnet.provider().active_chain_id().await.expect("chain"),
            crate::config::AMOY_CHAIN_ID
        );
    }

    #[tokio::test]
    async fn test_failed_add_asks_for_manual_setup() {
        let devnet = Devnet::new(DevnetConfig::unknown_chain()).expect("devnet");
        devnet.fail(
            DevnetOp::AddChain,
            WalletError::new(WalletErrorCode::Rpc(4001), "User rejected the request."),
        );
        let err = guard_for(&devnet).ensure_network().await.expect_err("mismatch");
        match err {
            Error::NetworkMismatch(msg) => assert!(msg.contains("manually")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_switch_is_mismatch() {
        let config = DevnetConfig {
            initial_chain_id: 1,
            ..DevnetConfig::default()
        };
        let devnet = Devnet::new(config).expect("devnet");
        devnet.fail(
            DevnetOp::SwitchChain,
            WalletError::new(WalletErrorCode::Rpc(4001), "User rejected the request."),
        );
        let err = guard_for(&devnet).ensure_network().await.expect_err("mismatch");
        assert!(matches!(err, Error::NetworkMismatch(_)));
        assert_eq!(devnet.call_count(DevnetOp::AddChain), 0);
    }

    #[tokio::test]
    async fn test_check_network_never_switches() {
        let config = DevnetConfig {
            initial_chain_id: 1,
            ..DevnetConfig::default()
        };
        let devnet = Devnet::new(config).expect("devnet");
        let err = guard_for(&devnet).check_network().await.expect_err("off chain");
        assert_eq!(err.to_string(), "network mismatch: Please switch to Amoy Testnet");
        assert_eq!(devnet.call_count(DevnetOp::SwitchChain), 0);
    }

    #[tokio::test]
    async fn test_unreadable_chain_is_wallet_unavailable() {
        let devnet = Devnet::new(DevnetConfig::default()).expect("devnet");
        devnet.fail(
            DevnetOp::ActiveChainId,
            WalletError::new(WalletErrorCode::NetworkError, "no provider"),
        );
        let err = guard_for(&devnet).ensure_network().await.expect_err("unavailable");
        assert!(matches!(err, Error::WalletUnavailable(_)));
    }
}
