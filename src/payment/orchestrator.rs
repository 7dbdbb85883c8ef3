//! Executes a payment intent against the registry and payment relay.

use super::amount::{apply_gas_margin, parse_units};
use super::PaymentIntent;
use crate::config::PaymentConfig;
use crate::contracts::{IdentityRegistry, PaymentRelay, TransferReceipt};
use crate::error::{Error, Result};
use crate::network::NetworkGuard;
use crate::requests::RequestLedger;
use crate::wallet::{Address, WalletProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs the payment protocol.
///
/// Steps run in a fixed order and the first failure ends the attempt. Nothing
/// is submitted to the chain before gas estimation has succeeded, and the
/// request ledger is only touched after confirmation.
pub struct PaymentOrchestrator {
    provider: Arc<dyn WalletProvider>,
    registry: Arc<dyn IdentityRegistry>,
    relay: Arc<dyn PaymentRelay>,
    guard: Arc<NetworkGuard>,
    ledger: Arc<RequestLedger>,
    config: PaymentConfig,
}

impl PaymentOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        registry: Arc<dyn IdentityRegistry>,
        relay: Arc<dyn PaymentRelay>,
        guard: Arc<NetworkGuard>,
        ledger: Arc<RequestLedger>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            relay,
            guard,
            ledger,
            config,
        }
    }

    /// Pay `intent`.
    ///
    /// # Errors
    ///
    /// - [`Error::NetworkMismatch`] / [`Error::WalletUnavailable`] from the
    ///   network guard
    /// - [`Error::Unregistered`] for an empty or unresolvable destination
    /// - [`Error::ContractUnavailable`] if either contract has no code
    /// - [`Error::InvalidAmount`] for an unparsable amount
    /// - [`Error::GasEstimationFailed`] with the revert reason
    /// - [`Error::UserRejected`], [`Error::InsufficientFunds`],
    ///   [`Error::TransportError`] or [`Error::Unknown`] from submission and
    ///   confirmation
    pub async fn send(&self, intent: &PaymentIntent) -> Result<TransferReceipt> {
        let network = self.guard.network();
        let tag = network.network_tag.as_str();

        // Step 1: required chain
        self.guard.ensure_network().await?;

        // Step 2: local destination check
        let destination = &intent.destination_id;
        if destination.is_empty() {
            return Err(Error::Unregistered(
                "recipient identifier cannot be empty".to_string(),
            ));
        }

        // Step 3: registry deployed
        self.ensure_code(self.registry.address(), "registry").await?;

        // Step 4: live resolution
        debug!("Resolving {destination} on '{tag}'");
        let resolved = self.registry.resolve(destination, tag).await.map_err(|e| {
            if e.is_transport() {
                Error::TransportError(format!("failed to resolve {destination}: {e}"))
            } else {
                Error::Unregistered(format!("failed to resolve {destination}: {}", e.detail()))
            }
        })?;
        if resolved.is_zero() {
            return Err(Error::Unregistered(format!(
                "{destination} is not registered"
            )));
        }
        debug!("{destination} resolves to {resolved}");

        // Step 5: payment relay deployed
        self.ensure_code(self.relay.address(), "payment").await?;

        // Step 6: exact amount
        let value = parse_units(&intent.amount_native, network.currency_decimals)?;
        debug!("Amount {} {} = {value} base units", intent.amount_native, network.currency_symbol);

        // Step 7: gas estimate
        let estimate = self
            .relay
            .estimate_transfer_gas(destination, tag, value)
            .await
            .map_err(|e| Error::GasEstimationFailed(e.detail().to_string()))?;

        // Step 8: margin
        let gas_limit = apply_gas_margin(estimate, self.config.gas_margin_percent);
        debug!("Gas estimate {estimate}, limit {gas_limit}");

        // Step 9: submit
        let pending = self
            .relay
            .transfer(destination, tag, value, gas_limit)
            .await
            .map_err(Error::from_submission)?;
        let hash = pending.hash();
        info!(
            "Submitted payment of {} {} to {destination}: {hash}",
            intent.amount_native, network.currency_symbol
        );

        // Step 10: confirmation
        let confirmations = self.config.confirmations;
        let receipt = match self.config.confirmation_timeout_secs {
            Some(secs) => {
                tokio::time::timeout(Duration::from_secs(secs), pending.wait(confirmations))
                    .await
                    .map_err(|_| {
                        warn!("No confirmation for {hash} after {secs}s");
                        Error::TransportError(format!(
                            "confirmation timed out after {secs}s; {hash} may still be mined"
                        ))
                    })?
            }
            None => pending.wait(confirmations).await,
        }
        .map_err(Error::from_submission)?;

        info!(
            "Payment {} confirmed in block {}",
            receipt.transaction_hash,
            receipt
                .block_number
                .map_or_else(|| "unknown".to_string(), |b| b.to_string())
        );

        if let Some(key) = &intent.origin {
            if let Err(e) = self.ledger.mark_completed(key).await {
                warn!(
                    "Payment {} confirmed; request ({}, {}, {}) not marked completed: {e}",
                    receipt.transaction_hash, key.timestamp, key.from_id, key.to_id
                );
            }
        }

        Ok(receipt)
    }

    async fn ensure_code(&self, address: &Address, contract: &str) -> Result<()> {
        let code = self.provider.code_at(address).await.map_err(|e| {
            if e.is_transport() {
                Error::TransportError(format!("failed to read {contract} contract code: {e}"))
            } else {
                Error::ContractUnavailable(format!("{contract} contract at {address}: {e}"))
            }
        })?;
        if code.is_empty() {
            return Err(Error::ContractUnavailable(format!(
                "no contract code found at {contract} address {address}"
            )));
        }
        Ok(())
    }
}
