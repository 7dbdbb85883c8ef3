//! Interfaces to the identity registry and payment relay contracts.
//!
//! The contracts are external: their storage and event schema are fixed.
//! These traits describe the calls the client makes; the `evm` module binds
//! them to JSON-RPC and [`crate::devnet`] simulates them in process.

use crate::identity::{Identifier, RawEvent};
use crate::wallet::{Address, WalletError};
use async_trait::async_trait;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Transaction hash (`0x`-prefixed hex).
    pub transaction_hash: String,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Gas consumed, when reported.
    pub gas_used: Option<U256>,
}

/// A submitted transaction awaiting confirmation.
#[async_trait]
pub trait PendingTx: Send + Sync {
    /// Transaction hash.
    fn hash(&self) -> String;

    /// Wait until the transaction has `confirmations` confirmations.
    ///
    /// A reverted transaction is reported as an error.
    async fn wait(&self, confirmations: usize) -> Result<TransferReceipt, WalletError>;
}

/// The identity registry contract.
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Deployed address.
    fn address(&self) -> &Address;

    /// `resolve(id, network)`; the zero address for unknown identifiers.
    async fn resolve(&self, id: &Identifier, network_tag: &str) -> Result<Address, WalletError>;

    /// `registerID(id, ethereum, polygon)`; overwrites any earlier binding.
    async fn register(
        &self,
        id: &Identifier,
        primary: &Address,
        secondary: &Address,
    ) -> Result<Box<dyn PendingTx>, WalletError>;

    /// `IDRegistered` logs from `from_block` to the latest block.
    async fn registered_events(&self, from_block: u64) -> Result<Vec<RawEvent>, WalletError>;
}

/// The payment relay contract.
#[async_trait]
pub trait PaymentRelay: Send + Sync {
    /// Deployed address.
    fn address(&self) -> &Address;

    /// Gas estimate for `sendPayment(id, network)` carrying `value`.
    async fn estimate_transfer_gas(
        &self,
        id: &Identifier,
        network_tag: &str,
        value: U256,
    ) -> Result<U256, WalletError>;

    /// Submit `sendPayment(id, network)` with `value` and `gas_limit`.
    async fn transfer(
        &self,
        id: &Identifier,
        network_tag: &str,
        value: U256,
        gas_limit: U256,
    ) -> Result<Box<dyn PendingTx>, WalletError>;
}
