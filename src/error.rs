//! Error types for cupid-client.

use crate::wallet::{WalletError, WalletErrorCode, USER_REJECTED_CODE};
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cupid-client.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The wallet is on the wrong chain and could not be switched.
    #[error("network mismatch: {0}")]
    NetworkMismatch(String),

    /// No wallet, no account, or the wallet did not answer.
    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// The destination identifier does not resolve to an address.
    #[error("identifier not registered: {0}")]
    Unregistered(String),

    /// No contract code at a configured contract address.
    #[error("contract unavailable: {0}")]
    ContractUnavailable(String),

    /// Gas estimation reverted; carries the underlying reason verbatim.
    #[error("gas estimation failed: {0}")]
    GasEstimationFailed(String),

    /// The user declined the request in the wallet.
    #[error("transaction rejected by user")]
    UserRejected,

    /// The signer cannot cover value plus gas.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Connectivity problem between the client and the chain.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Unclassified failure, raw message attached.
    #[error("{0}")]
    Unknown(String),

    /// Identifier does not match `@<name>@cupid`.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Malformed EVM address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Amount is not a valid decimal in the native unit.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Identifier already present in the registration window.
    #[error("identifier already registered: {0}")]
    AlreadyRegistered(String),

    /// The identifier is not held by the connected account.
    #[error("not the owner: {0}")]
    NotOwner(String),

    /// A payment request failed validation.
    #[error("invalid payment request: {0}")]
    InvalidRequest(String),

    /// The payment form is bound to a selected request.
    #[error("payment form is locked: {0}")]
    IntentLocked(String),

    /// Another payment is still in flight.
    #[error("a payment is already in flight")]
    Busy,

    /// Request store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a wallet failure raised while submitting or confirming a
    /// transaction.
    #[must_use]
    pub fn from_submission(err: WalletError) -> Self {
        match err.code {
            WalletErrorCode::ActionRejected => Self::UserRejected,
            WalletErrorCode::Rpc(code) if code == USER_REJECTED_CODE => Self::UserRejected,
            WalletErrorCode::InsufficientFunds => Self::InsufficientFunds(err.message),
            WalletErrorCode::NetworkError
            | WalletErrorCode::Timeout
            | WalletErrorCode::ServerError => Self::TransportError(err.message),
            WalletErrorCode::Rpc(_) | WalletErrorCode::CallException | WalletErrorCode::Unknown => {
                Self::Unknown(err.reason.unwrap_or(err.message))
            }
        }
    }

    /// Single human-readable message for display.
    ///
    /// Known failure classes map to fixed wording; everything else surfaces
    /// the underlying text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UserRejected => "Transaction was cancelled in the wallet".to_string(),
            Self::InsufficientFunds(_) => {
                "Insufficient funds to complete the transaction".to_string()
            }
            Self::TransportError(_) => {
                "Network error. Please check your connection and try again".to_string()
            }
            Self::Unknown(msg) if msg.is_empty() => "Failed to send payment".to_string(),
            Self::Unknown(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// True for the failures a payment attempt can end with before anything
    /// was submitted to the chain.
    #[must_use]
    pub fn is_pre_submission(&self) -> bool {
        matches!(
            self,
            Self::NetworkMismatch(_)
                | Self::WalletUnavailable(_)
                | Self::Unregistered(_)
                | Self::ContractUnavailable(_)
                | Self::GasEstimationFailed(_)
                | Self::InvalidAmount(_)
                | Self::Busy
        )
    }
}
