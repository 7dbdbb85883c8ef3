//! Payment request records.

use crate::identity::Identifier;
use serde::{Deserialize, Serialize};

/// Lifecycle of a payment request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting payment.
    #[default]
    Pending,
    /// Paid through the client.
    Completed,
}

/// A local, unauthenticated request for payment.
///
/// `from_id` is the identifier expected to pay; `to_id` is the requester's
/// own identifier and the destination of the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Identifier expected to pay.
    pub from_id: Identifier,
    /// Identifier to be paid.
    pub to_id: Identifier,
    /// Amount in the native unit, as entered.
    pub amount: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Current status. Records written without one load as pending.
    #[serde(default)]
    pub status: RequestStatus,
}

impl PaymentRequest {
    /// Create a pending request.
    #[must_use]
    pub fn new(
        from_id: Identifier,
        to_id: Identifier,
        amount: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            from_id,
            to_id,
            amount: amount.into(),
            timestamp,
            status: RequestStatus::Pending,
        }
    }

    /// The tuple the ledger matches requests by.
    #[must_use]
    pub fn key(&self) -> RequestKey {
        RequestKey {
            timestamp: self.timestamp,
            from_id: self.from_id.clone(),
            to_id: self.to_id.clone(),
        }
    }

    /// True while the request awaits payment.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Identity of a request: `(timestamp, from_id, to_id)`.
///
/// Two requests created with the same tuple are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// Creation time in milliseconds.
    pub timestamp: u64,
    /// Payer identifier.
    pub from_id: Identifier,
    /// Payee identifier.
    pub to_id: Identifier,
}

impl RequestKey {
    /// True if `request` carries this tuple.
    #[must_use]
    pub fn matches(&self, request: &PaymentRequest) -> bool {
        request.timestamp == self.timestamp
            && request.from_id == self.from_id
            && request.to_id == self.to_id
    }
}
