//! Request lifecycle over a [`RequestStore`].

use super::{PaymentRequest, RequestKey, RequestStatus, RequestStore};
use crate::error::{Error, Result};
use crate::identity::Identifier;
use crate::payment::parse_native_amount;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Local payment requests and their status transitions.
///
/// Every mutation is a read-modify-write of the whole list. Mutations are
/// serialized within one ledger; separate processes sharing a store are not
/// coordinated.
pub struct RequestLedger {
    store: Arc<dyn RequestStore>,
    write_lock: Mutex<()>,
}

impl RequestLedger {
    /// Create a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Append a request.
    ///
    /// No duplicate check is made; an identical tuple is appended again.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn create(&self, request: PaymentRequest) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut requests = self.store.load().await?;
        info!(
            "Recording payment request {} -> {} for {}",
            request.from_id, request.to_id, request.amount
        );
        requests.push(request);
        self.store.save(&requests).await
    }

    /// Validate and record a request for `amount` from `from_id` to the
    /// caller's own `to_id`.
    ///
    /// `owned` is the set of identifiers held by the connected account; the
    /// payer identifier is not checked against the chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a malformed payer,
    /// [`Error::InvalidRequest`] if `to_id` is not one of `owned`, and
    /// [`Error::InvalidAmount`] for anything but a positive decimal.
    pub async fn request_payment(
        &self,
        from_id: &str,
        to_id: &Identifier,
        owned: &BTreeSet<Identifier>,
        amount: &str,
        timestamp: u64,
    ) -> Result<PaymentRequest> {
        let from_id = Identifier::parse(from_id)?;
        if !owned.contains(to_id) {
            return Err(Error::InvalidRequest(format!(
                "{to_id} is not registered to the connected account"
            )));
        }
        if parse_native_amount(amount)?.is_zero() {
            return Err(Error::InvalidAmount(
                "requested amount must be greater than zero".to_string(),
            ));
        }

        let request = PaymentRequest::new(from_id, to_id.clone(), amount.trim(), timestamp);
        self.create(request.clone()).await?;
        Ok(request)
    }

    /// Pending requests addressed to `payer`, in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list_pending_for(&self, payer: &Identifier) -> Result<Vec<PaymentRequest>> {
        let requests = self.store.load().await?;
        Ok(requests
            .into_iter()
            .filter(|r| r.is_pending() && &r.from_id == payer)
            .collect())
    }

    /// Every stored request, in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list_all(&self) -> Result<Vec<PaymentRequest>> {
        self.store.load().await
    }

    /// Mark every request matching `key` completed.
    ///
    /// Idempotent. Returns how many records changed; the list is not
    /// rewritten when nothing did.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn mark_completed(&self, key: &RequestKey) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut requests = self.store.load().await?;

        let mut changed = 0;
        for request in requests.iter_mut().filter(|r| key.matches(r)) {
            if request.status != RequestStatus::Completed {
                request.status = RequestStatus::Completed;
                changed += 1;
            }
        }

        if changed == 0 {
            debug!(
                "No pending request matched ({}, {}, {})",
                key.timestamp, key.from_id, key.to_id
            );
            return Ok(0);
        }

        self.store.save(&requests).await?;
        info!(
            "Marked {changed} payment request(s) from {} to {} completed",
            key.from_id, key.to_id
        );
        Ok(changed)
    }
}
