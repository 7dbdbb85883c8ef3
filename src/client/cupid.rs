//! The client facade.

use crate::config::ClientConfig;
use crate::contracts::{IdentityRegistry, PaymentRelay, TransferReceipt};
use crate::error::{Error, Result};
use crate::identity::{EventWindowScanner, Identifier, IdentityIndex, Registration, ScanStatus};
use crate::network::NetworkGuard;
use crate::payment::{IntentForm, PaymentIntent, PaymentOrchestrator};
use crate::requests::{PaymentRequest, RequestLedger, RequestStore};
use crate::session::{Reconciliation, Session, WalletEvent};
use crate::wallet::{parse_address, Address, WalletProvider};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Clears the in-flight flag when the operation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn begin(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Resolve, pay and request payment by CUPID identifier.
///
/// Wires the network guard, registration scanner, payment orchestrator and
/// request ledger to one wallet and one pair of contracts. The cached
/// identity index is replaced wholesale on every refresh.
pub struct CupidClient {
    config: ClientConfig,
    provider: Arc<dyn WalletProvider>,
    registry: Arc<dyn IdentityRegistry>,
    guard: Arc<NetworkGuard>,
    scanner: EventWindowScanner,
    orchestrator: PaymentOrchestrator,
    ledger: Arc<RequestLedger>,
    index: RwLock<Arc<IdentityIndex>>,
    index_status: RwLock<Option<ScanStatus>>,
    session: Mutex<Session>,
    form: Mutex<IntentForm>,
    in_flight: AtomicBool,
}

impl CupidClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: ClientConfig,
        provider: Arc<dyn WalletProvider>,
        registry: Arc<dyn IdentityRegistry>,
        relay: Arc<dyn PaymentRelay>,
        store: Arc<dyn RequestStore>,
    ) -> Result<Self> {
        config.validate()?;

        let guard = Arc::new(NetworkGuard::new(
            Arc::clone(&provider),
            config.network.clone(),
        ));
        let ledger = Arc::new(RequestLedger::new(store));
        let scanner = EventWindowScanner::new(
            Arc::clone(&provider),
            Arc::clone(&registry),
            config.scan.lookback_blocks,
        );
        let orchestrator = PaymentOrchestrator::new(
            Arc::clone(&provider),
            Arc::clone(&registry),
            relay,
            Arc::clone(&guard),
            Arc::clone(&ledger),
            config.payment,
        );
        let session = Session::new(config.network.chain_id);

        info!(
            "Client ready for {} (registry {}, payment {})",
            config.network.chain_name, config.contracts.registry, config.contracts.payment
        );

        Ok(Self {
            config,
            provider,
            registry,
            guard,
            scanner,
            orchestrator,
            ledger,
            index: RwLock::new(Arc::new(IdentityIndex::default())),
            index_status: RwLock::new(None),
            session: Mutex::new(session),
            form: Mutex::new(IntentForm::new()),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Request account access and switch to the required network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WalletUnavailable`] or [`Error::NetworkMismatch`].
    pub async fn connect(&self) -> Result<Address> {
        let mark = self.session.lock().mark();
        let accounts = Session::request_connection(self.provider.as_ref(), &self.guard).await?;
        self.session.lock().finish_connect(accounts, mark)
    }

    /// Snapshot of the session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.lock().clone()
    }

    /// Wallet notifications, if the provider can observe them.
    #[must_use]
    pub fn wallet_events(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        self.provider.subscribe()
    }

    /// Apply a wallet notification: drop stale intent state and rebuild the
    /// index when the account or network changed.
    pub async fn apply_wallet_event(&self, event: &WalletEvent) -> Reconciliation {
        let outcome = self.session.lock().reconcile(event);
        if outcome.clear_intent {
            let mut form = self.form.lock();
            if form.is_locked() || !outcome.connected {
                debug!("Clearing payment form after wallet change");
                form.reset();
            }
        }
        if outcome.reload_index {
            self.refresh_index().await;
        }
        outcome
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Rescan registrations and replace the cached index.
    pub async fn refresh_index(&self) -> ScanStatus {
        let (index, status) = self.scanner.scan().await.into_index();
        debug!("Identity index rebuilt with {} identifiers", index.len());
        *self.index.write() = Arc::new(index);
        *self.index_status.write() = Some(status.clone());
        status
    }

    /// The cached index.
    #[must_use]
    pub fn index(&self) -> Arc<IdentityIndex> {
        Arc::clone(&self.index.read())
    }

    /// Outcome of the last refresh, if any.
    #[must_use]
    pub fn index_status(&self) -> Option<ScanStatus> {
        self.index_status.read().clone()
    }

    /// Every registered identifier in the scan window, newest first.
    ///
    /// A failed scan yields an empty list; see [`Self::index_status`].
    pub async fn registered_identifiers(&self) -> Vec<Registration> {
        self.refresh_index().await;
        self.index().by_recency().into_iter().cloned().collect()
    }

    /// Registration for `id` from the cached index.
    #[must_use]
    pub fn resolve_cached(&self, id: &Identifier) -> Option<Registration> {
        self.index().resolve(id).cloned()
    }

    /// Resolve `id` through the registry for the configured network tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unregistered`] for an unknown identifier, and
    /// network or transport errors otherwise.
    pub async fn resolve(&self, id: &Identifier) -> Result<Address> {
        self.guard.ensure_network().await?;
        let tag = &self.config.network.network_tag;
        let address = self.registry.resolve(id, tag).await.map_err(|e| {
            if e.is_transport() {
                Error::TransportError(e.to_string())
            } else {
                Error::Unregistered(format!("failed to resolve {id}: {}", e.detail()))
            }
        })?;
        if address.is_zero() {
            return Err(Error::Unregistered(format!("{id} is not registered")));
        }
        Ok(address)
    }

    /// Identifiers registered to the connected account, newest first.
    ///
    /// Verifies the network without switching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NetworkMismatch`] off-network and
    /// [`Error::WalletUnavailable`] without an account.
    pub async fn my_identifiers(&self) -> Result<Vec<Registration>> {
        self.guard.check_network().await?;
        let signer = self.signer().await?;
        self.refresh_index().await;
        Ok(self
            .index()
            .registrations_owned_by(&signer)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Register a new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`], [`Error::AlreadyRegistered`],
    /// [`Error::InvalidAddress`], or a classified submission error.
    pub async fn register_identifier(
        &self,
        id: &str,
        primary: &str,
        secondary: &str,
    ) -> Result<TransferReceipt> {
        let _in_flight = InFlight::begin(&self.in_flight)?;
        self.guard.ensure_network().await?;

        let id = Identifier::parse(id)?;
        self.refresh_index().await;
        if self.index().contains(&id) {
            return Err(Error::AlreadyRegistered(id.to_string()));
        }
        let primary = parse_address(primary)?;
        let secondary = parse_address(secondary)?;

        let receipt = self.submit_registration(&id, &primary, &secondary).await?;
        info!("Registered {id}");
        Ok(receipt)
    }

    /// Point an identifier held by the connected account at new addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOwner`] if the connected account does not hold
    /// `id`, [`Error::InvalidAddress`], or a classified submission error.
    pub async fn update_addresses(
        &self,
        id: &Identifier,
        primary: &str,
        secondary: &str,
    ) -> Result<TransferReceipt> {
        let _in_flight = InFlight::begin(&self.in_flight)?;
        self.guard.ensure_network().await?;

        let signer = self.signer().await?;
        self.refresh_index().await;
        if !self.index().owned_by(&signer).contains(id) {
            return Err(Error::NotOwner(format!(
                "{id} is not registered to {}",
                signer.short()
            )));
        }
        let primary = parse_address(primary)?;
        let secondary = parse_address(secondary)?;

        let receipt = self.submit_registration(id, &primary, &secondary).await?;
        info!("Updated addresses for {id}");
        Ok(receipt)
    }

    async fn submit_registration(
        &self,
        id: &Identifier,
        primary: &Address,
        secondary: &Address,
    ) -> Result<TransferReceipt> {
        let pending = self
            .registry
            .register(id, primary, secondary)
            .await
            .map_err(Error::from_submission)?;
        info!("Submitted registration of {id}: {}", pending.hash());
        let receipt = pending
            .wait(self.config.payment.confirmations)
            .await
            .map_err(Error::from_submission)?;
        self.refresh_index().await;
        Ok(receipt)
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Pay `intent`. Fails with [`Error::Busy`] while another payment is in
    /// flight.
    ///
    /// # Errors
    ///
    /// See [`PaymentOrchestrator::send`].
    pub async fn send(&self, intent: &PaymentIntent) -> Result<TransferReceipt> {
        let _in_flight = InFlight::begin(&self.in_flight)?;
        self.orchestrator.send(intent).await
    }

    /// True while a payment or registration is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Set the form destination.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntentLocked`] while a request is selected.
    pub fn set_destination(&self, destination: &str) -> Result<()> {
        self.form.lock().set_destination(destination)
    }

    /// Set the form amount.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntentLocked`] while a request is selected.
    pub fn set_amount(&self, amount: &str) -> Result<()> {
        self.form.lock().set_amount(amount)
    }

    /// Bind the form to a pending request.
    pub fn select_request(&self, request: PaymentRequest) {
        self.form.lock().select_request(request);
    }

    /// Drop the selected request and return to manual entry.
    pub fn cancel_request(&self) {
        self.form.lock().cancel();
    }

    /// Snapshot of the form.
    #[must_use]
    pub fn form(&self) -> IntentForm {
        self.form.lock().clone()
    }

    /// Pay what the form describes, then clear it.
    ///
    /// The form is left as-is on failure so the user can retry.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn submit_form(&self) -> Result<TransferReceipt> {
        let _in_flight = InFlight::begin(&self.in_flight)?;
        self.pay_form().await
    }

    /// Pay a pending request.
    ///
    /// The form is only rebound to `request` once no other payment is in
    /// flight.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn pay_request(&self, request: PaymentRequest) -> Result<TransferReceipt> {
        let _in_flight = InFlight::begin(&self.in_flight)?;
        self.select_request(request);
        self.pay_form().await
    }

    async fn pay_form(&self) -> Result<TransferReceipt> {
        let intent = self.form.lock().intent();
        let receipt = self.orchestrator.send(&intent).await?;
        self.form.lock().reset();
        Ok(receipt)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Ask `from_id` to pay `amount` to the caller's own `to_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NetworkMismatch`] off-network, and the validation
    /// errors of [`RequestLedger::request_payment`].
    pub async fn request_payment(
        &self,
        from_id: &str,
        to_id: &Identifier,
        amount: &str,
    ) -> Result<PaymentRequest> {
        self.guard.check_network().await?;
        let signer = self.signer().await?;
        self.refresh_index().await;
        let owned = self.index().owned_by(&signer);
        self.ledger
            .request_payment(from_id, to_id, &owned, amount, now_millis())
            .await
    }

    /// Pending requests addressed to `payer`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request store cannot be read.
    pub async fn pending_requests_for(&self, payer: &Identifier) -> Result<Vec<PaymentRequest>> {
        self.ledger.list_pending_for(payer).await
    }

    /// Pending requests addressed to any identifier of the connected account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account or the store is unavailable.
    pub async fn my_pending_requests(&self) -> Result<Vec<PaymentRequest>> {
        let mine: Vec<Identifier> = self
            .my_identifiers()
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let mut pending = Vec::new();
        for request in self.ledger.list_all().await? {
            if request.is_pending() && mine.contains(&request.from_id) {
                pending.push(request);
            }
        }
        Ok(pending)
    }

    /// Every stored request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request store cannot be read.
    pub async fn all_requests(&self) -> Result<Vec<PaymentRequest>> {
        self.ledger.list_all().await
    }

    async fn signer(&self) -> Result<Address> {
        self.provider.signer_address().await.map_err(|e| {
            warn!("No signer available: {e}");
            Error::WalletUnavailable(format!("no connected account: {e}"))
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
