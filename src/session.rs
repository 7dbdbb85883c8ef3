//! Wallet session state and reconciliation of wallet notifications.
//!
//! Wallets report account and chain changes out of band. Every
//! notification is folded into the session through [`Session::reconcile`],
//! which says what derived state is now stale.

use crate::error::{Error, Result};
use crate::network::NetworkGuard;
use crate::wallet::{Address, WalletProvider};
use tracing::{debug, info};

/// A notification pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The exposed accounts changed; empty means the wallet locked.
    AccountsChanged(Vec<Address>),
    /// The active chain changed.
    ChainChanged(u64),
    /// The wallet disconnected.
    Disconnected,
}

/// What a caller must refresh after a wallet notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Cached identity data is stale and must be rebuilt.
    pub reload_index: bool,
    /// Any request-derived payment intent must be dropped.
    pub clear_intent: bool,
    /// Whether the session is usable after the event.
    pub connected: bool,
}

/// Connected accounts and chain as last reported by the wallet.
#[derive(Debug, Clone)]
pub struct Session {
    required_chain_id: u64,
    accounts: Vec<Address>,
    chain_id: Option<u64>,
    connected: bool,
    accounts_revision: u64,
    chain_revision: u64,
}

/// Revisions of a [`Session`] at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMark {
    accounts: u64,
    chain: u64,
}

impl Session {
    /// A disconnected session requiring `required_chain_id`.
    #[must_use]
    pub fn new(required_chain_id: u64) -> Self {
        Self {
            required_chain_id,
            accounts: Vec::new(),
            chain_id: None,
            connected: false,
            accounts_revision: 0,
            chain_revision: 0,
        }
    }

    /// Request account access, then make sure the wallet is on the required
    /// chain. The session itself is not touched; apply the accounts with
    /// [`Session::finish_connect`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::WalletUnavailable`] if the wallet refuses access or
    /// exposes no account, and [`Error::NetworkMismatch`] if the chain
    /// cannot be switched.
    pub async fn request_connection(
        provider: &dyn WalletProvider,
        guard: &NetworkGuard,
    ) -> Result<Vec<Address>> {
        let accounts = provider
            .request_accounts()
            .await
            .map_err(|e| Error::WalletUnavailable(format!("account access denied: {e}")))?;
        if accounts.is_empty() {
            return Err(Error::WalletUnavailable(
                "wallet exposed no accounts".to_string(),
            ));
        }

        guard.ensure_network().await?;
        Ok(accounts)
    }

    /// Position in the notification stream, taken before a connection
    /// attempt starts.
    #[must_use]
    pub fn mark(&self) -> SessionMark {
        SessionMark {
            accounts: self.accounts_revision,
            chain: self.chain_revision,
        }
    }

    /// Apply the accounts of a connection attempt started at `mark`.
    ///
    /// Notifications reconciled since `mark` are newer than what the attempt
    /// saw and take precedence over it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WalletUnavailable`] if the wallet disconnected and
    /// [`Error::NetworkMismatch`] if it left the required chain meanwhile.
    pub fn finish_connect(
        &mut self,
        accounts: Vec<Address>,
        mark: SessionMark,
    ) -> Result<Address> {
        if self.accounts_revision == mark.accounts {
            self.accounts = accounts;
        } else {
            debug!("Accounts changed while connecting; keeping the reported ones");
        }
        if self.chain_revision == mark.chain {
            self.chain_id = Some(self.required_chain_id);
        }

        let Some(account) = self.accounts.first().cloned() else {
            self.connected = false;
            return Err(Error::WalletUnavailable(
                "wallet disconnected while connecting".to_string(),
            ));
        };
        if !self.is_on_required_chain() {
            self.connected = false;
            return Err(Error::NetworkMismatch(format!(
                "wallet left chain {} while connecting",
                self.required_chain_id
            )));
        }

        self.connected = true;
        info!("Connected {}", account.short());
        Ok(account)
    }

    /// Fold a wallet notification into the session.
    pub fn reconcile(&mut self, event: &WalletEvent) -> Reconciliation {
        debug!("Wallet event: {event:?}");
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                self.accounts_revision += 1;
                let changed = *accounts != self.accounts;
                self.accounts.clone_from(accounts);
                if accounts.is_empty() {
                    self.connected = false;
                }
                Reconciliation {
                    reload_index: changed && !accounts.is_empty(),
                    clear_intent: changed,
                    connected: self.connected,
                }
            }
            WalletEvent::ChainChanged(chain_id) => {
                self.chain_revision += 1;
                let was_on = self.is_on_required_chain();
                self.chain_id = Some(*chain_id);
                let on = self.is_on_required_chain();
                if !on {
                    self.connected = false;
                } else if !self.accounts.is_empty() {
                    self.connected = true;
                }
                Reconciliation {
                    reload_index: on && !was_on,
                    clear_intent: false,
                    connected: self.connected,
                }
            }
            WalletEvent::Disconnected => {
                self.accounts_revision += 1;
                self.chain_revision += 1;
                self.accounts.clear();
                self.chain_id = None;
                self.connected = false;
                Reconciliation {
                    reload_index: false,
                    clear_intent: true,
                    connected: false,
                }
            }
        }
    }

    /// Primary account, if any.
    #[must_use]
    pub fn account(&self) -> Option<&Address> {
        self.accounts.first()
    }

    /// All exposed accounts.
    #[must_use]
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    /// Last known chain id.
    #[must_use]
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// True when connected with an account on the required chain.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn is_on_required_chain(&self) -> bool {
        self.chain_id == Some(self.required_chain_id)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    const AMOY: u64 = 80_002;

    fn connected() -> Session {
        let mut session = Session::new(AMOY);
        session.accounts = vec![Address::from("0x01")];
        session.chain_id = Some(AMOY);
        session.connected = true;
        session
    }

    #[test]
    fn test_account_change_reloads_and_clears_intent() {
        let mut session = connected();
        let outcome = session.reconcile(&WalletEvent::AccountsChanged(vec![Address::from("0x02")]));
        assert!(outcome.reload_index);
        assert!(outcome.clear_intent);
        assert!(outcome.connected);
        assert_eq!(session.account(), Some(&Address::from("0x02")));
    }

    #[test]
    fn test_same_accounts_is_noop() {
        let mut session = connected();
        let outcome = session.reconcile(&WalletEvent::AccountsChanged(vec![Address::from("0x01")]));
        assert_eq!(
            outcome,
            Reconciliation {
                reload_index: false,
                clear_intent: false,
                connected: true
            }
        );
    }

    #[test]
    fn test_locking_wallet_disconnects() {
        let mut session = connected();
        let outcome = session.reconcile(&WalletEvent::AccountsChanged(Vec::new()));
        assert!(!outcome.connected);
        assert!(!outcome.reload_index);
        assert!(session.account().is_none());
    }

    #[test]
    fn test_chain_change_off_and_back() {
        let mut session = connected();
        let off = session.reconcile(&WalletEvent::ChainChanged(1));
        assert!(!off.connected);
        assert!(!session.is_connected());

        let back = session.reconcile(&WalletEvent::ChainChanged(AMOY));
        assert!(back.connected);
        assert!(back.reload_index);
    }

    #[test]
    fn test_finish_connect_applies_accounts() {
        let mut session = Session::new(AMOY);
        let mark = session.mark();
        let account = session
            .finish_connect(vec![Address::from("0x01")], mark)
            .expect("connect");
        assert_eq!(account, Address::from("0x01"));
        assert!(session.is_connected());
        assert_eq!(session.chain_id(), Some(AMOY));
    }

    #[test]
    fn test_account_change_during_connect_wins() {
        let mut session = Session::new(AMOY);
        let mark = session.mark();
        session.reconcile(&WalletEvent::AccountsChanged(vec![Address::from("0x02")]));

        let account = session
            .finish_connect(vec![Address::from("0x01")], mark)
            .expect("connect");
        assert_eq!(account, Address::from("0x02"));
        assert_eq!(session.accounts(), &[Address::from("0x02")]);
        assert!(session.is_connected());
    }

    #[test]
    fn test_chain_change_during_connect_wins() {
        let mut session = Session::new(AMOY);
        let mark = session.mark();
        session.reconcile(&WalletEvent::ChainChanged(1));

        let err = session
            .finish_connect(vec![Address::from("0x01")], mark)
            .expect_err("off chain");
        assert!(matches!(err, Error::NetworkMismatch(_)));
        assert_eq!(session.chain_id(), Some(1));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_disconnect_during_connect() {
        let mut session = Session::new(AMOY);
        let mark = session.mark();
        session.reconcile(&WalletEvent::Disconnected);

        let err = session
            .finish_connect(vec![Address::from("0x01")], mark)
            .expect_err("disconnected");
        assert!(matches!(err, Error::WalletUnavailable(_)));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_disconnect_clears_everything() {
        let mut session = connected();
        let outcome = session.reconcile(&WalletEvent::Disconnected);
        assert!(outcome.clear_intent);
        assert!(!outcome.connected);
        assert!(session.accounts().is_empty());
        assert_eq!(session.chain_id(), None);
    }
}
