//! In-process simulated chain for tests and offline use.
//!
//! A [`Devnet`] holds one shared chain state and hands out handles that
//! implement the wallet, registry and payment relay traits against it.
//! Transactions are mined as soon as they are submitted. Every trait call is
//! recorded, and any call can be made to fail, so tests can assert exactly
//! which chain interactions an operation performed.

use crate::config::{
    ClientConfig, AMOY_CHAIN_ID, DEFAULT_PAYMENT_ADDRESS, DEFAULT_REGISTRY_ADDRESS,
};
use crate::contracts::{IdentityRegistry, PaymentRelay, PendingTx, TransferReceipt};
use crate::identity::{Identifier, RawEvent};
use crate::session::WalletEvent;
use crate::wallet::{
    Address, ChainDescriptor, WalletError, WalletErrorCode, WalletProvider,
    UNRECOGNIZED_CHAIN_CODE,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

// =============================================================================
// Devnet Constants
// =============================================================================

/// Gas every simulated `sendPayment` is estimated at.
pub const DEVNET_TRANSFER_GAS: u64 = 52_731;

/// Gas every simulated `registerID` uses.
pub const DEVNET_REGISTER_GAS: u64 = 94_112;

/// Block height the devnet starts at.
pub const DEVNET_START_BLOCK: u64 = 20_000;

/// Default signer account.
pub const DEVNET_SIGNER: &str = "0x00000000000000000000000000000000000000a1";

/// Gas price charged for simulated transactions (1 gwei).
const DEVNET_GAS_PRICE_WEI: u64 = 1_000_000_000;

/// Wallet notification channel capacity.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Placeholder bytecode installed at contract addresses.
const CONTRACT_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

/// Error type for devnet operations.
#[derive(Debug, thiserror::Error)]
pub enum DevnetError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for devnet operations.
pub type Result<T> = std::result::Result<T, DevnetError>;

/// Configuration for a simulated chain.
#[derive(Debug, Clone)]
pub struct DevnetConfig {
    /// Chain id of the simulated network.
    pub chain_id: u64,
    /// Chain the wallet is on at start.
    pub initial_chain_id: u64,
    /// Whether the wallet already knows `chain_id`; if not, switching to it
    /// fails with code 4902 until it is added.
    pub wallet_knows_chain: bool,
    /// Starting block height.
    pub start_block: u64,
    /// Signing account.
    pub signer: Address,
    /// Starting balance of the signer, in base units.
    pub signer_balance: U256,
    /// Identity registry address.
    pub registry_address: Address,
    /// Payment relay address.
    pub payment_address: Address,
    /// Gas estimate returned for transfers.
    pub transfer_gas: u64,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            chain_id: AMOY_CHAIN_ID,
            initial_chain_id: AMOY_CHAIN_ID,
            wallet_knows_chain: true,
            start_block: DEVNET_START_BLOCK,
            signer: Address::from(DEVNET_SIGNER),
            signer_balance: U256::exp10(20),
            registry_address: Address::from(DEFAULT_REGISTRY_ADDRESS),
            payment_address: Address::from(DEFAULT_PAYMENT_ADDRESS),
            transfer_gas: DEVNET_TRANSFER_GAS,
        }
    }
}

impl DevnetConfig {
    /// Devnet matching a client configuration's chain and contracts.
    #[must_use]
    pub fn for_client(config: &ClientConfig) -> Self {
        Self {
            chain_id: config.network.chain_id,
            initial_chain_id: config.network.chain_id,
            registry_address: Address::new(config.contracts.registry.clone()),
            payment_address: Address::new(config.contracts.payment.clone()),
            ..Self::default()
        }
    }

    /// Wallet starts on Ethereum mainnet and has never seen the devnet chain.
    #[must_use]
    pub fn unknown_chain() -> Self {
        Self {
            initial_chain_id: 1,
            wallet_knows_chain: false,
            ..Self::default()
        }
    }
}

/// A trait call made against the devnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevnetOp {
    /// `WalletProvider::request_accounts`
    RequestAccounts,
    /// `WalletProvider::active_chain_id`
    ActiveChainId,
    /// `WalletProvider::switch_chain`
    SwitchChain,
    /// `WalletProvider::add_chain`
    AddChain,
    /// `WalletProvider::signer_address`
    SignerAddress,
    /// `WalletProvider::block_height`
    BlockHeight,
    /// `WalletProvider::code_at`
    CodeAt,
    /// `IdentityRegistry::resolve`
    Resolve,
    /// `IdentityRegistry::register`
    Register,
    /// `IdentityRegistry::registered_events`
    RegisteredEvents,
    /// `PaymentRelay::estimate_transfer_gas`
    EstimateGas,
    /// `PaymentRelay::transfer`
    Transfer,
    /// `PendingTx::wait`
    Wait,
}

impl DevnetOp {
    /// True for calls that read or write contract state rather than wallet
    /// or chain metadata.
    #[must_use]
    pub fn touches_contracts(self) -> bool {
        matches!(
            self,
            Self::CodeAt
                | Self::Resolve
                | Self::Register
                | Self::RegisteredEvents
                | Self::EstimateGas
                | Self::Transfer
                | Self::Wait
        )
    }
}

/// A mined `sendPayment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevnetTransfer {
    /// Transaction hash.
    pub hash: String,
    /// Paid identifier.
    pub id: Identifier,
    /// Address the value was forwarded to.
    pub recipient: Address,
    /// Value in base units.
    pub value: U256,
    /// Gas limit the transaction carried.
    pub gas_limit: U256,
    /// Block it was mined in.
    pub block_number: u64,
}

#[derive(Debug)]
struct DevnetState {
    chain_id: u64,
    active_chain: u64,
    known_chains: BTreeSet<u64>,
    accounts: Vec<Address>,
    head: u64,
    code: HashMap<Address, Vec<u8>>,
    bindings: HashMap<Identifier, (Address, Address)>,
    events: Vec<RawEvent>,
    balances: HashMap<Address, U256>,
    receipts: HashMap<String, TransferReceipt>,
    transfers: Vec<DevnetTransfer>,
    calls: Vec<DevnetOp>,
    faults: HashMap<DevnetOp, WalletError>,
    stall_confirmations: bool,
    transfer_gas: u64,
    nonce: u64,
}

impl DevnetState {
    fn record(&mut self, op: DevnetOp) -> std::result::Result<(), WalletError> {
        self.calls.push(op);
        match self.faults.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_hash(&mut self) -> String {
        self.nonce += 1;
        format!("0x{:064x}", self.nonce)
    }

    fn mine(&mut self, hash: &str, gas_used: u64) -> u64 {
        self.head += 1;
        self.receipts.insert(
            hash.to_string(),
            TransferReceipt {
                transaction_hash: hash.to_string(),
                block_number: Some(self.head),
                gas_used: Some(U256::from(gas_used)),
            },
        );
        self.head
    }

    fn charge(&mut self, account: &Address, amount: U256) -> std::result::Result<(), WalletError> {
        let balance = self.balances.entry(account.clone()).or_default();
        if *balance < amount {
            return Err(WalletError::new(
                WalletErrorCode::InsufficientFunds,
                "insufficient funds for gas * price + value",
            ));
        }
        *balance -= amount;
        Ok(())
    }

    fn signer(&self) -> std::result::Result<Address, WalletError> {
        self.accounts.first().cloned().ok_or_else(|| {
            WalletError::new(WalletErrorCode::Rpc(4100), "no account is connected")
        })
    }

    fn bind(&mut self, id: &Identifier, primary: &Address, secondary: &Address, block: u64) {
        self.bindings
            .insert(id.clone(), (primary.clone(), secondary.clone()));
        self.events.push(RawEvent::new(
            id.as_str(),
            primary.as_str(),
            secondary.as_str(),
            block,
        ));
    }
}

fn revert(reason: &str) -> WalletError {
    WalletError::new(
        WalletErrorCode::CallException,
        format!("execution reverted: {reason}"),
    )
    .with_reason(reason)
}

/// A simulated chain with the registry and payment relay deployed.
#[derive(Clone)]
pub struct Devnet {
    config: DevnetConfig,
    state: Arc<Mutex<DevnetState>>,
    events: broadcast::Sender<WalletEvent>,
}

impl Devnet {
    /// Start a devnet.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry and payment relay share an address.
    pub fn new(config: DevnetConfig) -> Result<Self> {
        if config.registry_address == config.payment_address {
            return Err(DevnetError::Config(
                "registry and payment relay must have distinct addresses".to_string(),
            ));
        }

        let mut known_chains = BTreeSet::from([config.initial_chain_id]);
        if config.wallet_knows_chain {
            known_chains.insert(config.chain_id);
        }

        let state = DevnetState {
            chain_id: config.chain_id,
            active_chain: config.initial_chain_id,
            known_chains,
            accounts: vec![config.signer.clone()],
            head: config.start_block,
            code: HashMap::from([
                (config.registry_address.clone(), CONTRACT_CODE.to_vec()),
                (config.payment_address.clone(), CONTRACT_CODE.to_vec()),
            ]),
            bindings: HashMap::new(),
            events: Vec::new(),
            balances: HashMap::from([(config.signer.clone(), config.signer_balance)]),
            receipts: HashMap::new(),
            transfers: Vec::new(),
            calls: Vec::new(),
            faults: HashMap::new(),
            stall_confirmations: false,
            transfer_gas: config.transfer_gas,
            nonce: 0,
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            "Devnet started: chain {} at block {}",
            config.chain_id, config.start_block
        );
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(state)),
            events,
        })
    }

    /// Configuration the devnet was started with.
    #[must_use]
    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    /// Wallet handle.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn WalletProvider> {
        Arc::new(DevnetWallet {
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        })
    }

    /// Identity registry handle.
    #[must_use]
    pub fn registry(&self) -> Arc<dyn IdentityRegistry> {
        Arc::new(DevnetRegistry {
            address: self.config.registry_address.clone(),
            state: Arc::clone(&self.state),
        })
    }

    /// Payment relay handle.
    #[must_use]
    pub fn relay(&self) -> Arc<dyn PaymentRelay> {
        Arc::new(DevnetRelay {
            address: self.config.payment_address.clone(),
            state: Arc::clone(&self.state),
        })
    }

    // -------------------------------------------------------------------------
    // Chain manipulation
    // -------------------------------------------------------------------------

    /// Register an identifier directly, mining one block.
    pub fn seed_registration(&self, id: &str, primary: &str, secondary: &str) -> u64 {
        let mut state = self.state.lock();
        state.head += 1;
        let block = state.head;
        state.bind(
            &Identifier::from(id),
            &Address::from(primary),
            &Address::from(secondary),
            block,
        );
        debug!("Seeded {id} at block {block}");
        block
    }

    /// Advance the head by `blocks` empty blocks.
    pub fn mine_blocks(&self, blocks: u64) {
        self.state.lock().head += blocks;
    }

    /// Current block height.
    #[must_use]
    pub fn head(&self) -> u64 {
        self.state.lock().head
    }

    /// Remove the code at `address`, as if nothing were deployed there.
    pub fn remove_code(&self, address: &Address) {
        self.state.lock().code.remove(address);
    }

    /// Balance of `address` in base units.
    #[must_use]
    pub fn balance_of(&self, address: &Address) -> U256 {
        self.state
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Set the balance of `address`.
    pub fn set_balance(&self, address: &Address, balance: U256) {
        self.state.lock().balances.insert(address.clone(), balance);
    }

    /// Mined payments, oldest first.
    #[must_use]
    pub fn transfers(&self) -> Vec<DevnetTransfer> {
        self.state.lock().transfers.clone()
    }

    // -------------------------------------------------------------------------
    // Wallet-side changes
    // -------------------------------------------------------------------------

    /// The user switches chains in the wallet.
    pub fn user_switch_chain(&self, chain_id: u64) {
        {
            let mut state = self.state.lock();
            state.known_chains.insert(chain_id);
            state.active_chain = chain_id;
        }
        let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
    }

    /// The user changes the exposed accounts in the wallet.
    pub fn user_set_accounts(&self, accounts: Vec<Address>) {
        {
            let mut state = self.state.lock();
            for account in &accounts {
                state.balances.entry(account.clone()).or_default();
            }
            state.accounts.clone_from(&accounts);
        }
        let _ = self.events.send(WalletEvent::AccountsChanged(accounts));
    }

    /// The wallet disconnects.
    pub fn user_disconnect(&self) {
        self.state.lock().accounts.clear();
        let _ = self.events.send(WalletEvent::Disconnected);
    }

    // -------------------------------------------------------------------------
    // Fault injection and call log
    // -------------------------------------------------------------------------

    /// Make every subsequent `op` call fail with `err`.
    pub fn fail(&self, op: DevnetOp, err: WalletError) {
        self.state.lock().faults.insert(op, err);
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Keep submitted transactions unconfirmed: `wait` never returns.
    pub fn stall_confirmations(&self, stall: bool) {
        self.state.lock().stall_confirmations = stall;
    }

    /// Calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<DevnetOp> {
        self.state.lock().calls.clone()
    }

    /// Number of calls of kind `op`.
    #[must_use]
    pub fn call_count(&self, op: DevnetOp) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

// =============================================================================
// Handles
// =============================================================================

struct DevnetWallet {
    state: Arc<Mutex<DevnetState>>,
    events: broadcast::Sender<WalletEvent>,
}

#[async_trait]
impl WalletProvider for DevnetWallet {
    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::RequestAccounts)?;
        Ok(state.accounts.clone())
    }

    async fn active_chain_id(&self) -> std::result::Result<u64, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::ActiveChainId)?;
        Ok(state.active_chain)
    }

    async fn switch_chain(&self, chain_id: u64) -> std::result::Result<(), WalletError> {
        {
            let mut state = self.state.lock();
            state.record(DevnetOp::SwitchChain)?;
            if !state.known_chains.contains(&chain_id) {
                return Err(WalletError::new(
                    WalletErrorCode::Rpc(UNRECOGNIZED_CHAIN_CODE),
                    format!("Unrecognized chain ID \"0x{chain_id:x}\""),
                ));
            }
            state.active_chain = chain_id;
        }
        let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn add_chain(
        &self,
        descriptor: &ChainDescriptor,
    ) -> std::result::Result<(), WalletError> {
        let chain_id = {
            let mut state = self.state.lock();
            state.record(DevnetOp::AddChain)?;
            let chain_id = u64::from_str_radix(descriptor.chain_id.trim_start_matches("0x"), 16)
                .map_err(|_| {
                    WalletError::new(
                        WalletErrorCode::Rpc(-32602),
                        format!("invalid chainId {}", descriptor.chain_id),
                    )
                })?;
            if descriptor.rpc_urls.is_empty() {
                return Err(WalletError::new(
                    WalletErrorCode::Rpc(-32602),
                    "rpcUrls must not be empty",
                ));
            }
            state.known_chains.insert(chain_id);
            state.active_chain = chain_id;
            chain_id
        };
        let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn signer_address(&self) -> std::result::Result<Address, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::SignerAddress)?;
        state.signer()
    }

    async fn block_height(&self) -> std::result::Result<u64, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::BlockHeight)?;
        Ok(state.head)
    }

    async fn code_at(&self, address: &Address) -> std::result::Result<Vec<u8>, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::CodeAt)?;
        if state.active_chain != state.chain_id {
            return Ok(Vec::new());
        }
        Ok(state.code.get(address).cloned().unwrap_or_default())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        Some(self.events.subscribe())
    }
}

struct DevnetRegistry {
    address: Address,
    state: Arc<Mutex<DevnetState>>,
}

#[async_trait]
impl IdentityRegistry for DevnetRegistry {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn resolve(
        &self,
        id: &Identifier,
        network_tag: &str,
    ) -> std::result::Result<Address, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::Resolve)?;
        let Some((primary, secondary)) = state.bindings.get(id) else {
            return Ok(Address::zero());
        };
        match network_tag {
            "ethereum" => Ok(primary.clone()),
            "polygon" => Ok(secondary.clone()),
            other => Err(revert(&format!("Unsupported network: {other}"))),
        }
    }

    async fn register(
        &self,
        id: &Identifier,
        primary: &Address,
        secondary: &Address,
    ) -> std::result::Result<Box<dyn PendingTx>, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::Register)?;
        let signer = state.signer()?;
        if id.is_empty() {
            return Err(revert("ID cannot be empty"));
        }
        let fee = U256::from(DEVNET_REGISTER_GAS) * U256::from(DEVNET_GAS_PRICE_WEI);
        state.charge(&signer, fee)?;

        let hash = state.next_hash();
        let block = state.mine(&hash, DEVNET_REGISTER_GAS);
        state.bind(id, primary, secondary, block);
        debug!("Devnet registered {id} in block {block}");

        Ok(Box::new(DevnetPendingTx {
            hash,
            state: Arc::clone(&self.state),
        }))
    }

    async fn registered_events(
        &self,
        from_block: u64,
    ) -> std::result::Result<Vec<RawEvent>, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::RegisteredEvents)?;
        Ok(state
            .events
            .iter()
            .filter(|e| e.block_number.is_some_and(|b| b >= from_block))
            .cloned()
            .collect())
    }
}

struct DevnetRelay {
    address: Address,
    state: Arc<Mutex<DevnetState>>,
}

impl DevnetRelay {
    fn recipient(
        state: &DevnetState,
        id: &Identifier,
        network_tag: &str,
    ) -> std::result::Result<Address, WalletError> {
        let (primary, secondary) = state
            .bindings
            .get(id)
            .ok_or_else(|| revert("ID not registered"))?;
        let recipient = match network_tag {
            "ethereum" => primary,
            "polygon" => secondary,
            other => return Err(revert(&format!("Unsupported network: {other}"))),
        };
        if recipient.is_zero() {
            return Err(revert("ID not registered"));
        }
        Ok(recipient.clone())
    }
}

#[async_trait]
impl PaymentRelay for DevnetRelay {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn estimate_transfer_gas(
        &self,
        id: &Identifier,
        network_tag: &str,
        value: U256,
    ) -> std::result::Result<U256, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::EstimateGas)?;
        Self::recipient(&state, id, network_tag)?;
        if value.is_zero() {
            return Err(revert("Payment amount must be greater than 0"));
        }
        Ok(U256::from(state.transfer_gas))
    }

    async fn transfer(
        &self,
        id: &Identifier,
        network_tag: &str,
        value: U256,
        gas_limit: U256,
    ) -> std::result::Result<Box<dyn PendingTx>, WalletError> {
        let mut state = self.state.lock();
        state.record(DevnetOp::Transfer)?;
        let signer = state.signer()?;
        let recipient = Self::recipient(&state, id, network_tag)?;

        let gas_price = U256::from(DEVNET_GAS_PRICE_WEI);
        let max_cost = gas_limit.saturating_mul(gas_price).saturating_add(value);
        if state.balances.get(&signer).copied().unwrap_or_default() < max_cost {
            return Err(WalletError::new(
                WalletErrorCode::InsufficientFunds,
                "insufficient funds for gas * price + value",
            ));
        }
        let gas_used = state.transfer_gas;
        if gas_limit < U256::from(gas_used) {
            return Err(revert("out of gas"));
        }
        state.charge(&signer, U256::from(gas_used) * gas_price + value)?;
        *state.balances.entry(recipient.clone()).or_default() += value;

        let hash = state.next_hash();
        let block_number = state.mine(&hash, gas_used);
        state.transfers.push(DevnetTransfer {
            hash: hash.clone(),
            id: id.clone(),
            recipient,
            value,
            gas_limit,
            block_number,
        });

        Ok(Box::new(DevnetPendingTx {
            hash,
            state: Arc::clone(&self.state),
        }))
    }
}

struct DevnetPendingTx {
    hash: String,
    state: Arc<Mutex<DevnetState>>,
}

#[async_trait]
impl PendingTx for DevnetPendingTx {
    fn hash(&self) -> String {
        self.hash.clone()
    }

    async fn wait(
        &self,
        confirmations: usize,
    ) -> std::result::Result<TransferReceipt, WalletError> {
        let receipt = {
            let mut state = self.state.lock();
            state.record(DevnetOp::Wait)?;
            if state.stall_confirmations {
                None
            } else {
                let receipt = state.receipts.get(&self.hash).cloned();
                // Confirmations beyond the first need blocks on top.
                if let Some(block) = receipt.as_ref().and_then(|r| r.block_number) {
                    let needed = block + confirmations.saturating_sub(1) as u64;
                    if state.head < needed {
                        state.head = needed;
                    }
                }
                Some(receipt.ok_or_else(|| {
                    WalletError::new(
                        WalletErrorCode::Unknown,
                        format!("unknown transaction {}", self.hash),
                    )
                }))
            }
        };
        match receipt {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}
