//! JSON-RPC backend built on `ethers`.
//!
//! A local private key signs transactions and a single HTTP endpoint serves
//! reads, writes and log queries. Contract calls are ABI-encoded from
//! human-readable signatures; no generated bindings are needed.

use crate::config::ClientConfig;
use crate::contracts::{IdentityRegistry, PaymentRelay, PendingTx, TransferReceipt};
use crate::error::{Error, Result};
use crate::identity::{Identifier, RawEvent};
use crate::wallet::{Address, ChainDescriptor, WalletError, WalletErrorCode, WalletProvider};
use async_trait::async_trait;
use ethers::abi::{Abi, Function, RawLog, Token};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, MiddlewareError, PendingTransaction, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{
    transaction::eip2718::TypedTransaction, BlockNumber, Bytes, Filter, TransactionRequest, H160,
    H256,
};
use primitive_types::U256;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Registry interface.
const REGISTRY_ABI: &[&str] = &[
    "function registerID(string id, address ethereum, address polygon)",
    "function resolve(string id, string network) view returns (address)",
    "event IDRegistered(string id, address ethereum, address polygon)",
];

/// Payment relay interface.
const PAYMENT_ABI: &[&str] = &["function sendPayment(string id, string network) payable"];

/// Signature the registration filter matches on.
const ID_REGISTERED_SIGNATURE: &str = "IDRegistered(string,address,address)";

/// Prefix nodes put in front of revert reasons.
const REVERT_PREFIX: &str = "execution reverted: ";

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND_CODE: i64 = -32601;

type EvmClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// A signer and endpoint with handles for the wallet and both contracts.
pub struct EvmChain {
    client: Arc<EvmClient>,
    registry: Arc<EvmRegistry>,
    relay: Arc<EvmRelay>,
}

impl EvmChain {
    /// Connect to `rpc_url` and sign with `private_key` (hex).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a malformed URL, key or contract
    /// address and [`Error::WalletUnavailable`] if the endpoint does not
    /// answer.
    pub async fn connect(rpc_url: &str, private_key: &str, config: &ClientConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| Error::Config(format!("invalid RPC URL {rpc_url}: {e}")))?;
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| Error::Config(format!("invalid private key: {e}")))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| Error::WalletUnavailable(format!("RPC endpoint unreachable: {e}")))?;
        let wallet = wallet.with_chain_id(chain_id.as_u64());
        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        info!(
            "Connected to {rpc_url} (chain {chain_id}) as {:?}",
            client.address()
        );

        let registry_abi = ethers::abi::parse_abi(REGISTRY_ABI)
            .map_err(|e| Error::Config(format!("registry ABI: {e}")))?;
        let payment_abi = ethers::abi::parse_abi(PAYMENT_ABI)
            .map_err(|e| Error::Config(format!("payment ABI: {e}")))?;

        let registry_address = crate::wallet::parse_address(&config.contracts.registry)?;
        let payment_address = crate::wallet::parse_address(&config.contracts.payment)?;

        Ok(Self {
            registry: Arc::new(EvmRegistry {
                address: registry_address,
                abi: registry_abi,
                client: Arc::clone(&client),
            }),
            relay: Arc::new(EvmRelay {
                address: payment_address,
                abi: payment_abi,
                client: Arc::clone(&client),
            }),
            client,
        })
    }

    /// Wallet handle.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn WalletProvider> {
        Arc::new(EvmWallet {
            client: Arc::clone(&self.client),
        })
    }

    /// Identity registry handle.
    #[must_use]
    pub fn registry(&self) -> Arc<dyn IdentityRegistry> {
        Arc::clone(&self.registry) as Arc<dyn IdentityRegistry>
    }

    /// Payment relay handle.
    #[must_use]
    pub fn relay(&self) -> Arc<dyn PaymentRelay> {
        Arc::clone(&self.relay) as Arc<dyn PaymentRelay>
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn to_h160(address: &Address) -> std::result::Result<H160, WalletError> {
    address
        .to_bytes()
        .map(H160::from)
        .map_err(|e| WalletError::new(WalletErrorCode::Unknown, e.to_string()))
}

fn from_h160(address: H160) -> Address {
    Address::from_bytes(address.0)
}

fn to_eth_u256(value: U256) -> ethers::types::U256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    ethers::types::U256::from_big_endian(&bytes)
}

fn from_eth_u256(value: ethers::types::U256) -> U256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes)
}

fn hash_hex(hash: H256) -> String {
    format!("{hash:?}")
}

fn function<'a>(abi: &'a Abi, name: &str) -> std::result::Result<&'a Function, WalletError> {
    abi.function(name)
        .map_err(|e| WalletError::new(WalletErrorCode::Unknown, format!("ABI has no {name}: {e}")))
}

fn encode(function: &Function, args: &[Token]) -> std::result::Result<Bytes, WalletError> {
    function
        .encode_input(args)
        .map(Bytes::from)
        .map_err(|e| {
            WalletError::new(
                WalletErrorCode::Unknown,
                format!("encode {}: {e}", function.name),
            )
        })
}

/// Map an `ethers` middleware error onto the wallet error classes.
fn classify<E: MiddlewareError>(err: &E) -> WalletError {
    let text = err.to_string();
    let lower = text.to_lowercase();

    let reason = text
        .find(REVERT_PREFIX)
        .map(|start| text[start + REVERT_PREFIX.len()..].trim().to_string());

    let code = if lower.contains("insufficient funds") {
        WalletErrorCode::InsufficientFunds
    } else if lower.contains("user rejected") || lower.contains("user denied") {
        WalletErrorCode::ActionRejected
    } else if reason.is_some() || lower.contains("execution reverted") {
        WalletErrorCode::CallException
    } else if lower.contains("timed out") || lower.contains("timeout") {
        WalletErrorCode::Timeout
    } else if let Some(response) = err.as_error_response() {
        WalletErrorCode::Rpc(response.code)
    } else if lower.contains("error sending request")
        || lower.contains("connection")
        || lower.contains("dns")
    {
        WalletErrorCode::NetworkError
    } else if lower.contains("http") || lower.contains("server") {
        WalletErrorCode::ServerError
    } else {
        WalletErrorCode::Unknown
    };

    let mut wallet_err = WalletError::new(code, text);
    if let Some(reason) = reason {
        wallet_err = wallet_err.with_reason(reason);
    }
    wallet_err
}

// =============================================================================
// Wallet
// =============================================================================

struct EvmWallet {
    client: Arc<EvmClient>,
}

#[async_trait]
impl WalletProvider for EvmWallet {
    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, WalletError> {
        Ok(vec![from_h160(self.client.address())])
    }

    async fn active_chain_id(&self) -> std::result::Result<u64, WalletError> {
        self.client
            .get_chainid()
            .await
            .map(|id| id.as_u64())
            .map_err(|e| classify(&e))
    }

    async fn switch_chain(&self, chain_id: u64) -> std::result::Result<(), WalletError> {
        let params = [serde_json::json!({ "chainId": format!("0x{chain_id:x}") })];
        self.client
            .provider()
            .request::<_, serde_json::Value>("wallet_switchEthereumChain", params)
            .await
            .map(|_| ())
            .map_err(|e| {
                let err = classify(&e);
                if err.code == WalletErrorCode::Rpc(METHOD_NOT_FOUND_CODE) {
                    WalletError::new(
                        err.code,
                        format!(
                            "endpoint is bound to another chain and cannot switch to {chain_id}"
                        ),
                    )
                } else {
                    err
                }
            })
    }

    async fn add_chain(
        &self,
        descriptor: &ChainDescriptor,
    ) -> std::result::Result<(), WalletError> {
        self.client
            .provider()
            .request::<_, serde_json::Value>("wallet_addEthereumChain", [descriptor])
            .await
            .map(|_| ())
            .map_err(|e| classify(&e))
    }

    async fn signer_address(&self) -> std::result::Result<Address, WalletError> {
        Ok(from_h160(self.client.address()))
    }

    async fn block_height(&self) -> std::result::Result<u64, WalletError> {
        self.client
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|e| classify(&e))
    }

    async fn code_at(&self, address: &Address) -> std::result::Result<Vec<u8>, WalletError> {
        let code = self
            .client
            .get_code(to_h160(address)?, None)
            .await
            .map_err(|e| classify(&e))?;
        Ok(code.to_vec())
    }
}

// =============================================================================
// Contracts
// =============================================================================

struct EvmRegistry {
    address: Address,
    abi: Abi,
    client: Arc<EvmClient>,
}

#[async_trait]
impl IdentityRegistry for EvmRegistry {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn resolve(
        &self,
        id: &Identifier,
        network_tag: &str,
    ) -> std::result::Result<Address, WalletError> {
        let resolve = function(&self.abi, "resolve")?;
        let data = encode(
            resolve,
            &[
                Token::String(id.as_str().to_string()),
                Token::String(network_tag.to_string()),
            ],
        )?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(to_h160(&self.address)?)
            .data(data)
            .into();

        let output = self.client.call(&tx, None).await.map_err(|e| classify(&e))?;
        let tokens = resolve.decode_output(&output).map_err(|e| {
            WalletError::new(
                WalletErrorCode::CallException,
                format!("undecodable resolve output: {e}"),
            )
        })?;
        match tokens.first() {
            Some(Token::Address(address)) => Ok(from_h160(*address)),
            _ => Ok(Address::zero()),
        }
    }

    async fn register(
        &self,
        id: &Identifier,
        primary: &Address,
        secondary: &Address,
    ) -> std::result::Result<Box<dyn PendingTx>, WalletError> {
        let data = encode(
            function(&self.abi, "registerID")?,
            &[
                Token::String(id.as_str().to_string()),
                Token::Address(to_h160(primary)?),
                Token::Address(to_h160(secondary)?),
            ],
        )?;
        let tx = TransactionRequest::new()
            .to(to_h160(&self.address)?)
            .data(data);

        debug!("Sending registerID({id}) to {}", self.address);
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| classify(&e))?;
        Ok(Box::new(EvmPendingTx {
            hash: pending.tx_hash(),
            client: Arc::clone(&self.client),
        }))
    }

    async fn registered_events(
        &self,
        from_block: u64,
    ) -> std::result::Result<Vec<RawEvent>, WalletError> {
        let event = self.abi.event("IDRegistered").map_err(|e| {
            WalletError::new(WalletErrorCode::Unknown, format!("ABI has no IDRegistered: {e}"))
        })?;
        let filter = Filter::new()
            .address(to_h160(&self.address)?)
            .event(ID_REGISTERED_SIGNATURE)
            .from_block(from_block)
            .to_block(BlockNumber::Latest);

        let logs = self.client.get_logs(&filter).await.map_err(|e| classify(&e))?;
        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            let block_number = log.block_number.map(|b| b.as_u64());
            let parsed = match event.parse_log(RawLog {
                topics: log.topics,
                data: log.data.to_vec(),
            }) {
                Ok(parsed) => parsed,
                Err(e) => {
                    trace!("Undecodable IDRegistered log: {e}");
                    events.push(RawEvent {
                        block_number,
                        ..RawEvent::default()
                    });
                    continue;
                }
            };

            let mut raw = RawEvent {
                block_number,
                ..RawEvent::default()
            };
            for param in parsed.params {
                match (param.name.as_str(), param.value) {
                    ("id", Token::String(id)) => raw.id = Some(id),
                    ("ethereum", Token::Address(a)) => {
                        raw.primary_address = Some(from_h160(a).as_str().to_string());
                    }
                    ("polygon", Token::Address(a)) => {
                        raw.secondary_address = Some(from_h160(a).as_str().to_string());
                    }
                    _ => {}
                }
            }
            events.push(raw);
        }
        Ok(events)
    }
}

struct EvmRelay {
    address: Address,
    abi: Abi,
    client: Arc<EvmClient>,
}

impl EvmRelay {
    fn payment_tx(
        &self,
        id: &Identifier,
        network_tag: &str,
        value: U256,
    ) -> std::result::Result<TransactionRequest, WalletError> {
        let data = encode(
            function(&self.abi, "sendPayment")?,
            &[
                Token::String(id.as_str().to_string()),
                Token::String(network_tag.to_string()),
            ],
        )?;
        Ok(TransactionRequest::new()
            .from(self.client.address())
            .to(to_h160(&self.address)?)
            .data(data)
            .value(to_eth_u256(value)))
    }
}

#[async_trait]
impl PaymentRelay for EvmRelay {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn estimate_transfer_gas(
        &self,
        id: &Identifier,
        network_tag: &str,
        value: U256,
    ) -> std::result::Result<U256, WalletError> {
        let tx: TypedTransaction = self.payment_tx(id, network_tag, value)?.into();
        self.client
            .estimate_gas(&tx, None)
            .await
            .map(from_eth_u256)
            .map_err(|e| classify(&e))
    }

    async fn transfer(
        &self,
        id: &Identifier,
        network_tag: &str,
        value: U256,
        gas_limit: U256,
    ) -> std::result::Result<Box<dyn PendingTx>, WalletError> {
        let tx = self
            .payment_tx(id, network_tag, value)?
            .gas(to_eth_u256(gas_limit));
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| classify(&e))?;
        Ok(Box::new(EvmPendingTx {
            hash: pending.tx_hash(),
            client: Arc::clone(&self.client),
        }))
    }
}

struct EvmPendingTx {
    hash: H256,
    client: Arc<EvmClient>,
}

#[async_trait]
impl PendingTx for EvmPendingTx {
    fn hash(&self) -> String {
        hash_hex(self.hash)
    }

    async fn wait(
        &self,
        confirmations: usize,
    ) -> std::result::Result<TransferReceipt, WalletError> {
        let receipt = PendingTransaction::new(self.hash, self.client.provider())
            .confirmations(confirmations)
            .await
            .map_err(|e| classify(&e))?
            .ok_or_else(|| {
                WalletError::new(
                    WalletErrorCode::Unknown,
                    format!("transaction {} was dropped", hash_hex(self.hash)),
                )
            })?;

        if receipt.status.is_some_and(|s| s.is_zero()) {
            return Err(WalletError::new(
                WalletErrorCode::CallException,
                format!("transaction {} reverted", hash_hex(self.hash)),
            ));
        }

        Ok(TransferReceipt {
            transaction_hash: hash_hex(receipt.transaction_hash),
            block_number: receipt.block_number.map(|b| b.as_u64()),
            gas_used: receipt.gas_used.map(from_eth_u256),
        })
    }
}
