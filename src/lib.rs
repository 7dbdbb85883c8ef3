//! # cupid-client
//!
//! Resolve `@name@cupid` identifiers to chain addresses and pay or request
//! payment by identifier, against the CUPID identity registry and payment
//! relay contracts.
//!
//! ## Architecture
//!
//! The chain is reached only through traits:
//! - [`wallet::WalletProvider`] for accounts, chain identity and code lookups
//! - [`contracts::IdentityRegistry`] for `resolve`, `registerID` and the
//!   `IDRegistered` log
//! - [`contracts::PaymentRelay`] for `sendPayment`
//!
//! Two backends implement them: `evm` (JSON-RPC via `ethers`, feature
//! `evm`) and [`devnet`] (an in-process simulated chain).
//!
//! On top of them:
//! - [`network::NetworkGuard`] keeps the wallet on the required chain
//! - [`identity`] scans recent registrations into an address index
//! - [`payment::PaymentOrchestrator`] validates, estimates, submits and
//!   confirms a payment
//! - [`requests::RequestLedger`] tracks local payment requests
//! - [`client::CupidClient`] wires them together
//!
//! ## Example
//!
//! ```rust,no_run
//! use cupid_client::devnet::{Devnet, DevnetConfig};
//! use cupid_client::payment::PaymentIntent;
//! use cupid_client::requests::MemoryStore;
//! use cupid_client::{ClientConfig, CupidClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let devnet = Devnet::new(DevnetConfig::default())?;
//!     devnet.seed_registration(
//!         "@alice@cupid",
//!         "0x0000000000000000000000000000000000000001",
//!         "0x0000000000000000000000000000000000000002",
//!     );
//!     let client = CupidClient::new(
//!         ClientConfig::default(),
//!         devnet.provider(),
//!         devnet.registry(),
//!         devnet.relay(),
//!         Arc::new(MemoryStore::new()),
//!     )?;
//!     client.connect().await?;
//!     let receipt = client.send(&PaymentIntent::manual("@alice@cupid", "1.5")).await?;
//!     println!("{}", receipt.transaction_hash);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod contracts;
pub mod devnet;
pub mod error;
#[cfg(feature = "evm")]
pub mod evm;
pub mod identity;
pub mod network;
pub mod payment;
pub mod requests;
pub mod session;
pub mod wallet;

pub use client::CupidClient;
pub use config::{ClientConfig, NetworkConfig, PaymentConfig};
pub use contracts::{IdentityRegistry, PaymentRelay, PendingTx, TransferReceipt};
pub use error::{Error, Result};
pub use identity::{Identifier, IdentityIndex, Registration};
pub use network::NetworkGuard;
pub use payment::{IntentForm, PaymentIntent, PaymentOrchestrator};
pub use requests::{PaymentRequest, RequestLedger, RequestStatus};
pub use session::{Session, WalletEvent};
pub use wallet::{Address, WalletProvider};
