//! Client interface for CUPID identifiers.
//!
//! # Architecture
//!
//! ```text
//!                       CupidClient
//!      ┌───────────────┬─────┴──────┬──────────────────┐
//!      ▼               ▼            ▼                  ▼
//!  NetworkGuard  EventWindowScanner PaymentOrchestrator RequestLedger
//!      │               │            │                  │
//!      ▼               ▼            ▼                  ▼
//!  WalletProvider  IdentityRegistry PaymentRelay      RequestStore
//! ```
//!
//! Every operation whose result depends on chain identity runs the network
//! guard first. Views that only read (`my_identifiers`, `request_payment`)
//! verify the chain without asking the wallet to switch.
//!
//! # Example
//!
//! ```rust,ignore
//! use cupid_client::client::CupidClient;
//! use cupid_client::devnet::{Devnet, DevnetConfig};
//! use cupid_client::payment::PaymentIntent;
//!
//! let devnet = Devnet::new(DevnetConfig::default())?;
//! let client = CupidClient::new(
//!     ClientConfig::default(),
//!     devnet.provider(),
//!     devnet.registry(),
//!     devnet.relay(),
//!     Arc::new(MemoryStore::new()),
//! )?;
//! client.connect().await?;
//! let receipt = client.send(&PaymentIntent::manual("@alice@cupid", "1.5")).await?;
//! println!("paid: {}", receipt.transaction_hash);
//! ```

mod cupid;

pub use cupid::CupidClient;
