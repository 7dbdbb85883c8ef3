//! End-to-end flows against the in-process devnet.
//!
//! ## Architecture
//!
//! ```text
//! TestHarness
//!     ├── Devnet (simulated chain, fault injection, call log)
//!     ├── CupidClient
//!     └── JsonFileStore (temp dir)
//! ```

mod harness;

#[cfg(test)]
mod payment_flow;
#[cfg(test)]
mod registration_flow;
#[cfg(test)]
mod request_flow;
#[cfg(test)]
mod wallet_events;

pub use harness::TestHarness;
