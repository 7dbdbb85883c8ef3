//! Payments to CUPID identifiers.
//!
//! # Payment Flow
//!
//! ```text
//! PaymentIntent ──► ensure network ──► destination non-empty?
//!                                             │
//!                                             ▼
//!                   registry has code ──► live resolve(id, tag) ≠ 0x0
//!                                             │
//!                                             ▼
//!                   relay has code ──► exact amount ──► estimate gas
//!                                             │
//!                                             ▼
//!                   limit = ⌈estimate × 1.2⌉ ──► submit ──► await receipt
//!                                                               │
//!                                            request-derived? ──┴──► mark completed
//! ```
//!
//! The cached identity index is never consulted here; the registry's
//! `resolve` is authoritative.

mod amount;
mod intent;
mod orchestrator;

pub use amount::{
    apply_gas_margin, format_units, parse_native_amount, parse_units, NATIVE_DECIMALS,
};
pub use intent::{IntentForm, PaymentIntent};
pub use orchestrator::PaymentOrchestrator;
