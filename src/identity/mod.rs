//! Identifier resolution.
//!
//! # Architecture
//!
//! ```text
//! registry logs ──► EventWindowScanner ──► IdentityIndex
//!   (last 10k blocks)    (drops incomplete)     ├── by_id:      id ─► latest Registration
//!                                               └── by_address: addr ─► {id}
//! ```
//!
//! The index is a cache. Payment always re-resolves the destination through
//! the registry's live `resolve` call.

mod identifier;
mod index;
mod registration;
mod scanner;

pub use identifier::{is_valid_identifier, Identifier, IDENTIFIER_SUFFIX};
pub use index::IdentityIndex;
pub use registration::{RawEvent, Registration};
pub use scanner::{
    window_start, EventWindowScanner, ScanResult, ScanStatus, DEFAULT_LOOKBACK_BLOCKS,
};
