//! Bounded-window scanning of registration events.
//!
//! Identity data is best effort: a failed query never aborts the caller. It
//! yields an empty event list and a [`ScanStatus::Failed`] the UI can show.

use super::{IdentityIndex, RawEvent};
use crate::contracts::IdentityRegistry;
use crate::wallet::WalletProvider;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Default number of blocks scanned back from the chain head.
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 10_000;

/// First block of the scan window for a chain at `head`.
#[must_use]
pub fn window_start(head: u64, lookback_blocks: u64) -> u64 {
    head.saturating_sub(lookback_blocks)
}

/// Outcome of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// Events were loaded from `from_block` to the head.
    Loaded {
        /// First block of the window.
        from_block: u64,
    },
    /// The log query failed; the event list is empty.
    Failed {
        /// Why the query failed.
        reason: String,
    },
}

impl ScanStatus {
    /// True if the scan failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Events returned by a scan plus its status.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Complete events, in source order.
    pub events: Vec<RawEvent>,
    /// Outcome.
    pub status: ScanStatus,
}

impl ScanResult {
    fn failed(reason: String) -> Self {
        Self {
            events: Vec::new(),
            status: ScanStatus::Failed { reason },
        }
    }

    /// Build an index from the scanned events.
    #[must_use]
    pub fn into_index(self) -> (IdentityIndex, ScanStatus) {
        (IdentityIndex::build(&self.events), self.status)
    }
}

/// Queries registration logs over `[head - lookback, latest]`.
pub struct EventWindowScanner {
    provider: Arc<dyn WalletProvider>,
    registry: Arc<dyn IdentityRegistry>,
    lookback_blocks: u64,
}

impl EventWindowScanner {
    /// Create a scanner.
    #[must_use]
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        registry: Arc<dyn IdentityRegistry>,
        lookback_blocks: u64,
    ) -> Self {
        Self {
            provider,
            registry,
            lookback_blocks,
        }
    }

    /// Scan the recent window for registration events.
    ///
    /// Never fails: query errors are logged and reported through the status.
    /// Events missing a required field are dropped.
    pub async fn scan(&self) -> ScanResult {
        let head = match self.provider.block_height().await {
            Ok(head) => head,
            Err(e) => {
                warn!("Failed to read block height for registration scan: {e}");
                return ScanResult::failed(format!("failed to read block height: {e}"));
            }
        };
        let from_block = window_start(head, self.lookback_blocks);
        debug!("Scanning registrations from block {from_block} (head {head})");

        let raw = match self.registry.registered_events(from_block).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Registration event query failed: {e}");
                return ScanResult::failed(format!("failed to query registrations: {e}"));
            }
        };

        let total = raw.len();
        let events: Vec<RawEvent> = raw
            .into_iter()
            .filter(|event| {
                let complete = event.is_complete();
                if !complete {
                    trace!("Dropping incomplete registration log: {event:?}");
                }
                complete
            })
            .collect();

        debug!(
            "Scanned {} registration events ({} dropped)",
            events.len(),
            total - events.len()
        );

        ScanResult {
            events,
            status: ScanStatus::Loaded { from_block },
        }
    }
}
