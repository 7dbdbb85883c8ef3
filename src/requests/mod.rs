//! Local payment requests.
//!
//! A request asks another identifier to pay one of the caller's own
//! identifiers. Requests are unauthenticated local records:
//!
//! ```text
//! request_payment ──► create ──► [pending] ──► mark_completed ──► [completed]
//!                                    ▲                ▲
//!                          list_pending_for      successful payment of a
//!                          (payer's view)        request-derived intent
//! ```

mod ledger;
mod model;
mod store;

pub use ledger::RequestLedger;
pub use model::{PaymentRequest, RequestKey, RequestStatus};
pub use store::{JsonFileStore, MemoryStore, RequestStore, REQUESTS_KEY};
