//! Registration index built from scanned events.
//!
//! The index is a pure function of the events it is built from. Each refresh
//! builds a new index and replaces the old one; nothing is merged.

use super::{Identifier, RawEvent, Registration};
use crate::wallet::Address;
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// Latest registration per identifier, plus identifiers per address.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    /// One entry per identifier; the highest block wins.
    by_id: HashMap<Identifier, Registration>,
    /// Lowercased address to the identifiers registered under it.
    by_address: HashMap<String, BTreeSet<Identifier>>,
}

impl IdentityIndex {
    /// Build an index from raw registration events.
    ///
    /// Events are applied in ascending block order (log order breaks ties),
    /// so the registration with the highest block number wins regardless of
    /// the order the source returned them in. An identifier whose latest
    /// registration carries a zero or empty address is left out entirely.
    #[must_use]
    pub fn build(events: &[RawEvent]) -> Self {
        let mut registrations: Vec<Registration> = events
            .iter()
            .filter_map(|event| {
                let registration = event.to_registration();
                if registration.is_none() {
                    trace!("Dropping incomplete registration event: {event:?}");
                }
                registration
            })
            .collect();
        registrations.sort_by_key(|r| r.block_number);

        let mut by_id: HashMap<Identifier, Registration> = HashMap::new();
        for registration in registrations {
            if registration.has_zero_address() {
                trace!(
                    "Treating {} as unregistered (zero address at block {})",
                    registration.id,
                    registration.block_number
                );
                by_id.remove(&registration.id);
                continue;
            }
            by_id.insert(registration.id.clone(), registration);
        }

        let mut by_address: HashMap<String, BTreeSet<Identifier>> = HashMap::new();
        for registration in by_id.values() {
            for address in [&registration.primary_address, &registration.secondary_address] {
                by_address
                    .entry(address.normalized())
                    .or_default()
                    .insert(registration.id.clone());
            }
        }

        Self { by_id, by_address }
    }

    /// Latest registration for `id`.
    #[must_use]
    pub fn resolve(&self, id: &Identifier) -> Option<&Registration> {
        self.by_id.get(id)
    }

    /// Identifiers registered under `address` as primary or secondary.
    #[must_use]
    pub fn owned_by(&self, address: &Address) -> BTreeSet<Identifier> {
        self.by_address
            .get(&address.normalized())
            .cloned()
            .unwrap_or_default()
    }

    /// Registrations owned by `address`, newest first.
    #[must_use]
    pub fn registrations_owned_by(&self, address: &Address) -> Vec<&Registration> {
        let mut owned: Vec<&Registration> = self
            .owned_by(address)
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .collect();
        sort_newest_first(&mut owned);
        owned
    }

    /// True if `id` has a live registration in the scanned window.
    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        self.by_id.contains_key(id)
    }

    /// All registrations, newest first.
    #[must_use]
    pub fn by_recency(&self) -> Vec<&Registration> {
        let mut all: Vec<&Registration> = self.by_id.values().collect();
        sort_newest_first(&mut all);
        all
    }

    /// Number of registered identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if no identifier is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn sort_newest_first(registrations: &mut [&Registration]) {
    registrations.sort_by(|a, b| {
        b.block_number
            .cmp(&a.block_number)
            .then_with(|| a.id.cmp(&b.id))
    });
}
