//! Registration records decoded from `IDRegistered` logs.

use super::Identifier;
use crate::wallet::Address;
use serde::{Deserialize, Serialize};

/// One `IDRegistered(id, ethereum, polygon)` log as delivered by the log
/// source. Fields are optional because logs can be truncated or fail to
/// decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    /// Registered identifier.
    pub id: Option<String>,
    /// Primary (Ethereum) address.
    pub primary_address: Option<String>,
    /// Secondary (Polygon) address.
    pub secondary_address: Option<String>,
    /// Block the log was emitted in.
    pub block_number: Option<u64>,
}

impl RawEvent {
    /// A fully-populated event.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        primary_address: impl Into<String>,
        secondary_address: impl Into<String>,
        block_number: u64,
    ) -> Self {
        Self {
            id: Some(id.into()),
            primary_address: Some(primary_address.into()),
            secondary_address: Some(secondary_address.into()),
            block_number: Some(block_number),
        }
    }

    /// True when every required field is present and the id is non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
            && self.primary_address.is_some()
            && self.secondary_address.is_some()
            && self.block_number.is_some()
    }

    /// Convert into a [`Registration`], or `None` if a field is missing.
    #[must_use]
    pub fn to_registration(&self) -> Option<Registration> {
        if !self.is_complete() {
            return None;
        }
        Some(Registration {
            id: Identifier::from(self.id.clone()?),
            primary_address: Address::new(self.primary_address.clone()?),
            secondary_address: Address::new(self.secondary_address.clone()?),
            block_number: self.block_number?,
        })
    }
}

/// An identifier bound to a primary and secondary address at a block height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// The identifier.
    pub id: Identifier,
    /// Primary (Ethereum) address.
    pub primary_address: Address,
    /// Secondary (Polygon) address.
    pub secondary_address: Address,
    /// Block the registration was emitted in.
    pub block_number: u64,
}

impl Registration {
    /// True if either address is empty or zero.
    #[must_use]
    pub fn has_zero_address(&self) -> bool {
        self.primary_address.is_zero() || self.secondary_address.is_zero()
    }

    /// True if `address` is the primary or secondary address.
    #[must_use]
    pub fn is_owned_by(&self, address: &Address) -> bool {
        self.primary_address == *address || self.secondary_address == *address
    }

    /// Address the registry resolves for `network_tag`.
    ///
    /// `"ethereum"` maps to the primary address and `"polygon"` to the
    /// secondary one.
    #[must_use]
    pub fn address_for(&self, network_tag: &str) -> Option<&Address> {
        match network_tag {
            "ethereum" => Some(&self.primary_address),
            "polygon" => Some(&self.secondary_address),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::ZERO_ADDRESS;

    #[test]
    fn test_incomplete_events_are_dropped() {
        let mut event = RawEvent::new("@a@cupid", "0x01", "0x02", 5);
        assert!(event.to_registration().is_some());

        event.block_number = None;
        assert!(event.to_registration().is_none());

        let event = RawEvent {
            id: Some(String::new()),
            ..RawEvent::new("", "0x01", "0x02", 5)
        };
        assert!(event.to_registration().is_none());

        let event = RawEvent {
            secondary_address: None,
            ..RawEvent::new("@a@cupid", "0x01", "0x02", 5)
        };
        assert!(!event.is_complete());
    }

    #[test]
    fn test_zero_address_detection() {
        let reg = RawEvent::new("@a@cupid", "0x01", ZERO_ADDRESS, 1).to_registration();
        assert!(reg.is_some_and(|r| r.has_zero_address()));
    }

    #[test]
    fn test_address_for_network_tag() {
        let reg = RawEvent::new("@a@cupid", "0x01", "0x02", 1).to_registration();
        let Some(reg) = reg else {
            panic!("complete event should convert");
        };
        assert_eq!(reg.address_for("ethereum"), Some(&Address::new("0x01")));
        assert_eq!(reg.address_for("polygon"), Some(&Address::new("0x02")));
        assert!(reg.address_for("solana").is_none());
        assert!(reg.is_owned_by(&Address::new("0X02")));
    }
}
