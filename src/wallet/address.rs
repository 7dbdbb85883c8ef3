//! EVM address handling.
//!
//! Addresses arrive from user input, from registry calls and from scanned
//! event logs. They are kept as the text they arrived in and compared
//! case-insensitively, so checksummed and lowercase spellings of the same
//! account are equal.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The all-zero address returned by the registry for unknown identifiers.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Length of a fully-specified address string (`0x` + 40 hex chars).
const ADDRESS_STR_LEN: usize = 42;

/// An EVM account address.
///
/// Equality and hashing ignore ASCII case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an address string without validating it.
    ///
    /// Event logs may carry shortened or malformed values; use
    /// [`parse_address`] for user input.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The zero address.
    #[must_use]
    pub fn zero() -> Self {
        Self(ZERO_ADDRESS.to_string())
    }

    /// The address as originally written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used as a lookup key.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// True if the address is empty or every hex digit is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        let trimmed = self.0.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        digits.chars().all(|c| c == '0')
    }

    /// Decode into the 20 raw address bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not `0x` followed by 40 hex chars.
    pub fn to_bytes(&self) -> Result<[u8; 20]> {
        let parsed = parse_address(&self.0)?;
        let bytes = hex::decode(&parsed.0[2..])
            .map_err(|e| Error::InvalidAddress(format!("Failed to decode address: {e}")))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    /// Build an address from raw bytes, lowercase hex.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Shortened `0x1234...abcd` form for listings.
    #[must_use]
    pub fn short(&self) -> String {
        if self.0.len() == ADDRESS_STR_LEN && self.0.is_ascii() {
            format!("{}...{}", &self.0[..6], &self.0[38..])
        } else {
            self.0.clone()
        }
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Parse and validate an EVM address string.
///
/// # Arguments
///
/// * `address` - EVM address string (e.g., "0x1234...")
///
/// # Errors
///
/// Returns an error if the address format is invalid.
pub fn parse_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(Error::InvalidAddress(format!(
            "must start with '0x', got: {address}"
        )));
    }

    if address.len() != ADDRESS_STR_LEN {
        return Err(Error::InvalidAddress(format!(
            "expected {ADDRESS_STR_LEN} characters, got {}",
            address.len()
        )));
    }

    let hex_part = &address[2..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidAddress(format!(
            "contains non-hex characters: {address}"
        )));
    }

    Ok(Address::new(address))
}

/// Validate that an EVM address is properly formatted.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    parse_address(address).is_ok()
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_address() {
        let address = "0x742d35Cc6634C0532925a3b844Bc9e7595916Da2";
        assert!(parse_address(address).is_ok());
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(parse_address("742d35Cc6634C0532925a3b844Bc9e7595916Da2").is_err());
    }

    #[test]
    fn test_invalid_length() {
        assert!(parse_address("0x742d35Cc6634C0532925a3b844Bc9e7595916Da").is_err());
    }

    #[test]
    fn test_invalid_hex_chars() {
        assert!(!is_valid_address("0x742d35Cc6634C0532925a3b844Bc9e7595916DgZ"));
    }

    #[test]
    fn test_case_insensitive_equality() {
        let checksummed = Address::new("0x742d35Cc6634C0532925a3b844Bc9e7595916Da2");
        let lower = Address::new("0x742d35cc6634c0532925a3b844bc9e7595916da2");
        assert_eq!(checksummed, lower);
        assert_eq!(checksummed.normalized(), lower.as_str());
    }

    #[test]
    fn test_zero_detection() {
        assert!(Address::zero().is_zero());
        assert!(Address::new("").is_zero());
        assert!(Address::new("0x").is_zero());
        assert!(Address::new("0x00").is_zero());
        assert!(!Address::new("0x01").is_zero());
        assert!(!Address::new("0x742d35Cc6634C0532925a3b844Bc9e7595916Da2").is_zero());
    }

    #[test]
    fn test_bytes_roundtrip_lowercases() {
        let address = Address::new("0x742d35Cc6634C0532925a3b844Bc9e7595916Da2");
        let bytes = address.to_bytes().expect("valid address");
        let back = Address::from_bytes(bytes);
        assert_eq!(back.as_str(), "0x742d35cc6634c0532925a3b844bc9e7595916da2");
        assert_eq!(back, address);
    }

    #[test]
    fn test_short_form() {
        let address = Address::new("0x742d35Cc6634C0532925a3b844Bc9e7595916Da2");
        assert_eq!(address.short(), "0x742d...6Da2");
        assert_eq!(Address::new("0x01").short(), "0x01");
    }
}
