//! CUPID identifiers: `@<name>@cupid`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix every identifier ends with.
pub const IDENTIFIER_SUFFIX: &str = "@cupid";

/// A human-readable handle resolved to addresses by the registry.
///
/// Construction through [`From`] does not validate: identifiers read back
/// from event logs or typed as a payment destination are passed to the
/// registry as-is. [`Identifier::parse`] enforces the `@<name>@cupid` shape
/// and is used wherever the client creates a new identifier or request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Parse and validate an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] unless the input is `@`, one or
    /// more ASCII letters, digits or underscores, then `@cupid`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if is_valid_identifier(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidIdentifier(format!(
                "'{raw}' must look like @username@cupid"
            )))
        }
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The `<name>` part, if the identifier is well formed.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        if !self.is_well_formed() {
            return None;
        }
        self.0
            .strip_prefix('@')
            .and_then(|rest| rest.strip_suffix(IDENTIFIER_SUFFIX))
    }

    /// True if the identifier matches `@<name>@cupid`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        is_valid_identifier(&self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for Identifier {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Check the `@<alnum_or_underscore>+@cupid` pattern.
#[must_use]
pub fn is_valid_identifier(raw: &str) -> bool {
    let Some(name) = raw
        .strip_prefix('@')
        .and_then(|rest| rest.strip_suffix(IDENTIFIER_SUFFIX))
    else {
        return false;
    };
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("@alice@cupid"));
        assert!(is_valid_identifier("@Bob_42@cupid"));
        assert!(is_valid_identifier("@_@cupid"));
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("@@cupid"));
        assert!(!is_valid_identifier("alice@cupid"));
        assert!(!is_valid_identifier("@alice"));
        assert!(!is_valid_identifier("@al-ice@cupid"));
        assert!(!is_valid_identifier("@al ice@cupid"));
        assert!(!is_valid_identifier("@alice@cupid.com"));
        assert!(!is_valid_identifier("@a@b@cupid"));
    }

    #[test]
    fn test_parse_trims_and_rejects() {
        let id = Identifier::parse("  @alice@cupid ").expect("valid");
        assert_eq!(id.as_str(), "@alice@cupid");
        assert_eq!(id.name(), Some("alice"));

        let err = Identifier::parse("alice").expect_err("invalid");
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }

    #[test]
    fn test_unchecked_construction() {
        let id = Identifier::from("not-an-id");
        assert!(!id.is_well_formed());
        assert!(id.name().is_none());
        assert!(Identifier::from("").is_empty());
    }
}
