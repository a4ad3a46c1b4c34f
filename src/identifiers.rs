//! ORCID identifier validation.
//!
//! Only the format is checked: four hyphen-separated groups of four, the last
//! character being a digit or `X`. The ISO 7064 checksum is not verified.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static ORCID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}[0-9X]$").expect("valid ORCID pattern"));

static ORCID_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}[0-9X]\b").expect("valid ORCID pattern"));

/// Check a candidate identifier against the ORCID format
#[must_use]
pub fn is_valid_orcid(candidate: &str) -> bool {
    ORCID_PATTERN.is_match(candidate.trim())
}

/// Find the first ORCID-shaped token inside free text
#[must_use]
pub fn extract_orcid(text: &str) -> Option<OrcidId> {
    ORCID_IN_TEXT
        .find(text)
        .map(|m| OrcidId(m.as_str().to_string()))
}

/// A format-validated ORCID identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrcidId(String);

impl OrcidId {
    /// Create a new identifier, rejecting anything that is not ORCID-shaped
    pub fn new(candidate: &str) -> Result<Self> {
        let trimmed = candidate.trim();

        if trimmed.is_empty() {
            return Err(Error::invalid_input("orcid", "ORCID iD cannot be empty"));
        }

        if !ORCID_PATTERN.is_match(trimmed) {
            return Err(Error::invalid_input(
                "orcid",
                format!("'{trimmed}' is not a valid ORCID iD (expected e.g. 0000-0002-1825-0097)"),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public profile page of this researcher
    #[must_use]
    pub fn profile_url(&self) -> String {
        format!("https://orcid.org/{}", self.0)
    }
}

impl fmt::Display for OrcidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrcidId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for OrcidId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<OrcidId> for String {
    fn from(id: OrcidId) -> Self {
        id.0
    }
}

impl AsRef<str> for OrcidId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_identifiers() {
        assert!(is_valid_orcid("0000-0002-1825-0097"));
        assert!(is_valid_orcid("0000-0001-5109-370X"));
        assert!(is_valid_orcid("  0000-0002-1825-0097 "));
    }

    #[test]
    fn test_rejects_malformed_identifiers() {
        let cases = vec![
            "0000-0002-1825-009",
            "0000-0002-1825-00979",
            "0000-0002-1825-009x",
            "0000000218250097",
            "0000-0002-1825-X097",
            "abcd-0002-1825-0097",
            "",
        ];

        for case in cases {
            assert!(!is_valid_orcid(case), "should reject: {case:?}");
        }
    }

    #[test]
    fn test_orcid_id_construction() {
        let id = OrcidId::new(" 0000-0002-1825-0097\n").unwrap();
        assert_eq!(id.as_str(), "0000-0002-1825-0097");
        assert_eq!(id.profile_url(), "https://orcid.org/0000-0002-1825-0097");

        let err = OrcidId::new("0000-0002-1825").unwrap_err();
        assert!(err.is_validation());
        assert!("".parse::<OrcidId>().is_err());
    }

    #[test]
    fn test_extract_from_text() {
        let found = extract_orcid("Please analyse ORCID 0000-0002-1825-0097 for me");
        assert_eq!(found.unwrap().as_str(), "0000-0002-1825-0097");
        assert!(extract_orcid("no identifier in here").is_none());
    }

    #[test]
    fn test_serde_rejects_invalid_values() {
        let ok: OrcidId = serde_json::from_str("\"0000-0002-1825-0097\"").unwrap();
        assert_eq!(ok.to_string(), "0000-0002-1825-0097");
        assert!(serde_json::from_str::<OrcidId>("\"not-an-orcid\"").is_err());
    }
}
