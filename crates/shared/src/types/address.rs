//! Wallet addresses.
//!
//! An address is `0x` followed by 40 hex digits. It is stored lowercase so
//! that equality, ordering and hashing are all case-insensitive.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of hex digits after the `0x` prefix.
const ADDRESS_HEX_LEN: usize = 40;

/// Reasons an address string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Input was empty after trimming.
    #[error("address is empty")]
    Empty,

    /// Input does not start with `0x`.
    #[error("address must start with 0x")]
    MissingPrefix,

    /// Wrong number of hex digits.
    #[error("address must have {ADDRESS_HEX_LEN} hex digits, got {0}")]
    InvalidLength(usize),

    /// A non-hex character was found.
    #[error("address contains non-hex character {0:?}")]
    InvalidCharacter(char),
}

/// A normalized (lowercase) wallet address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parses and normalizes an address.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;

        let len = digits.chars().count();
        if len != ADDRESS_HEX_LEN {
            return Err(AddressError::InvalidLength(len));
        }

        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidCharacter(bad));
        }

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Returns the normalized address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short display form used in log lines, e.g. `0x1234...abcd`.
    #[must_use]
    pub fn abbreviated(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for optional addresses that render as `""` when unset.
pub mod empty_as_none {
    use super::{Deserialize, Deserializer, WalletAddress};
    use serde::Serializer;

    /// Writes the address, or an empty string when absent.
    pub fn serialize<S>(address: &Option<WalletAddress>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(address.as_ref().map_or("", WalletAddress::as_str))
    }

    /// Reads an address, mapping an empty string to `None`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<WalletAddress>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        WalletAddress::parse(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
