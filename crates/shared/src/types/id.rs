//! Typed IDs for type-safe entity references.
//!
//! Ids are sequential and start at 1. The value 0 never identifies an entity;
//! "no entity" is modelled as `Option<Id>` and only rendered as `0` on the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::{NonZeroU64, ParseIntError};

/// Conversion between a typed id and its raw counter value.
pub trait SequentialId: Copy {
    /// Wraps a raw value; 0 yields `None`.
    fn from_raw(raw: u64) -> Option<Self>;
    /// The raw counter value.
    fn raw(self) -> u64;
}

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// The first id handed out by a fresh counter.
            pub const FIRST: Self = Self(NonZeroU64::MIN);

            /// Creates an ID from a raw value, returning `None` for the 0 sentinel.
            #[must_use]
            pub const fn new(raw: u64) -> Option<Self> {
                match NonZeroU64::new(raw) {
                    Some(value) => Some(Self(value)),
                    None => None,
                }
            }

            /// Returns the raw integer value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0.get()
            }

            /// Returns the id that follows this one.
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl SequentialId for $name {
            fn from_raw(raw: u64) -> Option<Self> {
                Self::new(raw)
            }

            fn raw(self) -> u64 {
                self.get()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse::<NonZeroU64>()?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a registered user.");
typed_id!(TransactionId, "Unique identifier for a transaction.");
typed_id!(ApprovalId, "Unique identifier for an approval request.");

/// Serde helpers for `Option<Id>` fields that use 0 for "none".
///
/// ```ignore
/// #[serde(with = "finplat_shared::types::id::zero_as_none")]
/// pub approval_id: Option<ApprovalId>,
/// ```
pub mod zero_as_none {
    use super::{Deserialize, Deserializer, SequentialId, Serializer};

    /// Writes the raw id, or 0 when absent.
    pub fn serialize<T, S>(id: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: SequentialId,
        S: Serializer,
    {
        serializer.serialize_u64(id.map_or(0, SequentialId::raw))
    }

    /// Reads a raw id, mapping 0 to `None`.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: SequentialId,
        D: Deserializer<'de>,
    {
        Ok(T::from_raw(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
