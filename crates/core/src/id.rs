//! Strongly-typed identifiers used across the domain.
//!
//! Account and thing ids are prefixed short ids (`acc_…`, `thg_…`) so they
//! read well inside resource uris and access record ids. User ids are opaque:
//! they come from the identity provider's `sub` claim.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

const SHORT_ID_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a base-36 encoded 128-bit value (36^25 > 2^128).
pub const SHORT_ID_LEN: usize = 25;

/// Encode a random uuid as a fixed-width, lowercase base-36 string.
fn short_id() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut out = [SHORT_ID_ALPHABET[0]; SHORT_ID_LEN];
    for slot in out.iter_mut().rev() {
        *slot = SHORT_ID_ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    out.iter().map(|&b| b as char).collect()
}

/// Identifier of a customer account (the tenant boundary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

/// Identifier of a thing (an example resource owned by an account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThingId(String);

macro_rules! impl_prefixed_id {
    ($t:ident, $prefix:literal, $name:literal) => {
        impl $t {
            /// Generate a new random identifier.
            pub fn generate() -> Self {
                Self(format!("{}{}", $prefix, short_id()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let suffix = s.strip_prefix($prefix).ok_or_else(|| {
                    DomainError::invalid_id(format!("{}: missing '{}' prefix", $name, $prefix))
                })?;
                if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(DomainError::invalid_id(format!(
                        "{}: '{}' is not alphanumeric",
                        $name, suffix
                    )));
                }
                Ok(Self(s.to_string()))
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_prefixed_id!(AccountId, "acc_", "AccountId");
impl_prefixed_id!(ThingId, "thg_", "ThingId");

/// Identity of an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(DomainError::invalid_id("UserId: empty"));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
