//! Page identifier.

use crate::error::{ClientError, ClientResult};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned identifier for a page.
///
/// Page IDs are positive integers that are:
/// - Assigned by the server at creation time
/// - Immutable once assigned
/// - Rendered as decimal strings on the wire
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(u64);

impl PageId {
    /// Creates a page ID from a raw positive integer.
    ///
    /// Returns a validation error if `value` is zero.
    pub fn new(value: u64) -> ClientResult<Self> {
        if value == 0 {
            return Err(ClientError::validation("page id must be positive"));
        }
        Ok(Self(value))
    }

    /// Parses a page ID from its decimal string form.
    ///
    /// Only ASCII-digit strings with a positive value are accepted.
    pub fn parse(text: &str) -> ClientResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ClientError::validation(format!(
                "invalid page id: {text:?}"
            )));
        }
        let value: u64 = trimmed
            .parse()
            .map_err(|_| ClientError::validation(format!("page id out of range: {text:?}")))?;
        Self::new(value)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // The server emits and accepts ids as decimal strings.
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for PageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        let raw = Raw::deserialize(deserializer)?;
        let id = match raw {
            Raw::Text(s) => PageId::parse(&s),
            Raw::Number(n) => PageId::new(n),
        };
        id.map_err(de::Error::custom)
    }
}
