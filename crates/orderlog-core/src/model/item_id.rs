use crate::error::ErrorCode;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of an item on a board.
///
/// IDs come from the host application (order numbers, generated note IDs)
/// and are compared verbatim. The only rule enforced here is that an ID is
/// non-empty and contains no whitespace, so it survives a round-trip through
/// command lines and spreadsheet cells.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

/// Rejected item ID text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("item id must not be empty")]
    Empty,
    #[error("item id '{0}' contains whitespace")]
    Whitespace(String),
}

impl ParseIdError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidItemId
    }
}

impl ItemId {
    /// Parse and validate an ID.
    ///
    /// # Errors
    ///
    /// Returns [`ParseIdError`] when `raw` is empty or contains whitespace.
    pub fn parse(raw: &str) -> Result<Self, ParseIdError> {
        if raw.is_empty() {
            return Err(ParseIdError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(ParseIdError::Whitespace(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Wrap an ID from a trusted source without validation.
    #[must_use]
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ItemId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
