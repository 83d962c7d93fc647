use super::item_id::ItemId;
use crate::error::ErrorCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

/// Board column an item sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    Ordered,
    InProgress,
    Waiting,
    Done,
    Cancelled,
}

impl Status {
    pub const ALL: [Self; 6] = [
        Self::Open,
        Self::Ordered,
        Self::InProgress,
        Self::Waiting,
        Self::Done,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Ordered => "ordered",
            Self::InProgress => "in_progress",
            Self::Waiting => "waiting",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "ordered" => Ok(Self::Ordered),
            "in_progress" | "doing" => Ok(Self::InProgress),
            "waiting" => Ok(Self::Waiting),
            "done" => Ok(Self::Done),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl ParseEnumError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidEnumValue
    }
}

/// Identifier shared by linked items.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex card color (`#rgb` or `#rrggbb`), stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected #rgb or #rrggbb")]
pub struct ParseColorError(pub String);

impl ParseColorError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidColor
    }
}

impl Color {
    /// Parse a hex color.
    ///
    /// # Errors
    ///
    /// Returns [`ParseColorError`] unless `raw` is `#` followed by three or
    /// six hex digits.
    pub fn parse(raw: &str) -> Result<Self, ParseColorError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ParseColorError(raw.to_string()))?;
        let valid_len = matches!(digits.len(), 3 | 6);
        if !valid_len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One order or note on the board.
///
/// `status`, `archived`, `group` and `color` are the fields the board itself
/// understands. Everything else the user types into a card (vendor, PO
/// number, quantity, notes) lives in `fields`, keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
}

impl Item {
    #[must_use]
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            status: Status::default(),
            archived: false,
            group: None,
            color: None,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set or clear a named field. `None` removes the field entirely so an
    /// edit of a previously-absent field restores to "absent", not `null`.
    pub fn set_field(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(v) => {
                self.fields.insert(name.to_string(), v);
            }
            None => {
                self.fields.remove(name);
            }
        }
    }
}
