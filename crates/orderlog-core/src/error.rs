use std::fmt;

/// Machine-readable error codes surfaced by the CLI and host applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    BoardReadFailed,
    InvalidItemId,
    InvalidEnumValue,
    InvalidColor,
    DuplicateItemId,
    NothingToRecord,
    IndexOutOfRange,
    CollectionUnavailable,
    BoardWriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::BoardReadFailed => "E1003",
            Self::InvalidItemId => "E2002",
            Self::InvalidEnumValue => "E2005",
            Self::InvalidColor => "E2006",
            Self::DuplicateItemId => "E2007",
            Self::NothingToRecord => "E2008",
            Self::IndexOutOfRange => "E3001",
            Self::CollectionUnavailable => "E3002",
            Self::BoardWriteFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::BoardReadFailed => "Board file could not be read",
            Self::InvalidItemId => "Invalid item ID",
            Self::InvalidEnumValue => "Invalid status value",
            Self::InvalidColor => "Invalid color value",
            Self::DuplicateItemId => "Duplicate item ID",
            Self::NothingToRecord => "Nothing to record",
            Self::IndexOutOfRange => "Collection index out of range",
            Self::CollectionUnavailable => "Item collection unavailable",
            Self::BoardWriteFailed => "Board file write failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .orderlog/config.toml and retry."),
            Self::BoardReadFailed => Some("Check that the board file exists and is valid JSON."),
            Self::NothingToRecord => None,
            Self::InvalidItemId => Some("Item IDs must be non-empty and contain no whitespace."),
            Self::InvalidEnumValue => Some(
                "Use one of: open, ordered, in_progress, waiting, done, cancelled.",
            ),
            Self::InvalidColor => Some("Use a hex color such as #e0a800 or #fa0."),
            Self::DuplicateItemId => Some("Every item on a board needs a unique ID."),
            Self::IndexOutOfRange | Self::CollectionUnavailable => {
                Some("Reload the board; the in-memory collection is no longer consistent.")
            }
            Self::BoardWriteFailed => Some("Check disk space and write permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
