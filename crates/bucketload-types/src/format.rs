//! Object body formats understood by the source reader.

use std::fmt;
use std::str::FromStr;

/// Encoding of every object under a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// One JSON object per non-blank line.
    Jsonl,
    /// Comma-separated table with a header row.
    Csv,
}

impl Format {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a format tag is neither `jsonl` nor `csv`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported format '{0}': use 'jsonl' or 'csv'")]
pub struct FormatError(pub String);

impl FromStr for Format {
    type Err = FormatError;

    /// Tags are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jsonl" => Ok(Self::Jsonl),
            "csv" => Ok(Self::Csv),
            _ => Err(FormatError(s.to_string())),
        }
    }
}
