//! Source reader error types.

use bucketload_types::FormatError;

/// Errors produced while listing, fetching or decoding objects.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Format tag is neither `jsonl` nor `csv`.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Storage client could not be constructed.
    #[error("storage client setup failed: {0}")]
    Setup(String),

    /// Listing a page of keys failed.
    #[error("failed to list '{bucket}/{prefix}': {message}")]
    List {
        bucket: String,
        prefix: String,
        message: String,
    },

    /// Fetching an object body failed.
    #[error("failed to read '{bucket}/{key}': {message}")]
    Get {
        bucket: String,
        key: String,
        message: String,
    },

    /// Object body is not UTF-8 text.
    #[error("object '{key}' is not valid UTF-8: {source}")]
    Utf8 {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A JSON line could not be parsed.
    #[error("malformed JSON on line {line} of '{key}': {source}")]
    Json {
        key: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON line parsed, but not to an object.
    #[error("line {line} of '{key}' is not a JSON object")]
    NotAnObject { key: String, line: usize },

    /// A CSV row could not be parsed.
    #[error("malformed CSV in '{key}': {source}")]
    Csv {
        key: String,
        #[source]
        source: csv::Error,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SourceError>;
