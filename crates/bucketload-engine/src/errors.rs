//! Ingestion error model.

use std::path::PathBuf;

use bucketload_sink::SinkError;
use bucketload_source::SourceError;

/// Fatal errors that abort a run.
///
/// Records failing validation are not errors; they go to the invalid-row log.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Unusable load options or connection settings, raised before any I/O.
    #[error("configuration error: {0}")]
    Config(String),

    /// Listing, fetching or decoding source objects failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Opening the destination failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Inserting a batch failed; earlier batches stay committed.
    #[error("batch {batch} ({rows} rows) failed: {source}")]
    Flush {
        batch: u64,
        rows: usize,
        #[source]
        source: SinkError,
    },

    /// Writing the invalid-row log failed.
    #[error("invalid-row log '{}': {source}", path.display())]
    InvalidLog {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_error_surfaces_database_message() {
        let err = IngestError::Flush {
            batch: 3,
            rows: 500,
            source: SinkError::Config("boom".into()),
        };
        assert_eq!(
            err.to_string(),
            "batch 3 (500 rows) failed: invalid connection setting: boom"
        );
    }

    #[test]
    fn source_errors_are_transparent() {
        let err = IngestError::from(SourceError::NotAnObject {
            key: "a.jsonl".into(),
            line: 2,
        });
        assert_eq!(err.to_string(), "line 2 of 'a.jsonl' is not a JSON object");
    }
}
