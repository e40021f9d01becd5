//! Sink error types.

/// Errors produced by [`Sink`](crate::Sink) implementations and connection setup.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A required connection environment variable is unset or empty.
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    /// Connection settings are present but unusable.
    #[error("invalid connection setting: {0}")]
    Config(String),

    /// Underlying `PostgreSQL` failure.
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be converted to its column's database type.
    #[error("row {row}, column '{column}': {message}")]
    Bind {
        row: usize,
        column: String,
        message: String,
    },

    /// A row does not have one value per target column.
    #[error("row {row} has {actual} values, target has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SinkError>;
