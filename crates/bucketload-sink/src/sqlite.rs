//! `SQLite`-backed implementation of [`Sink`].

use std::path::Path;

use bucketload_types::{InsertTarget, Row};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::Value;

use crate::error;
use crate::sink::Sink;
use crate::sql::{check_widths, insert_sql, rows_per_statement};

/// Host parameter limit of `SQLite` builds since 3.32.
const MAX_PARAMS: usize = 32_766;

/// `SQLite`-backed sink.
///
/// Create with [`SqliteSink::open`] for a database file or
/// [`SqliteSink::in_memory`] for tests.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Open or create a `SQLite` database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`](crate::SinkError::Io) if the directory can't
    /// be created, or [`SinkError::Sqlite`](crate::SinkError::Sqlite) if the
    /// database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "Opened SQLite database");
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Sqlite`](crate::SinkError::Sqlite) on failure.
    pub fn in_memory() -> error::Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Borrow the underlying connection, e.g. to create tables or inspect rows.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n.as_i64().map_or_else(
            || SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            SqlValue::Integer,
        ),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

impl Sink for SqliteSink {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn ping(&mut self) -> error::Result<()> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn insert_batch(&mut self, target: &InsertTarget, rows: &[Row]) -> error::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        check_widths(target, rows)?;

        let per_statement = rows_per_statement(target.columns().len(), MAX_PARAMS);
        let tx = self.conn.transaction()?;
        for chunk in rows.chunks(per_statement) {
            let sql = insert_sql(target, chunk.len(), |n, _| format!("?{n}"));
            let params = chunk.iter().flatten().map(to_sql_value);
            tx.execute(&sql, rusqlite::params_from_iter(params))?;
        }
        tx.commit()?;

        Ok(rows.len() as u64)
    }
}
