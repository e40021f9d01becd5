//! `PostgreSQL` implementation of [`Sink`].
//!
//! Uses the sync `postgres` crate, which drives `tokio-postgres` on its own
//! internal runtime. One client per run; one transaction per batch.

use std::collections::HashMap;

use bucketload_types::{InsertTarget, Row};
use postgres::types::ToSql;
use postgres::{Client, NoTls};

use crate::connection::ConnectionConfig;
use crate::error::{self, SinkError};
use crate::pg_value::{ColumnBinding, PgValue};
use crate::sink::Sink;
use crate::sql::{check_widths, insert_sql, qualified_table, rows_per_statement};

/// Bind parameter limit of the `PostgreSQL` wire protocol.
const MAX_PARAMS: usize = 65_535;

/// `PostgreSQL`-backed sink.
pub struct PostgresSink {
    client: Client,
    /// Column bindings per target, discovered on first insert.
    bindings: HashMap<(String, Vec<String>), Vec<ColumnBinding>>,
}

impl PostgresSink {
    /// Connect using explicit connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Config`] for unusable settings or
    /// [`SinkError::Postgres`] if the connection fails.
    pub fn connect(config: &ConnectionConfig) -> error::Result<Self> {
        let pg = config.pg_config()?;
        let client = pg.connect(NoTls)?;
        tracing::info!(
            server = %config.server,
            database = %config.database,
            "Connected to PostgreSQL"
        );
        Ok(Self::from_client(client))
    }

    /// Wrap an already connected client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            bindings: HashMap::new(),
        }
    }

    /// Prepare a one-row INSERT so the server reports each column's type.
    fn discover_bindings(&mut self, target: &InsertTarget) -> error::Result<Vec<ColumnBinding>> {
        let key = (target.table().to_string(), target.columns().to_vec());
        if let Some(found) = self.bindings.get(&key) {
            return Ok(found.clone());
        }

        let probe = insert_sql(target, 1, |n, _| format!("${n}"));
        let statement = self.client.prepare(&probe)?;
        let bindings: Vec<ColumnBinding> =
            statement.params().iter().map(ColumnBinding::for_type).collect();

        tracing::debug!(
            table = %qualified_table(target),
            types = ?statement.params().iter().map(postgres::types::Type::name).collect::<Vec<_>>(),
            "Discovered column types"
        );
        self.bindings.insert(key, bindings.clone());
        Ok(bindings)
    }
}

impl Sink for PostgresSink {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn ping(&mut self) -> error::Result<()> {
        self.client.query_one("SELECT 1", &[])?;
        Ok(())
    }

    fn insert_batch(&mut self, target: &InsertTarget, rows: &[Row]) -> error::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        check_widths(target, rows)?;

        let bindings = self.discover_bindings(target)?;
        let columns = target.columns();
        let per_statement = rows_per_statement(columns.len(), MAX_PARAMS);

        let mut tx = self.client.transaction()?;
        for (chunk_idx, chunk) in rows.chunks(per_statement).enumerate() {
            let sql = insert_sql(target, chunk.len(), |n, col| bindings[col].placeholder(n));

            let mut params: Vec<PgValue> = Vec::with_capacity(chunk.len() * columns.len());
            for (offset, row) in chunk.iter().enumerate() {
                for (col, value) in row.iter().enumerate() {
                    let bound = bindings[col].bind(value).map_err(|message| SinkError::Bind {
                        row: chunk_idx * per_statement + offset,
                        column: columns[col].clone(),
                        message,
                    })?;
                    params.push(bound);
                }
            }
            let param_refs: Vec<&(dyn ToSql + Sync)> =
                params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

            tx.execute(sql.as_str(), &param_refs)?;
        }
        // Dropping an uncommitted transaction rolls it back.
        tx.commit()?;

        Ok(rows.len() as u64)
    }
}
