//! Batch insert sinks for the bucketload engine.
//!
//! Provides the [`Sink`] trait plus [`PostgresSink`] and [`SqliteSink`].
//! Every `insert_batch` call is one transaction: all rows land or none do.

#![warn(clippy::pedantic)]

pub mod connection;
pub mod error;
mod pg_value;
pub mod postgres;
pub mod sink;
mod sql;
pub mod sqlite;

pub use connection::ConnectionConfig;
pub use error::SinkError;
pub use self::postgres::PostgresSink;
pub use sink::Sink;
pub use sqlite::SqliteSink;
