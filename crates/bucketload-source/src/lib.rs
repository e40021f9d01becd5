//! Lazy record source over an object-storage prefix.
//!
//! [`stream_records`] lists every object under a [`StorageLocation`] through
//! an [`ObjectStore`] and decodes each body as JSON lines or CSV, yielding one
//! [`Record`](bucketload_types::Record) at a time.

#![warn(clippy::pedantic)]

mod decode;
pub mod error;
pub mod local;
pub mod s3;
pub mod store;
pub mod stream;

pub use error::SourceError;
pub use local::LocalObjectStore;
pub use s3::{S3ObjectStore, S3Options};
pub use store::{ListPage, ObjectStore};
pub use stream::{stream_records, RecordStream};
