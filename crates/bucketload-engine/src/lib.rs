//! Ingestion engine: record validation, invalid-row logging and batch loading.

pub mod config;
pub mod errors;
pub mod invalid_log;
pub mod loader;
pub mod orchestrator;
pub mod validate;

// Re-export public API for convenience
pub use errors::IngestError;
pub use invalid_log::InvalidLog;
pub use loader::{insert_batches, LoadOptions, LoadSummary};
pub use orchestrator::{check_job, run_job, CheckResult, ComponentCheck, LoadOverrides};
pub use validate::validate_record;
