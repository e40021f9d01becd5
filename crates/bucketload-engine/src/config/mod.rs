//! Job configuration: YAML types, parsing and semantic validation.

pub mod parser;
pub mod types;
pub mod validator;

pub use parser::{parse_job, parse_job_str, substitute_env_vars};
pub use types::{BackendKind, DestinationConfig, JobConfig, LoadConfig, SourceConfig, StorageKind};
pub use validator::validate_job;
