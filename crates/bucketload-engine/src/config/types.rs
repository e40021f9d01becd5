use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::loader::{LoadOptions, DEFAULT_BATCH_SIZE, DEFAULT_INVALID_LOG_PATH};

/// Top-level job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub version: String,
    pub job: String,
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    S3,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub storage: StorageKind,
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    /// Kept as text so an unsupported tag is reported by validation, not by serde.
    pub format: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    /// Directory holding buckets when `storage: local`; defaults to the current directory.
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Postgres,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    #[serde(default)]
    pub backend: BackendKind,
    pub table: String,
    pub columns: Vec<String>,
    /// Database file for the sqlite backend.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_invalid_log_path")]
    pub invalid_log_path: PathBuf,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_invalid_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_INVALID_LOG_PATH)
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            invalid_log_path: default_invalid_log_path(),
        }
    }
}

impl From<&LoadConfig> for LoadOptions {
    fn from(load: &LoadConfig) -> Self {
        Self {
            batch_size: load.batch_size,
            invalid_log_path: load.invalid_log_path.clone(),
        }
    }
}
