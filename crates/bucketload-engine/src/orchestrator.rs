//! Job orchestration: wires a job file to an object store, a sink and the
//! batch loader.

use std::path::{Path, PathBuf};
use std::time::Instant;

use bucketload_sink::{ConnectionConfig, PostgresSink, Sink, SqliteSink};
use bucketload_source::{
    stream_records, LocalObjectStore, ObjectStore, S3ObjectStore, S3Options,
};
use bucketload_types::{InsertTarget, StorageLocation};

use crate::config::{validate_job, BackendKind, JobConfig, StorageKind};
use crate::errors::IngestError;
use crate::loader::{insert_batches, LoadOptions, LoadSummary};

/// Command-line overrides for the job's `load` section.
#[derive(Debug, Clone, Default)]
pub struct LoadOverrides {
    pub batch_size: Option<usize>,
    pub invalid_log_path: Option<PathBuf>,
}

impl LoadOverrides {
    fn apply(&self, config: &JobConfig) -> LoadOptions {
        let mut options = LoadOptions::from(&config.load);
        if let Some(n) = self.batch_size {
            options.batch_size = n;
        }
        if let Some(path) = &self.invalid_log_path {
            options.invalid_log_path.clone_from(path);
        }
        options
    }
}

/// Outcome of probing one side of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCheck {
    pub ok: bool,
    pub message: String,
}

impl ComponentCheck {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failed(error: &dyn std::fmt::Display) -> Self {
        Self {
            ok: false,
            message: error.to_string(),
        }
    }
}

/// Result of `check_job`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub source: ComponentCheck,
    pub destination: ComponentCheck,
}

impl CheckResult {
    pub fn all_ok(&self) -> bool {
        self.source.ok && self.destination.ok
    }
}

/// Run a job end to end.
///
/// Database settings for the postgres backend are read from the
/// `BUCKETLOAD_DB_*` environment variables.
///
/// # Errors
///
/// Configuration problems fail before any I/O; everything after that is
/// reported as by [`insert_batches`].
pub fn run_job(config: &JobConfig, overrides: &LoadOverrides) -> Result<LoadSummary, IngestError> {
    execute(config, overrides, |name| std::env::var(name).ok(), open_store)
}

fn execute(
    config: &JobConfig,
    overrides: &LoadOverrides,
    env: impl Fn(&str) -> Option<String>,
    store_factory: impl FnOnce(&JobConfig) -> Result<Box<dyn ObjectStore>, IngestError>,
) -> Result<LoadSummary, IngestError> {
    validate_job(config).map_err(|e| IngestError::Config(format!("{e:#}")))?;
    let options = overrides.apply(config);
    let target = insert_target(config)?;
    let connection = resolve_connection(config, env)?;
    let location = StorageLocation::new(&config.source.bucket, &config.source.prefix);

    tracing::info!(
        job = config.job,
        source = %location,
        format = config.source.format,
        table = target.table(),
        batch_size = options.batch_size,
        invalid_log = %options.invalid_log_path.display(),
        "Starting job"
    );
    let started = Instant::now();

    let store = store_factory(config)?;
    let mut sink = open_sink(config, connection.as_ref())?;
    let records = stream_records(store.as_ref(), &location, &config.source.format)?;
    let summary = insert_batches(sink.as_mut(), records, &target, &options)?;

    tracing::info!(
        job = config.job,
        inserted = summary.inserted,
        skipped = summary.skipped,
        batches = summary.batches,
        duration_secs = started.elapsed().as_secs_f64(),
        "Job completed"
    );
    Ok(summary)
}

/// Probe the source (first listing page) and the destination (`SELECT 1`)
/// without loading anything.
///
/// # Errors
///
/// Only an invalid job fails outright; connectivity problems are reported in
/// the returned [`CheckResult`].
pub fn check_job(config: &JobConfig) -> Result<CheckResult, IngestError> {
    validate_job(config).map_err(|e| IngestError::Config(format!("{e:#}")))?;
    tracing::info!(job = config.job, "Checking job");

    let location = StorageLocation::new(&config.source.bucket, &config.source.prefix);
    let source = match open_store(config).and_then(|store| {
        store
            .list_page(&location.bucket, &location.prefix, None)
            .map_err(IngestError::from)
    }) {
        Ok(page) => {
            let objects = page.keys.iter().filter(|k| !k.ends_with('/')).count();
            let more = if page.continuation.is_some() { "+" } else { "" };
            ComponentCheck::ok(format!("{objects}{more} object(s) under {location}"))
        }
        Err(e) => ComponentCheck::failed(&e),
    };

    let ping_destination = || -> Result<&'static str, IngestError> {
        let connection = resolve_connection(config, |name| std::env::var(name).ok())?;
        let mut sink = open_sink(config, connection.as_ref())?;
        sink.ping()?;
        Ok(sink.backend_name())
    };
    let destination = match ping_destination() {
        Ok(backend) => ComponentCheck::ok(format!("{backend} reachable")),
        Err(e) => ComponentCheck::failed(&e),
    };

    Ok(CheckResult {
        source,
        destination,
    })
}

fn insert_target(config: &JobConfig) -> Result<InsertTarget, IngestError> {
    InsertTarget::new(
        config.destination.table.clone(),
        config.destination.columns.clone(),
    )
    .map_err(|e| IngestError::Config(e.to_string()))
}

fn open_store(config: &JobConfig) -> Result<Box<dyn ObjectStore>, IngestError> {
    let source = &config.source;
    Ok(match source.storage {
        StorageKind::S3 => Box::new(S3ObjectStore::connect(&S3Options {
            region: source.region.clone(),
            endpoint_url: source.endpoint_url.clone(),
        })?),
        StorageKind::Local => {
            let root = source.root.as_deref().unwrap_or(Path::new("."));
            Box::new(LocalObjectStore::new(root))
        }
    })
}

/// Connection settings for backends that need them, read up front so a
/// missing variable fails before any store or database I/O.
fn resolve_connection(
    config: &JobConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Option<ConnectionConfig>, IngestError> {
    match config.destination.backend {
        BackendKind::Postgres => Ok(Some(ConnectionConfig::from_lookup(env)?)),
        BackendKind::Sqlite => Ok(None),
    }
}

fn open_sink(
    config: &JobConfig,
    connection: Option<&ConnectionConfig>,
) -> Result<Box<dyn Sink>, IngestError> {
    let dest = &config.destination;
    Ok(match (dest.backend, connection, &dest.path) {
        (BackendKind::Postgres, Some(connection), _) => {
            tracing::debug!(?connection, "Connecting to postgres");
            Box::new(PostgresSink::connect(connection)?)
        }
        (BackendKind::Sqlite, _, Some(path)) => Box::new(SqliteSink::open(path)?),
        (BackendKind::Postgres, None, _) => {
            return Err(IngestError::Config(
                "postgres backend requires connection settings".into(),
            ))
        }
        (BackendKind::Sqlite, _, None) => {
            return Err(IngestError::Config(
                "sqlite backend requires destination.path".into(),
            ))
        }
    })
}
