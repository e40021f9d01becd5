//! Batch loader: partitions a record stream into valid and invalid rows,
//! inserts valid rows in fixed-size transactional batches and logs the rest.

use std::path::PathBuf;
use std::time::Instant;

use bucketload_sink::Sink;
use bucketload_source::SourceError;
use bucketload_types::{project, InsertTarget, Record, Row};

use crate::errors::IngestError;
use crate::invalid_log::InvalidLog;
use crate::validate::validate_record;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_INVALID_LOG_PATH: &str = "invalid_rows.csv";

/// Caller-supplied knobs for one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Rows per insert transaction.
    pub batch_size: usize,
    pub invalid_log_path: PathBuf,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            invalid_log_path: PathBuf::from(DEFAULT_INVALID_LOG_PATH),
        }
    }
}

/// Final counts of a completed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub inserted: u64,
    pub skipped: u64,
    /// Insert transactions committed.
    pub batches: u64,
}

struct BatchLoader<'a, S: Sink + ?Sized> {
    sink: &'a mut S,
    target: &'a InsertTarget,
    batch_size: usize,
    batch: Vec<Row>,
    summary: LoadSummary,
}

impl<S: Sink + ?Sized> BatchLoader<'_, S> {
    fn accept(&mut self, record: &Record) -> Result<(), IngestError> {
        self.batch.push(project(record, self.target.columns()));
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IngestError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch_no = self.summary.batches + 1;
        let started = Instant::now();
        let inserted = self
            .sink
            .insert_batch(self.target, &self.batch)
            .map_err(|source| IngestError::Flush {
                batch: batch_no,
                rows: self.batch.len(),
                source,
            })?;

        self.summary.inserted += inserted;
        self.summary.batches = batch_no;
        tracing::info!(
            table = self.target.table(),
            batch = batch_no,
            rows = inserted,
            total = self.summary.inserted,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Flushed batch"
        );
        self.batch.clear();
        Ok(())
    }
}

/// Load `records` into `target` through `sink`.
///
/// Valid records are inserted in transactions of `options.batch_size` rows
/// (the last one possibly smaller); invalid ones are appended to the
/// invalid-row log as they are seen. The first error of any kind aborts the
/// load: batches committed before it stay committed, the pending partial
/// batch is dropped. The invalid-row log is flushed and closed on every path.
///
/// # Errors
///
/// [`IngestError::Config`] for a zero batch size, [`IngestError::Source`] for
/// decode/storage failures, [`IngestError::Flush`] for insert failures and
/// [`IngestError::InvalidLog`] if the log can't be written.
pub fn insert_batches<S, I>(
    sink: &mut S,
    records: I,
    target: &InsertTarget,
    options: &LoadOptions,
) -> Result<LoadSummary, IngestError>
where
    S: Sink + ?Sized,
    I: IntoIterator<Item = Result<Record, SourceError>>,
{
    if options.batch_size == 0 {
        return Err(IngestError::Config("batch_size must be at least 1".into()));
    }

    let mut invalid_log = InvalidLog::open(&options.invalid_log_path, target.columns())?;
    let mut loader = BatchLoader {
        sink,
        target,
        batch_size: options.batch_size,
        batch: Vec::with_capacity(options.batch_size.min(64 * 1024)),
        summary: LoadSummary::default(),
    };

    let outcome = drain(&mut loader, records, &mut invalid_log);
    let log_path = invalid_log.path().to_path_buf();
    let logged_before_close = invalid_log.rows_written();
    let closed = invalid_log.finish();

    if let Err(e) = &outcome {
        tracing::error!(
            table = target.table(),
            inserted = loader.summary.inserted,
            skipped = loader.summary.skipped,
            dropped = loader.batch.len(),
            invalid_rows = logged_before_close,
            invalid_log = %log_path.display(),
            error = %e,
            "Load aborted"
        );
    }
    outcome?;
    let logged = closed?;
    debug_assert_eq!(logged, loader.summary.skipped);

    tracing::info!(
        table = target.table(),
        inserted = loader.summary.inserted,
        skipped = loader.summary.skipped,
        batches = loader.summary.batches,
        invalid_rows = logged,
        invalid_log = %log_path.display(),
        "Load complete"
    );
    Ok(loader.summary)
}

fn drain<S, I>(
    loader: &mut BatchLoader<'_, S>,
    records: I,
    invalid_log: &mut InvalidLog,
) -> Result<(), IngestError>
where
    S: Sink + ?Sized,
    I: IntoIterator<Item = Result<Record, SourceError>>,
{
    for record in records {
        let record = record?;
        if validate_record(&record) {
            loader.accept(&record)?;
        } else {
            invalid_log.append(&record)?;
            loader.summary.skipped += 1;
            tracing::debug!(
                patient_id = ?record.get(crate::validate::PATIENT_ID),
                encounter_date = ?record.get(crate::validate::ENCOUNTER_DATE),
                "Record failed validation"
            );
        }
    }
    loader.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketload_sink::SinkError;
    use serde_json::json;

    /// Sink that records each committed batch and can fail on demand.
    #[derive(Default)]
    struct RecordingSink {
        committed: Vec<Vec<Row>>,
        fail_on_batch: Option<usize>,
    }

    impl Sink for RecordingSink {
        fn backend_name(&self) -> &'static str {
            "recording"
        }

        fn ping(&mut self) -> Result<(), SinkError> {
            Ok(())
        }

        fn insert_batch(&mut self, _target: &InsertTarget, rows: &[Row]) -> Result<u64, SinkError> {
            if self.fail_on_batch == Some(self.committed.len() + 1) {
                return Err(SinkError::Config("constraint violated".into()));
            }
            self.committed.push(rows.to_vec());
            Ok(rows.len() as u64)
        }
    }

    fn target() -> InsertTarget {
        InsertTarget::new(
            "encounters",
            vec!["patient_id".into(), "encounter_date".into()],
        )
        .unwrap()
    }

    fn valid(i: usize) -> Record {
        json!({"patient_id": format!("P{i}"), "encounter_date": "2025-08-01", "other": i})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn invalid(i: usize) -> Record {
        json!({"patient_id": format!("P{i}"), "encounter_date": "2025-13-40"})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn options(dir: &tempfile::TempDir, batch_size: usize) -> LoadOptions {
        LoadOptions {
            batch_size,
            invalid_log_path: dir.path().join("invalid_rows.csv"),
        }
    }

    #[test]
    fn splits_stream_into_full_batches_plus_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordingSink::default();
        let records = (0..2500).map(|i| Ok(valid(i)));

        let summary = insert_batches(&mut sink, records, &target(), &options(&dir, 1000)).unwrap();

        assert_eq!(
            summary,
            LoadSummary {
                inserted: 2500,
                skipped: 0,
                batches: 3
            }
        );
        let sizes: Vec<usize> = sink.committed.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
    }

    #[test]
    fn rows_are_projected_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordingSink::default();
        insert_batches(&mut sink, [Ok(valid(1))], &target(), &options(&dir, 10)).unwrap();
        assert_eq!(sink.committed[0][0], vec![json!("P1"), json!("2025-08-01")]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordingSink::default();
        let records = (0..2000).map(|i| Ok(valid(i)));
        let summary = insert_batches(&mut sink, records, &target(), &options(&dir, 1000)).unwrap();
        assert_eq!(summary.batches, 2);
        assert_eq!(sink.committed.len(), 2);
    }

    #[test]
    fn invalid_records_go_to_log_not_sink() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(&dir, 100);
        let mut sink = RecordingSink::default();
        let records = (1..=50).map(|i| Ok(if i % 10 == 0 { invalid(i) } else { valid(i) }));

        let summary = insert_batches(&mut sink, records, &target(), &opts).unwrap();

        assert_eq!(summary.inserted, 45);
        assert_eq!(summary.skipped, 5);
        let log = std::fs::read_to_string(&opts.invalid_log_path).unwrap();
        let rows: Vec<&str> = log.lines().skip(1).collect();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.ends_with(",validation_failed")));
        assert_eq!(rows[0], "P10,2025-13-40,validation_failed");
    }

    #[test]
    fn zero_batch_size_is_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(&dir, 0);
        let mut sink = RecordingSink::default();
        let err = insert_batches(&mut sink, [Ok(valid(1))], &target(), &opts).unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
        assert!(!opts.invalid_log_path.exists());
    }

    #[test]
    fn failed_flush_aborts_and_keeps_earlier_batches() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordingSink {
            fail_on_batch: Some(2),
            ..RecordingSink::default()
        };
        let records = (0..2500).map(|i| Ok(valid(i)));
        let err = insert_batches(&mut sink, records, &target(), &options(&dir, 1000)).unwrap_err();

        match err {
            IngestError::Flush { batch, rows, .. } => {
                assert_eq!(batch, 2);
                assert_eq!(rows, 1000);
            }
            other => panic!("expected flush error, got {other}"),
        }
        assert_eq!(sink.committed.len(), 1);
    }

    #[test]
    fn decode_error_aborts_and_drops_partial_batch() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(&dir, 10);
        let mut sink = RecordingSink::default();
        let records: Vec<Result<Record, SourceError>> = (0..15)
            .map(|i| Ok(valid(i)))
            .chain([Ok(invalid(99))])
            .chain([Err(SourceError::NotAnObject {
                key: "a.jsonl".into(),
                line: 17,
            })])
            .chain((0..5).map(|i| Ok(valid(i))))
            .collect();

        let err = insert_batches(&mut sink, records, &target(), &opts).unwrap_err();

        assert!(matches!(err, IngestError::Source(_)));
        assert_eq!(sink.committed.len(), 1);
        assert_eq!(sink.committed[0].len(), 10);
        // The invalid row seen before the failure is on disk.
        let log = std::fs::read_to_string(&opts.invalid_log_path).unwrap();
        assert!(log.contains("P99,2025-13-40,validation_failed"));
    }

    #[test]
    fn empty_stream_creates_log_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(&dir, 10);
        let mut sink = RecordingSink::default();
        let summary =
            insert_batches(&mut sink, std::iter::empty(), &target(), &opts).unwrap();
        assert_eq!(summary, LoadSummary::default());
        assert!(sink.committed.is_empty());
        let log = std::fs::read_to_string(&opts.invalid_log_path).unwrap();
        assert_eq!(log, "patient_id,encounter_date,_error\n");
    }
}
