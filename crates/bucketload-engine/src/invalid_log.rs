//! Append-only CSV log of records rejected by validation.
//!
//! One file handle is held for the whole run. The header (target columns plus
//! `_error`) is written only when the file is absent or empty, so repeated
//! runs against the same path keep appending under a single header.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bucketload_types::{value_as_text, Record, ERROR_COLUMN, VALIDATION_FAILED};

use crate::errors::IngestError;

pub struct InvalidLog {
    path: PathBuf,
    columns: Vec<String>,
    writer: csv::Writer<File>,
    rows_written: u64,
}

impl InvalidLog {
    /// Open `path` for appending, writing the header if the file is new.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidLog`] if the file can't be opened or written.
    pub fn open(path: &Path, columns: &[String]) -> Result<Self, IngestError> {
        let wrap = |source: csv::Error| IngestError::InvalidLog {
            path: path.to_path_buf(),
            source,
        };

        let needs_header = match fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => return Err(wrap(e.into())),
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| wrap(e.into()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer
                .write_record(columns.iter().map(String::as_str).chain([ERROR_COLUMN]))
                .and_then(|()| writer.flush().map_err(csv::Error::from))
                .map_err(wrap)?;
            tracing::debug!(path = %path.display(), "Created invalid-row log");
        }

        Ok(Self {
            path: path.to_path_buf(),
            columns: columns.to_vec(),
            writer,
            rows_written: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended during this run.
    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append `record` projected onto the log columns, tagged
    /// `validation_failed`. The row reaches the file before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidLog`] on write failure.
    pub fn append(&mut self, record: &Record) -> Result<(), IngestError> {
        let fields: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                record
                    .get(c)
                    .and_then(value_as_text)
                    .map(std::borrow::Cow::into_owned)
                    .unwrap_or_default()
            })
            .chain([VALIDATION_FAILED.to_string()])
            .collect();

        let result = self
            .writer
            .write_record(&fields)
            .and_then(|()| self.writer.flush().map_err(csv::Error::from));
        result.map_err(|source| IngestError::InvalidLog {
            path: self.path.clone(),
            source,
        })?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and close the file, returning the number of rows appended.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidLog`] if the final flush fails.
    pub fn finish(mut self) -> Result<u64, IngestError> {
        self.writer
            .flush()
            .map_err(|e| IngestError::InvalidLog {
                path: self.path.clone(),
                source: e.into(),
            })?;
        Ok(self.rows_written)
    }
}
