//! Lazy record stream over every object under a prefix.

use std::collections::VecDeque;

use bucketload_types::{Format, Record, StorageLocation};

use crate::decode::ObjectRecords;
use crate::error;
use crate::store::ObjectStore;

/// Start streaming records from `location`.
///
/// The format tag is checked before any I/O; nothing is listed until the
/// first call to `next`.
///
/// # Errors
///
/// Returns [`SourceError::Format`](crate::SourceError::Format) for tags other
/// than `jsonl` or `csv`.
pub fn stream_records<'a, S: ObjectStore + ?Sized>(
    store: &'a S,
    location: &StorageLocation,
    format_tag: &str,
) -> error::Result<RecordStream<'a, S>> {
    let format: Format = format_tag.parse()?;
    Ok(RecordStream {
        store,
        location: location.clone(),
        format,
        pending_keys: VecDeque::new(),
        continuation: None,
        listing_done: false,
        current: None,
        objects_read: 0,
        finished: false,
    })
}

/// Finite, single-pass sequence of records.
///
/// Yields `Err` at most once; the stream is exhausted after an error.
pub struct RecordStream<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    location: StorageLocation,
    format: Format,
    pending_keys: VecDeque<String>,
    continuation: Option<String>,
    listing_done: bool,
    current: Option<ObjectRecords>,
    objects_read: u64,
    finished: bool,
}

impl<S: ObjectStore + ?Sized> RecordStream<'_, S> {
    /// Number of objects fetched so far.
    #[must_use]
    pub fn objects_read(&self) -> u64 {
        self.objects_read
    }

    fn list_next_page(&mut self) -> error::Result<()> {
        let page = self.store.list_page(
            &self.location.bucket,
            &self.location.prefix,
            self.continuation.as_deref(),
        )?;
        tracing::debug!(
            location = %self.location,
            keys = page.keys.len(),
            more = page.continuation.is_some(),
            "Listed page"
        );
        // "Folder" placeholder keys carry no data.
        self.pending_keys
            .extend(page.keys.into_iter().filter(|k| !k.ends_with('/')));
        self.listing_done = page.continuation.is_none();
        self.continuation = page.continuation;
        Ok(())
    }

    fn open_object(&mut self, key: &str) -> error::Result<ObjectRecords> {
        let body = self.store.get_object(&self.location.bucket, key)?;
        self.objects_read += 1;
        tracing::debug!(key, bytes = body.len(), format = %self.format, "Fetched object");
        ObjectRecords::open(key, self.format, body)
    }

    fn advance(&mut self) -> Option<error::Result<Record>> {
        loop {
            if let Some(records) = self.current.as_mut() {
                match records.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }

            if let Some(key) = self.pending_keys.pop_front() {
                match self.open_object(&key) {
                    Ok(records) => self.current = Some(records),
                    Err(e) => return Some(Err(e)),
                }
                continue;
            }

            if self.listing_done {
                return None;
            }
            if let Err(e) = self.list_next_page() {
                return Some(Err(e));
            }
        }
    }
}

impl<S: ObjectStore + ?Sized> Iterator for RecordStream<'_, S> {
    type Item = error::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.advance();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

impl<S: ObjectStore + ?Sized> std::iter::FusedIterator for RecordStream<'_, S> {}
