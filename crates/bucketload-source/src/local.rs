//! Directory-backed implementation of [`ObjectStore`].
//!
//! `root/<bucket>` acts as the bucket; keys are file paths relative to it,
//! joined with `/` regardless of platform.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{self, SourceError};
use crate::store::{ListPage, ObjectStore};

/// Default number of keys returned per page.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Local file-system object store, used for local runs and tests.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    page_size: usize,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the listing page size (minimum 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn collect_keys(dir: &Path, base: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                Self::collect_keys(&path, base, out)?;
            } else if let Ok(rel) = path.strip_prefix(base) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> error::Result<ListPage> {
        let dir = self.bucket_dir(bucket);
        let mut keys = Vec::new();
        Self::collect_keys(&dir, &dir, &mut keys).map_err(|e| SourceError::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            message: e.to_string(),
        })?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();

        let start = match continuation {
            Some(after) => keys.partition_point(|k| k.as_str() <= after),
            None => 0,
        };
        let end = (start + self.page_size).min(keys.len());
        let page: Vec<String> = keys[start..end].to_vec();
        let continuation = if end < keys.len() {
            page.last().cloned()
        } else {
            None
        };

        Ok(ListPage {
            keys: page,
            continuation,
        })
    }

    fn get_object(&self, bucket: &str, key: &str) -> error::Result<Vec<u8>> {
        let path = key
            .split('/')
            .fold(self.bucket_dir(bucket), |acc, part| acc.join(part));
        fs::read(&path).map_err(|e| SourceError::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}
