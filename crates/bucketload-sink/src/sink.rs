//! Sink trait definition.

use bucketload_types::{InsertTarget, Row};

use crate::error;

/// Destination for validated rows.
pub trait Sink {
    /// Short backend name for logs (`postgres`, `sqlite`).
    fn backend_name(&self) -> &'static str;

    /// Round-trip a trivial query to prove the connection is alive.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the query fails.
    fn ping(&mut self) -> error::Result<()>;

    /// Insert `rows` into `target` inside a single transaction.
    ///
    /// Each row holds one value per target column, in column order. On error
    /// nothing from this call is committed. Returns the number of rows
    /// inserted; an empty slice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`](crate::SinkError) if any statement or the commit fails.
    fn insert_batch(&mut self, target: &InsertTarget, rows: &[Row]) -> error::Result<u64>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn ping(&mut self) -> error::Result<()> {
        (**self).ping()
    }

    fn insert_batch(&mut self, target: &InsertTarget, rows: &[Row]) -> error::Result<u64> {
        (**self).insert_batch(target, rows)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn ping(&mut self) -> error::Result<()> {
        (**self).ping()
    }

    fn insert_batch(&mut self, target: &InsertTarget, rows: &[Row]) -> error::Result<u64> {
        (**self).insert_batch(target, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn Sink) {}
    }
}
