//! Object store trait definition.

use crate::error;

/// One page of a key listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys on this page, in lexicographic order.
    pub keys: Vec<String>,
    /// Token for the next page; `None` when the listing is complete.
    pub continuation: Option<String>,
}

/// Storage contract the record stream reads through.
///
/// Calls block until the underlying I/O completes.
pub trait ObjectStore {
    /// List one page of keys under `prefix`, resuming after `continuation`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::List`](crate::SourceError::List) on storage failure.
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> error::Result<ListPage>;

    /// Read the full body of one object.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Get`](crate::SourceError::Get) on storage failure.
    fn get_object(&self, bucket: &str, key: &str) -> error::Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn ObjectStore) {}
    }
}
