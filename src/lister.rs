use anyhow::{anyhow, Result};
use tracing::debug;

use crate::storage::Storage;
use crate::types::error::BulkError;

/// Paginates the remote listing primitive into a complete, ordered key
/// sequence for a prefix.
///
/// The service's pagination is cursor-based on sorted key order, not
/// offset-based: each page request uses the last key of the previous page as
/// the exclusive `start_after` cursor. The returned sequence is therefore in
/// ascending lexicographic order, with every matching key exactly once,
/// regardless of the page size used internally.
///
/// Transport failures are not retried here; they propagate and abort the
/// whole enumeration (a partial key list is not usable).
pub struct KeyLister {
    storage: Storage,
    page_size: i32,
}

impl KeyLister {
    pub fn new(storage: Storage, page_size: i32) -> Self {
        Self { storage, page_size }
    }

    /// List every key under `prefix` in `bucket`, starting strictly after
    /// `start_after` when given.
    ///
    /// An empty prefix is valid and means "all keys". A non-empty prefix
    /// consisting only of whitespace is rejected with `InvalidArgument`
    /// before any remote call.
    pub async fn list_keys(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
    ) -> Result<Vec<String>> {
        if !prefix.is_empty() && prefix.trim().is_empty() {
            return Err(anyhow!(BulkError::InvalidArgument(
                "prefix must not be all-whitespace".to_string()
            )));
        }

        debug!(bucket = bucket, prefix = prefix, "key enumeration started.");

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: Option<String> = start_after.map(String::from);

        loop {
            let page = self
                .storage
                .list_objects_page(bucket, prefix, cursor.as_deref(), self.page_size)
                .await?;

            if page.keys.is_empty() {
                break;
            }

            cursor = page.keys.last().cloned();
            keys.extend(page.keys);

            if !page.has_more {
                break;
            }
        }

        debug!(
            bucket = bucket,
            prefix = prefix,
            key_count = keys.len(),
            "key enumeration completed."
        );

        Ok(keys)
    }
}
