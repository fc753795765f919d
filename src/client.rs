//! Bulk operation facade.
//!
//! [`BulkClient`] composes the key enumerator, the bounded task runner, and
//! the multipart upload coordinator into prefix-scoped copy, move, and
//! delete, plus the thin single-object wrappers. It owns the one piece of
//! shared mutable state in the engine, the active bucket, behind a
//! single-writer lock: operations capture the bucket once at call start, so
//! a concurrent switch is never observed mid-operation as a torn value.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_channel::{Receiver, Sender};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::lister::KeyLister;
use crate::runner::run_all;
use crate::storage::{self, Storage};
use crate::types::error::BulkError;
use crate::types::{BulkReport, TransferStatistics};
use crate::uploader::MultipartUploader;

/// Options for [`BulkClient::copy_prefix`].
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Target "directory" for the copies. Must end with `/` when provided.
    /// When omitted, each copy lands next to its source under a derived
    /// `name_copy.ext` key.
    pub destination_prefix: Option<String>,
    /// Target bucket. Defaults to the active bucket.
    pub destination_bucket: Option<String>,
    /// Keep the original object names under `destination_prefix` instead of
    /// deriving `name_copy.ext` names. Requires `destination_prefix`.
    pub keep_original_name: bool,
}

/// Client-side engine for bulk operations against one S3-compatible storage
/// service.
///
/// Cheap to share behind an `Arc`; all methods take `&self`. The active
/// bucket is switchable at runtime via [`switch_bucket`](Self::switch_bucket).
pub struct BulkClient {
    config: Config,
    storage: Storage,
    bucket: Arc<RwLock<String>>,
    stats_sender: Sender<TransferStatistics>,
    stats_receiver: Receiver<TransferStatistics>,
}

impl BulkClient {
    /// Create a client backed by the production S3 transport.
    ///
    /// Fails with `InvalidArgument` if the configured bucket is empty.
    pub async fn new(config: Config) -> Result<Self> {
        let storage = storage::create_storage(&config).await;
        Self::with_storage(config, storage)
    }

    /// Create a client over an explicit storage transport.
    ///
    /// This is the seam for alternative transports and for tests.
    pub fn with_storage(config: Config, storage: Storage) -> Result<Self> {
        validate_str_param(&config.bucket, "bucket")?;

        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let bucket = Arc::new(RwLock::new(config.bucket.clone()));

        Ok(Self {
            config,
            storage,
            bucket,
            stats_sender,
            stats_receiver,
        })
    }

    /// Snapshot of the active bucket.
    pub async fn bucket(&self) -> String {
        self.bucket.read().await.clone()
    }

    /// Switch the active bucket.
    ///
    /// Serialized against readers: an operation already in flight completes
    /// against the bucket value it captured at call start, not the new one.
    pub async fn switch_bucket(&self, name: &str) -> Result<()> {
        validate_str_param(name, "bucket")?;
        let mut bucket = self.bucket.write().await;
        *bucket = name.to_string();
        Ok(())
    }

    /// Receiver side of the statistics channel, for progress reporting.
    ///
    /// The channel is unbounded and the client holds a receiver, so events
    /// accumulate across operations until drained. Callers not interested in
    /// progress should call [`close_stats_sender`](Self::close_stats_sender)
    /// once instead of letting events pile up.
    pub fn get_stats_receiver(&self) -> Receiver<TransferStatistics> {
        self.stats_receiver.clone()
    }

    /// Close the statistics channel when no progress reporting is needed.
    pub fn close_stats_sender(&self) {
        self.stats_sender.close();
    }

    // -----------------------------------------------------------------------
    // Bulk operations
    // -----------------------------------------------------------------------

    /// List every key under `prefix` in the active bucket, in ascending
    /// lexicographic order. An empty prefix means "all keys".
    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let bucket = self.bucket().await;
        self.lister().list_keys(&bucket, prefix, None).await
    }

    /// Number of keys under `prefix` in the active bucket.
    pub async fn count_keys(&self, prefix: &str) -> Result<usize> {
        Ok(self.list_keys(prefix).await?.len())
    }

    /// Copy every object under `prefix` according to `options`, one bounded
    /// task per key.
    ///
    /// A per-key failure never stops sibling copies; if any key failed the
    /// result is a [`BulkError::PartialBulkFailure`] carrying the full
    /// per-key outcome report.
    pub async fn copy_prefix(&self, prefix: &str, options: CopyOptions) -> Result<BulkReport> {
        if let Some(destination_prefix) = &options.destination_prefix {
            if !destination_prefix.ends_with('/') {
                return Err(anyhow!(BulkError::InvalidArgument(
                    "destination_prefix must end with '/'".to_string()
                )));
            }
        } else if options.keep_original_name {
            // No target directory to preserve names into.
            return Err(anyhow!(BulkError::InvalidArgument(
                "keep_original_name requires a destination_prefix".to_string()
            )));
        }
        if let Some(destination_bucket) = &options.destination_bucket {
            validate_str_param(destination_bucket, "destination_bucket")?;
        }

        let source_bucket = self.bucket().await;
        let dest_bucket = options
            .destination_bucket
            .clone()
            .unwrap_or_else(|| source_bucket.clone());

        let keys = self.lister().list_keys(&source_bucket, prefix, None).await?;
        debug!(
            prefix = prefix,
            key_count = keys.len(),
            "bulk copy dispatching."
        );

        let pairs: Vec<(String, String)> = keys
            .into_iter()
            .map(|key| {
                let dest_key = derive_destination_key(&key, &options);
                (key, dest_key)
            })
            .collect();

        let tasks: Vec<_> = pairs
            .iter()
            .map(|(source_key, dest_key)| {
                let storage = self.storage.clone();
                let source_bucket = source_bucket.clone();
                let dest_bucket = dest_bucket.clone();
                let source_key = source_key.clone();
                let dest_key = dest_key.clone();
                async move {
                    storage
                        .copy_object(&source_bucket, &source_key, &dest_bucket, &dest_key)
                        .await
                }
            })
            .collect();

        let outcomes = run_all(tasks, self.config.max_concurrent).await;

        let mut report = BulkReport::default();
        for ((key, _), outcome) in pairs.iter().zip(&outcomes) {
            report.record(key, outcome);
            let stats = match outcome {
                Ok(()) => TransferStatistics::CopyComplete { key: key.clone() },
                Err(e) => {
                    warn!(key = key, error = %e, "copy task failed.");
                    TransferStatistics::CopyError { key: key.clone() }
                }
            };
            let _ = self.stats_sender.send(stats).await;
        }

        into_result(report)
    }

    /// Delete every object under `prefix` in the active bucket, one bounded
    /// task per key.
    ///
    /// A prefix matching zero keys succeeds as a no-op with an empty report
    /// and no delete calls issued. Deleting a key that vanished concurrently
    /// is a no-op, not an error.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<BulkReport> {
        let bucket = self.bucket().await;
        let keys = self.lister().list_keys(&bucket, prefix, None).await?;
        debug!(
            prefix = prefix,
            key_count = keys.len(),
            "bulk delete dispatching."
        );

        self.delete_keys(&bucket, &keys).await
    }

    /// Delete an explicit key list, one bounded task per key.
    async fn delete_keys(&self, bucket: &str, keys: &[String]) -> Result<BulkReport> {
        let tasks: Vec<_> = keys
            .iter()
            .map(|key| {
                let storage = self.storage.clone();
                let bucket = bucket.to_string();
                let key = key.clone();
                async move { storage.delete_object(&bucket, &key).await }
            })
            .collect();

        let outcomes = run_all(tasks, self.config.max_concurrent).await;

        let mut report = BulkReport::default();
        for (key, outcome) in keys.iter().zip(&outcomes) {
            report.record(key, outcome);
            let stats = match outcome {
                Ok(()) => TransferStatistics::DeleteComplete { key: key.clone() },
                Err(e) => {
                    warn!(key = key, error = %e, "delete task failed.");
                    TransferStatistics::DeleteError { key: key.clone() }
                }
            };
            let _ = self.stats_sender.send(stats).await;
        }

        into_result(report)
    }

    /// Move every object under `prefix` into `folder_name`, keeping original
    /// names. `folder_name` must end with `/`.
    ///
    /// Implemented as copy-then-delete over the network and therefore NOT
    /// atomic: the copy phase must succeed completely before any delete is
    /// issued (at-least-once copy, at-most-once delete). A failure between
    /// the phases leaves both copies present and is surfaced, never masked.
    /// Returns the delete-phase report.
    pub async fn move_prefix(&self, prefix: &str, folder_name: &str) -> Result<BulkReport> {
        if !folder_name.ends_with('/') {
            return Err(anyhow!(BulkError::InvalidArgument(
                "folder_name must end with '/'".to_string()
            )));
        }

        let copied = self
            .copy_prefix(
                prefix,
                CopyOptions {
                    destination_prefix: Some(folder_name.to_string()),
                    destination_bucket: None,
                    keep_original_name: true,
                },
            )
            .await?;

        // Delete exactly the keys captured by the copy phase. Re-enumerating
        // the prefix here would also match the fresh copies when the
        // destination folder nests under the source prefix.
        let bucket = self.bucket().await;
        self.delete_keys(&bucket, &copied.succeeded).await
    }

    // -----------------------------------------------------------------------
    // Single-object operations
    // -----------------------------------------------------------------------

    /// Upload a local file to the active bucket under its own file name,
    /// using the multipart path for large files.
    pub async fn upload_file(&self, local_path: &str) -> Result<()> {
        validate_str_param(local_path, "local_path")?;
        let key = Path::new(local_path)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                anyhow!(BulkError::InvalidArgument(format!(
                    "cannot derive an object key from path '{local_path}'"
                )))
            })?
            .to_string();

        self.upload_file_as(local_path, &key).await
    }

    /// Upload a local file to the active bucket under an explicit key.
    pub async fn upload_file_as(&self, local_path: &str, key: &str) -> Result<()> {
        validate_str_param(local_path, "local_path")?;
        validate_str_param(key, "key")?;

        let bucket = self.bucket().await;
        MultipartUploader::new(self.storage.clone())
            .with_stats_sender(self.stats_sender.clone())
            .upload(Path::new(local_path), &bucket, key)
            .await
    }

    /// Download one object from the active bucket to a local file.
    pub async fn download_file(&self, key: &str, local_path: &str) -> Result<()> {
        validate_str_param(key, "key")?;
        validate_str_param(local_path, "local_path")?;

        let bucket = self.bucket().await;
        self.storage
            .download_object(&bucket, key, Path::new(local_path))
            .await
    }

    /// Size of one object in the active bucket, in bytes.
    pub async fn object_size(&self, key: &str) -> Result<u64> {
        validate_str_param(key, "key")?;
        let bucket = self.bucket().await;
        self.storage.get_object_size(&bucket, key).await
    }

    /// Time-limited presigned GET URL for one object in the active bucket.
    ///
    /// Expiry comes from [`Config::presign_expiry`] (default one hour).
    pub async fn presigned_get_url(&self, key: &str) -> Result<String> {
        validate_str_param(key, "key")?;
        let bucket = self.bucket().await;
        self.storage
            .presigned_get_url(&bucket, key, self.config.presign_expiry)
            .await
    }

    fn lister(&self) -> KeyLister {
        KeyLister::new(self.storage.clone(), self.config.effective_page_size())
    }
}

/// Reject empty or all-whitespace string parameters before any I/O.
fn validate_str_param(value: &str, param_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!(BulkError::InvalidArgument(format!(
            "parameter '{param_name}' must be a non-empty string"
        ))));
    }
    Ok(())
}

fn into_result(report: BulkReport) -> Result<BulkReport> {
    if report.is_complete() {
        Ok(report)
    } else {
        Err(anyhow!(BulkError::PartialBulkFailure { report }))
    }
}

/// Derive the destination key for one source key.
///
/// With `keep_original_name`, the source's file name (text after the last
/// `/`) lands under the destination prefix. Otherwise the file name is
/// renamed `stem_copy.ext`, splitting on the last dot only so multi-dot
/// names keep their real extension; a dotless file name (or one whose only
/// dot leads, like `.env`) gets a plain `_copy` suffix. The renamed file
/// lands under the destination prefix when given, else under the source
/// key's own directory.
fn derive_destination_key(key: &str, options: &CopyOptions) -> String {
    let (dir, file_name) = match key.rfind('/') {
        Some(pos) => key.split_at(pos + 1),
        None => ("", key),
    };

    if options.keep_original_name {
        // Validated: keep_original_name implies a destination_prefix.
        let destination_prefix = options.destination_prefix.as_deref().unwrap_or_default();
        return format!("{destination_prefix}{file_name}");
    }

    let renamed = match file_name.rfind('.') {
        Some(pos) if pos > 0 => {
            let (stem, extension) = file_name.split_at(pos);
            format!("{}_copy.{}", stem, &extension[1..])
        }
        _ => format!("{file_name}_copy"),
    };

    let base = options.destination_prefix.as_deref().unwrap_or(dir);
    format!("{base}{renamed}")
}
