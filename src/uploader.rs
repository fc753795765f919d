use std::path::Path;

use anyhow::{Context, Result};
use async_channel::Sender;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::storage::Storage;
use crate::types::{TransferStatistics, UploadedPart};

/// Service-imposed minimum part size for multipart uploads (5 MiB).
///
/// Files strictly smaller than this floor bypass the multipart protocol
/// entirely and are uploaded with a single PutObject call.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Service-imposed maximum number of parts per multipart upload.
pub const MAX_PARTS: u64 = 10_000;

/// Drives the create → upload-parts → complete/abort protocol for one large
/// file.
///
/// Parts are read and uploaded strictly sequentially (each read depends on
/// the previous read's file cursor), with one reused buffer, so the memory
/// footprint is O(partSize) rather than O(fileSize).
///
/// Invariant: every upload session that was successfully created ends in
/// exactly one complete or abort, even when a part upload or the completion
/// call fails.
pub struct MultipartUploader {
    storage: Storage,
    stats_sender: Option<Sender<TransferStatistics>>,
}

impl MultipartUploader {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            stats_sender: None,
        }
    }

    /// Attach a statistics channel; per-part and completion events are sent
    /// through it during uploads.
    pub fn with_stats_sender(mut self, stats_sender: Sender<TransferStatistics>) -> Self {
        self.stats_sender = Some(stats_sender);
        self
    }

    /// Upload the file at `path` to `bucket`/`key`.
    ///
    /// Files below [`MIN_PART_SIZE`] are uploaded with a single call;
    /// exactly-minimum-size files take the full multipart path.
    pub async fn upload(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat local file: {}", path.display()))?
            .len();

        if size < MIN_PART_SIZE {
            debug!(
                key = key,
                size = size,
                "file below multipart floor, using single-call upload."
            );
            self.storage.upload_object(path, bucket, key).await?;
            self.send_stats(TransferStatistics::UploadComplete {
                key: key.to_string(),
            })
            .await;
            return Ok(());
        }

        // Part size scales up for very large files to stay within the
        // service's parts-per-upload ceiling.
        let part_size = MIN_PART_SIZE.max(size.div_ceil(MAX_PARTS));

        let upload_id = self.storage.create_multipart_upload(bucket, key).await?;
        debug!(
            key = key,
            upload_id = upload_id,
            size = size,
            part_size = part_size,
            "multipart upload session created."
        );

        // From here on the session exists server-side: any failure must
        // abort it before surfacing, or uploaded-but-uncommitted part data
        // stays reserved on the server.
        match self
            .transfer_and_complete(path, bucket, key, &upload_id, part_size)
            .await
        {
            Ok(()) => {
                self.send_stats(TransferStatistics::UploadComplete {
                    key: key.to_string(),
                })
                .await;
                Ok(())
            }
            Err(e) => {
                if let Err(abort_error) = self
                    .storage
                    .abort_multipart_upload(bucket, key, &upload_id)
                    .await
                {
                    warn!(
                        key = key,
                        upload_id = upload_id,
                        error = %abort_error,
                        "failed to abort multipart upload session."
                    );
                }
                self.send_stats(TransferStatistics::UploadError {
                    key: key.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn transfer_and_complete(
        &self,
        path: &Path,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_size: u64,
    ) -> Result<()> {
        let mut file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open local file: {}", path.display()))?;

        let mut parts: Vec<UploadedPart> = Vec::new();
        let mut buffer = vec![0u8; part_size as usize];
        let mut part_number: i32 = 1;

        loop {
            let mut bytes_read = 0;
            while bytes_read < buffer.len() {
                let n = file
                    .read(&mut buffer[bytes_read..])
                    .await
                    .with_context(|| format!("failed to read local file: {}", path.display()))?;
                if n == 0 {
                    break;
                }
                bytes_read += n;
            }

            if bytes_read == 0 {
                break;
            }

            let e_tag = self
                .storage
                .upload_part(
                    bucket,
                    key,
                    upload_id,
                    part_number,
                    buffer[..bytes_read].to_vec(),
                )
                .await?;

            debug!(
                key = key,
                part_number = part_number,
                part_bytes = bytes_read,
                "part uploaded."
            );
            self.send_stats(TransferStatistics::UploadPartComplete {
                key: key.to_string(),
                part_number,
            })
            .await;

            parts.push(UploadedPart { part_number, e_tag });
            part_number += 1;

            if bytes_read < buffer.len() {
                // Short read means end of file.
                break;
            }
        }

        self.storage
            .complete_multipart_upload(bucket, key, upload_id, &parts)
            .await
    }

    async fn send_stats(&self, stats: TransferStatistics) {
        if let Some(sender) = &self.stats_sender {
            let _ = sender.send(stats).await;
        }
    }
}
