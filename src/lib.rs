/*!
# Overview
s3bulk is a client-side engine for bulk operations against S3-compatible
object storage: enumerating large key sets, prefix-scoped copy/move/delete
with bounded concurrency, and chunked multipart upload with rollback on
failure.

## Features
- **Transparent pagination**: a prefix listing is returned as one complete,
  ordered key sequence no matter how many pages the service produced
- **Bounded fan-out**: bulk copy/move/delete dispatch one task per key with a
  configurable in-flight ceiling; a failing key never cancels its siblings
- **Multipart upload with rollback**: large files are streamed in parts and
  every initiated upload session ends in exactly one complete or abort
- **Per-key outcome reporting**: partial failures surface the full outcome
  list, not a single collapsed error

## As a library

```toml
[dependencies]
s3bulk = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3bulk::{BulkClient, Config, CopyOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::for_bucket("my-bucket");
    let client = BulkClient::new(config).await?;

    // Copy everything under reports/2024/ into archive/, keeping names.
    let report = client
        .copy_prefix(
            "reports/2024/",
            CopyOptions {
                destination_prefix: Some("archive/".to_string()),
                keep_original_name: true,
                ..CopyOptions::default()
            },
        )
        .await?;
    println!("{} objects copied", report.succeeded.len());

    client.upload_file("/data/big-export.parquet").await?;
    client.delete_prefix("reports/2024/").await?;
    Ok(())
}
```
*/

pub mod client;
pub mod config;
pub mod lister;
pub mod runner;
pub mod storage;
pub mod types;
pub mod uploader;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::{BulkClient, CopyOptions};
pub use config::{ClientConfig, Config};
pub use lister::KeyLister;
pub use runner::{run_all, DEFAULT_MAX_CONCURRENT};
pub use types::error::{
    is_invalid_argument, is_remote_service_error, partial_failure_report, BulkError,
};
pub use types::{BulkReport, FailedKey, KeyPage, TransferStatistics, UploadedPart};
pub use uploader::{MultipartUploader, MIN_PART_SIZE};
