use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::config::Config;
use crate::types::{KeyPage, UploadedPart};

pub mod s3;

/// Type alias for a boxed StorageTrait trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// The storage transport: one method per primitive remote call the engine
/// performs. Every method may fail with a classified
/// [`BulkError::RemoteService`](crate::BulkError::RemoteService) carried
/// inside the `anyhow::Error`.
///
/// The bucket is an explicit argument on every call; the facade captures the
/// active bucket once at operation start, so a concurrent bucket switch is
/// never observed mid-operation.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Fetch one page of keys under `prefix`, starting strictly after
    /// `start_after` in lexicographic key order.
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: i32,
    ) -> Result<KeyPage>;

    /// Object size in bytes via GetObjectAttributes.
    async fn get_object_size(&self, bucket: &str, key: &str) -> Result<u64>;

    /// Server-side copy of a single object.
    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()>;

    /// Delete a single object. Deleting a missing key is a no-op, not an
    /// error (the service reports success either way).
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Stream an object's body into a local file.
    async fn download_object(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()>;

    /// Single-call PutObject upload of a local file.
    async fn upload_object(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()>;

    /// Start a multipart upload session, returning its upload id.
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String>;

    /// Upload one part, returning the part's ETag.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        bytes: Vec<u8>,
    ) -> Result<String>;

    /// Finalize a multipart upload with the ascending part list.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<()>;

    /// Abort a multipart upload session, releasing server-side storage
    /// reserved for uploaded-but-uncommitted parts.
    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;

    /// Generate a time-limited presigned GET URL for one object.
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String>;
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Create the production S3 storage transport from the engine config.
pub async fn create_storage(config: &Config) -> Storage {
    s3::S3Storage::create(config.client_config.clone()).await
}
