pub mod client_builder;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectAttributes};
use aws_sdk_s3::Client;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageTrait};
use crate::types::error::BulkError;
use crate::types::{KeyPage, UploadedPart};

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// For service errors (S3 API responses), returns the S3 error code
/// (e.g. "AccessDenied", "NoSuchKey") and the human-readable error message
/// from the response. For other error types (network, timeout, construction
/// failure), returns "N/A" as the code and the full error description as the
/// message.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

/// S3 storage transport backed by aws-sdk-s3.
///
/// Stateless apart from the shared SDK client; the bucket is passed on every
/// call by the facade.
#[derive(Clone)]
pub struct S3Storage {
    client: Arc<Client>,
}

impl S3Storage {
    /// Build the transport, creating an SDK client from the given
    /// configuration (or the default credential/region chain).
    pub async fn create(client_config: Option<ClientConfig>) -> Storage {
        let client = client_builder::create_client(client_config.unwrap_or_default()).await;
        Box::new(S3Storage {
            client: Arc::new(client),
        })
    }

    /// Classify an SDK failure: log it with structured fields and wrap it as
    /// a [`BulkError::RemoteService`] so callers can recover the service
    /// error code by downcast.
    fn remote_error<E: std::fmt::Display + ProvideErrorMetadata>(
        e: &SdkError<E>,
        api: &'static str,
        bucket: &str,
        key: &str,
    ) -> anyhow::Error {
        let (s3_error_code, s3_error_message) = extract_sdk_error_details(e);
        tracing::error!(
            bucket = bucket,
            key = key,
            s3_error_code = s3_error_code,
            s3_error_message = s3_error_message,
            "S3 {} API call failed for s3://{}/{}: {} ({}).",
            api,
            bucket,
            key,
            s3_error_code,
            s3_error_message,
        );
        anyhow::anyhow!(BulkError::RemoteService {
            code: s3_error_code,
            message: s3_error_message,
        })
        .context(format!("aws_sdk_s3::client::{api}() failed."))
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: i32,
    ) -> Result<KeyPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_start_after(start_after.map(String::from))
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "list_objects_v2", bucket, prefix))?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(String::from))
            .collect();

        Ok(KeyPage {
            keys,
            has_more: output.is_truncated() == Some(true),
        })
    }

    async fn get_object_size(&self, bucket: &str, key: &str) -> Result<u64> {
        let output = self
            .client
            .get_object_attributes()
            .bucket(bucket)
            .key(key)
            .object_attributes(ObjectAttributes::ObjectSize)
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "get_object_attributes", bucket, key))?;

        Ok(output.object_size().unwrap_or(0).max(0) as u64)
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        // CopySource requires the key portion URL-encoded.
        let copy_source = format!("{}/{}", source_bucket, urlencoding::encode(source_key));

        self.client
            .copy_object()
            .copy_source(copy_source)
            .bucket(dest_bucket)
            .key(dest_key)
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "copy_object", source_bucket, source_key))?;

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "delete_object", bucket, key))?;

        Ok(())
    }

    async fn download_object(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "get_object", bucket, key))?;

        let mut body = output.body.into_async_read();
        let mut file = tokio::fs::File::create(local_path)
            .await
            .with_context(|| format!("failed to create local file: {}", local_path.display()))?;
        tokio::io::copy(&mut body, &mut file)
            .await
            .with_context(|| format!("failed to write local file: {}", local_path.display()))?;

        Ok(())
    }

    async fn upload_object(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .with_context(|| format!("failed to read local file: {}", local_path.display()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "put_object", bucket, key))?;

        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "create_multipart_upload", bucket, key))?;

        output
            .upload_id()
            .map(String::from)
            .context("CreateMultipartUpload response did not contain an upload id.")
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "upload_part", bucket, key))?;

        output
            .e_tag()
            .map(String::from)
            .context("UploadPart response did not contain an ETag.")
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<()> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(&part.e_tag)
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "complete_multipart_upload", bucket, key))?;

        Ok(())
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| Self::remote_error(&e, "abort_multipart_upload", bucket, key))?;

        Ok(())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .context("invalid presigned URL expiry duration")?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| Self::remote_error(&e, "get_object", bucket, key))?;

        Ok(request.uri().to_string())
    }
}
