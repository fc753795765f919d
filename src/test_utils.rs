//! Shared test utilities for the s3bulk library crate.
//!
//! Provides the canonical in-memory [`MockStorage`] transport and tracing
//! initialisation used across the unit and property test modules.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::storage::StorageTrait;
use crate::types::error::BulkError;
use crate::types::{KeyPage, UploadedPart};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

fn injected(api: &str) -> anyhow::Error {
    anyhow!(BulkError::RemoteService {
        code: "InternalError".to_string(),
        message: format!("injected {api} failure"),
    })
}

#[derive(Default)]
struct UploadSession {
    bucket: String,
    key: String,
    parts: BTreeMap<i32, Vec<u8>>,
}

#[derive(Default)]
struct Inner {
    /// (bucket, key) -> object bytes. BTreeMap keeps the service's
    /// lexicographic key order.
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    sessions: Mutex<HashMap<String, UploadSession>>,
    upload_counter: AtomicU32,
    list_page_calls: AtomicU32,
    copy_calls: AtomicU32,
    delete_calls: AtomicU32,
    created: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    aborted: Mutex<Vec<String>>,
    committed_parts: Mutex<HashMap<(String, String), Vec<i32>>>,
    fail_listing: AtomicBool,
    fail_create: AtomicBool,
    fail_complete: AtomicBool,
    fail_parts: Mutex<HashSet<i32>>,
    fail_copy_keys: Mutex<HashSet<String>>,
    fail_delete_keys: Mutex<HashSet<String>>,
}

/// In-memory storage transport with fault injection and call counters.
///
/// Keys are held in lexicographic order and pagination follows the real
/// service's exclusive `start_after` cursor semantics, so the lister and
/// facade are exercised against faithful listing behavior.
#[derive(Clone, Default)]
pub(crate) struct MockStorage {
    inner: Arc<Inner>,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // --- setup -----------------------------------------------------------

    pub(crate) fn put(&self, bucket: &str, key: &str, bytes: &[u8]) {
        self.inner
            .objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
    }

    pub(crate) fn fail_listing(&self) {
        self.inner.fail_listing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_create(&self) {
        self.inner.fail_create.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_complete(&self) {
        self.inner.fail_complete.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_part(&self, part_number: i32) {
        self.inner.fail_parts.lock().unwrap().insert(part_number);
    }

    pub(crate) fn fail_copy(&self, source_key: &str) {
        self.inner
            .fail_copy_keys
            .lock()
            .unwrap()
            .insert(source_key.to_string());
    }

    pub(crate) fn fail_delete(&self, key: &str) {
        self.inner
            .fail_delete_keys
            .lock()
            .unwrap()
            .insert(key.to_string());
    }

    // --- inspection ------------------------------------------------------

    pub(crate) fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.inner
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub(crate) fn keys(&self, bucket: &str) -> Vec<String> {
        self.inner
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub(crate) fn list_page_calls(&self) -> u32 {
        self.inner.list_page_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn copy_calls(&self) -> u32 {
        self.inner.copy_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_calls(&self) -> u32 {
        self.inner.delete_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn created_uploads(&self) -> usize {
        self.inner.created.lock().unwrap().len()
    }

    pub(crate) fn completed_uploads(&self) -> usize {
        self.inner.completed.lock().unwrap().len()
    }

    pub(crate) fn aborted_uploads(&self) -> usize {
        self.inner.aborted.lock().unwrap().len()
    }

    pub(crate) fn aborted_upload_ids(&self) -> Vec<String> {
        self.inner.aborted.lock().unwrap().clone()
    }

    pub(crate) fn last_upload_id(&self) -> Option<String> {
        self.inner.created.lock().unwrap().last().cloned()
    }

    /// Part numbers committed for a finalized object, in completion order.
    pub(crate) fn part_numbers(&self, bucket: &str, key: &str) -> Vec<i32> {
        self.inner
            .committed_parts
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: i32,
    ) -> Result<KeyPage> {
        self.inner.list_page_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_listing.load(Ordering::SeqCst) {
            return Err(injected("list_objects_page"));
        }

        let objects = self.inner.objects.lock().unwrap();
        let matching: Vec<String> = objects
            .keys()
            .filter(|(b, k)| {
                b == bucket
                    && k.starts_with(prefix)
                    && start_after.map_or(true, |cursor| k.as_str() > cursor)
            })
            .map(|(_, k)| k.clone())
            .collect();

        let page_len = (max_keys.max(0) as usize).min(matching.len());
        Ok(KeyPage {
            keys: matching[..page_len].to_vec(),
            has_more: matching.len() > page_len,
        })
    }

    async fn get_object_size(&self, bucket: &str, key: &str) -> Result<u64> {
        match self.get(bucket, key) {
            Some(bytes) => Ok(bytes.len() as u64),
            None => Err(anyhow!(BulkError::RemoteService {
                code: "NoSuchKey".to_string(),
                message: format!("key not found: {key}"),
            })),
        }
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        self.inner.copy_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_copy_keys.lock().unwrap().contains(source_key) {
            return Err(injected("copy_object"));
        }

        let mut objects = self.inner.objects.lock().unwrap();
        let bytes = objects
            .get(&(source_bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| {
                anyhow!(BulkError::RemoteService {
                    code: "NoSuchKey".to_string(),
                    message: format!("key not found: {source_key}"),
                })
            })?;
        objects.insert((dest_bucket.to_string(), dest_key.to_string()), bytes);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_delete_keys.lock().unwrap().contains(key) {
            return Err(injected("delete_object"));
        }

        // Deleting a missing key is a no-op, as on the real service.
        self.inner
            .objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn download_object(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let bytes = self.get(bucket, key).ok_or_else(|| {
            anyhow!(BulkError::RemoteService {
                code: "NoSuchKey".to_string(),
                message: format!("key not found: {key}"),
            })
        })?;
        tokio::fs::write(local_path, bytes).await?;
        Ok(())
    }

    async fn upload_object(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        let bytes = tokio::fs::read(local_path).await?;
        self.put(bucket, key, &bytes);
        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        if self.inner.fail_create.load(Ordering::SeqCst) {
            return Err(injected("create_multipart_upload"));
        }

        let id = format!(
            "upload-{}",
            self.inner.upload_counter.fetch_add(1, Ordering::SeqCst) + 1
        );
        self.inner.sessions.lock().unwrap().insert(
            id.clone(),
            UploadSession {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        self.inner.created.lock().unwrap().push(id.clone());
        Ok(id)
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        bytes: Vec<u8>,
    ) -> Result<String> {
        if self.inner.fail_parts.lock().unwrap().contains(&part_number) {
            return Err(injected("upload_part"));
        }

        let mut sessions = self.inner.sessions.lock().unwrap();
        let session = sessions.get_mut(upload_id).ok_or_else(|| {
            anyhow!(BulkError::RemoteService {
                code: "NoSuchUpload".to_string(),
                message: format!("unknown upload id: {upload_id}"),
            })
        })?;
        session.parts.insert(part_number, bytes);
        Ok(format!("etag-{part_number}"))
    }

    async fn complete_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<()> {
        if self.inner.fail_complete.load(Ordering::SeqCst) {
            return Err(injected("complete_multipart_upload"));
        }

        let session = self
            .inner
            .sessions
            .lock()
            .unwrap()
            .remove(upload_id)
            .ok_or_else(|| {
                anyhow!(BulkError::RemoteService {
                    code: "NoSuchUpload".to_string(),
                    message: format!("unknown upload id: {upload_id}"),
                })
            })?;

        // The part list must name uploaded parts in ascending order with
        // matching ETags, as the real service requires.
        let mut previous = 0;
        let mut body = Vec::new();
        for part in parts {
            if part.part_number <= previous {
                return Err(anyhow!(BulkError::RemoteService {
                    code: "InvalidPartOrder".to_string(),
                    message: "part numbers not ascending".to_string(),
                }));
            }
            previous = part.part_number;

            let bytes = session.parts.get(&part.part_number).ok_or_else(|| {
                anyhow!(BulkError::RemoteService {
                    code: "InvalidPart".to_string(),
                    message: format!("part {} was never uploaded", part.part_number),
                })
            })?;
            if part.e_tag != format!("etag-{}", part.part_number) {
                return Err(anyhow!(BulkError::RemoteService {
                    code: "InvalidPart".to_string(),
                    message: format!("etag mismatch for part {}", part.part_number),
                }));
            }
            body.extend_from_slice(bytes);
        }

        self.inner.committed_parts.lock().unwrap().insert(
            (session.bucket.clone(), session.key.clone()),
            parts.iter().map(|p| p.part_number).collect(),
        );
        self.put(&session.bucket, &session.key, &body);
        self.inner.completed.lock().unwrap().push(upload_id.to_string());
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> Result<()> {
        self.inner.sessions.lock().unwrap().remove(upload_id);
        self.inner.aborted.lock().unwrap().push(upload_id.to_string());
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String> {
        Ok(format!(
            "https://{bucket}.example.test/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }
}
