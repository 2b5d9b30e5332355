//! C1: the object-store client contract (§4.2, §6) and its concrete
//! `aws-sdk-s3`-backed implementation (§10.5).
//!
//! The dispatcher only ever depends on the [`ObjectStore`] trait, which is
//! exactly the "assumed to provide head/get/get-range/put/put-from-file/
//! delete/list-prefix" contract the spec treats as an external collaborator.
//! Keeping it as a trait lets tests substitute [`FakeObjectStore`] instead of
//! talking to a real bucket.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::envelope::{Envelope, Kind};

#[derive(Debug, Clone)]
pub struct ListEntry {
    pub key: String,
    pub size: u64,
    pub mtime: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<StoreError> for crate::error::FsError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => crate::error::FsError::NotFound,
            StoreError::Transport(msg) => crate::error::FsError::Transport(msg),
        }
    }
}

/// The external collaborator described in §6: a bucket-scoped set of typed
/// object operations. `key` is always the bare bucket key (no leading `/`),
/// as produced by [`crate::name_mapper::key_of`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head(&self, key: &str, default_kind: Kind) -> Result<Envelope, StoreError>;
    async fn get(&self, key: &str, default_kind: Kind) -> Result<(Envelope, Bytes), StoreError>;
    async fn get_range(&self, key: &str, start: u64, end_inclusive: u64) -> Result<Bytes, StoreError>;
    async fn put(&self, key: &str, body: Bytes, envelope: &Envelope) -> Result<(), StoreError>;
    async fn put_from_file(&self, key: &str, path: &Path, envelope: &Envelope) -> Result<(), StoreError>;
    /// Server-side copy from `src_key` to `key` with fresh metadata; used by
    /// `rename` (copy then delete source) and `utime` (self-copy).
    async fn copy(&self, src_key: &str, key: &str, envelope: &Envelope) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<ListEntry>, StoreError>;
}

/// Concrete `aws-sdk-s3` backed store (§10.5). Grounded on the S3-compatible
/// backend wiring in `examples/other_examples/0e6baa11_..._s3.rs.rs`.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint_url: Option<String>,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Self {
        let region = Region::new(region.into());
        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "s3fs-rs");
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            // §5: bounded retry (2 retries = 3 total attempts).
            .retry_config(RetryConfig::standard().with_max_attempts(3))
            .force_path_style(true);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }
        let client = Client::from_conf(builder.build());
        S3ObjectStore { client, bucket: bucket.into() }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}/{key}", self.bucket)
    }
}

fn is_not_found<E: std::fmt::Debug>(err: &aws_sdk_s3::error::SdkError<E>) -> bool
where
    E: aws_sdk_s3::error::ProvideErrorMetadata,
{
    matches!(
        err.as_service_error().and_then(|e| e.code()),
        Some("NoSuchKey") | Some("NotFound")
    )
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head(&self, key: &str, default_kind: Kind) -> Result<Envelope, StoreError> {
        let resp = self.client.head_object().bucket(&self.bucket).key(key).send().await;
        match resp {
            Ok(out) => {
                let headers = out.metadata().cloned().unwrap_or_default();
                let len = out.content_length().unwrap_or(0).max(0) as u64;
                Ok(Envelope::from_headers(&headers, default_kind, len))
            }
            Err(e) if is_not_found(&e) => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }

    async fn get(&self, key: &str, default_kind: Kind) -> Result<(Envelope, Bytes), StoreError> {
        let resp = self.client.get_object().bucket(&self.bucket).key(key).send().await;
        match resp {
            Ok(mut out) => {
                let headers = out.metadata().cloned().unwrap_or_default();
                let len = out.content_length().unwrap_or(0).max(0) as u64;
                let env = Envelope::from_headers(&headers, default_kind, len);
                let data = out
                    .body
                    .collect()
                    .await
                    .map_err(|e| StoreError::Transport(e.to_string()))?
                    .into_bytes();
                Ok((env, data))
            }
            Err(e) if is_not_found(&e) => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }

    async fn get_range(&self, key: &str, start: u64, end_inclusive: u64) -> Result<Bytes, StoreError> {
        let range = format!("bytes={start}-{end_inclusive}");
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .range(range)
            .send()
            .await;
        match resp {
            Ok(mut out) => out
                .body
                .collect()
                .await
                .map(|d| d.into_bytes())
                .map_err(|e| StoreError::Transport(e.to_string())),
            Err(e) if is_not_found(&e) => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }

    async fn put(&self, key: &str, body: Bytes, envelope: &Envelope) -> Result<(), StoreError> {
        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .acl(aws_sdk_s3::types::ObjectCannedAcl::Private);
        for (k, v) in envelope.to_headers() {
            req = req.metadata(k, v);
        }
        req.send().await.map(|_| ()).map_err(|e| StoreError::Transport(e.to_string()))
    }

    async fn put_from_file(&self, key: &str, path: &Path, envelope: &Envelope) -> Result<(), StoreError> {
        let stream = ByteStream::from_path(path)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(stream)
            .acl(aws_sdk_s3::types::ObjectCannedAcl::Private);
        for (k, v) in envelope.to_headers() {
            req = req.metadata(k, v);
        }
        req.send().await.map(|_| ()).map_err(|e| StoreError::Transport(e.to_string()))
    }

    async fn copy(&self, src_key: &str, key: &str, envelope: &Envelope) -> Result<(), StoreError> {
        let copy_source = self.full_key(src_key);
        let mut req = self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(copy_source)
            .key(key)
            .metadata_directive(aws_sdk_s3::types::MetadataDirective::Replace);
        for (k, v) in envelope.to_headers() {
            req = req.metadata(k, v);
        }
        match req.send().await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<ListEntry>, StoreError> {
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .delimiter("/");
            if let Some(token) = continuation.take() {
                req = req.continuation_token(token);
            }
            let out = req.send().await.map_err(|e| StoreError::Transport(e.to_string()))?;

            for obj in out.contents() {
                let key = obj.key().unwrap_or_default().to_string();
                let size = obj.size().unwrap_or(0).max(0) as u64;
                let mtime = obj
                    .last_modified()
                    .and_then(|t| t.secs().try_into().ok())
                    .unwrap_or(0);
                entries.push(ListEntry { key, size, mtime });
            }
            for prefix_obj in out.common_prefixes() {
                if let Some(key) = prefix_obj.prefix() {
                    entries.push(ListEntry { key: key.to_string(), size: 0, mtime: 0 });
                }
            }

            if out.is_truncated().unwrap_or(false) {
                continuation = out.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }
        Ok(entries)
    }
}

/// In-memory fake used by tests (§10.6): no network, no FUSE mount. Kept
/// unconditionally compiled (not `#[cfg(test)]`) so integration tests under
/// `tests/`, which link this crate as an ordinary dependency, can use it too.
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeObjectStore {
        objects: Mutex<HashMap<String, (Envelope, Bytes)>>,
    }

    impl FakeObjectStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, key: &str, envelope: Envelope, body: Bytes) {
            self.objects.lock().unwrap().insert(key.to_string(), (envelope, body));
        }
    }

    #[async_trait]
    impl ObjectStore for FakeObjectStore {
        async fn head(&self, key: &str, _default_kind: Kind) -> Result<Envelope, StoreError> {
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .map(|(e, _)| e.clone())
                .ok_or(StoreError::NotFound)
        }

        async fn get(&self, key: &str, _default_kind: Kind) -> Result<(Envelope, Bytes), StoreError> {
            self.objects.lock().unwrap().get(key).cloned().ok_or(StoreError::NotFound)
        }

        async fn get_range(&self, key: &str, start: u64, end_inclusive: u64) -> Result<Bytes, StoreError> {
            let objects = self.objects.lock().unwrap();
            let (_, body) = objects.get(key).ok_or(StoreError::NotFound)?;
            let start = start as usize;
            let end = ((end_inclusive as usize) + 1).min(body.len());
            if start >= body.len() {
                return Ok(Bytes::new());
            }
            Ok(body.slice(start..end))
        }

        async fn put(&self, key: &str, body: Bytes, envelope: &Envelope) -> Result<(), StoreError> {
            let mut env = envelope.clone();
            env.size = body.len() as u64;
            self.objects.lock().unwrap().insert(key.to_string(), (env, body));
            Ok(())
        }

        async fn put_from_file(&self, key: &str, path: &Path, envelope: &Envelope) -> Result<(), StoreError> {
            let data = std::fs::read(path).map_err(|e| StoreError::Transport(e.to_string()))?;
            self.put(key, Bytes::from(data), envelope).await
        }

        async fn copy(&self, src_key: &str, key: &str, envelope: &Envelope) -> Result<(), StoreError> {
            let body = self
                .objects
                .lock()
                .unwrap()
                .get(src_key)
                .map(|(_, b)| b.clone())
                .ok_or(StoreError::NotFound)?;
            let mut env = envelope.clone();
            env.size = body.len() as u64;
            self.objects.lock().unwrap().insert(key.to_string(), (env, body));
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.objects.lock().unwrap().remove(key).map(|_| ()).ok_or(StoreError::NotFound)
        }

        async fn list_prefix(&self, prefix: &str) -> Result<Vec<ListEntry>, StoreError> {
            let objects = self.objects.lock().unwrap();
            let mut entries: Vec<ListEntry> = objects
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, (e, b))| ListEntry { key: k.clone(), size: b.len() as u64, mtime: e.mtime })
                .collect();
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(entries)
        }
    }
}
