use std::sync::Arc;

use bytes::Bytes;
use dms_config::MinioSettings;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Bucket-scoped adapter over a single `object_store::ObjectStore`
/// backend, grounded in the teacher pack's own MinIO wiring
/// (`rde-io::sink_iceberg`'s `AmazonS3Builder` usage) rather than a
/// hand-rolled S3 client. `object_store` itself ships an in-memory
/// backend (`object_store::memory::InMemory`) that crate tests construct
/// directly, so there's no need for a bespoke test-fake trait here.
pub struct ObjectBucket {
    store: Arc<dyn ObjectStore>,
    bucket_name: String,
    http_client: reqwest::Client,
}

impl ObjectBucket {
    pub fn from_minio_settings(settings: &MinioSettings) -> Result<Self, StoreError> {
        let store = AmazonS3Builder::new()
            .with_endpoint(&settings.endpoint)
            .with_access_key_id(&settings.root_user)
            .with_secret_access_key(&settings.root_password)
            .with_bucket_name(&settings.bucket_name)
            .with_allow_http(!settings.secure)
            .build()?;

        Ok(Self {
            store: Arc::new(store),
            bucket_name: settings.bucket_name.clone(),
            http_client: reqwest::Client::new(),
        })
    }

    #[cfg(test)]
    pub fn in_memory(bucket_name: impl Into<String>) -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
            bucket_name: bucket_name.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Uploads `bytes` to `path` within the bucket and returns
    /// `"<bucket>/<path>"` (spec §4.2 contract).
    pub async fn upload(&self, bytes: Bytes, path: &str) -> Result<String, StoreError> {
        let object_path = ObjectPath::from(path);
        self.store.put(&object_path, bytes.into()).await?;
        debug!(path, "uploaded object");
        Ok(format!("{}/{}", self.bucket_name, path))
    }

    /// Streaming read; the returned stream closes on exhaustion by virtue
    /// of being a plain `Stream` the caller drives to completion (spec
    /// §4.2 "closes on reader exhaustion").
    pub async fn stream(
        &self,
        storage_path: &str,
    ) -> Result<impl futures::Stream<Item = Result<Bytes, StoreError>>, StoreError> {
        let path = self.strip_bucket_prefix(storage_path);
        let object_path = ObjectPath::from(path);
        let result = self.store.get(&object_path).await?;
        Ok(result.into_stream().map_err(StoreError::from))
    }

    pub async fn get_bytes(&self, storage_path: &str) -> Result<Bytes, StoreError> {
        let path = self.strip_bucket_prefix(storage_path);
        let object_path = ObjectPath::from(path);
        let result = self.store.get(&object_path).await?;
        Ok(result.bytes().await?)
    }

    pub async fn copy(&self, src: &str, dst: &str) -> Result<(), StoreError> {
        let src_path = ObjectPath::from(self.strip_bucket_prefix(src));
        let dst_path = ObjectPath::from(self.strip_bucket_prefix(dst));
        self.store.copy(&src_path, &dst_path).await?;
        Ok(())
    }

    pub async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let object_path = ObjectPath::from(self.strip_bucket_prefix(path));
        self.store.delete(&object_path).await?;
        Ok(())
    }

    pub async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let object_path = ObjectPath::from(self.strip_bucket_prefix(path));
        match self.store.head(&object_path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Downloads a presigned URL from an upstream producer's object store
    /// and re-uploads the bytes under `path` in this bucket (spec §4.5
    /// step 2 "transfer"). Returns `Ok(None)` on any failure rather than
    /// propagating, matching the pipeline's "per-file failure logs and
    /// stores null; it does not abort" contract — the caller is expected
    /// to record the `None` and continue.
    pub async fn transfer_presigned(&self, source_url: &str, path: &str) -> Option<String> {
        let fetch = async {
            let bytes = self
                .http_client
                .get(source_url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            self.upload(bytes, path).await
        };

        match fetch.await {
            Ok(storage_path) => Some(storage_path),
            Err(err) => {
                warn!(path, error = %err, "failed to transfer presigned artifact");
                None
            }
        }
    }

    fn strip_bucket_prefix<'a>(&self, path: &'a str) -> &'a str {
        let prefix = format!("{}/", self.bucket_name);
        path.strip_prefix(prefix.as_str()).unwrap_or(path)
    }
}
