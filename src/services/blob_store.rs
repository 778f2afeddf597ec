//! src/services/blob_store.rs
//!
//! BlobStore — thin provider-agnostic wrapper over the `object_store`
//! crate. The backend (S3-compatible or Azure Blob) is chosen once at
//! startup from a typed `Provider`; every operation behaves identically
//! regardless of which backend is underneath. Blobs are keyed by the
//! stringified image id inside a single configured container.

use bytes::Bytes;
use futures::stream::BoxStream;
use object_store::{
    ObjectStore, aws::AmazonS3Builder, azure::MicrosoftAzureBuilder, memory::InMemory,
    path::Path as ObjectPath,
};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;
use tracing::debug;

/// Blob backend selection, parsed from `STORAGE_PROVIDER` at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    S3,
    Azure,
}

impl FromStr for Provider {
    type Err = String;

    // An unset or empty variable falls back to S3, matching the historical
    // default; an unrecognized value is a startup error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "s3" | "aws" => Ok(Provider::S3),
            "azure" => Ok(Provider::Azure),
            other => Err(format!("unknown storage provider `{other}`")),
        }
    }
}

/// Credentials and container naming shared by both providers.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub provider: Provider,
    pub account_name: String,
    pub access_key: String,
    pub container: String,
    /// Only consulted when the provider is S3.
    pub aws_region: String,
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Backend(#[from] object_store::Error),
}

pub type BlobResult<T> = Result<T, BlobError>;

fn not_found(key: &str, err: object_store::Error) -> BlobError {
    match err {
        object_store::Error::NotFound { .. } => BlobError::NotFound(key.to_string()),
        other => BlobError::Backend(other),
    }
}

/// BlobStore holds the provider client built once at startup; clones share
/// the same client and are safe for concurrent use.
#[derive(Clone)]
pub struct BlobStore {
    inner: Arc<dyn ObjectStore>,
    container: String,
}

impl BlobStore {
    /// Build the configured provider client.
    pub fn from_config(cfg: &BlobConfig) -> BlobResult<Self> {
        let inner: Arc<dyn ObjectStore> = match cfg.provider {
            Provider::S3 => Arc::new(
                AmazonS3Builder::new()
                    .with_bucket_name(&cfg.container)
                    .with_region(&cfg.aws_region)
                    .with_access_key_id(&cfg.account_name)
                    .with_secret_access_key(&cfg.access_key)
                    .build()?,
            ),
            Provider::Azure => Arc::new(
                MicrosoftAzureBuilder::new()
                    .with_account(&cfg.account_name)
                    .with_access_key(&cfg.access_key)
                    .with_container_name(&cfg.container)
                    .build()?,
            ),
        };

        Ok(Self {
            inner,
            container: cfg.container.clone(),
        })
    }

    /// In-process backend for tests.
    #[allow(dead_code)]
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
            container: "test".into(),
        }
    }

    /// Upload a blob under the given key, overwriting any existing blob.
    pub async fn put(&self, key: &str, bytes: Bytes) -> BlobResult<()> {
        let location = ObjectPath::from(key);
        self.inner.put(&location, bytes.into()).await?;
        debug!("stored blob `{}` in container `{}`", key, self.container);
        Ok(())
    }

    /// Fetch the whole blob into memory. Used for the classifier call.
    pub async fn get_bytes(&self, key: &str) -> BlobResult<Bytes> {
        let location = ObjectPath::from(key);
        let result = self
            .inner
            .get(&location)
            .await
            .map_err(|err| not_found(key, err))?;
        let bytes = result.bytes().await.map_err(|err| not_found(key, err))?;
        Ok(bytes)
    }

    /// Open the blob as a byte stream for the download endpoint.
    pub async fn get_stream(
        &self,
        key: &str,
    ) -> BlobResult<BoxStream<'static, object_store::Result<Bytes>>> {
        let location = ObjectPath::from(key);
        let result = self
            .inner
            .get(&location)
            .await
            .map_err(|err| not_found(key, err))?;
        Ok(result.into_stream())
    }

    /// Remove the blob. Backends that report NotFound for a missing key are
    /// mapped to `BlobError::NotFound`; the delete flow treats that as
    /// already-gone.
    pub async fn delete(&self, key: &str) -> BlobResult<()> {
        let location = ObjectPath::from(key);
        self.inner
            .delete(&location)
            .await
            .map_err(|err| not_found(key, err))?;
        debug!("removed blob `{}` from container `{}`", key, self.container);
        Ok(())
    }

    /// Backend connectivity check for the readiness probe. A HEAD on a
    /// sentinel key that answers NotFound still proves the backend is
    /// reachable.
    pub async fn probe(&self) -> BlobResult<()> {
        let location = ObjectPath::from(".readyz-probe");
        match self.inner.head(&location).await {
            Ok(_) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(BlobError::Backend(err)),
        }
    }
}
