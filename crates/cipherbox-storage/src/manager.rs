//! Storage manager: bounds and retries every call into the configured
//! blob store.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use cipherbox_core::config::{RetryConfig, StorageConfig, StorageProviderKind};
use cipherbox_core::deadline::with_deadline;
use cipherbox_core::error::ErrorKind;
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::BlobStore;
use cipherbox_core::types::{ObjectInfo, ObjectMetadata, StoredObject};

use crate::providers::{LocalBlobStore, MemoryBlobStore};

/// Wraps a [`BlobStore`] so that no call blocks past its deadline and
/// transient `IoFailure`s are retried with exponential backoff.
///
/// Every operation on the trait is idempotent at the key level, so the
/// whole surface is eligible for retry. Callers composing several calls
/// (rename) must not rely on the manager to retry the composite.
#[derive(Debug, Clone)]
pub struct StorageManager {
    store: Arc<dyn BlobStore>,
    timeout: Duration,
    retry: RetryConfig,
}

impl StorageManager {
    /// Wrap an existing store.
    pub fn new(store: Arc<dyn BlobStore>, timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            store,
            timeout,
            retry,
        }
    }

    /// Build the provider selected by configuration and wrap it.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let store: Arc<dyn BlobStore> = match config.provider {
            StorageProviderKind::Memory => Arc::new(MemoryBlobStore::new()),
            StorageProviderKind::Local => {
                Arc::new(LocalBlobStore::new(Path::new(&config.local.root_path)).await?)
            }
        };
        info!(
            provider = store.provider_type(),
            timeout_seconds = config.operation_timeout_seconds,
            max_attempts = config.retry.max_attempts,
            "Blob store initialized"
        );
        Ok(Self::new(
            store,
            Duration::from_secs(config.operation_timeout_seconds),
            config.retry.clone(),
        ))
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    async fn run<T, F, Fut>(&self, operation: &str, key: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let max_backoff = Duration::from_millis(self.retry.max_backoff_ms);
        let mut backoff = Duration::from_millis(self.retry.initial_backoff_ms);
        let mut attempt = 1;

        loop {
            match with_deadline(self.timeout, operation, call()).await {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        operation,
                        key,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Blob store call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(max_backoff);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl BlobStore for StorageManager {
    fn provider_type(&self) -> &str {
        self.store.provider_type()
    }

    async fn health_check(&self) -> AppResult<bool> {
        with_deadline(self.timeout, "health_check", self.store.health_check()).await
    }

    async fn put(&self, key: &str, data: Bytes, metadata: ObjectMetadata) -> AppResult<ObjectInfo> {
        self.run("put", key, || self.store.put(key, data.clone(), metadata.clone()))
            .await
    }

    async fn get(&self, key: &str) -> AppResult<StoredObject> {
        self.run("get", key, || self.store.get(key)).await
    }

    async fn head(&self, key: &str) -> AppResult<ObjectInfo> {
        self.run("head", key, || self.store.head(key)).await
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<ObjectInfo>> {
        self.run("list", prefix, || self.store.list(prefix)).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        // A timed-out delete may still have landed; a NotFound on a later
        // attempt means the object is gone, which is what was asked for.
        let mut attempts = 0u32;
        let result = self
            .run("delete", key, || {
                attempts += 1;
                self.store.delete(key)
            })
            .await;
        match result {
            Err(e) if e.kind == ErrorKind::NotFound && attempts > 1 => Ok(()),
            other => other,
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.run("exists", key, || self.store.exists(key)).await
    }
}
