//! Blob store trait for key-addressed object storage.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::{ObjectInfo, ObjectMetadata, StoredObject};

/// Key-addressed storage whose metadata lives under the same key as the
/// bytes.
///
/// Implementations must write bytes and metadata together: a reader never
/// observes one without the other. The trait is defined here in
/// `cipherbox-core` and implemented in `cipherbox-storage`.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Check whether the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Write (or overwrite) an object with its metadata.
    async fn put(&self, key: &str, data: Bytes, metadata: ObjectMetadata) -> AppResult<ObjectInfo>;

    /// Fetch an object's bytes and metadata. Fails with `NotFound` if absent.
    async fn get(&self, key: &str) -> AppResult<StoredObject>;

    /// Fetch only an object's metadata. Fails with `NotFound` if absent.
    async fn head(&self, key: &str) -> AppResult<ObjectInfo>;

    /// List every object whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> AppResult<Vec<ObjectInfo>>;

    /// Remove an object. Fails with `NotFound` if absent.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}
