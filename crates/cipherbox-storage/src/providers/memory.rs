//! In-memory blob store for tests and local development.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use cipherbox_core::error::AppError;
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::BlobStore;
use cipherbox_core::types::{ObjectInfo, ObjectMetadata, StoredObject};

use super::check_key;

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    metadata: ObjectMetadata,
    last_modified: DateTime<Utc>,
}

impl Entry {
    fn info(&self, key: &str) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            stored_size: self.data.len() as u64,
            last_modified: self.last_modified,
            metadata: self.metadata.clone(),
        }
    }
}

/// Blob store backed by a concurrent map. Contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<DashMap<String, Entry>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Replace an object's bytes in place, keeping its metadata.
    pub fn overwrite_bytes(&self, key: &str, data: Bytes) -> AppResult<()> {
        let mut entry = self
            .objects
            .get_mut(key)
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))?;
        entry.data = data;
        Ok(())
    }

    /// Replace an object's metadata in place, keeping its bytes.
    pub fn overwrite_metadata(&self, key: &str, metadata: ObjectMetadata) -> AppResult<()> {
        let mut entry = self
            .objects
            .get_mut(key)
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))?;
        entry.metadata = metadata;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put(&self, key: &str, data: Bytes, metadata: ObjectMetadata) -> AppResult<ObjectInfo> {
        check_key(key)?;
        let entry = Entry {
            data,
            metadata,
            last_modified: Utc::now(),
        };
        let info = entry.info(key);
        self.objects.insert(key.to_string(), entry);
        Ok(info)
    }

    async fn get(&self, key: &str) -> AppResult<StoredObject> {
        let entry = self
            .objects
            .get(key)
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))?;
        Ok(StoredObject {
            data: entry.data.clone(),
            info: entry.info(key),
        })
    }

    async fn head(&self, key: &str) -> AppResult<ObjectInfo> {
        self.objects
            .get(key)
            .map(|entry| entry.info(key))
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<ObjectInfo>> {
        let mut infos: Vec<ObjectInfo> = self
            .objects
            .iter()
            .filter(|item| item.key().starts_with(prefix))
            .map(|item| item.value().info(item.key()))
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.objects.contains_key(key))
    }
}
