//! Encrypted blob lifecycle.
//!
//! Plaintext is encrypted before anything is written and decrypted only
//! after the whole object has been fetched. The IV and content type travel
//! in the metadata under the same key as the ciphertext, so every write
//! (including the copy half of a rename) moves them together.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use cipherbox_core::error::AppError;
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::BlobStore;
use cipherbox_core::types::{BlobDescriptor, META_IV, META_SIZE, ObjectInfo, ObjectMetadata};
use cipherbox_storage::EncryptionCodec;
use cipherbox_storage::codec::{iv_from_hex, iv_to_hex};

use super::naming::{blob_key, name_from_key, rename_target, user_prefix, validate_filename};
use crate::context::RequestContext;

/// Content type reported when none was recorded at upload.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A decrypted download.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub name: String,
    pub data: Bytes,
    pub content_type: String,
}

impl DownloadedFile {
    /// `Content-Disposition` value carrying the percent-encoded name.
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename*=UTF-8''{}",
            urlencoding::encode(&self.name)
        )
    }
}

/// Per-user encrypted file operations over a [`BlobStore`].
#[derive(Debug, Clone)]
pub struct BlobManager {
    store: Arc<dyn BlobStore>,
    codec: Arc<EncryptionCodec>,
    public_base_url: String,
    max_upload_bytes: u64,
}

impl BlobManager {
    pub fn new(
        store: Arc<dyn BlobStore>,
        codec: Arc<EncryptionCodec>,
        public_base_url: impl Into<String>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            store,
            codec,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_upload_bytes,
        }
    }

    /// Encrypt `data` and store it as `filename` in the caller's namespace.
    ///
    /// An existing file with the same name is replaced.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        filename: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> AppResult<BlobDescriptor> {
        validate_filename(filename)?;
        if data.len() as u64 > self.max_upload_bytes {
            return Err(AppError::validation(format!(
                "File exceeds the {} byte upload limit",
                self.max_upload_bytes
            )));
        }

        let (ciphertext, iv) = self.codec.encrypt(data)?;
        let metadata = ObjectMetadata {
            content_type: content_type.map(str::to_string),
            ..ObjectMetadata::default()
        }
        .insert(META_IV, iv_to_hex(&iv))
        .insert(META_SIZE, data.len().to_string());

        let key = blob_key(&ctx.uid, filename);
        let stored = self.store.put(&key, Bytes::from(ciphertext), metadata).await?;

        info!(uid = %ctx.uid, key = %key, size = data.len(), "File uploaded");
        Ok(self.descriptor(filename, &stored))
    }

    /// Fetch and decrypt `filename`.
    ///
    /// Fails with `NotFound` if absent, `MissingIv` if the metadata has no
    /// usable IV, `DecryptFailed` if the ciphertext does not authenticate.
    pub async fn download(&self, ctx: &RequestContext, filename: &str) -> AppResult<DownloadedFile> {
        validate_filename(filename)?;
        let key = blob_key(&ctx.uid, filename);
        let object = self.store.get(&key).await?;

        let iv_hex = object
            .info
            .metadata
            .iv()
            .ok_or_else(|| AppError::missing_iv(format!("No IV recorded for {key}")))?;
        let iv = iv_from_hex(iv_hex)?;
        let plaintext = self.codec.decrypt(&object.data, &iv)?;

        Ok(DownloadedFile {
            name: filename.to_string(),
            data: Bytes::from(plaintext),
            content_type: object
                .info
                .metadata
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        })
    }

    /// Every file in the caller's namespace, sorted by name. Nothing is
    /// decrypted.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<BlobDescriptor>> {
        let prefix = user_prefix(&ctx.uid);
        let objects = self.store.list(&prefix).await?;

        Ok(objects
            .iter()
            .filter_map(|info| {
                name_from_key(&prefix, &info.key).map(|name| self.descriptor(name, info))
            })
            .collect())
    }

    /// Move `old_name` to `new_name`, returning the name actually written.
    ///
    /// `new_name` inherits `old_name`'s extension when it has none. The store
    /// has no atomic move, so this is copy-then-delete: if the delete fails
    /// both objects are left in place and `IoFailure` is returned. Not safe to
    /// run concurrently with another rename or delete of the same file.
    pub async fn rename(
        &self,
        ctx: &RequestContext,
        old_name: &str,
        new_name: &str,
    ) -> AppResult<String> {
        validate_filename(old_name)?;
        validate_filename(new_name)?;
        let target = rename_target(old_name, new_name);
        validate_filename(&target)?;

        let old_key = blob_key(&ctx.uid, old_name);
        let new_key = blob_key(&ctx.uid, &target);

        let object = self.store.get(&old_key).await?;
        if target == old_name {
            return Ok(target);
        }
        if self.store.exists(&new_key).await? {
            return Err(AppError::conflict(format!("A file named {target} already exists")));
        }

        // Same ciphertext, same metadata: the IV stays bound to its bytes.
        self.store
            .put(&new_key, object.data, object.info.metadata)
            .await?;

        if let Err(e) = self.store.delete(&old_key).await {
            warn!(
                uid = %ctx.uid,
                from = %old_key,
                to = %new_key,
                error = %e,
                "Rename copied but could not remove the original; both objects remain"
            );
            return Err(AppError::io_failure(format!(
                "Renamed copy written but {old_name} could not be removed"
            )));
        }

        info!(uid = %ctx.uid, from = %old_key, to = %new_key, "File renamed");
        Ok(target)
    }

    /// Remove `filename`. Fails with `NotFound` if absent.
    pub async fn delete(&self, ctx: &RequestContext, filename: &str) -> AppResult<()> {
        validate_filename(filename)?;
        let key = blob_key(&ctx.uid, filename);
        self.store.delete(&key).await?;
        info!(uid = %ctx.uid, key = %key, "File deleted");
        Ok(())
    }

    /// Whether the underlying store is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.store.health_check().await
    }

    fn descriptor(&self, name: &str, info: &ObjectInfo) -> BlobDescriptor {
        BlobDescriptor {
            url: format!(
                "{}/files/download/{}",
                self.public_base_url,
                urlencoding::encode(name)
            ),
            name: name.to_string(),
            size: info.reported_size(),
            modified: info.last_modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use cipherbox_core::error::ErrorKind;
    use cipherbox_core::types::UserId;
    use cipherbox_storage::providers::MemoryBlobStore;

    use super::*;

    const KEY: [u8; 32] = [7u8; 32];

    fn manager() -> (BlobManager, MemoryBlobStore) {
        let store = MemoryBlobStore::new();
        let codec = Arc::new(EncryptionCodec::new(&KEY).unwrap());
        let manager = BlobManager::new(
            Arc::new(store.clone()),
            codec,
            "http://localhost:3000/",
            1024,
        );
        (manager, store)
    }

    fn ctx(uid: &str) -> RequestContext {
        RequestContext::new(UserId::new(uid))
    }

    #[tokio::test]
    async fn test_hello_scenario() {
        let (manager, _) = manager();
        let ctx = ctx("u1");

        let descriptor = manager
            .upload(&ctx, "hello.txt", b"Hello World", Some("text/plain"))
            .await
            .unwrap();
        assert_eq!(descriptor.name, "hello.txt");
        assert_eq!(descriptor.size, 11);
        assert_eq!(descriptor.url, "http://localhost:3000/files/download/hello.txt");

        let file = manager.download(&ctx, "hello.txt").await.unwrap();
        assert_eq!(&file.data[..], b"Hello World");
        assert_eq!(file.content_type, "text/plain");

        let listed = manager.list(&ctx).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "hello.txt");

        let renamed = manager.rename(&ctx, "hello.txt", "new_hello").await.unwrap();
        assert_eq!(renamed, "new_hello.txt");
        let names: Vec<_> = manager
            .list(&ctx)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["new_hello.txt"]);

        manager.delete(&ctx, "new_hello.txt").await.unwrap();
        assert!(manager.list(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ciphertext_is_stored() {
        let (manager, store) = manager();
        let ctx = ctx("u1");
        manager.upload(&ctx, "a.txt", b"secret bytes", None).await.unwrap();

        let object = store.get("uploads/u1/a.txt").await.unwrap();
        assert_ne!(&object.data[..], b"secret bytes");
        assert_eq!(object.info.metadata.iv().map(str::len), Some(32));
    }

    #[tokio::test]
    async fn test_rename_preserves_content_and_iv() {
        let (manager, store) = manager();
        let ctx = ctx("u1");
        manager.upload(&ctx, "a.txt", b"original", None).await.unwrap();
        let before = store.head("uploads/u1/a.txt").await.unwrap();

        assert_eq!(manager.rename(&ctx, "a.txt", "b").await.unwrap(), "b.txt");

        let after = store.head("uploads/u1/b.txt").await.unwrap();
        assert_eq!(after.metadata, before.metadata);
        assert_eq!(&manager.download(&ctx, "b.txt").await.unwrap().data[..], b"original");
        let err = manager.download(&ctx, "a.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    /// Delegates to memory but refuses every delete.
    #[derive(Debug)]
    struct UndeletableStore {
        inner: MemoryBlobStore,
    }

    #[async_trait::async_trait]
    impl BlobStore for UndeletableStore {
        fn provider_type(&self) -> &str {
            "undeletable"
        }

        async fn health_check(&self) -> AppResult<bool> {
            Ok(true)
        }

        async fn put(&self, key: &str, data: Bytes, metadata: ObjectMetadata) -> AppResult<ObjectInfo> {
            self.inner.put(key, data, metadata).await
        }

        async fn get(&self, key: &str) -> AppResult<cipherbox_core::types::StoredObject> {
            self.inner.get(key).await
        }

        async fn head(&self, key: &str) -> AppResult<ObjectInfo> {
            self.inner.head(key).await
        }

        async fn list(&self, prefix: &str) -> AppResult<Vec<ObjectInfo>> {
            self.inner.list(prefix).await
        }

        async fn delete(&self, _key: &str) -> AppResult<()> {
            Err(AppError::io_failure("permission denied"))
        }

        async fn exists(&self, key: &str) -> AppResult<bool> {
            self.inner.exists(key).await
        }
    }

    #[tokio::test]
    async fn test_rename_keeps_both_objects_when_delete_fails() {
        let inner = MemoryBlobStore::new();
        let manager = BlobManager::new(
            Arc::new(UndeletableStore {
                inner: inner.clone(),
            }),
            Arc::new(EncryptionCodec::new(&KEY).unwrap()),
            "http://localhost:3000",
            1024,
        );
        let ctx = ctx("u1");
        manager.upload(&ctx, "a.txt", b"original", None).await.unwrap();

        let err = manager.rename(&ctx, "a.txt", "b").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::IoFailure);

        assert!(inner.exists("uploads/u1/a.txt").await.unwrap());
        assert!(inner.exists("uploads/u1/b.txt").await.unwrap());
        assert_eq!(&manager.download(&ctx, "b.txt").await.unwrap().data[..], b"original");
        assert_eq!(&manager.download(&ctx, "a.txt").await.unwrap().data[..], b"original");
    }

    #[tokio::test]
    async fn test_rename_edge_cases() {
        let (manager, _) = manager();
        let ctx = ctx("u1");
        manager.upload(&ctx, "a.txt", b"one", None).await.unwrap();
        manager.upload(&ctx, "b.txt", b"two", None).await.unwrap();

        let err = manager.rename(&ctx, "a.txt", "b").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(manager.rename(&ctx, "a.txt", "a").await.unwrap(), "a.txt");
        assert_eq!(&manager.download(&ctx, "a.txt").await.unwrap().data[..], b"one");

        let err = manager.rename(&ctx, "missing.txt", "c").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_missing_iv() {
        let (manager, store) = manager();
        let ctx = ctx("u1");
        manager.upload(&ctx, "a.txt", b"data", None).await.unwrap();
        store
            .overwrite_metadata("uploads/u1/a.txt", ObjectMetadata::default())
            .unwrap();

        let err = manager.download(&ctx, "a.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingIv);
    }

    #[tokio::test]
    async fn test_corrupt_ciphertext() {
        let (manager, store) = manager();
        let ctx = ctx("u1");
        manager.upload(&ctx, "a.txt", b"data", None).await.unwrap();
        store
            .overwrite_bytes("uploads/u1/a.txt", Bytes::from_static(b"garbage-garbage-garbage"))
            .unwrap();

        let err = manager.download(&ctx, "a.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::DecryptFailed);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let (manager, _) = manager();
        let alice = ctx("alice");
        let bob = ctx("bob");
        manager.upload(&alice, "notes.txt", b"alice", None).await.unwrap();
        manager.upload(&bob, "notes.txt", b"bob", None).await.unwrap();

        assert_eq!(&manager.download(&alice, "notes.txt").await.unwrap().data[..], b"alice");
        assert_eq!(&manager.download(&bob, "notes.txt").await.unwrap().data[..], b"bob");

        manager.delete(&bob, "notes.txt").await.unwrap();
        assert_eq!(manager.list(&alice).await.unwrap().len(), 1);
        assert!(manager.list(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_names_and_oversize() {
        let (manager, _) = manager();
        let ctx = ctx("u1");
        let err = manager.upload(&ctx, "../x", b"x", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let big = vec![0u8; 2048];
        let err = manager.upload(&ctx, "big.bin", &big, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = manager.delete(&ctx, "nope.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_content_disposition_is_percent_encoded() {
        let file = DownloadedFile {
            name: "my report.pdf".to_string(),
            data: Bytes::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        };
        assert_eq!(
            file.content_disposition(),
            "attachment; filename*=UTF-8''my%20report.pdf"
        );
    }
}
