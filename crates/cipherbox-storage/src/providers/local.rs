//! Local filesystem blob store.
//!
//! Each object is a single file under `<root>/objects/<key>`:
//!
//! ```text
//! [u32 big-endian header length][JSON ObjectMetadata][payload bytes]
//! ```
//!
//! Writes go to `<root>/staging/` first and are renamed into place, so a
//! reader sees either the old object or the new one, never bytes without
//! their metadata. A write whose caller has gone away deletes its staged
//! file instead of renaming it, and opening the store sweeps anything a
//! crashed process left in `staging/`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use uuid::Uuid;

use cipherbox_core::error::{AppError, ErrorKind};
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::BlobStore;
use cipherbox_core::types::{ObjectInfo, ObjectMetadata, StoredObject};

use super::check_key;

const HEADER_LEN_BYTES: usize = 4;
const OBJECTS_DIR: &str = "objects";
const STAGING_DIR: &str = "staging";
const STAGED_EXT: &str = "tmp";

/// Flags a staged write as abandoned when the awaiting `put` is dropped.
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Blob store that keeps objects as files on local disk.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    objects: PathBuf,
    staging: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root_path`, creating directories as needed.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref();
        let objects = root.join(OBJECTS_DIR);
        let staging = root.join(STAGING_DIR);
        for dir in [&objects, &staging] {
            fs::create_dir_all(dir).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::IoFailure,
                    format!("Failed to create storage directory: {}", dir.display()),
                    e,
                )
            })?;
        }
        sweep_staging(&staging).await;
        Ok(Self { objects, staging })
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        check_key(key)?;
        Ok(self.objects.join(key))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.objects).ok()?;
        let segments: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }

    async fn read_header(file: &mut fs::File, key: &str) -> AppResult<(ObjectMetadata, u64)> {
        let mut len_buf = [0u8; HEADER_LEN_BYTES];
        file.read_exact(&mut len_buf)
            .await
            .map_err(|e| io_error(e, key, "read header length"))?;
        let header_len = u32::from_be_bytes(len_buf) as usize;

        let mut header = vec![0u8; header_len];
        file.read_exact(&mut header)
            .await
            .map_err(|e| io_error(e, key, "read header"))?;
        let metadata: ObjectMetadata = serde_json::from_slice(&header)?;
        Ok((metadata, (HEADER_LEN_BYTES + header_len) as u64))
    }

    async fn info_at(&self, path: &Path, key: &str) -> AppResult<ObjectInfo> {
        let mut file = fs::File::open(path)
            .await
            .map_err(|e| io_error(e, key, "open"))?;
        let file_meta = file
            .metadata()
            .await
            .map_err(|e| io_error(e, key, "stat"))?;
        let (metadata, header_size) = Self::read_header(&mut file, key).await?;

        Ok(ObjectInfo {
            key: key.to_string(),
            stored_size: file_meta.len().saturating_sub(header_size),
            last_modified: modified_at(&file_meta),
            metadata,
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.objects.is_dir() && self.staging.is_dir())
    }

    async fn put(&self, key: &str, data: Bytes, metadata: ObjectMetadata) -> AppResult<ObjectInfo> {
        let target = self.resolve(key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(e, key, "create parent directory"))?;
        }

        let header = serde_json::to_vec(&metadata)?;
        let header_len = u32::try_from(header.len())
            .map_err(|_| AppError::validation(format!("Metadata too large for {key}")))?;

        let staged = self.staging.join(format!("{}.{STAGED_EXT}", Uuid::new_v4()));
        let abandoned = Arc::new(AtomicBool::new(false));
        let _abandon_on_drop = AbandonOnDrop(Arc::clone(&abandoned));

        // The blocking task outlives a cancelled caller, so it owns cleanup.
        let task = {
            let target = target.clone();
            let data = data.clone();
            tokio::task::spawn_blocking(move || {
                write_staged(&staged, &target, header_len, &header, &data, &abandoned)
            })
        };
        let written = task
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Blob write task failed", e))?
            .map_err(|e| {
                AppError::with_source(ErrorKind::IoFailure, format!("Failed to write object: {key}"), e)
            })?;
        if !written {
            return Err(AppError::io_failure(format!("Write abandoned: {key}")));
        }

        debug!(key, bytes = data.len(), "Wrote object");
        self.info_at(&target, key).await
    }

    async fn get(&self, key: &str) -> AppResult<StoredObject> {
        let path = self.resolve(key)?;
        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| io_error(e, key, "open"))?;
        let file_meta = file
            .metadata()
            .await
            .map_err(|e| io_error(e, key, "stat"))?;
        let (metadata, _) = Self::read_header(&mut file, key).await?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .await
            .map_err(|e| io_error(e, key, "read"))?;

        Ok(StoredObject {
            info: ObjectInfo {
                key: key.to_string(),
                stored_size: data.len() as u64,
                last_modified: modified_at(&file_meta),
                metadata,
            },
            data: Bytes::from(data),
        })
    }

    async fn head(&self, key: &str) -> AppResult<ObjectInfo> {
        let path = self.resolve(key)?;
        self.info_at(&path, key).await
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<ObjectInfo>> {
        let start = match prefix.rfind('/') {
            Some(idx) => self.objects.join(&prefix[..idx]),
            None => self.objects.clone(),
        };
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut infos = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| io_error(e, prefix, "list"))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| io_error(e, prefix, "read directory entry"))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| io_error(e, prefix, "stat directory entry"))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(key) = self.key_for(&path) else {
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }
                match self.info_at(&path, &key).await {
                    Ok(info) => infos.push(info),
                    // Deleted between read_dir and open.
                    Err(e) if e.kind == ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }

        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| io_error(e, key, "delete"))?;
        debug!(key, "Deleted object");
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| io_error(e, key, "stat"))
    }
}

/// Write one object file into `staged` and rename it over `target`.
///
/// Returns `Ok(false)` without renaming when the caller gave up first. The
/// staged file is gone on every path out of here.
fn write_staged(
    staged: &Path,
    target: &Path,
    header_len: u32,
    header: &[u8],
    data: &[u8],
    abandoned: &AtomicBool,
) -> std::io::Result<bool> {
    let result = (|| -> std::io::Result<bool> {
        let mut file = std::fs::File::create(staged)?;
        file.write_all(&header_len.to_be_bytes())?;
        file.write_all(header)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        if abandoned.load(Ordering::SeqCst) {
            return Ok(false);
        }
        std::fs::rename(staged, target)?;
        Ok(true)
    })();

    if !matches!(result, Ok(true)) {
        if let Err(e) = std::fs::remove_file(staged) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %staged.display(), error = %e, "Failed to remove staged blob");
            }
        }
    }
    result
}

/// Remove staged files left by a previous process that died mid-write.
async fn sweep_staging(staging: &Path) {
    let mut entries = match fs::read_dir(staging).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %staging.display(), error = %e, "Could not scan staging directory");
            return;
        }
    };
    let mut removed = 0usize;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == STAGED_EXT)
            && fs::remove_file(&path).await.is_ok()
        {
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(removed, "Swept leftover staged blobs");
    }
}

fn io_error(err: std::io::Error, key: &str, action: &str) -> AppError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Object not found: {key}"))
    } else {
        AppError::with_source(
            ErrorKind::IoFailure,
            format!("Failed to {action}: {key}"),
            err,
        )
    }
}

fn modified_at(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (_dir, store) = store().await;
        let meta = ObjectMetadata::with_content_type("text/plain")
            .insert("iv", "0a0b")
            .insert("size", "11");

        let info = store
            .put("uploads/u1/hello.txt", Bytes::from("ciphertext!"), meta.clone())
            .await
            .unwrap();
        assert_eq!(info.stored_size, 11);
        assert_eq!(info.metadata, meta);

        assert!(store.exists("uploads/u1/hello.txt").await.unwrap());
        let obj = store.get("uploads/u1/hello.txt").await.unwrap();
        assert_eq!(obj.data, Bytes::from("ciphertext!"));
        assert_eq!(obj.info.metadata, meta);

        store.delete("uploads/u1/hello.txt").await.unwrap();
        assert!(!store.exists("uploads/u1/hello.txt").await.unwrap());
        let err = store.get("uploads/u1/hello.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_metadata_with_bytes() {
        let (_dir, store) = store().await;
        store
            .put("k/a", Bytes::from("one"), ObjectMetadata::default().insert("iv", "01"))
            .await
            .unwrap();
        store
            .put("k/a", Bytes::from("two!"), ObjectMetadata::default().insert("iv", "02"))
            .await
            .unwrap();

        let obj = store.get("k/a").await.unwrap();
        assert_eq!(obj.data, Bytes::from("two!"));
        assert_eq!(obj.info.metadata.iv(), Some("02"));
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let (_dir, store) = store().await;
        for key in ["uploads/u1/a.txt", "uploads/u1/b.txt", "uploads/u2/c.txt"] {
            store
                .put(key, Bytes::from("x"), ObjectMetadata::default())
                .await
                .unwrap();
        }

        let keys: Vec<_> = store
            .list("uploads/u1/")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.key)
            .collect();
        assert_eq!(keys, vec!["uploads/u1/a.txt", "uploads/u1/b.txt"]);

        assert!(store.list("uploads/nobody/").await.unwrap().is_empty());
    }

    fn staged_count(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path().join(STAGING_DIR)).unwrap().count()
    }

    #[tokio::test]
    async fn test_cancelled_puts_leave_no_staged_files() {
        let (dir, store) = store().await;
        let payload = Bytes::from(vec![0x5au8; 8 * 1024 * 1024]);

        for i in 0..5 {
            let key = format!("big/{i}");
            let put = store.put(&key, payload.clone(), ObjectMetadata::default());
            let _ = tokio::time::timeout(std::time::Duration::from_millis(1), put).await;
        }

        // Abandoned writes finish on the blocking pool; wait them out.
        for _ in 0..250 {
            if staged_count(&dir) == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(staged_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_startup_sweeps_leftover_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(STAGING_DIR);
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("crashed.tmp"), b"half an object").unwrap();

        let store = LocalBlobStore::new(dir.path()).await.unwrap();
        assert_eq!(staged_count(&dir), 0);
        assert!(store.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let (_dir, store) = store().await;
        let err = store
            .put("uploads/../../etc", Bytes::new(), ObjectMetadata::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
