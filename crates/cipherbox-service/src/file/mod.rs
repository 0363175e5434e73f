//! Encrypted per-user file storage.

pub mod manager;
pub mod naming;

pub use manager::{BlobManager, DEFAULT_CONTENT_TYPE, DownloadedFile};
