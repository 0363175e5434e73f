//! # cipherbox-storage
//!
//! Blob-level building blocks for CipherBox: the AES-256-GCM
//! [`EncryptionCodec`], the blob store providers (local filesystem and
//! in-memory), and the [`StorageManager`] that bounds and retries calls
//! into whichever provider is configured.

pub mod codec;
pub mod manager;
pub mod providers;

pub use codec::EncryptionCodec;
pub use manager::StorageManager;
