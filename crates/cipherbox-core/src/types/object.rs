//! Blob store value types.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Custom metadata key holding the lowercase-hex IV.
pub const META_IV: &str = "iv";

/// Custom metadata key holding the plaintext length in bytes.
pub const META_SIZE: &str = "size";

/// Metadata stored under the same key as an object's bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// Original content type of the plaintext.
    pub content_type: Option<String>,
    /// Free-form string pairs (`iv`, `size`).
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

impl ObjectMetadata {
    /// Metadata carrying only a content type.
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            custom: BTreeMap::new(),
        }
    }

    /// Builder-style insert of a custom pair.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Look up a custom pair.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.custom.get(key).map(String::as_str)
    }

    /// The hex IV, if recorded.
    pub fn iv(&self) -> Option<&str> {
        self.get(META_IV)
    }

    /// The recorded plaintext size, if present and numeric.
    pub fn plaintext_size(&self) -> Option<u64> {
        self.get(META_SIZE).and_then(|s| s.parse().ok())
    }
}

/// Listing/head information about a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Full blob key.
    pub key: String,
    /// Stored (ciphertext) length in bytes.
    pub stored_size: u64,
    /// Last time the object was written.
    pub last_modified: DateTime<Utc>,
    /// Metadata attached at write time.
    pub metadata: ObjectMetadata,
}

impl ObjectInfo {
    /// Size to report to clients: the plaintext size when recorded,
    /// otherwise the stored length.
    pub fn reported_size(&self) -> u64 {
        self.metadata.plaintext_size().unwrap_or(self.stored_size)
    }
}

/// A fully fetched object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object bytes as stored (ciphertext).
    pub data: Bytes,
    /// Head information.
    pub info: ObjectInfo,
}

/// What clients get back for an uploaded or listed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDescriptor {
    /// Download link for the file.
    pub url: String,
    /// File name within the owner's namespace.
    pub name: String,
    /// Plaintext size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}
