//! Blob store provider implementations.

pub mod local;
pub mod memory;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

use cipherbox_core::error::AppError;
use cipherbox_core::result::AppResult;

/// Reject keys that could escape a provider's namespace.
pub(crate) fn check_key(key: &str) -> AppResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(AppError::validation(format!("Invalid blob key: {key:?}")));
    }
    Ok(())
}
