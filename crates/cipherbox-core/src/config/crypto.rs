//! Blob encryption configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Length of the AES-256 key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Process-wide encryption key configuration, loaded once at startup.
#[derive(Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Hex-encoded 32-byte AES key.
    #[serde(default = "default_key")]
    pub encryption_key: String,
}

impl std::fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoConfig")
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            encryption_key: default_key(),
        }
    }
}

impl CryptoConfig {
    /// Decode the configured key, failing on bad hex or wrong length.
    pub fn key_bytes(&self) -> Result<Vec<u8>, AppError> {
        let key = hex::decode(self.encryption_key.trim())
            .map_err(|e| AppError::key_configuration(format!("Encryption key is not hex: {e}")))?;
        if key.len() != KEY_LENGTH {
            return Err(AppError::key_configuration(format!(
                "Encryption key must be {KEY_LENGTH} bytes, got {}",
                key.len()
            )));
        }
        Ok(key)
    }

    /// Whether the development default key is still in use.
    pub fn uses_default_key(&self) -> bool {
        self.encryption_key == default_key()
    }
}

fn default_key() -> String {
    "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff".to_string()
}
