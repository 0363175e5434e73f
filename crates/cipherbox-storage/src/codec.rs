//! Symmetric encryption of blob payloads.
//!
//! AES-256-GCM with a 16-byte IV. The IV is drawn from the OS RNG on every
//! call; the GCM tag makes corruption, truncation and a mismatched IV
//! detectable at decrypt time.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};

use cipherbox_core::config::crypto::KEY_LENGTH;
use cipherbox_core::config::CryptoConfig;
use cipherbox_core::error::AppError;
use cipherbox_core::result::AppResult;

/// IV length in bytes.
pub const IV_LENGTH: usize = 16;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Process-wide blob cipher, built once at startup from the configured key.
#[derive(Clone)]
pub struct EncryptionCodec {
    cipher: Aes256Gcm16,
}

impl std::fmt::Debug for EncryptionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionCodec")
            .field("algorithm", &"AES-256-GCM")
            .finish_non_exhaustive()
    }
}

impl EncryptionCodec {
    /// Build a codec from raw key bytes. Anything but 32 bytes fails with
    /// `KeyConfiguration`.
    pub fn new(key: &[u8]) -> AppResult<Self> {
        if key.len() != KEY_LENGTH {
            return Err(AppError::key_configuration(format!(
                "Encryption key must be {KEY_LENGTH} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm16::new_from_slice(key)
            .map_err(|e| AppError::key_configuration(format!("Invalid encryption key: {e}")))?;
        Ok(Self { cipher })
    }

    /// Build a codec from the `crypto` configuration section.
    pub fn from_config(config: &CryptoConfig) -> AppResult<Self> {
        Self::new(&config.key_bytes()?)
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> AppResult<(Vec<u8>, [u8; IV_LENGTH])> {
        let nonce = Aes256Gcm16::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| AppError::key_configuration(format!("Encryption failed: {e}")))?;

        let mut iv = [0u8; IV_LENGTH];
        iv.copy_from_slice(nonce.as_slice());
        Ok((ciphertext, iv))
    }

    /// Decrypt `ciphertext` with the IV recorded at encryption time.
    ///
    /// Any tampering, truncation or wrong IV fails with `DecryptFailed`.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8]) -> AppResult<Vec<u8>> {
        if iv.len() != IV_LENGTH {
            return Err(AppError::decrypt_failed(format!(
                "IV must be {IV_LENGTH} bytes, got {}",
                iv.len()
            )));
        }
        let nonce = Nonce::<U16>::from_slice(iv);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| AppError::decrypt_failed("Ciphertext failed authentication"))
    }
}

/// Lowercase hex form of an IV, as stored in object metadata.
pub fn iv_to_hex(iv: &[u8]) -> String {
    hex::encode(iv)
}

/// Parse a stored hex IV. Non-hex or wrong length fails with `MissingIv`.
pub fn iv_from_hex(value: &str) -> AppResult<[u8; IV_LENGTH]> {
    let bytes = hex::decode(value)
        .map_err(|e| AppError::missing_iv(format!("Stored IV is not hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| AppError::missing_iv(format!("Stored IV has {} bytes", b.len())))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use cipherbox_core::error::ErrorKind;

    fn codec() -> EncryptionCodec {
        EncryptionCodec::new(&[7u8; KEY_LENGTH]).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let codec = codec();
        for size in [0usize, 1, 11, 4096, 1024 * 1024] {
            let plaintext: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let (ciphertext, iv) = codec.encrypt(&plaintext).unwrap();
            assert_ne!(ciphertext, plaintext);
            assert_eq!(codec.decrypt(&ciphertext, &iv).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_ivs_do_not_repeat() {
        let codec = codec();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let (_, iv) = codec.encrypt(b"same payload").unwrap();
            assert!(seen.insert(iv), "IV repeated");
        }
    }

    #[test]
    fn test_wrong_key_length() {
        let err = EncryptionCodec::new(&[0u8; 16]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::KeyConfiguration);
    }

    #[test]
    fn test_wrong_iv_fails() {
        let codec = codec();
        let (ciphertext, _) = codec.encrypt(b"Hello World").unwrap();
        let (_, other_iv) = codec.encrypt(b"Hello World").unwrap();
        let err = codec.decrypt(&ciphertext, &other_iv).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DecryptFailed);
    }

    #[test]
    fn test_corrupt_and_truncated_ciphertext_fail() {
        let codec = codec();
        let (mut ciphertext, iv) = codec.encrypt(b"Hello World").unwrap();

        let truncated = &ciphertext[..ciphertext.len() - 1];
        assert_eq!(
            codec.decrypt(truncated, &iv).unwrap_err().kind,
            ErrorKind::DecryptFailed
        );

        ciphertext[0] ^= 0x01;
        assert_eq!(
            codec.decrypt(&ciphertext, &iv).unwrap_err().kind,
            ErrorKind::DecryptFailed
        );
    }

    #[test]
    fn test_iv_hex() {
        let iv = [0xabu8; IV_LENGTH];
        let encoded = iv_to_hex(&iv);
        assert_eq!(encoded, "ab".repeat(IV_LENGTH));
        assert_eq!(iv_from_hex(&encoded).unwrap(), iv);

        assert_eq!(iv_from_hex("abcd").unwrap_err().kind, ErrorKind::MissingIv);
        assert_eq!(iv_from_hex("not hex").unwrap_err().kind, ErrorKind::MissingIv);
    }
}
