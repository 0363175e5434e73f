//! Unified application error types for CipherBox.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The [`ErrorKind`] variants follow
//! the service's failure taxonomy (auth, session, crypto, storage,
//! validation) so the HTTP layer can map them without string matching.

use std::fmt;
use thiserror::Error;

/// Fine-grained error kind used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No bearer token was presented.
    MissingToken,
    /// The token signature, format, or key class is wrong.
    InvalidSignature,
    /// The token is past its expiry.
    TokenExpired,
    /// A refresh token that is no longer part of its session set was presented.
    ReuseDetected,
    /// No session record exists for the identity.
    SessionNotFound,
    /// Ciphertext could not be authenticated or decrypted.
    DecryptFailed,
    /// Stored object metadata has no usable IV.
    MissingIv,
    /// The encryption key is misconfigured.
    KeyConfiguration,
    /// The requested object does not exist.
    NotFound,
    /// A backing-store call failed or timed out. Retryable.
    IoFailure,
    /// Input validation failed.
    Validation,
    /// The identity provider rejected the credentials.
    InvalidCredentials,
    /// The account exists but its email address is not verified yet.
    EmailNotVerified,
    /// A conflicting resource already exists.
    Conflict,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
}

/// Coarse grouping of [`ErrorKind`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Token presentation and verification failures.
    Auth,
    /// Refresh-token session failures.
    Session,
    /// Encryption and decryption failures.
    Crypto,
    /// Blob and document store failures.
    Storage,
    /// Bad caller input.
    Validation,
    /// Account lifecycle failures (credentials, verification, duplicates).
    Account,
    /// Everything else.
    Internal,
}

impl ErrorKind {
    /// Return the category this kind belongs to.
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::MissingToken | Self::InvalidSignature | Self::TokenExpired => ErrorCategory::Auth,
            Self::ReuseDetected | Self::SessionNotFound => ErrorCategory::Session,
            Self::DecryptFailed | Self::MissingIv | Self::KeyConfiguration => ErrorCategory::Crypto,
            Self::NotFound | Self::IoFailure => ErrorCategory::Storage,
            Self::Validation => ErrorCategory::Validation,
            Self::InvalidCredentials | Self::EmailNotVerified | Self::Conflict => {
                ErrorCategory::Account
            }
            Self::Configuration | Self::Serialization | Self::Internal => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "MISSING_TOKEN"),
            Self::InvalidSignature => write!(f, "INVALID_TOKEN"),
            Self::TokenExpired => write!(f, "TOKEN_EXPIRED"),
            Self::ReuseDetected => write!(f, "TOKEN_REUSE_DETECTED"),
            Self::SessionNotFound => write!(f, "SESSION_NOT_FOUND"),
            Self::DecryptFailed => write!(f, "DECRYPT_FAILED"),
            Self::MissingIv => write!(f, "MISSING_IV"),
            Self::KeyConfiguration => write!(f, "KEY_CONFIGURATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::IoFailure => write!(f, "IO_FAILURE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::InvalidCredentials => write!(f, "INVALID_CREDENTIALS"),
            Self::EmailNotVerified => write!(f, "EMAIL_NOT_VERIFIED"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout CipherBox.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The kind of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a missing-token error.
    pub fn missing_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingToken, message)
    }

    /// Create an invalid-signature error.
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSignature, message)
    }

    /// Create a token-expired error.
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    /// Create a reuse-detected error.
    pub fn reuse_detected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReuseDetected, message)
    }

    /// Create a session-not-found error.
    pub fn session_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionNotFound, message)
    }

    /// Create a decryption error.
    pub fn decrypt_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecryptFailed, message)
    }

    /// Create a missing-IV error.
    pub fn missing_iv(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingIv, message)
    }

    /// Create a key-configuration error.
    pub fn key_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::KeyConfiguration, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a retryable I/O failure.
    pub fn io_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoFailure, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an invalid-credentials error.
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredentials, message)
    }

    /// Create an email-not-verified error.
    pub fn email_not_verified(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmailNotVerified, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the failed call may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::IoFailure
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::IoFailure
        };
        Self::with_source(kind, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
