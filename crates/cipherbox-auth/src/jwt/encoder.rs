//! JWT token creation with per-class signing keys and TTLs.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use cipherbox_core::config::AuthConfig;
use cipherbox_core::error::AppError;
use cipherbox_core::types::UserId;

use super::claims::{AccessClaims, RefreshClaims, TokenType};

/// Creates signed access and refresh tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    access_key: EncodingKey,
    refresh_key: EncodingKey,
    access_ttl: Duration,
    refresh_ttl: Option<Duration>,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// A freshly signed token with its validity window.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// An access + refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Single-use refresh token.
    pub refresh_token: String,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// When the refresh token was issued.
    pub refresh_issued_at: DateTime<Utc>,
    /// Refresh token expiry, if any.
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_key: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_ttl_minutes as i64),
            refresh_ttl: config.refresh_ttl_hours.map(|h| Duration::hours(h as i64)),
        }
    }

    /// Sign `{uid, exp = now + access TTL}` with the access key.
    pub fn issue_access_token(&self, uid: &UserId) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let exp = now + self.access_ttl;
        let claims = AccessClaims {
            uid: uid.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            typ: TokenType::Access,
        };

        let token = encode(&Header::default(), &claims, &self.access_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: Some(exp),
        })
    }

    /// Sign `{uid, salt, exp?}` with the refresh key.
    pub fn issue_refresh_token(&self, uid: &UserId) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let exp = self.refresh_ttl.map(|ttl| now + ttl);

        let salt: [u8; 16] = rand::random();

        let claims = RefreshClaims {
            uid: uid.clone(),
            salt: hex::encode(salt),
            iat: now.timestamp(),
            exp: exp.map(|e| e.timestamp()),
            typ: TokenType::Refresh,
        };

        let token = encode(&Header::default(), &claims, &self.refresh_key)
            .map_err(|e| AppError::internal(format!("Failed to encode refresh token: {e}")))?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    /// Issue a fresh access + refresh pair for `uid`.
    pub fn issue_pair(&self, uid: &UserId) -> Result<TokenPair, AppError> {
        let access = self.issue_access_token(uid)?;
        let refresh = self.issue_refresh_token(uid)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.expires_at.unwrap_or(access.issued_at),
            refresh_issued_at: refresh.issued_at,
            refresh_expires_at: refresh.expires_at,
        })
    }
}
