//! JWT claims for the two token classes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cipherbox_core::types::UserId;

/// Distinguishes access tokens from refresh tokens.
///
/// The classes are already signed with different keys; the claim is a
/// second guard so a token can never be accepted as the other class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token for ordinary requests.
    Access,
    /// Long-lived, single-use token for rotation.
    Refresh,
}

/// Payload of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Identity the token was issued to.
    pub uid: UserId,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Always [`TokenType::Access`].
    pub typ: TokenType,
}

impl AccessClaims {
    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Payload of a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Identity the token was issued to.
    pub uid: UserId,
    /// Random 128-bit hex salt. Two tokens issued for the same uid in the
    /// same second still differ.
    pub salt: String,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch), absent when refresh tokens do not expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Always [`TokenType::Refresh`].
    pub typ: TokenType,
}
