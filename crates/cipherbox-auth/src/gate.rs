//! Stateless access-token check for protected operations.

use std::sync::Arc;

use cipherbox_core::error::AppError;
use cipherbox_core::types::UserId;

use crate::jwt::JwtDecoder;

/// Resolves a presented access token to a uid.
///
/// Never consults the session store: an access token stays valid until it
/// expires, even after logout.
#[derive(Debug, Clone)]
pub struct AuthGate {
    decoder: Arc<JwtDecoder>,
}

impl AuthGate {
    pub fn new(decoder: Arc<JwtDecoder>) -> Self {
        Self { decoder }
    }

    /// `None` or an empty token fails with `MissingToken`; a bad signature
    /// or expiry fails with `InvalidSignature`/`TokenExpired`.
    pub fn authorize(&self, presented_access: Option<&str>) -> Result<UserId, AppError> {
        let token = presented_access
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::missing_token("No token provided"))?;
        let claims = self.decoder.decode_access_token(token)?;
        Ok(claims.uid)
    }
}
