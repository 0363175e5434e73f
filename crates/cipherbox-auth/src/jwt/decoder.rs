//! JWT token verification per key class.

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::de::DeserializeOwned;

use cipherbox_core::config::AuthConfig;
use cipherbox_core::error::AppError;

use super::claims::{AccessClaims, RefreshClaims, TokenType};

/// Verifies access and refresh tokens against their own keys.
#[derive(Clone)]
pub struct JwtDecoder {
    access_key: DecodingKey,
    refresh_key: DecodingKey,
    access_validation: Validation,
    refresh_validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("access_validation", &self.access_validation)
            .field("refresh_validation", &self.refresh_validation)
            .finish_non_exhaustive()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut access_validation = Validation::new(Algorithm::HS256);
        access_validation.validate_exp = true;
        access_validation.leeway = config.leeway_seconds;

        // Refresh tokens may be issued without `exp`; when present it is
        // still enforced.
        let mut refresh_validation = Validation::new(Algorithm::HS256);
        refresh_validation.validate_exp = true;
        refresh_validation.leeway = config.leeway_seconds;
        refresh_validation.required_spec_claims.remove("exp");

        Self {
            access_key: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_key: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_validation,
            refresh_validation,
        }
    }

    /// Verify an access token's signature, expiry and class.
    pub fn decode_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        let claims: AccessClaims = decode_with(token, &self.access_key, &self.access_validation)?;
        if claims.typ != TokenType::Access {
            return Err(AppError::invalid_signature(
                "Invalid token type: expected access token",
            ));
        }
        Ok(claims)
    }

    /// Verify a refresh token's signature, expiry and class.
    pub fn decode_refresh_token(&self, token: &str) -> Result<RefreshClaims, AppError> {
        let claims: RefreshClaims =
            decode_with(token, &self.refresh_key, &self.refresh_validation)?;
        if claims.typ != TokenType::Refresh {
            return Err(AppError::invalid_signature(
                "Invalid token type: expected refresh token",
            ));
        }
        Ok(claims)
    }
}

fn decode_with<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<T, AppError> {
    decode::<T>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            JwtErrorKind::ExpiredSignature => AppError::token_expired("Token has expired"),
            JwtErrorKind::InvalidSignature => AppError::invalid_signature("Invalid token signature"),
            _ => AppError::invalid_signature(format!("Token validation failed: {e}")),
        })
}
