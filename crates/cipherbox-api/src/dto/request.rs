//! Request DTOs with validation.

use serde::Deserialize;
use validator::Validate;

use cipherbox_core::error::AppError;

/// Login request body.
#[derive(Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Signup request body. Email and password rules are enforced by the
/// account service on these exact values.
#[derive(Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "Name is too long"))]
    pub name: String,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl From<SignupRequest> for cipherbox_service::SignupRequest {
    fn from(req: SignupRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            name: req.name,
        }
    }
}

/// `POST /auth/post_email` body.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailCheckRequest {
    #[serde(default)]
    pub email: String,
}

/// `POST /auth/post_password` body.
#[derive(Clone, Deserialize)]
pub struct PasswordCheckRequest {
    #[serde(default)]
    pub password: String,
}

/// Rename request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[validate(length(min = 1, message = "newFileName is required"))]
    pub new_file_name: String,
}

/// Run `validator` checks and map failures to a `Validation` error.
pub fn validated<T: Validate>(body: T) -> Result<T, AppError> {
    body.validate().map_err(|e| {
        let message = e
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .filter_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .next()
            .unwrap_or_else(|| "Invalid request".to_string());
        AppError::validation(message)
    })?;
    Ok(body)
}
