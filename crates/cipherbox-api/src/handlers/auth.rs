//! Auth handlers: login, refresh, logout, signup and the field checks.

use axum::Json;
use axum::extract::State;

use crate::dto::request::{
    EmailCheckRequest, LoginRequest, PasswordCheckRequest, SignupRequest, validated,
};
use crate::dto::response::{SignupResponse, TokenResponse};
use crate::error::ApiError;
use crate::extractors::BearerToken;
use crate::state::AppState;

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let req = validated(req)?;
    let pair = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(pair.into()))
}

/// GET /auth/refresh
///
/// The bearer token here is the refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    BearerToken(refresh_token): BearerToken,
) -> Result<Json<TokenResponse>, ApiError> {
    let pair = state.accounts.sessions().rotate(&refresh_token).await?;
    Ok(Json(pair.into()))
}

/// GET /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(access_token): BearerToken,
) -> Result<&'static str, ApiError> {
    state.accounts.sessions().logout(&access_token).await?;
    Ok("Logout successful")
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, ApiError> {
    let request: cipherbox_service::SignupRequest = validated(req)?.into();
    let outcome = state.accounts.signup(&request).await?;
    Ok(Json(SignupResponse {
        success: true,
        message: outcome.message,
        user_id: outcome.uid.into_inner(),
    }))
}

/// POST /auth/post_email
pub async fn post_email(
    State(state): State<AppState>,
    Json(req): Json<EmailCheckRequest>,
) -> Result<&'static str, ApiError> {
    let check = state.accounts.check_email(req.email.trim()).await?;
    Ok(check.message())
}

/// POST /auth/post_password
pub async fn post_password(
    State(state): State<AppState>,
    Json(req): Json<PasswordCheckRequest>,
) -> String {
    state.accounts.check_password(&req.password)
}
