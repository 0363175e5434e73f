//! Route definitions for the CipherBox HTTP API.

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Headroom on top of the upload limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_size_bytes as usize + MULTIPART_OVERHEAD_BYTES;
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .merge(auth_routes())
        .merge(file_routes())
        .route("/health", get(handlers::health::health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(axum_middleware::from_fn_with_state(
            timeout,
            middleware::timeout::request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Login, token rotation, logout, signup and the signup field checks.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", get(handlers::auth::refresh))
        .route("/auth/logout", get(handlers::auth::logout))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/post_email", post(handlers::auth::post_email))
        .route("/auth/post_password", post(handlers::auth::post_password))
}

/// Encrypted file operations. All require an access token.
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files/upload", post(handlers::file::upload))
        .route("/files/download/{name}", get(handlers::file::download))
        .route("/files/files", get(handlers::file::list))
        .route("/files/rename/{name}", patch(handlers::file::rename))
        .route("/files/{name}", delete(handlers::file::delete))
}
