//! Whole-request deadline.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use cipherbox_core::deadline::with_deadline;

use crate::error::ApiError;

/// Fail a request that runs past `timeout` with a retryable `IoFailure`.
pub async fn request_timeout(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match with_deadline(timeout, "request", async { Ok(next.run(request).await) }).await {
        Ok(response) => response,
        Err(e) => ApiError(e).into_response(),
    }
}
