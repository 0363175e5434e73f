//! Deadline helper for calls into external collaborators.
//!
//! Every call that leaves the process (blob store, document store, identity
//! provider) is wrapped so that it cannot block indefinitely. An elapsed
//! deadline surfaces as a retryable [`ErrorKind::IoFailure`].

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, ErrorKind};
use crate::result::AppResult;

/// Run `fut` with a deadline, mapping an elapsed timer to `IoFailure`.
pub async fn with_deadline<T, F>(timeout: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(elapsed) => Err(AppError::with_source(
            ErrorKind::IoFailure,
            format!("{operation} timed out after {}ms", timeout.as_millis()),
            elapsed,
        )),
    }
}
