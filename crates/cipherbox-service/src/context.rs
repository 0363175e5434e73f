//! Request context carrying the authenticated uid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cipherbox_core::types::UserId;

/// Context for the current authenticated request.
///
/// Built by the API layer once the access token has been checked and
/// passed into service methods so that every operation knows *who* is
/// acting. It lives for exactly one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated uid.
    pub uid: UserId,
    /// Correlation id for logs.
    pub request_id: Uuid,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(uid: UserId) -> Self {
        Self {
            uid,
            request_id: Uuid::now_v7(),
            request_time: Utc::now(),
        }
    }
}
