//! Refresh-token session configuration.

use serde::{Deserialize, Serialize};

/// Session record retention and store-call configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of live refresh tokens per user. Logging in beyond
    /// this retires the oldest token; presenting it afterwards ends only that
    /// session.
    #[serde(default = "default_max_tokens")]
    pub max_tokens_per_user: usize,
    /// Deadline for a single session-store call, in seconds.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_user: default_max_tokens(),
            store_timeout_seconds: default_store_timeout(),
        }
    }
}

fn default_max_tokens() -> usize {
    10
}

fn default_store_timeout() -> u64 {
    5
}
