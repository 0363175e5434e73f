//! Identity provider configuration.

use serde::{Deserialize, Serialize};

/// Which identity provider verifies credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityProviderKind {
    /// In-process accounts. Development and tests only.
    #[default]
    Memory,
    /// Firebase Authentication (Identity Toolkit REST API).
    Firebase,
}

/// External identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Provider selection.
    #[serde(default)]
    pub provider: IdentityProviderKind,
    /// Web API key for the Identity Toolkit.
    #[serde(default)]
    pub api_key: String,
    /// Identity Toolkit base endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider: IdentityProviderKind::default(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_timeout() -> u64 {
    10
}
