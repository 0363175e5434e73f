//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use cipherbox_auth::AuthGate;
use cipherbox_core::config::AppConfig;
use cipherbox_service::{AccountService, BlobManager};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks; none of them holds
/// per-request mutable state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Access-token check for protected routes
    pub gate: Arc<AuthGate>,
    /// Signup, login, refresh and logout
    pub accounts: Arc<AccountService>,
    /// Encrypted per-user files
    pub blobs: Arc<BlobManager>,
}
