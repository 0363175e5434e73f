//! Refresh-token session lifecycle: login, rotation, logout.

pub mod audit;
pub mod manager;

pub use audit::AuditLogger;
pub use manager::{SessionManager, sha256_hash};
