//! Security events, emitted on the `audit` tracing target.

use tracing::{info, warn};

use cipherbox_core::types::UserId;

#[derive(Debug, Clone, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn login(&self, uid: &UserId) {
        info!(target: "audit", event = "login", uid = %uid);
    }

    pub fn token_rotated(&self, uid: &UserId) {
        info!(target: "audit", event = "token_rotated", uid = %uid);
    }

    pub fn reuse_detected(&self, uid: &UserId) {
        warn!(target: "audit", event = "refresh_reuse_detected", uid = %uid, action = "revoke_all");
    }

    pub fn retired_token_presented(&self, uid: &UserId) {
        info!(target: "audit", event = "retired_token_presented", uid = %uid);
    }

    pub fn logout(&self, uid: &UserId) {
        info!(target: "audit", event = "logout", uid = %uid);
    }

    pub fn sessions_revoked(&self, uid: &UserId, reason: &str) {
        warn!(target: "audit", event = "sessions_revoked", uid = %uid, reason);
    }
}
