//! Session lifecycle manager: login, refresh-token rotation, logout.
//!
//! A refresh token moves through `valid` (member of its uid's set) to
//! either `consumed` (rotated) or `revoked` (logout or reuse detection).
//! A third way out is `retired`: evicted by the per-user cap, which ends
//! that device's session and nothing else. Presenting any other token that
//! is no longer a member is treated as theft: the whole set for that uid is
//! cleared in the same store update.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use cipherbox_core::config::SessionConfig;
use cipherbox_core::deadline::with_deadline;
use cipherbox_core::error::AppError;
use cipherbox_core::traits::SessionStore;
use cipherbox_core::types::{RotationOutcome, SessionToken, UserId};

use crate::jwt::{JwtDecoder, JwtEncoder, TokenPair};

use super::audit::AuditLogger;

/// Manages the refresh-token lifecycle against a [`SessionStore`].
#[derive(Clone)]
pub struct SessionManager {
    jwt_encoder: Arc<JwtEncoder>,
    jwt_decoder: Arc<JwtDecoder>,
    session_store: Arc<dyn SessionStore>,
    store_timeout: Duration,
    audit: AuditLogger,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        jwt_encoder: Arc<JwtEncoder>,
        jwt_decoder: Arc<JwtDecoder>,
        session_store: Arc<dyn SessionStore>,
        session_config: &SessionConfig,
    ) -> Self {
        Self {
            jwt_encoder,
            jwt_decoder,
            session_store,
            store_timeout: Duration::from_secs(session_config.store_timeout_seconds),
            audit: AuditLogger::new(),
        }
    }

    /// Issue a pair for an already-authenticated uid and add the refresh
    /// token to its session set.
    pub async fn login(&self, uid: &UserId) -> Result<TokenPair, AppError> {
        let pair = self.jwt_encoder.issue_pair(uid)?;

        with_deadline(
            self.store_timeout,
            "session add_token",
            self.session_store.add_token(uid, session_token(&pair)),
        )
        .await?;

        self.audit.login(uid);
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// 1. Verify signature and expiry with the refresh key
    /// 2. Atomically swap the presented token for the new one
    /// 3. If it was retired, fail with `SessionNotFound` and leave the set
    /// 4. Otherwise the store has already cleared the set: fail with
    ///    `ReuseDetected`
    ///
    /// Not safe to retry blindly: a second attempt with the same token
    /// looks exactly like reuse.
    pub async fn rotate(&self, presented_refresh: &str) -> Result<TokenPair, AppError> {
        let claims = self.jwt_decoder.decode_refresh_token(presented_refresh)?;
        let uid = claims.uid;

        let pair = self.jwt_encoder.issue_pair(&uid)?;
        let outcome = with_deadline(
            self.store_timeout,
            "session rotate_token",
            self.session_store.rotate_token(
                &uid,
                &sha256_hash(presented_refresh),
                session_token(&pair),
            ),
        )
        .await?;

        match outcome {
            RotationOutcome::Rotated => {
                self.audit.token_rotated(&uid);
                debug!(uid = %uid, "Refresh token rotated");
                Ok(pair)
            }
            RotationOutcome::Retired => {
                self.audit.retired_token_presented(&uid);
                Err(AppError::session_not_found(
                    "Session ended because newer sessions replaced it; log in again",
                ))
            }
            RotationOutcome::ReuseDetected => {
                self.audit.reuse_detected(&uid);
                Err(AppError::reuse_detected(
                    "Refresh token is no longer valid; all sessions revoked",
                ))
            }
        }
    }

    /// Verify an access token and clear its uid's session set.
    ///
    /// Returns the uid that was logged out. Outstanding access tokens stay
    /// valid until they expire.
    pub async fn logout(&self, presented_access: &str) -> Result<UserId, AppError> {
        let claims = self.jwt_decoder.decode_access_token(presented_access)?;
        self.clear(&claims.uid).await?;
        self.audit.logout(&claims.uid);
        info!(uid = %claims.uid, "Logout completed");
        Ok(claims.uid)
    }

    /// Revoke every refresh token for `uid`.
    pub async fn revoke_all(&self, uid: &UserId, reason: &str) -> Result<(), AppError> {
        self.clear(uid).await?;
        self.audit.sessions_revoked(uid, reason);
        Ok(())
    }

    /// Whether `refresh_token` is currently a live member of `uid`'s set.
    pub async fn is_active(&self, uid: &UserId, refresh_token: &str) -> Result<bool, AppError> {
        with_deadline(
            self.store_timeout,
            "session contains",
            self.session_store.contains(uid, &sha256_hash(refresh_token)),
        )
        .await
    }

    async fn clear(&self, uid: &UserId) -> Result<(), AppError> {
        with_deadline(
            self.store_timeout,
            "session clear",
            self.session_store.clear(uid),
        )
        .await
    }
}

/// Computes a SHA-256 hash of the input string, returned as lowercase hex.
pub fn sha256_hash(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

fn session_token(pair: &TokenPair) -> SessionToken {
    SessionToken {
        token_hash: sha256_hash(&pair.refresh_token),
        issued_at: pair.refresh_issued_at,
        expires_at: pair.refresh_expires_at,
    }
}

#[cfg(test)]
mod tests {
    use cipherbox_core::config::AuthConfig;
    use cipherbox_core::error::ErrorKind;
    use cipherbox_database::MemorySessionStore;

    use super::*;

    fn manager_with(store: Arc<dyn SessionStore>) -> SessionManager {
        let config = AuthConfig {
            access_token_secret: "test-access".to_string(),
            refresh_token_secret: "test-refresh".to_string(),
            ..AuthConfig::default()
        };
        SessionManager::new(
            Arc::new(JwtEncoder::new(&config)),
            Arc::new(JwtDecoder::new(&config)),
            store,
            &SessionConfig::default(),
        )
    }

    fn manager() -> (SessionManager, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new(10));
        (manager_with(store.clone()), store)
    }

    #[tokio::test]
    async fn test_login_adds_refresh_token() {
        let (manager, store) = manager();
        let uid = UserId::new("u1");
        let pair = manager.login(&uid).await.unwrap();

        assert!(manager.is_active(&uid, &pair.refresh_token).await.unwrap());
        assert_eq!(store.tokens(&uid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rotation_then_replay_revokes_everything() {
        let (manager, store) = manager();
        let uid = UserId::new("u1");

        let r1 = manager.login(&uid).await.unwrap().refresh_token;
        let r2 = manager.rotate(&r1).await.unwrap().refresh_token;
        assert_ne!(r1, r2);

        let err = manager.rotate(&r1).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReuseDetected);
        assert!(store.tokens(&uid).await.unwrap().is_empty());

        let err = manager.rotate(&r2).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReuseDetected);
    }

    #[tokio::test]
    async fn test_logout_then_rotate_fails() {
        let (manager, _) = manager();
        let uid = UserId::new("u1");
        let pair = manager.login(&uid).await.unwrap();

        assert_eq!(manager.logout(&pair.access_token).await.unwrap(), uid);
        let err = manager.rotate(&pair.refresh_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReuseDetected);
    }

    #[tokio::test]
    async fn test_rotate_rejects_access_token() {
        let (manager, store) = manager();
        let uid = UserId::new("u1");
        let pair = manager.login(&uid).await.unwrap();

        let err = manager.rotate(&pair.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSignature);
        // A forged or wrong-class token is not a theft signal.
        assert_eq!(store.tokens(&uid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_logout_requires_access_token() {
        let (manager, _) = manager();
        let pair = manager.login(&UserId::new("u1")).await.unwrap();
        let err = manager.logout(&pair.refresh_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSignature);
    }

    #[tokio::test]
    async fn test_other_sessions_survive_rotation() {
        let (manager, _) = manager();
        let uid = UserId::new("u1");
        let laptop = manager.login(&uid).await.unwrap();
        let phone = manager.login(&uid).await.unwrap();

        let laptop2 = manager.rotate(&laptop.refresh_token).await.unwrap();
        assert!(manager.is_active(&uid, &phone.refresh_token).await.unwrap());
        assert!(manager.is_active(&uid, &laptop2.refresh_token).await.unwrap());
        assert!(!manager.is_active(&uid, &laptop.refresh_token).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotation_single_winner() {
        let (manager, _) = manager();
        let uid = UserId::new("u1");
        let pair = manager.login(&uid).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let manager = manager.clone();
            let token = pair.refresh_token.clone();
            handles.push(tokio::spawn(async move { manager.rotate(&token).await }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert_eq!(e.kind, ErrorKind::ReuseDetected),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_evicted_session_ends_without_revoking_others() {
        let store = Arc::new(MemorySessionStore::new(2));
        let manager = manager_with(store.clone());
        let uid = UserId::new("u1");

        let first = manager.login(&uid).await.unwrap();
        let laptop = manager.login(&uid).await.unwrap();
        let phone = manager.login(&uid).await.unwrap();

        let err = manager.rotate(&first.refresh_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionNotFound);
        assert!(manager.is_active(&uid, &laptop.refresh_token).await.unwrap());
        assert!(manager.is_active(&uid, &phone.refresh_token).await.unwrap());

        manager.rotate(&phone.refresh_token).await.unwrap();
        assert_eq!(store.tokens(&uid).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_revoke_all() {
        let (manager, store) = manager();
        let uid = UserId::new("u1");
        manager.login(&uid).await.unwrap();
        manager.login(&uid).await.unwrap();
        manager.revoke_all(&uid, "password changed").await.unwrap();
        assert!(store.tokens(&uid).await.unwrap().is_empty());
    }
}
