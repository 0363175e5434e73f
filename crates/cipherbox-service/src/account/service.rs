//! Signup, login and the pre-signup field checks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use cipherbox_auth::SessionManager;
use cipherbox_auth::jwt::TokenPair;
use cipherbox_auth::validation::{INVALID_EMAIL, validate_email, validate_password};
use cipherbox_core::deadline::with_deadline;
use cipherbox_core::error::AppError;
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::{IdentityProvider, UserDirectory};
use cipherbox_core::types::{UserId, UserProfile};

/// Outcome of the standalone email check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailCheck {
    Invalid,
    InUse,
    Available,
}

impl EmailCheck {
    pub fn message(self) -> &'static str {
        match self {
            Self::Invalid => INVALID_EMAIL,
            Self::InUse => "Email is already in use",
            Self::Available => "Email is available",
        }
    }
}

/// Everything a signup needs, in one request.
#[derive(Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOutcome {
    pub uid: UserId,
    pub message: String,
}

/// Orchestrates the identity provider, user directory and session manager.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserDirectory>,
    sessions: SessionManager,
    store_timeout: Duration,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserDirectory>,
        sessions: SessionManager,
        store_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            users,
            sessions,
            store_timeout,
        }
    }

    /// The session manager, for refresh and logout.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Check an address without recording anything.
    pub async fn check_email(&self, email: &str) -> AppResult<EmailCheck> {
        if validate_email(email).is_err() {
            return Ok(EmailCheck::Invalid);
        }
        if self.identity.email_in_use(email).await? {
            Ok(EmailCheck::InUse)
        } else {
            Ok(EmailCheck::Available)
        }
    }

    /// Check a password without recording anything. Returns the message to
    /// show the user.
    pub fn check_password(&self, password: &str) -> String {
        match validate_password(password) {
            Ok(_) => "Password received".to_string(),
            Err(e) => e.message,
        }
    }

    /// Validate, create the identity, request verification, and store the
    /// profile.
    ///
    /// Validation happens here on the submitted values; earlier calls to the
    /// check endpoints carry no weight.
    pub async fn signup(&self, request: &SignupRequest) -> AppResult<SignupOutcome> {
        let email = validate_email(request.email.trim())?;
        let password = validate_password(&request.password)?;

        let created = self
            .identity
            .sign_up(email.as_str(), password.expose())
            .await?;

        if let Err(e) = self.identity.send_verification(&created).await {
            warn!(uid = %created.uid, error = %e, "Could not send verification email");
        }

        let profile = UserProfile {
            uid: created.uid.clone(),
            email: email.as_str().to_string(),
            name: request.name.trim().to_string(),
            created_at: Utc::now(),
        };
        with_deadline(
            self.store_timeout,
            "users insert_profile",
            self.users.insert_profile(&profile),
        )
        .await?;

        info!(uid = %created.uid, "Account created");
        Ok(SignupOutcome {
            uid: created.uid,
            message: "Verification email sent.".to_string(),
        })
    }

    /// Sign in with the identity provider and open a session.
    ///
    /// Unverified addresses are refused before any token is issued.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::validation("Email and password are required"));
        }

        let identity = self.identity.sign_in(email.trim(), password).await?;
        if !identity.email_verified {
            return Err(AppError::email_not_verified(
                "Please verify your email before logging in",
            ));
        }

        self.sessions.login(&identity.uid).await
    }

    /// Stored profile for `uid`, if any.
    pub async fn profile(&self, uid: &UserId) -> AppResult<Option<UserProfile>> {
        with_deadline(
            self.store_timeout,
            "users find_profile",
            self.users.find_profile(uid),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use cipherbox_auth::{JwtDecoder, JwtEncoder, MemoryIdentityProvider};
    use cipherbox_core::config::{AuthConfig, SessionConfig};
    use cipherbox_core::error::ErrorKind;
    use cipherbox_database::{MemorySessionStore, MemoryUserDirectory};

    use super::*;

    fn service() -> (AccountService, MemoryIdentityProvider) {
        let identity = MemoryIdentityProvider::new();
        let auth = AuthConfig::default();
        let sessions = SessionManager::new(
            Arc::new(JwtEncoder::new(&auth)),
            Arc::new(JwtDecoder::new(&auth)),
            Arc::new(MemorySessionStore::new(10)),
            &SessionConfig::default(),
        );
        let service = AccountService::new(
            Arc::new(identity.clone()),
            Arc::new(MemoryUserDirectory::new()),
            sessions,
            Duration::from_secs(5),
        );
        (service, identity)
    }

    fn request(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: "Ada".to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login_requires_verification() {
        let (service, identity) = service();
        let outcome = service
            .signup(&request("ada@example.com", "analytical1"))
            .await
            .unwrap();
        assert_eq!(outcome.message, "Verification email sent.");
        assert!(identity.verification_sent("ada@example.com"));

        let profile = service.profile(&outcome.uid).await.unwrap().unwrap();
        assert_eq!(profile.name, "Ada");

        let err = service
            .login("ada@example.com", "analytical1")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmailNotVerified);

        identity.mark_verified("ada@example.com").unwrap();
        let pair = service.login("ada@example.com", "analytical1").await.unwrap();
        assert!(
            service
                .sessions()
                .is_active(&outcome.uid, &pair.refresh_token)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_signup_validates_in_request() {
        let (service, _) = service();
        let err = service
            .signup(&request("not-an-email", "analytical1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = service
            .signup(&request("ada@example.com", "short"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        service
            .signup(&request("ada@example.com", "analytical1"))
            .await
            .unwrap();
        let err = service
            .signup(&request("ada@example.com", "analytical1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_field_checks() {
        let (service, _) = service();
        assert_eq!(service.check_email("bad").await.unwrap(), EmailCheck::Invalid);
        assert_eq!(
            service.check_email("ada@example.com").await.unwrap(),
            EmailCheck::Available
        );
        service
            .signup(&request("ada@example.com", "analytical1"))
            .await
            .unwrap();
        assert_eq!(
            service.check_email("ada@example.com").await.unwrap(),
            EmailCheck::InUse
        );

        assert_eq!(
            service.check_password("short"),
            "Password must be at least 10 characters long"
        );
        assert_eq!(
            service.check_password("1234567890"),
            "Password must contain at least one letter"
        );
        assert_eq!(service.check_password("analytical1"), "Password received");
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let (service, _) = service();
        let err = service
            .login("nobody@example.com", "analytical1")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);
    }
}
