//! External identity provider.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{NewIdentity, VerifiedIdentity};

/// Owns credentials and email verification. Passwords never reach our
/// own storage.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Check an email/password pair.
    ///
    /// Unknown email or wrong password fails with `InvalidCredentials`.
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<VerifiedIdentity>;

    /// Create a new identity. Fails with `Conflict` if the email is taken.
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<NewIdentity>;

    /// Ask the provider to send its verification email.
    async fn send_verification(&self, identity: &NewIdentity) -> AppResult<()>;

    /// Whether an identity already exists for `email`.
    async fn email_in_use(&self, email: &str) -> AppResult<bool>;
}
