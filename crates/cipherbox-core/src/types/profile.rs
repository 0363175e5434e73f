//! Account records and identity-provider results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// A row in the users collection, written at signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity-provider uid.
    pub uid: UserId,
    /// Email address used to sign up.
    pub email: String,
    /// Display name.
    pub name: String,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

/// Identity confirmed by the provider after a password sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: UserId,
    pub email: String,
    pub email_verified: bool,
}

/// A freshly created identity.
///
/// `id_token` is the provider's own short-lived credential, needed only to
/// request the verification email.
#[derive(Clone)]
pub struct NewIdentity {
    pub uid: UserId,
    pub email: String,
    pub id_token: String,
}

impl std::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
