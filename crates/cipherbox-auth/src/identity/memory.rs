//! In-process identity provider for tests and local development.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;
use uuid::Uuid;

use cipherbox_core::error::AppError;
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::IdentityProvider;
use cipherbox_core::types::{NewIdentity, UserId, VerifiedIdentity};

use crate::password::PasswordHasher;

#[derive(Debug, Clone)]
struct Account {
    uid: UserId,
    email: String,
    password_hash: String,
    email_verified: bool,
    verification_sent: bool,
}

/// Accounts keyed by lowercased email, with Argon2id password hashes.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityProvider {
    accounts: Arc<DashMap<String, Account>>,
    hasher: PasswordHasher,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an account's email as verified, as clicking the link would.
    pub fn mark_verified(&self, email: &str) -> AppResult<()> {
        let mut account = self
            .accounts
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| AppError::not_found(format!("No account for {email}")))?;
        account.email_verified = true;
        Ok(())
    }

    /// Whether a verification email was requested for `email`.
    pub fn verification_sent(&self, email: &str) -> bool {
        self.accounts
            .get(&email.to_lowercase())
            .is_some_and(|a| a.verification_sent)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<VerifiedIdentity> {
        let account = self
            .accounts
            .get(&email.to_lowercase())
            .map(|a| a.value().clone())
            .ok_or_else(|| AppError::invalid_credentials("Incorrect email or password"))?;

        if !self.hasher.verify_password(password, &account.password_hash)? {
            return Err(AppError::invalid_credentials("Incorrect email or password"));
        }

        Ok(VerifiedIdentity {
            uid: account.uid,
            email: account.email,
            email_verified: account.email_verified,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> AppResult<NewIdentity> {
        let password_hash = self.hasher.hash_password(password)?;
        let uid = UserId::new(Uuid::new_v4().simple().to_string());

        match self.accounts.entry(email.to_lowercase()) {
            Entry::Occupied(_) => Err(AppError::conflict("Email already in use")),
            Entry::Vacant(slot) => {
                slot.insert(Account {
                    uid: uid.clone(),
                    email: email.to_string(),
                    password_hash,
                    email_verified: false,
                    verification_sent: false,
                });
                Ok(NewIdentity {
                    uid,
                    email: email.to_string(),
                    id_token: Uuid::new_v4().to_string(),
                })
            }
        }
    }

    async fn send_verification(&self, identity: &NewIdentity) -> AppResult<()> {
        let mut account = self
            .accounts
            .get_mut(&identity.email.to_lowercase())
            .ok_or_else(|| AppError::not_found(format!("No account for {}", identity.email)))?;
        account.verification_sent = true;
        info!(uid = %identity.uid, "Verification email queued");
        Ok(())
    }

    async fn email_in_use(&self, email: &str) -> AppResult<bool> {
        Ok(self.accounts.contains_key(&email.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use cipherbox_core::error::ErrorKind;

    use super::*;

    #[tokio::test]
    async fn test_sign_up_and_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let created = provider
            .sign_up("Ada@Example.com", "analytical1")
            .await
            .unwrap();
        assert!(provider.email_in_use("ada@example.com").await.unwrap());

        let identity = provider
            .sign_in("ada@example.com", "analytical1")
            .await
            .unwrap();
        assert_eq!(identity.uid, created.uid);
        assert!(!identity.email_verified);

        provider.mark_verified("ada@example.com").unwrap();
        let identity = provider
            .sign_in("ada@example.com", "analytical1")
            .await
            .unwrap();
        assert!(identity.email_verified);
    }

    #[tokio::test]
    async fn test_wrong_password_and_duplicate_email() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up("ada@example.com", "analytical1").await.unwrap();

        let err = provider
            .sign_in("ada@example.com", "difference2")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);
        let err = provider
            .sign_in("nobody@example.com", "analytical1")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);

        let err = provider
            .sign_up("ada@example.com", "another-one1")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }
}
