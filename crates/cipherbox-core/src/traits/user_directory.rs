//! Users collection.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{UserId, UserProfile};

/// Stores the profile written at signup.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Insert a profile. Fails with `Conflict` if the uid already has one.
    async fn insert_profile(&self, profile: &UserProfile) -> AppResult<()>;

    /// Look up a profile by uid.
    async fn find_profile(&self, uid: &UserId) -> AppResult<Option<UserProfile>>;
}
