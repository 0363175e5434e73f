//! Persistence of per-user refresh-token sets.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{RotationOutcome, SessionToken, UserId};

/// Backing store for each user's set of live refresh tokens.
///
/// Every mutating call is one atomic update against the backing store.
/// Implementations apply a [`RetentionPolicy`](crate::types::RetentionPolicy)
/// inside the same update and remember the tokens it evicts.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Add a token to `uid`'s set, creating the set if absent.
    async fn add_token(&self, uid: &UserId, token: SessionToken) -> AppResult<()>;

    /// Replace `presented_hash` with `replacement` if it is a live member.
    ///
    /// A hash that retention evicted yields [`RotationOutcome::Retired`] and
    /// changes nothing. Any other non-member clears the whole set and yields
    /// [`RotationOutcome::ReuseDetected`]. All branches happen in one atomic
    /// step so two concurrent rotations of the same token cannot both
    /// succeed.
    async fn rotate_token(
        &self,
        uid: &UserId,
        presented_hash: &str,
        replacement: SessionToken,
    ) -> AppResult<RotationOutcome>;

    /// Empty `uid`'s set, retired tokens included. Clearing an absent set is
    /// not an error.
    async fn clear(&self, uid: &UserId) -> AppResult<()>;

    /// Whether `token_hash` is currently in `uid`'s set.
    async fn contains(&self, uid: &UserId, token_hash: &str) -> AppResult<bool>;

    /// Snapshot of `uid`'s set, oldest first.
    async fn tokens(&self, uid: &UserId) -> AppResult<Vec<SessionToken>>;
}
