//! In-memory session sets.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use cipherbox_core::result::AppResult;
use cipherbox_core::traits::SessionStore;
use cipherbox_core::types::{RetentionPolicy, RotationOutcome, SessionSet, SessionToken, UserId};

/// Session store keeping each uid's set in a `DashMap` entry.
///
/// Every mutation runs while holding the entry's shard lock, which gives
/// the same all-or-nothing membership update the database transaction does.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    sets: Arc<DashMap<UserId, SessionSet>>,
    retention: RetentionPolicy,
}

impl MemorySessionStore {
    /// Create a store that keeps at most `max_tokens_per_user` tokens per uid.
    pub fn new(max_tokens_per_user: usize) -> Self {
        Self::with_retention(RetentionPolicy::new(max_tokens_per_user))
    }

    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            sets: Arc::new(DashMap::new()),
            retention,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn add_token(&self, uid: &UserId, token: SessionToken) -> AppResult<()> {
        let mut set = self.sets.entry(uid.clone()).or_default();
        if !set.is_live(&token.token_hash) {
            set.live.push(token);
        }
        self.retention.apply(&mut set, Utc::now());
        Ok(())
    }

    async fn rotate_token(
        &self,
        uid: &UserId,
        presented_hash: &str,
        replacement: SessionToken,
    ) -> AppResult<RotationOutcome> {
        let mut set = self.sets.entry(uid.clone()).or_default();
        let now = Utc::now();
        match set.live.iter().position(|t| t.token_hash == presented_hash) {
            Some(pos) => {
                set.live.remove(pos);
                set.live.push(replacement);
                self.retention.apply(&mut set, now);
                Ok(RotationOutcome::Rotated)
            }
            None => {
                self.retention.apply(&mut set, now);
                if set.is_retired(presented_hash) {
                    Ok(RotationOutcome::Retired)
                } else {
                    set.clear();
                    Ok(RotationOutcome::ReuseDetected)
                }
            }
        }
    }

    async fn clear(&self, uid: &UserId) -> AppResult<()> {
        if let Some(mut set) = self.sets.get_mut(uid) {
            set.clear();
        }
        Ok(())
    }

    async fn contains(&self, uid: &UserId, token_hash: &str) -> AppResult<bool> {
        Ok(self
            .sets
            .get(uid)
            .is_some_and(|set| set.is_live(token_hash)))
    }

    async fn tokens(&self, uid: &UserId) -> AppResult<Vec<SessionToken>> {
        let mut tokens = self
            .sets
            .get(uid)
            .map(|set| set.live.clone())
            .unwrap_or_default();
        tokens.sort_by_key(|t| t.issued_at);
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn token(hash: &str, age_secs: i64) -> SessionToken {
        SessionToken {
            token_hash: hash.to_string(),
            issued_at: Utc::now() - Duration::seconds(age_secs),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_rotate_member_replaces_it() {
        let store = MemorySessionStore::new(10);
        let uid = UserId::new("u1");
        store.add_token(&uid, token("r1", 10)).await.unwrap();
        store.add_token(&uid, token("other", 5)).await.unwrap();

        let outcome = store.rotate_token(&uid, "r1", token("r2", 0)).await.unwrap();
        assert_eq!(outcome, RotationOutcome::Rotated);
        assert!(!store.contains(&uid, "r1").await.unwrap());
        assert!(store.contains(&uid, "r2").await.unwrap());
        assert!(store.contains(&uid, "other").await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_non_member_clears_set() {
        let store = MemorySessionStore::new(10);
        let uid = UserId::new("u1");
        store.add_token(&uid, token("r1", 10)).await.unwrap();
        store.add_token(&uid, token("r2", 5)).await.unwrap();

        let outcome = store
            .rotate_token(&uid, "stolen", token("r3", 0))
            .await
            .unwrap();
        assert_eq!(outcome, RotationOutcome::ReuseDetected);
        assert!(store.tokens(&uid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sets_are_isolated_per_uid() {
        let store = MemorySessionStore::new(10);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        store.add_token(&alice, token("a1", 0)).await.unwrap();
        store.add_token(&bob, token("b1", 0)).await.unwrap();

        assert!(!store.contains(&alice, "b1").await.unwrap());
        store.clear(&alice).await.unwrap();
        assert!(store.contains(&bob, "b1").await.unwrap());
    }

    #[tokio::test]
    async fn test_retention_evicts_oldest_on_login() {
        let store = MemorySessionStore::new(3);
        let uid = UserId::new("u1");
        for (i, hash) in ["t1", "t2", "t3", "t4"].iter().enumerate() {
            store.add_token(&uid, token(hash, 100 - i as i64)).await.unwrap();
        }
        let hashes: Vec<_> = store
            .tokens(&uid)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.token_hash)
            .collect();
        assert_eq!(hashes, vec!["t2", "t3", "t4"]);
    }

    #[tokio::test]
    async fn test_evicted_token_is_retired_not_reused() {
        let store = MemorySessionStore::new(2);
        let uid = UserId::new("u1");
        store.add_token(&uid, token("first", 30)).await.unwrap();
        store.add_token(&uid, token("laptop", 20)).await.unwrap();
        store.add_token(&uid, token("phone", 10)).await.unwrap();

        let outcome = store
            .rotate_token(&uid, "first", token("first-2", 0))
            .await
            .unwrap();
        assert_eq!(outcome, RotationOutcome::Retired);
        assert!(store.contains(&uid, "laptop").await.unwrap());
        assert!(store.contains(&uid, "phone").await.unwrap());
        assert!(!store.contains(&uid, "first-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_token_within_expiry_grace_still_rotates() {
        let store = MemorySessionStore::with_retention(RetentionPolicy::new(10).with_expiry_grace(60));
        let uid = UserId::new("u1");
        let issued_at = Utc::now() - Duration::seconds(100);
        store
            .add_token(
                &uid,
                SessionToken {
                    token_hash: "r1".to_string(),
                    issued_at,
                    expires_at: Some(issued_at + Duration::seconds(95)),
                },
            )
            .await
            .unwrap();
        // Another mutation runs retention before the refresh arrives.
        store.add_token(&uid, token("other", 0)).await.unwrap();

        let outcome = store.rotate_token(&uid, "r1", token("r2", 0)).await.unwrap();
        assert_eq!(outcome, RotationOutcome::Rotated);
    }

    #[tokio::test]
    async fn test_clear_forgets_retired_tokens() {
        let store = MemorySessionStore::new(1);
        let uid = UserId::new("u1");
        store.add_token(&uid, token("old", 10)).await.unwrap();
        store.add_token(&uid, token("new", 0)).await.unwrap();
        store.clear(&uid).await.unwrap();

        let outcome = store.rotate_token(&uid, "old", token("x", 0)).await.unwrap();
        assert_eq!(outcome, RotationOutcome::ReuseDetected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotation_has_one_winner() {
        let store = MemorySessionStore::new(10);
        let uid = UserId::new("u1");
        store.add_token(&uid, token("r1", 1)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let uid = uid.clone();
            handles.push(tokio::spawn(async move {
                store
                    .rotate_token(&uid, "r1", token(&format!("next-{i}"), 0))
                    .await
                    .unwrap()
            }));
        }

        let mut rotated = 0;
        for handle in handles {
            if handle.await.unwrap() == RotationOutcome::Rotated {
                rotated += 1;
            }
        }
        assert_eq!(rotated, 1);
    }
}
