//! Users collection in PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use cipherbox_core::result::AppResult;
use cipherbox_core::traits::UserDirectory;
use cipherbox_core::types::{UserId, UserProfile};

use crate::db_error;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    uid: String,
    email: String,
    name: String,
    created_at: DateTime<Utc>,
}

/// User directory backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new user directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn insert_profile(&self, profile: &UserProfile) -> AppResult<()> {
        sqlx::query("INSERT INTO users (uid, email, name, created_at) VALUES ($1, $2, $3, $4)")
            .bind(profile.uid.as_str())
            .bind(&profile.email)
            .bind(&profile.name)
            .bind(profile.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, "Failed to insert user profile"))?;
        Ok(())
    }

    async fn find_profile(&self, uid: &UserId) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT uid, email, name, created_at FROM users WHERE uid = $1",
        )
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Failed to find user profile"))?;

        Ok(row.map(|r| UserProfile {
            uid: UserId::new(r.uid),
            email: r.email,
            name: r.name,
            created_at: r.created_at,
        }))
    }
}
