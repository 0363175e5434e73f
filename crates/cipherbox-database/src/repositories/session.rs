//! Refresh-token session sets in PostgreSQL.
//!
//! One row per token in `session_tokens`; rows evicted by retention carry a
//! `retired_at` stamp. Membership changes run in a single transaction.
//! Rotation hinges on a conditional `DELETE` of the live row whose
//! affected-row count decides between rotating and the retired/reuse check.
//! Row locks make two concurrent rotations of the same token serialize: the
//! second `DELETE` sees the row already gone and takes the reuse branch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use cipherbox_core::result::AppResult;
use cipherbox_core::traits::SessionStore;
use cipherbox_core::types::{RetentionPolicy, RotationOutcome, SessionToken, UserId};

use crate::db_error;

#[derive(Debug, sqlx::FromRow)]
struct SessionTokenRow {
    token_hash: String,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl From<SessionTokenRow> for SessionToken {
    fn from(row: SessionTokenRow) -> Self {
        Self {
            token_hash: row.token_hash,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
        }
    }
}

/// Session store backed by the `session_tokens` table.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    retention: RetentionPolicy,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, retention: RetentionPolicy) -> Self {
        Self { pool, retention }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error(e, "Failed to begin session transaction"))
    }

    async fn insert(
        tx: &mut Transaction<'static, Postgres>,
        uid: &UserId,
        token: &SessionToken,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO session_tokens (uid, token_hash, issued_at, expires_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (uid, token_hash) DO NOTHING",
        )
        .bind(uid.as_str())
        .bind(&token.token_hash)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error(e, "Failed to insert session token"))?;
        Ok(())
    }

    /// Drop dead tokens, retire live ones past the cap, then trim the
    /// retired rows.
    async fn enforce_retention(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        uid: &UserId,
    ) -> AppResult<()> {
        let grace_secs = self.retention.expiry_grace().num_seconds() as f64;
        sqlx::query(
            "DELETE FROM session_tokens WHERE uid = $1 AND expires_at IS NOT NULL \
             AND expires_at + make_interval(secs => $2) <= NOW()",
        )
        .bind(uid.as_str())
        .bind(grace_secs)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error(e, "Failed to prune expired session tokens"))?;

        let retired = sqlx::query(
            "UPDATE session_tokens SET retired_at = NOW() \
             WHERE uid = $1 AND retired_at IS NULL AND token_hash IN ( \
                SELECT token_hash FROM session_tokens WHERE uid = $1 AND retired_at IS NULL \
                ORDER BY issued_at DESC, token_hash DESC OFFSET $2)",
        )
        .bind(uid.as_str())
        .bind(self.retention.max_tokens() as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error(e, "Failed to retire old session tokens"))?
        .rows_affected();

        sqlx::query(
            "DELETE FROM session_tokens WHERE uid = $1 AND retired_at IS NOT NULL AND token_hash IN ( \
                SELECT token_hash FROM session_tokens WHERE uid = $1 AND retired_at IS NOT NULL \
                ORDER BY retired_at DESC, issued_at DESC, token_hash DESC OFFSET $2)",
        )
        .bind(uid.as_str())
        .bind(self.retention.max_retired() as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error(e, "Failed to trim retired session tokens"))?;

        if retired > 0 {
            debug!(uid = %uid, retired, "Retired oldest session tokens");
        }
        Ok(())
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit()
            .await
            .map_err(|e| db_error(e, "Failed to commit session transaction"))
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn add_token(&self, uid: &UserId, token: SessionToken) -> AppResult<()> {
        let mut tx = self.begin().await?;
        Self::insert(&mut tx, uid, &token).await?;
        self.enforce_retention(&mut tx, uid).await?;
        Self::commit(tx).await
    }

    async fn rotate_token(
        &self,
        uid: &UserId,
        presented_hash: &str,
        replacement: SessionToken,
    ) -> AppResult<RotationOutcome> {
        let mut tx = self.begin().await?;

        let consumed = sqlx::query(
            "DELETE FROM session_tokens WHERE uid = $1 AND token_hash = $2 AND retired_at IS NULL",
        )
        .bind(uid.as_str())
        .bind(presented_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(e, "Failed to consume session token"))?
        .rows_affected();

        if consumed == 0 {
            self.enforce_retention(&mut tx, uid).await?;
            let retired = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM session_tokens \
                 WHERE uid = $1 AND token_hash = $2 AND retired_at IS NOT NULL)",
            )
            .bind(uid.as_str())
            .bind(presented_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error(e, "Failed to look up retired session token"))?;

            if retired {
                Self::commit(tx).await?;
                return Ok(RotationOutcome::Retired);
            }

            sqlx::query("DELETE FROM session_tokens WHERE uid = $1")
                .bind(uid.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error(e, "Failed to revoke session tokens"))?;
            Self::commit(tx).await?;
            return Ok(RotationOutcome::ReuseDetected);
        }

        Self::insert(&mut tx, uid, &replacement).await?;
        self.enforce_retention(&mut tx, uid).await?;
        Self::commit(tx).await?;
        Ok(RotationOutcome::Rotated)
    }

    async fn clear(&self, uid: &UserId) -> AppResult<()> {
        sqlx::query("DELETE FROM session_tokens WHERE uid = $1")
            .bind(uid.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, "Failed to clear session tokens"))?;
        Ok(())
    }

    async fn contains(&self, uid: &UserId, token_hash: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM session_tokens \
             WHERE uid = $1 AND token_hash = $2 AND retired_at IS NULL)",
        )
        .bind(uid.as_str())
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, "Failed to look up session token"))
    }

    async fn tokens(&self, uid: &UserId) -> AppResult<Vec<SessionToken>> {
        let rows = sqlx::query_as::<_, SessionTokenRow>(
            "SELECT token_hash, issued_at, expires_at FROM session_tokens \
             WHERE uid = $1 AND retired_at IS NULL ORDER BY issued_at ASC, token_hash ASC",
        )
        .bind(uid.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Failed to list session tokens"))?;
        Ok(rows.into_iter().map(SessionToken::from).collect())
    }
}
