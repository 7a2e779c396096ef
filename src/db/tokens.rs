//! Registration and access token repository.

use super::members::{MEMBER_COLUMNS, member_from_row};
use super::{DbError, Member};
use sqlx::SqlitePool;

/// Repository for token operations.
pub struct TokenRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TokenRepository<'a> {
    /// Create a new token repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    // ========== Registration tokens ==========

    /// Consume a registration token and activate its member.
    ///
    /// An expired token is deleted and reported as [`DbError::TokenExpired`].
    pub async fn activate(&self, token: &str, now: i64) -> Result<Member, DbError> {
        let mut tx = self.pool.begin().await?;

        // Delete first so two concurrent confirmations cannot both succeed.
        let row = sqlx::query_as::<_, (i64, i64)>(
            "DELETE FROM registration_tokens WHERE token = ? RETURNING member_id, expires_at",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((member_id, expires_at)) = row else {
            return Err(DbError::TokenNotFound);
        };

        if now >= expires_at {
            tx.commit().await?;
            return Err(DbError::TokenExpired);
        }

        sqlx::query("UPDATE members SET is_active = 1 WHERE id = ?")
            .bind(member_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(member_id)
            .fetch_one(&mut *tx)
            .await?;
        let member = member_from_row(&row)?;

        tx.commit().await?;
        Ok(member)
    }

    /// Number of pending registration tokens for a member.
    pub async fn registration_token_count(&self, member_id: i64) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM registration_tokens WHERE member_id = ?",
        )
        .bind(member_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    // ========== Access tokens ==========

    /// Store the digest of a freshly issued bearer token.
    pub async fn insert_access_token(
        &self,
        token_hash: &str,
        member_id: i64,
        now: i64,
        expires_at: i64,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens (token_hash, member_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(token_hash)
        .bind(member_id)
        .bind(now)
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Resolve a bearer token digest to its member, if still valid.
    pub async fn member_for_access_token(
        &self,
        token_hash: &str,
        now: i64,
    ) -> Result<Option<Member>, DbError> {
        let sql = format!(
            "SELECT {} FROM members WHERE id = \
             (SELECT member_id FROM access_tokens WHERE token_hash = ? AND expires_at > ?)",
            MEMBER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.as_ref().map(member_from_row).transpose()?)
    }

    // ========== Maintenance ==========

    /// Delete expired registration and access tokens.
    ///
    /// Returns `(registration, access)` counts.
    pub async fn prune_expired(&self, now: i64) -> Result<(u64, u64), DbError> {
        let registration = sqlx::query("DELETE FROM registration_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool)
            .await?
            .rows_affected();
        let access = sqlx::query("DELETE FROM access_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool)
            .await?
            .rows_affected();
        Ok((registration, access))
    }
}
