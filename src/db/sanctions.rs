//! Repository for member sanctions and the sanction audit log.

use super::members::{MEMBER_COLUMNS, member_from_row};
use super::{DbError, Member};
use crate::sanction::state::{Axis, SanctionKind};
use sqlx::SqlitePool;

/// One row of the sanction audit log.
#[derive(Debug, Clone)]
pub struct SanctionRecord {
    pub id: i64,
    pub member_id: i64,
    /// `None` for automatic expiries.
    pub moderator_id: Option<i64>,
    pub kind: String,
    pub justification: Option<String>,
    pub duration_days: Option<i64>,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

/// A sanction to write, already validated by the engine.
#[derive(Debug, Clone, Copy)]
pub struct SanctionWrite<'a> {
    pub target_id: i64,
    /// Username that must never be sanctioned.
    pub protected_username: &'a str,
    pub moderator_id: i64,
    pub kind: SanctionKind,
    pub justification: Option<&'a str>,
    pub duration_days: Option<i64>,
    pub expires_at: Option<i64>,
    pub now: i64,
}

/// Members restored by one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiredCounts {
    /// Members whose temporary ban ran out.
    pub read: Vec<i64>,
    /// Members whose temporary read-only restriction ran out.
    pub write: Vec<i64>,
}

impl ExpiredCounts {
    pub fn total(&self) -> usize {
        self.read.len() + self.write.len()
    }
}

/// Repository for sanction operations.
pub struct SanctionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SanctionRepository<'a> {
    /// Create a new sanction repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply or lift a sanction and append it to the audit log.
    ///
    /// The capability update is the first statement of the transaction, so
    /// the write lock is held until the audit row and the re-read are done.
    pub async fn apply(&self, write: SanctionWrite<'_>) -> Result<Member, DbError> {
        let axis = write.kind.axis();
        let (flag, expiry) = write.kind.target_state(write.expires_at);

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE members SET {} = ?, {} = ? WHERE id = ? AND username <> ?",
            axis.flag_column(),
            axis.expiry_column()
        );
        let result = sqlx::query(&sql)
            .bind(flag)
            .bind(expiry)
            .bind(write.target_id)
            .bind(write.protected_username)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM members WHERE id = ?)",
            )
            .bind(write.target_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.rollback().await?;
            return Err(if exists {
                DbError::ProtectedAccount(write.protected_username.to_string())
            } else {
                DbError::MemberNotFound(write.target_id.to_string())
            });
        }

        sqlx::query(
            r#"
            INSERT INTO sanctions (member_id, moderator_id, kind, justification, duration_days, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(write.target_id)
        .bind(write.moderator_id)
        .bind(write.kind.as_str())
        .bind(write.justification)
        .bind(write.duration_days)
        .bind(write.now)
        .bind(expiry)
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(write.target_id)
            .fetch_one(&mut *tx)
            .await?;
        let member = member_from_row(&row)?;

        tx.commit().await?;
        Ok(member)
    }

    /// Restore every temporary restriction whose expiry is at or before `now`.
    ///
    /// Each axis is reset by a single conditional `UPDATE`, so running this
    /// twice, or alongside a manual apply/lift, never resets a sanction that
    /// is not due.
    pub async fn expire_due(&self, now: i64) -> Result<ExpiredCounts, DbError> {
        let mut counts = ExpiredCounts::default();
        let mut tx = self.pool.begin().await?;

        for axis in [Axis::Read, Axis::Write] {
            let sql = format!(
                "UPDATE members SET {flag} = 1, {expiry} = NULL \
                 WHERE {flag} = 0 AND {expiry} IS NOT NULL AND {expiry} <= ? \
                 RETURNING id",
                flag = axis.flag_column(),
                expiry = axis.expiry_column()
            );
            let ids: Vec<i64> = sqlx::query_scalar(&sql)
                .bind(now)
                .fetch_all(&mut *tx)
                .await?;

            for id in &ids {
                sqlx::query(
                    "INSERT INTO sanctions (member_id, moderator_id, kind, created_at) VALUES (?, NULL, ?, ?)",
                )
                .bind(id)
                .bind(axis.expired_kind())
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            match axis {
                Axis::Read => counts.read = ids,
                Axis::Write => counts.write = ids,
            }
        }

        tx.commit().await?;
        Ok(counts)
    }

    /// Audit log for a member, newest first.
    pub async fn history(&self, member_id: i64) -> Result<Vec<SanctionRecord>, DbError> {
        let rows = sqlx::query_as::<
            _,
            (i64, i64, Option<i64>, String, Option<String>, Option<i64>, i64, Option<i64>),
        >(
            r#"
            SELECT id, member_id, moderator_id, kind, justification, duration_days, created_at, expires_at
            FROM sanctions
            WHERE member_id = ?
            ORDER BY id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, member_id, moderator_id, kind, justification, duration_days, created_at, expires_at)| {
                    SanctionRecord {
                        id,
                        member_id,
                        moderator_id,
                        kind,
                        justification,
                        duration_days,
                        created_at,
                        expires_at,
                    }
                },
            )
            .collect())
    }
}
