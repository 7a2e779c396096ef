//! Member repository.
//!
//! Handles account creation, credential checks, profile updates and listing.

use super::{DbError, now_ts, unique_violation_as_exists};
use crate::sanction::state::Capabilities;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Columns selected whenever a full [`Member`] is loaded.
pub(super) const MEMBER_COLUMNS: &str = "id, username, email, is_active, is_staff, date_joined, \
     site, avatar_url, biography, sign, show_email, show_sign, hover_or_click, email_for_answer, \
     can_read, can_write, end_ban_read, end_ban_write";

/// A registered member.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: i64,
    pub profile: Profile,
    pub capabilities: Capabilities,
}

/// Free-form profile attributes. Opaque to the sanction engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub site: String,
    pub avatar_url: String,
    pub biography: String,
    pub sign: String,
    pub show_email: bool,
    pub show_sign: bool,
    pub hover_or_click: bool,
    pub email_for_answer: bool,
}

/// Fields needed to create a member.
#[derive(Debug, Clone, Copy)]
pub struct NewMember<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub is_active: bool,
    pub is_staff: bool,
}

/// Partial profile update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub site: Option<String>,
    pub avatar_url: Option<String>,
    pub biography: Option<String>,
    pub sign: Option<String>,
    pub show_email: Option<bool>,
    pub show_sign: Option<bool>,
    pub hover_or_click: Option<bool>,
    pub email_for_answer: Option<bool>,
}

pub(super) fn member_from_row(row: &SqliteRow) -> Result<Member, sqlx::Error> {
    Ok(Member {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        is_active: row.try_get("is_active")?,
        is_staff: row.try_get("is_staff")?,
        date_joined: row.try_get("date_joined")?,
        profile: Profile {
            site: row.try_get("site")?,
            avatar_url: row.try_get("avatar_url")?,
            biography: row.try_get("biography")?,
            sign: row.try_get("sign")?,
            show_email: row.try_get("show_email")?,
            show_sign: row.try_get("show_sign")?,
            hover_or_click: row.try_get("hover_or_click")?,
            email_for_answer: row.try_get("email_for_answer")?,
        },
        capabilities: Capabilities {
            can_read: row.try_get("can_read")?,
            can_write: row.try_get("can_write")?,
            end_ban_read: row.try_get("end_ban_read")?,
            end_ban_write: row.try_get("end_ban_write")?,
        },
    })
}

/// Escape LIKE wildcards and wrap the term for a substring match.
fn like_pattern(search: Option<&str>) -> String {
    match search {
        Some(term) if !term.is_empty() => {
            let mut escaped = String::with_capacity(term.len() + 2);
            escaped.push('%');
            for c in term.chars() {
                if matches!(c, '\\' | '%' | '_') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('%');
            escaped
        }
        _ => "%".to_string(),
    }
}

/// Repository for member operations.
pub struct MemberRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MemberRepository<'a> {
    /// Create a new member repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a member directly, without a confirmation token.
    pub async fn create(&self, new: NewMember<'_>) -> Result<Member, DbError> {
        let password_hash = hash_password(new.password)?;
        let result = sqlx::query(
            r#"
            INSERT INTO members (username, email, password_hash, is_active, is_staff, date_joined)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.username)
        .bind(new.email)
        .bind(&password_hash)
        .bind(new.is_active)
        .bind(new.is_staff)
        .bind(now_ts())
        .execute(self.pool)
        .await
        .map_err(|e| unique_violation_as_exists(e, new.username))?;

        self.require(result.last_insert_rowid()).await
    }

    /// Create an inactive member together with its email confirmation token.
    ///
    /// Both rows are written in one transaction.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        token: &str,
        token_expires_at: i64,
    ) -> Result<Member, DbError> {
        let password_hash = hash_password(password)?;
        let now = now_ts();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO members (username, email, password_hash, is_active, is_staff, date_joined)
            VALUES (?, ?, ?, 0, 0, ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation_as_exists(e, username))?;

        let member_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO registration_tokens (token, member_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(token)
        .bind(member_id)
        .bind(now)
        .bind(token_expires_at)
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

    /// Find member by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Member>, DbError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.as_ref().map(member_from_row).transpose()?)
    }

    /// Find member by id, failing with [`DbError::MemberNotFound`].
    pub async fn require(&self, id: i64) -> Result<Member, DbError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::MemberNotFound(id.to_string()))
    }

    /// Find member by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Member>, DbError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE username = ?");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.as_ref().map(member_from_row).transpose()?)
    }

    /// Whether another member already uses `username`.
    pub async fn username_taken(&self, username: &str, exclude: Option<i64>) -> Result<bool, DbError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM members WHERE username = ? AND id != ?)",
        )
        .bind(username)
        .bind(exclude.unwrap_or(0))
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Whether another member already uses `email`.
    pub async fn email_taken(&self, email: &str, exclude: Option<i64>) -> Result<bool, DbError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM members WHERE email = ? AND id != ?)",
        )
        .bind(email)
        .bind(exclude.unwrap_or(0))
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Count members whose username contains `search`.
    pub async fn count(&self, search: Option<&str>) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"SELECT COUNT(*) FROM members WHERE username LIKE ? ESCAPE '\'",
        )
        .bind(like_pattern(search))
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// List members whose username contains `search`, newest first.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Member>, DbError> {
        let sql = format!(
            r"SELECT {MEMBER_COLUMNS} FROM members
            WHERE username LIKE ? ESCAPE '\'
            ORDER BY date_joined DESC, id DESC
            LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(like_pattern(search))
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.iter().map(member_from_row).collect::<Result<_, _>>()?)
    }

    /// Apply a partial profile update in a single statement.
    pub async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<Member, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE members SET
                username = COALESCE(?, username),
                email = COALESCE(?, email),
                site = COALESCE(?, site),
                avatar_url = COALESCE(?, avatar_url),
                biography = COALESCE(?, biography),
                sign = COALESCE(?, sign),
                show_email = COALESCE(?, show_email),
                show_sign = COALESCE(?, show_sign),
                hover_or_click = COALESCE(?, hover_or_click),
                email_for_answer = COALESCE(?, email_for_answer)
            WHERE id = ?
            "#,
        )
        .bind(update.username.as_deref())
        .bind(update.email.as_deref())
        .bind(update.site.as_deref())
        .bind(update.avatar_url.as_deref())
        .bind(update.biography.as_deref())
        .bind(update.sign.as_deref())
        .bind(update.show_email)
        .bind(update.show_sign)
        .bind(update.hover_or_click)
        .bind(update.email_for_answer)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            unique_violation_as_exists(e, update.username.as_deref().unwrap_or_default())
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::MemberNotFound(id.to_string()));
        }

        self.require(id).await
    }

    /// Grant or revoke staff privilege, activating the account.
    pub async fn set_staff(&self, id: i64, is_staff: bool) -> Result<(), DbError> {
        sqlx::query("UPDATE members SET is_staff = ?, is_active = 1 WHERE id = ?")
            .bind(is_staff)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Verify a username/password pair and return the member.
    ///
    /// An unknown username still costs one Argon2 verification so response
    /// time does not reveal which accounts exist.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Member, DbError> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, password_hash FROM members WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let Some((id, password_hash)) = row else {
            dummy_password_verify(password);
            return Err(DbError::MemberNotFound(username.to_string()));
        };

        verify_password(password, &password_hash)?;
        self.require(id).await
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| DbError::InvalidPassword)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), DbError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| DbError::InvalidPassword)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| DbError::InvalidPassword)
}

/// Burn one Argon2 verification against a hash nothing can match.
fn dummy_password_verify(password: &str) {
    const DUMMY_HASH: &str =
        "$argon2id$v=19$m=19456,t=2,p=1$c2FuY3Rpb25kLWR1bW15$Gq3rXW8pXpYJ1mS5l4bJ5v1b0l1c9n3S6cJvZ8m2Q0A";

    if let Ok(parsed) = PasswordHash::new(DUMMY_HASH) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
    }
}
