//! Member accounts: registration, activation, profile updates, password
//! grant and staff provisioning.
//!
//! Validation collects every field error before anything is written, so a
//! rejected request never leaves a partial account behind.

pub mod token;
pub mod validation;

use crate::config::{AuthConfig, MembersConfig, StaffBlock};
use crate::db::{Database, DbError, Member, NewMember, ProfileUpdate, now_ts};
use crate::error::{ApiError, ApiResult, FieldErrors, REQUIRED};
use crate::notify::{Notification, Notifier, TemplateKind, deliver_or_log};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use validation::{check_email, check_username};

const USERNAME_TAKEN: &str = "A member with that username already exists.";
const EMAIL_TAKEN: &str = "A member with that email address already exists.";
const USERNAME_RESERVED: &str = "This username is reserved.";

/// Registration request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Profile update request body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
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

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}

/// Account service shared by the API handlers.
#[derive(Clone)]
pub struct Accounts {
    db: Database,
    members: MembersConfig,
    auth: AuthConfig,
    notifier: Arc<dyn Notifier>,
}

impl Accounts {
    pub fn new(
        db: Database,
        members: MembersConfig,
        auth: AuthConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            members,
            auth,
            notifier,
        }
    }

    // ========== Registration ==========

    /// Create an inactive member and send its confirmation token.
    pub async fn register(&self, form: Registration) -> ApiResult<Member> {
        let mut errors = FieldErrors::new();

        let username = form.username.as_deref();
        match username {
            None => errors.add("username", REQUIRED),
            Some(u) => self.check_username_free(&mut errors, u, None).await?,
        }

        let email = form.email.as_deref();
        match email {
            None => errors.add("email", REQUIRED),
            Some(e) => self.check_email_free(&mut errors, e, None).await?,
        }

        match form.password.as_deref() {
            None => errors.add("password", REQUIRED),
            Some("") => errors.add("password", crate::error::BLANK),
            Some(_) => {}
        }

        errors.into_result()?;
        let username = username.unwrap_or_default();
        let email = email.unwrap_or_default();
        let password = form.password.as_deref().unwrap_or_default();

        let token = token::generate();
        let ttl_secs = self.members.registration_token_ttl_hours.saturating_mul(3600);
        let expires_at = now_ts().saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX));

        let member = self
            .db
            .members()
            .register(username, email, password, &token, expires_at)
            .await
            .map_err(|e| match e {
                // Lost a race against a concurrent registration.
                DbError::MemberExists(_) => {
                    ApiError::Validation(FieldErrors::single("username", USERNAME_TAKEN))
                }
                other => ApiError::from(other),
            })?;

        crate::metrics::record_registration();
        info!(member = member.id, username = %member.username, "Member registered");

        deliver_or_log(
            self.notifier.as_ref(),
            Notification {
                recipient: member.email.clone(),
                kind: TemplateKind::Confirmation,
                context: serde_json::json!({
                    "username": member.username,
                    "token": token,
                    "expires_at": DateTime::<Utc>::from_timestamp(expires_at, 0).map(|dt| dt.to_rfc3339()),
                }),
            },
        )
        .await;

        Ok(member)
    }

    /// Consume a confirmation token and activate its member.
    pub async fn activate(&self, token: Option<&str>) -> ApiResult<Member> {
        let token = match token {
            None => return Err(ApiError::Validation(FieldErrors::single("token", REQUIRED))),
            Some("") => {
                return Err(ApiError::Validation(FieldErrors::single("token", crate::error::BLANK)));
            }
            Some(t) => t,
        };

        let member = self
            .db
            .tokens()
            .activate(token, now_ts())
            .await
            .map_err(|e| match e {
                DbError::TokenExpired => {
                    ApiError::Validation(FieldErrors::single("token", "This token has expired."))
                }
                other => ApiError::from(other),
            })?;

        info!(member = member.id, username = %member.username, "Member activated");
        Ok(member)
    }

    // ========== Profile ==========

    /// Load the profile `actor` wants to edit.
    ///
    /// Only the owner may update a profile, and only while able to write.
    pub async fn editable_profile(&self, actor: &Member, target_id: i64) -> ApiResult<Member> {
        let target = self
            .db
            .members()
            .find_by_id(target_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        if target.id != actor.id {
            return Err(ApiError::Forbidden);
        }
        if !actor.capabilities.effective_at(now_ts()).may_write() {
            return Err(ApiError::Forbidden);
        }
        Ok(target)
    }

    /// Apply a partial profile update to a profile from [`Self::editable_profile`].
    pub async fn update_profile(&self, target: &Member, changes: ProfileChanges) -> ApiResult<Member> {
        let mut errors = FieldErrors::new();
        if let Some(username) = changes.username.as_deref() {
            self.check_username_free(&mut errors, username, Some(target.id)).await?;
        }
        if let Some(email) = changes.email.as_deref() {
            self.check_email_free(&mut errors, email, Some(target.id)).await?;
        }
        errors.into_result()?;

        let update = ProfileUpdate {
            username: changes.username,
            email: changes.email,
            site: changes.site,
            avatar_url: changes.avatar_url,
            biography: changes.biography,
            sign: changes.sign,
            show_email: changes.show_email,
            show_sign: changes.show_sign,
            hover_or_click: changes.hover_or_click,
            email_for_answer: changes.email_for_answer,
        };
        let updated = self
            .db
            .members()
            .update_profile(target.id, &update)
            .await
            .map_err(|e| match e {
                DbError::MemberExists(_) => {
                    ApiError::Validation(FieldErrors::single("username", USERNAME_TAKEN))
                }
                other => ApiError::from(other),
            })?;

        debug!(member = updated.id, "Profile updated");
        Ok(updated)
    }

    // ========== Authentication ==========

    /// Resource owner password grant: check credentials and standing.
    pub async fn authenticate(&self, username: &str, password: &str) -> ApiResult<Member> {
        let member = match self.db.members().verify_credentials(username, password).await {
            Ok(member) => member,
            Err(DbError::MemberNotFound(_) | DbError::InvalidPassword) => {
                return Err(ApiError::InvalidGrant);
            }
            Err(e) => return Err(e.into()),
        };

        if !member.is_active || !member.capabilities.effective_at(now_ts()).may_read() {
            debug!(member = member.id, "Password grant refused for inactive or banned member");
            return Err(ApiError::InvalidGrant);
        }
        Ok(member)
    }

    /// Issue a bearer token for `member`. Only its digest is stored.
    pub async fn issue_token(&self, member: &Member) -> ApiResult<IssuedToken> {
        let access_token = token::generate();
        let now = now_ts();
        let ttl = self.auth.token_ttl_secs;
        let expires_at = now.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX));

        self.db
            .tokens()
            .insert_access_token(&token::digest(&access_token), member.id, now, expires_at)
            .await?;

        info!(member = member.id, username = %member.username, "Access token issued");
        Ok(IssuedToken {
            access_token,
            expires_in: ttl,
        })
    }

    /// Resolve a bearer token to its member, if the token is known and live.
    pub async fn resolve_bearer(&self, bearer: &str) -> ApiResult<Option<Member>> {
        Ok(self
            .db
            .tokens()
            .member_for_access_token(&token::digest(bearer), now_ts())
            .await?)
    }

    // ========== Staff provisioning ==========

    /// Ensure every configured staff account exists and holds staff privilege.
    pub async fn provision_staff(&self, blocks: &[StaffBlock]) -> Result<(), DbError> {
        for block in blocks {
            match self.db.members().find_by_username(&block.username).await? {
                Some(existing) => {
                    self.db.members().set_staff(existing.id, true).await?;
                    info!(username = %existing.username, "Staff account promoted");
                }
                None => {
                    let created = self
                        .db
                        .members()
                        .create(NewMember {
                            username: &block.username,
                            email: &block.email,
                            password: &block.password,
                            is_active: true,
                            is_staff: true,
                        })
                        .await?;
                    info!(username = %created.username, "Staff account created");
                }
            }
        }
        Ok(())
    }

    /// Create the system account when `members.bot_email` is configured.
    ///
    /// The account gets a random password nobody knows, so it can never log
    /// in. An existing row is left untouched.
    pub async fn provision_bot_account(&self) -> Result<Option<Member>, DbError> {
        let Some(email) = self.members.bot_email.as_deref() else {
            return Ok(None);
        };
        let username = &self.members.bot_account;
        if let Some(existing) = self.db.members().find_by_username(username).await? {
            return Ok(Some(existing));
        }

        let password = token::generate();
        let created = self
            .db
            .members()
            .create(NewMember {
                username,
                email,
                password: &password,
                is_active: true,
                is_staff: false,
            })
            .await?;
        info!(username = %created.username, "System account created");
        Ok(Some(created))
    }

    // ========== Helpers ==========

    async fn check_username_free(
        &self,
        errors: &mut FieldErrors,
        username: &str,
        exclude: Option<i64>,
    ) -> Result<(), DbError> {
        if let Err(message) = check_username(username, self.members.username_max_length) {
            errors.add("username", message);
        } else if self.members.is_bot_account(username) {
            errors.add("username", USERNAME_RESERVED);
        } else if self.db.members().username_taken(username, exclude).await? {
            errors.add("username", USERNAME_TAKEN);
        }
        Ok(())
    }

    async fn check_email_free(
        &self,
        errors: &mut FieldErrors,
        email: &str,
        exclude: Option<i64>,
    ) -> Result<(), DbError> {
        if let Err(message) = check_email(email, &self.members) {
            errors.add("email", message);
        } else if self.db.members().email_taken(email, exclude).await? {
            errors.add("email", EMAIL_TAKEN);
        }
        Ok(())
    }
}
