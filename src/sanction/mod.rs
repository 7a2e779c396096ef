//! Sanction engine.
//!
//! Applies and lifts read-only restrictions and bans on members, records
//! every change in the audit log and notifies the target once the change
//! has committed. Who may call it is decided here as well: the actor must be
//! staff in good standing, the target must not be the actor and must not be
//! the protected bot account.

pub mod expiry;
pub mod state;

use crate::config::MembersConfig;
use crate::db::{Database, DbError, Member, SanctionRecord, SanctionWrite};
use crate::notify::{Notification, Notifier, TemplateKind, deliver_or_log};
use crate::telemetry::spans;
use chrono::{DateTime, TimeDelta, Utc};
use state::SanctionKind;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, info};

/// Errors returned by the sanction engine.
#[derive(Debug, Error)]
pub enum SanctionError {
    #[error("actor is not staff")]
    NotStaff,
    #[error("actor is restricted and cannot moderate")]
    Restricted,
    #[error("moderators cannot sanction their own account")]
    OwnAccount,
    #[error("member {0} not found")]
    NotFound(i64),
    #[error("member {0} cannot be sanctioned")]
    Protected(String),
    #[error("invalid duration: {0}")]
    InvalidDuration(&'static str),
    #[error(transparent)]
    Db(DbError),
}

impl From<DbError> for SanctionError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ProtectedAccount(name) => SanctionError::Protected(name),
            other => SanctionError::Db(other),
        }
    }
}

/// Optional parameters of a restricting action.
#[derive(Debug, Clone, Default)]
pub struct SanctionRequest {
    /// Length in days. `None` or `0` means permanent.
    pub duration_days: Option<i64>,
    pub justification: Option<String>,
}

/// Whether `actor` may use moderation tools at `now`.
///
/// Staff privilege alone is not enough: a restricted or banned staff member
/// keeps resolving its older tokens but loses write access everywhere.
pub fn may_moderate(actor: &Member, now: i64) -> bool {
    actor.is_staff && actor.capabilities.effective_at(now).may_write()
}

/// Resolve a duration in days to an absolute expiry.
///
/// Returns `Ok(None)` for a permanent sanction.
pub fn expiry_for(duration_days: Option<i64>, now: DateTime<Utc>) -> Result<Option<i64>, SanctionError> {
    match duration_days {
        None | Some(0) => Ok(None),
        Some(days) if days < 0 => Err(SanctionError::InvalidDuration(
            "Ensure this value is greater than or equal to 0.",
        )),
        Some(days) => TimeDelta::try_days(days)
            .and_then(|delta| now.checked_add_signed(delta))
            .map(|end| Some(end.timestamp()))
            .ok_or(SanctionError::InvalidDuration("A valid integer is required.")),
    }
}

/// Applies sanctions on behalf of staff members.
#[derive(Clone)]
pub struct SanctionEngine {
    db: Database,
    members: MembersConfig,
    notifier: Arc<dyn Notifier>,
}

impl SanctionEngine {
    pub fn new(db: Database, members: &MembersConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            members: members.clone(),
            notifier,
        }
    }

    pub async fn apply_read_only(
        &self,
        actor: &Member,
        target_id: i64,
        request: SanctionRequest,
    ) -> Result<Member, SanctionError> {
        self.execute(actor, target_id, SanctionKind::ReadOnly, request).await
    }

    pub async fn lift_read_only(&self, actor: &Member, target_id: i64) -> Result<Member, SanctionError> {
        self.execute(actor, target_id, SanctionKind::ReadOnlyLifted, SanctionRequest::default())
            .await
    }

    pub async fn apply_ban(
        &self,
        actor: &Member,
        target_id: i64,
        request: SanctionRequest,
    ) -> Result<Member, SanctionError> {
        self.execute(actor, target_id, SanctionKind::Ban, request).await
    }

    pub async fn lift_ban(&self, actor: &Member, target_id: i64) -> Result<Member, SanctionError> {
        self.execute(actor, target_id, SanctionKind::BanLifted, SanctionRequest::default())
            .await
    }

    /// Audit log of a member, newest first. Staff only.
    pub async fn history(&self, actor: &Member, target_id: i64) -> Result<Vec<SanctionRecord>, SanctionError> {
        check_moderator(actor)?;
        if self.db.members().find_by_id(target_id).await?.is_none() {
            return Err(SanctionError::NotFound(target_id));
        }
        Ok(self.db.sanctions().history(target_id).await?)
    }

    async fn execute(
        &self,
        actor: &Member,
        target_id: i64,
        kind: SanctionKind,
        request: SanctionRequest,
    ) -> Result<Member, SanctionError> {
        check_moderator(actor)?;
        if actor.id == target_id {
            return Err(SanctionError::OwnAccount);
        }

        let span = spans::sanction(kind.as_str(), &actor.username, target_id);
        self.apply_kind(actor, target_id, kind, request)
            .instrument(span)
            .await
    }

    async fn apply_kind(
        &self,
        actor: &Member,
        target_id: i64,
        kind: SanctionKind,
        request: SanctionRequest,
    ) -> Result<Member, SanctionError> {
        let target = self
            .db
            .members()
            .find_by_id(target_id)
            .await?
            .ok_or(SanctionError::NotFound(target_id))?;
        if self.members.is_bot_account(&target.username) {
            return Err(SanctionError::Protected(target.username));
        }

        let now = Utc::now();
        let (duration_days, justification) = if kind.restricts() {
            (request.duration_days.filter(|d| *d != 0), request.justification)
        } else {
            (None, None)
        };
        let expires_at = expiry_for(duration_days, now)?;

        let updated = self
            .db
            .sanctions()
            .apply(SanctionWrite {
                target_id,
                protected_username: &self.members.bot_account,
                moderator_id: actor.id,
                kind,
                justification: justification.as_deref(),
                duration_days,
                expires_at,
                now: now.timestamp(),
            })
            .await
            .map_err(|e| match e {
                DbError::MemberNotFound(_) => SanctionError::NotFound(target_id),
                other => SanctionError::from(other),
            })?;

        crate::metrics::record_sanction(kind.as_str());
        info!(
            member = %updated.username,
            moderator = %actor.username,
            expires_at = ?expires_at,
            "Sanction applied"
        );

        deliver_or_log(
            self.notifier.as_ref(),
            Notification {
                recipient: updated.email.clone(),
                kind: template_for(kind),
                context: serde_json::json!({
                    "username": updated.username,
                    "moderator": actor.username,
                    "justification": justification,
                    "duration_days": duration_days,
                    "expires_at": expires_at
                        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
                        .map(|dt| dt.to_rfc3339()),
                }),
            },
        )
        .await;

        Ok(updated)
    }
}

fn check_moderator(actor: &Member) -> Result<(), SanctionError> {
    if !actor.is_staff {
        Err(SanctionError::NotStaff)
    } else if !may_moderate(actor, Utc::now().timestamp()) {
        Err(SanctionError::Restricted)
    } else {
        Ok(())
    }
}

fn template_for(kind: SanctionKind) -> TemplateKind {
    match kind {
        SanctionKind::ReadOnly => TemplateKind::ReadOnly,
        SanctionKind::ReadOnlyLifted => TemplateKind::ReadOnlyLifted,
        SanctionKind::Ban => TemplateKind::Ban,
        SanctionKind::BanLifted => TemplateKind::BanLifted,
    }
}
