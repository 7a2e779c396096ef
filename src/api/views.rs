//! Response bodies.
//!
//! Every view is built from a member whose capabilities have already been
//! evaluated at `now`, so an elapsed sanction never shows through.

use crate::db::{Member, SanctionRecord};
use crate::sanction::state::Standing;
use chrono::{DateTime, Utc};
use serde::Serialize;

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn optional_timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

/// Listing entry.
#[derive(Debug, Serialize)]
pub struct MemberSummary {
    pub pk: i64,
    pub username: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            pk: member.id,
            username: member.username.clone(),
            is_active: member.is_active,
            date_joined: timestamp(member.date_joined),
        }
    }
}

/// Full profile. `email` is omitted unless the caller may see it.
#[derive(Debug, Serialize)]
pub struct MemberDetail {
    pub pk: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub site: String,
    pub avatar_url: String,
    pub biography: String,
    pub sign: String,
    pub show_email: bool,
    pub show_sign: bool,
    pub hover_or_click: bool,
    pub email_for_answer: bool,
    pub can_read: bool,
    pub can_write: bool,
    pub standing: Standing,
}

impl MemberDetail {
    pub fn new(member: &Member, now: i64, with_email: bool) -> Self {
        let capabilities = member.capabilities.effective_at(now);
        let profile = &member.profile;
        Self {
            pk: member.id,
            username: member.username.clone(),
            email: with_email.then(|| member.email.clone()),
            is_active: member.is_active,
            date_joined: timestamp(member.date_joined),
            site: profile.site.clone(),
            avatar_url: profile.avatar_url.clone(),
            biography: profile.biography.clone(),
            sign: profile.sign.clone(),
            show_email: profile.show_email,
            show_sign: profile.show_sign,
            hover_or_click: profile.hover_or_click,
            email_for_answer: profile.email_for_answer,
            can_read: capabilities.may_read(),
            can_write: capabilities.may_write(),
            standing: capabilities.standing(),
        }
    }
}

/// Write axis after a read-only action.
#[derive(Debug, Serialize)]
pub struct ReadOnlyView {
    pub pk: i64,
    pub username: String,
    pub email: String,
    pub can_write: bool,
    pub end_ban_write: Option<DateTime<Utc>>,
}

impl ReadOnlyView {
    pub fn new(member: &Member, now: i64) -> Self {
        let capabilities = member.capabilities.effective_at(now);
        Self {
            pk: member.id,
            username: member.username.clone(),
            email: member.email.clone(),
            can_write: capabilities.may_write(),
            end_ban_write: optional_timestamp(capabilities.end_ban_write),
        }
    }
}

/// Read axis after a ban action.
#[derive(Debug, Serialize)]
pub struct BanView {
    pub pk: i64,
    pub username: String,
    pub email: String,
    pub can_read: bool,
    pub end_ban_read: Option<DateTime<Utc>>,
}

impl BanView {
    pub fn new(member: &Member, now: i64) -> Self {
        let capabilities = member.capabilities.effective_at(now);
        Self {
            pk: member.id,
            username: member.username.clone(),
            email: member.email.clone(),
            can_read: capabilities.can_read,
            end_ban_read: optional_timestamp(capabilities.end_ban_read),
        }
    }
}

/// One audit log row.
#[derive(Debug, Serialize)]
pub struct SanctionEntry {
    pub id: i64,
    pub member: i64,
    pub kind: String,
    pub moderator: Option<i64>,
    pub justification: Option<String>,
    pub duration_days: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<SanctionRecord> for SanctionEntry {
    fn from(record: SanctionRecord) -> Self {
        Self {
            id: record.id,
            member: record.member_id,
            kind: record.kind,
            moderator: record.moderator_id,
            justification: record.justification,
            duration_days: record.duration_days,
            created_at: timestamp(record.created_at),
            expires_at: optional_timestamp(record.expires_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Profile;
    use crate::sanction::state::Capabilities;

    fn member(capabilities: Capabilities) -> Member {
        Member {
            id: 7,
            username: "Clem".into(),
            email: "clem@example.com".into(),
            is_active: true,
            is_staff: false,
            date_joined: 1_700_000_000,
            profile: Profile::default(),
            capabilities,
        }
    }

    #[test]
    fn detail_hides_email_unless_asked() {
        let member = member(Capabilities::default());
        let json = serde_json::to_value(MemberDetail::new(&member, 0, false)).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["date_joined"], "2023-11-14T22:13:20Z");

        let json = serde_json::to_value(MemberDetail::new(&member, 0, true)).unwrap();
        assert_eq!(json["email"], "clem@example.com");
    }

    #[test]
    fn banned_member_cannot_write() {
        let mut capabilities = Capabilities::default();
        capabilities.apply(crate::sanction::state::SanctionKind::Ban, None);
        let member = member(capabilities);

        let json = serde_json::to_value(MemberDetail::new(&member, 0, false)).unwrap();
        assert_eq!(json["can_read"], false);
        assert_eq!(json["can_write"], false);
        assert_eq!(json["standing"], "BANNED");
        assert!(!ReadOnlyView::new(&member, 0).can_write);
    }

    #[test]
    fn read_only_member_standing() {
        let mut capabilities = Capabilities::default();
        capabilities.apply(crate::sanction::state::SanctionKind::ReadOnly, Some(100));
        let member = member(capabilities);

        let json = serde_json::to_value(MemberDetail::new(&member, 50, false)).unwrap();
        assert_eq!(json["can_read"], true);
        assert_eq!(json["can_write"], false);
        assert_eq!(json["standing"], "READ_ONLY");

        let json = serde_json::to_value(MemberDetail::new(&member, 100, false)).unwrap();
        assert_eq!(json["can_write"], true);
        assert_eq!(json["standing"], "ACTIVE");
    }

    #[test]
    fn elapsed_ban_is_reported_lifted() {
        let mut capabilities = Capabilities::default();
        capabilities.apply(crate::sanction::state::SanctionKind::Ban, Some(100));

        let view = BanView::new(&member(capabilities), 50);
        assert!(!view.can_read);
        assert!(view.end_ban_read.is_some());

        let view = BanView::new(&member(capabilities), 100);
        assert!(view.can_read);
        assert!(view.end_ban_read.is_none());
        let json = serde_json::to_value(view).unwrap();
        assert!(json["end_ban_read"].is_null());
    }
}
