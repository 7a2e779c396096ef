//! Staff sanction endpoints.
//!
//! Staff standing is checked before the body is read, so a caller that may
//! not moderate gets 403 whatever it sends.

use super::payload::Payload;
use super::views::{BanView, ReadOnlyView, SanctionEntry};
use super::{Actor, AppState, member_id};
use crate::db::{Member, now_ts};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::sanction::{SanctionError, SanctionRequest, may_moderate};
use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use std::sync::Arc;

const NOT_AN_INTEGER: &str = "A valid integer is required.";

/// A duration as sent by JSON clients (number) or forms (text).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Days {
    Number(i64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
struct ReadOnlyBody {
    #[serde(rename = "ls-jrs")]
    days: Option<Days>,
    #[serde(rename = "ls-text")]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BanBody {
    #[serde(rename = "ban-jrs", alias = "ls-jrs")]
    days: Option<Days>,
    #[serde(rename = "ban-text", alias = "ls-text")]
    text: Option<String>,
}

fn sanction_request(
    days: Option<Days>,
    text: Option<String>,
    field: &'static str,
) -> ApiResult<SanctionRequest> {
    let duration_days = match days {
        None => None,
        Some(Days::Number(n)) => Some(n),
        Some(Days::Text(raw)) => match raw.trim() {
            "" => None,
            trimmed => Some(trimmed.parse().map_err(|_| {
                ApiError::Validation(FieldErrors::single(field, NOT_AN_INTEGER))
            })?),
        },
    };
    Ok(SanctionRequest {
        duration_days,
        justification: text.filter(|t| !t.trim().is_empty()),
    })
}

fn require_staff(actor: &Member) -> ApiResult<()> {
    if may_moderate(actor, now_ts()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Report a rejected duration against the field the client sent.
fn on_field(field: &'static str) -> impl Fn(SanctionError) -> ApiError {
    move |err| match err {
        SanctionError::InvalidDuration(message) => {
            ApiError::Validation(FieldErrors::single(field, message))
        }
        other => other.into(),
    }
}

pub async fn apply_read_only(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    payload: Payload,
) -> ApiResult<Json<ReadOnlyView>> {
    require_staff(&actor)?;
    let id = member_id(&id)?;
    let body: ReadOnlyBody = payload.parse().await?;
    let request = sanction_request(body.days, body.text, "ls-jrs")?;

    let member = state
        .engine
        .apply_read_only(&actor, id, request)
        .await
        .map_err(on_field("ls-jrs"))?;
    Ok(Json(ReadOnlyView::new(&member, now_ts())))
}

pub async fn lift_read_only(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<ReadOnlyView>> {
    require_staff(&actor)?;
    let member = state.engine.lift_read_only(&actor, member_id(&id)?).await?;
    Ok(Json(ReadOnlyView::new(&member, now_ts())))
}

pub async fn apply_ban(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    payload: Payload,
) -> ApiResult<Json<BanView>> {
    require_staff(&actor)?;
    let id = member_id(&id)?;
    let body: BanBody = payload.parse().await?;
    let request = sanction_request(body.days, body.text, "ban-jrs")?;

    let member = state
        .engine
        .apply_ban(&actor, id, request)
        .await
        .map_err(on_field("ban-jrs"))?;
    Ok(Json(BanView::new(&member, now_ts())))
}

pub async fn lift_ban(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<BanView>> {
    require_staff(&actor)?;
    let member = state.engine.lift_ban(&actor, member_id(&id)?).await?;
    Ok(Json(BanView::new(&member, now_ts())))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<SanctionEntry>>> {
    require_staff(&actor)?;
    let records = state.engine.history(&actor, member_id(&id)?).await?;
    Ok(Json(records.into_iter().map(SanctionEntry::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_from_forms_and_json() {
        let request = sanction_request(Some(Days::Text(" 3 ".into())), Some("Spam".into()), "ls-jrs").unwrap();
        assert_eq!(request.duration_days, Some(3));
        assert_eq!(request.justification.as_deref(), Some("Spam"));

        let request = sanction_request(Some(Days::Text(String::new())), Some("  ".into()), "ls-jrs").unwrap();
        assert_eq!(request.duration_days, None);
        assert_eq!(request.justification, None);

        let request = sanction_request(Some(Days::Number(-1)), None, "ls-jrs").unwrap();
        assert_eq!(request.duration_days, Some(-1));

        match sanction_request(Some(Days::Text("soon".into())), None, "ban-jrs") {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.get("ban-jrs"), Some(&[NOT_AN_INTEGER.to_string()][..]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ban_body_accepts_read_only_keys() {
        let body: BanBody = serde_json::from_str(r#"{"ls-jrs": 1, "ls-text": "Troll"}"#).unwrap();
        assert!(matches!(body.days, Some(Days::Number(1))));
        assert_eq!(body.text.as_deref(), Some("Troll"));

        let body: BanBody = serde_json::from_str(r#"{"ban-jrs": "2"}"#).unwrap();
        assert!(matches!(body.days, Some(Days::Text(ref s)) if s == "2"));
    }

    #[test]
    fn invalid_duration_lands_on_its_field() {
        let err = on_field("ban-jrs")(SanctionError::InvalidDuration("bad"));
        match err {
            ApiError::Validation(errors) => assert!(errors.has("ban-jrs")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(on_field("ls-jrs")(SanctionError::NotFound(3)), ApiError::NotFound));
    }
}
