//! Member listing, registration, activation and profiles.

use super::pagination::{self, ListQuery, Page};
use super::payload::Payload;
use super::views::{MemberDetail, MemberSummary};
use super::{Actor, AppState, member_id};
use crate::accounts::{ProfileChanges, Registration};
use crate::db::now_ts;
use crate::error::{ApiError, ApiResult};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<MemberSummary>>> {
    let members = state.db.members();
    let search = query.search();

    let count = members.count(search).await?;
    let window = pagination::window(&query, &state.pagination, count)?;
    let rows = members.list(search, window.size, window.offset()).await?;

    let results = rows.iter().map(MemberSummary::from).collect();
    Ok(Json(Page::new("/members", &query, window, count, results)))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<MemberDetail>)> {
    let form: Registration = payload.parse().await?;
    let member = state.accounts.register(form).await?;
    Ok((StatusCode::CREATED, Json(MemberDetail::new(&member, now_ts(), true))))
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivationRequest {
    token: Option<String>,
}

pub async fn activate(
    State(state): State<Arc<AppState>>,
    payload: Payload,
) -> ApiResult<Json<MemberDetail>> {
    let request: ActivationRequest = payload.parse().await?;
    let member = state.accounts.activate(request.token.as_deref()).await?;
    Ok(Json(MemberDetail::new(&member, now_ts(), true)))
}

/// Profile view. The email shows only to its authenticated owner, and only
/// when the owner opted to display it.
pub async fn detail(
    State(state): State<Arc<AppState>>,
    actor: Option<Actor>,
    Path(id): Path<String>,
) -> ApiResult<Json<MemberDetail>> {
    let member = state
        .db
        .members()
        .find_by_id(member_id(&id)?)
        .await?
        .ok_or(ApiError::NotFound)?;

    let is_owner = actor.is_some_and(|Actor(a)| a.id == member.id);
    let with_email = is_owner && member.profile.show_email;
    Ok(Json(MemberDetail::new(&member, now_ts(), with_email)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    payload: Payload,
) -> ApiResult<Json<MemberDetail>> {
    let target = state.accounts.editable_profile(&actor, member_id(&id)?).await?;
    let changes: ProfileChanges = payload.parse().await?;
    let updated = state.accounts.update_profile(&target, changes).await?;
    Ok(Json(MemberDetail::new(&updated, now_ts(), true)))
}
