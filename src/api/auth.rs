//! Bearer authentication and the password grant.

use super::AppState;
use super::payload::Payload;
use crate::db::Member;
use crate::error::{ApiError, ApiResult};
use axum::Json;
use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// The authenticated member behind a request.
///
/// Use `Option<Actor>` on endpoints that anonymous callers may reach.
#[derive(Debug, Clone)]
pub struct Actor(pub Member);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

/// Resolve `Authorization: Bearer` into an [`Actor`] extension.
///
/// No header lets the request through anonymously; a header that does not
/// resolve to a live token is rejected outright.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match bearer_member(&state, request.headers()).await {
        Ok(Some(member)) => {
            request.extensions_mut().insert(Actor(member));
        }
        Ok(None) => {}
        Err(e) => return e.into_response(),
    }
    next.run(request).await
}

async fn bearer_member(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<Member>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    match state.accounts.resolve_bearer(token).await? {
        Some(member) => Ok(Some(member)),
        None => {
            debug!("Rejected unknown or expired bearer token");
            Err(ApiError::Unauthorized)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    grant_type: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
}

/// `POST /oauth2/token` with the resource owner password grant.
pub async fn token(State(state): State<Arc<AppState>>, payload: Payload) -> ApiResult<Json<TokenResponse>> {
    let request: TokenRequest = payload.parse().await?;
    if request.grant_type.as_deref() != Some("password") {
        return Err(ApiError::InvalidGrant);
    }
    let (Some(username), Some(password)) = (request.username, request.password) else {
        return Err(ApiError::InvalidGrant);
    };

    let member = state.accounts.authenticate(&username, &password).await?;
    let issued = state.accounts.issue_token(&member).await?;
    Ok(Json(TokenResponse {
        access_token: issued.access_token,
        token_type: "Bearer",
        expires_in: issued.expires_in,
    }))
}
