//! Member HTTP API.
//!
//! Routes:
//! - `/members` list and register
//! - `/members/activation` confirm a registration token
//! - `/members/{id}` profile detail and update
//! - `/members/{id}/read-only`, `/members/{id}/ban` apply (POST) and lift (DELETE)
//! - `/members/{id}/sanctions` audit log
//! - `/oauth2/token` password grant
//!
//! Every route answers unsupported verbs with 405.

mod auth;
mod members;
mod pagination;
mod payload;
mod sanctions;
mod views;

pub use auth::Actor;

use crate::accounts::Accounts;
use crate::config::{Config, PaginationConfig};
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;
use crate::sanction::SanctionEngine;
use crate::telemetry::{OperationTimer, spans};
use axum::Router;
use axum::extract::{MatchedPath, Request};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Instrument, info, warn};

/// Shared state handed to every handler.
pub struct AppState {
    pub db: Database,
    pub accounts: Accounts,
    pub engine: SanctionEngine,
    pub pagination: PaginationConfig,
}

impl AppState {
    pub fn new(db: Database, config: &Config, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            accounts: Accounts::new(
                db.clone(),
                config.members.clone(),
                config.auth.clone(),
                notifier.clone(),
            ),
            engine: SanctionEngine::new(db.clone(), &config.members, notifier),
            pagination: config.pagination.clone(),
            db,
        })
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/members",
            get(members::list)
                .post(members::register)
                .fallback(method_not_allowed),
        )
        .route(
            "/members/activation",
            post(members::activate).fallback(method_not_allowed),
        )
        .route(
            "/members/:id",
            get(members::detail)
                .put(members::update)
                .patch(members::update)
                .fallback(method_not_allowed),
        )
        .route(
            "/members/:id/read-only",
            post(sanctions::apply_read_only)
                .delete(sanctions::lift_read_only)
                .fallback(method_not_allowed),
        )
        .route(
            "/members/:id/ban",
            post(sanctions::apply_ban)
                .delete(sanctions::lift_ban)
                .fallback(method_not_allowed),
        )
        .route(
            "/members/:id/sanctions",
            get(sanctions::history).fallback(method_not_allowed),
        )
        .route(
            "/oauth2/token",
            post(auth::token).fallback(method_not_allowed),
        )
        .route_layer(middleware::from_fn(observe))
        .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate))
        .fallback(not_found)
        .with_state(state)
}

/// Serve the API until ctrl-c.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Time and trace every routed request.
async fn observe(matched: Option<MatchedPath>, request: Request, next: Next) -> Response {
    let route = matched
        .as_ref()
        .map_or("unmatched", MatchedPath::as_str)
        .to_string();
    let method = request.method().clone();
    let _timer = OperationTimer::new(format!("{method} {route}"));
    next.run(request)
        .instrument(spans::operation(method.as_str(), &route))
        .await
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Parse a member id path segment. Anything that is not an id names no member.
fn member_id(raw: &str) -> ApiResult<i64> {
    raw.parse().map_err(|_| ApiError::NotFound)
}
