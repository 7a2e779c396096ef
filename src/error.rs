//! Unified error handling for sanctiond.
//!
//! [`ApiError`] is the error every request handler returns. It maps onto an
//! HTTP status and a JSON body, and carries a static code used as a metrics
//! label.

use crate::db::DbError;
use crate::sanction::SanctionError;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// DRF-style message for a missing field.
pub const REQUIRED: &str = "This field is required.";
/// DRF-style message for an empty field.
pub const BLANK: &str = "This field may not be blank.";

// ============================================================================
// Field errors
// ============================================================================

/// Field name to messages, rendered as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors for a single field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when no error was collected.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

// ============================================================================
// API errors
// ============================================================================

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("malformed request body: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("permission denied")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("invalid grant")]
    InvalidGrant,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::InvalidGrant => "invalid_grant",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) | Self::InvalidGrant => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::Validation(errors) => serde_json::json!(errors),
            Self::BadRequest(reason) => serde_json::json!({ "detail": reason }),
            Self::Unauthorized => {
                serde_json::json!({ "detail": "Authentication credentials were not provided." })
            }
            Self::Forbidden => {
                serde_json::json!({ "detail": "You do not have permission to perform this action." })
            }
            Self::NotFound => serde_json::json!({ "detail": "Not found." }),
            Self::MethodNotAllowed(method) => {
                serde_json::json!({ "detail": format!("Method \"{method}\" not allowed.") })
            }
            Self::InvalidGrant => serde_json::json!({ "error": "invalid_grant" }),
            Self::Internal(_) => serde_json::json!({ "detail": "A server error occurred." }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        crate::metrics::record_api_error(self.error_code());
        if let Self::Internal(reason) = &self {
            tracing::error!(error = %reason, "Request failed");
        }

        let mut response = (self.status(), Json(self.body())).into_response();
        if matches!(self, Self::Unauthorized) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::MemberNotFound(_) | DbError::TokenNotFound => ApiError::NotFound,
            DbError::ProtectedAccount(_) => ApiError::Forbidden,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SanctionError> for ApiError {
    fn from(err: SanctionError) -> Self {
        match err {
            SanctionError::NotStaff
            | SanctionError::Restricted
            | SanctionError::OwnAccount
            | SanctionError::Protected(_) => ApiError::Forbidden,
            SanctionError::NotFound(_) => ApiError::NotFound,
            // Field attribution happens in the handler, which knows the body keys.
            SanctionError::InvalidDuration(message) => ApiError::BadRequest(message.to_string()),
            SanctionError::Db(e) => ApiError::from(e),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_codes_and_statuses() {
        assert_eq!(ApiError::Unauthorized.error_code(), "unauthorized");
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidGrant.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::MethodNotAllowed("PUT".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_field_errors_render_flat() {
        let mut errors = FieldErrors::new();
        errors.add("username", BLANK);
        errors.add("email", REQUIRED);
        errors.add("username", "Username cannot contain a comma.");

        let body = ApiError::Validation(errors).body();
        assert_eq!(body["username"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["email"][0], REQUIRED);
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());
        let err = FieldErrors::single("password", REQUIRED).into_result().unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.has("password")));
    }

    #[test]
    fn test_db_error_mapping() {
        assert!(matches!(ApiError::from(DbError::TokenNotFound), ApiError::NotFound));
        assert!(matches!(
            ApiError::from(SanctionError::Protected("admin".into())),
            ApiError::Forbidden
        ));
        for err in [SanctionError::Restricted, SanctionError::OwnAccount] {
            assert!(matches!(ApiError::from(err), ApiError::Forbidden));
        }
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
