//! Deferred request body.
//!
//! Handlers take the raw body and parse it only once authorization has
//! passed, so a malformed body never masks a 401/403/404. JSON and
//! urlencoded forms are accepted; an empty body parses as `T::default()`.

use crate::error::{ApiError, ApiResult};
use axum::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderValue, Method, header};
use axum::Form;
use serde::de::DeserializeOwned;

pub struct Payload {
    content_type: Option<HeaderValue>,
    bytes: Bytes,
}

impl Payload {
    fn is_form(&self) -> bool {
        self.content_type
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
    }

    pub async fn parse<T>(self) -> ApiResult<T>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        if self.bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        if self.is_form() {
            // Form reads the query string for GET, so parse as a POST body.
            let mut request = Request::new(Body::from(self.bytes));
            *request.method_mut() = Method::POST;
            if let Some(content_type) = self.content_type {
                request.headers_mut().insert(header::CONTENT_TYPE, content_type);
            }
            let Form(value) = Form::<T>::from_request(request, &())
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Ok(value);
        }

        serde_json::from_slice(&self.bytes)
            .map_err(|e| ApiError::BadRequest(format!("JSON parse error - {e}")))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for Payload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req.headers().get(header::CONTENT_TYPE).cloned();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self {
            content_type,
            bytes,
        })
    }
}
