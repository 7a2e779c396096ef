//! Test HTTP client.
//!
//! Thin wrapper over `reqwest` that remembers a bearer token and returns
//! status and JSON body together.

#![allow(dead_code)]

use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

/// Status and decoded body of a response. `Null` when the body is empty.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

/// A test API client.
pub struct TestClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl TestClient {
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.to_string(),
            token: None,
        }
    }

    /// Obtain a bearer token with the password grant.
    pub async fn login(&mut self, username: &str, password: &str) -> anyhow::Result<()> {
        let reply = self
            .post_form(
                "/oauth2/token",
                &[
                    ("grant_type", "password"),
                    ("username", username),
                    ("password", password),
                ],
            )
            .await?;
        anyhow::ensure!(reply.status == StatusCode::OK, "login failed: {}", reply.body);

        let token = reply.body["access_token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("no access_token in {}", reply.body))?;
        self.token = Some(token.to_string());
        Ok(())
    }

    /// Use an arbitrary bearer token.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Reply> {
        self.send(self.http.get(self.url(path))).await
    }

    pub async fn post(&self, path: &str, body: Value) -> anyhow::Result<Reply> {
        self.send(self.http.post(self.url(path)).json(&body)).await
    }

    /// POST without a body.
    pub async fn post_empty(&self, path: &str) -> anyhow::Result<Reply> {
        self.send(self.http.post(self.url(path))).await
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> anyhow::Result<Reply> {
        self.send(self.http.post(self.url(path)).form(form)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> anyhow::Result<Reply> {
        self.send(self.http.put(self.url(path)).json(&body)).await
    }

    /// PUT without a body.
    pub async fn put_empty(&self, path: &str) -> anyhow::Result<Reply> {
        self.send(self.http.put(self.url(path))).await
    }

    pub async fn delete(&self, path: &str) -> anyhow::Result<Reply> {
        self.send(self.http.delete(self.url(path))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, mut request: RequestBuilder) -> anyhow::Result<Reply> {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(Reply { status, body })
    }
}
