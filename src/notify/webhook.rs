//! Webhook notifier: POSTs each notification as JSON.

use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use std::time::Duration;

pub struct WebhookNotifier {
    url: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, NotifyError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&notification)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        tracing::debug!(url = %self.url, status = %status, "Webhook notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TemplateKind;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/hook")
    }

    fn notification() -> Notification {
        Notification {
            recipient: "clem@example.com".to_string(),
            kind: TemplateKind::BanLifted,
            context: serde_json::json!({ "moderator": "modo" }),
        }
    }

    #[tokio::test]
    async fn posts_notification_as_json() {
        let received = Arc::new(Mutex::new(Vec::<serde_json::Value>::new()));
        let sink = Arc::clone(&received);
        let router = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().await.push(body);
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let url = serve(router).await;

        WebhookNotifier::new(&url, 5)
            .unwrap()
            .deliver(notification())
            .await
            .unwrap();

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["kind"], "ban_lifted");
        assert_eq!(received[0]["context"]["moderator"], "modo");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let router = Router::new().route("/hook", post(|| async { StatusCode::BAD_GATEWAY }));
        let url = serve(router).await;

        let err = WebhookNotifier::new(&url, 5)
            .unwrap()
            .deliver(notification())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(502)));
    }
}
