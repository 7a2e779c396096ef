//! Member notification delivery.
//!
//! The engine and the registration flow hand a [`Notification`] to a
//! [`Notifier`] once their transaction has committed. Delivery failures are
//! logged and counted by the caller, never propagated to the API client.

use crate::config::{NotifyBackend, NotifyConfig};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub mod log;
pub mod outbox;
pub mod webhook;

pub use log::LogNotifier;
pub use outbox::OutboxNotifier;
pub use webhook::WebhookNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook rejected notification with status {0}")]
    Rejected(u16),
    #[error("notifier misconfigured: {0}")]
    Config(&'static str),
}

/// Which message template the recipient should receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Registration confirmation carrying the activation token.
    Confirmation,
    ReadOnly,
    ReadOnlyLifted,
    Ban,
    BanLifted,
}

/// A message addressed to one member.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Recipient email address.
    pub recipient: String,
    pub kind: TemplateKind,
    /// Template variables.
    pub context: serde_json::Value,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Deliver a notification, logging and counting any failure.
pub async fn deliver_or_log(notifier: &dyn Notifier, notification: Notification) {
    let kind = notification.kind;
    let recipient = notification.recipient.clone();
    if let Err(e) = notifier.deliver(notification).await {
        crate::metrics::record_notification_failure();
        warn!(?kind, recipient = %recipient, error = %e, "Notification delivery failed");
    }
}

/// Build the notifier selected by configuration.
pub fn build(config: &NotifyConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    Ok(match config.backend {
        NotifyBackend::Log => Arc::new(LogNotifier),
        NotifyBackend::Outbox => {
            let path = config
                .path
                .as_deref()
                .ok_or(NotifyError::Config("outbox backend requires a path"))?;
            Arc::new(OutboxNotifier::new(path))
        }
        NotifyBackend::Webhook => {
            let url = config
                .url
                .as_deref()
                .ok_or(NotifyError::Config("webhook backend requires a url"))?;
            Arc::new(WebhookNotifier::new(url, config.timeout_secs)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn deliver(&self, _notification: Notification) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected(500))
        }
    }

    #[test]
    fn build_requires_backend_settings() {
        let config = NotifyConfig {
            backend: NotifyBackend::Outbox,
            ..NotifyConfig::default()
        };
        assert!(matches!(build(&config), Err(NotifyError::Config(_))));

        let config = NotifyConfig {
            backend: NotifyBackend::Webhook,
            ..NotifyConfig::default()
        };
        assert!(matches!(build(&config), Err(NotifyError::Config(_))));

        assert!(build(&NotifyConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn failed_delivery_is_swallowed() {
        let notification = Notification {
            recipient: "clem@example.com".to_string(),
            kind: TemplateKind::Ban,
            context: serde_json::json!({}),
        };
        deliver_or_log(&FailingNotifier, notification).await;
    }

    #[test]
    fn template_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TemplateKind::ReadOnlyLifted).unwrap();
        assert_eq!(json, "\"read_only_lifted\"");
    }
}
