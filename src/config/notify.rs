//! Notification backend configuration.

use serde::Deserialize;

use super::defaults::default_webhook_timeout_secs;

/// Where member notifications (confirmation, sanction notices) are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyBackend {
    /// Write notifications to the log only.
    #[default]
    Log,
    /// Append notifications as JSON lines to a local file.
    Outbox,
    /// POST notifications as JSON to an HTTP endpoint.
    Webhook,
}

/// Notification delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub backend: NotifyBackend,
    /// Outbox file path (required for `outbox`).
    pub path: Option<String>,
    /// Webhook URL (required for `webhook`).
    pub url: Option<String>,
    /// Webhook request timeout in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            backend: NotifyBackend::default(),
            path: None,
            url: None,
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}
