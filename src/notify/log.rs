//! Notifier that only writes to the log.
//!
//! Default backend when no delivery channel is configured.

use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notification.recipient,
            kind = ?notification.kind,
            context = %notification.context,
            "Notification"
        );
        Ok(())
    }
}
