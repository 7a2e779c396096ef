//! JSON-lines outbox notifier.
//!
//! Appends one JSON object per notification to a local file. Used for
//! development setups and by the integration tests to read confirmation
//! tokens back.

use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct OutboxNotifier {
    path: PathBuf,
    // Serializes appends so concurrent lines never interleave.
    lock: Mutex<()>,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut line = serde_json::to_vec(&notification)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
