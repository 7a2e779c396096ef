//! Sanction expiry background task.
//!
//! Restores temporary restrictions whose expiry has passed and prunes
//! expired registration and access tokens. Views and capability checks also
//! evaluate expiry lazily, so the sweep only bounds how long the stored flag
//! stays stale.

use super::state::Axis;
use crate::db::{Database, DbError, ExpiredCounts};
use crate::telemetry::spans;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: ExpiredCounts,
    pub registration_tokens: u64,
    pub access_tokens: u64,
}

/// Run one sweep at `now` (Unix seconds).
pub async fn sweep_once(db: &Database, now: i64) -> Result<SweepReport, DbError> {
    let expired = db.sanctions().expire_due(now).await?;
    let (registration_tokens, access_tokens) = db.tokens().prune_expired(now).await?;

    crate::metrics::record_expired(Axis::Read.label(), expired.read.len());
    crate::metrics::record_expired(Axis::Write.label(), expired.write.len());

    Ok(SweepReport {
        expired,
        registration_tokens,
        access_tokens,
    })
}

/// Spawn the expiry sweep task, running every `interval_secs`.
pub fn spawn_sweep_task(db: Database, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;
            let now = chrono::Utc::now().timestamp();
            match sweep_once(&db, now).instrument(spans::sweep()).await {
                Ok(report) => {
                    if report.expired.total() > 0 {
                        info!(
                            bans = report.expired.read.len(),
                            read_only = report.expired.write.len(),
                            "Expired sanctions restored"
                        );
                    }
                    if report.registration_tokens + report.access_tokens > 0 {
                        info!(
                            registration = report.registration_tokens,
                            access = report.access_tokens,
                            "Expired tokens pruned"
                        );
                    }
                    debug!("Expiry sweep completed");
                }
                Err(e) => {
                    warn!(error = %e, "Expiry sweep failed");
                }
            }
        }
    })
}
