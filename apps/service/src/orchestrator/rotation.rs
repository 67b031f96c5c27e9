//! Periodic rotation of the per-check logs.
//!
//! Every live log is compressed into a timestamped archive and then
//! truncated. Rotation runs once at startup and then every day by default.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LogError;
use crate::logs::{AppendLog, KeyedLocks, archive_id};

/// Outcome of one rotation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    /// Logs archived and truncated
    pub rotated: Vec<String>,
    /// Logs with nothing written since the last rotation
    pub skipped: Vec<String>,
    /// Logs left untouched, with the reason
    pub failed: Vec<(String, String)>,
}

pub struct LogRotation {
    logs: Arc<dyn AppendLog>,
    locks: Arc<KeyedLocks>,
}

impl LogRotation {
    pub fn new(logs: Arc<dyn AppendLog>, locks: Arc<KeyedLocks>) -> Self {
        Self { logs, locks }
    }

    /// Archive and truncate one live log, holding its lock for both steps.
    ///
    /// The live log is only truncated once the archive has been written.
    pub async fn rotate_log(&self, log_id: &str) -> Result<String, LogError> {
        let _guard = self.locks.lock(log_id).await;

        let archive = archive_id(log_id, Utc::now().timestamp_millis());
        self.logs.compress(log_id, &archive).await?;
        self.logs.truncate(log_id).await?;

        Ok(archive)
    }

    /// Rotate every live log; one failure never stops the others
    pub async fn rotate_all(&self) -> RotationReport {
        let mut report = RotationReport::default();

        let log_ids = match self.logs.list(false).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list logs to rotate: {e}");
                return report;
            }
        };

        for log_id in log_ids {
            match self.rotate_log(&log_id).await {
                Ok(archive) => {
                    debug!(log_id = %log_id, archive = %archive, "Log rotated");
                    report.rotated.push(log_id);
                }
                Err(LogError::Empty(_)) => report.skipped.push(log_id),
                Err(e) => {
                    warn!(log_id = %log_id, "Error rotating log: {e}");
                    report.failed.push((log_id, e.to_string()));
                }
            }
        }

        let pruned = self.locks.prune().await;
        debug!(pruned, "Pruned idle log locks");

        report
    }

    /// Rotate now, then wait `period` after each pass, until `shutdown` is
    /// cancelled. A pass in progress is never interrupted.
    pub fn start_periodic_rotation(self: Arc<Self>, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let report = self.rotate_all().await;
                info!(
                    rotated = report.rotated.len(),
                    skipped = report.skipped.len(),
                    failed = report.failed.len(),
                    "Log rotation completed"
                );

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = sleep(period) => {}
                }
            }
            debug!("Rotation loop stopped");
        })
    }
}
