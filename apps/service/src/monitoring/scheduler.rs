use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::executor::MonitoringExecutor;
use super::processor::ProcessedCheck;
use super::validation::validate_check;
use crate::store::{CHECKS, RecordStore};

/// Counters for one enumeration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Ids returned by the store
    pub listed: usize,
    /// Checks handed to the executor
    pub scheduled: usize,
    /// Records that failed validation
    pub rejected: usize,
    /// Records that could not be read
    pub unreadable: usize,
    /// Checks still being processed by an earlier cycle
    pub skipped_in_flight: usize,
}

/// One enumeration pass and the pipelines it started
#[derive(Default)]
pub struct Cycle {
    pub report: CycleReport,
    tasks: Vec<JoinHandle<ProcessedCheck>>,
}

impl Cycle {
    /// Wait for every pipeline of this cycle
    pub async fn finish(self) -> Vec<ProcessedCheck> {
        let mut processed = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            match task.await {
                Ok(result) => processed.push(result),
                Err(e) => error!("Check pipeline task failed: {e}"),
            }
        }
        processed
    }
}

/// Claim on a check id for the lifetime of its pipeline
struct InFlight {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlight {
    fn claim(ids: &Arc<Mutex<HashSet<String>>>, id: &str) -> Option<Self> {
        let inserted = ids.lock().unwrap_or_else(PoisonError::into_inner).insert(id.to_owned());
        inserted.then(|| Self { ids: ids.clone(), id: id.to_owned() })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.id);
    }
}

/// Monitoring scheduler - enumerates checks and fans them out to the executor
pub struct MonitoringScheduler {
    store: Arc<dyn RecordStore>,
    executor: Arc<MonitoringExecutor>,
    permits: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    tracker: TaskTracker,
}

impl MonitoringScheduler {
    pub fn new(store: Arc<dyn RecordStore>, executor: Arc<MonitoringExecutor>, max_concurrent: usize) -> Self {
        Self {
            store,
            executor,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            tracker: TaskTracker::new(),
        }
    }

    /// List every check, validate it and start its pipeline.
    ///
    /// Each id is claimed before its record is read and stays claimed until
    /// its pipeline finishes. Returns once every pipeline has been spawned,
    /// not when they finish.
    pub async fn run_cycle(&self) -> Cycle {
        let ids = match self.store.list(CHECKS).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list checks to process: {e}");
                return Cycle::default();
            }
        };

        let mut cycle = Cycle::default();
        for id in ids {
            cycle.report.listed += 1;

            let Some(claim) = InFlight::claim(&self.in_flight, &id) else {
                debug!(check_id = %id, "Previous probe still running, skipping this cycle");
                cycle.report.skipped_in_flight += 1;
                continue;
            };

            let record = match self.store.read(CHECKS, &id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(check_id = %id, "Error reading check: {e}");
                    cycle.report.unreadable += 1;
                    continue;
                }
            };

            let check = match validate_check(&record) {
                Ok(check) if check.id == id => check,
                Ok(check) => {
                    warn!(check_id = %id, record_id = %check.id, "Check id does not match its key, skipping it");
                    cycle.report.rejected += 1;
                    continue;
                }
                Err(reason) => {
                    warn!(check_id = %id, %reason, "Check is not properly formatted, skipping it");
                    cycle.report.rejected += 1;
                    continue;
                }
            };

            let executor = self.executor.clone();
            let permits = self.permits.clone();
            cycle.tasks.push(self.tracker.spawn(async move {
                let _claim = claim;
                // The semaphore is never closed, so the permit is always granted
                let _permit = permits.acquire_owned().await.ok();
                executor.execute_check(check).await
            }));
            cycle.report.scheduled += 1;
        }

        cycle
    }

    /// Run a cycle now, then wait `period` after each enqueueing pass
    /// before starting the next one, until `shutdown` is cancelled.
    pub fn start(self: Arc<Self>, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let report = self.run_cycle().await.report;
                info!(
                    listed = report.listed,
                    scheduled = report.scheduled,
                    rejected = report.rejected,
                    unreadable = report.unreadable,
                    skipped = report.skipped_in_flight,
                    "Check cycle enqueued"
                );

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = sleep(period) => {}
                }
            }
            debug!("Check loop stopped");
        })
    }

    /// Wait for every pipeline spawned so far
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
