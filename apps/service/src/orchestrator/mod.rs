/// Orchestrator module - owns the engine context and its two loops
///
/// The engine is created once at startup from its collaborators and drives:
/// - The check loop: enumerate, validate, probe and process every check
/// - The rotation loop: archive and truncate every live check log
pub mod rotation;


pub use rotation::{LogRotation, RotationReport};

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, EngineConfig};
use crate::logs::{AppendLog, FileLogStore, KeyedLocks};
use crate::monitoring::{Cycle, HttpProber, MonitoringExecutor, MonitoringScheduler, OutcomeProcessor, Prober};
use crate::notifier::{LogNotifier, Notifier, TwilioNotifier};
use crate::store::{FileStore, RecordStore};

/// Engine context shared by the check and rotation loops
pub struct Engine {
    config: EngineConfig,
    scheduler: Arc<MonitoringScheduler>,
    rotation: Arc<LogRotation>,
}

/// Running loops of a started [`Engine`]
pub struct EngineHandle {
    check_loop: JoinHandle<()>,
    rotation_loop: JoinHandle<()>,
    shutdown: CancellationToken,
    scheduler: Arc<MonitoringScheduler>,
}

impl EngineHandle {
    /// Stop both loops once their current pass is done, then wait for every
    /// check pipeline already spawned.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (name, task) in [("check", self.check_loop), ("rotation", self.rotation_loop)] {
            if let Err(e) = task.await {
                warn!(worker = name, "Background worker ended abnormally: {e}");
            }
        }

        self.scheduler.drain().await;
        info!("Background workers stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.check_loop.is_finished() && !self.rotation_loop.is_finished()
    }
}

impl Engine {
    /// Wire an engine from its collaborators
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn RecordStore>,
        logs: Arc<dyn AppendLog>,
        notifier: Arc<dyn Notifier>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        let log_locks = Arc::new(KeyedLocks::new());

        let processor = Arc::new(OutcomeProcessor::new(store.clone(), logs.clone(), log_locks.clone(), notifier));
        let executor = Arc::new(MonitoringExecutor::new(prober, processor));
        let scheduler = Arc::new(MonitoringScheduler::new(store, executor, config.max_concurrent_probes));
        let rotation = Arc::new(LogRotation::new(logs, log_locks));

        Self { config, scheduler, rotation }
    }

    /// File-backed engine probing over HTTP, alerting by SMS when Twilio is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(FileStore::new(&config.storage.data_dir));
        let logs = Arc::new(FileLogStore::new(&config.storage.logs_dir));
        let prober = Arc::new(HttpProber::new(&config.engine.user_agent)?);

        let notifier: Arc<dyn Notifier> = match config.twilio.as_ref().filter(|twilio| twilio.is_complete()) {
            Some(twilio) => {
                info!(from = %twilio.from_phone, "Alerts will be sent by SMS");
                Arc::new(TwilioNotifier::new(twilio)?)
            }
            None => {
                info!("Twilio is not configured, alerts will only be logged");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::new(config.engine.clone(), store, logs, notifier, prober))
    }

    /// One enumeration pass of the check loop
    pub async fn run_check_cycle(&self) -> Cycle {
        self.scheduler.run_cycle().await
    }

    /// One pass of the rotation loop
    pub async fn rotate_logs(&self) -> RotationReport {
        self.rotation.rotate_all().await
    }

    /// Start both loops; each runs a first pass immediately
    pub fn start(&self) -> EngineHandle {
        info!(
            check_interval = ?self.config.check_interval(),
            rotation_interval = ?self.config.rotation_interval(),
            "Background workers are running"
        );

        let shutdown = CancellationToken::new();
        EngineHandle {
            check_loop: self.scheduler.clone().start(self.config.check_interval(), shutdown.clone()),
            rotation_loop: self
                .rotation
                .clone()
                .start_periodic_rotation(self.config.rotation_interval(), shutdown.clone()),
            shutdown,
            scheduler: self.scheduler.clone(),
        }
    }
}
