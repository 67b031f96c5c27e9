use std::sync::Arc;

use tracing::debug;

use super::checker::Prober;
use super::processor::{OutcomeProcessor, ProcessedCheck};
use super::types::Check;

/// Monitoring executor - probes one validated check and processes the outcome
pub struct MonitoringExecutor {
    prober: Arc<dyn Prober>,
    processor: Arc<OutcomeProcessor>,
}

impl MonitoringExecutor {
    pub fn new(prober: Arc<dyn Prober>, processor: Arc<OutcomeProcessor>) -> Self {
        Self { prober, processor }
    }

    /// Probe, then process. The previous state is only overwritten after the
    /// decision has been taken from it.
    pub async fn execute_check(&self, check: Check) -> ProcessedCheck {
        let outcome = self.prober.probe(&check).await;
        debug!(check_id = %check.id, target = %check.target(), ?outcome, "Probe finished");

        self.processor.process(check, outcome).await
    }
}
