pub mod checker;
/// Check execution engine
///
/// This module is responsible for:
/// - Validating raw check records
/// - Probing HTTP/HTTPS targets
/// - Deriving state transitions and alerting
/// - Scheduling checks every cycle
pub mod executor;
pub mod processor;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use checker::{HttpProber, Prober};
pub use executor::MonitoringExecutor;
pub use processor::{OutcomeProcessor, ProcessedCheck};
pub use scheduler::{Cycle, CycleReport, MonitoringScheduler};
pub use types::{Check, CheckOutcome, CheckState};
pub use validation::{Rejection, validate_check};
