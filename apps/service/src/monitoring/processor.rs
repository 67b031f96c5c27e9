//! Turns a probe outcome into a state transition.
//!
//! The decision itself ([`decide`]) is pure. [`OutcomeProcessor`] carries out
//! its consequences: audit line, record rewrite, then the alert.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::types::{Check, CheckOutcome, CheckState, LogEntry};
use crate::logs::{AppendLog, KeyedLocks};
use crate::notifier::{Notifier, alert_message};
use crate::store::{CHECKS, RecordStore};

/// What a probe outcome means for a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: CheckState,
    pub alert: bool,
}

/// Up only for an error-free response whose code the check accepts
pub fn derive_state(check: &Check, outcome: &CheckOutcome) -> CheckState {
    match (&outcome.error, outcome.response_code) {
        (None, Some(code)) if check.accepts(code) => CheckState::Up,
        _ => CheckState::Down,
    }
}

/// Decide the new state and whether the owner must hear about it.
///
/// A check that was never probed has no state to regress from, so its first
/// outcome never alerts.
pub fn decide(previous: &Check, outcome: &CheckOutcome) -> Decision {
    let state = derive_state(previous, outcome);
    let alert = previous.last_checked_at.is_some() && previous.state != state;
    Decision { state, alert }
}

/// Everything that happened while processing one outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedCheck {
    /// The check as written back to the store
    pub check: Check,
    pub alert: bool,
    pub logged: bool,
    pub persisted: bool,
    pub notified: bool,
}

pub struct OutcomeProcessor {
    store: Arc<dyn RecordStore>,
    logs: Arc<dyn AppendLog>,
    log_locks: Arc<KeyedLocks>,
    notifier: Arc<dyn Notifier>,
}

impl OutcomeProcessor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        logs: Arc<dyn AppendLog>,
        log_locks: Arc<KeyedLocks>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { store, logs, log_locks, notifier }
    }

    pub async fn process(&self, previous: Check, outcome: CheckOutcome) -> ProcessedCheck {
        self.process_at(previous, outcome, Utc::now()).await
    }

    /// Failures of the log, the store or the notifier are reported and
    /// recorded in the returned flags, never propagated.
    pub async fn process_at(&self, previous: Check, outcome: CheckOutcome, now: DateTime<Utc>) -> ProcessedCheck {
        let Decision { state, alert } = decide(&previous, &outcome);
        let check_id = previous.id.clone();

        let check = Check { state, last_checked_at: Some(now), ..previous.clone() };

        let entry = LogEntry { check: previous, outcome, state, alert, time: now };
        let logged = self.append_entry(&entry).await;

        let persisted = match serde_json::to_value(&check) {
            Ok(record) => match self.store.update(CHECKS, &check.id, &record).await {
                Ok(()) => true,
                Err(e) => {
                    error!(check_id = %check_id, "Failed to persist check state: {e}");
                    false
                }
            },
            Err(e) => {
                error!(check_id = %check_id, "Failed to serialize check: {e}");
                false
            }
        };

        // An unsaved transition is recomputed next cycle, alerting now would
        // make that cycle alert a second time.
        let notified = if alert && persisted {
            self.alert_owner(&check).await
        } else {
            if alert {
                warn!(check_id = %check_id, "Skipping alert, the new state was not saved");
            } else {
                debug!(check_id = %check_id, %state, "Check outcome has not changed, no alert needed");
            }
            false
        };

        ProcessedCheck { check, alert, logged, persisted, notified }
    }

    async fn append_entry(&self, entry: &LogEntry) -> bool {
        let check_id = entry.check.id.as_str();
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                error!(check_id, "Failed to serialize log entry: {e}");
                return false;
            }
        };

        let _guard = self.log_locks.lock(check_id).await;
        match self.logs.append(check_id, &line).await {
            Ok(()) => true,
            Err(e) => {
                error!(check_id, "Failed to append to check log: {e}");
                false
            }
        }
    }

    async fn alert_owner(&self, check: &Check) -> bool {
        let message = alert_message(check);
        match self.notifier.send(&check.owner_phone, &message).await {
            Ok(()) => {
                info!(check_id = %check.id, state = %check.state, "Owner alerted to status change");
                true
            }
            Err(e) => {
                warn!(check_id = %check.id, "Could not alert owner to status change: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{Method, Protocol};
    use chrono::TimeZone;

    fn check(state: CheckState, last_checked: bool) -> Check {
        Check {
            id: "abcdefghij0123456789".into(),
            owner_phone: "5551234567".into(),
            protocol: Protocol::Https,
            url: "example.com".into(),
            method: Method::Get,
            success_codes: vec![200, 201],
            timeout_seconds: 3,
            state,
            last_checked_at: last_checked.then(|| Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()),
        }
    }

    #[test]
    fn test_accepted_code_is_up() {
        let check = check(CheckState::Down, true);
        assert_eq!(derive_state(&check, &CheckOutcome::response(200)), CheckState::Up);
        assert_eq!(derive_state(&check, &CheckOutcome::response(201)), CheckState::Up);
        assert_eq!(derive_state(&check, &CheckOutcome::response(500)), CheckState::Down);
    }

    #[test]
    fn test_error_wins_over_stale_response_code() {
        let check = check(CheckState::Up, true);
        let mut outcome = CheckOutcome::timeout();
        outcome.response_code = Some(200);
        assert_eq!(derive_state(&check, &outcome), CheckState::Down);

        let mut outcome = CheckOutcome::network_error("reset");
        outcome.response_code = Some(200);
        assert_eq!(derive_state(&check, &outcome), CheckState::Down);

        assert_eq!(derive_state(&check, &CheckOutcome::default()), CheckState::Down);
    }

    #[test]
    fn test_first_probe_never_alerts() {
        for state in [CheckState::Up, CheckState::Down] {
            for outcome in [CheckOutcome::response(200), CheckOutcome::response(503), CheckOutcome::timeout()] {
                assert!(!decide(&check(state, false), &outcome).alert);
            }
        }
    }

    #[test]
    fn test_transition_alerts() {
        let decision = decide(&check(CheckState::Down, true), &CheckOutcome::response(200));
        assert_eq!(decision, Decision { state: CheckState::Up, alert: true });

        let decision = decide(&check(CheckState::Down, true), &CheckOutcome::timeout());
        assert_eq!(decision, Decision { state: CheckState::Down, alert: false });

        let decision = decide(&check(CheckState::Up, true), &CheckOutcome::network_error("dns"));
        assert_eq!(decision, Decision { state: CheckState::Down, alert: true });
    }

    #[test]
    fn test_decision_is_repeatable() {
        let previous = check(CheckState::Up, true);
        let outcome = CheckOutcome::response(404);
        assert_eq!(decide(&previous, &outcome), decide(&previous, &outcome));
    }
}
