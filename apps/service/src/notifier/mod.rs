//! Outbound alerts to check owners.

pub mod twilio;

pub use twilio::TwilioNotifier;

use async_trait::async_trait;
use tracing::info;

use crate::error::NotifyError;
use crate::monitoring::types::Check;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a one-line message to `phone`
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError>;
}

/// Alert text for a check that just changed state
pub fn alert_message(check: &Check) -> String {
    format!("Alert: Your check for {} {} is currently {}", check.method, check.target(), check.state)
}

/// Notifier used when no SMS provider is configured; alerts only reach the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        info!(phone, message, "Alert (no SMS provider configured)");
        Ok(())
    }
}
