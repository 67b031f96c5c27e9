use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::oneshot;
use url::Url;

use super::types::{Check, CheckOutcome, Method};

/// Prober trait for issuing a single probe against a check's target
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Issue exactly one request and classify what happened.
    ///
    /// Never fails: transport errors and timeouts are outcomes, not errors.
    async fn probe(&self, check: &Check) -> CheckOutcome;
}

/// First-writer-wins slot for a probe outcome.
///
/// The request and the watchdog timer both hold a clone and race to deliver;
/// the first delivery consumes the sender, later ones are discarded.
#[derive(Clone)]
struct OutcomeSlot {
    sender: Arc<Mutex<Option<oneshot::Sender<CheckOutcome>>>>,
}

impl OutcomeSlot {
    fn new() -> (Self, oneshot::Receiver<CheckOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self { sender: Arc::new(Mutex::new(Some(tx))) }, rx)
    }

    /// Returns whether this call was the one that delivered.
    fn deliver(&self, outcome: CheckOutcome) -> bool {
        let sender = self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

/// Build the URL a probe is sent to.
///
/// Scheme and host select the transport; the whole path and query of the
/// stored url are kept.
pub fn probe_url(check: &Check) -> Result<Url> {
    let url = Url::parse(&check.target()).map_err(|e| anyhow!("Invalid URL {}: {}", check.target(), e))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(anyhow!("URL {} has no host", check.target()));
    }
    Ok(url)
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(result: reqwest::Result<reqwest::Response>) -> CheckOutcome {
    match result {
        Ok(response) => CheckOutcome::response(response.status().as_u16()),
        Err(e) if e.is_timeout() => CheckOutcome::timeout(),
        Err(e) => CheckOutcome::network_error(e.to_string()),
    }
}

/// HTTP/HTTPS prober
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(user_agent: &str) -> Result<Self> {
        // The measured code is the first response's, so redirects are not followed.
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, check: &Check) -> CheckOutcome {
        let url = match probe_url(check) {
            Ok(url) => url,
            Err(e) => return CheckOutcome::network_error(e.to_string()),
        };
        let limit = Duration::from_secs(check.timeout_seconds);

        let request = self.client.request(http_method(check.method), url).timeout(limit);
        let (slot, delivered) = OutcomeSlot::new();

        let watchdog = tokio::spawn({
            let slot = slot.clone();
            async move {
                tokio::time::sleep(limit).await;
                slot.deliver(CheckOutcome::timeout());
            }
        });
        let exchange = tokio::spawn(async move {
            slot.deliver(classify(request.send().await));
        });

        let outcome = delivered
            .await
            .unwrap_or_else(|_| CheckOutcome::network_error("probe ended without an outcome"));

        watchdog.abort();
        exchange.abort();

        outcome
    }
}
