use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Up/down classification of a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    #[default]
    Down,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// Transport used to reach a check's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method used for a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// A validated, schedulable check.
///
/// This is also the persisted shape of a record in the `checks` collection,
/// so field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// Opaque 20 character identifier
    pub id: String,

    /// 10-digit phone number of the owning user
    pub owner_phone: String,

    pub protocol: Protocol,

    /// Host and optional path/query, without the scheme
    pub url: String,

    pub method: Method,

    /// Status codes considered healthy
    pub success_codes: Vec<u16>,

    /// Probe timeout, between 1 and 5 seconds
    pub timeout_seconds: u64,

    pub state: CheckState,

    /// When the check was last probed, absent if never
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Check {
    /// Full target address, `<protocol>://<url>`
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }

    pub fn accepts(&self, status_code: u16) -> bool {
        self.success_codes.contains(&status_code)
    }
}

/// Why a probe did not produce a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProbeError {
    NetworkError { detail: String },
    Timeout,
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::NetworkError { detail } => write!(f, "network error: {detail}"),
            ProbeError::Timeout => write!(f, "timeout"),
        }
    }
}

/// Result of a single probe attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub error: Option<ProbeError>,
    pub response_code: Option<u16>,
}

impl CheckOutcome {
    pub fn response(status_code: u16) -> Self {
        Self { error: None, response_code: Some(status_code) }
    }

    pub fn network_error(detail: impl Into<String>) -> Self {
        Self { error: Some(ProbeError::NetworkError { detail: detail.into() }), response_code: None }
    }

    pub fn timeout() -> Self {
        Self { error: Some(ProbeError::Timeout), response_code: None }
    }
}

/// One line of a check's audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The check as it was before this probe
    pub check: Check,
    pub outcome: CheckOutcome,
    pub state: CheckState,
    pub alert: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
}
