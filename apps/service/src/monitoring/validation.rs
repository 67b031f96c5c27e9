//! Parse-and-validate step for raw check records.
//!
//! Records come from the store as loosely typed JSON, possibly hand edited or
//! half written. Anything without a sane default rejects the whole record;
//! `state` and `lastCheckedAt` fall back to "down" and "never".

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Check, CheckState, Method, Protocol};

const ID_LENGTH: usize = 20;
const PHONE_LENGTH: usize = 10;
const MIN_TIMEOUT: u64 = 1;
const MAX_TIMEOUT: u64 = 5;

/// Reason a record cannot be scheduled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("id must be a 20 character string")]
    InvalidId,
    #[error("owner phone must be a 10-digit string")]
    InvalidPhone,
    #[error("protocol must be http or https")]
    InvalidProtocol,
    #[error("url must be a non-empty string")]
    InvalidUrl,
    #[error("method must be one of get, post, put, delete")]
    InvalidMethod,
    #[error("success codes must be a non-empty list of HTTP status codes")]
    InvalidSuccessCodes,
    #[error("timeout must be a whole number of seconds between 1 and 5")]
    InvalidTimeout,
}

/// Turn a raw record into a schedulable [`Check`].
///
/// Pure: the input is never modified and nothing is logged here, the caller
/// decides what to do with a rejection.
pub fn validate_check(record: &Value) -> Result<Check, Rejection> {
    let fields = record.as_object().ok_or(Rejection::NotAnObject)?;

    Ok(Check {
        id: validate_id(fields.get("id"))?,
        owner_phone: validate_phone(field(fields, "ownerPhone", "userPhone"))?,
        protocol: validate_protocol(fields.get("protocol"))?,
        url: validate_url(fields.get("url"))?,
        method: validate_method(fields.get("method"))?,
        success_codes: validate_success_codes(fields.get("successCodes"))?,
        timeout_seconds: validate_timeout(fields.get("timeoutSeconds"))?,
        state: coerce_state(fields.get("state")),
        last_checked_at: coerce_last_checked(field(fields, "lastCheckedAt", "lastChecked")),
    })
}

/// Look up `key`, falling back to the key older records were written with.
fn field<'a>(fields: &'a Map<String, Value>, key: &str, legacy: &str) -> Option<&'a Value> {
    fields.get(key).or_else(|| fields.get(legacy))
}

fn trimmed(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim)
}

fn validate_id(value: Option<&Value>) -> Result<String, Rejection> {
    match trimmed(value) {
        Some(id) if id.chars().count() == ID_LENGTH => Ok(id.to_owned()),
        _ => Err(Rejection::InvalidId),
    }
}

fn validate_phone(value: Option<&Value>) -> Result<String, Rejection> {
    match trimmed(value) {
        Some(phone) if phone.len() == PHONE_LENGTH && phone.bytes().all(|b| b.is_ascii_digit()) => {
            Ok(phone.to_owned())
        }
        _ => Err(Rejection::InvalidPhone),
    }
}

fn validate_protocol(value: Option<&Value>) -> Result<Protocol, Rejection> {
    match value.and_then(Value::as_str) {
        Some("http") => Ok(Protocol::Http),
        Some("https") => Ok(Protocol::Https),
        _ => Err(Rejection::InvalidProtocol),
    }
}

fn validate_url(value: Option<&Value>) -> Result<String, Rejection> {
    match trimmed(value) {
        Some(url) if !url.is_empty() => Ok(url.to_owned()),
        _ => Err(Rejection::InvalidUrl),
    }
}

fn validate_method(value: Option<&Value>) -> Result<Method, Rejection> {
    match value.and_then(Value::as_str) {
        Some("get") => Ok(Method::Get),
        Some("post") => Ok(Method::Post),
        Some("put") => Ok(Method::Put),
        Some("delete") => Ok(Method::Delete),
        _ => Err(Rejection::InvalidMethod),
    }
}

fn validate_success_codes(value: Option<&Value>) -> Result<Vec<u16>, Rejection> {
    let codes = value.and_then(Value::as_array).ok_or(Rejection::InvalidSuccessCodes)?;
    if codes.is_empty() {
        return Err(Rejection::InvalidSuccessCodes);
    }

    codes
        .iter()
        .map(|code| {
            code.as_u64()
                .filter(|code| (100..=599).contains(code))
                .map(|code| code as u16)
                .ok_or(Rejection::InvalidSuccessCodes)
        })
        .collect()
}

/// Accepts `3` as well as `3.0`, JSON does not distinguish the two.
fn whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value.as_f64().filter(|n| n.fract() == 0.0 && *n >= 0.0).map(|n| n as u64)
}

fn validate_timeout(value: Option<&Value>) -> Result<u64, Rejection> {
    value
        .and_then(whole_number)
        .filter(|seconds| (MIN_TIMEOUT..=MAX_TIMEOUT).contains(seconds))
        .ok_or(Rejection::InvalidTimeout)
}

fn coerce_state(value: Option<&Value>) -> CheckState {
    match value.and_then(Value::as_str) {
        Some("up") => CheckState::Up,
        _ => CheckState::Down,
    }
}

fn coerce_last_checked(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let millis = value.and_then(Value::as_f64).filter(|millis| *millis > 0.0)?;
    Utc.timestamp_millis_opt(millis as i64).single()
}
