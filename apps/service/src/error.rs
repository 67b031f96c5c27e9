use std::io::Error as IoError;

use thiserror::Error;

/// Failures reported by a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Record {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("{0:#}")]
    Io(#[from] IoError),

    #[error("Record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by a [`crate::logs::AppendLog`].
#[derive(Debug, Error)]
pub enum LogError {
    #[error("{0:#}")]
    Io(#[from] IoError),

    #[error("Log {0} not found")]
    NotFound(String),

    #[error("Archive {0} already exists")]
    AlreadyExists(String),

    #[error("Log {0} is empty, nothing to compress")]
    Empty(String),

    #[error("Archive could not be decoded: {0}")]
    Decode(String),
}

/// Failures reported by a [`crate::notifier::Notifier`].
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Phone number {0:?} is not a 10-digit number")]
    InvalidPhone(String),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Message is {0} characters long (maximum: 1600)")]
    MessageTooLong(usize),

    #[error("SMS transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("SMS provider rejected the message with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[source] IoError),

    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] IoError),

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("No config path available, neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
}
