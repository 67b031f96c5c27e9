//! Per-check append-only logs.
//!
//! Each check gets a live log of JSON lines. Rotation compresses a live log
//! into a timestamped archive and truncates it; callers are responsible for
//! not appending to a log while it is being rotated.

pub mod file;
pub mod locks;

pub use file::FileLogStore;
pub use locks::KeyedLocks;

use async_trait::async_trait;

use crate::error::LogError;

#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Append one line, creating the log if needed
    async fn append(&self, log_id: &str, line: &str) -> Result<(), LogError>;

    /// List live log ids, plus archive ids when `include_archived` is set
    async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogError>;

    /// Compress a live log into a new archive, leaving the live log as is
    async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), LogError>;

    /// Empty a live log
    async fn truncate(&self, log_id: &str) -> Result<(), LogError>;

    /// Read back the content of an archive
    async fn decompress(&self, archive_id: &str) -> Result<String, LogError>;
}

/// Archive id for a rotation of `log_id` at `millis`
pub fn archive_id(log_id: &str, millis: i64) -> String {
    format!("{log_id}-{millis}")
}
