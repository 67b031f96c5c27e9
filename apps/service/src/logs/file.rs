use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::AppendLog;
use crate::error::LogError;

const LIVE_SUFFIX: &str = ".log";
const ARCHIVE_SUFFIX: &str = ".gz.b64";

/// Logs as files in one directory: `<id>.log` live, `<id>.gz.b64` archived
pub struct FileLogStore {
    base_dir: PathBuf,
}

impl FileLogStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn live_path(&self, log_id: &str) -> PathBuf {
        self.base_dir.join(format!("{log_id}{LIVE_SUFFIX}"))
    }

    fn archive_path(&self, archive_id: &str) -> PathBuf {
        self.base_dir.join(format!("{archive_id}{ARCHIVE_SUFFIX}"))
    }

    fn map_missing(error: std::io::Error, id: &str) -> LogError {
        if error.kind() == ErrorKind::NotFound { LogError::NotFound(id.to_owned()) } else { LogError::Io(error) }
    }
}

fn gzip_base64(data: &[u8]) -> Result<String, LogError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(STANDARD.encode(encoder.finish()?))
}

fn gunzip_base64(encoded: &str) -> Result<String, LogError> {
    let compressed = STANDARD.decode(encoded.trim()).map_err(|e| LogError::Decode(e.to_string()))?;
    let mut decoded = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut decoded)
        .map_err(|e| LogError::Decode(e.to_string()))?;
    Ok(decoded)
}

#[async_trait]
impl AppendLog for FileLogStore {
    async fn append(&self, log_id: &str, line: &str) -> Result<(), LogError> {
        fs::create_dir_all(&self.base_dir).await?;
        let mut file =
            fs::OpenOptions::new().create(true).append(true).open(self.live_path(log_id)).await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogError> {
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if let Some(id) = name.strip_suffix(LIVE_SUFFIX) {
                ids.push(id.to_owned());
            } else if let Some(id) = name.strip_suffix(ARCHIVE_SUFFIX).filter(|_| include_archived) {
                ids.push(id.to_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), LogError> {
        let content = fs::read(self.live_path(log_id)).await.map_err(|e| Self::map_missing(e, log_id))?;
        if content.is_empty() {
            return Err(LogError::Empty(log_id.to_owned()));
        }

        let encoded = gzip_base64(&content)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.archive_path(archive_id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => LogError::AlreadyExists(archive_id.to_owned()),
                _ => LogError::Io(e),
            })?;
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn truncate(&self, log_id: &str) -> Result<(), LogError> {
        let file = fs::OpenOptions::new()
            .write(true)
            .open(self.live_path(log_id))
            .await
            .map_err(|e| Self::map_missing(e, log_id))?;
        file.set_len(0).await?;
        Ok(())
    }

    async fn decompress(&self, archive_id: &str) -> Result<String, LogError> {
        let encoded = fs::read_to_string(self.archive_path(archive_id))
            .await
            .map_err(|e| Self::map_missing(e, archive_id))?;
        gunzip_base64(&encoded)
    }
}
