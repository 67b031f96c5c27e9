use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::RecordStore;
use crate::error::StoreError;

/// One JSON file per record, `<base>/<collection>/<id>.json`
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn record_path(&self, collection: &str, id: &str) -> PathBuf {
        self.base_dir.join(collection).join(format!("{id}.json"))
    }

    /// Write `data` next to `path` and rename it over the record, so a
    /// reader never sees a partially written file.
    async fn replace_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let staging = path.with_extension("json.tmp");
        let mut file = fs::File::create(&staging).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&staging, path).await
    }

    fn map_missing(error: std::io::Error, collection: &str, id: &str) -> StoreError {
        if error.kind() == ErrorKind::NotFound {
            StoreError::NotFound { collection: collection.to_owned(), id: id.to_owned() }
        } else {
            StoreError::Io(error)
        }
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let path = self.record_path(collection, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new().write(true).create_new(true).open(&path).await.map_err(
            |e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    StoreError::AlreadyExists { collection: collection.to_owned(), id: id.to_owned() }
                }
                _ => StoreError::Io(e),
            },
        )?;
        file.write_all(&serde_json::to_vec(record)?).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        let raw = fs::read(self.record_path(collection, id))
            .await
            .map_err(|e| Self::map_missing(e, collection, id))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let data = serde_json::to_vec(record)?;
        let path = self.record_path(collection, id);
        fs::metadata(&path).await.map_err(|e| Self::map_missing(e, collection, id))?;
        Self::replace_file(&path, &data).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        fs::remove_file(self.record_path(collection, id))
            .await
            .map_err(|e| Self::map_missing(e, collection, id))
    }

    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(self.base_dir.join(collection)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|name| name.strip_suffix(".json")) {
                ids.push(id.to_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
